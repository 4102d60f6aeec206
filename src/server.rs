// ABOUTME: HTTP surface for the provider webhook — event intake, handshake, health
// ABOUTME: Verifies the payload signature before any parsing or state change

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router as AxumRouter,
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::event::{classify, WebhookEnvelope};
use crate::router::Router;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router>,
    pub verify_token: String,
    /// When None the signature check is skipped (local development).
    pub app_secret: Option<String>,
}

/// Build the axum application. Split from `serve` so tests can drive the
/// handlers without binding a socket.
pub fn app(state: AppState) -> AxumRouter {
    AxumRouter::new()
        .route("/webhook", post(webhook_handler).get(verify_handler))
        .route("/health", get(|| async { "ok" }))
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the process exits.
pub async fn serve(host: &str, port: u16, state: AppState) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    tracing::info!(addr = %addr, "Starting webhook server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}

/// Handle POST /webhook: signature check, envelope parse, classify, route.
async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(secret) = &state.app_secret {
        let signature = headers
            .get("x-hub-signature-256")
            .and_then(|v| v.to_str().ok());
        if !verify_signature(secret, &body, signature) {
            tracing::warn!("Webhook signature verification failed");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed webhook payload");
            return StatusCode::BAD_REQUEST;
        }
    };

    let event = match classify(&envelope) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Structurally malformed webhook envelope");
            return StatusCode::BAD_REQUEST;
        }
    };

    match state.router.handle(event).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::error!(error = %e, "Failed to route webhook event");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Handle GET /webhook: the provider's subscription handshake.
async fn verify_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> impl IntoResponse {
    verify_subscription(&params, &state.verify_token)
}

/// Echo the challenge iff mode is "subscribe" and the token matches; 403 on
/// mismatch, 400 when parameters are missing.
pub fn verify_subscription(params: &VerifyParams, expected_token: &str) -> (StatusCode, String) {
    match (&params.mode, &params.verify_token, &params.challenge) {
        (Some(mode), Some(token), Some(challenge)) => {
            if mode == "subscribe" && token == expected_token {
                tracing::info!("Webhook verification successful");
                (StatusCode::OK, challenge.clone())
            } else {
                tracing::warn!(mode = %mode, "Webhook verification failed");
                (StatusCode::FORBIDDEN, String::new())
            }
        }
        _ => (StatusCode::BAD_REQUEST, String::new()),
    }
}

/// Check the provider's HMAC-SHA256 payload signature. The header carries
/// `sha256=<hex digest>` computed over the raw body with the app secret.
pub fn verify_signature(secret: &str, body: &[u8], header: Option<&str>) -> bool {
    let Some(hex_digest) = header.and_then(|h| h.strip_prefix("sha256=")) else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };

    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
