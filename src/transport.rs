// ABOUTME: Outbound message delivery to the WhatsApp Cloud (Graph) API
// ABOUTME: MessageTransport trait for the router, reqwest-backed client with retry budget

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;

/// One reply button on an interactive message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub id: String,
    pub title: String,
}

/// Capability to deliver messages on a business channel. The router treats
/// delivery as fire-and-forget: failures are logged by the caller and never
/// roll back state.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Send a plain text message, optionally as a reply to an earlier
    /// message id.
    async fn send_text(
        &self,
        channel: &str,
        to: &str,
        body: &str,
        reply_to: Option<&str>,
    ) -> Result<()>;

    /// Send an interactive message with reply buttons.
    async fn send_buttons(&self, channel: &str, to: &str, body: &str, buttons: &[Button])
        -> Result<()>;

    /// Mark an inbound message as read.
    async fn mark_read(&self, channel: &str, message_id: &str) -> Result<()>;
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const RETRY_INTERVAL_MS: u64 = 500;
const RETRY_ATTEMPTS: usize = 2;

/// Graph API client. Each call posts to `{api_base}/{channel}/messages`
/// with a bearer token, a bounded timeout, and a small fixed retry budget.
pub struct WhatsAppClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl WhatsAppClient {
    pub fn new(api_base: String, token: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client for WhatsApp transport")?;
        Ok(WhatsAppClient {
            http,
            api_base,
            token,
        })
    }

    async fn post_message(&self, channel: &str, payload: serde_json::Value) -> Result<()> {
        let url = format!("{}/{}/messages", self.api_base, channel);
        let strategy = FixedInterval::from_millis(RETRY_INTERVAL_MS).take(RETRY_ATTEMPTS);

        Retry::spawn(strategy, || async {
            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.token)
                .json(&payload)
                .send()
                .await
                .context("Graph API request failed")?;

            let status = response.status();
            if !status.is_success() {
                let detail = response.text().await.unwrap_or_default();
                anyhow::bail!("Graph API returned {}: {}", status, detail);
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl MessageTransport for WhatsAppClient {
    async fn send_text(
        &self,
        channel: &str,
        to: &str,
        body: &str,
        reply_to: Option<&str>,
    ) -> Result<()> {
        let mut payload = json!({
            "messaging_product": "whatsapp",
            "to": to,
            "text": { "body": body },
        });
        if let Some(message_id) = reply_to {
            payload["context"] = json!({ "message_id": message_id });
        }
        self.post_message(channel, payload).await
    }

    async fn send_buttons(
        &self,
        channel: &str,
        to: &str,
        body: &str,
        buttons: &[Button],
    ) -> Result<()> {
        let button_objects: Vec<serde_json::Value> = buttons
            .iter()
            .map(|b| {
                json!({
                    "type": "reply",
                    "reply": { "id": b.id, "title": b.title },
                })
            })
            .collect();

        let payload = json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "interactive",
            "interactive": {
                "type": "button",
                "body": { "text": body },
                "action": { "buttons": button_objects },
            },
        });
        self.post_message(channel, payload).await
    }

    async fn mark_read(&self, channel: &str, message_id: &str) -> Result<()> {
        let payload = json!({
            "messaging_product": "whatsapp",
            "status": "read",
            "message_id": message_id,
        });
        self.post_message(channel, payload).await
    }
}
