// ABOUTME: Main entry point for the WhatsApp conversational router
// ABOUTME: Initializes logging, config, session store, sweeper, and the webhook server

use anyhow::Result;
use chrono::Utc;
use pandu::{
    agents::AgentRoster,
    config::Config,
    responders,
    router::Router,
    server::{self, AppState},
    session::SessionStore,
    sweeper,
    transport::{MessageTransport, WhatsAppClient},
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting WhatsApp conversational router");

    dotenvy::dotenv().ok();
    let config = Config::load()?;

    // All stale/first-contact comparisons are relative to this instant for
    // the life of the process.
    let server_start = Utc::now().timestamp();

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        agents = config.agents.len(),
        session_limit_secs = config.session.limit_secs,
        server_start,
        "Configuration loaded"
    );
    if config.whatsapp.app_secret.is_none() {
        tracing::warn!("No app secret configured, webhook signature check disabled");
    }

    let roster = AgentRoster::new(config.agents.clone());
    let store = Arc::new(SessionStore::new(roster.numbers()));
    let transport: Arc<dyn MessageTransport> = Arc::new(WhatsAppClient::new(
        config.whatsapp.api_base.clone(),
        config.whatsapp.graph_api_token.clone(),
    )?);
    let responders = responders::default_responders(&config.ai)?;

    let router = Arc::new(Router::new(
        Arc::clone(&store),
        roster,
        responders,
        Arc::clone(&transport),
        server_start,
    ));

    tokio::spawn(sweeper::start_sweeper(
        Arc::clone(&store),
        transport,
        Duration::from_secs(config.session.sweep_interval_secs),
        Duration::from_secs(config.session.limit_secs),
    ));

    let state = AppState {
        router,
        verify_token: config.whatsapp.verify_token.clone(),
        app_secret: config.whatsapp.app_secret.clone(),
    };

    server::serve(&config.server.host, config.server.port, state).await
}
