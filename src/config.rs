// ABOUTME: Configuration parsing from TOML file with environment variable overrides
// ABOUTME: Validates required WhatsApp credentials and provides defaults for the rest

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::agents::AgentRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub whatsapp: WhatsAppConfig,
    pub session: SessionConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub agents: Vec<AgentRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// Bearer token for the Graph API messages endpoint.
    pub graph_api_token: String,
    /// Shared secret echoed back during the GET /webhook handshake.
    pub verify_token: String,
    /// App secret used to check X-Hub-Signature-256. Optional: when unset
    /// the signature check is skipped (local development only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_secret: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle seconds after which a session is expired by the sweeper.
    #[serde(default = "default_session_limit")]
    pub limit_secs: u64,
    /// How often the sweeper scans for idle sessions.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiConfig {
    /// Endpoint of the generative-text API backing the AI assistant stage.
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_api_base() -> String {
    "https://graph.facebook.com/v20.0".to_string()
}

fn default_session_limit() -> u64 {
    180
}

fn default_sweep_interval() -> u64 {
    60
}

impl Config {
    /// Load configuration from config.toml with environment variable overrides
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var("PANDU_CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        let mut config = if Path::new(&config_path).exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse {}", config_path))?
        } else {
            Config {
                server: ServerConfig {
                    host: default_host(),
                    port: default_port(),
                },
                whatsapp: WhatsAppConfig {
                    graph_api_token: String::new(),
                    verify_token: String::new(),
                    app_secret: None,
                    api_base: default_api_base(),
                },
                session: SessionConfig {
                    limit_secs: default_session_limit(),
                    sweep_interval_secs: default_sweep_interval(),
                },
                ai: AiConfig::default(),
                agents: Vec::new(),
            }
        };

        // Override with environment variables if present
        if let Ok(val) = std::env::var("SERVER_HOST") {
            config.server.host = val;
        }
        if let Ok(val) = std::env::var("SERVER_PORT") {
            config.server.port = val
                .parse()
                .with_context(|| format!("SERVER_PORT must be a valid port number, got: {}", val))?;
        }
        if let Ok(val) = std::env::var("GRAPH_API_TOKEN") {
            config.whatsapp.graph_api_token = val;
        }
        if let Ok(val) = std::env::var("WEBHOOK_VERIFY_TOKEN") {
            config.whatsapp.verify_token = val;
        }
        if let Ok(val) = std::env::var("WHATSAPP_APP_SECRET") {
            config.whatsapp.app_secret = Some(val);
        }
        if let Ok(val) = std::env::var("GRAPH_API_BASE") {
            config.whatsapp.api_base = val;
        }
        if let Ok(val) = std::env::var("SESSION_LIMIT_SECS") {
            config.session.limit_secs = val
                .parse()
                .with_context(|| format!("SESSION_LIMIT_SECS must be seconds, got: {}", val))?;
        }
        if let Ok(val) = std::env::var("SWEEP_INTERVAL_SECS") {
            config.session.sweep_interval_secs = val
                .parse()
                .with_context(|| format!("SWEEP_INTERVAL_SECS must be seconds, got: {}", val))?;
        }
        if let Ok(val) = std::env::var("AI_API_URL") {
            config.ai.api_url = val;
        }
        if let Ok(val) = std::env::var("AI_API_KEY") {
            config.ai.api_key = val;
        }

        // Validate required fields
        if config.whatsapp.graph_api_token.trim().is_empty() {
            anyhow::bail!(
                "whatsapp.graph_api_token is required (set in config.toml or GRAPH_API_TOKEN env var)"
            );
        }
        if config.whatsapp.verify_token.trim().is_empty() {
            anyhow::bail!(
                "whatsapp.verify_token is required (set in config.toml or WEBHOOK_VERIFY_TOKEN env var)"
            );
        }
        if config.session.limit_secs == 0 {
            anyhow::bail!("session.limit_secs must be greater than zero");
        }
        if config.session.sweep_interval_secs == 0 {
            anyhow::bail!("session.sweep_interval_secs must be greater than zero");
        }
        for agent in &config.agents {
            if agent.number.trim().is_empty() || agent.name.trim().is_empty() {
                anyhow::bail!("Every [[agents]] entry needs a number and a name");
            }
        }

        Ok(config)
    }
}
