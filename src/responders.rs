// ABOUTME: Responder capabilities backing the informational and AI menu stages
// ABOUTME: Keyword-table responders for the catalogue/statistics branches, HTTP-backed AI responder

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AiConfig;
use crate::session::Stage;

/// A black-box capability that turns free-text input into reply text.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, input: &str) -> Result<String>;
}

/// The responders bound to the three automated menu stages. Kept exhaustive
/// alongside the Stage enum: every stage that dispatches to a responder has
/// exactly one entry here.
pub struct ResponderSet {
    pub info_a: Arc<dyn Responder>,
    pub info_b: Arc<dyn Responder>,
    pub ai: Arc<dyn Responder>,
}

impl ResponderSet {
    /// Responder bound to a stage; None for the menu and handoff stages,
    /// which never dispatch to a responder.
    pub fn for_stage(&self, stage: Stage) -> Option<&dyn Responder> {
        match stage {
            Stage::InfoA => Some(self.info_a.as_ref()),
            Stage::InfoB => Some(self.info_b.as_ref()),
            Stage::AiAssist => Some(self.ai.as_ref()),
            Stage::None | Stage::AgentHandoff => None,
        }
    }
}

/// Case-insensitive keyword lookup over a fixed table. Backs the two
/// informational branches, where the reply catalogue is small and static.
pub struct KeywordResponder {
    entries: Vec<(String, String)>,
    fallback: String,
}

impl KeywordResponder {
    pub fn new(entries: &[(&str, &str)], fallback: &str) -> Self {
        KeywordResponder {
            entries: entries
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                .collect(),
            fallback: fallback.to_string(),
        }
    }
}

#[async_trait]
impl Responder for KeywordResponder {
    async fn respond(&self, input: &str) -> Result<String> {
        let needle = input.trim().to_lowercase();
        let reply = self
            .entries
            .iter()
            .find(|(key, _)| needle.contains(key.as_str()))
            .map(|(_, value)| value.clone())
            .unwrap_or_else(|| self.fallback.clone());
        Ok(reply)
    }
}

const AI_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Generative-text responder backing the AI assistant stage. Posts the user
/// input to a Gemini-style generateContent endpoint and extracts the first
/// candidate's text.
pub struct AiResponder {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl AiResponder {
    pub fn new(config: &AiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(AI_REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client for AI responder")?;
        Ok(AiResponder {
            http,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Responder for AiResponder {
    async fn respond(&self, input: &str) -> Result<String> {
        if self.api_url.is_empty() {
            anyhow::bail!("AI responder is not configured (ai.api_url is empty)");
        }

        let payload = json!({
            "contents": [{ "parts": [{ "text": input }] }],
        });

        let response = self
            .http
            .post(&self.api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await
            .context("AI API request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("AI API returned {}: {}", status, detail);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("AI API returned invalid JSON")?;

        body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .context("AI API response contained no text")
    }
}

/// Default responder set: built-in keyword tables for the informational
/// branches and the configured AI endpoint for the assistant.
pub fn default_responders(ai: &AiConfig) -> Result<ResponderSet> {
    let info_a = KeywordResponder::new(
        &[
            (
                "yearbook",
                "The regional statistical yearbook is published every December and \
                 available as a free PDF download.",
            ),
            (
                "census",
                "Census publications are released in the quarter after each census \
                 round closes.",
            ),
        ],
        "No publication matched that keyword. Try another one, for example \
         \"yearbook\" or \"census\".",
    );

    let info_b = KeywordResponder::new(
        &[
            (
                "population",
                "The latest published population figure for the region is available \
                 in table 3.1 of the current yearbook.",
            ),
            (
                "inflation",
                "Monthly inflation figures are published on the first working day of \
                 each month.",
            ),
        ],
        "No indicator matched that name. Try another one, for example \
         \"population\" or \"inflation\".",
    );

    Ok(ResponderSet {
        info_a: Arc::new(info_a),
        info_b: Arc::new(info_b),
        ai: Arc::new(AiResponder::new(ai)?),
    })
}
