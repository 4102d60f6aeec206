// ABOUTME: Webhook envelope model and event classifier for inbound provider events
// ABOUTME: Turns the raw Graph API payload into one typed InboundEvent per request

use serde::Deserialize;
use thiserror::Error;

/// Delimiter inside interactive button ids; the token after it is the
/// phone number of the user who asked for a handoff.
pub const BUTTON_ID_DELIMITER: char = '_';

/// Button id prefix used when broadcasting handoff prompts to agents.
pub const ACCEPT_BUTTON_PREFIX: &str = "respond";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    /// The envelope is structurally malformed: the provider always wraps
    /// events in entry/changes/value, so a missing layer is a client error.
    #[error("webhook envelope missing {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
pub struct Change {
    pub value: Option<ChangeValue>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeValue {
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub statuses: Vec<StatusUpdate>,
}

#[derive(Debug, Deserialize)]
pub struct Metadata {
    pub phone_number_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Unix seconds as a string, per the Graph API wire format.
    pub timestamp: Option<String>,
    pub from: Option<String>,
    pub interactive: Option<Interactive>,
    pub text: Option<TextBody>,
}

#[derive(Debug, Deserialize)]
pub struct Interactive {
    pub button_reply: Option<ButtonReply>,
}

#[derive(Debug, Deserialize)]
pub struct ButtonReply {
    pub id: String,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub timestamp: Option<String>,
    pub recipient_id: Option<String>,
}

/// One classified inbound event. Everything past the structural envelope
/// check is a classification outcome, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// An agent tapped the accept button of a handoff broadcast.
    AgentAccept {
        /// Phone number of the agent who tapped the button.
        responder: String,
        /// Phone number of the user who asked for the handoff, recovered
        /// from the button id.
        asker: String,
        channel: String,
    },
    Text {
        sender: String,
        body: String,
        /// Unix seconds; unparsable timestamps collapse to 0 (always stale).
        timestamp: i64,
        message_id: String,
        channel: String,
    },
    /// A message whose type is not "text" (image, audio, sticker, ...).
    Unsupported {
        sender: String,
        kind: String,
        message_id: String,
        channel: String,
    },
    /// Delivery/read status update; acknowledged and otherwise ignored.
    Status,
    /// Payload matched none of the known shapes; acknowledged and dropped.
    Unrecognized,
}

/// Classify a webhook envelope into a typed event.
///
/// Mirrors the provider's delivery contract: exactly one message or status
/// per envelope is acted on (the first), and a missing entry/changes/value
/// layer rejects the whole event.
pub fn classify(envelope: &WebhookEnvelope) -> Result<InboundEvent, ClassifyError> {
    let entry = envelope
        .entry
        .first()
        .ok_or(ClassifyError::MissingField("entry"))?;
    let change = entry
        .changes
        .first()
        .ok_or(ClassifyError::MissingField("changes"))?;
    let value = change
        .value
        .as_ref()
        .ok_or(ClassifyError::MissingField("value"))?;

    let channel = value
        .metadata
        .as_ref()
        .and_then(|m| m.phone_number_id.clone())
        .unwrap_or_default();

    if let Some(message) = value.messages.first() {
        let sender = message.from.clone().unwrap_or_default();

        if let Some(reply) = message
            .interactive
            .as_ref()
            .and_then(|i| i.button_reply.as_ref())
        {
            // Button id format: "respond_<asker>". A reply without the asker
            // token is not ours to route.
            let mut parts = reply.id.splitn(2, BUTTON_ID_DELIMITER);
            let _prefix = parts.next();
            return match parts.next() {
                Some(asker) if !asker.is_empty() => Ok(InboundEvent::AgentAccept {
                    responder: sender,
                    asker: asker.to_string(),
                    channel,
                }),
                _ => {
                    tracing::warn!(button_id = %reply.id, "Button reply with unroutable id");
                    Ok(InboundEvent::Unrecognized)
                }
            };
        }

        if message.timestamp.is_some() {
            let message_id = message.id.clone().unwrap_or_default();
            let kind = message.kind.clone().unwrap_or_default();

            if kind != "text" {
                return Ok(InboundEvent::Unsupported {
                    sender,
                    kind,
                    message_id,
                    channel,
                });
            }

            if let Some(text) = &message.text {
                return Ok(InboundEvent::Text {
                    sender,
                    body: text.body.clone(),
                    timestamp: parse_timestamp(message.timestamp.as_deref()),
                    message_id,
                    channel,
                });
            }
        }

        return Ok(InboundEvent::Unrecognized);
    }

    if value
        .statuses
        .first()
        .is_some_and(|s| s.timestamp.is_some())
    {
        return Ok(InboundEvent::Status);
    }

    Ok(InboundEvent::Unrecognized)
}

fn parse_timestamp(raw: Option<&str>) -> i64 {
    raw.and_then(|t| t.parse::<i64>().ok()).unwrap_or(0)
}

/// Build the button id that encodes the asker identity for a broadcast.
pub fn accept_button_id(asker: &str) -> String {
    format!("{}{}{}", ACCEPT_BUTTON_PREFIX, BUTTON_ID_DELIMITER, asker)
}
