// ABOUTME: Tests for the webhook event classifier
// ABOUTME: Covers envelope structure errors, button id parsing, and payload shapes

use pandu::event::{accept_button_id, classify, ClassifyError, InboundEvent, WebhookEnvelope};
use serde_json::json;

fn envelope(value: serde_json::Value) -> WebhookEnvelope {
    serde_json::from_value(json!({
        "entry": [{ "changes": [{ "value": value }] }]
    }))
    .unwrap()
}

fn text_envelope(from: &str, body: &str, timestamp: &str) -> WebhookEnvelope {
    envelope(json!({
        "metadata": { "phone_number_id": "biz-1" },
        "messages": [{
            "id": "wamid.1",
            "type": "text",
            "timestamp": timestamp,
            "from": from,
            "text": { "body": body }
        }]
    }))
}

#[test]
fn test_classify_text_message() {
    let event = classify(&text_envelope("62811", "hello", "1700000000")).unwrap();
    assert_eq!(
        event,
        InboundEvent::Text {
            sender: "62811".to_string(),
            body: "hello".to_string(),
            timestamp: 1_700_000_000,
            message_id: "wamid.1".to_string(),
            channel: "biz-1".to_string(),
        }
    );
}

#[test]
fn test_classify_button_reply_extracts_asker() {
    let env = envelope(json!({
        "metadata": { "phone_number_id": "biz-1" },
        "messages": [{
            "from": "628222",
            "interactive": {
                "button_reply": { "id": "respond_62811", "title": "Take it!" }
            }
        }]
    }));
    let event = classify(&env).unwrap();
    assert_eq!(
        event,
        InboundEvent::AgentAccept {
            responder: "628222".to_string(),
            asker: "62811".to_string(),
            channel: "biz-1".to_string(),
        }
    );
}

#[test]
fn test_classify_button_reply_without_asker_token_is_unrecognized() {
    let env = envelope(json!({
        "messages": [{
            "from": "628222",
            "interactive": { "button_reply": { "id": "respond" } }
        }]
    }));
    assert_eq!(classify(&env).unwrap(), InboundEvent::Unrecognized);
}

#[test]
fn test_classify_non_text_type_is_unsupported() {
    let env = envelope(json!({
        "metadata": { "phone_number_id": "biz-1" },
        "messages": [{
            "id": "wamid.2",
            "type": "image",
            "timestamp": "1700000000",
            "from": "62811"
        }]
    }));
    assert_eq!(
        classify(&env).unwrap(),
        InboundEvent::Unsupported {
            sender: "62811".to_string(),
            kind: "image".to_string(),
            message_id: "wamid.2".to_string(),
            channel: "biz-1".to_string(),
        }
    );
}

#[test]
fn test_classify_status_update() {
    let env = envelope(json!({
        "statuses": [{ "timestamp": "1700000000", "recipient_id": "62811" }]
    }));
    assert_eq!(classify(&env).unwrap(), InboundEvent::Status);
}

#[test]
fn test_classify_empty_value_is_unrecognized() {
    let env = envelope(json!({}));
    assert_eq!(classify(&env).unwrap(), InboundEvent::Unrecognized);
}

#[test]
fn test_classify_text_message_without_body_is_unrecognized() {
    let env = envelope(json!({
        "messages": [{
            "id": "wamid.3",
            "type": "text",
            "timestamp": "1700000000",
            "from": "62811"
        }]
    }));
    assert_eq!(classify(&env).unwrap(), InboundEvent::Unrecognized);
}

#[test]
fn test_missing_entry_is_structural_error() {
    let env: WebhookEnvelope = serde_json::from_value(json!({})).unwrap();
    assert_eq!(classify(&env), Err(ClassifyError::MissingField("entry")));
}

#[test]
fn test_missing_changes_is_structural_error() {
    let env: WebhookEnvelope = serde_json::from_value(json!({ "entry": [{}] })).unwrap();
    assert_eq!(classify(&env), Err(ClassifyError::MissingField("changes")));
}

#[test]
fn test_missing_value_is_structural_error() {
    let env: WebhookEnvelope =
        serde_json::from_value(json!({ "entry": [{ "changes": [{}] }] })).unwrap();
    assert_eq!(classify(&env), Err(ClassifyError::MissingField("value")));
}

#[test]
fn test_unparsable_timestamp_collapses_to_stale() {
    let event = classify(&text_envelope("62811", "hello", "not-a-number")).unwrap();
    match event {
        InboundEvent::Text { timestamp, .. } => assert_eq!(timestamp, 0),
        other => panic!("expected text event, got {:?}", other),
    }
}

#[test]
fn test_accept_button_id_round_trips_through_classifier() {
    let env = envelope(json!({
        "messages": [{
            "from": "628222",
            "interactive": { "button_reply": { "id": accept_button_id("62811") } }
        }]
    }));
    match classify(&env).unwrap() {
        InboundEvent::AgentAccept { asker, .. } => assert_eq!(asker, "62811"),
        other => panic!("expected agent accept, got {:?}", other),
    }
}
