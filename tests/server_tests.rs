// ABOUTME: Tests for the webhook HTTP surface helpers
// ABOUTME: Covers the subscription handshake and payload signature verification

use axum::http::StatusCode;
use hmac::{Hmac, Mac};
use pandu::server::{verify_signature, verify_subscription, VerifyParams};
use sha2::Sha256;

fn params(mode: Option<&str>, token: Option<&str>, challenge: Option<&str>) -> VerifyParams {
    VerifyParams {
        mode: mode.map(|s| s.to_string()),
        verify_token: token.map(|s| s.to_string()),
        challenge: challenge.map(|s| s.to_string()),
    }
}

fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[test]
fn test_subscription_echoes_challenge_on_match() {
    let (status, body) = verify_subscription(
        &params(Some("subscribe"), Some("secret"), Some("12345")),
        "secret",
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "12345");
}

#[test]
fn test_subscription_rejects_wrong_token() {
    let (status, _) = verify_subscription(
        &params(Some("subscribe"), Some("wrong"), Some("12345")),
        "secret",
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[test]
fn test_subscription_rejects_wrong_mode() {
    let (status, _) = verify_subscription(
        &params(Some("unsubscribe"), Some("secret"), Some("12345")),
        "secret",
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[test]
fn test_subscription_requires_all_parameters() {
    let (status, _) = verify_subscription(&params(Some("subscribe"), None, Some("1")), "secret");
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = verify_subscription(&params(None, None, None), "secret");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[test]
fn test_signature_accepts_valid_digest() {
    let body = br#"{"entry":[]}"#;
    let header = sign("app-secret", body);
    assert!(verify_signature("app-secret", body, Some(&header)));
}

#[test]
fn test_signature_rejects_tampered_body() {
    let header = sign("app-secret", b"original");
    assert!(!verify_signature("app-secret", b"tampered", Some(&header)));
}

#[test]
fn test_signature_rejects_wrong_secret() {
    let body = b"payload";
    let header = sign("other-secret", body);
    assert!(!verify_signature("app-secret", body, Some(&header)));
}

#[test]
fn test_signature_rejects_missing_or_malformed_header() {
    assert!(!verify_signature("app-secret", b"payload", None));
    assert!(!verify_signature("app-secret", b"payload", Some("deadbeef")));
    assert!(!verify_signature(
        "app-secret",
        b"payload",
        Some("sha256=zz-not-hex")
    ));
}
