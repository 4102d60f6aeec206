// ABOUTME: Tests for the session store - expiry scan, agent pool, and reverse lookup
// ABOUTME: Exercises RouterState directly through the shared lock

use chrono::{Duration, Utc};
use pandu::session::{Session, SessionStore, Stage};

const LIMIT_SECS: i64 = 180;

fn store() -> SessionStore {
    SessionStore::new(vec!["628111".to_string(), "628222".to_string()])
}

fn session_idle_for(seconds: i64, agent: Option<&str>) -> Session {
    Session {
        last_active: Utc::now() - Duration::seconds(seconds),
        stage: if agent.is_some() {
            Stage::AgentHandoff
        } else {
            Stage::InfoA
        },
        business_channel_id: "biz-1".to_string(),
        assigned_agent: agent.map(|a| a.to_string()),
    }
}

#[test]
fn test_take_expired_removes_only_idle_sessions() {
    let store = store();
    let mut state = store.lock().unwrap();
    state.insert_session("idle", session_idle_for(LIMIT_SECS + 60, None));
    state.insert_session("active", session_idle_for(10, None));

    let expired = state.take_expired(Utc::now(), Duration::seconds(LIMIT_SECS));

    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].0, "idle");
    assert!(state.session("idle").is_none());
    assert!(state.session("active").is_some());
}

#[test]
fn test_take_expired_is_exactly_once() {
    let store = store();
    let mut state = store.lock().unwrap();
    state.insert_session("idle", session_idle_for(LIMIT_SECS + 60, None));

    let first = state.take_expired(Utc::now(), Duration::seconds(LIMIT_SECS));
    let second = state.take_expired(Utc::now(), Duration::seconds(LIMIT_SECS));

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
}

#[test]
fn test_expiring_handoff_returns_agent_to_pool() {
    let store = store();
    let mut state = store.lock().unwrap();
    state.claim_agent("628111");
    state.insert_session("user", session_idle_for(LIMIT_SECS + 60, Some("628111")));
    assert_eq!(state.available_agents(), ["628222".to_string()]);

    state.take_expired(Utc::now(), Duration::seconds(LIMIT_SECS));

    assert_eq!(
        state.available_agents(),
        ["628222".to_string(), "628111".to_string()]
    );
}

#[test]
fn test_session_exactly_at_limit_is_not_expired() {
    let store = store();
    let mut state = store.lock().unwrap();
    let now = Utc::now();
    state.insert_session(
        "user",
        Session {
            last_active: now - Duration::seconds(LIMIT_SECS),
            stage: Stage::None,
            business_channel_id: "biz-1".to_string(),
            assigned_agent: None,
        },
    );

    let expired = state.take_expired(now, Duration::seconds(LIMIT_SECS));

    assert!(expired.is_empty());
}

#[test]
fn test_reset_to_menu_releases_bound_agent() {
    let store = store();
    let mut state = store.lock().unwrap();
    state.claim_agent("628111");
    state.insert_session("user", session_idle_for(0, Some("628111")));

    state.reset_to_menu("user", "biz-1", Utc::now());

    assert!(state.available_agents().contains(&"628111".to_string()));
    let session = state.session("user").unwrap();
    assert_eq!(session.stage, Stage::None);
    assert!(session.assigned_agent.is_none());
}

#[test]
fn test_release_agent_does_not_duplicate() {
    let store = store();
    let mut state = store.lock().unwrap();

    state.release_agent("628111".to_string());

    assert_eq!(
        state.available_agents(),
        ["628111".to_string(), "628222".to_string()]
    );
}

#[test]
fn test_asker_for_agent_reverse_lookup() {
    let store = store();
    let mut state = store.lock().unwrap();
    state.insert_session("user", session_idle_for(0, Some("628111")));

    assert_eq!(state.asker_for_agent("628111"), Some("user"));
    assert_eq!(state.asker_for_agent("628222"), None);
}

#[test]
fn test_replied_once_set_grows_monotonically() {
    let store = store();
    let mut state = store.lock().unwrap();

    assert!(!state.was_replied("user"));
    state.mark_replied("user");
    assert!(state.was_replied("user"));

    // No code path unmarks a user for the life of the process.
    state.reset_to_menu("user", "biz-1", Utc::now());
    state.remove_session("user");
    assert!(state.was_replied("user"));
}

#[test]
fn test_menu_token_parsing_is_exhaustive() {
    assert_eq!(Stage::from_menu_token("0"), Some(Stage::None));
    assert_eq!(Stage::from_menu_token("1"), Some(Stage::InfoA));
    assert_eq!(Stage::from_menu_token("2"), Some(Stage::InfoB));
    assert_eq!(Stage::from_menu_token("3"), Some(Stage::AiAssist));
    assert_eq!(Stage::from_menu_token("4"), Some(Stage::AgentHandoff));
    assert_eq!(Stage::from_menu_token("5"), None);
    assert_eq!(Stage::from_menu_token("menu"), None);
}
