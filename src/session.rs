// ABOUTME: In-memory session table, agent availability, and stale-reply dedup state
// ABOUTME: One lock serializes every read-decide-write so the router and sweeper never interleave

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// The menu branch a conversation is currently bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// No option chosen yet; the user is at the main menu.
    None,
    /// Option 1: publication catalogue.
    InfoA,
    /// Option 2: general statistics.
    InfoB,
    /// Option 3: AI assistant.
    AiAssist,
    /// Option 4: live human-agent handoff.
    AgentHandoff,
}

impl Stage {
    /// Parse a menu token ("0".."4") into a stage. Anything else is not a
    /// menu selection.
    pub fn from_menu_token(token: &str) -> Option<Stage> {
        match token {
            "0" => Some(Stage::None),
            "1" => Some(Stage::InfoA),
            "2" => Some(Stage::InfoB),
            "3" => Some(Stage::AiAssist),
            "4" => Some(Stage::AgentHandoff),
            _ => None,
        }
    }
}

/// Per-user conversation record. A session exists exactly while the
/// conversation is active; expiry or an explicit menu return removes it.
#[derive(Debug, Clone)]
pub struct Session {
    pub last_active: DateTime<Utc>,
    pub stage: Stage,
    /// Business channel the conversation is bound to; a conversation never
    /// migrates channels mid-session.
    pub business_channel_id: String,
    /// Set while stage is AgentHandoff and an agent has accepted.
    pub assigned_agent: Option<String>,
}

impl Session {
    pub fn at_menu(now: DateTime<Utc>, channel: &str) -> Self {
        Session {
            last_active: now,
            stage: Stage::None,
            business_channel_id: channel.to_string(),
            assigned_agent: None,
        }
    }
}

/// Everything the router and sweeper coordinate on, guarded together so a
/// sweep cannot race a mid-flight transition.
#[derive(Debug, Default)]
pub struct RouterState {
    sessions: HashMap<String, Session>,
    /// Agents not currently engaged in a handoff, in roster order.
    available_agents: Vec<String>,
    /// Users already sent the back-online notice for pre-start messages.
    replied_once: HashSet<String>,
}

impl RouterState {
    pub fn session(&self, user: &str) -> Option<&Session> {
        self.sessions.get(user)
    }

    pub fn session_mut(&mut self, user: &str) -> Option<&mut Session> {
        self.sessions.get_mut(user)
    }

    pub fn insert_session(&mut self, user: &str, session: Session) {
        self.sessions.insert(user.to_string(), session);
    }

    /// Remove a session entirely, releasing its assigned agent back into
    /// the available pool.
    pub fn remove_session(&mut self, user: &str) -> Option<Session> {
        let session = self.sessions.remove(user)?;
        if let Some(agent) = &session.assigned_agent {
            self.release_agent(agent.clone());
        }
        Some(session)
    }

    /// Reset a conversation to the menu stage, releasing a bound agent if
    /// the previous session was mid-handoff.
    pub fn reset_to_menu(&mut self, user: &str, channel: &str, now: DateTime<Utc>) {
        if let Some(agent) = self
            .sessions
            .get(user)
            .and_then(|s| s.assigned_agent.clone())
        {
            self.release_agent(agent);
        }
        self.insert_session(user, Session::at_menu(now, channel));
    }

    /// The user an agent is currently relaying for, if any.
    pub fn asker_for_agent(&self, agent: &str) -> Option<&str> {
        self.sessions
            .iter()
            .find(|(_, s)| s.assigned_agent.as_deref() == Some(agent))
            .map(|(user, _)| user.as_str())
    }

    pub fn available_agents(&self) -> &[String] {
        &self.available_agents
    }

    pub fn claim_agent(&mut self, agent: &str) {
        self.available_agents.retain(|a| a != agent);
    }

    /// Put an agent back into the pool after their handoff ends. No-op if
    /// the agent is already listed.
    pub fn release_agent(&mut self, agent: String) {
        if !self.available_agents.contains(&agent) {
            self.available_agents.push(agent);
        }
    }

    pub fn mark_replied(&mut self, user: &str) {
        self.replied_once.insert(user.to_string());
    }

    pub fn was_replied(&self, user: &str) -> bool {
        self.replied_once.contains(user)
    }

    /// Remove every session idle longer than `limit` and return the evicted
    /// entries so the caller can notify the users outside the lock. Assigned
    /// agents of evicted handoffs return to the available pool.
    pub fn take_expired(&mut self, now: DateTime<Utc>, limit: Duration) -> Vec<(String, Session)> {
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, s)| now - s.last_active > limit)
            .map(|(user, _)| user.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|user| self.remove_session(&user).map(|s| (user, s)))
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Shared handle to the router state. Clones are cheap; callers take the
/// lock for the whole read-decide-write region of one event.
pub struct SessionStore {
    inner: Mutex<RouterState>,
}

impl SessionStore {
    pub fn new(agent_numbers: Vec<String>) -> Self {
        SessionStore {
            inner: Mutex::new(RouterState {
                sessions: HashMap::new(),
                available_agents: agent_numbers,
                replied_once: HashSet::new(),
            }),
        }
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, RouterState>> {
        self.inner
            .lock()
            .map_err(|e| anyhow::anyhow!("Session state mutex poisoned: {}", e))
    }
}
