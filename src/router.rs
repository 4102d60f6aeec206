// ABOUTME: Central state machine routing classified inbound events to outbound actions
// ABOUTME: Decisions commit under the store lock, delivery runs afterwards and never rolls back

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::agents::AgentRoster;
use crate::event::{accept_button_id, InboundEvent};
use crate::responders::ResponderSet;
use crate::session::{RouterState, Session, SessionStore, Stage};
use crate::texts;
use crate::transport::{Button, MessageTransport};

/// One outbound side effect produced by a routing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SendText {
        channel: String,
        to: String,
        body: String,
        reply_to: Option<String>,
    },
    SendButtons {
        channel: String,
        to: String,
        body: String,
        buttons: Vec<Button>,
    },
    MarkRead {
        channel: String,
        message_id: String,
    },
}

/// A deferred responder invocation. Responder calls are async and must not
/// run under the state lock, so the decision carries them out of the locked
/// region and the router resolves them into a SendText afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RespondJob {
    pub stage: Stage,
    pub input: String,
    pub channel: String,
    pub to: String,
}

/// Outcome of routing one event: committed state is already mutated, the
/// actions (plus at most one responder call) remain to be delivered.
#[derive(Debug, Default)]
pub struct Decision {
    pub actions: Vec<Action>,
    pub respond: Option<RespondJob>,
}

impl Decision {
    fn actions(actions: Vec<Action>) -> Self {
        Decision {
            actions,
            respond: None,
        }
    }
}

/// Apply the ordered decision policy to one classified event.
///
/// Mutates `state` (the commit) and returns the outbound actions. First
/// match wins; every terminal branch refreshes `last_active` on the touched
/// session.
pub fn decide(
    state: &mut RouterState,
    event: &InboundEvent,
    now: DateTime<Utc>,
    server_start: i64,
    roster: &AgentRoster,
) -> Decision {
    match event {
        InboundEvent::AgentAccept {
            responder,
            asker,
            channel,
        } => decide_agent_accept(state, responder, asker, channel, now, roster),
        InboundEvent::Unsupported {
            sender,
            kind,
            message_id,
            channel,
        } => {
            tracing::info!(sender = %sender, kind = %kind, "Unsupported message type");
            let mut actions = Vec::new();
            if !message_id.is_empty() {
                actions.push(Action::MarkRead {
                    channel: channel.clone(),
                    message_id: message_id.clone(),
                });
            }
            actions.push(Action::SendText {
                channel: channel.clone(),
                to: sender.clone(),
                body: texts::UNSUPPORTED_TYPE.to_string(),
                reply_to: None,
            });
            state.reset_to_menu(sender, channel, now);
            Decision::actions(actions)
        }
        InboundEvent::Text {
            sender,
            body,
            timestamp,
            message_id,
            channel,
        } => decide_text(
            state,
            sender,
            body,
            *timestamp,
            message_id,
            channel,
            now,
            server_start,
        ),
        InboundEvent::Status | InboundEvent::Unrecognized => Decision::default(),
    }
}

fn decide_agent_accept(
    state: &mut RouterState,
    responder: &str,
    asker: &str,
    channel: &str,
    now: DateTime<Utc>,
    roster: &AgentRoster,
) -> Decision {
    // First accept wins: a later accept from a different agent is rejected
    // without touching the asker's session.
    if let Some(session) = state.session(asker) {
        if session.stage == Stage::AgentHandoff {
            if let Some(current) = &session.assigned_agent {
                if current != responder {
                    tracing::info!(
                        asker = %asker,
                        claimed_by = %current,
                        rejected = %responder,
                        "Handoff already claimed"
                    );
                    return Decision::actions(vec![Action::SendText {
                        channel: channel.to_string(),
                        to: responder.to_string(),
                        body: texts::HANDOFF_ALREADY_CLAIMED.to_string(),
                        reply_to: None,
                    }]);
                }
            }
        }
    }

    tracing::info!(
        agent = %roster.display_name(responder),
        asker = %asker,
        "Agent accepted handoff"
    );

    state.insert_session(
        asker,
        Session {
            last_active: now,
            stage: Stage::AgentHandoff,
            business_channel_id: channel.to_string(),
            assigned_agent: Some(responder.to_string()),
        },
    );
    state.claim_agent(responder);

    Decision::actions(vec![Action::SendText {
        channel: channel.to_string(),
        to: asker.to_string(),
        body: format!(
            "{}{}",
            texts::CONNECTED_WITH_AGENT,
            roster.display_name(responder)
        ),
        reply_to: None,
    }])
}

#[allow(clippy::too_many_arguments)]
fn decide_text(
    state: &mut RouterState,
    sender: &str,
    body: &str,
    timestamp: i64,
    message_id: &str,
    channel: &str,
    now: DateTime<Utc>,
    server_start: i64,
) -> Decision {
    let mut actions = Vec::new();
    if !message_id.is_empty() {
        actions.push(Action::MarkRead {
            channel: channel.to_string(),
            message_id: message_id.to_string(),
        });
    }

    // Queued messages from before the process started get one back-online
    // notice per identity, then the conversation restarts at the menu.
    if timestamp < server_start && !state.was_replied(sender) {
        actions.push(Action::SendText {
            channel: channel.to_string(),
            to: sender.to_string(),
            body: texts::BACK_ONLINE.to_string(),
            reply_to: Some(message_id.to_string()).filter(|id| !id.is_empty()),
        });
        actions.push(home_message(channel, sender));
        state.reset_to_menu(sender, channel, now);
        state.mark_replied(sender);
        return Decision::actions(actions);
    }

    let has_session = state.session(sender).is_some();
    let relay_target = state.asker_for_agent(sender).map(|s| s.to_string());

    // First contact after startup.
    if timestamp > server_start && !has_session && relay_target.is_none() {
        state.insert_session(sender, Session::at_menu(now, channel));
        actions.push(home_message(channel, sender));
        return Decision::actions(actions);
    }

    if !has_session && relay_target.is_none() {
        // Only the stale/first-contact comparisons look at timestamps; an
        // event that matches neither is acknowledged without state change.
        return Decision::actions(actions);
    }

    // Agent relay path: the sender is the assigned agent of some session,
    // forward the body verbatim and refresh the asker's session.
    if let Some(asker) = relay_target {
        tracing::info!(agent = %sender, asker = %asker, "Relaying agent message");
        actions.push(Action::SendText {
            channel: channel.to_string(),
            to: asker.clone(),
            body: body.to_string(),
            reply_to: None,
        });
        if let Some(session) = state.session_mut(&asker) {
            session.last_active = now;
        }
        return Decision::actions(actions);
    }

    let Some((stage, assigned)) = state
        .session(sender)
        .map(|s| (s.stage, s.assigned_agent.clone()))
    else {
        return Decision::actions(actions);
    };

    let token = body.trim().to_lowercase();

    // Return to menu from anywhere, releasing a bound agent if the session
    // was mid-handoff.
    if token == "0" {
        state.reset_to_menu(sender, channel, now);
        actions.push(home_message(channel, sender));
        return Decision::actions(actions);
    }

    if stage != Stage::None {
        match stage {
            Stage::AgentHandoff => {
                if let Some(agent) = assigned {
                    actions.push(Action::SendText {
                        channel: channel.to_string(),
                        to: agent,
                        body: body.to_string(),
                        reply_to: None,
                    });
                } else {
                    // Broadcast sent, nobody has accepted yet.
                    actions.push(Action::SendText {
                        channel: channel.to_string(),
                        to: sender.to_string(),
                        body: texts::HANDOFF_WAITING.to_string(),
                        reply_to: None,
                    });
                }
                if let Some(session) = state.session_mut(sender) {
                    session.last_active = now;
                }
                Decision::actions(actions)
            }
            _ => {
                if let Some(session) = state.session_mut(sender) {
                    session.last_active = now;
                }
                Decision {
                    actions,
                    respond: Some(RespondJob {
                        stage,
                        input: body.trim().to_string(),
                        channel: channel.to_string(),
                        to: sender.to_string(),
                    }),
                }
            }
        }
    } else if let Some(selected) = Stage::from_menu_token(&token) {
        if let Some(session) = state.session_mut(sender) {
            session.stage = selected;
            session.last_active = now;
        }
        match selected {
            Stage::None => actions.push(home_message(channel, sender)),
            Stage::InfoA => actions.push(option_message(channel, sender, texts::OPTION_ONE)),
            Stage::InfoB => actions.push(option_message(channel, sender, texts::OPTION_TWO)),
            Stage::AiAssist => actions.push(option_message(channel, sender, texts::OPTION_THREE)),
            Stage::AgentHandoff => {
                // Broadcast instead of a direct reply: every currently
                // available agent gets one accept button for this asker.
                let available = state.available_agents().to_vec();
                tracing::info!(
                    asker = %sender,
                    agents = available.len(),
                    "Broadcasting handoff request"
                );
                for agent in available {
                    actions.push(Action::SendButtons {
                        channel: channel.to_string(),
                        to: agent,
                        body: texts::BROADCAST_PROMPT.to_string(),
                        buttons: vec![Button {
                            id: accept_button_id(sender),
                            title: texts::ACCEPT_BUTTON_TITLE.to_string(),
                        }],
                    });
                }
            }
        }
        Decision::actions(actions)
    } else {
        // Not a menu token: wrong command, back to the menu.
        state.reset_to_menu(sender, channel, now);
        actions.push(Action::SendText {
            channel: channel.to_string(),
            to: sender.to_string(),
            body: format!("{}{}", texts::WRONG_COMMAND, texts::HOME_MESSAGE),
            reply_to: None,
        });
        Decision::actions(actions)
    }
}

fn home_message(channel: &str, to: &str) -> Action {
    Action::SendText {
        channel: channel.to_string(),
        to: to.to_string(),
        body: texts::HOME_MESSAGE.to_string(),
        reply_to: None,
    }
}

fn option_message(channel: &str, to: &str, text: &str) -> Action {
    Action::SendText {
        channel: channel.to_string(),
        to: to.to_string(),
        body: format!("{}{}", text, texts::BACK_TO_MENU),
        reply_to: None,
    }
}

/// Execute actions sequentially, logging per-recipient failures without
/// aborting the rest. State was already committed; delivery never fails the
/// event.
pub async fn deliver(transport: &dyn MessageTransport, actions: &[Action]) {
    for action in actions {
        let result = match action {
            Action::SendText {
                channel,
                to,
                body,
                reply_to,
            } => {
                transport
                    .send_text(channel, to, body, reply_to.as_deref())
                    .await
            }
            Action::SendButtons {
                channel,
                to,
                body,
                buttons,
            } => transport.send_buttons(channel, to, body, buttons).await,
            Action::MarkRead {
                channel,
                message_id,
            } => transport.mark_read(channel, message_id).await,
        };

        if let Err(e) = result {
            match action {
                Action::SendText { to, body, .. } | Action::SendButtons { to, body, .. } => {
                    tracing::error!(
                        recipient = %to,
                        body = %body,
                        error = %e,
                        "Failed to send message"
                    );
                }
                Action::MarkRead { message_id, .. } => {
                    tracing::error!(
                        message_id = %message_id,
                        error = %e,
                        "Failed to mark message as read"
                    );
                }
            }
        }
    }
}

/// The router: owns the event-to-action policy and wires the session store,
/// agent roster, responders, and transport together.
pub struct Router {
    store: Arc<SessionStore>,
    roster: AgentRoster,
    responders: ResponderSet,
    transport: Arc<dyn MessageTransport>,
    /// Unix seconds at process start; stale/first-contact comparisons are
    /// relative to this for the life of the process.
    server_start: i64,
}

impl Router {
    pub fn new(
        store: Arc<SessionStore>,
        roster: AgentRoster,
        responders: ResponderSet,
        transport: Arc<dyn MessageTransport>,
        server_start: i64,
    ) -> Self {
        Router {
            store,
            roster,
            responders,
            transport,
            server_start,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Route one classified event: commit the state transition under the
    /// store lock, then resolve any responder call and deliver the actions.
    pub async fn handle(&self, event: InboundEvent) -> Result<()> {
        let now = Utc::now();
        let decision = {
            let mut state = self.store.lock()?;
            decide(&mut state, &event, now, self.server_start, &self.roster)
        };

        let Decision {
            mut actions,
            respond,
        } = decision;

        if let Some(job) = respond {
            let body = match self.responders.for_stage(job.stage) {
                Some(responder) => match responder.respond(&job.input).await {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(stage = ?job.stage, error = %e, "Responder failed");
                        texts::RESPONDER_FAILED.to_string()
                    }
                },
                // The stage enum and responder table are kept exhaustive;
                // stages without a responder never produce a RespondJob.
                None => texts::RESPONDER_FAILED.to_string(),
            };
            actions.push(Action::SendText {
                channel: job.channel,
                to: job.to,
                body,
                reply_to: None,
            });
        }

        deliver(self.transport.as_ref(), &actions).await;
        Ok(())
    }
}
