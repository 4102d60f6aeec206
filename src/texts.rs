// ABOUTME: Static reply copy for every outbound notice the router sends
// ABOUTME: Menu text, option texts, and the fixed notices for edge branches

/// Home menu shown on first contact and whenever a session returns to the menu.
pub const HOME_MESSAGE: &str = "\
Welcome! I can help you with the following:\n\
1. Publication catalogue\n\
2. General statistics\n\
3. Ask the AI assistant\n\
4. Talk to a staff member\n\n\
Reply with a number to choose an option.";

pub const OPTION_ONE: &str =
    "You are in the publication catalogue. Send a keyword and I will look it up.\n";
pub const OPTION_TWO: &str =
    "You are in general statistics. Send an indicator name and I will look it up.\n";
pub const OPTION_THREE: &str =
    "You are now talking to the AI assistant. Ask me anything.\n";

/// Footer appended to option texts so users always know the way back.
pub const BACK_TO_MENU: &str = "\nSend 0 to return to the main menu.";

pub const WRONG_COMMAND: &str =
    "Sorry, I did not understand that. Please pick one of the options below.\n\n";

pub const UNSUPPORTED_TYPE: &str =
    "Sorry, I can only handle text messages. Please send your question as text.";

pub const BACK_ONLINE: &str = "\
The service was offline when this message arrived and is back online now. \
Please use the menu below to continue.";

pub const SESSION_EXPIRED: &str =
    "Your session has expired. Send another message to start a new one.";

/// Prefix for the "connected" notice; the accepting agent's name is appended.
pub const CONNECTED_WITH_AGENT: &str = "You are now connected with ";

/// Body of the interactive prompt broadcast to available agents.
pub const BROADCAST_PROMPT: &str =
    "A user is asking for a staff member. Tap the button to take this conversation.";

/// Title of the accept button in the broadcast prompt.
pub const ACCEPT_BUTTON_TITLE: &str = "Take it!";

/// Sent to an agent whose accept arrived after another agent already claimed
/// the handoff.
pub const HANDOFF_ALREADY_CLAIMED: &str =
    "This conversation has already been taken by another staff member.";

/// Sent to a user who writes into a handoff no agent has accepted yet.
pub const HANDOFF_WAITING: &str =
    "We are still looking for an available staff member. Please hold on.";

/// Fallback when a responder fails; the user should never see a raw error.
pub const RESPONDER_FAILED: &str =
    "Sorry, something went wrong while preparing your answer. Please try again.";
