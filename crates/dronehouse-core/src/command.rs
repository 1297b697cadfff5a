//! Outcome of an input command.
//!
//! Commands never return `Err`: a rejected command changes nothing and
//! carries a message key for the HUD, a repeated or out-of-context command
//! is silently ignored.

use dronehouse_types::MessageKey;

/// Result of a command from the input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Whether the command changed state.
    pub ok: bool,
    /// Message to show, if any.
    pub message: Option<MessageKey>,
}

impl CommandOutcome {
    /// Applied, with an optional message.
    pub const fn applied(message: Option<MessageKey>) -> Self {
        Self { ok: true, message }
    }

    /// Rejected with a reason; nothing changed.
    pub const fn rejected(reason: MessageKey) -> Self {
        Self {
            ok: false,
            message: Some(reason),
        }
    }

    /// Not applicable in the current state; nothing changed, nothing to say.
    pub const fn ignored() -> Self {
        Self {
            ok: false,
            message: None,
        }
    }
}
