//! Event types for the TUI event loop.

use crate::notifications::NotificationLevel;
use crossterm::event::KeyEvent;

#[derive(Debug, Clone)]
pub enum TuiEvent {
    Input(KeyEvent),
    Resize { width: u16, height: u16 },
    /// A background write finished.
    Outcome(ActionOutcome),
}

/// Result of a spawned mutation, reported back to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub level: NotificationLevel,
    pub message: String,
}

impl ActionOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn failure(action: &str, err: impl std::fmt::Display) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: format!("{action}失败: {err}"),
        }
    }

    pub fn from_result<T, E: std::fmt::Display>(
        action: &str,
        result: Result<T, E>,
        success: impl FnOnce(T) -> String,
    ) -> Self {
        match result {
            Ok(value) => Self::success(success(value)),
            Err(err) => Self::failure(action, err),
        }
    }
}
