use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a single queued command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandState {
    /// Queued, not yet handed a session
    Pending,
    /// Waiting for the session to report connected
    Connecting,
    /// Service operation in flight
    Executing,
    /// Finished, successfully or not; listeners have been notified
    Completed,
}

impl CommandState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Check if the command currently holds the executor's slot
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Executing)
    }
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Connecting => write!(f, "connecting"),
            Self::Executing => write!(f, "executing"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for CommandState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "connecting" => Ok(Self::Connecting),
            "executing" => Ok(Self::Executing),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("Invalid command state: {s}")),
        }
    }
}

impl Default for CommandState {
    fn default() -> Self {
        Self::Pending
    }
}

/// Status of the executor's connection to the external service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl SessionStatus {
    /// A connect request in this status starts a new attempt
    pub fn accepts_connect(&self) -> bool {
        matches!(self, Self::Disconnected)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::Disconnected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_state_terminal_check() {
        assert!(CommandState::Completed.is_terminal());
        assert!(!CommandState::Pending.is_terminal());
        assert!(!CommandState::Connecting.is_terminal());
        assert!(!CommandState::Executing.is_terminal());
    }

    #[test]
    fn test_command_state_active_check() {
        assert!(CommandState::Connecting.is_active());
        assert!(CommandState::Executing.is_active());
        assert!(!CommandState::Pending.is_active());
        assert!(!CommandState::Completed.is_active());
    }

    #[test]
    fn test_state_string_conversion() {
        assert_eq!(CommandState::Executing.to_string(), "executing");
        assert_eq!(
            "connecting".parse::<CommandState>().unwrap(),
            CommandState::Connecting
        );
        assert!("running".parse::<CommandState>().is_err());
        assert_eq!(SessionStatus::Connected.to_string(), "connected");
    }

    #[test]
    fn test_session_status_accepts_connect() {
        assert!(SessionStatus::Disconnected.accepts_connect());
        assert!(!SessionStatus::Connecting.accepts_connect());
        assert!(!SessionStatus::Connected.accepts_connect());
        assert_eq!(SessionStatus::default(), SessionStatus::Disconnected);
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&CommandState::Connecting).unwrap();
        assert_eq!(json, "\"connecting\"");

        let parsed: CommandState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, CommandState::Connecting);
    }
}
