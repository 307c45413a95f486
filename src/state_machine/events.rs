use serde::{Deserialize, Serialize};

/// Events that drive a command through its lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CommandEvent {
    /// Executor handed the command a session that still has to connect
    Execute,
    /// Session reported connected
    SessionConnected,
    /// Session failed to connect
    SessionFailed(String),
    /// Service operation finished without error
    OperationSucceeded,
    /// Service rejected the operation
    OperationFailed(String),
    /// Configured command timeout elapsed
    TimedOut,
}

impl CommandEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Execute => "execute",
            Self::SessionConnected => "session_connected",
            Self::SessionFailed(_) => "session_failed",
            Self::OperationSucceeded => "operation_succeeded",
            Self::OperationFailed(_) => "operation_failed",
            Self::TimedOut => "timed_out",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::SessionFailed(msg) | Self::OperationFailed(msg) => Some(msg),
            _ => None,
        }
    }

    /// Check if this event ends the command
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::SessionFailed(_)
                | Self::OperationSucceeded
                | Self::OperationFailed(_)
                | Self::TimedOut
        )
    }
}
