//! # Command Execution
//!
//! Serialized delivery of watch-list changes to the external geofencing
//! service: a [`ConnectionSession`] shared by a FIFO [`CommandExecutor`] that
//! runs one [`Command`] at a time.

pub mod command;
pub mod executor;
pub mod session;

pub use command::{Command, CommandFailure, CommandKind, CommandOutcome, CompletionListener};
pub use executor::{ActiveCommand, CommandExecutor, ExecutorStats};
pub use session::{ConnectionSession, SessionEvent};
