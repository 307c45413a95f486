// State machine module for the command pipeline
//
// Commands move Pending -> Connecting -> Executing -> Completed, driven by
// session and service events; the session has its own three-state status.

pub mod command_state_machine;
pub mod errors;
pub mod events;
pub mod states;

// Re-export main types for convenient access
pub use command_state_machine::determine_target_state;
pub use errors::{StateMachineError, StateMachineResult};
pub use events::CommandEvent;
pub use states::{CommandState, SessionStatus};
