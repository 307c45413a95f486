//! # Watch-List Orchestration
//!
//! Sequencing of store mutations against the command pipeline, the inbound
//! transition path, and bootstrap of the whole system.
//!
//! - [`WatchListOrchestrator`] - add/remove/restore with store-first ordering
//! - [`TransitionHandler`] - service transitions to host events
//! - [`GeofencerSystem`] - wiring from configuration, boot restore

pub mod bootstrap;
pub mod transition_handler;
pub mod watch_list_orchestrator;

pub use bootstrap::GeofencerSystem;
pub use transition_handler::TransitionHandler;
pub use watch_list_orchestrator::{CommandTicket, WatchListOrchestrator};
