//! # Watch Models
//!
//! Data carried through the pipeline: the caller-defined watch, its trigger mask
//! and the opaque notification payload stored alongside it.

pub mod notification;
pub mod transition_type;
pub mod watch_definition;

pub use notification::NotificationPayload;
pub use transition_type::TransitionType;
pub use watch_definition::WatchDefinition;
