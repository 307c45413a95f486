//! # System Constants
//!
//! Names and defaults shared across the command pipeline, the store and the
//! host bridge.

/// Event name the host listens on for transition reports
pub const TRANSITION_EVENT_NAME: &str = "GeofencerOnTransitionReceived";

/// Receiver identifier handed to the external service with every ADD command
pub const DEFAULT_TRANSITION_RECEIVER: &str = "GeofencerOnTransitionReceived";

/// Default broadcast capacity for transition events
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default sqlite location for the durable watch list
pub const DEFAULT_DATABASE_URL: &str = "sqlite://geofencer.db";

/// Environment variable prefix for configuration overrides
pub const CONFIG_ENV_PREFIX: &str = "GEOFENCER";

/// Bit values of the transition trigger mask
pub mod transition_bits {
    pub const ENTER: u8 = 1;
    pub const EXIT: u8 = 2;
    pub const DWELL: u8 = 4;
    pub const ALL: u8 = ENTER | EXIT | DWELL;
}

/// Command kinds as they appear in logs and snapshots
pub mod command_kinds {
    pub const ADD: &str = "add";
    pub const REMOVE: &str = "remove";
}
