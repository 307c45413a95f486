#![allow(clippy::doc_markdown)] // Allow technical terms like SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Geofencer Core
//!
//! Watch-list management for a platform geofencing service: register, remove
//! and enumerate watched regions, and report boundary transitions back to the
//! host application.
//!
//! ## Architecture
//!
//! Geometry and transition detection live in the external service. This crate
//! owns the **command pipeline** in front of it: a serialized, connection-gated
//! queue that issues add/remove mutations against a lazily established service
//! session, with at most one mutation in flight and exactly one completion per
//! submitted command.
//!
//! ```text
//! host -> GeofencerBridge -> WatchListOrchestrator -> WatchListStore
//!                                    |
//!                                    v
//!                             CommandExecutor -> ConnectionSession -> GeofencingService
//! ```
//!
//! ## Module Organization
//!
//! - [`execution`] - `ConnectionSession`, `Command`, `CommandExecutor`
//! - [`state_machine`] - command and session states, transition table
//! - [`orchestration`] - store-first sequencing, transitions, bootstrap
//! - [`database`] - durable watch store (sqlite) and in-memory store
//! - [`services`] - external geofencing service boundary
//! - [`events`] - transition event broadcast to the host
//! - [`bridge`] - host-facing adapter
//! - [`config`] - layered configuration
//! - [`error`] - structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use geofencer_core::config::ConfigManager;
//! use geofencer_core::orchestration::GeofencerSystem;
//! use geofencer_core::models::WatchDefinition;
//! use geofencer_core::services::GeofencingService;
//! use std::sync::Arc;
//!
//! # async fn example(service: Arc<dyn GeofencingService>) -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let system = GeofencerSystem::restore_on_boot(manager.config(), service).await?;
//!
//! let outcome = system
//!     .orchestrator()
//!     .add_watches_tracked(vec![WatchDefinition::new("home", 52.52, 13.40, 150.0)])
//!     .await?
//!     .wait()
//!     .await?;
//! println!("registered: {}", outcome.is_success());
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod events;
pub mod execution;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod services;
pub mod state_machine;
pub mod test_utils;
pub mod validation;

pub use bridge::GeofencerBridge;
pub use config::{ConfigManager, GeofencerConfig};
pub use database::{InMemoryWatchListStore, SqliteWatchListStore, WatchListStore};
pub use error::{GeofencerError, Result};
pub use events::{TransitionEvent, TransitionEventPublisher};
pub use execution::{Command, CommandExecutor, CommandFailure, CommandOutcome};
pub use models::{NotificationPayload, TransitionType, WatchDefinition};
pub use orchestration::{GeofencerSystem, TransitionHandler, WatchListOrchestrator};
pub use services::{GeofencingService, ServiceError, TransitionTarget};
pub use state_machine::{CommandState, SessionStatus};
