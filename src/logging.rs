//! # Structured Logging Module
//!
//! Environment-aware structured logging for the command pipeline. Components
//! never hold a logger; they emit `tracing` events inside their own spans and
//! whatever subscriber the host installed (or [`init_structured_logging`]) picks
//! them up.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::LoggingConfig;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured console logging.
///
/// Filter precedence is `RUST_LOG`, then `config.level`, then the environment
/// default. Safe to call repeatedly and when the host already installed a
/// global subscriber.
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let directive = resolve_filter_directive(config, &environment);
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&directive))
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));

        let json_layer = config.json.then(|| {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
        });
        let text_layer = (!config.json).then(|| {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(true)
        });

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .with(text_layer);

        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            environment = %environment,
            json = config.json,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
pub fn get_environment() -> String {
    std::env::var("GEOFENCER_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
pub fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

fn resolve_filter_directive(config: &LoggingConfig, environment: &str) -> String {
    config
        .level
        .clone()
        .filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| get_log_level(environment))
}

/// Log structured data for command lifecycle steps
pub fn log_command_operation(
    operation: &str,
    command_id: Uuid,
    kind: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        command_id = %command_id,
        kind = %kind,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📡 COMMAND_OPERATION"
    );
}

/// Log structured data for watch-list store operations
pub fn log_store_operation(
    operation: &str,
    watch_count: usize,
    status: &str,
    duration_ms: Option<u64>,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        watch_count = watch_count,
        status = %status,
        duration_ms = duration_ms,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "💾 STORE_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}
