// packages/listener/src/observability/mod.rs
//! Tracing setup and metric names
//!
//! Metrics go through the `metrics` facade; without an installed recorder
//! the counters are no-ops, so embedding applications choose the exporter.

use crate::utils::config::ObservabilityConfig;
use crate::utils::errors::{ListenerError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Intercepted calls, labelled by `transport`
pub const CALLS_TOTAL: &str = "listener_calls_total";

/// Swallowed subscriber failures, labelled by `phase`
pub const SUBSCRIBER_FAULTS_TOTAL: &str = "listener_subscriber_faults_total";

/// `stop()` / `clear_subscribers()` refused by an outstanding block, labelled by `operation`
pub const GUARD_REFUSALS_TOTAL: &str = "listener_guard_refusals_total";

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ListenerError::ObservabilityError(format!("Invalid log filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        registry.with(fmt::layer().json().with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    result.map_err(|e| {
        ListenerError::ObservabilityError(format!("Failed to install subscriber: {}", e))
    })
}

/// Truncate a body for logging
pub(crate) fn preview_body(body: &[u8], max: usize) -> String {
    let slice = &body[..body.len().min(max)];
    let text = String::from_utf8_lossy(slice);
    if body.len() > max {
        format!("{}... ({} bytes total)", text, body.len())
    } else {
        text.into_owned()
    }
}
