// packages/listener/src/utils/errors.rs
//! Error types for the request listener
//!
//! Three families, each with its own handling policy:
//!
//! - [`ListenerError`]: setup failures (configuration, observability)
//! - [`TransportError`]: failures of a real transport, handed back to the
//!   original caller untouched
//! - [`SubscriberFault`]: failures raised by a subscriber callback, caught
//!   at the single-callback boundary and never rethrown

use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, ListenerError>;

/// Setup and lifecycle errors
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("observability error: {0}")]
    ObservabilityError(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<config::ConfigError> for ListenerError {
    fn from(e: config::ConfigError) -> Self {
        ListenerError::ConfigError(e.to_string())
    }
}

/// Failure of an underlying transport call
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("failed to read response body: {0}")]
    BodyFailed(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("no async runtime available to drive the request")]
    NoRuntime,

    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Failure raised by a subscriber callback
#[derive(Debug, Error)]
pub enum SubscriberFault {
    #[error("subscriber returned an error: {0}")]
    Failed(#[source] anyhow::Error),

    #[error("subscriber panicked: {0}")]
    Panicked(String),
}

impl SubscriberFault {
    /// Build a fault from a `catch_unwind` payload
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        SubscriberFault::Panicked(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_payload_messages() {
        let fault = SubscriberFault::from_panic(Box::new("boom"));
        assert_eq!(fault.to_string(), "subscriber panicked: boom");

        let fault = SubscriberFault::from_panic(Box::new(String::from("owned")));
        assert_eq!(fault.to_string(), "subscriber panicked: owned");

        let fault = SubscriberFault::from_panic(Box::new(42_u32));
        assert!(matches!(fault, SubscriberFault::Panicked(_)));
    }

    #[test]
    fn test_transport_error_converts() {
        let err: ListenerError = TransportError::NoRuntime.into();
        assert!(matches!(err, ListenerError::Transport(TransportError::NoRuntime)));
    }
}
