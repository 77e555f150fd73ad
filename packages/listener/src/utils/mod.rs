// packages/listener/src/utils/mod.rs
//! Shared utilities: configuration and error types

pub mod config;
pub mod errors;

pub use self::config::{AppConfig, ClientConfig, ListenerConfig, ObservabilityConfig};
pub use errors::{ListenerError, Result, SubscriberFault, TransportError};
