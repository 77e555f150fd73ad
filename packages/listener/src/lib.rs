// packages/listener/src/lib.rs
//! HTTP Request Listener Library
//!
//! Intercepts outbound HTTP calls made through a promise-style transport
//! and an event-style transport, and lets observers inspect and patch
//! outgoing requests and observe completed responses, without changing
//! what the original caller gets back.
//!
//! # Architecture
//!
//! - **interception**: listening state, subscriber registries, per-call pipeline
//! - **transport**: transport contracts, decorators, hyper-backed implementations
//! - **observability**: tracing setup and metric names
//! - **utils**: configuration and error types
//!
//! # Example
//!
//! ```no_run
//! use http_request_listener::{FetchRequest, HttpRequestListener, RequestPatch};
//!
//! # async fn run() -> Result<(), http_request_listener::TransportError> {
//! let listener = HttpRequestListener::global();
//! let _sub = listener.before_send_http_request(|req| {
//!     Ok(Some(RequestPatch::new().url(req.url.replace("prod", "staging"))))
//! });
//! listener.start();
//!
//! let response = listener.host().fetch(FetchRequest::new("http://prod.local/posts")).await?;
//! assert!(response.ok());
//! # Ok(())
//! # }
//! ```

// Public module exports
pub mod interception;
pub mod observability;
pub mod transport;
pub mod utils;

// Re-export commonly used types
pub use interception::{
    BlockHandle, HttpRequestListener, RequestModel, RequestPatch, RequestResponseModel,
    ResponseModel, Subscription,
};
pub use transport::{FetchRequest, FetchResponse, TransportHost, XhrEvent, XmlHttpRequest};
pub use utils::config::AppConfig;
pub use utils::errors::{ListenerError, Result, TransportError};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
