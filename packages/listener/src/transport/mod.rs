// packages/listener/src/transport/mod.rs
//! Transports and their interception decorators
//!
//! - **Fetch**: promise-style contract and its pipeline decorator
//! - **XHR**: event-style contract and its pipeline decorator
//! - **Host**: swappable entry points plus the one-shot patcher
//! - **Hyper Client**: real transports over hyper
//!
//! # Architecture
//!
//! ```text
//! Caller
//!     │
//!     ├─ host.fetch(req) ──► InterceptedFetch ──► HyperFetch
//!     └─ host.xhr()      ──► InterceptedXhr   ──► FetchBackedXhr ──► HyperFetch
//!                                 │
//!                                 └─ RequestPipeline (while listening)
//! ```

pub mod fetch;
pub mod host;
pub mod hyper_client;
pub mod xhr;

// Re-export commonly used types
pub use fetch::{FetchRequest, FetchResponse, FetchTransport, InterceptedFetch};
pub use host::{TransportHost, TransportPatcher};
pub use hyper_client::{FetchBackedXhr, FetchBackedXhrFactory, HyperFetch};
pub use xhr::{
    InterceptedXhr, InterceptedXhrFactory, XhrEvent, XhrFactory, XhrListener, XhrSnapshot,
    XmlHttpRequest,
};
