// packages/listener/src/interception/mod.rs
//! Request interception engine
//!
//! - **State**: listening on/off plus the block guard
//! - **Registry**: ordered subscriber sets with revocable handles
//! - **Models**: request/response shapes handed to subscribers
//! - **Pipeline**: per-call pre-send fold and post-arrival fan-out
//! - **Listener**: public surface tying the pipeline to a transport host
//!
//! # Architecture
//!
//! ```text
//! Caller (unmodified)
//!     │
//!     └─ native call ─► patched entry point ─┬─ listening ─► RequestPipeline ─► real transport
//!                                            └─ stopped ───────────────────────► real transport
//! ```

pub mod listener;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod state;

// Re-export commonly used types
pub use listener::HttpRequestListener;
pub use models::{Headers, RequestModel, RequestPatch, RequestResponseModel, ResponseModel};
pub use pipeline::{AfterArrivalCallback, BeforeSendCallback, RequestPipeline, TransportKind};
pub use registry::{SubscriberRegistry, Subscription};
pub use state::{BlockHandle, ListeningStateMachine};
