// packages/listener/src/interception/listener.rs
//! Public listener surface
//!
//! [`HttpRequestListener`] owns the interception context and the host it
//! patches. `start()` installs the transport decorators on first use and
//! turns listening on; `stop()` only turns listening off, the decorators
//! stay installed and fall through to the real transports.

use crate::interception::models::{RequestModel, RequestPatch, RequestResponseModel};
use crate::interception::pipeline::RequestPipeline;
use crate::interception::registry::Subscription;
use crate::interception::state::BlockHandle;
use crate::transport::host::{TransportHost, TransportPatcher};
use crate::utils::config::{ClientConfig, ListenerConfig};
use once_cell::sync::Lazy;
use std::sync::Arc;

static GLOBAL: Lazy<HttpRequestListener> = Lazy::new(|| {
    HttpRequestListener::new(Arc::new(TransportHost::with_hyper(&ClientConfig::default())))
});

/// Interception engine bound to one [`TransportHost`]
pub struct HttpRequestListener {
    host: Arc<TransportHost>,
    pipeline: Arc<RequestPipeline>,
    patcher: TransportPatcher,
}

impl HttpRequestListener {
    pub fn new(host: Arc<TransportHost>) -> Self {
        Self::with_config(host, ListenerConfig::default())
    }

    pub fn with_config(host: Arc<TransportHost>, config: ListenerConfig) -> Self {
        let start_listening = config.start_listening;
        let listener = Self {
            host,
            pipeline: Arc::new(RequestPipeline::new(config)),
            patcher: TransportPatcher::new(),
        };

        if start_listening {
            listener.start();
        }
        listener
    }

    /// Process-wide listener over a hyper-backed host
    pub fn global() -> &'static HttpRequestListener {
        &GLOBAL
    }

    /// Entry points to issue calls through
    pub fn host(&self) -> &Arc<TransportHost> {
        &self.host
    }

    pub fn pipeline(&self) -> &Arc<RequestPipeline> {
        &self.pipeline
    }

    /// Install the decorators if needed and start listening
    pub fn start(&self) {
        self.patcher.install(&self.host, &self.pipeline);
        self.pipeline.state().start();
    }

    /// Stop listening; `false` if refused by an outstanding block
    pub fn stop(&self) -> bool {
        self.pipeline.state().stop()
    }

    pub fn is_listening(&self) -> bool {
        self.pipeline.is_listening()
    }

    pub fn is_blocked(&self) -> bool {
        self.pipeline.state().is_blocked()
    }

    /// Prevent `stop()` and `clear_subscribers()` until the handle is released
    pub fn block_listening_state(&self) -> BlockHandle {
        self.pipeline.state().block()
    }

    /// Subscribe to outgoing requests; the callback may return a patch
    pub fn before_send_http_request<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&RequestModel) -> anyhow::Result<Option<RequestPatch>> + Send + Sync + 'static,
    {
        self.pipeline.subscribe_before_send(callback)
    }

    /// Subscribe to settled request/response pairs
    pub fn on_http_response_arrives<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&RequestResponseModel) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.pipeline.subscribe_after_arrival(callback)
    }

    /// Empty both registries; `false` if refused by an outstanding block
    pub fn clear_subscribers(&self) -> bool {
        self.pipeline.clear_subscribers()
    }

    /// Registered (pre-send, post-arrival) subscribers
    pub fn subscriber_counts(&self) -> (usize, usize) {
        (
            self.pipeline.before_send_registry().len(),
            self.pipeline.after_arrival_registry().len(),
        )
    }
}
