// packages/listener/src/transport/host.rs
//! Swappable transport entry points
//!
//! Callers never hold a transport directly; they go through the host, the
//! same way code in a client runtime calls its global request functions.
//! Installing interception replaces the entry point with a decorator around
//! the previous one, once.

use crate::interception::pipeline::RequestPipeline;
use crate::transport::fetch::{FetchRequest, FetchResponse, FetchTransport, InterceptedFetch};
use crate::transport::xhr::{InterceptedXhrFactory, XhrFactory, XmlHttpRequest};
use crate::utils::errors::TransportError;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Holder of the current promise-style and event-style entry points
pub struct TransportHost {
    fetch: RwLock<Arc<dyn FetchTransport>>,
    xhr: RwLock<Arc<dyn XhrFactory>>,
}

impl TransportHost {
    pub fn new(fetch: Arc<dyn FetchTransport>, xhr: Arc<dyn XhrFactory>) -> Self {
        Self {
            fetch: RwLock::new(fetch),
            xhr: RwLock::new(xhr),
        }
    }

    /// Issue a promise-style call through the current entry point
    pub fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<FetchResponse, TransportError>> {
        let transport = Arc::clone(&*self.fetch.read());
        transport.fetch(request)
    }

    /// Construct an event-style request object through the current entry point
    pub fn xhr(&self) -> Box<dyn XmlHttpRequest> {
        let factory = Arc::clone(&*self.xhr.read());
        factory.create()
    }

    fn patch_fetch(&self, wrap: impl FnOnce(Arc<dyn FetchTransport>) -> Arc<dyn FetchTransport>) {
        let mut slot = self.fetch.write();
        let current = Arc::clone(&*slot);
        *slot = wrap(current);
    }

    fn patch_xhr(&self, wrap: impl FnOnce(Arc<dyn XhrFactory>) -> Arc<dyn XhrFactory>) {
        let mut slot = self.xhr.write();
        let current = Arc::clone(&*slot);
        *slot = wrap(current);
    }
}

/// One-shot installer of the pipeline decorators into a host
pub struct TransportPatcher {
    fetch_installed: AtomicBool,
    xhr_installed: AtomicBool,
}

impl TransportPatcher {
    pub fn new() -> Self {
        Self {
            fetch_installed: AtomicBool::new(false),
            xhr_installed: AtomicBool::new(false),
        }
    }

    /// Install both decorators unless already installed
    pub fn install(&self, host: &TransportHost, pipeline: &Arc<RequestPipeline>) {
        if !self.fetch_installed.swap(true, Ordering::SeqCst) {
            let pipeline = Arc::clone(pipeline);
            host.patch_fetch(move |inner| Arc::new(InterceptedFetch::new(inner, pipeline)));
            info!("Promise-style transport patched");
        }

        if !self.xhr_installed.swap(true, Ordering::SeqCst) {
            let pipeline = Arc::clone(pipeline);
            host.patch_xhr(move |inner| Arc::new(InterceptedXhrFactory::new(inner, pipeline)));
            info!("Event-style transport patched");
        }
    }

    pub fn is_installed(&self) -> bool {
        self.fetch_installed.load(Ordering::SeqCst) && self.xhr_installed.load(Ordering::SeqCst)
    }
}

impl Default for TransportPatcher {
    fn default() -> Self {
        Self::new()
    }
}
