// packages/listener/src/interception/pipeline.rs
//! Per-call interception pipeline
//!
//! Every intercepted call goes through four phases:
//!
//! ```text
//! A: native args ──► RequestModel
//! B: RequestModel ──► pre-send fold (each subscriber may patch) ──► final RequestModel
//! C: final RequestModel ──► real transport ──► real result
//! D: real result ──► ResponseModel ──► post-arrival fan-out (observe only)
//! ```
//!
//! The caller always gets the real result back. A subscriber that returns
//! an error or panics is logged and skipped; it never reaches the caller
//! and never stops its siblings.

use crate::interception::models::{RequestModel, RequestPatch, RequestResponseModel, ResponseModel};
use crate::interception::registry::{SubscriberRegistry, Subscription};
use crate::interception::state::ListeningStateMachine;
use crate::observability::{
    preview_body, CALLS_TOTAL, GUARD_REFUSALS_TOTAL, SUBSCRIBER_FAULTS_TOTAL,
};
use crate::utils::config::ListenerConfig;
use crate::utils::errors::SubscriberFault;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, debug_span, warn, Instrument, Span};
use ulid::Ulid;

/// Pre-send subscriber: may return a patch to merge onto the working request
pub type BeforeSendCallback =
    dyn Fn(&RequestModel) -> anyhow::Result<Option<RequestPatch>> + Send + Sync;

/// Post-arrival subscriber: observes the settled request/response pair
pub type AfterArrivalCallback = dyn Fn(&RequestResponseModel) -> anyhow::Result<()> + Send + Sync;

/// Which native transport a call came through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Promise-style, single deferred result
    Fetch,
    /// Event-style, open/send plus completion events
    Xhr,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Fetch => "fetch",
            TransportKind::Xhr => "xhr",
        }
    }
}

/// The shared interception context: state machine plus both registries
pub struct RequestPipeline {
    config: ListenerConfig,
    state: Arc<ListeningStateMachine>,
    before_send: SubscriberRegistry<BeforeSendCallback>,
    after_arrival: SubscriberRegistry<AfterArrivalCallback>,
}

impl RequestPipeline {
    pub fn new(config: ListenerConfig) -> Self {
        let state = Arc::new(ListeningStateMachine::new());

        Self {
            config,
            before_send: SubscriberRegistry::new("before_send", Arc::clone(&state)),
            after_arrival: SubscriberRegistry::new("after_arrival", Arc::clone(&state)),
            state,
        }
    }

    pub fn state(&self) -> &Arc<ListeningStateMachine> {
        &self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state.is_listening()
    }

    pub fn before_send_registry(&self) -> &SubscriberRegistry<BeforeSendCallback> {
        &self.before_send
    }

    pub fn after_arrival_registry(&self) -> &SubscriberRegistry<AfterArrivalCallback> {
        &self.after_arrival
    }

    pub fn subscribe_before_send<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&RequestModel) -> anyhow::Result<Option<RequestPatch>> + Send + Sync + 'static,
    {
        self.before_send.subscribe(Arc::new(callback))
    }

    pub fn subscribe_after_arrival<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&RequestResponseModel) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.after_arrival.subscribe(Arc::new(callback))
    }

    /// Empty both registries unless the listening state is blocked
    pub fn clear_subscribers(&self) -> bool {
        if self.state.is_blocked() {
            metrics::counter!(GUARD_REFUSALS_TOTAL, "operation" => "clear_subscribers").increment(1);
            return false;
        }
        let before = self.before_send.clear();
        let after = self.after_arrival.clear();
        before && after
    }

    /// Span correlating the phases of one call
    pub fn call_span(&self, kind: TransportKind) -> Span {
        metrics::counter!(CALLS_TOTAL, "transport" => kind.as_str()).increment(1);
        debug_span!("http_call", call_id = %Ulid::new(), transport = kind.as_str())
    }

    /// Phase B: fold the request through the pre-send subscribers
    ///
    /// Returns the request unchanged when not listening.
    pub fn before_send(&self, request: RequestModel) -> RequestModel {
        if !self.is_listening() {
            return request;
        }

        let mut working = request;
        for (index, callback) in self.before_send.snapshot().iter().enumerate() {
            match guarded(|| callback(&working)) {
                Ok(Some(patch)) => {
                    debug!(index, ?patch, "Pre-send subscriber patched request");
                    working = working.merge(patch);
                }
                Ok(None) => {}
                Err(fault) => report_fault("before_send", index, &fault),
            }
        }

        if self.config.log_requests {
            self.log_request(&working);
        }
        working
    }

    /// Phase D: hand the settled pair to every post-arrival subscriber
    ///
    /// Skipped entirely when not listening.
    pub fn after_arrival(&self, request: RequestModel, response: ResponseModel) {
        if !self.is_listening() {
            return;
        }

        if self.config.log_responses {
            self.log_response(&request, &response);
        }

        let pair = RequestResponseModel { request, response };
        for (index, callback) in self.after_arrival.snapshot().iter().enumerate() {
            if let Err(fault) = guarded(|| callback(&pair)) {
                report_fault("after_arrival", index, &fault);
            }
        }
    }

    /// Phases B to D for a promise-style call
    ///
    /// `execute` performs the real call with the final request; `observe`
    /// reads a [`ResponseModel`] off the real result without consuming it.
    /// An `Err` from `execute` is returned as is and skips phase D.
    pub async fn dispatch<R, E, F, Fut, O>(
        &self,
        kind: TransportKind,
        request: RequestModel,
        execute: F,
        observe: O,
    ) -> Result<R, E>
    where
        F: FnOnce(RequestModel) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        O: FnOnce(&R) -> ResponseModel,
    {
        let span = self.call_span(kind);

        async move {
            let request = self.before_send(request);
            let outcome = execute(request.clone()).await;

            match &outcome {
                Ok(result) => self.after_arrival(request, observe(result)),
                Err(_) => debug!("Transport failed before producing a response"),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    fn log_request(&self, request: &RequestModel) {
        debug!("Request: {} {}", request.method, request.url);
        if let Some(headers) = &request.headers {
            for (name, value) in headers {
                debug!("  {}: {}", name, value);
            }
        }
        if let Some(body) = &request.body {
            debug!("  body: {}", preview_body(body, self.config.max_log_body_size));
        }
    }

    fn log_response(&self, request: &RequestModel, response: &ResponseModel) {
        debug!(
            "Response: {} {} -> {} {}",
            request.method, request.url, response.status_code, response.status_text
        );
        if !response.raw.is_empty() {
            debug!(
                "  body: {}",
                preview_body(&response.raw, self.config.max_log_body_size)
            );
        }
    }
}

impl Default for RequestPipeline {
    fn default() -> Self {
        Self::new(ListenerConfig::default())
    }
}

/// Run one subscriber behind an error and panic boundary
fn guarded<R>(f: impl FnOnce() -> anyhow::Result<R>) -> Result<R, SubscriberFault> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(SubscriberFault::Failed(e)),
        Err(payload) => Err(SubscriberFault::from_panic(payload)),
    }
}

fn report_fault(phase: &'static str, index: usize, fault: &SubscriberFault) {
    warn!(phase, index, "Ignoring subscriber failure: {}", fault);
    metrics::counter!(SUBSCRIBER_FAULTS_TOTAL, "phase" => phase).increment(1);
}
