// packages/listener/src/transport/xhr.rs
//! Event-style transport
//!
//! A request object goes through construct / open / send steps and reports
//! completion through events instead of a single deferred value.
//!
//! [`InterceptedXhr`] forwards every call to the real object as it happens,
//! so validation and listener bookkeeping stay native. It also keeps a copy
//! of `open` and the request headers. While listening, `send` folds that copy
//! through the pre-send subscribers, then re-opens the real object with the
//! result. Completion is observed through a `Load` listener registered on the
//! real object at construction, ahead of any caller listener.

use crate::interception::models::{Headers, RequestModel, ResponseModel};
use crate::interception::pipeline::{RequestPipeline, TransportKind};
use crate::utils::errors::TransportError;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, Span};

/// Completion events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XhrEvent {
    /// A response was produced, whatever its status
    Load,
    /// The request failed before any response was produced
    Error,
    /// Fired after `Load` or `Error`
    LoadEnd,
}

/// Observable state of a request object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XhrSnapshot {
    /// `0` until a response arrives
    pub status: u16,
    pub status_text: String,
    pub response: Option<Bytes>,
    pub response_url: Option<String>,
}

impl XhrSnapshot {
    pub fn response_text(&self) -> Option<String> {
        self.response
            .as_ref()
            .map(|body| String::from_utf8_lossy(body).into_owned())
    }

    fn to_model(&self) -> ResponseModel {
        ResponseModel::from_parts(
            self.status,
            self.status_text.clone(),
            self.response.clone().unwrap_or_default(),
        )
    }
}

/// Event listener; receives the object's state at dispatch time
pub type XhrListener = Arc<dyn Fn(&XhrSnapshot) + Send + Sync>;

/// An event-style request object
pub trait XmlHttpRequest: Send {
    fn open(&mut self, method: &str, url: &str) -> Result<(), TransportError>;

    fn set_request_header(&mut self, name: &str, value: &str) -> Result<(), TransportError>;

    fn add_event_listener(&mut self, event: XhrEvent, listener: XhrListener);

    /// Start the request; completion is reported through events
    fn send(&mut self, body: Option<Bytes>) -> Result<(), TransportError>;

    fn snapshot(&self) -> XhrSnapshot;
}

/// Constructor for request objects
pub trait XhrFactory: Send + Sync {
    fn create(&self) -> Box<dyn XmlHttpRequest>;
}

struct PendingOpen {
    method: String,
    url: String,
}

/// Request awaiting its `Load` event
struct PendingArrival {
    request: RequestModel,
    span: Span,
}

/// Decorator routing `send` through the pipeline while listening
pub struct InterceptedXhr {
    inner: Box<dyn XmlHttpRequest>,
    pipeline: Arc<RequestPipeline>,
    opened: Option<PendingOpen>,
    headers: Option<Headers>,
    arrival: Arc<Mutex<Option<PendingArrival>>>,
}

impl InterceptedXhr {
    pub fn new(mut inner: Box<dyn XmlHttpRequest>, pipeline: Arc<RequestPipeline>) -> Self {
        let arrival: Arc<Mutex<Option<PendingArrival>>> = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&arrival);
        let observer = Arc::clone(&pipeline);
        inner.add_event_listener(
            XhrEvent::Load,
            Arc::new(move |snapshot: &XhrSnapshot| {
                let pending = slot.lock().take();
                if let Some(PendingArrival { request, span }) = pending {
                    span.in_scope(|| observer.after_arrival(request, snapshot.to_model()));
                }
            }),
        );

        // No response: the call ends without an arrival
        let slot = Arc::clone(&arrival);
        inner.add_event_listener(
            XhrEvent::Error,
            Arc::new(move |_: &XhrSnapshot| {
                slot.lock().take();
            }),
        );

        Self {
            inner,
            pipeline,
            opened: None,
            headers: None,
            arrival,
        }
    }

    fn reopen(&mut self, request: &RequestModel) -> Result<(), TransportError> {
        self.inner.open(&request.method, &request.url)?;
        if let Some(headers) = &request.headers {
            for (name, value) in headers {
                self.inner.set_request_header(name, value)?;
            }
        }
        Ok(())
    }
}

impl XmlHttpRequest for InterceptedXhr {
    fn open(&mut self, method: &str, url: &str) -> Result<(), TransportError> {
        self.inner.open(method, url)?;
        // Re-opening resets previously set headers, as on the real object
        self.opened = Some(PendingOpen {
            method: method.to_string(),
            url: url.to_string(),
        });
        self.headers = None;
        Ok(())
    }

    fn set_request_header(&mut self, name: &str, value: &str) -> Result<(), TransportError> {
        self.inner.set_request_header(name, value)?;
        if self.opened.is_some() {
            self.headers
                .get_or_insert_with(Headers::new)
                .insert(name.to_string(), value.to_string());
        }
        Ok(())
    }

    fn add_event_listener(&mut self, event: XhrEvent, listener: XhrListener) {
        self.inner.add_event_listener(event, listener);
    }

    fn send(&mut self, body: Option<Bytes>) -> Result<(), TransportError> {
        let headers = self.headers.take();
        let opened = match self.opened.take() {
            Some(opened) if self.pipeline.is_listening() => opened,
            // Stopped, or never opened: the real object handles it as is
            _ => {
                self.arrival.lock().take();
                return self.inner.send(body);
            }
        };

        let original = RequestModel {
            method: opened.method,
            url: opened.url,
            body,
            headers,
        };

        let span = self.pipeline.call_span(TransportKind::Xhr);
        let request = span.in_scope(|| self.pipeline.before_send(original));

        self.reopen(&request)?;
        debug!("Sending {} {}", request.method, request.url);

        let body = request.body.clone();
        *self.arrival.lock() = Some(PendingArrival { request, span });
        let sent = self.inner.send(body);
        if sent.is_err() {
            self.arrival.lock().take();
        }
        sent
    }

    fn snapshot(&self) -> XhrSnapshot {
        self.inner.snapshot()
    }
}

/// Factory producing [`InterceptedXhr`] objects around another factory
pub struct InterceptedXhrFactory {
    inner: Arc<dyn XhrFactory>,
    pipeline: Arc<RequestPipeline>,
}

impl InterceptedXhrFactory {
    pub fn new(inner: Arc<dyn XhrFactory>, pipeline: Arc<RequestPipeline>) -> Self {
        Self { inner, pipeline }
    }
}

impl XhrFactory for InterceptedXhrFactory {
    fn create(&self) -> Box<dyn XmlHttpRequest> {
        Box::new(InterceptedXhr::new(
            self.inner.create(),
            Arc::clone(&self.pipeline),
        ))
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use parking_lot::Mutex;

    /// Calls recorded by [`RecordingXhr`]
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Open(String, String),
        Header(String, String),
        Listen(XhrEvent),
        Send(Option<Bytes>),
    }

    /// Synchronous request object that completes inside `send`
    pub struct RecordingXhr {
        pub log: Arc<Mutex<Vec<Call>>>,
        listeners: Vec<(XhrEvent, XhrListener)>,
        opened: bool,
        fail: bool,
        snapshot: XhrSnapshot,
    }

    impl RecordingXhr {
        pub fn new(log: Arc<Mutex<Vec<Call>>>, fail: bool) -> Self {
            Self {
                log,
                listeners: Vec::new(),
                opened: false,
                fail,
                snapshot: XhrSnapshot::default(),
            }
        }

        fn fire(&self, event: XhrEvent) {
            for (e, listener) in &self.listeners {
                if *e == event {
                    listener(&self.snapshot);
                }
            }
        }
    }

    impl XmlHttpRequest for RecordingXhr {
        fn open(&mut self, method: &str, url: &str) -> Result<(), TransportError> {
            if method.is_empty() {
                return Err(TransportError::InvalidRequest("Empty method".into()));
            }
            self.log.lock().push(Call::Open(method.into(), url.into()));
            self.opened = true;
            self.snapshot.response_url = Some(url.to_string());
            Ok(())
        }

        fn set_request_header(&mut self, name: &str, value: &str) -> Result<(), TransportError> {
            if !self.opened {
                return Err(TransportError::InvalidState("header before open".into()));
            }
            self.log.lock().push(Call::Header(name.into(), value.into()));
            Ok(())
        }

        fn add_event_listener(&mut self, event: XhrEvent, listener: XhrListener) {
            self.log.lock().push(Call::Listen(event));
            self.listeners.push((event, listener));
        }

        fn send(&mut self, body: Option<Bytes>) -> Result<(), TransportError> {
            if !self.opened {
                return Err(TransportError::InvalidState("send before open".into()));
            }
            self.log.lock().push(Call::Send(body));
            self.opened = false;

            if self.fail {
                self.fire(XhrEvent::Error);
            } else {
                self.snapshot.status = 200;
                self.snapshot.status_text = "OK".to_string();
                self.snapshot.response = Some(Bytes::from_static(br#"{"ok":true}"#));
                self.fire(XhrEvent::Load);
            }
            self.fire(XhrEvent::LoadEnd);
            Ok(())
        }

        fn snapshot(&self) -> XhrSnapshot {
            self.snapshot.clone()
        }
    }
}
