// packages/listener/src/transport/hyper_client.rs
//! Real transports backed by the hyper client
//!
//! - [`HyperFetch`]: promise-style calls over a pooled hyper-util client
//! - [`FetchBackedXhr`]: event-style request objects driven by any
//!   promise-style transport on a tokio task

use crate::interception::models::Headers;
use crate::transport::fetch::{FetchRequest, FetchResponse, FetchTransport};
use crate::transport::host::TransportHost;
use crate::transport::xhr::{XhrEvent, XhrFactory, XhrListener, XhrSnapshot, XmlHttpRequest};
use crate::utils::config::ClientConfig;
use crate::utils::errors::TransportError;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Methods sent upper-cased whatever the caller's spelling
const NORMALIZED_METHODS: [&str; 6] = ["DELETE", "GET", "HEAD", "OPTIONS", "POST", "PUT"];

/// Promise-style transport over hyper
#[derive(Clone)]
pub struct HyperFetch {
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HyperFetch {
    pub fn new(config: &ClientConfig) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build_http();

        Self { client }
    }

    fn build_request(request: &FetchRequest) -> Result<Request<Full<Bytes>>, TransportError> {
        let uri: Uri = request
            .url
            .parse()
            .map_err(|_| TransportError::InvalidUrl(request.url.clone()))?;
        if uri.scheme().is_none() || uri.host().is_none() {
            return Err(TransportError::InvalidUrl(request.url.clone()));
        }

        let method = Method::from_bytes(wire_method(&request.method).as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("Invalid method: {}", e)))?;

        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(headers) = &request.headers {
            for (name, value) in headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }

        builder
            .body(Full::new(request.body.clone().unwrap_or_default()))
            .map_err(|e| TransportError::InvalidRequest(format!("Request build error: {}", e)))
    }
}

impl Default for HyperFetch {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

impl FetchTransport for HyperFetch {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<FetchResponse, TransportError>> {
        let client = self.client.clone();

        async move {
            let req = Self::build_request(&request)?;
            debug!("Sending {} {}", req.method(), req.uri());

            let response = client
                .request(req)
                .await
                .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

            let (parts, body) = response.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|e| TransportError::BodyFailed(e.to_string()))?
                .to_bytes();

            let headers: Headers = parts
                .headers
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();

            Ok(FetchResponse::new(
                request.url,
                parts.status.as_u16(),
                parts.status.canonical_reason().unwrap_or(""),
                headers,
                body,
            ))
        }
        .boxed()
    }
}

fn wire_method(method: &str) -> String {
    NORMALIZED_METHODS
        .iter()
        .find(|m| m.eq_ignore_ascii_case(method))
        .map(|m| m.to_string())
        .unwrap_or_else(|| method.to_string())
}

/// Event-style request object driven by a promise-style transport
pub struct FetchBackedXhr {
    transport: Arc<dyn FetchTransport>,
    request: Option<FetchRequest>,
    listeners: Arc<Mutex<Vec<(XhrEvent, XhrListener)>>>,
    state: Arc<Mutex<XhrSnapshot>>,
}

impl FetchBackedXhr {
    pub fn new(transport: Arc<dyn FetchTransport>) -> Self {
        Self {
            transport,
            request: None,
            listeners: Arc::new(Mutex::new(Vec::new())),
            state: Arc::new(Mutex::new(XhrSnapshot::default())),
        }
    }
}

impl XmlHttpRequest for FetchBackedXhr {
    fn open(&mut self, method: &str, url: &str) -> Result<(), TransportError> {
        if method.is_empty() {
            return Err(TransportError::InvalidRequest("Empty method".to_string()));
        }
        self.request = Some(FetchRequest::new(url).method(method));
        *self.state.lock() = XhrSnapshot::default();
        Ok(())
    }

    fn set_request_header(&mut self, name: &str, value: &str) -> Result<(), TransportError> {
        let request = self.request.as_mut().ok_or_else(|| {
            TransportError::InvalidState("set_request_header called before open".to_string())
        })?;
        request
            .headers
            .get_or_insert_with(Headers::new)
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn add_event_listener(&mut self, event: XhrEvent, listener: XhrListener) {
        self.listeners.lock().push((event, listener));
    }

    fn send(&mut self, body: Option<Bytes>) -> Result<(), TransportError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;
        let mut request = self
            .request
            .take()
            .ok_or_else(|| TransportError::InvalidState("send called before open".to_string()))?;
        request.body = body;

        let transport = Arc::clone(&self.transport);
        let listeners = Arc::clone(&self.listeners);
        let state = Arc::clone(&self.state);

        handle.spawn(async move {
            let outcome = transport.fetch(request).await;

            let (event, snapshot) = {
                let mut s = state.lock();
                let event = match outcome {
                    Ok(response) => {
                        s.status = response.status;
                        s.status_text = response.status_text.clone();
                        s.response = Some(response.bytes());
                        s.response_url = Some(response.url);
                        XhrEvent::Load
                    }
                    Err(e) => {
                        warn!("Event-style request failed: {}", e);
                        XhrEvent::Error
                    }
                };
                (event, s.clone())
            };

            fire(&listeners, event, &snapshot);
            fire(&listeners, XhrEvent::LoadEnd, &snapshot);
        });

        Ok(())
    }

    fn snapshot(&self) -> XhrSnapshot {
        self.state.lock().clone()
    }
}

fn fire(listeners: &Mutex<Vec<(XhrEvent, XhrListener)>>, event: XhrEvent, snapshot: &XhrSnapshot) {
    // Listeners may register more listeners; never call them under the lock
    let matching: Vec<XhrListener> = listeners
        .lock()
        .iter()
        .filter(|(e, _)| *e == event)
        .map(|(_, l)| Arc::clone(l))
        .collect();

    for listener in matching {
        listener(snapshot);
    }
}

/// Factory for [`FetchBackedXhr`] objects
pub struct FetchBackedXhrFactory {
    transport: Arc<dyn FetchTransport>,
}

impl FetchBackedXhrFactory {
    pub fn new(transport: Arc<dyn FetchTransport>) -> Self {
        Self { transport }
    }
}

impl XhrFactory for FetchBackedXhrFactory {
    fn create(&self) -> Box<dyn XmlHttpRequest> {
        Box::new(FetchBackedXhr::new(Arc::clone(&self.transport)))
    }
}

impl TransportHost {
    /// Host whose both entry points use one pooled hyper client
    pub fn with_hyper(config: &ClientConfig) -> Self {
        let fetch: Arc<dyn FetchTransport> = Arc::new(HyperFetch::new(config));
        let xhr = Arc::new(FetchBackedXhrFactory::new(Arc::clone(&fetch)));
        TransportHost::new(fetch, xhr)
    }
}
