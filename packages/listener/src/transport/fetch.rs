// packages/listener/src/transport/fetch.rs
//! Promise-style transport
//!
//! One entry point, one deferred result. [`InterceptedFetch`] decorates any
//! [`FetchTransport`] and routes calls through the [`RequestPipeline`]
//! while listening.

use crate::interception::models::{Headers, RequestModel, ResponseModel};
use crate::interception::pipeline::{RequestPipeline, TransportKind};
use crate::utils::errors::TransportError;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Arguments of a promise-style call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: String,
    pub url: String,
    pub headers: Option<Headers>,
    pub body: Option<Bytes>,
}

impl FetchRequest {
    /// A `GET` to `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: None,
            body: None,
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Headers::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

impl From<FetchRequest> for RequestModel {
    fn from(request: FetchRequest) -> Self {
        RequestModel {
            method: request.method,
            url: request.url,
            body: request.body,
            headers: request.headers,
        }
    }
}

impl From<RequestModel> for FetchRequest {
    fn from(model: RequestModel) -> Self {
        FetchRequest {
            method: model.method,
            url: model.url,
            headers: model.headers,
            body: model.body,
        }
    }
}

/// Settled result of a promise-style call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// URL the request was actually sent to
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    body: Bytes,
}

impl FetchResponse {
    pub fn new(
        url: impl Into<String>,
        status: u16,
        status_text: impl Into<String>,
        headers: Headers,
        body: Bytes,
    ) -> Self {
        Self {
            url: url.into(),
            status,
            status_text: status_text.into(),
            headers,
            body,
        }
    }

    /// Status in the 200-299 range
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn bytes(&self) -> Bytes {
        self.body.clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body).map_err(|e| TransportError::Decode(e.to_string()))
    }

    /// Observation copy handed to post-arrival subscribers
    pub fn to_model(&self) -> ResponseModel {
        ResponseModel::from_parts(self.status, self.status_text.clone(), self.body.clone())
    }
}

/// A promise-style transport
pub trait FetchTransport: Send + Sync {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<FetchResponse, TransportError>>;
}

/// Decorator routing calls through the pipeline while listening
pub struct InterceptedFetch {
    inner: Arc<dyn FetchTransport>,
    pipeline: Arc<RequestPipeline>,
}

impl InterceptedFetch {
    pub fn new(inner: Arc<dyn FetchTransport>, pipeline: Arc<RequestPipeline>) -> Self {
        Self { inner, pipeline }
    }

    /// The undecorated transport
    pub fn inner(&self) -> &Arc<dyn FetchTransport> {
        &self.inner
    }
}

impl FetchTransport for InterceptedFetch {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<FetchResponse, TransportError>> {
        if !self.pipeline.is_listening() {
            return self.inner.fetch(request);
        }

        let inner = Arc::clone(&self.inner);
        let pipeline = Arc::clone(&self.pipeline);

        async move {
            pipeline
                .dispatch(
                    TransportKind::Fetch,
                    RequestModel::from(request),
                    |model| inner.fetch(FetchRequest::from(model)),
                    FetchResponse::to_model,
                )
                .await
        }
        .boxed()
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use parking_lot::Mutex;

    /// In-memory transport echoing the request back as JSON
    #[derive(Default)]
    pub struct EchoFetch {
        pub seen: Mutex<Vec<FetchRequest>>,
    }

    impl FetchTransport for EchoFetch {
        fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<FetchResponse, TransportError>> {
            self.seen.lock().push(request.clone());

            let outcome = if request.url.starts_with("http://") {
                let body = serde_json::json!({
                    "method": request.method,
                    "url": request.url,
                    "headers": request.headers,
                });
                Ok(FetchResponse::new(
                    request.url,
                    200,
                    "OK",
                    Headers::new(),
                    Bytes::from(body.to_string()),
                ))
            } else {
                Err(TransportError::InvalidUrl(request.url))
            };

            futures::future::ready(outcome).boxed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::EchoFetch;
    use super::*;
    use crate::interception::models::RequestPatch;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() -> (Arc<EchoFetch>, Arc<RequestPipeline>, InterceptedFetch) {
        let echo = Arc::new(EchoFetch::default());
        let pipeline = Arc::new(RequestPipeline::default());
        let fetch = InterceptedFetch::new(echo.clone(), Arc::clone(&pipeline));
        (echo, pipeline, fetch)
    }

    #[tokio::test]
    async fn test_pass_through_when_stopped() {
        let (echo, pipeline, fetch) = setup();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let _s = pipeline.subscribe_before_send(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        });

        let response = fetch.fetch(FetchRequest::new("http://a/posts")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(echo.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_patched_request_reaches_transport() {
        let (echo, pipeline, fetch) = setup();
        pipeline.state().start();
        let _s = pipeline.subscribe_before_send(|_| {
            Ok(Some(RequestPatch::new().url("http://localhost:3000/posts")))
        });

        let response = fetch.fetch(FetchRequest::new("any-url")).await.unwrap();
        assert_eq!(response.url, "http://localhost:3000/posts");
        assert_eq!(echo.seen.lock()[0].url, "http://localhost:3000/posts");
    }

    #[tokio::test]
    async fn test_transport_error_propagates_unchanged() {
        let (_echo, pipeline, fetch) = setup();
        pipeline.state().start();
        let arrived = Arc::new(AtomicUsize::new(0));
        let a = Arc::clone(&arrived);
        let _a = pipeline.subscribe_after_arrival(move |_| {
            a.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let err = fetch.fetch(FetchRequest::new("any-url")).await.unwrap_err();
        assert_eq!(err, TransportError::InvalidUrl("any-url".to_string()));
        assert_eq!(arrived.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_response_accessors() {
        let response = FetchResponse::new(
            "http://a",
            404,
            "Not Found",
            Headers::new(),
            Bytes::from_static(br#"{"error":"missing"}"#),
        );
        assert!(!response.ok());
        assert_eq!(response.text(), r#"{"error":"missing"}"#);

        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["error"], "missing");

        let model = response.to_model();
        assert_eq!(model.status_code, 404);
        assert_eq!(model.status_text, "Not Found");
    }
}
