// packages/listener/tests/common/mod.rs
//! Fixture HTTP server and helpers shared by the integration suites

#![allow(dead_code)]

use bytes::Bytes;
use http_body_util::Full;
use http_request_listener::utils::config::ClientConfig;
use http_request_listener::{HttpRequestListener, TransportHost, XhrEvent, XmlHttpRequest};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Contents served at `/posts`
pub fn posts() -> Value {
    json!([
        { "id": 1, "title": "json-server", "author": "typicode" }
    ])
}

/// Fixture server on an ephemeral port
pub struct FixtureServer {
    pub addr: SocketAddr,
}

impl FixtureServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    continue;
                };
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let _ = http1::Builder::new()
                        .serve_connection(io, service_fn(handle))
                        .await;
                });
            }
        });

        Self { addr }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn posts_url(&self) -> String {
        self.url("/posts")
    }
}

async fn handle(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/posts") => Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(posts().to_string()))),
        (_, "/posts") => Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .body(Full::new(Bytes::new())),
        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from_static(b"Not Found"))),
    };

    Ok(response.expect("static response parts are valid"))
}

/// Listener over a fresh hyper host
pub fn hyper_listener() -> HttpRequestListener {
    HttpRequestListener::new(Arc::new(TransportHost::with_hyper(&ClientConfig::default())))
}

/// Counts invocations
#[derive(Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::SeqCst);
    }
}

/// Register `counter` as both a pre-send and a post-arrival subscriber
pub fn subscribe_both(listener: &HttpRequestListener, counter: &CallCounter) {
    let c = counter.clone();
    let _ = listener.before_send_http_request(move |_| {
        c.hit();
        Ok(None)
    });
    let c = counter.clone();
    let _ = listener.on_http_response_arrives(move |_| {
        c.hit();
        Ok(())
    });
}

/// Event-style call wrapped into a future: resolves on `Load`, fails on `Error`
pub async fn xhr_call(
    listener: &HttpRequestListener,
    method: &str,
    url: &str,
) -> Result<Value, String> {
    let mut xhr = listener.host().xhr();
    let (tx, rx) = oneshot::channel();
    let tx = Arc::new(parking_lot::Mutex::new(Some(tx)));

    let on_load = Arc::clone(&tx);
    xhr.add_event_listener(
        XhrEvent::Load,
        Arc::new(move |snapshot| {
            if let Some(tx) = on_load.lock().take() {
                let body = snapshot.response_text().unwrap_or_default();
                let _ = tx.send(Ok(serde_json::from_str(&body).unwrap_or(Value::String(body))));
            }
        }),
    );
    let on_error = Arc::clone(&tx);
    xhr.add_event_listener(
        XhrEvent::Error,
        Arc::new(move |_| {
            if let Some(tx) = on_error.lock().take() {
                let _ = tx.send(Err("network error".to_string()));
            }
        }),
    );

    xhr.open(method, url).map_err(|e| e.to_string())?;
    xhr.send(None).map_err(|e| e.to_string())?;
    rx.await.map_err(|e| e.to_string())?
}
