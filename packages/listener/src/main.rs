// packages/listener/src/main.rs
//! HTTP Request Listener
//!
//! Issues one GET per configured target through an intercepted hyper host
//! and logs every request and response the listener observes.

use anyhow::Result;
use http_request_listener::observability::init_tracing;
use http_request_listener::utils::config::AppConfig;
use http_request_listener::{FetchRequest, HttpRequestListener, TransportHost};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize observability
    init_tracing(&config.observability)?;

    info!("Starting HTTP request listener v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {:?}", config);

    let host = Arc::new(TransportHost::with_hyper(&config.client));
    let listener = HttpRequestListener::with_config(Arc::clone(&host), config.listener.clone());

    let _requests = listener.before_send_http_request(|req| {
        info!("-> {} {}", req.method, req.url);
        Ok(None)
    });
    let _responses = listener.on_http_response_arrives(|pair| {
        info!(
            "<- {} {} {} {}",
            pair.request.method,
            pair.request.url,
            pair.response.status_code,
            pair.response.status_text
        );
        Ok(())
    });
    listener.start();

    if config.targets.is_empty() {
        warn!("No targets configured; set `targets` or LISTENER__TARGETS");
    }

    let mut failures = 0;
    for target in &config.targets {
        match host.fetch(FetchRequest::new(target.as_str())).await {
            Ok(response) => info!("{} answered {}", response.url, response.status),
            Err(e) => {
                error!("Request to {} failed: {}", target, e);
                failures += 1;
            }
        }
    }

    if !listener.stop() {
        warn!("Listener still blocked; left listening");
    }
    info!(
        "Done: {} target(s), {} failure(s)",
        config.targets.len(),
        failures
    );
    Ok(())
}
