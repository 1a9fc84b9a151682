//! Provider proxy binary.
//!
//! Serves the print-provider reverse proxy on port 3005. Holds the only
//! copy of the provider bearer credential; the storefront engine talks to
//! this process, never to the provider directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

use dinero_store_gateway::config::ProxyConfig;
use dinero_store_gateway::proxy::{ProxyState, router};
use dinero_store_gateway::telemetry;

#[tokio::main]
async fn main() {
    let config = ProxyConfig::from_env().expect("Failed to load configuration");

    // Sentry must come up before the tracing subscriber.
    let _sentry_guard = telemetry::init_sentry(config.sentry_dsn.as_deref());
    telemetry::init_tracing("provider_proxy=info,tower_http=debug");

    let state = ProxyState::new(&config).expect("Failed to build proxy state");
    let app = router(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("provider proxy listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await
        .expect("Server error");
}
