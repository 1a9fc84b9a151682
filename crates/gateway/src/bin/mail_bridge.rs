//! Mail bridge binary.
//!
//! Serves the payment-verified SMTP relay on port 3001. Mail goes out only
//! for requests referencing a payment transaction that exists on-chain.

#![cfg_attr(not(test), forbid(unsafe_code))]

use dinero_store_gateway::config::MailBridgeConfig;
use dinero_store_gateway::mailer::{MailerState, router};
use dinero_store_gateway::telemetry;

#[tokio::main]
async fn main() {
    let config = MailBridgeConfig::from_env().expect("Failed to load configuration");

    // Sentry must come up before the tracing subscriber.
    let _sentry_guard = telemetry::init_sentry(config.sentry_dsn.as_deref());
    telemetry::init_tracing("mail_bridge=info,tower_http=debug");

    let state = MailerState::new(&config).expect("Failed to build mailer state");
    let app = router(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("mail bridge listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await
        .expect("Server error");
}
