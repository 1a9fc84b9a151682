//! Print-provider reverse proxy.
//!
//! Forwards `{method, path, body}` under `/api/printify/` to the provider
//! REST API, injecting the server-held bearer credential. Order-creation
//! requests get their shipping address validated and re-shaped before
//! forwarding. Upstream status and body pass through verbatim; transport
//! failures become `500 {message, error}`.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

use dinero_store_core::region_code;

use crate::config::ProxyConfig;

/// Shared proxy state.
#[derive(Clone)]
pub struct ProxyState {
    inner: Arc<ProxyStateInner>,
}

struct ProxyStateInner {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl ProxyState {
    /// Build the proxy state from configuration.
    ///
    /// # Errors
    ///
    /// Returns the underlying error if the HTTP client cannot be built.
    pub fn new(config: &ProxyConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(ProxyStateInner {
                client,
                base_url: config.base_url.clone(),
                api_key: config.api_key.clone(),
            }),
        })
    }
}

/// Build the proxy router.
pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/health", get(health))
        .fallback(forward)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Forward one request to the provider.
#[instrument(skip_all, fields(method = %method, path = %uri.path()))]
async fn forward(
    State(state): State<ProxyState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let Some(provider_path) = uri.path().strip_prefix("/api/printify") else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let mut target = format!("{}{provider_path}", state.inner.base_url);
    if let Some(query) = uri.query() {
        target.push('?');
        target.push_str(query);
    }

    // Order creation gets its shipping address re-shaped before forwarding.
    let forwarded_body: Option<Vec<u8>> = if body.is_empty() {
        None
    } else if method == Method::POST && provider_path.ends_with("/orders.json") {
        match serde_json::from_slice::<Value>(&body) {
            Ok(payload) => {
                let reshaped = reshape_order_payload(payload);
                match serde_json::to_vec(&reshaped) {
                    Ok(bytes) => Some(bytes),
                    Err(err) => {
                        error!(error = %err, "failed to re-serialize order payload");
                        return transport_failure(&err.to_string());
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "rejecting order creation with unparseable body");
                return (
                    StatusCode::BAD_REQUEST,
                    axum::Json(json!({
                        "message": "Order body must be valid JSON",
                        "error": err.to_string(),
                    })),
                )
                    .into_response();
            }
        }
    } else {
        Some(body.to_vec())
    };

    let mut request = state
        .inner
        .client
        .request(method, &target)
        .bearer_auth(state.inner.api_key.expose_secret())
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(bytes) = forwarded_body {
        request = request.body(bytes);
    }

    match request.send().await {
        Ok(upstream) => {
            let status = upstream.status();
            let content_type = upstream
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("application/json")
                .to_owned();
            let bytes = upstream.bytes().await.unwrap_or_default();

            if !status.is_success() {
                warn!(status = %status, "provider returned non-success status");
            }

            // Upstream status and body pass through verbatim.
            (status, [(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(err) => {
            error!(error = %err, "transport failure talking to provider");
            transport_failure(&err.to_string())
        }
    }
}

fn transport_failure(detail: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(json!({
            "message": "Error communicating with print provider",
            "error": detail,
        })),
    )
        .into_response()
}

/// Re-shape an order-creation payload's shipping address.
///
/// Normalizes the region to code form, fixes the country to the single
/// supported ship-to country, defaults optional fields to empty strings,
/// and mirrors the result into `address_to`. Payloads without an address
/// object pass through untouched - the provider's own validation answers
/// those.
fn reshape_order_payload(mut payload: Value) -> Value {
    let Some(address) = payload.get("shipping_address").filter(|a| a.is_object()) else {
        return payload;
    };

    let field = |name: &str| -> String {
        address
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned()
    };

    let raw_state = field("state");
    let state = region_code(&raw_state).map_or_else(
        || {
            warn!(region = %raw_state, "unknown region in order payload; passing through");
            raw_state.clone()
        },
        ToOwned::to_owned,
    );

    let reshaped = json!({
        "first_name": field("first_name"),
        "last_name": field("last_name"),
        "address1": field("address1"),
        "address2": field("address2"),
        "city": field("city"),
        "state": state,
        "country": "US",
        "zip": field("zip"),
        "phone": field("phone"),
        "email": field("email"),
    });

    info!("re-shaped order shipping address");
    if let Some(map) = payload.as_object_mut() {
        map.insert("shipping_address".to_owned(), reshaped.clone());
        map.insert("address_to".to_owned(), reshaped);
    }
    payload
}
