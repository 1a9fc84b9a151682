//! Print-provider fulfillment requests.
//!
//! Called only with a confirmed payment in hand. Normalizes the shipping
//! address to the provider's encoding, builds one order-creation request,
//! and sends it through the gateway proxy. A single attempt: failure is
//! surfaced to the orchestrator, which records the order anyway and leaves
//! follow-up to the operator.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use dinero_store_core::{ShippingAddress, country_code, region_code};

use crate::models::{CartItem, CustomerProfile, FulfillmentLineItem, FulfillmentOrder};

/// The single supported ship-to country.
const SUPPORTED_COUNTRY: &str = "US";
const SUPPORTED_COUNTRY_NAME: &str = "United States";

/// Standard shipping method id at the provider.
const STANDARD_SHIPPING: u32 = 1;

/// Errors from fulfillment order creation.
#[derive(Debug, thiserror::Error)]
pub enum FulfillmentError {
    /// Transport failure talking to the proxy.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider (or proxy) answered with a non-success status.
    #[error("provider rejected order: HTTP {status}: {message}")]
    Provider { status: u16, message: String },

    /// A cart line has no usable numeric variant id.
    #[error("invalid line item: {0}")]
    InvalidLineItem(String),
}

/// Seam for provider order creation.
#[async_trait]
pub trait FulfillmentApi: Send + Sync {
    /// Create a provider order for a paid cart snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`FulfillmentError`]; the caller treats every variant as
    /// recoverable.
    async fn create_order(
        &self,
        items: &[CartItem],
        address: &ShippingAddress,
    ) -> Result<FulfillmentOrder, FulfillmentError>;
}

/// Shipping address in the provider's wire shape: optional fields become
/// empty strings, region and country are code-form.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireAddress {
    first_name: String,
    last_name: String,
    address1: String,
    address2: String,
    city: String,
    state: String,
    country: String,
    zip: String,
    email: String,
    phone: String,
}

/// Normalize an address for the provider.
///
/// Country is fixed to the single supported country. The region name maps
/// through the static state table; names already in code form pass through;
/// unknown names pass through unchanged with a warning - the provider's
/// rejection is recoverable downstream, so this is not a checkout blocker.
#[must_use]
pub fn normalize_address(address: &ShippingAddress) -> ShippingAddress {
    let state = region_code(&address.state).map_or_else(
        || {
            warn!(region = %address.state, "unknown region name; passing through unnormalized");
            address.state.clone()
        },
        ToOwned::to_owned,
    );

    ShippingAddress {
        state,
        country: SUPPORTED_COUNTRY.to_owned(),
        ..address.clone()
    }
}

fn wire_address(normalized: &ShippingAddress) -> WireAddress {
    WireAddress {
        first_name: normalized.first_name.clone(),
        last_name: normalized.last_name.clone(),
        address1: normalized.address1.clone(),
        address2: normalized.address2.clone().unwrap_or_default(),
        city: normalized.city.clone(),
        state: normalized.state.clone(),
        country: normalized.country.clone(),
        zip: normalized.zip.clone(),
        email: normalized.email.to_string(),
        phone: normalized.phone.clone().unwrap_or_default(),
    }
}

fn customer_profile(normalized: &ShippingAddress) -> CustomerProfile {
    CustomerProfile {
        first_name: normalized.first_name.clone(),
        last_name: normalized.last_name.clone(),
        email: normalized.email.clone(),
        phone: normalized.phone.clone().unwrap_or_default(),
        country_code: country_code(&normalized.country)
            .unwrap_or(SUPPORTED_COUNTRY)
            .to_owned(),
        country_name: SUPPORTED_COUNTRY_NAME.to_owned(),
        region: normalized.state.clone(),
        address1: normalized.address1.clone(),
        address2: normalized.address2.clone().unwrap_or_default(),
        city: normalized.city.clone(),
        zip: normalized.zip.clone(),
    }
}

/// Build provider line items from the cart snapshot.
///
/// The provider wants numeric variant ids; a cart line without a variant
/// falls back to its product id, matching how single-variant products are
/// listed.
fn line_items(items: &[CartItem]) -> Result<Vec<FulfillmentLineItem>, FulfillmentError> {
    items
        .iter()
        .map(|item| {
            let raw = item
                .variant_id
                .as_ref()
                .map_or_else(|| item.id.as_str(), |v| v.as_str());
            let variant_id = raw.parse::<u64>().map_err(|_| {
                FulfillmentError::InvalidLineItem(format!(
                    "variant id {raw:?} for product {} is not numeric",
                    item.id
                ))
            })?;

            Ok(FulfillmentLineItem {
                product_id: item.id.clone(),
                variant_id,
                quantity: item.quantity,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ProviderOrderResponse {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Provider order client, talking through the gateway proxy.
pub struct ProviderClient {
    client: reqwest::Client,
    proxy_url: String,
    shop_id: String,
}

impl ProviderClient {
    /// Create a client against the gateway proxy.
    ///
    /// # Errors
    ///
    /// Returns [`FulfillmentError::Http`] if the HTTP client cannot be
    /// built.
    pub fn new(
        proxy_url: impl Into<String>,
        shop_id: impl Into<String>,
    ) -> Result<Self, FulfillmentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            proxy_url: proxy_url.into(),
            shop_id: shop_id.into(),
        })
    }
}

#[async_trait]
impl FulfillmentApi for ProviderClient {
    #[instrument(skip(self, items, address), fields(lines = items.len()))]
    async fn create_order(
        &self,
        items: &[CartItem],
        address: &ShippingAddress,
    ) -> Result<FulfillmentOrder, FulfillmentError> {
        let normalized = normalize_address(address);
        let line_items = line_items(items)?;
        let wire = wire_address(&normalized);
        let customer = customer_profile(&normalized);
        let external_id = format!("order_{}", Uuid::new_v4().simple());

        let payload = json!({
            "external_id": &external_id,
            "line_items": &line_items,
            "shipping_method": STANDARD_SHIPPING,
            "send_shipping_notification": true,
            "shipping_address": &wire,
            "address_to": &wire,
            "customer": &customer,
        });

        let url = format!(
            "{}/api/printify/shops/{}/orders.json",
            self.proxy_url, self.shop_id
        );

        let response = self.client.post(&url).json(&payload).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ProviderErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or(body);
            return Err(FulfillmentError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let body: ProviderOrderResponse = response.json().await?;
        info!(external_id = %external_id, provider_id = ?body.id, "fulfillment order created");

        Ok(FulfillmentOrder {
            external_id,
            provider_id: body.id,
            line_items,
            address: normalized,
            customer,
        })
    }
}
