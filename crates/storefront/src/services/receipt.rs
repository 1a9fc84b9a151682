//! Receipt notification client.
//!
//! Renders the plain-text receipt and hands it to the mail bridge, which
//! verifies the payment on-chain before relaying to SMTP. Strictly
//! best-effort: the orchestrator logs a failure and completes the order
//! regardless.

use std::time::Duration;

use askama::Template;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use dinero_store_core::{ShippingAddress, WalletAddress};

use crate::models::{CartItem, OrderRecord};

/// Errors from receipt dispatch.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Transport failure talking to the mail bridge.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Receipt template failed to render.
    #[error("template error: {0}")]
    Template(#[from] askama::Error),

    /// The bridge answered but reported failure.
    #[error("mail bridge refused: {0}")]
    Bridge(String),
}

/// Seam for receipt dispatch.
#[async_trait]
pub trait ReceiptSender: Send + Sync {
    /// Send the buyer their receipt for a recorded order.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`]; callers treat every variant as
    /// ignorable-beyond-logging.
    async fn send_receipt(
        &self,
        order: &OrderRecord,
        address: &ShippingAddress,
        payer: &WalletAddress,
    ) -> Result<(), NotifyError>;
}

/// Plain-text receipt body.
#[derive(Template)]
#[template(path = "email/receipt.txt")]
struct ReceiptTemplate<'a> {
    order_number: &'a str,
    items: &'a [CartItem],
    fiat_total: Decimal,
    sol_total: Decimal,
    address: &'a ShippingAddress,
    signature: &'a str,
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the mail bridge process.
pub struct MailBridgeClient {
    client: reqwest::Client,
    bridge_url: String,
    from_name: String,
}

impl MailBridgeClient {
    /// Create a client against the mail bridge.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Http`] if the HTTP client cannot be built.
    pub fn new(
        bridge_url: impl Into<String>,
        from_name: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            bridge_url: bridge_url.into(),
            from_name: from_name.into(),
        })
    }
}

#[async_trait]
impl ReceiptSender for MailBridgeClient {
    #[instrument(skip_all, fields(order = %order.order_number()))]
    async fn send_receipt(
        &self,
        order: &OrderRecord,
        address: &ShippingAddress,
        payer: &WalletAddress,
    ) -> Result<(), NotifyError> {
        let content = ReceiptTemplate {
            order_number: order.order_number(),
            items: &order.items,
            fiat_total: order.fiat_total,
            sol_total: order.native_amount.as_sol().normalize(),
            address,
            signature: order.signature.as_str(),
        }
        .render()?;

        let body = json!({
            "to": address.email.as_str(),
            "from": &self.from_name,
            "subject": format!("Your receipt - order {}", order.order_number()),
            "content": content,
            "signature": order.signature.as_str(),
            "senderWallet": payer.as_str(),
        });

        let url = format!("{}/api/send-email", self.bridge_url);
        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let parsed: Result<BridgeResponse, _> = response.json().await;

        match parsed {
            Ok(reply) if reply.success => {
                info!("receipt email dispatched");
                Ok(())
            }
            Ok(reply) => Err(NotifyError::Bridge(
                reply
                    .message
                    .unwrap_or_else(|| format!("HTTP {status} with no message")),
            )),
            Err(_) => Err(NotifyError::Bridge(format!(
                "HTTP {status} with unreadable body"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use dinero_store_core::{Email, Lamports, ProductId, TxSignature};

    use super::*;

    fn sample_order() -> OrderRecord {
        OrderRecord {
            signature: TxSignature::new("4pYnnUGMN1pCCx9BWh4uWWpr"),
            items: vec![
                CartItem::new(
                    ProductId::new("p1"),
                    "Dinero Tee",
                    Decimal::new(25_00, 2),
                    2,
                    "",
                    None,
                )
                .unwrap(),
            ],
            fiat_total: Decimal::new(50_00, 2),
            native_amount: Lamports::new(500_000_000),
            created_at: Utc::now(),
        }
    }

    fn sample_address() -> ShippingAddress {
        ShippingAddress {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            address1: "1 Analytical Way".into(),
            address2: Some("Apt 2".into()),
            city: "San Francisco".into(),
            state: "CA".into(),
            country: "US".into(),
            zip: "94107".into(),
            email: Email::parse("ada@example.com").unwrap(),
            phone: None,
        }
    }

    #[test]
    fn test_receipt_renders_order_details() {
        let order = sample_order();
        let address = sample_address();

        let content = ReceiptTemplate {
            order_number: order.order_number(),
            items: &order.items,
            fiat_total: order.fiat_total,
            sol_total: order.native_amount.as_sol().normalize(),
            address: &address,
            signature: order.signature.as_str(),
        }
        .render()
        .unwrap();

        assert!(content.contains("Order 4pYnnUGM"));
        assert!(content.contains("2 x Dinero Tee - $50.00"));
        assert!(content.contains("Total: $50.00 (0.5 SOL)"));
        assert!(content.contains("Ada Lovelace"));
        assert!(content.contains("Apt 2"));
        assert!(content.contains("San Francisco, CA 94107"));
        assert!(content.contains("Transaction: 4pYnnUGMN1pCCx9BWh4uWWpr"));
    }
}
