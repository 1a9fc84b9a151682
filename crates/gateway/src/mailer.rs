//! Mail bridge: payment-verified SMTP relay.
//!
//! `POST /api/send-email` verifies the referenced payment transaction
//! exists on-chain before dispatching mail through the SMTP relay, so the
//! bridge can't be used as a free mailer. `GET /api/email-cost` advertises
//! the per-mail price.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use lettre::message::{MultiPart, SinglePart, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};

use dinero_store_core::{Email, EmailError, TxSignature};
use dinero_store_storefront::solana::{RpcClient, RpcError};

use crate::config::MailBridgeConfig;

/// Errors from mail dispatch.
#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    /// The referenced payment transaction does not exist on-chain.
    #[error("invalid transaction signature")]
    UnknownTransaction,

    /// Recipient address failed validation.
    #[error("invalid recipient address: {0}")]
    InvalidRecipient(#[from] EmailError),

    /// Chain lookup failed.
    #[error("transaction lookup failed: {0}")]
    Rpc(#[from] RpcError),

    /// Sender or recipient mailbox could not be parsed.
    #[error("invalid mailbox: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// Message assembly failed.
    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// SMTP transport failure.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Incoming send request, field names matching the storefront client.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    pub to: String,
    /// Display name shown as the sender.
    pub from: String,
    pub subject: String,
    /// Plain-text body; the HTML alternative is derived from it.
    pub content: String,
    /// Payment transaction the mail refers to; must exist on-chain.
    pub signature: String,
    pub sender_wallet: String,
}

#[derive(Debug, Serialize)]
pub struct SendEmailResponse {
    pub success: bool,
    pub message: String,
}

/// Shared mail-bridge state.
#[derive(Clone)]
pub struct MailerState {
    inner: Arc<MailerStateInner>,
}

struct MailerStateInner {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    rpc: RpcClient,
    /// Relay account address; the `from` display name wraps around it.
    relay_address: String,
    email_cost_sol: f64,
}

impl MailerState {
    /// Build the bridge state from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MailerError`] if the SMTP transport or RPC client cannot
    /// be built.
    pub fn new(config: &MailBridgeConfig) -> Result<Self, MailerError> {
        let credentials = Credentials::new(
            config.smtp.user.clone(),
            config.smtp.pass.expose_secret().to_owned(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp.host)?
            .port(config.smtp.port)
            .credentials(credentials)
            .build();

        let rpc = RpcClient::new(config.rpc_url.clone())
            .map_err(MailerError::Rpc)?;

        Ok(Self {
            inner: Arc::new(MailerStateInner {
                mailer,
                rpc,
                relay_address: config.smtp.user.clone(),
                email_cost_sol: config.email_cost_sol,
            }),
        })
    }

    /// Verify the payment and dispatch the mail.
    ///
    /// # Errors
    ///
    /// Returns [`MailerError::UnknownTransaction`] when the referenced
    /// signature is not on-chain, or the underlying transport error.
    #[instrument(skip(self, request), fields(signature = %request.signature))]
    pub async fn send(&self, request: SendEmailRequest) -> Result<(), MailerError> {
        // The transaction gate: no confirmed payment, no mail.
        let signature = TxSignature::new(&request.signature);
        let transaction = self.inner.rpc.get_transaction(&signature).await?;
        if transaction.is_none() {
            return Err(MailerError::UnknownTransaction);
        }

        let recipient = Email::parse(&request.to)?;

        let from_mailbox = format!("\"{}\" <{}>", request.from, self.inner.relay_address);
        let html_body = request.content.replace('\n', "<br>");

        let message = Message::builder()
            .from(from_mailbox.parse()?)
            .to(recipient.as_str().parse()?)
            .subject(&request.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(request.content.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )?;

        self.inner.mailer.send(message).await?;
        info!(to = %recipient, wallet = %request.sender_wallet, "mail dispatched");
        Ok(())
    }
}

/// Build the mail-bridge router.
pub fn router(state: MailerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/email-cost", get(email_cost))
        .route("/api/send-email", post(send_email))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn email_cost(State(state): State<MailerState>) -> Json<serde_json::Value> {
    Json(json!({ "cost": state.inner.email_cost_sol }))
}

async fn send_email(
    State(state): State<MailerState>,
    Json(request): Json<SendEmailRequest>,
) -> (StatusCode, Json<SendEmailResponse>) {
    match state.send(request).await {
        Ok(()) => (
            StatusCode::OK,
            Json(SendEmailResponse {
                success: true,
                message: "Email sent successfully".into(),
            }),
        ),
        Err(err) => {
            error!(error = %err, "mail dispatch failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SendEmailResponse {
                    success: false,
                    message: err.to_string(),
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_storefront_wire_format() {
        let request: SendEmailRequest = serde_json::from_value(json!({
            "to": "buyer@example.com",
            "from": "Dinero Store",
            "subject": "Your receipt",
            "content": "line one\nline two",
            "signature": "4pYnnUGM",
            "senderWallet": "Payer111",
        }))
        .expect("wire format must deserialize");

        assert_eq!(request.to, "buyer@example.com");
        assert_eq!(request.sender_wallet, "Payer111");
    }

    #[test]
    fn test_html_body_derivation() {
        let content = "line one\nline two";
        assert_eq!(content.replace('\n', "<br>"), "line one<br>line two");
    }
}
