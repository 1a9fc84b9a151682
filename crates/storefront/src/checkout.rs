//! Checkout orchestration.
//!
//! The top-level state machine: quote the price, gate on the buyer's
//! address confirmation, run the payment, then fulfillment, order
//! recording, and the optional receipt. Failure isolation is the whole
//! point - everything before payment confirmation aborts cleanly with no
//! side effects; nothing after it can undo the payment or the order
//! record.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use dinero_store_core::ShippingAddress;

use crate::config::StorefrontConfig;
use crate::error::CheckoutError;
use crate::models::{FulfillmentOrder, OrderRecord, PaymentQuote, PaymentResult};
use crate::services::fulfillment::{FulfillmentApi, FulfillmentError, ProviderClient};
use crate::services::payment::PaymentSubmitter;
use crate::services::price::{CoinGeckoSource, PriceOracle, RateError};
use crate::services::receipt::{MailBridgeClient, NotifyError, ReceiptSender};
use crate::solana::{RpcClient, RpcError, WalletSigner};
use crate::store::{LocalStore, OrderRecordStore, StoreError};

/// Stages of one checkout attempt, in order.
///
/// `Failed` is reachable from every stage before `RecordingOrder`; from
/// `RecordingOrder` on, the remaining stages are best-effort and the flow
/// always ends `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStage {
    Idle,
    QuotingPrice,
    AwaitingSignature,
    SubmittingPayment,
    ConfirmingPayment,
    CreatingFulfillment,
    RecordingOrder,
    NotifyingReceipt,
    Complete,
}

/// The buyer's decision at the pre-payment address confirmation gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmDecision {
    /// Proceed to the wallet signature.
    Proceed,
    /// Go back and edit the address; aborts this attempt safely.
    Edit,
}

/// Interactive confirmation gate between quoting and signing.
///
/// Hosts with a UI show the address and wait for a click; headless hosts
/// use [`AutoConfirm`].
#[async_trait]
pub trait ConfirmGate: Send + Sync {
    async fn confirm(&self, address: &ShippingAddress) -> ConfirmDecision;
}

/// A gate that always proceeds.
pub struct AutoConfirm;

#[async_trait]
impl ConfirmGate for AutoConfirm {
    async fn confirm(&self, _address: &ShippingAddress) -> ConfirmDecision {
        ConfirmDecision::Proceed
    }
}

/// Outcome of the opt-in receipt stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// Buyer didn't ask for one.
    NotRequested,
    Sent,
    /// Dispatch failed; logged, never fatal.
    Failed,
}

/// What a completed checkout hands back to the host.
#[derive(Debug, Clone)]
pub struct CheckoutSummary {
    pub order: OrderRecord,
    pub payment: PaymentResult,
    /// The provider order, when creation succeeded.
    pub fulfillment: Option<FulfillmentOrder>,
    /// Why fulfillment creation failed, when it did. The order is still
    /// recorded; the operator follows up manually.
    pub fulfillment_error: Option<String>,
    pub receipt: ReceiptStatus,
}

/// Errors wiring the production orchestrator from configuration.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("local store: {0}")]
    Store(#[from] StoreError),
    #[error("price source: {0}")]
    Price(#[from] RateError),
    #[error("rpc client: {0}")]
    Rpc(#[from] RpcError),
    #[error("fulfillment client: {0}")]
    Fulfillment(#[from] FulfillmentError),
    #[error("receipt client: {0}")]
    Receipt(#[from] NotifyError),
}

/// The checkout orchestrator.
///
/// One logical checkout per buyer session: a second `checkout()` while one
/// is in flight is rejected deterministically, never queued or raced.
pub struct CheckoutOrchestrator {
    store: Arc<LocalStore>,
    orders: Arc<dyn OrderRecordStore>,
    oracle: Arc<PriceOracle>,
    payment: PaymentSubmitter,
    fulfillment: Arc<dyn FulfillmentApi>,
    receipts: Arc<dyn ReceiptSender>,
    gate: Arc<dyn ConfirmGate>,
    in_flight: tokio::sync::Mutex<()>,
    stage_tx: watch::Sender<CheckoutStage>,
}

impl CheckoutOrchestrator {
    /// Wire up an orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<LocalStore>,
        orders: Arc<dyn OrderRecordStore>,
        oracle: Arc<PriceOracle>,
        payment: PaymentSubmitter,
        fulfillment: Arc<dyn FulfillmentApi>,
        receipts: Arc<dyn ReceiptSender>,
        gate: Arc<dyn ConfirmGate>,
    ) -> Self {
        let (stage_tx, _) = watch::channel(CheckoutStage::Idle);
        Self {
            store,
            orders,
            oracle,
            payment,
            fulfillment,
            receipts,
            gate,
            in_flight: tokio::sync::Mutex::new(()),
            stage_tx,
        }
    }

    /// Wire the production collaborators from configuration: the local
    /// JSON store, CoinGecko price source, Solana RPC, and the gateway
    /// proxy and mail-bridge clients. The confirmation gate stays
    /// host-provided (UI hosts prompt; headless hosts pass [`AutoConfirm`]).
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] when the store cannot be opened or a client
    /// cannot be built.
    pub async fn from_config(
        config: &StorefrontConfig,
        gate: Arc<dyn ConfirmGate>,
    ) -> Result<Self, BuildError> {
        let store = Arc::new(LocalStore::open(&config.data_dir).await?);
        let oracle = Arc::new(PriceOracle::new(Arc::new(CoinGeckoSource::new(
            config.price_api_url.clone(),
        )?)));
        let rpc = Arc::new(RpcClient::new(config.rpc_url.clone())?);
        let payment = PaymentSubmitter::new(rpc, config.store_wallet.clone());
        let fulfillment = Arc::new(ProviderClient::new(
            config.provider_proxy_url.clone(),
            config.shop_id.clone(),
        )?);
        let receipts = Arc::new(MailBridgeClient::new(
            config.mail_bridge_url.clone(),
            config.receipt_from.clone(),
        )?);

        Ok(Self::new(
            store.clone(),
            store,
            oracle,
            payment,
            fulfillment,
            receipts,
            gate,
        ))
    }

    /// Subscribe to stage transitions (for progress UI).
    #[must_use]
    pub fn stage_watch(&self) -> watch::Receiver<CheckoutStage> {
        self.stage_tx.subscribe()
    }

    fn enter(&self, stage: CheckoutStage) {
        info!(?stage, "checkout stage");
        self.stage_tx.send_replace(stage);
    }

    /// Run one checkout attempt end to end.
    ///
    /// `want_receipt` is the buyer's opt-in for an emailed receipt.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] for any abort before the order is
    /// recorded. Failures after payment confirmation never surface here;
    /// they are reported inside the returned [`CheckoutSummary`].
    #[instrument(skip(self, payer))]
    pub async fn checkout(
        &self,
        payer: &dyn WalletSigner,
        want_receipt: bool,
    ) -> Result<CheckoutSummary, CheckoutError> {
        // Deterministic rejection of overlapping attempts from this cart.
        let Ok(_guard) = self.in_flight.try_lock() else {
            return Err(CheckoutError::CheckoutInProgress);
        };

        let result = self.run_checkout(payer, want_receipt).await;
        if result.is_err() {
            self.enter(CheckoutStage::Idle);
        }
        result
    }

    async fn run_checkout(
        &self,
        payer: &dyn WalletSigner,
        want_receipt: bool,
    ) -> Result<CheckoutSummary, CheckoutError> {
        // Entry guard: non-empty cart, positive total, valid address.
        let items = self.store.cart().await;
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let fiat_total = crate::models::cart::fiat_total(&items);
        if fiat_total <= rust_decimal::Decimal::ZERO {
            return Err(CheckoutError::ZeroTotal);
        }

        let address = self
            .store
            .shipping_address()
            .await
            .ok_or(CheckoutError::MissingAddress)?;
        address
            .validate()
            .map_err(|err| CheckoutError::InvalidAddress(err.to_string()))?;

        // QuotingPrice: abort before any wallet interaction on failure.
        self.enter(CheckoutStage::QuotingPrice);
        let rate = self.oracle.rate().await.map_err(|err| {
            warn!(error = %err, "price quote failed");
            CheckoutError::RateUnavailable
        })?;
        let quote = PaymentQuote::compute(fiat_total, rate, Utc::now()).map_err(|err| {
            warn!(error = %err, "quote computation failed");
            CheckoutError::RateUnavailable
        })?;
        info!(fiat = %quote.fiat_total, amount = %quote.native_amount, "price quoted");

        // Buyer confirms the address before the wallet is ever prompted.
        if self.gate.confirm(&address).await == ConfirmDecision::Edit {
            return Err(CheckoutError::Cancelled);
        }

        // Payment: prepare (pre-flight), sign, submit, confirm. Any failure
        // here aborts with no order recorded and no cart mutation.
        self.enter(CheckoutStage::AwaitingSignature);
        let prepared = self.payment.prepare(&quote, &payer.address()).await?;
        let signed = self.payment.sign(payer, &prepared).await?;

        self.enter(CheckoutStage::SubmittingPayment);
        let signature = self.payment.submit(&signed).await?;

        self.enter(CheckoutStage::ConfirmingPayment);
        self.payment.confirm(&signature, &prepared.blockhash).await?;
        let payment = PaymentResult::confirmed(signature.clone());

        // From here on the payment is irreversible; nothing below may undo
        // it or block the order record.
        self.enter(CheckoutStage::CreatingFulfillment);
        let (fulfillment, fulfillment_error) =
            match self.fulfillment.create_order(&items, &address).await {
                Ok(order) => (Some(order), None),
                Err(err) => {
                    warn!(error = %err, "fulfillment creation failed; order recorded for manual follow-up");
                    (None, Some(err.to_string()))
                }
            };

        // RecordingOrder: local persistence, idempotent on the signature.
        // The cart is cleared here, exactly once.
        self.enter(CheckoutStage::RecordingOrder);
        let order =
            OrderRecord::from_confirmed_payment(signature, items, &quote, Utc::now());
        if let Err(err) = self.orders.record(order.clone()).await {
            // In-memory state is already updated; a disk failure must not
            // fail the flow back after a confirmed payment.
            error!(error = %err, "order record persistence failed");
        }
        if let Err(err) = self.store.clear_cart().await {
            error!(error = %err, "cart clear persistence failed");
        }

        let receipt = if want_receipt {
            self.enter(CheckoutStage::NotifyingReceipt);
            match self
                .receipts
                .send_receipt(&order, &address, &payer.address())
                .await
            {
                Ok(()) => ReceiptStatus::Sent,
                Err(err) => {
                    warn!(error = %err, "receipt notification failed");
                    ReceiptStatus::Failed
                }
            }
        } else {
            ReceiptStatus::NotRequested
        };

        self.enter(CheckoutStage::Complete);
        info!(order = %order.order_number(), "checkout complete");

        Ok(CheckoutSummary {
            order,
            payment,
            fulfillment,
            fulfillment_error,
            receipt,
        })
    }
}
