//! Integration test harness for Dinero Store.
//!
//! In-process fakes for every external seam the checkout orchestrator
//! touches (rate source, chain RPC, wallet, fulfillment provider, receipt
//! sender), plus a [`Harness`] that wires a real [`LocalStore`] and
//! orchestrator around them on a throwaway data directory.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use dinero_store_core::{
    Email, Lamports, ProductId, ShippingAddress, TxSignature, VariantId, WalletAddress,
};
use dinero_store_storefront::checkout::{CheckoutOrchestrator, ConfirmDecision, ConfirmGate};
use dinero_store_storefront::models::{CartItem, CustomerProfile, FulfillmentOrder, OrderRecord};
use dinero_store_storefront::services::fulfillment::{FulfillmentApi, FulfillmentError};
use dinero_store_storefront::services::payment::PaymentSubmitter;
use dinero_store_storefront::services::price::{PriceOracle, RateError, RateSource};
use dinero_store_storefront::services::receipt::{NotifyError, ReceiptSender};
use dinero_store_storefront::services::retry::RetryPolicy;
use dinero_store_storefront::solana::{
    Blockhash, ChainRpc, RpcError, SignedTransaction, SignerError, TransferIntent, TxStatus,
    WalletSigner,
};
use dinero_store_storefront::store::LocalStore;

pub const STORE_WALLET: &str = "BA4gpFR4wLN7MnfC5YSVRW96bXTRSQ6Vgy49zGkpsHJV";
pub const PAYER_WALLET: &str = "Payer1111111111111111111111111111111111111111";
pub const TEST_SIGNATURE: &str = "5wHu1qwD7q5ifaN5nwdcDqNFo53GJqa7nLp2BeeEpcHC";

// =============================================================================
// Fakes
// =============================================================================

/// Fixed-rate source with a failure switch and a fetch counter.
pub struct FakeRateSource {
    pub rate: Mutex<Decimal>,
    pub fail: AtomicBool,
    pub fetches: AtomicU32,
}

impl FakeRateSource {
    #[must_use]
    pub fn at(rate: Decimal) -> Arc<Self> {
        Arc::new(Self {
            rate: Mutex::new(rate),
            fail: AtomicBool::new(false),
            fetches: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl RateSource for FakeRateSource {
    async fn fetch_rate(&self) -> Result<Decimal, RateError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RateError::Malformed("fake outage".into()));
        }
        Ok(*self.rate.lock().expect("rate lock"))
    }
}

/// Scriptable chain RPC fake.
pub struct FakeRpc {
    pub balance: AtomicU64,
    pub block_height: AtomicU64,
    /// Poll count after which the transaction reads as confirmed.
    pub confirm_after: AtomicU32,
    pub status_polls: AtomicU32,
    pub submitted: Mutex<Vec<Vec<u8>>>,
}

impl FakeRpc {
    #[must_use]
    pub fn with_balance_sol(sol: u64) -> Arc<Self> {
        Arc::new(Self {
            balance: AtomicU64::new(sol * 1_000_000_000),
            block_height: AtomicU64::new(100),
            confirm_after: AtomicU32::new(1),
            status_polls: AtomicU32::new(0),
            submitted: Mutex::new(Vec::new()),
        })
    }

    pub fn never_confirm(&self) {
        self.confirm_after.store(u32::MAX, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChainRpc for FakeRpc {
    async fn balance(&self, _address: &WalletAddress) -> Result<Lamports, RpcError> {
        Ok(Lamports::new(self.balance.load(Ordering::SeqCst)))
    }

    async fn latest_blockhash(&self) -> Result<Blockhash, RpcError> {
        Ok(Blockhash {
            blockhash: "FakeBlockhash1111111111111111111".into(),
            last_valid_block_height: 250,
        })
    }

    async fn block_height(&self) -> Result<u64, RpcError> {
        Ok(self.block_height.load(Ordering::SeqCst))
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> Result<TxSignature, RpcError> {
        self.submitted
            .lock()
            .expect("submitted lock")
            .push(tx.as_bytes().to_vec());
        Ok(TxSignature::new(TEST_SIGNATURE))
    }

    async fn signature_status(&self, _signature: &TxSignature) -> Result<TxStatus, RpcError> {
        let polls = self.status_polls.fetch_add(1, Ordering::SeqCst) + 1;
        if polls >= self.confirm_after.load(Ordering::SeqCst) {
            Ok(TxStatus::Confirmed)
        } else {
            Ok(TxStatus::Pending)
        }
    }
}

/// Wallet fake that records signature prompts and can decline them.
pub struct FakeWallet {
    pub reject: AtomicBool,
    pub sign_calls: AtomicU32,
    pub last_intent: Mutex<Option<TransferIntent>>,
}

impl FakeWallet {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            reject: AtomicBool::new(false),
            sign_calls: AtomicU32::new(0),
            last_intent: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn rejecting() -> Arc<Self> {
        let wallet = Self::new();
        wallet.reject.store(true, Ordering::SeqCst);
        wallet
    }
}

#[async_trait]
impl WalletSigner for FakeWallet {
    fn address(&self) -> WalletAddress {
        WalletAddress::new(PAYER_WALLET)
    }

    async fn sign_transfer(
        &self,
        intent: &TransferIntent,
    ) -> Result<SignedTransaction, SignerError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_intent.lock().expect("intent lock") = Some(intent.clone());
        if self.reject.load(Ordering::SeqCst) {
            return Err(SignerError::Rejected);
        }
        Ok(SignedTransaction::new(vec![0xDE, 0xAD]))
    }
}

/// Fulfillment fake: succeeds, or answers like a provider HTTP failure.
pub struct FakeFulfillment {
    pub fail_status: Mutex<Option<u16>>,
    pub calls: AtomicU32,
    /// Line count of the last cart snapshot received.
    pub last_item_count: AtomicU32,
}

impl FakeFulfillment {
    #[must_use]
    pub fn working() -> Arc<Self> {
        Arc::new(Self {
            fail_status: Mutex::new(None),
            calls: AtomicU32::new(0),
            last_item_count: AtomicU32::new(0),
        })
    }

    #[must_use]
    pub fn failing_with(status: u16) -> Arc<Self> {
        let fake = Self::working();
        *fake.fail_status.lock().expect("status lock") = Some(status);
        fake
    }
}

#[async_trait]
impl FulfillmentApi for FakeFulfillment {
    async fn create_order(
        &self,
        items: &[CartItem],
        address: &ShippingAddress,
    ) -> Result<FulfillmentOrder, FulfillmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_item_count
            .store(u32::try_from(items.len()).unwrap_or(u32::MAX), Ordering::SeqCst);

        if let Some(status) = *self.fail_status.lock().expect("status lock") {
            return Err(FulfillmentError::Provider {
                status,
                message: "fake provider failure".into(),
            });
        }

        Ok(FulfillmentOrder {
            external_id: format!("order_{}", uuid::Uuid::new_v4().simple()),
            provider_id: Some("prov-1".into()),
            line_items: Vec::new(),
            address: address.clone(),
            customer: CustomerProfile {
                first_name: address.first_name.clone(),
                last_name: address.last_name.clone(),
                email: address.email.clone(),
                phone: String::new(),
                country_code: "US".into(),
                country_name: "United States".into(),
                region: address.state.clone(),
                address1: address.address1.clone(),
                address2: String::new(),
                city: address.city.clone(),
                zip: address.zip.clone(),
            },
        })
    }
}

/// Receipt fake with a failure switch.
pub struct FakeReceipts {
    pub fail: AtomicBool,
    pub sent: AtomicU32,
}

impl FakeReceipts {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail: AtomicBool::new(false),
            sent: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl ReceiptSender for FakeReceipts {
    async fn send_receipt(
        &self,
        _order: &OrderRecord,
        _address: &ShippingAddress,
        _payer: &WalletAddress,
    ) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Bridge("fake bridge outage".into()));
        }
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Gate that always asks to edit the address.
pub struct EditGate;

#[async_trait]
impl ConfirmGate for EditGate {
    async fn confirm(&self, _address: &ShippingAddress) -> ConfirmDecision {
        ConfirmDecision::Edit
    }
}

// =============================================================================
// Harness
// =============================================================================

/// A wired orchestrator over fakes and a throwaway local store.
pub struct Harness {
    pub store: Arc<LocalStore>,
    pub rate_source: Arc<FakeRateSource>,
    pub rpc: Arc<FakeRpc>,
    pub fulfillment: Arc<FakeFulfillment>,
    pub receipts: Arc<FakeReceipts>,
    pub orchestrator: Arc<CheckoutOrchestrator>,
}

impl Harness {
    /// Default harness: $100/SOL rate, 10 SOL balance, auto-confirm gate,
    /// working fulfillment.
    pub async fn new() -> Self {
        Self::build(
            FakeRateSource::at(Decimal::from(100)),
            FakeRpc::with_balance_sol(10),
            FakeFulfillment::working(),
            Arc::new(dinero_store_storefront::checkout::AutoConfirm),
        )
        .await
    }

    /// Harness with explicit collaborators.
    pub async fn build(
        rate_source: Arc<FakeRateSource>,
        rpc: Arc<FakeRpc>,
        fulfillment: Arc<FakeFulfillment>,
        gate: Arc<dyn ConfirmGate>,
    ) -> Self {
        let dir =
            std::env::temp_dir().join(format!("dinero-int-test-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir)
            .await
            .expect("create test data dir");
        let store = Arc::new(LocalStore::open(&dir).await.expect("open local store"));

        let oracle = Arc::new(PriceOracle::new(rate_source.clone()));
        let payment = PaymentSubmitter::with_policies(
            rpc.clone(),
            WalletAddress::new(STORE_WALLET),
            RetryPolicy::new(3, Duration::ZERO),
            RetryPolicy::new(5, Duration::ZERO),
        );
        let receipts = FakeReceipts::new();

        let orchestrator = Arc::new(CheckoutOrchestrator::new(
            store.clone(),
            store.clone(),
            oracle,
            payment,
            fulfillment.clone(),
            receipts.clone(),
            gate,
        ));

        Self {
            store,
            rate_source,
            rpc,
            fulfillment,
            receipts,
            orchestrator,
        }
    }

    /// Seed a $50.00 cart (two $25.00 tees) and a valid California address.
    pub async fn seed_fifty_dollar_cart(&self) {
        let item = CartItem::new(
            ProductId::new("650e1"),
            "Dinero Tee",
            Decimal::new(25_00, 2),
            2,
            "https://img.example/tee.png",
            Some(VariantId::new("17887")),
        )
        .expect("valid cart item");
        self.store.add_item(item).await.expect("seed cart");
        self.store
            .set_shipping_address(test_address())
            .await
            .expect("seed address");
    }
}

/// A structurally valid US shipping address.
#[must_use]
pub fn test_address() -> ShippingAddress {
    ShippingAddress {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        address1: "1 Analytical Way".into(),
        address2: None,
        city: "San Francisco".into(),
        state: "California".into(),
        country: "United States".into(),
        zip: "94107".into(),
        email: Email::parse("ada@example.com").expect("valid email"),
        phone: None,
    }
}
