//! End-to-end checkout scenarios against in-process fakes.
//!
//! Covers the flagship flows: a confirmed payment producing exactly one
//! order record, user rejection leaving the cart untouched, fulfillment
//! failure isolation, and the pre-payment abort paths.

use std::sync::atomic::Ordering;

use rust_decimal::Decimal;

use dinero_store_core::{Lamports, TxSignature};
use dinero_store_integration_tests::{
    EditGate, FakeFulfillment, FakeRateSource, FakeRpc, FakeWallet, Harness, TEST_SIGNATURE,
};
use dinero_store_storefront::CheckoutError;
use dinero_store_storefront::checkout::ReceiptStatus;
use dinero_store_storefront::store::OrderRecordStore;

// =============================================================================
// Scenario A: confirmed payment
// =============================================================================

#[tokio::test]
async fn test_confirmed_payment_records_one_order() {
    let harness = Harness::new().await;
    harness.seed_fifty_dollar_cart().await;
    let wallet = FakeWallet::new();

    let summary = harness
        .orchestrator
        .checkout(wallet.as_ref(), false)
        .await
        .expect("checkout should complete");

    // $50.00 at $100/SOL -> 0.5 SOL exactly.
    assert_eq!(summary.order.fiat_total, Decimal::new(50_00, 2));
    assert_eq!(summary.order.native_amount, Lamports::new(500_000_000));
    assert_eq!(summary.order.native_amount.as_sol(), Decimal::new(5, 1));
    assert!(summary.payment.confirmed);
    assert_eq!(summary.receipt, ReceiptStatus::NotRequested);

    let orders = harness.store.orders().await.expect("orders readable");
    assert_eq!(orders.len(), 1);
    assert_eq!(
        orders.first().expect("one order").signature.as_str(),
        TEST_SIGNATURE
    );

    // Cart cleared exactly at RecordingOrder.
    assert!(harness.store.cart().await.is_empty());
}

#[tokio::test]
async fn test_transfer_amount_excludes_fee_buffer() {
    let harness = Harness::new().await;
    harness.seed_fifty_dollar_cart().await;
    let wallet = FakeWallet::new();

    harness
        .orchestrator
        .checkout(wallet.as_ref(), false)
        .await
        .expect("checkout should complete");

    let intent = wallet
        .last_intent
        .lock()
        .expect("intent lock")
        .clone()
        .expect("wallet was prompted");
    // The buyer pays the exact fiat-equivalent; the fee buffer is only a
    // sufficiency-check margin.
    assert_eq!(intent.lamports, Lamports::new(500_000_000));
}

#[tokio::test]
async fn test_fulfillment_receives_cart_snapshot() {
    let harness = Harness::new().await;
    harness.seed_fifty_dollar_cart().await;
    let wallet = FakeWallet::new();

    harness
        .orchestrator
        .checkout(wallet.as_ref(), false)
        .await
        .expect("checkout should complete");

    assert_eq!(harness.fulfillment.calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.fulfillment.last_item_count.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Scenario B: user rejects the signature
// =============================================================================

#[tokio::test]
async fn test_user_rejection_leaves_cart_and_orders_untouched() {
    let harness = Harness::new().await;
    harness.seed_fifty_dollar_cart().await;
    let wallet = FakeWallet::rejecting();

    let err = harness
        .orchestrator
        .checkout(wallet.as_ref(), false)
        .await
        .expect_err("rejection must fail the flow");

    assert!(matches!(err, CheckoutError::UserRejected));
    assert_eq!(wallet.sign_calls.load(Ordering::SeqCst), 1, "not retried");
    assert_eq!(harness.store.cart().await.len(), 1, "cart unchanged");
    assert!(harness.store.orders().await.expect("readable").is_empty());
    assert!(
        harness.rpc.submitted.lock().expect("lock").is_empty(),
        "nothing was submitted to the chain"
    );
}

// =============================================================================
// Scenario C: fulfillment failure isolation
// =============================================================================

#[tokio::test]
async fn test_fulfillment_failure_still_completes_checkout() {
    let harness = Harness::build(
        FakeRateSource::at(Decimal::from(100)),
        FakeRpc::with_balance_sol(10),
        FakeFulfillment::failing_with(500),
        std::sync::Arc::new(dinero_store_storefront::checkout::AutoConfirm),
    )
    .await;
    harness.seed_fifty_dollar_cart().await;
    let wallet = FakeWallet::new();

    let summary = harness
        .orchestrator
        .checkout(wallet.as_ref(), false)
        .await
        .expect("flow must reach Complete despite provider failure");

    assert!(summary.fulfillment.is_none());
    let detail = summary
        .fulfillment_error
        .expect("failure surfaced in summary");
    assert!(detail.contains("500"));

    // Exactly one record, cart cleared: the payment is not hostage to the
    // provider.
    assert_eq!(harness.store.orders().await.expect("readable").len(), 1);
    assert!(harness.store.cart().await.is_empty());
}

// =============================================================================
// Pre-payment aborts
// =============================================================================

#[tokio::test]
async fn test_empty_cart_rejected_before_quoting() {
    let harness = Harness::new().await;
    harness
        .store
        .set_shipping_address(dinero_store_integration_tests::test_address())
        .await
        .expect("seed address");
    let wallet = FakeWallet::new();

    let err = harness
        .orchestrator
        .checkout(wallet.as_ref(), false)
        .await
        .expect_err("empty cart must abort");

    assert!(matches!(err, CheckoutError::EmptyCart));
    assert_eq!(harness.rate_source.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_address_rejected() {
    let harness = Harness::new().await;
    let item = dinero_store_storefront::models::CartItem::new(
        dinero_store_core::ProductId::new("650e1"),
        "Dinero Tee",
        Decimal::new(25_00, 2),
        1,
        "",
        None,
    )
    .expect("valid item");
    harness.store.add_item(item).await.expect("seed cart");
    let wallet = FakeWallet::new();

    let err = harness
        .orchestrator
        .checkout(wallet.as_ref(), false)
        .await
        .expect_err("missing address must abort");

    assert!(matches!(err, CheckoutError::MissingAddress));
}

#[tokio::test]
async fn test_rate_outage_aborts_before_wallet_interaction() {
    let harness = Harness::new().await;
    harness.seed_fifty_dollar_cart().await;
    harness.rate_source.fail.store(true, Ordering::SeqCst);
    let wallet = FakeWallet::new();

    let err = harness
        .orchestrator
        .checkout(wallet.as_ref(), false)
        .await
        .expect_err("no rate, no checkout");

    assert!(matches!(err, CheckoutError::RateUnavailable));
    assert_eq!(
        wallet.sign_calls.load(Ordering::SeqCst),
        0,
        "wallet never prompted"
    );
    assert_eq!(harness.store.cart().await.len(), 1, "cart unchanged");
}

#[tokio::test]
async fn test_insufficient_funds_never_prompts_wallet() {
    // 0 SOL balance against a $50 cart.
    let harness = Harness::build(
        FakeRateSource::at(Decimal::from(100)),
        FakeRpc::with_balance_sol(0),
        FakeFulfillment::working(),
        std::sync::Arc::new(dinero_store_storefront::checkout::AutoConfirm),
    )
    .await;
    harness.seed_fifty_dollar_cart().await;
    let wallet = FakeWallet::new();

    let err = harness
        .orchestrator
        .checkout(wallet.as_ref(), false)
        .await
        .expect_err("insufficient funds must abort");

    assert!(matches!(err, CheckoutError::InsufficientFunds { .. }));
    assert_eq!(wallet.sign_calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.store.cart().await.len(), 1, "cart unchanged");
}

#[tokio::test]
async fn test_edit_at_confirmation_gate_cancels_safely() {
    let harness = Harness::build(
        FakeRateSource::at(Decimal::from(100)),
        FakeRpc::with_balance_sol(10),
        FakeFulfillment::working(),
        std::sync::Arc::new(EditGate),
    )
    .await;
    harness.seed_fifty_dollar_cart().await;
    let wallet = FakeWallet::new();

    let err = harness
        .orchestrator
        .checkout(wallet.as_ref(), false)
        .await
        .expect_err("edit decision aborts the attempt");

    assert!(matches!(err, CheckoutError::Cancelled));
    assert_eq!(wallet.sign_calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.store.cart().await.len(), 1, "cart unchanged");
}

// =============================================================================
// Confirmation timeout
// =============================================================================

#[tokio::test]
async fn test_confirmation_timeout_surfaces_signature() {
    let harness = Harness::new().await;
    harness.seed_fifty_dollar_cart().await;
    harness.rpc.never_confirm();
    let wallet = FakeWallet::new();

    let err = harness
        .orchestrator
        .checkout(wallet.as_ref(), false)
        .await
        .expect_err("unconfirmed payment must not complete");

    match err {
        CheckoutError::ConfirmationTimeout { ref signature } => {
            assert_eq!(signature.as_str(), TEST_SIGNATURE);
        }
        other => panic!("expected ConfirmationTimeout, got {other:?}"),
    }

    // Ambiguous outcome: no record written, cart untouched, and the
    // user-facing message must not read as a plain failure.
    assert!(harness.store.orders().await.expect("readable").is_empty());
    assert_eq!(harness.store.cart().await.len(), 1);
    assert!(err.user_message().contains("unknown"));
}

// =============================================================================
// Receipt opt-in
// =============================================================================

#[tokio::test]
async fn test_receipt_sent_when_requested() {
    let harness = Harness::new().await;
    harness.seed_fifty_dollar_cart().await;
    let wallet = FakeWallet::new();

    let summary = harness
        .orchestrator
        .checkout(wallet.as_ref(), true)
        .await
        .expect("checkout should complete");

    assert_eq!(summary.receipt, ReceiptStatus::Sent);
    assert_eq!(harness.receipts.sent.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_receipt_failure_never_fails_checkout() {
    let harness = Harness::new().await;
    harness.seed_fifty_dollar_cart().await;
    harness.receipts.fail.store(true, Ordering::SeqCst);
    let wallet = FakeWallet::new();

    let summary = harness
        .orchestrator
        .checkout(wallet.as_ref(), true)
        .await
        .expect("receipt failure is best-effort");

    assert_eq!(summary.receipt, ReceiptStatus::Failed);
    assert_eq!(harness.store.orders().await.expect("readable").len(), 1);
}

// =============================================================================
// Idempotence
// =============================================================================

#[tokio::test]
async fn test_order_recording_is_idempotent_per_signature() {
    let harness = Harness::new().await;
    harness.seed_fifty_dollar_cart().await;
    let wallet = FakeWallet::new();

    let summary = harness
        .orchestrator
        .checkout(wallet.as_ref(), false)
        .await
        .expect("checkout should complete");

    // Re-record the same order directly: must be a no-op.
    let inserted = harness
        .store
        .record(summary.order.clone())
        .await
        .expect("record call succeeds");
    assert!(!inserted);
    assert_eq!(harness.store.orders().await.expect("readable").len(), 1);

    assert!(
        harness
            .store
            .get(&TxSignature::new(TEST_SIGNATURE))
            .await
            .expect("readable")
            .is_some()
    );
}
