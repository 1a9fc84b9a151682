//! On-chain payment submission.
//!
//! Sequences one SOL transfer end to end: blockhash, balance pre-flight,
//! transfer construction, wallet signature, submission, confirmation. Each
//! network step runs under the shared [`RetryPolicy`]; the wallet prompt is
//! never retried.

use std::sync::Arc;

use dinero_store_core::{Lamports, TxSignature, WalletAddress};
use tracing::{debug, info, instrument, warn};

use crate::models::{PaymentQuote, PaymentResult};
use crate::solana::{
    Blockhash, ChainRpc, RpcError, SignedTransaction, SignerError, TransferIntent, TxStatus,
    WalletSigner,
};

use super::retry::RetryPolicy;

/// Fixed network-fee buffer, lamports.
///
/// Included in the balance sufficiency check only - the transfer carries
/// exactly the quoted amount, and the chain debits the fee from the same
/// balance separately.
pub const FEE_BUFFER: Lamports = Lamports::new(5_000);

/// Errors from a payment attempt.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// Pre-flight check failed; the wallet was never prompted.
    #[error("insufficient funds: need {required}, wallet holds {available}")]
    InsufficientFunds {
        required: Lamports,
        available: Lamports,
    },

    /// The user declined the signature prompt. Terminal.
    #[error("transaction signing declined by user")]
    UserRejected,

    /// Submission failed after retries, or the transaction landed with an
    /// on-chain execution error.
    #[error("transaction submission failed: {0}")]
    SubmissionFailed(String),

    /// The confirmation retry budget or blockhash validity window ran out.
    /// Ambiguous: the transfer may or may not have landed.
    #[error("confirmation timed out for transaction {signature}")]
    ConfirmationTimeout { signature: TxSignature },

    /// A lookup step failed after retries.
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// A payment ready to sign: the transfer intent plus the blockhash whose
/// validity window bounds confirmation.
#[derive(Debug, Clone)]
pub struct PreparedPayment {
    pub intent: TransferIntent,
    pub blockhash: Blockhash,
}

/// Outcome of one confirmation poll, fed through the retry policy.
#[derive(Debug, thiserror::Error)]
enum ConfirmPoll {
    #[error("not yet confirmed")]
    NotYet,
    #[error("blockhash validity window expired")]
    WindowExpired,
    #[error("transaction failed on-chain: {0}")]
    ChainFailure(String),
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Submits and confirms SOL transfers to the store wallet.
pub struct PaymentSubmitter {
    rpc: Arc<dyn ChainRpc>,
    store_wallet: WalletAddress,
    lookup_retry: RetryPolicy,
    confirm_retry: RetryPolicy,
}

impl PaymentSubmitter {
    /// Create a submitter with the production retry schedule.
    #[must_use]
    pub fn new(rpc: Arc<dyn ChainRpc>, store_wallet: WalletAddress) -> Self {
        Self::with_policies(
            rpc,
            store_wallet,
            RetryPolicy::LOOKUP,
            RetryPolicy::CONFIRMATION,
        )
    }

    /// Create a submitter with explicit retry policies (tests use
    /// zero-delay schedules).
    #[must_use]
    pub fn with_policies(
        rpc: Arc<dyn ChainRpc>,
        store_wallet: WalletAddress,
        lookup_retry: RetryPolicy,
        confirm_retry: RetryPolicy,
    ) -> Self {
        Self {
            rpc,
            store_wallet,
            lookup_retry,
            confirm_retry,
        }
    }

    /// Resolve the blockhash, run the balance pre-flight, and build the
    /// transfer intent.
    ///
    /// The pre-flight happens before any signature request so the buyer is
    /// never prompted for a doomed transaction.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InsufficientFunds`] when the balance cannot
    /// cover the amount plus [`FEE_BUFFER`], or [`PaymentError::Rpc`] when
    /// a lookup keeps failing.
    #[instrument(skip(self, quote), fields(amount = %quote.native_amount))]
    pub async fn prepare(
        &self,
        quote: &PaymentQuote,
        payer: &WalletAddress,
    ) -> Result<PreparedPayment, PaymentError> {
        let amount = quote.native_amount;

        let blockhash = self
            .lookup_retry
            .run(|| self.rpc.latest_blockhash(), RpcError::is_transient)
            .await?;
        debug!(blockhash = %blockhash.blockhash, "resolved fee-reference blockhash");

        let available = self
            .lookup_retry
            .run(|| self.rpc.balance(payer), RpcError::is_transient)
            .await?;

        let required = amount.saturating_add(FEE_BUFFER);
        if available < required {
            return Err(PaymentError::InsufficientFunds {
                required,
                available,
            });
        }

        Ok(PreparedPayment {
            intent: TransferIntent {
                from: payer.clone(),
                to: self.store_wallet.clone(),
                lamports: amount,
                recent_blockhash: blockhash.blockhash.clone(),
                last_valid_block_height: blockhash.last_valid_block_height,
            },
            blockhash,
        })
    }

    /// Request the wallet signature for a prepared payment.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::UserRejected`] when the user declines; a
    /// declined prompt is terminal and never retried.
    pub async fn sign(
        &self,
        payer: &dyn WalletSigner,
        prepared: &PreparedPayment,
    ) -> Result<SignedTransaction, PaymentError> {
        payer
            .sign_transfer(&prepared.intent)
            .await
            .map_err(|err| match err {
                SignerError::Rejected => PaymentError::UserRejected,
                SignerError::Wallet(detail) => PaymentError::SubmissionFailed(detail),
            })
    }

    /// Submit the signed transaction, retrying transient errors.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::SubmissionFailed`] on exhaustion.
    #[instrument(skip_all)]
    pub async fn submit(&self, signed: &SignedTransaction) -> Result<TxSignature, PaymentError> {
        let signature = self
            .lookup_retry
            .run(|| self.rpc.send_transaction(signed), RpcError::is_transient)
            .await
            .map_err(|err| PaymentError::SubmissionFailed(err.to_string()))?;

        info!(%signature, "transaction submitted");
        Ok(signature)
    }

    /// Poll for confirmation, honoring the blockhash validity window.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::ConfirmationTimeout`] when the retry budget
    /// or the validity window runs out (the ambiguous case), and
    /// [`PaymentError::SubmissionFailed`] when the transaction landed with
    /// an execution error.
    #[instrument(skip(self, blockhash), fields(signature = %signature))]
    pub async fn confirm(
        &self,
        signature: &TxSignature,
        blockhash: &Blockhash,
    ) -> Result<(), PaymentError> {
        let poll = || async {
            match self.rpc.signature_status(signature).await {
                Ok(TxStatus::Confirmed) => Ok(()),
                Ok(TxStatus::Failed(detail)) => Err(ConfirmPoll::ChainFailure(detail)),
                Ok(TxStatus::Pending) => match self.rpc.block_height().await {
                    Ok(height) if height > blockhash.last_valid_block_height => {
                        Err(ConfirmPoll::WindowExpired)
                    }
                    _ => Err(ConfirmPoll::NotYet),
                },
                Err(err) => Err(ConfirmPoll::Rpc(err)),
            }
        };

        // Status-lookup hiccups burn an attempt rather than aborting: the
        // transaction may already be landing.
        let retryable = |err: &ConfirmPoll| {
            matches!(err, ConfirmPoll::NotYet | ConfirmPoll::Rpc(_))
        };

        match self.confirm_retry.run(poll, retryable).await {
            Ok(()) => {
                info!("transaction confirmed");
                Ok(())
            }
            Err(ConfirmPoll::ChainFailure(detail)) => {
                warn!(detail = %detail, "transaction failed on-chain");
                Err(PaymentError::SubmissionFailed(format!(
                    "transaction failed on-chain: {detail}"
                )))
            }
            Err(ConfirmPoll::NotYet | ConfirmPoll::WindowExpired | ConfirmPoll::Rpc(_)) => {
                Err(PaymentError::ConfirmationTimeout {
                    signature: signature.clone(),
                })
            }
        }
    }

    /// The full `pay` contract: prepare, sign, submit, confirm.
    ///
    /// Re-invoking after a [`PaymentError::ConfirmationTimeout`] may
    /// produce a second transfer; callers surface that case distinctly.
    ///
    /// # Errors
    ///
    /// Returns the first [`PaymentError`] encountered.
    #[instrument(skip_all)]
    pub async fn pay(
        &self,
        quote: &PaymentQuote,
        payer: &dyn WalletSigner,
    ) -> Result<PaymentResult, PaymentError> {
        let prepared = self.prepare(quote, &payer.address()).await?;
        let signed = self.sign(payer, &prepared).await?;
        let signature = self.submit(&signed).await?;
        self.confirm(&signature, &prepared.blockhash).await?;
        Ok(PaymentResult::confirmed(signature))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;

    const FAST_LOOKUP: RetryPolicy = RetryPolicy::new(3, Duration::ZERO);
    const FAST_CONFIRM: RetryPolicy = RetryPolicy::new(5, Duration::ZERO);

    fn quote_for(fiat_cents: i64) -> PaymentQuote {
        PaymentQuote::compute(
            Decimal::new(fiat_cents, 2),
            Decimal::from(100),
            Utc::now(),
        )
        .unwrap()
    }

    struct FakeRpc {
        balance: AtomicU64,
        balance_failures: AtomicU32,
        block_height: AtomicU64,
        confirm_after: AtomicU32,
        status_polls: AtomicU32,
        chain_failure: Mutex<Option<String>>,
        sent: Mutex<Vec<Vec<u8>>>,
    }

    impl FakeRpc {
        fn with_balance(lamports: u64) -> Arc<Self> {
            Arc::new(Self {
                balance: AtomicU64::new(lamports),
                balance_failures: AtomicU32::new(0),
                block_height: AtomicU64::new(100),
                confirm_after: AtomicU32::new(1),
                status_polls: AtomicU32::new(0),
                chain_failure: Mutex::new(None),
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChainRpc for FakeRpc {
        async fn balance(&self, _address: &WalletAddress) -> Result<Lamports, RpcError> {
            if self.balance_failures.load(Ordering::SeqCst) > 0 {
                self.balance_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(RpcError::Node {
                    code: -32005,
                    message: "node is behind".into(),
                });
            }
            Ok(Lamports::new(self.balance.load(Ordering::SeqCst)))
        }

        async fn latest_blockhash(&self) -> Result<Blockhash, RpcError> {
            Ok(Blockhash {
                blockhash: "HashOne1111111111111111111111111".into(),
                last_valid_block_height: 250,
            })
        }

        async fn block_height(&self) -> Result<u64, RpcError> {
            Ok(self.block_height.load(Ordering::SeqCst))
        }

        async fn send_transaction(
            &self,
            tx: &SignedTransaction,
        ) -> Result<TxSignature, RpcError> {
            self.sent.lock().unwrap().push(tx.as_bytes().to_vec());
            Ok(TxSignature::new("FakeSig11111111"))
        }

        async fn signature_status(
            &self,
            _signature: &TxSignature,
        ) -> Result<TxStatus, RpcError> {
            if let Some(detail) = self.chain_failure.lock().unwrap().clone() {
                return Ok(TxStatus::Failed(detail));
            }
            let polls = self.status_polls.fetch_add(1, Ordering::SeqCst) + 1;
            if polls >= self.confirm_after.load(Ordering::SeqCst) {
                Ok(TxStatus::Confirmed)
            } else {
                Ok(TxStatus::Pending)
            }
        }
    }

    struct FakeSigner {
        reject: bool,
        sign_calls: AtomicU32,
        last_intent: Mutex<Option<TransferIntent>>,
    }

    impl FakeSigner {
        fn new() -> Self {
            Self {
                reject: false,
                sign_calls: AtomicU32::new(0),
                last_intent: Mutex::new(None),
            }
        }

        fn rejecting() -> Self {
            Self {
                reject: true,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl WalletSigner for FakeSigner {
        fn address(&self) -> WalletAddress {
            WalletAddress::new("Payer1111111111111111111111111111")
        }

        async fn sign_transfer(
            &self,
            intent: &TransferIntent,
        ) -> Result<SignedTransaction, SignerError> {
            self.sign_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_intent.lock().unwrap() = Some(intent.clone());
            if self.reject {
                return Err(SignerError::Rejected);
            }
            Ok(SignedTransaction::new(vec![1, 2, 3]))
        }
    }

    fn submitter(rpc: Arc<FakeRpc>) -> PaymentSubmitter {
        PaymentSubmitter::with_policies(
            rpc,
            WalletAddress::new("Store1111111111111111111111111111"),
            FAST_LOOKUP,
            FAST_CONFIRM,
        )
    }

    #[tokio::test]
    async fn test_happy_path_confirms() {
        let rpc = FakeRpc::with_balance(600_000_000);
        let signer = FakeSigner::new();

        let result = submitter(rpc.clone())
            .pay(&quote_for(50_00), &signer)
            .await
            .unwrap();

        assert!(result.confirmed);
        assert_eq!(result.signature.as_str(), "FakeSig11111111");
        assert_eq!(rpc.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transfer_carries_exact_amount_without_fee_buffer() {
        let rpc = FakeRpc::with_balance(600_000_000);
        let signer = FakeSigner::new();

        submitter(rpc).pay(&quote_for(50_00), &signer).await.unwrap();

        let intent = signer.last_intent.lock().unwrap().clone().unwrap();
        // $50 at $100/SOL: exactly half a SOL, no fee added on top.
        assert_eq!(intent.lamports, Lamports::new(500_000_000));
        assert_eq!(intent.to.as_str(), "Store1111111111111111111111111111");
    }

    #[tokio::test]
    async fn test_insufficient_funds_never_prompts_wallet() {
        // Balance covers the amount but not amount + fee buffer.
        let rpc = FakeRpc::with_balance(500_000_000);
        let signer = FakeSigner::new();

        let err = submitter(rpc)
            .pay(&quote_for(50_00), &signer)
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::InsufficientFunds { .. }));
        assert_eq!(
            signer.sign_calls.load(Ordering::SeqCst),
            0,
            "signature must not be requested on a doomed transaction"
        );
    }

    #[tokio::test]
    async fn test_user_rejection_is_terminal() {
        let rpc = FakeRpc::with_balance(600_000_000);
        let signer = FakeSigner::rejecting();

        let err = submitter(rpc.clone())
            .pay(&quote_for(50_00), &signer)
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::UserRejected));
        assert_eq!(signer.sign_calls.load(Ordering::SeqCst), 1, "not retried");
        assert!(rpc.sent.lock().unwrap().is_empty(), "nothing submitted");
    }

    #[tokio::test]
    async fn test_transient_balance_lookup_retries() {
        let rpc = FakeRpc::with_balance(600_000_000);
        rpc.balance_failures.store(2, Ordering::SeqCst);
        let signer = FakeSigner::new();

        let result = submitter(rpc).pay(&quote_for(50_00), &signer).await;
        assert!(result.is_ok(), "two transient failures fit in 3 attempts");
    }

    #[tokio::test]
    async fn test_confirmation_timeout_when_never_confirmed() {
        let rpc = FakeRpc::with_balance(600_000_000);
        rpc.confirm_after.store(u32::MAX, Ordering::SeqCst);
        let signer = FakeSigner::new();

        let err = submitter(rpc.clone())
            .pay(&quote_for(50_00), &signer)
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::ConfirmationTimeout { .. }));
        assert_eq!(
            rpc.status_polls.load(Ordering::SeqCst),
            FAST_CONFIRM.max_attempts
        );
    }

    #[tokio::test]
    async fn test_expired_blockhash_window_times_out() {
        let rpc = FakeRpc::with_balance(600_000_000);
        rpc.confirm_after.store(u32::MAX, Ordering::SeqCst);
        // Past the fake blockhash's last_valid_block_height of 250.
        rpc.block_height.store(300, Ordering::SeqCst);
        let signer = FakeSigner::new();

        let err = submitter(rpc.clone())
            .pay(&quote_for(50_00), &signer)
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::ConfirmationTimeout { .. }));
        assert_eq!(
            rpc.status_polls.load(Ordering::SeqCst),
            1,
            "expiry short-circuits the poll loop"
        );
    }

    #[tokio::test]
    async fn test_on_chain_failure_is_submission_failed() {
        let rpc = FakeRpc::with_balance(600_000_000);
        *rpc.chain_failure.lock().unwrap() = Some("InstructionError".into());
        let signer = FakeSigner::new();

        let err = submitter(rpc)
            .pay(&quote_for(50_00), &signer)
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::SubmissionFailed(_)));
    }

    #[tokio::test]
    async fn test_late_confirmation_within_budget() {
        let rpc = FakeRpc::with_balance(600_000_000);
        rpc.confirm_after.store(4, Ordering::SeqCst);
        let signer = FakeSigner::new();

        let result = submitter(rpc).pay(&quote_for(50_00), &signer).await;
        assert!(result.is_ok());
    }
}
