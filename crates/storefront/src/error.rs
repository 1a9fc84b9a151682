//! Checkout error taxonomy.
//!
//! One enum covers every way a checkout can end short of `Complete`. The
//! raw detail is for logs; [`CheckoutError::user_message`] is the only text
//! shown to the buyer, with a generic fallback for anything unclassified.

use dinero_store_core::{Lamports, TxSignature};
use thiserror::Error;

use crate::services::payment::PaymentError;
use crate::solana::RpcError;

/// Reasons a checkout attempt ends in `Failed` (or never starts).
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No live exchange rate and no cached fallback.
    #[error("exchange rate unavailable")]
    RateUnavailable,

    /// Pre-flight balance check failed; no signature was requested.
    #[error("insufficient funds: need {required}, wallet holds {available}")]
    InsufficientFunds {
        required: Lamports,
        available: Lamports,
    },

    /// The buyer declined the signature request. Terminal, never retried.
    #[error("transaction signing declined by user")]
    UserRejected,

    /// Submission kept failing after transient-error retries.
    #[error("transaction submission failed: {0}")]
    SubmissionFailed(String),

    /// The network never confirmed within the retry bound or blockhash
    /// validity window. Ambiguous: the transfer may still have landed.
    #[error("confirmation timed out for transaction {signature}")]
    ConfirmationTimeout { signature: TxSignature },

    /// Entry guard: the cart has no items.
    #[error("cart is empty")]
    EmptyCart,

    /// Entry guard: the cart total is not positive.
    #[error("cart total must be greater than zero")]
    ZeroTotal,

    /// Entry guard: no shipping address on the profile.
    #[error("no shipping address on profile")]
    MissingAddress,

    /// Entry guard: the shipping address is structurally invalid.
    #[error("invalid shipping address: {0}")]
    InvalidAddress(String),

    /// The buyer chose to edit the address at the confirmation gate, or
    /// otherwise backed out before signing.
    #[error("checkout cancelled before signing")]
    Cancelled,

    /// Another checkout from this cart is already in flight.
    #[error("a checkout is already in progress")]
    CheckoutInProgress,
}

impl CheckoutError {
    /// The human-readable message for this failure.
    ///
    /// `ConfirmationTimeout` deliberately does not say "failed": retrying
    /// an unconfirmed transfer can double-charge, so the buyer is told to
    /// check the transaction first.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::RateUnavailable => {
                "Live SOL pricing is unavailable right now. Please try again in a minute.".into()
            }
            Self::InsufficientFunds { .. } => {
                "Insufficient balance. Please add funds to cover the amount plus transaction fees."
                    .into()
            }
            Self::UserRejected => "Transaction was cancelled.".into(),
            Self::ConfirmationTimeout { signature } => format!(
                "Payment status unknown: the network did not confirm in time. Check transaction \
                 {signature} in an explorer before retrying so you are not charged twice."
            ),
            Self::EmptyCart => "Your cart is empty.".into(),
            Self::ZeroTotal => "Your cart total must be greater than zero.".into(),
            Self::MissingAddress => "Please add a shipping address to continue.".into(),
            Self::InvalidAddress(detail) => format!("Shipping address is incomplete: {detail}."),
            Self::Cancelled => "Checkout cancelled.".into(),
            Self::CheckoutInProgress => {
                "A checkout is already in progress. Please wait for it to finish.".into()
            }
            // Generic fallback: the raw detail is logged, not shown.
            Self::SubmissionFailed(_) => "Payment failed. Please try again.".into(),
        }
    }
}

impl From<PaymentError> for CheckoutError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InsufficientFunds {
                required,
                available,
            } => Self::InsufficientFunds {
                required,
                available,
            },
            PaymentError::UserRejected => Self::UserRejected,
            PaymentError::SubmissionFailed(detail) => Self::SubmissionFailed(detail),
            PaymentError::ConfirmationTimeout { signature } => {
                Self::ConfirmationTimeout { signature }
            }
            PaymentError::Rpc(rpc) => Self::SubmissionFailed(rpc.to_string()),
        }
    }
}

impl From<RpcError> for CheckoutError {
    fn from(err: RpcError) -> Self {
        Self::SubmissionFailed(err.to_string())
    }
}
