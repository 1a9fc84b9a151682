//! Solana chain access: the RPC seam and the wallet capability seam.
//!
//! The engine talks to the chain through two traits. [`ChainRpc`] covers
//! the node operations a payment needs (balance, blockhash, submission,
//! confirmation); [`WalletSigner`] is the opaque external capability that
//! can turn a transfer intent into signed wire bytes. Key material never
//! enters this crate.

mod rpc;

pub use rpc::{RpcClient, RpcError};

use async_trait::async_trait;
use dinero_store_core::{Lamports, TxSignature, WalletAddress};
use serde::Deserialize;

/// A recent blockhash with its validity horizon.
///
/// Transactions referencing this blockhash are only accepted while the
/// chain's block height stays at or below `last_valid_block_height`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blockhash {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

/// An unsigned single-instruction system transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferIntent {
    pub from: WalletAddress,
    pub to: WalletAddress,
    pub lamports: Lamports,
    pub recent_blockhash: String,
    pub last_valid_block_height: u64,
}

/// Signed transaction wire bytes, opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction(Vec<u8>);

impl SignedTransaction {
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Errors from the wallet capability.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// The user declined the signature prompt. Terminal; never retried.
    #[error("user declined to sign the transaction")]
    Rejected,

    /// Anything else the wallet reported.
    #[error("wallet error: {0}")]
    Wallet(String),
}

/// The injected wallet capability: it knows its address and can sign a
/// transfer. Signing may suspend indefinitely while the user decides.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// The payer's wallet address.
    fn address(&self) -> WalletAddress;

    /// Ask the wallet to sign the transfer.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::Rejected`] when the user declines, or
    /// [`SignerError::Wallet`] for wallet-side failures.
    async fn sign_transfer(&self, intent: &TransferIntent)
    -> Result<SignedTransaction, SignerError>;
}

/// Confirmation state of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    /// Not yet seen at the confirmed commitment level.
    Pending,
    /// Reached the confirmed (or finalized) commitment level.
    Confirmed,
    /// Landed on chain but the transfer itself failed.
    Failed(String),
}

/// Chain RPC operations needed by the payment submitter and mail bridge.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Spendable balance of `address`, in lamports.
    async fn balance(&self, address: &WalletAddress) -> Result<Lamports, RpcError>;

    /// A recent blockhash and its validity horizon.
    async fn latest_blockhash(&self) -> Result<Blockhash, RpcError>;

    /// Current block height at the confirmed commitment level.
    async fn block_height(&self) -> Result<u64, RpcError>;

    /// Submit signed transaction bytes; returns the transaction signature.
    async fn send_transaction(&self, tx: &SignedTransaction) -> Result<TxSignature, RpcError>;

    /// Confirmation status of a previously submitted transaction.
    async fn signature_status(&self, signature: &TxSignature) -> Result<TxStatus, RpcError>;
}
