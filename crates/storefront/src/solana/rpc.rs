//! Solana JSON-RPC client.
//!
//! Plain JSON-RPC 2.0 over HTTP at the `confirmed` commitment level -
//! exactly the handful of methods the payment pipeline and the mail
//! bridge's transaction check need.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use dinero_store_core::{Lamports, TxSignature, WalletAddress};

use super::{Blockhash, ChainRpc, SignedTransaction, TxStatus};

/// Errors from the RPC client.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Transport-level failure (connection, timeout, malformed HTTP body).
    #[error("RPC transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The node answered with a JSON-RPC error object.
    #[error("RPC node error {code}: {message}")]
    Node { code: i64, message: String },

    /// The node's response did not have the shape we expected.
    #[error("malformed RPC response: {0}")]
    Malformed(String),
}

impl RpcError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Transport errors are transient; a node error is an answer, not an
    /// outage - except `-32005` (node behind), which clears on its own.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Node { code, .. } => *code == -32005,
            Self::Malformed(_) => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// `{ context, value }` wrapper many methods respond with.
#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    confirmation_status: Option<String>,
    err: Option<Value>,
}

/// JSON-RPC client for a Solana node.
#[derive(Clone)]
pub struct RpcClient {
    client: reqwest::Client,
    endpoint: String,
}

impl RpcClient {
    /// Create a client for the given RPC endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Http`] if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        debug!(method, "rpc call");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?;

        let envelope: RpcEnvelope<T> = response.json().await?;

        if let Some(err) = envelope.error {
            return Err(RpcError::Node {
                code: err.code,
                message: err.message,
            });
        }

        envelope
            .result
            .ok_or_else(|| RpcError::Malformed(format!("{method}: neither result nor error")))
    }

    /// Fetch a transaction by signature, if the node knows it.
    ///
    /// Used by the mail bridge to verify a referenced payment actually
    /// exists on chain before dispatching mail.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError`] on transport or node failure. An unknown
    /// signature is `Ok(None)`, not an error.
    #[instrument(skip(self), fields(signature = %signature))]
    pub async fn get_transaction(
        &self,
        signature: &TxSignature,
    ) -> Result<Option<Value>, RpcError> {
        self.call(
            "getTransaction",
            json!([
                signature.as_str(),
                {
                    "encoding": "json",
                    "commitment": "confirmed",
                    "maxSupportedTransactionVersion": 0,
                }
            ]),
        )
        .await
    }
}

#[async_trait]
impl ChainRpc for RpcClient {
    async fn balance(&self, address: &WalletAddress) -> Result<Lamports, RpcError> {
        let response: WithContext<u64> = self
            .call(
                "getBalance",
                json!([address.as_str(), {"commitment": "confirmed"}]),
            )
            .await?;
        Ok(Lamports::new(response.value))
    }

    async fn latest_blockhash(&self) -> Result<Blockhash, RpcError> {
        let response: WithContext<Blockhash> = self
            .call("getLatestBlockhash", json!([{"commitment": "confirmed"}]))
            .await?;
        Ok(response.value)
    }

    async fn block_height(&self) -> Result<u64, RpcError> {
        self.call("getBlockHeight", json!([{"commitment": "confirmed"}]))
            .await
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> Result<TxSignature, RpcError> {
        let encoded = BASE64.encode(tx.as_bytes());
        let signature: String = self
            .call(
                "sendTransaction",
                json!([
                    encoded,
                    {
                        "encoding": "base64",
                        "skipPreflight": false,
                        "preflightCommitment": "confirmed",
                    }
                ]),
            )
            .await?;
        Ok(TxSignature::new(signature))
    }

    async fn signature_status(&self, signature: &TxSignature) -> Result<TxStatus, RpcError> {
        let response: WithContext<Vec<Option<SignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature.as_str()], {"searchTransactionHistory": true}]),
            )
            .await?;

        let Some(Some(status)) = response.value.into_iter().next() else {
            return Ok(TxStatus::Pending);
        };

        if let Some(err) = status.err {
            return Ok(TxStatus::Failed(err.to_string()));
        }

        match status.confirmation_status.as_deref() {
            Some("confirmed" | "finalized") => Ok(TxStatus::Confirmed),
            // "processed" has not reached our commitment level yet.
            _ => Ok(TxStatus::Pending),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_are_transient() {
        let err = RpcError::Malformed("x".into());
        assert!(!err.is_transient());

        let behind = RpcError::Node {
            code: -32005,
            message: "node is behind".into(),
        };
        assert!(behind.is_transient());

        let rejected = RpcError::Node {
            code: -32002,
            message: "blockhash not found".into(),
        };
        assert!(!rejected.is_transient());
    }

    #[test]
    fn test_signature_status_parsing() {
        let body: RpcEnvelope<WithContext<Vec<Option<SignatureStatus>>>> = serde_json::from_value(
            json!({
                "result": {
                    "context": {"slot": 100},
                    "value": [{"confirmationStatus": "confirmed", "err": null}]
                },
                "error": null
            }),
        )
        .unwrap();

        let status = body
            .result
            .unwrap()
            .value
            .into_iter()
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(status.confirmation_status.as_deref(), Some("confirmed"));
        assert!(status.err.is_none());
    }

    #[test]
    fn test_envelope_error_parsing() {
        let body: RpcEnvelope<Value> = serde_json::from_value(json!({
            "error": {"code": -32005, "message": "Node is behind by 100 slots"}
        }))
        .unwrap();

        let err = body.error.unwrap();
        assert_eq!(err.code, -32005);
    }
}
