//! Client-local persisted state: cart, profile, and completed orders.
//!
//! Everything lives in one flat JSON document under a fixed storage key -
//! there is no server database and no schema versioning. [`LocalStore`]
//! owns the document; [`OrderRecordStore`] is the repository seam so a
//! real backend can later replace the order log without touching the
//! checkout orchestrator.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use dinero_store_core::{ProductId, ShippingAddress, TxSignature};

use crate::models::{CartItem, CartItemError, OrderRecord, UserProfile};

/// Fixed storage key; the on-disk file is `<data_dir>/<STORAGE_KEY>.json`.
pub const STORAGE_KEY: &str = "dinero-store";

/// Errors from the local store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file held JSON we couldn't understand.
    #[error("storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A cart mutation would violate a cart item invariant.
    #[error("invalid cart mutation: {0}")]
    InvalidItem(#[from] CartItemError),
}

/// Repository seam for the append-only order log.
#[async_trait]
pub trait OrderRecordStore: Send + Sync {
    /// Record a completed order, keyed by payment signature.
    ///
    /// Idempotent: recording the same signature twice is a no-op, never a
    /// duplicate. Returns `true` when the record was newly inserted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when persistence fails. The in-memory state
    /// is updated regardless, so a disk hiccup never loses the receipt for
    /// the current session.
    async fn record(&self, order: OrderRecord) -> Result<bool, StoreError>;

    /// All recorded orders, newest first.
    async fn orders(&self) -> Result<Vec<OrderRecord>, StoreError>;

    /// Look up one order by payment signature.
    async fn get(&self, signature: &TxSignature) -> Result<Option<OrderRecord>, StoreError>;
}

/// The single flat JSON document, exactly as serialized to disk.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    #[serde(default)]
    cart: Vec<CartItem>,
    #[serde(default)]
    profile: UserProfile,
    #[serde(default)]
    orders: Vec<OrderRecord>,
}

/// Client-local store for cart, profile, and order history.
///
/// Write-through: every mutation rewrites the backing file before
/// returning. Interior mutex keeps mutations serialized; reads clone.
pub struct LocalStore {
    path: PathBuf,
    state: Mutex<PersistedState>,
}

impl LocalStore {
    /// Open (or create) the store under `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if an existing file cannot be read or parsed.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = data_dir.as_ref().join(format!("{STORAGE_KEY}.json"));

        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => PersistedState::default(),
            Err(err) => return Err(err.into()),
        };

        debug!(path = %path.display(), "opened local store");
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, state: &PersistedState) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Current cart snapshot.
    pub async fn cart(&self) -> Vec<CartItem> {
        self.state.lock().await.cart.clone()
    }

    /// Cart total in the reference currency.
    pub async fn fiat_total(&self) -> Decimal {
        crate::models::cart::fiat_total(&self.state.lock().await.cart)
    }

    /// Add an item; adding a product already in the cart increments its
    /// quantity instead of creating a second line.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when persistence fails.
    #[instrument(skip(self, item), fields(product = %item.id))]
    pub async fn add_item(&self, item: CartItem) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;

        if let Some(existing) = state.cart.iter_mut().find(|i| i.id == item.id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            state.cart.push(item);
        }

        self.persist(&state).await
    }

    /// Set the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns [`CartItemError::ZeroQuantity`] (wrapped) for a zero
    /// quantity - removal is explicit, via [`Self::remove_item`].
    pub async fn update_quantity(
        &self,
        id: &ProductId,
        quantity: u32,
    ) -> Result<(), StoreError> {
        if quantity == 0 {
            return Err(CartItemError::ZeroQuantity.into());
        }

        let mut state = self.state.lock().await;
        if let Some(item) = state.cart.iter_mut().find(|i| &i.id == id) {
            item.quantity = quantity;
        }
        self.persist(&state).await
    }

    /// Remove one line from the cart.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when persistence fails.
    pub async fn remove_item(&self, id: &ProductId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.cart.retain(|i| &i.id != id);
        self.persist(&state).await
    }

    /// Clear the cart wholesale (order completion).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when persistence fails.
    pub async fn clear_cart(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.cart.clear();
        self.persist(&state).await
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// The profile's shipping address, if one has been saved.
    pub async fn shipping_address(&self) -> Option<ShippingAddress> {
        self.state.lock().await.profile.shipping_address.clone()
    }

    /// Save the shipping address, overwriting any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when persistence fails.
    pub async fn set_shipping_address(
        &self,
        address: ShippingAddress,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.profile.shipping_address = Some(address);
        self.persist(&state).await
    }
}

#[async_trait]
impl OrderRecordStore for LocalStore {
    #[instrument(skip(self, order), fields(signature = %order.signature))]
    async fn record(&self, order: OrderRecord) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;

        if state.orders.iter().any(|o| o.signature == order.signature) {
            debug!("order already recorded; skipping duplicate");
            return Ok(false);
        }

        // Newest first, matching how buyers read their history.
        state.orders.insert(0, order);
        self.persist(&state).await?;
        Ok(true)
    }

    async fn orders(&self) -> Result<Vec<OrderRecord>, StoreError> {
        Ok(self.state.lock().await.orders.clone())
    }

    async fn get(&self, signature: &TxSignature) -> Result<Option<OrderRecord>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .orders
            .iter()
            .find(|o| &o.signature == signature)
            .cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use dinero_store_core::Lamports;

    use super::*;

    async fn temp_store() -> LocalStore {
        let dir = std::env::temp_dir().join(format!("dinero-store-test-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        LocalStore::open(&dir).await.unwrap()
    }

    fn item(id: &str, cents: i64, quantity: u32) -> CartItem {
        CartItem::new(
            ProductId::new(id),
            format!("item-{id}"),
            Decimal::new(cents, 2),
            quantity,
            "",
            None,
        )
        .unwrap()
    }

    fn order(signature: &str) -> OrderRecord {
        OrderRecord {
            signature: TxSignature::new(signature),
            items: vec![item("p1", 25_00, 2)],
            fiat_total: Decimal::new(50_00, 2),
            native_amount: Lamports::new(500_000_000),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_add_item_merges_by_product() {
        let store = temp_store().await;
        store.add_item(item("p1", 19_99, 1)).await.unwrap();
        store.add_item(item("p1", 19_99, 2)).await.unwrap();

        let cart = store.cart().await;
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.first().unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn test_fiat_total() {
        let store = temp_store().await;
        store.add_item(item("p1", 25_00, 1)).await.unwrap();
        store.add_item(item("p2", 12_50, 2)).await.unwrap();
        assert_eq!(store.fiat_total().await, Decimal::new(50_00, 2));
    }

    #[tokio::test]
    async fn test_update_quantity_rejects_zero() {
        let store = temp_store().await;
        store.add_item(item("p1", 10_00, 1)).await.unwrap();
        let err = store
            .update_quantity(&ProductId::new("p1"), 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidItem(CartItemError::ZeroQuantity)
        ));
    }

    #[tokio::test]
    async fn test_record_is_idempotent_per_signature() {
        let store = temp_store().await;
        assert!(store.record(order("sig-1")).await.unwrap());
        assert!(!store.record(order("sig-1")).await.unwrap());

        let orders = store.orders().await.unwrap();
        assert_eq!(orders.len(), 1);
    }

    #[tokio::test]
    async fn test_orders_newest_first() {
        let store = temp_store().await;
        store.record(order("sig-1")).await.unwrap();
        store.record(order("sig-2")).await.unwrap();

        let orders = store.orders().await.unwrap();
        assert_eq!(orders.first().unwrap().signature.as_str(), "sig-2");
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("dinero-store-test-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        {
            let store = LocalStore::open(&dir).await.unwrap();
            store.add_item(item("p1", 19_99, 1)).await.unwrap();
            store.record(order("sig-1")).await.unwrap();
        }

        let reopened = LocalStore::open(&dir).await.unwrap();
        assert_eq!(reopened.cart().await.len(), 1);
        assert_eq!(reopened.orders().await.unwrap().len(), 1);
        assert!(
            reopened
                .get(&TxSignature::new("sig-1"))
                .await
                .unwrap()
                .is_some()
        );
    }
}
