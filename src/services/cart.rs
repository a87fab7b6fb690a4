//! Session cart operations.
//!
//! Every call takes the session token explicitly and every mutation is scoped
//! to it, so guessing another session's row ids does nothing.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::aggregates::{CartKey, CartLine};
use crate::domain::value_objects::{normalize_variant, Quantity, SessionId};
use crate::store::{Store, StoreError};
use crate::{EcommerceError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuantityUpdate { Updated, Removed }

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn Store>,
}

impl CartService {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    /// Newest first; an unknown session is just an empty cart.
    pub async fn get_cart(&self, session: &SessionId) -> Result<Vec<CartLine>> {
        Ok(self.store.cart_lines(session).await?)
    }

    #[instrument(skip(self, session), fields(session = %session))]
    pub async fn add_item(
        &self,
        session: &SessionId,
        product_id: i64,
        quantity: i32,
        size: Option<&str>,
        color: Option<&str>,
    ) -> Result<i64> {
        let quantity = Quantity::new(quantity)
            .ok_or_else(|| EcommerceError::Validation("quantity must be at least 1".into()))?;
        if self.store.product(product_id).await?.is_none() {
            return Err(EcommerceError::ProductNotFound(product_id));
        }
        let key = CartKey {
            session_id: session.clone(),
            product_id,
            size: normalize_variant(size),
            color: normalize_variant(color),
        };
        let id = match self.store.upsert_cart_item(&key, quantity).await {
            Err(StoreError::OutOfRange(_)) => {
                return Err(EcommerceError::Validation(format!("quantity for product {product_id} is too large")));
            }
            other => other?,
        };
        debug!(cart_item_id = id, "cart item added");
        Ok(id)
    }

    /// Zero or negative removes the row, and is a no-op when the row is already gone.
    #[instrument(skip(self, session), fields(session = %session))]
    pub async fn update_quantity(&self, session: &SessionId, cart_item_id: i64, quantity: i32) -> Result<QuantityUpdate> {
        match Quantity::new(quantity) {
            None => {
                self.store.delete_cart_item(session, cart_item_id).await?;
                Ok(QuantityUpdate::Removed)
            }
            Some(q) => {
                if self.store.set_cart_quantity(session, cart_item_id, q).await? {
                    Ok(QuantityUpdate::Updated)
                } else {
                    Err(EcommerceError::CartItemNotFound(cart_item_id))
                }
            }
        }
    }

    #[instrument(skip(self, session), fields(session = %session))]
    pub async fn remove_item(&self, session: &SessionId, cart_item_id: i64) -> Result<()> {
        if !self.store.delete_cart_item(session, cart_item_id).await? {
            debug!(cart_item_id, "cart item already gone");
        }
        Ok(())
    }

    pub async fn clear(&self, session: &SessionId) -> Result<u64> {
        Ok(self.store.clear_cart(session).await?)
    }
}
