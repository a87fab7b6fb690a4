//! Storage seams.
//!
//! Every backend implements the four concern traits below; services hold an
//! `Arc<dyn Store>`. Only [`OrderStore::place_order`] and
//! [`OrderStore::delete_order`] span several tables, and both run as a single
//! all-or-nothing unit.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::domain::aggregates::{
    CartKey, CartLine, NewNotification, NewProduct, Notification, Order, OrderDetails, OrderDraft,
    OrderStatus, PaymentStatus, Product, ProductChanges,
};
use crate::domain::value_objects::{OrderNumber, Quantity, SessionId};

pub use memory::{FailPoint, MemoryStore};
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A value no longer fits its column, such as a merged cart quantity.
    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// One page of a listing, newest first.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Paging {
    pub page: u32,
    pub per_page: u32,
}

impl Paging {
    pub const MAX_PER_PAGE: u32 = 100;

    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(20).clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 { i64::from(self.page - 1) * i64::from(self.per_page) }
    pub fn limit(&self) -> i64 { i64::from(self.per_page) }
}

impl Default for Paging {
    fn default() -> Self { Self::new(None, None) }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub featured: Option<bool>,
    pub paging: Paging,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        self.category.as_ref().map_or(true, |c| &product.category == c)
            && self.subcategory.as_ref().map_or(true, |s| product.subcategory.as_ref() == Some(s))
            && self.featured.map_or(true, |f| product.featured == f)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub paging: Paging,
}

/// Half-open `[start, end)` range of order creation times.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool { at >= self.start && at < self.end }
}

/// The three facts revenue reporting reads from an order.
#[derive(Clone, Debug, PartialEq)]
pub struct RevenueRow {
    pub created_at: DateTime<Utc>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
}

/// Ids assigned by the atomic checkout unit.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedOrder {
    pub order_id: i64,
    pub item_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn product(&self, id: i64) -> StoreResult<Option<Product>>;
    async fn products_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Product>>;
    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Page<Product>>;
    async fn create_product(&self, product: NewProduct) -> StoreResult<Product>;
    async fn update_product(&self, id: i64, changes: ProductChanges) -> StoreResult<Option<Product>>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn cart_lines(&self, session: &SessionId) -> StoreResult<Vec<CartLine>>;
    /// Inserts the row or grows the quantity of the row with the same key. Returns its id.
    /// A merged quantity beyond `i32::MAX` yields [`StoreError::OutOfRange`] and leaves the row as it was.
    async fn upsert_cart_item(&self, key: &CartKey, quantity: Quantity) -> StoreResult<i64>;
    /// `false` when no row with this id belongs to the session.
    async fn set_cart_quantity(&self, session: &SessionId, item_id: i64, quantity: Quantity) -> StoreResult<bool>;
    async fn delete_cart_item(&self, session: &SessionId, item_id: i64) -> StoreResult<bool>;
    async fn clear_cart(&self, session: &SessionId) -> StoreResult<u64>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Writes the order and its items and empties the session's cart, all or nothing.
    /// A taken order number yields [`StoreError::Conflict`].
    async fn place_order(&self, session: &SessionId, draft: &OrderDraft) -> StoreResult<PlacedOrder>;
    async fn order_by_id(&self, id: i64) -> StoreResult<Option<OrderDetails>>;
    async fn order_by_number(&self, number: &OrderNumber) -> StoreResult<Option<OrderDetails>>;
    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Page<Order>>;
    /// Writes `to` only while the order is still in `from`. `false` when the
    /// order is gone or another writer moved it first.
    async fn set_order_status(&self, id: i64, from: OrderStatus, to: OrderStatus) -> StoreResult<bool>;
    /// Same compare-and-set as [`OrderStore::set_order_status`], on the payment axis.
    async fn set_payment_status(&self, id: i64, from: PaymentStatus, to: PaymentStatus) -> StoreResult<bool>;
    /// Removes the order with its items and admin notifications, all or nothing.
    async fn delete_order(&self, id: i64) -> StoreResult<bool>;
    /// Orders in a revenue status, optionally limited to a creation window.
    async fn revenue_rows(&self, window: Option<TimeWindow>) -> StoreResult<Vec<RevenueRow>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: NewNotification) -> StoreResult<Notification>;
    async fn list_notifications(&self, unread_only: bool) -> StoreResult<Vec<Notification>>;
    async fn mark_notification_read(&self, id: i64) -> StoreResult<bool>;
}

pub trait Store: CatalogStore + CartStore + OrderStore + NotificationStore {}

impl<T: CatalogStore + CartStore + OrderStore + NotificationStore> Store for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging_bounds() {
        let p = Paging::new(Some(0), Some(1000));
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, Paging::MAX_PER_PAGE);
        assert_eq!(Paging::new(Some(3), Some(20)).offset(), 40);
    }
}
