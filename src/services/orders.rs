//! Order Engine.
//!
//! Turns a checkout request into a durable order. Line prices come from the
//! catalog, the total is derived from those lines, and the order, its items and
//! the removal of the session's cart are written as one storage unit. The
//! cart is consumed if and only if the order is recorded.
//!
//! Retried or double-clicked checkouts are not deduplicated here; callers
//! guard against resubmission.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::aggregates::{
    CustomerInfo, DraftItem, Order, OrderDetails, OrderDraft, OrderError, OrderStatus, PaymentStatus,
};
use crate::domain::events::OrderEvent;
use crate::domain::value_objects::{normalize_variant, OrderNumber, Quantity, SessionId};
use crate::services::notifications::Dispatcher;
use crate::store::{OrderFilter, Page, Store, StoreError};
use crate::{EcommerceError, Result};

/// Reads and compare-and-set writes tried before a status change gives up.
const STATUS_WRITE_ATTEMPTS: usize = 3;

/// Produces a fresh order number per call.
pub type OrderNumberSource = Arc<dyn Fn() -> OrderNumber + Send + Sync>;

/// One line of the client's cart snapshot. Only product, quantity and variant
/// are trusted; `price` is what the client displayed and is never charged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CheckoutItem {
    pub product_id: i64,
    pub quantity: i32,
    pub price: Option<Decimal>,
    pub size: Option<String>,
    pub color: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    pub order_number: OrderNumber,
    pub order_id: i64,
    pub order: OrderDetails,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StatusChange<T> {
    pub from: T,
    pub to: T,
}

#[derive(Clone)]
pub struct OrderEngine {
    store: Arc<dyn Store>,
    dispatcher: Dispatcher,
    numbers: OrderNumberSource,
    strict_transitions: bool,
}

impl OrderEngine {
    pub fn new(store: Arc<dyn Store>, dispatcher: Dispatcher, order_number_prefix: impl Into<String>) -> Self {
        let prefix = order_number_prefix.into();
        Self {
            store,
            dispatcher,
            numbers: Arc::new(move || OrderNumber::generate(&prefix)),
            strict_transitions: false,
        }
    }

    pub fn with_order_numbers(mut self, numbers: OrderNumberSource) -> Self {
        self.numbers = numbers;
        self
    }

    /// Reject backwards moves and moves out of terminal states.
    pub fn with_strict_transitions(mut self, strict: bool) -> Self {
        self.strict_transitions = strict;
        self
    }

    #[instrument(skip(self, session, customer, items), fields(session = %session, lines = items.len()))]
    pub async fn create_order(&self, session: &SessionId, customer: CustomerInfo, items: Vec<CheckoutItem>) -> Result<CreatedOrder> {
        let lines = self.price_items(&items).await?;
        let mut draft = OrderDraft::new((self.numbers)(), customer, lines)?;

        let placed = match self.store.place_order(session, &draft).await {
            Err(StoreError::Conflict(reason)) => {
                warn!(%reason, "order number taken, retrying with a new one");
                draft.renumber((self.numbers)());
                self.store.place_order(session, &draft).await
            }
            other => other,
        }
        .map_err(|e| {
            error!(error = %e, "checkout rolled back");
            EcommerceError::Storage(e)
        })?;

        let order = draft.into_details(placed.order_id, &placed.item_ids, placed.created_at);
        info!(
            order_id = order.order.id,
            order_number = %order.order.order_number,
            total = %order.order.total_amount,
            "order created"
        );
        self.dispatcher.dispatch(OrderEvent::Created { order: order.clone() });

        Ok(CreatedOrder { order_number: order.order.order_number.clone(), order_id: order.order.id, order })
    }

    /// Validates the snapshot and prices each line from the catalog. Reads only.
    async fn price_items(&self, items: &[CheckoutItem]) -> Result<Vec<DraftItem>> {
        if items.is_empty() { return Err(OrderError::NoItems.into()); }

        let mut quantities = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            let quantity = Quantity::new(item.quantity)
                .ok_or_else(|| EcommerceError::Validation(format!("items[{idx}]: quantity must be at least 1")))?;
            quantities.push(quantity);
        }

        let mut ids: Vec<i64> = items.iter().map(|i| i.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let products: HashMap<i64, _> = self.store.products_by_ids(&ids).await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        items.iter().zip(quantities).map(|(item, quantity)| -> Result<DraftItem> {
            let product = products.get(&item.product_id).ok_or(EcommerceError::ProductNotFound(item.product_id))?;
            let price = product.effective_price();
            if item.price.is_some_and(|claimed| claimed != price) {
                debug!(product_id = product.id, claimed = ?item.price, %price, "client price differs from catalog");
            }
            Ok(DraftItem {
                product_id: product.id,
                name: product.name.clone(),
                image: product.image.clone(),
                quantity,
                price,
                size: normalize_variant(item.size.as_deref()),
                color: normalize_variant(item.color.as_deref()),
            })
        }).collect()
    }

    pub async fn order_by_number(&self, order_number: &str) -> Result<OrderDetails> {
        self.store.order_by_number(&OrderNumber::from_raw(order_number)).await?
            .ok_or_else(|| EcommerceError::OrderNotFound(order_number.to_string()))
    }

    pub async fn order_by_id(&self, order_id: i64) -> Result<OrderDetails> {
        self.store.order_by_id(order_id).await?
            .ok_or_else(|| EcommerceError::OrderNotFound(order_id.to_string()))
    }

    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Page<Order>> {
        Ok(self.store.list_orders(filter).await?)
    }

    /// Any status may replace any other unless strict transitions are on.
    ///
    /// The write only lands while the order still holds the status that was
    /// read; a concurrent change sends us back to re-read and re-check.
    #[instrument(skip(self))]
    pub async fn set_status(&self, order_id: i64, status: OrderStatus) -> Result<StatusChange<OrderStatus>> {
        for _ in 0..STATUS_WRITE_ATTEMPTS {
            let current = self.order_by_id(order_id).await?.order;
            if self.strict_transitions && !current.status.can_transition_to(status) {
                return Err(OrderError::InvalidTransition { from: current.status, to: status }.into());
            }
            if !self.store.set_order_status(order_id, current.status, status).await? {
                debug!(read = %current.status, "order status moved before our write, re-reading");
                continue;
            }
            if current.status != status {
                info!(from = %current.status, to = %status, "order status changed");
                self.dispatcher.dispatch(OrderEvent::StatusChanged {
                    order_id, order_number: current.order_number, from: current.status, to: status,
                });
            }
            return Ok(StatusChange { from: current.status, to: status });
        }
        warn!("giving up on status change after repeated concurrent updates");
        Err(OrderError::ConcurrentUpdate.into())
    }

    /// Independent of the order status; cancelling never touches payment.
    #[instrument(skip(self))]
    pub async fn set_payment_status(&self, order_id: i64, status: PaymentStatus) -> Result<StatusChange<PaymentStatus>> {
        for _ in 0..STATUS_WRITE_ATTEMPTS {
            let current = self.order_by_id(order_id).await?.order;
            if self.strict_transitions && !current.payment_status.can_transition_to(status) {
                return Err(OrderError::InvalidPaymentTransition { from: current.payment_status, to: status }.into());
            }
            if !self.store.set_payment_status(order_id, current.payment_status, status).await? {
                debug!(read = %current.payment_status, "payment status moved before our write, re-reading");
                continue;
            }
            if current.payment_status != status {
                info!(from = %current.payment_status, to = %status, "payment status changed");
                self.dispatcher.dispatch(OrderEvent::PaymentStatusChanged {
                    order_id, order_number: current.order_number, from: current.payment_status, to: status,
                });
            }
            return Ok(StatusChange { from: current.payment_status, to: status });
        }
        warn!("giving up on payment change after repeated concurrent updates");
        Err(OrderError::ConcurrentUpdate.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_order(&self, order_id: i64) -> Result<()> {
        if !self.store.delete_order(order_id).await? {
            return Err(EcommerceError::OrderNotFound(order_id.to_string()));
        }
        info!("order deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::NewProduct;
    use crate::services::notifications::{AdminInbox, Notifier, NotifyError};
    use crate::store::{
        CartStore, CatalogStore, FailPoint, MemoryStore, NotificationStore, OrderStore, PlacedOrder, ProductFilter, RevenueRow, StoreResult, TimeWindow,
    };
    use crate::domain::aggregates::{CartKey, CartLine, NewNotification, Notification, Product, ProductChanges};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Fixture {
        store: Arc<MemoryStore>,
        engine: OrderEngine,
        a: i64,
        b: i64,
    }

    async fn fixture(dispatcher: Dispatcher) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let a = store.create_product(NewProduct { name: "A".into(), price: Decimal::new(1000, 2), ..Default::default() }).await.unwrap().id;
        let b = store.create_product(NewProduct {
            name: "B".into(), price: Decimal::new(900, 2), sale_price: Some(Decimal::new(500, 2)),
            image: Some("/b.png".into()), ..Default::default()
        }).await.unwrap().id;
        let engine = OrderEngine::new(store.clone(), dispatcher, "ORD");
        Fixture { store, engine, a, b }
    }

    fn session() -> SessionId { SessionId::parse("sess-1").unwrap() }

    fn customer() -> CustomerInfo {
        CustomerInfo {
            name: "Grace".into(), email: "grace@example.com".into(), phone: "+15550001".into(),
            address: "1 Main St".into(), city: "Springfield".into(), country: "US".into(),
        }
    }

    fn line(product_id: i64, quantity: i32) -> CheckoutItem {
        CheckoutItem { product_id, quantity, ..Default::default() }
    }

    async fn fill_cart(f: &Fixture) {
        for (pid, q) in [(f.a, 2), (f.b, 1)] {
            let key = CartKey { session_id: session(), product_id: pid, size: None, color: None };
            f.store.upsert_cart_item(&key, Quantity::new(q).unwrap()).await.unwrap();
        }
    }

    fn scripted(numbers: &[&str]) -> OrderNumberSource {
        let queue = Mutex::new(numbers.iter().map(|n| OrderNumber::from_raw(*n)).collect::<VecDeque<_>>());
        Arc::new(move || queue.lock().unwrap().pop_front().unwrap_or_else(|| OrderNumber::generate("ORD")))
    }

    #[tokio::test]
    async fn test_checkout_consumes_cart() {
        let f = fixture(Dispatcher::default()).await;
        fill_cart(&f).await;

        let created = f.engine.create_order(&session(), customer(), vec![line(f.a, 2), line(f.b, 1)]).await.unwrap();

        assert_eq!(created.order.order.total_amount, Decimal::new(2500, 2));
        assert_eq!(created.order.order.status, OrderStatus::Pending);
        assert_eq!(created.order.order.payment_status, PaymentStatus::Pending);
        assert_eq!(created.order.items.len(), 2);
        assert_eq!(created.order.items[1].image.as_deref(), Some("/b.png"));
        assert!(f.store.cart_lines(&session()).await.unwrap().is_empty());

        let stored = f.engine.order_by_number(created.order_number.as_str()).await.unwrap();
        assert_eq!(stored, created.order);
    }

    #[tokio::test]
    async fn test_client_prices_are_ignored() {
        let f = fixture(Dispatcher::default()).await;
        let mut cheap = line(f.a, 3);
        cheap.price = Some(Decimal::new(1, 2));
        let created = f.engine.create_order(&session(), customer(), vec![cheap]).await.unwrap();
        assert_eq!(created.order.order.total_amount, Decimal::new(3000, 2));
        assert_eq!(created.order.items[0].price, Decimal::new(1000, 2));
    }

    #[tokio::test]
    async fn test_failed_write_keeps_cart_and_creates_nothing() {
        let f = fixture(Dispatcher::default()).await;
        fill_cart(&f).await;
        f.store.fail_once_at(FailPoint::InsertItems);

        let result = f.engine.create_order(&session(), customer(), vec![line(f.a, 2), line(f.b, 1)]).await;

        assert!(matches!(result, Err(EcommerceError::Storage(_))));
        assert_eq!(f.store.cart_lines(&session()).await.unwrap().len(), 2);
        assert_eq!(f.engine.list_orders(&OrderFilter::default()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_rejected_before_storage() {
        let f = fixture(Dispatcher::default()).await;
        fill_cart(&f).await;

        assert!(matches!(f.engine.create_order(&session(), customer(), vec![]).await, Err(EcommerceError::Order(OrderError::NoItems))));
        assert!(matches!(f.engine.create_order(&session(), customer(), vec![line(f.a, 0)]).await, Err(EcommerceError::Validation(_))));
        assert!(matches!(f.engine.create_order(&session(), customer(), vec![line(404, 1)]).await, Err(EcommerceError::ProductNotFound(404))));

        assert_eq!(f.store.cart_lines(&session()).await.unwrap().len(), 2);
        assert_eq!(f.engine.list_orders(&OrderFilter::default()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_zero_total_rejected() {
        let f = fixture(Dispatcher::default()).await;
        let free = f.store.create_product(NewProduct { name: "Sticker".into(), price: Decimal::ZERO, ..Default::default() }).await.unwrap();
        let result = f.engine.create_order(&session(), customer(), vec![line(free.id, 4)]).await;
        assert!(matches!(result, Err(EcommerceError::Order(OrderError::NonPositiveTotal(_)))));
    }

    #[tokio::test]
    async fn test_total_beyond_storage_rejected() {
        let f = fixture(Dispatcher::default()).await;
        fill_cart(&f).await;
        let result = f.engine.create_order(&session(), customer(), vec![line(f.a, 2_000_000_000)]).await;
        assert!(matches!(result, Err(EcommerceError::Order(OrderError::TotalTooLarge))));
        assert_eq!(f.store.cart_lines(&session()).await.unwrap().len(), 2);
        assert_eq!(f.engine.list_orders(&OrderFilter::default()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_order_number_collision_retries_once() {
        let f = fixture(Dispatcher::default()).await;
        let engine = f.engine.clone().with_order_numbers(scripted(&["ORD-A", "ORD-A", "ORD-B", "ORD-A", "ORD-B"]));

        let first = engine.create_order(&session(), customer(), vec![line(f.a, 1)]).await.unwrap();
        assert_eq!(first.order_number.as_str(), "ORD-A");
        let second = engine.create_order(&session(), customer(), vec![line(f.a, 1)]).await.unwrap();
        assert_eq!(second.order_number.as_str(), "ORD-B");

        fill_cart(&f).await;
        let third = engine.create_order(&session(), customer(), vec![line(f.a, 1)]).await;
        assert!(matches!(third, Err(EcommerceError::Storage(StoreError::Conflict(_)))));
        assert_eq!(f.store.cart_lines(&session()).await.unwrap().len(), 2);
    }

    struct Broken;

    #[async_trait]
    impl Notifier for Broken {
        fn name(&self) -> &'static str { "broken" }
        async fn notify(&self, _: &OrderEvent) -> std::result::Result<(), NotifyError> {
            Err(NotifyError::Publish("unreachable".into()))
        }
    }

    #[tokio::test]
    async fn test_notification_failure_keeps_order() {
        let f = fixture(Dispatcher::new(vec![Arc::new(Broken) as Arc<dyn Notifier>])).await;
        let created = f.engine.create_order(&session(), customer(), vec![line(f.a, 1)]).await.unwrap();
        tokio::task::yield_now().await;
        assert!(f.engine.order_by_id(created.order_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_admin_inbox_notified_after_commit() {
        let store = Arc::new(MemoryStore::new());
        let inbox: Arc<dyn Notifier> = Arc::new(AdminInbox::new(store.clone()));
        let pid = store.create_product(NewProduct { name: "A".into(), price: Decimal::TEN, ..Default::default() }).await.unwrap().id;
        let engine = OrderEngine::new(store.clone(), Dispatcher::new(vec![inbox]), "ORD");

        let created = engine.create_order(&session(), customer(), vec![line(pid, 1)]).await.unwrap();

        let mut delivered = Vec::new();
        for _ in 0..50 {
            delivered = store.list_notifications(false).await.unwrap();
            if !delivered.is_empty() { break; }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].order_id, Some(created.order_id));
    }

    #[tokio::test]
    async fn test_status_is_unconstrained_by_default() {
        let f = fixture(Dispatcher::default()).await;
        let created = f.engine.create_order(&session(), customer(), vec![line(f.a, 1)]).await.unwrap();

        f.engine.set_status(created.order_id, OrderStatus::Delivered).await.unwrap();
        let change = f.engine.set_status(created.order_id, OrderStatus::Pending).await.unwrap();
        assert_eq!(change, StatusChange { from: OrderStatus::Delivered, to: OrderStatus::Pending });

        assert!(matches!(f.engine.set_status(999, OrderStatus::Shipped).await, Err(EcommerceError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn test_strict_transitions() {
        let f = fixture(Dispatcher::default()).await;
        let engine = f.engine.clone().with_strict_transitions(true);
        let created = engine.create_order(&session(), customer(), vec![line(f.a, 1)]).await.unwrap();

        engine.set_status(created.order_id, OrderStatus::Processing).await.unwrap();
        engine.set_status(created.order_id, OrderStatus::Cancelled).await.unwrap();
        assert!(matches!(
            engine.set_status(created.order_id, OrderStatus::Processing).await,
            Err(EcommerceError::Order(OrderError::InvalidTransition { .. }))
        ));

        engine.set_payment_status(created.order_id, PaymentStatus::Paid).await.unwrap();
        assert!(engine.set_payment_status(created.order_id, PaymentStatus::Pending).await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_leaves_payment_untouched() {
        let f = fixture(Dispatcher::default()).await;
        let created = f.engine.create_order(&session(), customer(), vec![line(f.a, 1)]).await.unwrap();
        f.engine.set_payment_status(created.order_id, PaymentStatus::Paid).await.unwrap();
        f.engine.set_status(created.order_id, OrderStatus::Cancelled).await.unwrap();
        let order = f.engine.order_by_id(created.order_id).await.unwrap().order;
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_delete_order() {
        let f = fixture(Dispatcher::default()).await;
        let created = f.engine.create_order(&session(), customer(), vec![line(f.a, 1)]).await.unwrap();
        f.engine.delete_order(created.order_id).await.unwrap();
        assert!(matches!(f.engine.order_by_id(created.order_id).await, Err(EcommerceError::OrderNotFound(_))));
        assert!(matches!(f.engine.delete_order(created.order_id).await, Err(EcommerceError::OrderNotFound(_))));
    }

    /// Lands another admin's status write between the engine's read and its own write.
    struct Interleaved {
        inner: MemoryStore,
        intruder: Mutex<Option<OrderStatus>>,
    }

    #[async_trait]
    impl CatalogStore for Interleaved {
        async fn product(&self, id: i64) -> StoreResult<Option<Product>> { self.inner.product(id).await }
        async fn products_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Product>> { self.inner.products_by_ids(ids).await }
        async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Page<Product>> { self.inner.list_products(filter).await }
        async fn create_product(&self, product: NewProduct) -> StoreResult<Product> { self.inner.create_product(product).await }
        async fn update_product(&self, id: i64, changes: ProductChanges) -> StoreResult<Option<Product>> {
            self.inner.update_product(id, changes).await
        }
    }

    #[async_trait]
    impl CartStore for Interleaved {
        async fn cart_lines(&self, session: &SessionId) -> StoreResult<Vec<CartLine>> { self.inner.cart_lines(session).await }
        async fn upsert_cart_item(&self, key: &CartKey, quantity: Quantity) -> StoreResult<i64> {
            self.inner.upsert_cart_item(key, quantity).await
        }
        async fn set_cart_quantity(&self, session: &SessionId, item_id: i64, quantity: Quantity) -> StoreResult<bool> {
            self.inner.set_cart_quantity(session, item_id, quantity).await
        }
        async fn delete_cart_item(&self, session: &SessionId, item_id: i64) -> StoreResult<bool> {
            self.inner.delete_cart_item(session, item_id).await
        }
        async fn clear_cart(&self, session: &SessionId) -> StoreResult<u64> { self.inner.clear_cart(session).await }
    }

    #[async_trait]
    impl OrderStore for Interleaved {
        async fn place_order(&self, session: &SessionId, draft: &OrderDraft) -> StoreResult<PlacedOrder> {
            self.inner.place_order(session, draft).await
        }
        async fn order_by_id(&self, id: i64) -> StoreResult<Option<OrderDetails>> { self.inner.order_by_id(id).await }
        async fn order_by_number(&self, number: &OrderNumber) -> StoreResult<Option<OrderDetails>> {
            self.inner.order_by_number(number).await
        }
        async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Page<Order>> { self.inner.list_orders(filter).await }
        async fn set_order_status(&self, id: i64, from: OrderStatus, to: OrderStatus) -> StoreResult<bool> {
            let intruder = self.intruder.lock().unwrap().take();
            if let Some(theirs) = intruder {
                assert!(self.inner.set_order_status(id, from, theirs).await?);
            }
            self.inner.set_order_status(id, from, to).await
        }
        async fn set_payment_status(&self, id: i64, from: PaymentStatus, to: PaymentStatus) -> StoreResult<bool> {
            self.inner.set_payment_status(id, from, to).await
        }
        async fn delete_order(&self, id: i64) -> StoreResult<bool> { self.inner.delete_order(id).await }
        async fn revenue_rows(&self, window: Option<TimeWindow>) -> StoreResult<Vec<RevenueRow>> {
            self.inner.revenue_rows(window).await
        }
    }

    #[async_trait]
    impl NotificationStore for Interleaved {
        async fn insert_notification(&self, notification: NewNotification) -> StoreResult<Notification> {
            self.inner.insert_notification(notification).await
        }
        async fn list_notifications(&self, unread_only: bool) -> StoreResult<Vec<Notification>> {
            self.inner.list_notifications(unread_only).await
        }
        async fn mark_notification_read(&self, id: i64) -> StoreResult<bool> { self.inner.mark_notification_read(id).await }
    }

    async fn interleaved(strict: bool) -> (Arc<Interleaved>, OrderEngine, i64) {
        let store = Arc::new(Interleaved { inner: MemoryStore::new(), intruder: Mutex::new(None) });
        let pid = store.create_product(NewProduct { name: "A".into(), price: Decimal::TEN, ..Default::default() }).await.unwrap().id;
        let engine = OrderEngine::new(store.clone(), Dispatcher::default(), "ORD").with_strict_transitions(strict);
        let order_id = engine.create_order(&session(), customer(), vec![line(pid, 1)]).await.unwrap().order_id;
        (store, engine, order_id)
    }

    #[tokio::test]
    async fn test_strict_status_rechecked_after_concurrent_cancel() {
        let (store, engine, order_id) = interleaved(true).await;
        *store.intruder.lock().unwrap() = Some(OrderStatus::Cancelled);

        let result = engine.set_status(order_id, OrderStatus::Processing).await;

        assert!(matches!(
            result,
            Err(EcommerceError::Order(OrderError::InvalidTransition { from: OrderStatus::Cancelled, to: OrderStatus::Processing }))
        ));
        assert_eq!(engine.order_by_id(order_id).await.unwrap().order.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_status_change_reports_status_it_replaced() {
        let (store, engine, order_id) = interleaved(false).await;
        *store.intruder.lock().unwrap() = Some(OrderStatus::Shipped);

        let change = engine.set_status(order_id, OrderStatus::Processing).await.unwrap();

        assert_eq!(change, StatusChange { from: OrderStatus::Shipped, to: OrderStatus::Processing });
        assert_eq!(engine.order_by_id(order_id).await.unwrap().order.status, OrderStatus::Processing);
    }
}
