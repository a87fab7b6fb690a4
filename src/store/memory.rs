//! In-process store.
//!
//! Backs local runs without `DATABASE_URL` and the test suite. Multi-table
//! writes are applied to a staged copy of the state and swapped in only when
//! every step succeeded, which gives the same all-or-nothing behavior as a
//! database transaction.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use super::{
    CartStore, CatalogStore, NotificationStore, OrderFilter, OrderStore, Page, PlacedOrder,
    ProductFilter, RevenueRow, StoreError, StoreResult, TimeWindow,
};
use crate::domain::aggregates::{
    effective_price, CartItem, CartKey, CartLine, NewNotification, NewProduct, Notification, Order,
    OrderDetails, OrderDraft, OrderItem, OrderStatus, PaymentStatus, Product, ProductChanges,
};
use crate::domain::aggregates::cart::sort_newest_first;
use crate::domain::value_objects::{OrderNumber, Quantity, SessionId};

/// Step of a multi-table write that can be made to fail once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailPoint {
    InsertOrder,
    InsertItems,
    ClearCart,
    DeleteOrder,
}

#[derive(Clone, Debug, Default)]
struct Sequence(i64);

impl Sequence {
    fn next(&mut self) -> i64 { self.0 += 1; self.0 }
}

#[derive(Clone, Debug, Default)]
struct State {
    product_seq: Sequence,
    cart_seq: Sequence,
    order_seq: Sequence,
    item_seq: Sequence,
    notification_seq: Sequence,
    products: BTreeMap<i64, Product>,
    cart: BTreeMap<i64, CartItem>,
    orders: BTreeMap<i64, Order>,
    order_items: BTreeMap<i64, OrderItem>,
    notifications: BTreeMap<i64, Notification>,
}

impl State {
    fn details(&self, order: &Order) -> OrderDetails {
        let items = self.order_items.values()
            .filter(|i| i.order_id == order.id)
            .map(|i| {
                let mut item = i.clone();
                if let Some(p) = self.products.get(&i.product_id) {
                    item.name = p.name.clone();
                    item.image = p.image.clone();
                }
                item
            })
            .collect();
        OrderDetails { order: order.clone(), items }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_point: Mutex<Option<FailPoint>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Makes the next write that reaches `point` fail with [`StoreError::Unavailable`].
    pub fn fail_once_at(&self, point: FailPoint) {
        *self.fail_point.lock().unwrap_or_else(PoisonError::into_inner) = Some(point);
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn trip(&self, point: FailPoint) -> StoreResult<()> {
        let mut armed = self.fail_point.lock().unwrap_or_else(PoisonError::into_inner);
        if *armed == Some(point) {
            *armed = None;
            return Err(StoreError::Unavailable(format!("injected failure at {point:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn product(&self, id: i64) -> StoreResult<Option<Product>> {
        Ok(self.state().products.get(&id).cloned())
    }

    async fn products_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Product>> {
        let state = self.state();
        Ok(ids.iter().filter_map(|id| state.products.get(id).cloned()).collect())
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Page<Product>> {
        let state = self.state();
        let mut matching: Vec<Product> = state.products.values().filter(|p| filter.matches(p)).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = matching.len() as i64;
        let data = matching.into_iter()
            .skip(filter.paging.offset() as usize)
            .take(filter.paging.limit() as usize)
            .collect();
        Ok(Page { data, total, page: filter.paging.page })
    }

    async fn create_product(&self, product: NewProduct) -> StoreResult<Product> {
        let mut state = self.state();
        let id = state.product_seq.next();
        let product = product.into_product(id, Utc::now());
        state.products.insert(id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: i64, changes: ProductChanges) -> StoreResult<Option<Product>> {
        let mut state = self.state();
        Ok(state.products.get_mut(&id).map(|p| { p.apply(changes); p.clone() }))
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn cart_lines(&self, session: &SessionId) -> StoreResult<Vec<CartLine>> {
        let state = self.state();
        let mut lines: Vec<CartLine> = state.cart.values()
            .filter(|c| &c.session_id == session)
            .filter_map(|c| state.products.get(&c.product_id).map(|p| CartLine {
                id: c.id,
                product_id: p.id,
                name: p.name.clone(),
                description: p.description.clone(),
                price: effective_price(p.price, p.sale_price),
                image: p.image.clone(),
                quantity: c.quantity.value(),
                size: c.size.clone(),
                color: c.color.clone(),
                added_at: c.created_at,
            }))
            .collect();
        sort_newest_first(&mut lines);
        Ok(lines)
    }

    async fn upsert_cart_item(&self, key: &CartKey, quantity: Quantity) -> StoreResult<i64> {
        let mut state = self.state();
        if !state.products.contains_key(&key.product_id) {
            return Err(StoreError::Unavailable(format!("product {} does not exist", key.product_id)));
        }
        if let Some(existing) = state.cart.values_mut().find(|c| &c.key() == key) {
            existing.quantity = existing.quantity.checked_add(quantity)
                .ok_or_else(|| StoreError::OutOfRange(format!("cart item {} quantity", existing.id)))?;
            return Ok(existing.id);
        }
        let id = state.cart_seq.next();
        state.cart.insert(id, CartItem {
            id,
            session_id: key.session_id.clone(),
            product_id: key.product_id,
            quantity,
            size: key.size.clone(),
            color: key.color.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn set_cart_quantity(&self, session: &SessionId, item_id: i64, quantity: Quantity) -> StoreResult<bool> {
        let mut state = self.state();
        match state.cart.get_mut(&item_id) {
            Some(item) if &item.session_id == session => { item.quantity = quantity; Ok(true) }
            _ => Ok(false),
        }
    }

    async fn delete_cart_item(&self, session: &SessionId, item_id: i64) -> StoreResult<bool> {
        let mut state = self.state();
        let owned = state.cart.get(&item_id).is_some_and(|c| &c.session_id == session);
        if owned { state.cart.remove(&item_id); }
        Ok(owned)
    }

    async fn clear_cart(&self, session: &SessionId) -> StoreResult<u64> {
        let mut state = self.state();
        let before = state.cart.len();
        state.cart.retain(|_, c| &c.session_id != session);
        Ok((before - state.cart.len()) as u64)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn place_order(&self, session: &SessionId, draft: &OrderDraft) -> StoreResult<PlacedOrder> {
        let mut state = self.state();
        let mut staged = state.clone();

        if staged.orders.values().any(|o| &o.order_number == draft.order_number()) {
            return Err(StoreError::Conflict(format!("order number {} already exists", draft.order_number())));
        }
        self.trip(FailPoint::InsertOrder)?;
        let order_id = staged.order_seq.next();
        let created_at = Utc::now();

        let mut item_ids = Vec::with_capacity(draft.items().len());
        for _ in draft.items() {
            item_ids.push(staged.item_seq.next());
        }
        let details = draft.clone().into_details(order_id, &item_ids, created_at);
        for item in details.items {
            if !staged.products.contains_key(&item.product_id) {
                return Err(StoreError::Unavailable(format!("product {} does not exist", item.product_id)));
            }
            staged.order_items.insert(item.id, item);
            self.trip(FailPoint::InsertItems)?;
        }
        staged.orders.insert(order_id, details.order);

        self.trip(FailPoint::ClearCart)?;
        staged.cart.retain(|_, c| &c.session_id != session);

        *state = staged;
        Ok(PlacedOrder { order_id, item_ids, created_at })
    }

    async fn order_by_id(&self, id: i64) -> StoreResult<Option<OrderDetails>> {
        let state = self.state();
        Ok(state.orders.get(&id).map(|o| state.details(o)))
    }

    async fn order_by_number(&self, number: &OrderNumber) -> StoreResult<Option<OrderDetails>> {
        let state = self.state();
        Ok(state.orders.values().find(|o| &o.order_number == number).map(|o| state.details(o)))
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Page<Order>> {
        let state = self.state();
        let mut matching: Vec<Order> = state.orders.values()
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = matching.len() as i64;
        let data = matching.into_iter()
            .skip(filter.paging.offset() as usize)
            .take(filter.paging.limit() as usize)
            .collect();
        Ok(Page { data, total, page: filter.paging.page })
    }

    async fn set_order_status(&self, id: i64, from: OrderStatus, to: OrderStatus) -> StoreResult<bool> {
        let mut state = self.state();
        match state.orders.get_mut(&id) {
            Some(o) if o.status == from => { o.status = to; Ok(true) }
            _ => Ok(false),
        }
    }

    async fn set_payment_status(&self, id: i64, from: PaymentStatus, to: PaymentStatus) -> StoreResult<bool> {
        let mut state = self.state();
        match state.orders.get_mut(&id) {
            Some(o) if o.payment_status == from => { o.payment_status = to; Ok(true) }
            _ => Ok(false),
        }
    }

    async fn delete_order(&self, id: i64) -> StoreResult<bool> {
        let mut state = self.state();
        if !state.orders.contains_key(&id) { return Ok(false); }
        let mut staged = state.clone();
        staged.order_items.retain(|_, i| i.order_id != id);
        self.trip(FailPoint::DeleteOrder)?;
        staged.notifications.retain(|_, n| n.order_id != Some(id));
        staged.orders.remove(&id);
        *state = staged;
        Ok(true)
    }

    async fn revenue_rows(&self, window: Option<TimeWindow>) -> StoreResult<Vec<RevenueRow>> {
        let state = self.state();
        Ok(state.orders.values()
            .filter(|o| o.status.counts_toward_revenue())
            .filter(|o| window.map_or(true, |w| w.contains(o.created_at)))
            .map(|o| RevenueRow { created_at: o.created_at, total_amount: o.total_amount, status: o.status })
            .collect())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, notification: NewNotification) -> StoreResult<Notification> {
        let mut state = self.state();
        if let Some(order_id) = notification.order_id {
            if !state.orders.contains_key(&order_id) {
                return Err(StoreError::Unavailable(format!("order {order_id} does not exist")));
            }
        }
        let id = state.notification_seq.next();
        let notification = notification.into_notification(id, Utc::now());
        state.notifications.insert(id, notification.clone());
        Ok(notification)
    }

    async fn list_notifications(&self, unread_only: bool) -> StoreResult<Vec<Notification>> {
        let state = self.state();
        let mut list: Vec<Notification> = state.notifications.values()
            .filter(|n| !unread_only || !n.is_read)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(list)
    }

    async fn mark_notification_read(&self, id: i64) -> StoreResult<bool> {
        let mut state = self.state();
        Ok(state.notifications.get_mut(&id).map(|n| n.is_read = true).is_some())
    }
}
