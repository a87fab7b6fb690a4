//! `PostgreSQL` store.
//!
//! Tables: `products`, `cart`, `orders`, `order_items`, `admin_notifications`
//! (see `migrations/`). Cart size/color are stored as `''` when absent so the
//! cart's merge key is covered by a plain UNIQUE constraint.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};

use super::{
    CartStore, CatalogStore, NotificationStore, OrderFilter, OrderStore, Page, PlacedOrder,
    ProductFilter, RevenueRow, StoreError, StoreResult, TimeWindow,
};
use crate::domain::aggregates::{
    effective_price, CartKey, CartLine, NewNotification, NewProduct, Notification, Order,
    OrderDetails, OrderDraft, OrderItem, OrderStatus, PaymentStatus, Product, ProductChanges,
};
use crate::domain::value_objects::{normalize_variant, OrderNumber, Quantity, SessionId};

const PRODUCT_COLUMNS: &str = "id, name, description, price, sale_price, category, subcategory, stock, featured, image, sizes, colors, created_at";
const ORDER_COLUMNS: &str = "id, order_number, customer_name, customer_email, customer_phone, shipping_address, city, country, total_amount, status, payment_status, created_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64, name: String, description: String, price: Decimal, sale_price: Option<Decimal>,
    category: String, subcategory: Option<String>, stock: i32, featured: bool, image: Option<String>,
    sizes: Vec<String>, colors: Vec<String>, created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Product {
            id: r.id, name: r.name, description: r.description, price: r.price, sale_price: r.sale_price,
            category: r.category, subcategory: r.subcategory, stock: r.stock, featured: r.featured,
            image: r.image, sizes: r.sizes, colors: r.colors, created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: i64, product_id: i64, name: String, description: String, price: Decimal, sale_price: Option<Decimal>,
    image: Option<String>, quantity: i32, size: String, color: String, created_at: DateTime<Utc>,
}

impl From<CartLineRow> for CartLine {
    fn from(r: CartLineRow) -> Self {
        CartLine {
            id: r.id, product_id: r.product_id, name: r.name, description: r.description,
            price: effective_price(r.price, r.sale_price), image: r.image, quantity: r.quantity,
            size: normalize_variant(Some(&r.size)), color: normalize_variant(Some(&r.color)),
            added_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64, order_number: String, customer_name: String, customer_email: String, customer_phone: String,
    shipping_address: String, city: String, country: String, total_amount: Decimal,
    status: String, payment_status: String, created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;
    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: r.id,
            order_number: OrderNumber::from_raw(r.order_number),
            customer_name: r.customer_name, customer_email: r.customer_email, customer_phone: r.customer_phone,
            shipping_address: r.shipping_address, city: r.city, country: r.country,
            total_amount: r.total_amount,
            status: r.status.parse().map_err(|e| StoreError::Corrupt(format!("order {}: {e}", r.id)))?,
            payment_status: r.payment_status.parse().map_err(|e| StoreError::Corrupt(format!("order {}: {e}", r.id)))?,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: i64, order_id: i64, product_id: i64, name: String, image: Option<String>,
    quantity: i32, price: Decimal, size: Option<String>, color: Option<String>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(r: OrderItemRow) -> Self {
        OrderItem {
            id: r.id, order_id: r.order_id, product_id: r.product_id, name: r.name, image: r.image,
            quantity: r.quantity, price: r.price, size: r.size, color: r.color,
        }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    #[sqlx(rename = "type")]
    kind: String,
    title: String, message: String, order_id: Option<i64>, is_read: bool, created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(r: NotificationRow) -> Self {
        Notification {
            id: r.id, kind: r.kind, title: r.title, message: r.message,
            order_id: r.order_id, is_read: r.is_read, created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RevenueRowRecord { created_at: DateTime<Utc>, total_amount: Decimal, status: String }

/// SQLSTATE `22003`, raised when integer arithmetic leaves the column's range.
fn numeric_out_of_range(e: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("22003") => StoreError::OutOfRange(what()),
        _ => StoreError::Database(e),
    }
}

fn unique_violation_as_conflict(e: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(what()),
        _ => StoreError::Database(e),
    }
}

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn order_items(&self, order_id: i64) -> StoreResult<Vec<OrderItem>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            "SELECT oi.id, oi.order_id, oi.product_id, p.name, p.image, oi.quantity, oi.price, oi.size, oi.color \
             FROM order_items oi JOIN products p ON p.id = oi.product_id \
             WHERE oi.order_id = $1 ORDER BY oi.id")
            .bind(order_id)
            .fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    async fn with_items(&self, row: Option<OrderRow>) -> StoreResult<Option<OrderDetails>> {
        let Some(row) = row else { return Ok(None) };
        let order = Order::try_from(row)?;
        let items = self.order_items(order.id).await?;
        Ok(Some(OrderDetails { order, items }))
    }
}

fn push_product_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(subcategory) = &filter.subcategory {
        qb.push(" AND subcategory = ").push_bind(subcategory.clone());
    }
    if let Some(featured) = filter.featured {
        qb.push(" AND featured = ").push_bind(featured);
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn product(&self, id: i64) -> StoreResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool).await?;
        Ok(row.map(Product::from))
    }

    async fn products_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"))
            .bind(ids.to_vec())
            .fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Page<Product>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE TRUE"));
        push_product_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ").push_bind(filter.paging.limit())
            .push(" OFFSET ").push_bind(filter.paging.offset());
        let rows = qb.build_query_as::<ProductRow>().fetch_all(&self.pool).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products WHERE TRUE");
        push_product_filter(&mut count, filter);
        let (total,): (i64,) = count.build_query_as().fetch_one(&self.pool).await?;

        Ok(Page { data: rows.into_iter().map(Product::from).collect(), total, page: filter.paging.page })
    }

    async fn create_product(&self, p: NewProduct) -> StoreResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products (name, description, price, sale_price, category, subcategory, stock, featured, image, sizes, colors) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {PRODUCT_COLUMNS}"))
            .bind(&p.name).bind(&p.description).bind(p.price).bind(p.sale_price).bind(&p.category)
            .bind(&p.subcategory).bind(p.stock).bind(p.featured).bind(&p.image).bind(&p.sizes).bind(&p.colors)
            .fetch_one(&self.pool).await?;
        Ok(row.into())
    }

    async fn update_product(&self, id: i64, changes: ProductChanges) -> StoreResult<Option<Product>> {
        let mut tx = self.pool.begin().await?;
        let current = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"))
            .bind(id)
            .fetch_optional(&mut *tx).await?;
        let Some(current) = current else { return Ok(None) };

        let mut p = Product::from(current);
        p.apply(changes);
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET name = $2, description = $3, price = $4, sale_price = $5, category = $6, \
             subcategory = $7, stock = $8, featured = $9, image = $10, sizes = $11, colors = $12 \
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"))
            .bind(id).bind(&p.name).bind(&p.description).bind(p.price).bind(p.sale_price).bind(&p.category)
            .bind(&p.subcategory).bind(p.stock).bind(p.featured).bind(&p.image).bind(&p.sizes).bind(&p.colors)
            .fetch_one(&mut *tx).await?;
        tx.commit().await?;
        Ok(Some(row.into()))
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn cart_lines(&self, session: &SessionId) -> StoreResult<Vec<CartLine>> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            "SELECT c.id, c.product_id, p.name, p.description, p.price, p.sale_price, p.image, \
                    c.quantity, c.size, c.color, c.created_at \
             FROM cart c JOIN products p ON p.id = c.product_id \
             WHERE c.session_id = $1 ORDER BY c.created_at DESC, c.id DESC")
            .bind(session.as_str())
            .fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    async fn upsert_cart_item(&self, key: &CartKey, quantity: Quantity) -> StoreResult<i64> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO cart (session_id, product_id, quantity, size, color) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (session_id, product_id, size, color) \
             DO UPDATE SET quantity = cart.quantity + EXCLUDED.quantity RETURNING id")
            .bind(key.session_id.as_str()).bind(key.product_id).bind(quantity.value())
            .bind(key.size.as_deref().unwrap_or("")).bind(key.color.as_deref().unwrap_or(""))
            .fetch_one(&self.pool).await
            .map_err(|e| numeric_out_of_range(e, || format!("cart quantity for product {}", key.product_id)))?;
        Ok(id)
    }

    async fn set_cart_quantity(&self, session: &SessionId, item_id: i64, quantity: Quantity) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE cart SET quantity = $3 WHERE id = $1 AND session_id = $2")
            .bind(item_id).bind(session.as_str()).bind(quantity.value())
            .execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_cart_item(&self, session: &SessionId, item_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM cart WHERE id = $1 AND session_id = $2")
            .bind(item_id).bind(session.as_str())
            .execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&self, session: &SessionId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM cart WHERE session_id = $1")
            .bind(session.as_str())
            .execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn place_order(&self, session: &SessionId, draft: &OrderDraft) -> StoreResult<PlacedOrder> {
        // Dropping `tx` on any early return rolls everything back.
        let mut tx = self.pool.begin().await?;
        let customer = draft.customer();

        let (order_id, created_at): (i64, DateTime<Utc>) = sqlx::query_as(
            "INSERT INTO orders (order_number, customer_name, customer_email, customer_phone, shipping_address, \
                                 city, country, total_amount, status, payment_status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id, created_at")
            .bind(draft.order_number().as_str())
            .bind(&customer.name).bind(&customer.email).bind(&customer.phone)
            .bind(&customer.address).bind(&customer.city).bind(&customer.country)
            .bind(draft.total_amount())
            .bind(OrderStatus::Pending.as_str()).bind(PaymentStatus::Pending.as_str())
            .fetch_one(&mut *tx).await
            .map_err(|e| unique_violation_as_conflict(e, || format!("order number {} already exists", draft.order_number())))?;

        let mut item_ids = Vec::with_capacity(draft.items().len());
        for item in draft.items() {
            let (id,): (i64,) = sqlx::query_as(
                "INSERT INTO order_items (order_id, product_id, quantity, price, size, color) \
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING id")
                .bind(order_id).bind(item.product_id).bind(item.quantity.value()).bind(item.price)
                .bind(&item.size).bind(&item.color)
                .fetch_one(&mut *tx).await?;
            item_ids.push(id);
        }

        sqlx::query("DELETE FROM cart WHERE session_id = $1")
            .bind(session.as_str())
            .execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(PlacedOrder { order_id, item_ids, created_at })
    }

    async fn order_by_id(&self, id: i64) -> StoreResult<Option<OrderDetails>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool).await?;
        self.with_items(row).await
    }

    async fn order_by_number(&self, number: &OrderNumber) -> StoreResult<Option<OrderDetails>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1"))
            .bind(number.as_str())
            .fetch_optional(&self.pool).await?;
        self.with_items(row).await
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Page<Order>> {
        let status = filter.status.map(|s| s.as_str());
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE ($1::text IS NULL OR status = $1) \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"))
            .bind(status).bind(filter.paging.limit()).bind(filter.paging.offset())
            .fetch_all(&self.pool).await?;
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE ($1::text IS NULL OR status = $1)")
            .bind(status)
            .fetch_one(&self.pool).await?;
        let data = rows.into_iter().map(Order::try_from).collect::<StoreResult<Vec<_>>>()?;
        Ok(Page { data, total, page: filter.paging.page })
    }

    async fn set_order_status(&self, id: i64, from: OrderStatus, to: OrderStatus) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE orders SET status = $3 WHERE id = $1 AND status = $2")
            .bind(id).bind(from.as_str()).bind(to.as_str())
            .execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_payment_status(&self, id: i64, from: PaymentStatus, to: PaymentStatus) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE orders SET payment_status = $3 WHERE id = $1 AND payment_status = $2")
            .bind(id).bind(from.as_str()).bind(to.as_str())
            .execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_order(&self, id: i64) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM admin_notifications WHERE order_id = $1").bind(id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM order_items WHERE order_id = $1").bind(id).execute(&mut *tx).await?;
        let deleted = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn revenue_rows(&self, window: Option<TimeWindow>) -> StoreResult<Vec<RevenueRow>> {
        let statuses: Vec<String> = OrderStatus::REVENUE.iter().map(|s| s.as_str().to_string()).collect();
        let rows = sqlx::query_as::<_, RevenueRowRecord>(
            "SELECT created_at, total_amount, status FROM orders \
             WHERE status = ANY($1) \
               AND ($2::timestamptz IS NULL OR created_at >= $2) \
               AND ($3::timestamptz IS NULL OR created_at < $3)")
            .bind(statuses)
            .bind(window.map(|w| w.start)).bind(window.map(|w| w.end))
            .fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|r| Ok(RevenueRow {
                created_at: r.created_at,
                total_amount: r.total_amount,
                status: r.status.parse().map_err(|e| StoreError::Corrupt(format!("revenue row: {e}")))?,
            }))
            .collect()
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert_notification(&self, n: NewNotification) -> StoreResult<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(
            "INSERT INTO admin_notifications (type, title, message, order_id) VALUES ($1, $2, $3, $4) \
             RETURNING id, type, title, message, order_id, is_read, created_at")
            .bind(&n.kind).bind(&n.title).bind(&n.message).bind(n.order_id)
            .fetch_one(&self.pool).await?;
        Ok(row.into())
    }

    async fn list_notifications(&self, unread_only: bool) -> StoreResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT id, type, title, message, order_id, is_read, created_at FROM admin_notifications \
             WHERE NOT ($1 AND is_read) ORDER BY created_at DESC, id DESC")
            .bind(unread_only)
            .fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn mark_notification_read(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE admin_notifications SET is_read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
