//! Admin routes. Mounted behind [`require_admin`](crate::api::auth::require_admin).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use validator::Validate;

use crate::api::error::ApiResult;
use crate::domain::aggregates::{NewProduct, Notification, Order, OrderDetails, OrderStatus, PaymentStatus, ProductChanges};
use crate::services::catalog::ProductView;
use crate::services::revenue::{Period, RevenuePoint, RevenueSummary};
use crate::state::AppState;
use crate::store::{OrderFilter, Page, Paging};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order).delete(delete_order))
        .route("/orders/:id/status", put(set_status))
        .route("/orders/:id/payment", put(set_payment_status))
        .route("/revenue/summary", get(revenue_summary))
        .route("/revenue/analytics", get(revenue_analytics))
        .route("/notifications", get(list_notifications))
        .route("/notifications/:id/read", put(mark_notification_read))
        .route("/products", post(create_product))
        .route("/products/:id", put(update_product))
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct OrderListParams {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentStatusRequest {
    pub payment_status: String,
}

async fn list_orders(State(s): State<AppState>, Query(p): Query<OrderListParams>) -> ApiResult<Json<Page<Order>>> {
    let status = p.status.as_deref().filter(|v| !v.is_empty()).map(str::parse::<OrderStatus>).transpose()?;
    let filter = OrderFilter { status, paging: Paging::new(p.page, p.per_page) };
    Ok(Json(s.orders().list_orders(&filter).await?))
}

async fn get_order(State(s): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<OrderDetails>> {
    Ok(Json(s.orders().order_by_id(id).await?))
}

async fn set_status(State(s): State<AppState>, Path(id): Path<i64>, Json(r): Json<StatusRequest>) -> ApiResult<Json<Value>> {
    let status: OrderStatus = r.status.parse()?;
    s.orders().set_status(id, status).await?;
    Ok(Json(json!({ "success": true, "message": format!("Order status updated to {status}") })))
}

async fn set_payment_status(State(s): State<AppState>, Path(id): Path<i64>, Json(r): Json<PaymentStatusRequest>) -> ApiResult<Json<Value>> {
    let status: PaymentStatus = r.payment_status.parse()?;
    s.orders().set_payment_status(id, status).await?;
    Ok(Json(json!({ "success": true, "message": format!("Payment status updated to {status}") })))
}

async fn delete_order(State(s): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    s.orders().delete_order(id).await?;
    Ok(Json(json!({ "success": true, "message": "Order deleted" })))
}

// =============================================================================
// Revenue
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct RevenueParams {
    pub period: Option<String>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl RevenueParams {
    fn period(&self) -> crate::Result<Period> {
        self.period.as_deref().filter(|p| !p.is_empty()).map_or(Ok(Period::default()), str::parse)
    }
}

async fn revenue_summary(State(s): State<AppState>, Query(p): Query<RevenueParams>) -> ApiResult<Json<RevenueSummary>> {
    Ok(Json(s.revenue().summary(p.month, p.year).await?))
}

async fn revenue_analytics(State(s): State<AppState>, Query(p): Query<RevenueParams>) -> ApiResult<Json<Vec<RevenuePoint>>> {
    let period = p.period()?;
    Ok(Json(s.revenue().analytics(period, p.month, p.year).await?))
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct NotificationParams {
    #[serde(default)]
    pub unread: bool,
}

async fn list_notifications(State(s): State<AppState>, Query(p): Query<NotificationParams>) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(s.inbox().list(p.unread).await?))
}

async fn mark_notification_read(State(s): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    s.inbox().mark_read(id).await?;
    Ok(Json(json!({ "success": true })))
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub subcategory: Option<String>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub featured: bool,
    pub image: Option<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
}

impl From<CreateProductRequest> for NewProduct {
    fn from(r: CreateProductRequest) -> Self {
        Self {
            name: r.name, description: r.description, price: r.price, sale_price: r.sale_price,
            category: r.category, subcategory: r.subcategory, stock: r.stock, featured: r.featured,
            image: r.image, sizes: r.sizes, colors: r.colors,
        }
    }
}

/// Absent fields are left alone; an explicit `null` clears a nullable field.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "present")]
    pub sale_price: Option<Option<Decimal>>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub subcategory: Option<Option<String>>,
    pub stock: Option<i32>,
    pub featured: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub image: Option<Option<String>>,
    pub sizes: Option<Vec<String>>,
    pub colors: Option<Vec<String>>,
}

fn present<'de, T, D>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}

impl From<UpdateProductRequest> for ProductChanges {
    fn from(r: UpdateProductRequest) -> Self {
        Self {
            name: r.name, description: r.description, price: r.price, sale_price: r.sale_price,
            category: r.category, subcategory: r.subcategory, stock: r.stock, featured: r.featured,
            image: r.image, sizes: r.sizes, colors: r.colors,
        }
    }
}

async fn create_product(State(s): State<AppState>, Json(r): Json<CreateProductRequest>) -> ApiResult<(StatusCode, Json<ProductView>)> {
    r.validate()?;
    Ok((StatusCode::CREATED, Json(s.catalog().create(r.into()).await?)))
}

async fn update_product(State(s): State<AppState>, Path(id): Path<i64>, Json(r): Json<UpdateProductRequest>) -> ApiResult<Json<ProductView>> {
    r.validate()?;
    Ok(Json(s.catalog().update(id, r.into()).await?))
}
