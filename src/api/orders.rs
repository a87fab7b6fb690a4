//! Public checkout routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use crate::api::error::ApiResult;
use crate::domain::aggregates::{CustomerInfo, OrderDetails};
use crate::domain::value_objects::SessionId;
use crate::services::orders::{CheckoutItem, CreatedOrder};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders/create-whatsapp", post(create_order))
        .route("/orders/:order_number", get(get_order))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CustomerInfoRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 5, max = 30))]
    pub phone: String,
    #[validate(length(min = 1, max = 200))]
    pub address: String,
    #[validate(length(min = 1, max = 200))]
    pub city: String,
    #[validate(length(min = 1, max = 200))]
    pub country: String,
}

impl From<CustomerInfoRequest> for CustomerInfo {
    fn from(r: CustomerInfoRequest) -> Self {
        Self {
            name: r.name.trim().to_string(),
            email: r.email.trim().to_string(),
            phone: r.phone.trim().to_string(),
            address: r.address.trim().to_string(),
            city: r.city.trim().to_string(),
            country: r.country.trim().to_string(),
        }
    }
}

/// One line of the client's cart as it was displayed at checkout.
#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutItemRequest {
    #[serde(alias = "productId")]
    pub product_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl From<CheckoutItemRequest> for CheckoutItem {
    fn from(r: CheckoutItemRequest) -> Self {
        Self { product_id: r.product_id, quantity: r.quantity, price: r.price, size: r.size, color: r.color }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub session_id: String,
    #[validate]
    pub customer_info: CustomerInfoRequest,
    #[validate]
    pub items: Vec<CheckoutItemRequest>,
}

async fn create_order(State(s): State<AppState>, Json(r): Json<CreateOrderRequest>) -> ApiResult<(StatusCode, Json<CreatedOrder>)> {
    let session = SessionId::parse(r.session_id.clone())?;
    r.validate()?;
    let items = r.items.into_iter().map(CheckoutItem::from).collect();
    let created = s.orders().create_order(&session, r.customer_info.into(), items).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_order(State(s): State<AppState>, Path(order_number): Path<String>) -> ApiResult<Json<OrderDetails>> {
    Ok(Json(s.orders().order_by_number(&order_number).await?))
}
