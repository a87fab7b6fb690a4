//! Cart routes. The session token travels in the path or the body, never in a cookie.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::api::error::ApiResult;
use crate::domain::aggregates::CartLine;
use crate::domain::value_objects::SessionId;
use crate::services::cart::QuantityUpdate;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart/add", post(add_to_cart))
        .route("/cart/update", put(update_cart))
        .route("/cart/remove", delete(remove_from_cart))
        .route("/cart/:session_id", get(get_cart).delete(clear_cart))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub session_id: String,
    pub product_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(length(max = 50))]
    pub size: Option<String>,
    #[validate(length(max = 50))]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartRequest {
    pub session_id: String,
    pub cart_item_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromCartRequest {
    pub session_id: String,
    pub cart_item_id: i64,
}

async fn get_cart(State(s): State<AppState>, Path(session_id): Path<String>) -> ApiResult<Json<Vec<CartLine>>> {
    let session = SessionId::parse(session_id)?;
    Ok(Json(s.cart().get_cart(&session).await?))
}

async fn add_to_cart(State(s): State<AppState>, Json(r): Json<AddToCartRequest>) -> ApiResult<(StatusCode, Json<Value>)> {
    r.validate()?;
    let session = SessionId::parse(r.session_id)?;
    let id = s.cart().add_item(&session, r.product_id, r.quantity, r.size.as_deref(), r.color.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Item added to cart", "id": id }))))
}

async fn update_cart(State(s): State<AppState>, Json(r): Json<UpdateCartRequest>) -> ApiResult<Json<Value>> {
    let session = SessionId::parse(r.session_id)?;
    let message = match s.cart().update_quantity(&session, r.cart_item_id, r.quantity).await? {
        QuantityUpdate::Updated => "Cart updated",
        QuantityUpdate::Removed => "Item removed from cart",
    };
    Ok(Json(json!({ "message": message })))
}

async fn remove_from_cart(State(s): State<AppState>, Json(r): Json<RemoveFromCartRequest>) -> ApiResult<Json<Value>> {
    let session = SessionId::parse(r.session_id)?;
    s.cart().remove_item(&session, r.cart_item_id).await?;
    Ok(Json(json!({ "message": "Item removed from cart" })))
}

async fn clear_cart(State(s): State<AppState>, Path(session_id): Path<String>) -> ApiResult<Json<Value>> {
    let session = SessionId::parse(session_id)?;
    let removed = s.cart().clear(&session).await?;
    Ok(Json(json!({ "message": "Cart cleared", "removed": removed })))
}
