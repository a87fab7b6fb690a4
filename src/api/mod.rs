//! HTTP surface.
//!
//! Everything lives under `/api`; `/api/admin/*` additionally requires the
//! admin bearer token. `/health` sits at the root for load balancers.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod orders;

use axum::{middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let admin = admin::routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_admin));

    let api = Router::new()
        .merge(catalog::routes())
        .merge(cart::routes())
        .merge(orders::routes())
        .nest("/admin", admin);

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "storefront-orders" }))
}
