use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::error::ApiResult;
use crate::services::catalog::ProductView;
use crate::state::AppState;
use crate::store::{Page, Paging, ProductFilter};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub featured: Option<bool>,
}

impl From<ListParams> for ProductFilter {
    fn from(p: ListParams) -> Self {
        Self {
            category: p.category.filter(|c| !c.is_empty()),
            subcategory: p.subcategory.filter(|c| !c.is_empty()),
            featured: p.featured,
            paging: Paging::new(p.page, p.per_page),
        }
    }
}

async fn list_products(State(s): State<AppState>, Query(p): Query<ListParams>) -> ApiResult<Json<Page<ProductView>>> {
    Ok(Json(s.catalog().list(&p.into()).await?))
}

async fn get_product(State(s): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<ProductView>> {
    Ok(Json(s.catalog().product(id).await?))
}
