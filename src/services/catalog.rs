//! Catalog reads and admin product maintenance.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use crate::domain::aggregates::{NewProduct, Product, ProductChanges, StockStatus, MAX_AMOUNT};
use crate::store::{Page, ProductFilter, Store};
use crate::{EcommerceError, Result};

/// Product with its derived display facts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub effective_price: Decimal,
    pub stock_status: StockStatus,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
    low_stock_threshold: i32,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>, low_stock_threshold: i32) -> Self { Self { store, low_stock_threshold } }

    fn view(&self, product: Product) -> ProductView {
        ProductView {
            effective_price: product.effective_price(),
            stock_status: product.stock_status(self.low_stock_threshold),
            product,
        }
    }

    pub async fn product(&self, id: i64) -> Result<ProductView> {
        let product = self.store.product(id).await?.ok_or(EcommerceError::ProductNotFound(id))?;
        Ok(self.view(product))
    }

    pub async fn list(&self, filter: &ProductFilter) -> Result<Page<ProductView>> {
        let page = self.store.list_products(filter).await?;
        Ok(Page { data: page.data.into_iter().map(|p| self.view(p)).collect(), total: page.total, page: page.page })
    }

    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create(&self, product: NewProduct) -> Result<ProductView> {
        validate_pricing(product.price, product.sale_price)?;
        if product.stock < 0 { return Err(EcommerceError::Validation("stock cannot be negative".into())); }
        let created = self.store.create_product(product).await?;
        tracing::info!(product_id = created.id, "product created");
        Ok(self.view(created))
    }

    #[instrument(skip(self, changes))]
    pub async fn update(&self, id: i64, changes: ProductChanges) -> Result<ProductView> {
        let current = self.store.product(id).await?.ok_or(EcommerceError::ProductNotFound(id))?;
        validate_pricing(
            changes.price.unwrap_or(current.price),
            changes.sale_price.unwrap_or(current.sale_price),
        )?;
        if changes.stock.is_some_and(|s| s < 0) { return Err(EcommerceError::Validation("stock cannot be negative".into())); }
        let updated = self.store.update_product(id, changes).await?.ok_or(EcommerceError::ProductNotFound(id))?;
        Ok(self.view(updated))
    }
}

fn validate_pricing(price: Decimal, sale_price: Option<Decimal>) -> Result<()> {
    if price < Decimal::ZERO { return Err(EcommerceError::Validation("price cannot be negative".into())); }
    if price > MAX_AMOUNT { return Err(EcommerceError::Validation(format!("price cannot exceed {MAX_AMOUNT}"))); }
    match sale_price {
        Some(s) if s < Decimal::ZERO => Err(EcommerceError::Validation("sale price cannot be negative".into())),
        Some(s) if s > MAX_AMOUNT => Err(EcommerceError::Validation(format!("sale price cannot exceed {MAX_AMOUNT}"))),
        _ => Ok(()),
    }
}
