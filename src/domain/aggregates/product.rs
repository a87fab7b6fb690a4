//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub category: String,
    pub subcategory: Option<String>,
    pub stock: i32,
    pub featured: bool,
    pub image: Option<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus { InStock, LowStock, OutOfStock }

/// Fields needed to create a catalog entry.
#[derive(Clone, Debug, Default)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub category: String,
    pub subcategory: Option<String>,
    pub stock: i32,
    pub featured: bool,
    pub image: Option<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
}

/// Partial update; `None` leaves a field untouched. `sale_price: Some(None)` clears the sale.
#[derive(Clone, Debug, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub sale_price: Option<Option<Decimal>>,
    pub category: Option<String>,
    pub subcategory: Option<Option<String>>,
    pub stock: Option<i32>,
    pub featured: Option<bool>,
    pub image: Option<Option<String>>,
    pub sizes: Option<Vec<String>>,
    pub colors: Option<Vec<String>>,
}

/// The price a customer pays: the sale price only when it undercuts the base price.
pub fn effective_price(price: Decimal, sale_price: Option<Decimal>) -> Decimal {
    match sale_price {
        Some(sale) if sale < price => sale,
        _ => price,
    }
}

impl Product {
    pub fn effective_price(&self) -> Decimal { effective_price(self.price, self.sale_price) }

    /// Advisory only; nothing blocks a purchase on stock.
    pub fn stock_status(&self, low_stock_threshold: i32) -> StockStatus {
        if self.stock <= 0 { StockStatus::OutOfStock }
        else if self.stock <= low_stock_threshold { StockStatus::LowStock }
        else { StockStatus::InStock }
    }

    pub fn apply(&mut self, changes: ProductChanges) {
        if let Some(v) = changes.name { self.name = v; }
        if let Some(v) = changes.description { self.description = v; }
        if let Some(v) = changes.price { self.price = v; }
        if let Some(v) = changes.sale_price { self.sale_price = v; }
        if let Some(v) = changes.category { self.category = v; }
        if let Some(v) = changes.subcategory { self.subcategory = v; }
        if let Some(v) = changes.stock { self.stock = v; }
        if let Some(v) = changes.featured { self.featured = v; }
        if let Some(v) = changes.image { self.image = v; }
        if let Some(v) = changes.sizes { self.sizes = v; }
        if let Some(v) = changes.colors { self.colors = v; }
    }
}

impl NewProduct {
    pub fn into_product(self, id: i64, created_at: DateTime<Utc>) -> Product {
        Product {
            id, name: self.name, description: self.description, price: self.price,
            sale_price: self.sale_price, category: self.category, subcategory: self.subcategory,
            stock: self.stock, featured: self.featured, image: self.image,
            sizes: self.sizes, colors: self.colors, created_at,
        }
    }
}
