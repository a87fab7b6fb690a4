//! Storefront Orders
//!
//! Session carts, checkout and the order lifecycle for a small storefront.
//!
//! ## Features
//! - Product catalog with sale prices and advisory stock levels
//! - Anonymous, session-keyed carts
//! - Checkout that turns a cart into an order in one transaction
//! - Order and payment status tracking
//! - Revenue summaries and time series
//! - Best-effort admin and message-bus notifications

pub mod api;
pub mod config;
pub mod domain;
pub mod services;
pub mod state;
pub mod store;

use thiserror::Error;

use crate::domain::aggregates::OrderError;
use crate::domain::value_objects::SessionIdError;
use crate::store::StoreError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("{0}")]
    Validation(String),

    #[error("Product {0} not found")]
    ProductNotFound(i64),

    #[error("Order {0} not found")]
    OrderNotFound(String),

    #[error("Cart item {0} not found")]
    CartItemNotFound(i64),

    #[error("Notification {0} not found")]
    NotificationNotFound(i64),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl From<SessionIdError> for EcommerceError {
    fn from(e: SessionIdError) -> Self { Self::Validation(e.to_string()) }
}

impl From<validator::ValidationErrors> for EcommerceError {
    fn from(e: validator::ValidationErrors) -> Self {
        let mut fields: Vec<&str> = e.errors().keys().copied().collect();
        fields.sort_unstable();
        Self::Validation(format!("Invalid fields: {}", fields.join(", ")))
    }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;
