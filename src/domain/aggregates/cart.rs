//! Cart Aggregate
//!
//! A cart is the set of rows sharing a session token. Rows are keyed by
//! (session, product, size, color); adding an existing key grows its quantity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{Quantity, SessionId};

/// Stored cart row
#[derive(Clone, Debug, PartialEq)]
pub struct CartItem {
    pub id: i64,
    pub session_id: SessionId,
    pub product_id: i64,
    pub quantity: Quantity,
    pub size: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Merge key for a cart row.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CartKey {
    pub session_id: SessionId,
    pub product_id: i64,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl CartItem {
    pub fn key(&self) -> CartKey {
        CartKey {
            session_id: self.session_id.clone(),
            product_id: self.product_id,
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }
}

/// Cart row joined with live product data, as shown to the shopper.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    pub description: String,
    /// Effective price at read time, not a snapshot.
    pub price: Decimal,
    pub image: Option<String>,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
    #[serde(skip)]
    pub added_at: DateTime<Utc>,
}

/// Newest rows first; id breaks ties between rows added in the same instant.
pub fn sort_newest_first(lines: &mut [CartLine]) {
    lines.sort_by(|a, b| b.added_at.cmp(&a.added_at).then(b.id.cmp(&a.id)));
}
