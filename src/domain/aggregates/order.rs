//! Order Aggregate
//!
//! An order is created from a priced draft in one storage transaction and is
//! afterwards only touched through its two status axes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::domain::value_objects::{OrderNumber, Quantity};

/// Largest amount the `NUMERIC(12, 2)` money columns hold: 9,999,999,999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Processing, Shipped, Delivered, Cancelled }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus { #[default] Pending, Paid }

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [Self::Pending, Self::Processing, Self::Shipped, Self::Delivered, Self::Cancelled];

    /// Statuses whose orders count toward revenue. Every revenue figure goes through this list.
    pub const REVENUE: [OrderStatus; 3] = [Self::Processing, Self::Shipped, Self::Delivered];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn counts_toward_revenue(&self) -> bool { Self::REVENUE.contains(self) }

    pub fn is_terminal(&self) -> bool { matches!(self, Self::Delivered | Self::Cancelled) }

    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Shipped => 2,
            Self::Delivered => 3,
            Self::Cancelled => 4,
        }
    }

    /// Strict lifecycle: forward along pending → processing → shipped → delivered,
    /// or to cancelled from any non-terminal state. Re-setting the same status is a no-op.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if *self == next { return true; }
        if self.is_terminal() { return false; }
        next == Self::Cancelled || next.rank() > self.rank()
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Paid => "paid" }
    }

    /// Strict lifecycle: a paid order stays paid.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        !(*self == Self::Paid && next == Self::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|st| st.as_str() == wanted)
            .ok_or_else(|| OrderError::UnknownStatus(s.to_string()))
    }
}

impl FromStr for PaymentStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            _ => Err(OrderError::UnknownStatus(s.to_string())),
        }
    }
}

/// Customer details copied onto the order at checkout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub country: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    pub city: String,
    pub country: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// Line item with its price snapshot, enriched with product name and image on read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub name: String,
    pub image: Option<String>,
    pub quantity: i32,
    pub price: Decimal,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Order with its line items, as returned to callers and sent to notifiers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Line of a draft, priced from the catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct DraftItem {
    pub product_id: i64,
    pub name: String,
    pub image: Option<String>,
    pub quantity: Quantity,
    pub price: Decimal,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl DraftItem {
    /// `None` when the product does not fit in a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> { self.price.checked_mul(Decimal::from(self.quantity.value())) }
}

/// Everything the atomic checkout unit writes. The total is derived here and nowhere else.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderDraft {
    order_number: OrderNumber,
    customer: CustomerInfo,
    items: Vec<DraftItem>,
    total_amount: Decimal,
}

impl OrderDraft {
    pub fn new(order_number: OrderNumber, customer: CustomerInfo, items: Vec<DraftItem>) -> Result<Self, OrderError> {
        if items.is_empty() { return Err(OrderError::NoItems); }
        let total_amount = items.iter()
            .try_fold(Decimal::ZERO, |acc, item| item.line_total().and_then(|line| acc.checked_add(line)))
            .filter(|total| *total <= MAX_AMOUNT)
            .ok_or(OrderError::TotalTooLarge)?;
        if total_amount <= Decimal::ZERO { return Err(OrderError::NonPositiveTotal(total_amount)); }
        Ok(Self { order_number, customer, items, total_amount })
    }

    pub fn order_number(&self) -> &OrderNumber { &self.order_number }
    pub fn customer(&self) -> &CustomerInfo { &self.customer }
    pub fn items(&self) -> &[DraftItem] { &self.items }
    pub fn total_amount(&self) -> Decimal { self.total_amount }

    pub fn renumber(&mut self, order_number: OrderNumber) { self.order_number = order_number; }

    /// Materializes the stored shape once the store has assigned ids.
    pub fn into_details(self, order_id: i64, item_ids: &[i64], created_at: DateTime<Utc>) -> OrderDetails {
        let order = Order {
            id: order_id,
            order_number: self.order_number,
            customer_name: self.customer.name,
            customer_email: self.customer.email,
            customer_phone: self.customer.phone,
            shipping_address: self.customer.address,
            city: self.customer.city,
            country: self.customer.country,
            total_amount: self.total_amount,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            created_at,
        };
        let items = self.items.into_iter().zip(item_ids).map(|(item, id)| OrderItem {
            id: *id,
            order_id,
            product_id: item.product_id,
            name: item.name,
            image: item.image,
            quantity: item.quantity.value(),
            price: item.price,
            size: item.size,
            color: item.color,
        }).collect();
        OrderDetails { order, items }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("order must contain at least one item")]
    NoItems,
    #[error("order total must be positive, got {0}")]
    NonPositiveTotal(Decimal),
    #[error("order total exceeds {}", MAX_AMOUNT)]
    TotalTooLarge,
    #[error("unknown status '{0}'")]
    UnknownStatus(String),
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("cannot move payment from {from} to {to}")]
    InvalidPaymentTransition { from: PaymentStatus, to: PaymentStatus },
    #[error("order was changed by another request")]
    ConcurrentUpdate,
}
