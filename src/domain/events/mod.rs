//! Domain events
use serde::Serialize;
use crate::domain::aggregates::{OrderDetails, OrderStatus, PaymentStatus};
use crate::domain::value_objects::OrderNumber;

/// Raised after a storage commit; consumed by notifiers only.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Created { order: OrderDetails },
    StatusChanged { order_id: i64, order_number: OrderNumber, from: OrderStatus, to: OrderStatus },
    PaymentStatusChanged { order_id: i64, order_number: OrderNumber, from: PaymentStatus, to: PaymentStatus },
}

impl OrderEvent {
    /// Last segment of the subject the event is published under.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::StatusChanged { .. } => "status_changed",
            Self::PaymentStatusChanged { .. } => "payment_status_changed",
        }
    }

    pub fn order_id(&self) -> i64 {
        match self {
            Self::Created { order } => order.order.id,
            Self::StatusChanged { order_id, .. } | Self::PaymentStatusChanged { order_id, .. } => *order_id,
        }
    }
}
