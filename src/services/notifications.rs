//! Best-effort order notifications.
//!
//! Events are handed to a [`Dispatcher`] only after the order change has
//! committed. Delivery runs on a detached task; sink failures are logged and
//! never reach the request that raised the event.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::aggregates::{NewNotification, Notification};
use crate::domain::events::OrderEvent;
use crate::store::{Store, StoreError};
use crate::{EcommerceError, Result};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("storage: {0}")]
    Storage(#[from] StoreError),
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("publish: {0}")]
    Publish(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn notify(&self, event: &OrderEvent) -> std::result::Result<(), NotifyError>;
}

#[derive(Clone, Default)]
pub struct Dispatcher {
    sinks: Arc<Vec<Arc<dyn Notifier>>>,
}

impl Dispatcher {
    pub fn new(sinks: Vec<Arc<dyn Notifier>>) -> Self { Self { sinks: Arc::new(sinks) } }

    /// Fire-and-forget. The handle is only useful to tests that want to wait for delivery.
    pub fn dispatch(&self, event: OrderEvent) -> JoinHandle<()> {
        let sinks = Arc::clone(&self.sinks);
        tokio::spawn(async move {
            for sink in sinks.iter() {
                match sink.notify(&event).await {
                    Ok(()) => debug!(sink = sink.name(), event = event.name(), order_id = event.order_id(), "notification delivered"),
                    Err(e) => warn!(sink = sink.name(), event = event.name(), order_id = event.order_id(), error = %e, "notification failed"),
                }
            }
        })
    }
}

/// Admin-facing inbox stored in `admin_notifications`.
#[derive(Clone)]
pub struct AdminInbox {
    store: Arc<dyn Store>,
}

impl AdminInbox {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    pub async fn list(&self, unread_only: bool) -> Result<Vec<Notification>> {
        Ok(self.store.list_notifications(unread_only).await?)
    }

    pub async fn mark_read(&self, id: i64) -> Result<()> {
        if self.store.mark_notification_read(id).await? { Ok(()) } else { Err(EcommerceError::NotificationNotFound(id)) }
    }
}

#[async_trait]
impl Notifier for AdminInbox {
    fn name(&self) -> &'static str { "admin_inbox" }

    async fn notify(&self, event: &OrderEvent) -> std::result::Result<(), NotifyError> {
        // Status changes are made by admins themselves; only new orders go to the inbox.
        let OrderEvent::Created { order } = event else { return Ok(()) };
        let item_count: i64 = order.items.iter().map(|i| i64::from(i.quantity)).sum();
        self.store.insert_notification(NewNotification {
            kind: "new_order".to_string(),
            title: format!("New order {}", order.order.order_number),
            message: format!(
                "{} ordered {} item(s) for {:.2}",
                order.order.customer_name, item_count, order.order.total_amount
            ),
            order_id: Some(order.order.id),
        }).await?;
        Ok(())
    }
}

/// Publishes every event as JSON to `<prefix>.<event name>` for email/WhatsApp workers.
#[derive(Clone)]
pub struct NatsPublisher {
    client: async_nats::Client,
    prefix: String,
}

impl NatsPublisher {
    pub fn new(client: async_nats::Client, prefix: impl Into<String>) -> Self {
        Self { client, prefix: prefix.into() }
    }
}

#[async_trait]
impl Notifier for NatsPublisher {
    fn name(&self) -> &'static str { "nats" }

    async fn notify(&self, event: &OrderEvent) -> std::result::Result<(), NotifyError> {
        let payload = serde_json::to_vec(event)?;
        let subject = subject_for(&self.prefix, event);
        self.client.publish(subject, payload.into()).await.map_err(|e| NotifyError::Publish(e.to_string()))
    }
}

fn subject_for(prefix: &str, event: &OrderEvent) -> String { format!("{}.{}", prefix, event.name()) }
