//! Admin inbox entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub order_id: Option<i64>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewNotification {
    pub kind: String,
    pub title: String,
    pub message: String,
    pub order_id: Option<i64>,
}

impl NewNotification {
    pub fn into_notification(self, id: i64, created_at: DateTime<Utc>) -> Notification {
        Notification {
            id, kind: self.kind, title: self.title, message: self.message,
            order_id: self.order_id, is_read: false, created_at,
        }
    }
}
