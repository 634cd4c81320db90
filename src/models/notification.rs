use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::common::timestamp_now;
use crate::models::item::Item;

pub const LOST_ITEM_KIND: &str = "lost_item";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: i64,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub user_id: i64,
    pub item_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub kind: String,
    pub created_at: DateTime<Utc>,
    pub user_id: i64,
    pub item_id: Option<String>,
}

impl NewNotification {
    /// Notice sent to `recipient` when someone else reports a lost item.
    pub fn lost_item(item: &Item, recipient: i64) -> Self {
        Self {
            title: format!("New Lost Item Posted: {}", item.title),
            message: format!(
                "A new lost item '{}' was posted in {}.",
                item.title, item.location
            ),
            kind: LOST_ITEM_KIND.to_string(),
            created_at: timestamp_now(),
            user_id: recipient,
            item_id: Some(item.id.clone()),
        }
    }

    pub fn into_notification(self, id: i64) -> Notification {
        Notification {
            id,
            title: self.title,
            message: self.message,
            kind: self.kind,
            is_read: false,
            created_at: self.created_at,
            user_id: self.user_id,
            item_id: self.item_id,
        }
    }
}
