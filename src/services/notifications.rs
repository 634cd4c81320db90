use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::common::RequestContext;
use crate::models::item::{Item, ItemType};
use crate::models::notification::{NewNotification, Notification};
use crate::services::store::Store;

pub const DASHBOARD_NOTIFICATION_LIMIT: u32 = 5;

pub struct NotificationService {
    store: Arc<dyn Store>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Tell every user except the owner about a newly posted lost item.
    /// Found items notify nobody. The batch is written in one go.
    pub async fn notify_lost_item(&self, item: &Item) -> AppResult<usize> {
        if item.item_type != ItemType::Lost {
            return Ok(0);
        }

        let recipients = self.store.other_user_ids(item.user_id).await?;
        let batch: Vec<NewNotification> = recipients
            .into_iter()
            .map(|user_id| NewNotification::lost_item(item, user_id))
            .collect();

        let created = self.store.insert_notifications(batch).await?;
        log::info!("Sent {} notifications for lost item {}", created, item.id);
        Ok(created)
    }

    pub async fn list(&self, ctx: &RequestContext) -> AppResult<Vec<Notification>> {
        self.store.list_notifications(ctx.user_id, None).await
    }

    pub async fn recent(&self, ctx: &RequestContext) -> AppResult<Vec<Notification>> {
        self.store
            .list_notifications(ctx.user_id, Some(DASHBOARD_NOTIFICATION_LIMIT))
            .await
    }

    pub async fn unread_count(&self, ctx: &RequestContext) -> AppResult<i64> {
        self.store.count_unread_notifications(ctx.user_id).await
    }

    pub async fn mark_read(&self, ctx: &RequestContext, notification_id: i64) -> AppResult<()> {
        if self
            .store
            .mark_notification_read(notification_id, ctx.user_id)
            .await?
        {
            Ok(())
        } else {
            Err(AppError::NotFound("Notification not found.".to_string()))
        }
    }
}
