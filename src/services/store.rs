use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, AppResult};
use crate::models::item::{Item, ItemFilter};
use crate::models::notification::{NewNotification, Notification};
use crate::models::user::{NewUser, User};
use crate::services::database::SqliteStore;
use crate::services::memory::MemoryStore;

/// Persistence seam shared by the durable and the volatile backend.
///
/// Every mutating method is atomic: either all of its writes become visible
/// or none do. Listing methods return items newest first, ties broken by
/// insertion order.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fails with `Conflict` when the username or email is taken.
    async fn create_user(&self, user: NewUser) -> AppResult<User>;

    async fn get_user(&self, user_id: i64) -> AppResult<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Removes the user together with their items and notifications.
    async fn delete_user(&self, user_id: i64) -> AppResult<bool>;

    /// Ids of every user except `user_id`.
    async fn other_user_ids(&self, user_id: i64) -> AppResult<Vec<i64>>;

    /// Fails with `Conflict` when the item id is already taken.
    async fn insert_item(&self, item: &Item) -> AppResult<()>;

    async fn get_item(&self, item_id: &str) -> AppResult<Option<Item>>;

    /// Overwrites the mutable columns of an existing item.
    async fn update_item(&self, item: &Item) -> AppResult<()>;

    /// Notifications pointing at the item keep existing with no item.
    async fn delete_item(&self, item_id: &str) -> AppResult<bool>;

    async fn list_items(&self, filter: &ItemFilter) -> AppResult<Vec<Item>>;

    /// Inserts the whole batch or nothing. Returns the number inserted.
    async fn insert_notifications(&self, notifications: Vec<NewNotification>) -> AppResult<usize>;

    async fn list_notifications(&self, user_id: i64, limit: Option<u32>) -> AppResult<Vec<Notification>>;

    async fn count_unread_notifications(&self, user_id: i64) -> AppResult<i64>;

    /// Returns false when no notification with that id belongs to the user.
    async fn mark_notification_read(&self, notification_id: i64, user_id: i64) -> AppResult<bool>;

    async fn health_check(&self) -> AppResult<()>;
}

pub const MEMORY_URL: &str = "memory://";

/// Pick a backend from the database URL: `memory://` for the volatile
/// store, any `sqlite:` URL for the durable one.
pub async fn open_store(database_url: &str) -> AppResult<Arc<dyn Store>> {
    if database_url.starts_with(MEMORY_URL) {
        log::warn!("Using volatile in-memory storage; all data is lost on restart");
        Ok(Arc::new(MemoryStore::new()))
    } else if database_url.starts_with("sqlite:") {
        let store = SqliteStore::connect(database_url).await?;
        Ok(Arc::new(store))
    } else {
        Err(AppError::Storage(format!(
            "Unsupported database URL: {}",
            database_url
        )))
    }
}
