use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::models::item::{Item, ItemFilter};
use crate::models::notification::{NewNotification, Notification};
use crate::models::user::{NewUser, User};
use crate::services::store::Store;

struct StoredItem {
    seq: u64,
    item: Item,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    items: HashMap<String, StoredItem>,
    notifications: BTreeMap<i64, Notification>,
    last_user_id: i64,
    last_notification_id: i64,
    last_item_seq: u64,
}

impl Tables {
    fn detach_item(&mut self, item_id: &str) {
        for notification in self.notifications.values_mut() {
            if notification.item_id.as_deref() == Some(item_id) {
                notification.item_id = None;
            }
        }
    }
}

/// Volatile backend: records live only as long as the process. A single
/// lock guards all tables so every operation sees a consistent snapshot.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn set_user_active(&self, user_id: i64, active: bool) -> bool {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&user_id) {
            Some(user) => {
                user.active = active;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict("Username already exists.".to_string()));
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already registered.".to_string()));
        }

        tables.last_user_id += 1;
        let user = user.into_user(tables.last_user_id);
        tables.users.insert(user.id, user.clone());
        log::debug!("Stored user {} ({}) in memory", user.username, user.id);
        Ok(user)
    }

    async fn get_user(&self, user_id: i64) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&user_id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn delete_user(&self, user_id: i64) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&user_id).is_none() {
            return Ok(false);
        }

        let owned: Vec<String> = tables
            .items
            .values()
            .filter(|stored| stored.item.user_id == user_id)
            .map(|stored| stored.item.id.clone())
            .collect();
        for item_id in &owned {
            tables.items.remove(item_id);
            tables.detach_item(item_id);
        }
        tables.notifications.retain(|_, n| n.user_id != user_id);
        Ok(true)
    }

    async fn other_user_ids(&self, user_id: i64) -> AppResult<Vec<i64>> {
        let tables = self.tables.read().await;
        Ok(tables.users.keys().copied().filter(|id| *id != user_id).collect())
    }

    async fn insert_item(&self, item: &Item) -> AppResult<()> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&item.user_id) {
            return Err(AppError::Storage(format!(
                "Item owner {} does not exist",
                item.user_id
            )));
        }
        if tables.items.contains_key(&item.id) {
            return Err(AppError::Conflict(format!("Item id {} already taken", item.id)));
        }

        tables.last_item_seq += 1;
        let seq = tables.last_item_seq;
        tables.items.insert(
            item.id.clone(),
            StoredItem {
                seq,
                item: item.clone(),
            },
        );
        Ok(())
    }

    async fn get_item(&self, item_id: &str) -> AppResult<Option<Item>> {
        let tables = self.tables.read().await;
        Ok(tables.items.get(item_id).map(|stored| stored.item.clone()))
    }

    async fn update_item(&self, item: &Item) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        match tables.items.get_mut(&item.id) {
            Some(stored) => {
                stored.item = item.clone();
                Ok(())
            }
            None => Err(AppError::NotFound("Item not found".to_string())),
        }
    }

    async fn delete_item(&self, item_id: &str) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.items.remove(item_id).is_none() {
            return Ok(false);
        }
        tables.detach_item(item_id);
        Ok(true)
    }

    async fn list_items(&self, filter: &ItemFilter) -> AppResult<Vec<Item>> {
        let tables = self.tables.read().await;
        let mut matching: Vec<&StoredItem> = tables
            .items
            .values()
            .filter(|stored| filter.matches(&stored.item))
            .collect();

        matching.sort_by(|a, b| {
            b.item
                .created_at
                .cmp(&a.item.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });

        let limit = filter.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(matching
            .into_iter()
            .take(limit)
            .map(|stored| stored.item.clone())
            .collect())
    }

    async fn insert_notifications(&self, notifications: Vec<NewNotification>) -> AppResult<usize> {
        let mut tables = self.tables.write().await;

        if let Some(missing) = notifications
            .iter()
            .find(|n| !tables.users.contains_key(&n.user_id))
        {
            return Err(AppError::Storage(format!(
                "Notification recipient {} does not exist",
                missing.user_id
            )));
        }

        let count = notifications.len();
        for notification in notifications {
            tables.last_notification_id += 1;
            let id = tables.last_notification_id;
            tables
                .notifications
                .insert(id, notification.into_notification(id));
        }
        Ok(count)
    }

    async fn list_notifications(&self, user_id: i64, limit: Option<u32>) -> AppResult<Vec<Notification>> {
        let tables = self.tables.read().await;
        let mut owned: Vec<&Notification> = tables
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        let limit = limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(owned.into_iter().take(limit).cloned().collect())
    }

    async fn count_unread_notifications(&self, user_id: i64) -> AppResult<i64> {
        let tables = self.tables.read().await;
        let count = tables
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count();
        Ok(count as i64)
    }

    async fn mark_notification_read(&self, notification_id: i64, user_id: i64) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.notifications.get_mut(&notification_id) {
            Some(notification) if notification.user_id == user_id => {
                notification.is_read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{sample_item, sample_user};

    #[tokio::test]
    async fn test_user_ids_are_sequential_and_unique() {
        let store = MemoryStore::new();
        let a = store.create_user(sample_user("alice")).await.unwrap();
        let b = store.create_user(sample_user("bob")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);

        let dup = store.create_user(sample_user("alice")).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_item_requires_existing_owner() {
        let store = MemoryStore::new();
        let item = sample_item("abcd0001", 42, "Phone");
        assert!(matches!(
            store.insert_item(&item).await,
            Err(AppError::Storage(_))
        ));
        assert!(store.get_item("abcd0001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_same_timestamp_orders_by_insertion() {
        let store = MemoryStore::new();
        let owner = store.create_user(sample_user("alice")).await.unwrap();

        let first = sample_item("00000001", owner.id, "First");
        let mut second = sample_item("00000002", owner.id, "Second");
        second.created_at = first.created_at;
        store.insert_item(&first).await.unwrap();
        store.insert_item(&second).await.unwrap();

        let items = store.list_items(&ItemFilter::owned_by(owner.id)).await.unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["00000002", "00000001"]);
    }

    #[tokio::test]
    async fn test_notification_batch_is_all_or_nothing() {
        let store = MemoryStore::new();
        let owner = store.create_user(sample_user("alice")).await.unwrap();
        let item = sample_item("abcd0002", owner.id, "Bag");
        store.insert_item(&item).await.unwrap();

        let batch = vec![
            NewNotification::lost_item(&item, owner.id),
            NewNotification::lost_item(&item, 999),
        ];
        assert!(store.insert_notifications(batch).await.is_err());
        assert!(store.list_notifications(owner.id, None).await.unwrap().is_empty());
    }
}
