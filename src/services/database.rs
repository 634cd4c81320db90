use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::error::{AppError, AppResult};
use crate::models::item::{Item, ItemFilter};
use crate::models::notification::{NewNotification, Notification};
use crate::models::user::{NewUser, User};
use crate::services::store::Store;

const ITEM_COLUMNS: &str = "id, item_type, title, description, category, location, created_at, \
                            date_lost_found, image, status, user_id";

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, phone, \
                            profile_image, active, created_at";

const NOTIFICATION_COLUMNS: &str = "id, title, message, kind, is_read, created_at, user_id, item_id";

const SCHEMA: [&str; 5] = [
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        phone TEXT,
        profile_image TEXT,
        active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS items (
        id TEXT PRIMARY KEY NOT NULL,
        item_type TEXT NOT NULL CHECK (item_type IN ('lost', 'found')),
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        category TEXT NOT NULL,
        location TEXT NOT NULL,
        created_at TEXT NOT NULL,
        date_lost_found TEXT,
        image TEXT,
        status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'resolved')),
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
    )",
    "CREATE INDEX IF NOT EXISTS idx_items_listing ON items (item_type, status, created_at)",
    "CREATE TABLE IF NOT EXISTS notifications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        message TEXT NOT NULL,
        kind TEXT NOT NULL,
        is_read INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        item_id TEXT REFERENCES items(id) ON DELETE SET NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications (user_id, created_at)",
];

/// Fixed-width RFC 3339 text so lexical order in SQL equals time order.
fn db_time(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    profile_image: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            profile_image: row.profile_image,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct ItemRow {
    id: String,
    item_type: String,
    title: String,
    description: String,
    category: String,
    location: String,
    created_at: DateTime<Utc>,
    date_lost_found: Option<String>,
    image: Option<String>,
    status: String,
    user_id: i64,
}

impl TryFrom<ItemRow> for Item {
    type Error = AppError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str, value: &str| {
            AppError::Storage(format!("Item {} has invalid {} '{}'", row.id, field, value))
        };
        Ok(Item {
            item_type: row
                .item_type
                .parse()
                .map_err(|_| corrupt("type", &row.item_type))?,
            category: row
                .category
                .parse()
                .map_err(|_| corrupt("category", &row.category))?,
            status: row.status.parse()?,
            id: row.id.clone(),
            title: row.title,
            description: row.description,
            location: row.location,
            created_at: row.created_at,
            date_lost_found: row.date_lost_found,
            image: row.image,
            user_id: row.user_id,
        })
    }
}

#[derive(FromRow)]
struct NotificationRow {
    id: i64,
    title: String,
    message: String,
    kind: String,
    is_read: bool,
    created_at: DateTime<Utc>,
    user_id: i64,
    item_id: Option<String>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            title: row.title,
            message: row.message,
            kind: row.kind,
            is_read: row.is_read,
            created_at: row.created_at,
            user_id: row.user_id,
            item_id: row.item_id,
        }
    }
}

/// Durable backend on SQLite. Foreign keys are enforced so user deletion
/// cascades and item deletion detaches notifications.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives inside one connection; keep exactly
        // one open for the lifetime of the pool.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(30))
                .connect_with(options)
                .await?
        };

        let store = Self { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        log::info!("Database schema initialized successfully");
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        let username_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)")
                .bind(&user.username)
                .fetch_one(&mut *tx)
                .await?;
        if username_taken {
            return Err(AppError::Conflict("Username already exists.".to_string()));
        }

        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, first_name, last_name, phone, active, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.phone.as_deref())
        .bind(db_time(&user.created_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if !is_unique_violation(&e) {
                return AppError::Database(e);
            }
            if e.to_string().contains("users.username") {
                AppError::Conflict("Username already exists.".to_string())
            } else {
                AppError::Conflict("Email already registered.".to_string())
            }
        })?;

        tx.commit().await?;
        Ok(user.into_user(result.last_insert_rowid()))
    }

    async fn get_user(&self, user_id: i64) -> AppResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS))
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    async fn delete_user(&self, user_id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn other_user_ids(&self, user_id: i64) -> AppResult<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id != ? ORDER BY id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn insert_item(&self, item: &Item) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO items ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            ITEM_COLUMNS
        ))
        .bind(&item.id)
        .bind(item.item_type.as_str())
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.category.as_str())
        .bind(&item.location)
        .bind(db_time(&item.created_at))
        .bind(item.date_lost_found.as_deref())
        .bind(item.image.as_deref())
        .bind(item.status.as_str())
        .bind(item.user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Item id {} already taken", item.id))
            } else {
                AppError::Database(e)
            }
        })?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_item(&self, item_id: &str) -> AppResult<Option<Item>> {
        let row: Option<ItemRow> =
            sqlx::query_as(&format!("SELECT {} FROM items WHERE id = ?", ITEM_COLUMNS))
                .bind(item_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Item::try_from).transpose()
    }

    async fn update_item(&self, item: &Item) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE items SET title = ?, description = ?, category = ?, location = ?, \
             date_lost_found = ?, image = ?, status = ? WHERE id = ?",
        )
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.category.as_str())
        .bind(&item.location)
        .bind(item.date_lost_found.as_deref())
        .bind(item.image.as_deref())
        .bind(item.status.as_str())
        .bind(&item.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Item not found".to_string()));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_item(&self, item_id: &str) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_items(&self, filter: &ItemFilter) -> AppResult<Vec<Item>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM items WHERE 1 = 1", ITEM_COLUMNS));

        if filter.active_only {
            query.push(" AND status = 'active'");
        }
        if let Some(item_type) = filter.item_type {
            query.push(" AND item_type = ").push_bind(item_type.as_str());
        }
        if let Some(owner_id) = filter.owner_id {
            query.push(" AND user_id = ").push_bind(owner_id);
        }
        if let Some(category) = &filter.category {
            query.push(" AND category = ").push_bind(category.clone());
        }
        // SQLite's lower() only folds ASCII, so substring matching runs on
        // the fetched rows with the same predicate the memory store uses.
        let substring_filters = filter.location.is_some() || filter.text.is_some();

        query.push(" ORDER BY created_at DESC, rowid DESC");
        if let Some(limit) = filter.limit.filter(|_| !substring_filters) {
            query.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows: Vec<ItemRow> = query.build_query_as().fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(Item::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        if !substring_filters {
            return Ok(items);
        }

        let limit = filter.limit.map_or(usize::MAX, |limit| limit as usize);
        Ok(items
            .into_iter()
            .filter(|item| filter.matches(item))
            .take(limit)
            .collect())
    }

    async fn insert_notifications(&self, notifications: Vec<NewNotification>) -> AppResult<usize> {
        if notifications.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for notification in &notifications {
            sqlx::query(
                "INSERT INTO notifications (title, message, kind, is_read, created_at, user_id, item_id) \
                 VALUES (?, ?, ?, 0, ?, ?, ?)",
            )
            .bind(&notification.title)
            .bind(&notification.message)
            .bind(&notification.kind)
            .bind(db_time(&notification.created_at))
            .bind(notification.user_id)
            .bind(notification.item_id.as_deref())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(notifications.len())
    }

    async fn list_notifications(&self, user_id: i64, limit: Option<u32>) -> AppResult<Vec<Notification>> {
        // LIMIT -1 means no limit in SQLite.
        let rows: Vec<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM notifications WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
            NOTIFICATION_COLUMNS
        ))
        .bind(user_id)
        .bind(limit.map(i64::from).unwrap_or(-1))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn count_unread_notifications(&self, user_id: i64) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn mark_notification_read(&self, notification_id: i64, user_id: i64) -> AppResult<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
            .bind(notification_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::item::{Category, ItemStatus, ItemType};
    use crate::services::testing::{sample_item, sample_user};
    use chrono::Duration;

    async fn store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_user_operations() {
        let db = store().await;
        let user = db.create_user(sample_user("john")).await.unwrap();
        assert_eq!(user.username, "john");

        let by_id = db.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(by_id, user);
        assert!(db.get_user_by_username("john").await.unwrap().is_some());
        assert!(db.get_user_by_email("john@example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email() {
        let db = store().await;
        db.create_user(sample_user("john")).await.unwrap();

        match db.create_user(sample_user("john")).await {
            Err(AppError::Conflict(msg)) => assert_eq!(msg, "Username already exists."),
            other => panic!("unexpected: {:?}", other),
        }

        let mut same_email = sample_user("johnny");
        same_email.email = "john@example.com".to_string();
        match db.create_user(same_email).await {
            Err(AppError::Conflict(msg)) => assert_eq!(msg, "Email already registered."),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_item_round_trip() {
        let db = store().await;
        let owner = db.create_user(sample_user("jane")).await.unwrap();
        let mut item = sample_item("a1b2c3d4", owner.id, "Umbrella");
        item.date_lost_found = Some("yesterday".to_string());
        item.image = Some("20240101_120000_umbrella.png".to_string());

        db.insert_item(&item).await.unwrap();
        let fetched = db.get_item("a1b2c3d4").await.unwrap().unwrap();
        assert_eq!(fetched, item);
    }

    #[tokio::test]
    async fn test_duplicate_item_id_conflicts() {
        let db = store().await;
        let owner = db.create_user(sample_user("jane")).await.unwrap();
        db.insert_item(&sample_item("deadbeef", owner.id, "One")).await.unwrap();
        let dup = db.insert_item(&sample_item("deadbeef", owner.id, "Two")).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));
        assert_eq!(db.get_item("deadbeef").await.unwrap().unwrap().title, "One");
    }

    #[tokio::test]
    async fn test_listing_is_newest_first() {
        let db = store().await;
        let owner = db.create_user(sample_user("jane")).await.unwrap();
        let base = crate::models::common::timestamp_now();

        for (offset, id) in [(1, "00000001"), (3, "00000003"), (2, "00000002")] {
            let mut item = sample_item(id, owner.id, id);
            item.created_at = base + Duration::seconds(offset);
            db.insert_item(&item).await.unwrap();
        }

        let items = db
            .list_items(&ItemFilter::browse(ItemType::Lost, None, None, None))
            .await
            .unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["00000003", "00000002", "00000001"]);
    }

    #[tokio::test]
    async fn test_same_timestamp_orders_by_insertion() {
        let db = store().await;
        let owner = db.create_user(sample_user("jane")).await.unwrap();
        let first = sample_item("00000001", owner.id, "First");
        let mut second = sample_item("00000002", owner.id, "Second");
        second.created_at = first.created_at;
        db.insert_item(&first).await.unwrap();
        db.insert_item(&second).await.unwrap();

        let items = db.list_items(&ItemFilter::owned_by(owner.id)).await.unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["00000002", "00000001"]);
    }

    #[tokio::test]
    async fn test_listing_filters() {
        let db = store().await;
        let owner = db.create_user(sample_user("jane")).await.unwrap();

        let mut phone = sample_item("00000001", owner.id, "Silver Phone");
        phone.category = Category::Electronics;
        phone.location = "North Campus".to_string();
        let mut keys = sample_item("00000002", owner.id, "Car keys");
        keys.category = Category::Keys;
        let mut found = sample_item("00000003", owner.id, "Phone charger");
        found.item_type = ItemType::Found;
        let mut resolved = sample_item("00000004", owner.id, "Old phone");
        resolved.status = ItemStatus::Resolved;

        for item in [&phone, &keys, &found, &resolved] {
            db.insert_item(item).await.unwrap();
        }

        let by_category = db
            .list_items(&ItemFilter::browse(ItemType::Lost, Some("Keys".to_string()), None, None))
            .await
            .unwrap();
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].id, "00000002");

        let by_text = db
            .list_items(&ItemFilter::browse(ItemType::Lost, None, None, Some("PHONE".to_string())))
            .await
            .unwrap();
        assert_eq!(by_text.len(), 1);
        assert_eq!(by_text[0].id, "00000001");

        let by_location = db
            .list_items(&ItemFilter::browse(ItemType::Lost, None, Some("north".to_string()), None))
            .await
            .unwrap();
        assert_eq!(by_location.len(), 1);

        let global = db.list_items(&ItemFilter::search("keys")).await.unwrap();
        assert_eq!(global.len(), 1);
        let global = db.list_items(&ItemFilter::search("phone")).await.unwrap();
        assert_eq!(global.len(), 2);
    }

    #[tokio::test]
    async fn test_wildcards_are_literal() {
        let db = store().await;
        let owner = db.create_user(sample_user("jane")).await.unwrap();
        db.insert_item(&sample_item("00000001", owner.id, "Plain"))
            .await
            .unwrap();

        let items = db.list_items(&ItemFilter::search("%")).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_search_folds_non_ascii_case() {
        let db = store().await;
        let owner = db.create_user(sample_user("jane")).await.unwrap();
        let mut scarf = sample_item("00000001", owner.id, "Écharpe rouge");
        scarf.location = "Café Müller".to_string();
        db.insert_item(&scarf).await.unwrap();

        for query in ["Écharpe", "écharpe", "ÉCHARPE ROUGE"] {
            let items = db.list_items(&ItemFilter::search(query)).await.unwrap();
            assert_eq!(items.len(), 1, "query {:?}", query);
        }

        let by_location = db
            .list_items(&ItemFilter::browse(ItemType::Lost, None, Some("CAFÉ".to_string()), None))
            .await
            .unwrap();
        assert_eq!(by_location.len(), 1);
    }

    #[tokio::test]
    async fn test_limit_applies_after_text_match() {
        let db = store().await;
        let owner = db.create_user(sample_user("jane")).await.unwrap();
        let base = crate::models::common::timestamp_now();
        for (n, title) in ["Red umbrella", "Blue bag", "Green umbrella", "Grey umbrella"]
            .iter()
            .enumerate()
        {
            let mut item = sample_item(&format!("0000000{}", n), owner.id, title);
            item.created_at = base + Duration::seconds(n as i64);
            db.insert_item(&item).await.unwrap();
        }

        let mut filter = ItemFilter::search("umbrella");
        filter.limit = Some(2);
        let titles: Vec<String> = db
            .list_items(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.title)
            .collect();
        assert_eq!(titles, vec!["Grey umbrella", "Green umbrella"]);
    }

    #[tokio::test]
    async fn test_deleting_item_detaches_notifications() {
        let db = store().await;
        let owner = db.create_user(sample_user("jane")).await.unwrap();
        let other = db.create_user(sample_user("joe")).await.unwrap();
        let item = sample_item("0000000a", owner.id, "Watch");
        db.insert_item(&item).await.unwrap();
        db.insert_notifications(vec![NewNotification::lost_item(&item, other.id)])
            .await
            .unwrap();

        assert!(db.delete_item("0000000a").await.unwrap());
        let notes = db.list_notifications(other.id, None).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].item_id, None);
    }

    #[tokio::test]
    async fn test_deleting_user_cascades() {
        let db = store().await;
        let owner = db.create_user(sample_user("jane")).await.unwrap();
        let other = db.create_user(sample_user("joe")).await.unwrap();
        let item = sample_item("0000000b", owner.id, "Ring");
        db.insert_item(&item).await.unwrap();
        db.insert_notifications(vec![NewNotification::lost_item(&item, other.id)])
            .await
            .unwrap();

        assert!(db.delete_user(owner.id).await.unwrap());
        assert!(db.get_item("0000000b").await.unwrap().is_none());
        assert_eq!(db.list_notifications(other.id, None).await.unwrap()[0].item_id, None);

        assert!(db.delete_user(other.id).await.unwrap());
        assert!(db.list_notifications(other.id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notification_batch_rolls_back() {
        let db = store().await;
        let owner = db.create_user(sample_user("jane")).await.unwrap();
        let item = sample_item("0000000c", owner.id, "Hat");
        db.insert_item(&item).await.unwrap();

        let batch = vec![
            NewNotification::lost_item(&item, owner.id),
            NewNotification::lost_item(&item, 12345),
        ];
        assert!(db.insert_notifications(batch).await.is_err());
        assert!(db.list_notifications(owner.id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_requires_owner() {
        let db = store().await;
        let owner = db.create_user(sample_user("jane")).await.unwrap();
        let other = db.create_user(sample_user("joe")).await.unwrap();
        let item = sample_item("0000000d", owner.id, "Glove");
        db.insert_item(&item).await.unwrap();
        db.insert_notifications(vec![NewNotification::lost_item(&item, other.id)])
            .await
            .unwrap();

        let note = db.list_notifications(other.id, Some(5)).await.unwrap().remove(0);
        assert_eq!(db.count_unread_notifications(other.id).await.unwrap(), 1);
        assert!(!db.mark_notification_read(note.id, owner.id).await.unwrap());
        assert!(db.mark_notification_read(note.id, other.id).await.unwrap());
        assert_eq!(db.count_unread_notifications(other.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_unknown_item() {
        let db = store().await;
        let item = sample_item("ffffffff", 1, "Ghost");
        assert!(matches!(
            db.update_item(&item).await,
            Err(AppError::NotFound(_))
        ));
    }
}
