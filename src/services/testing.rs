//! Fixtures shared by the in-crate store and service tests.

use crate::models::common::timestamp_now;
use crate::models::item::{Category, Item, ItemDraft, ItemStatus, ItemType};
use crate::models::user::NewUser;

pub fn sample_user(username: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password_hash: "not-a-real-hash".to_string(),
        first_name: "Test".to_string(),
        last_name: username.to_string(),
        phone: None,
        created_at: timestamp_now(),
    }
}

pub fn sample_draft(title: &str) -> ItemDraft {
    ItemDraft {
        title: title.to_string(),
        description: format!("Description of {}", title),
        category: Category::Other,
        location: "Main Street".to_string(),
        date_lost_found: None,
    }
}

pub fn sample_item(id: &str, owner: i64, title: &str) -> Item {
    let mut item = Item::new(id.to_string(), ItemType::Lost, &sample_draft(title), None, owner);
    item.status = ItemStatus::Active;
    item
}
