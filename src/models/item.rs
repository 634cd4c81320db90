use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};
use crate::models::common::{first_validation_message, non_blank, timestamp_now};

pub const ITEM_ID_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Lost,
    Found,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Lost => "lost",
            ItemType::Found => "found",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lost" => Ok(ItemType::Lost),
            "found" => Ok(ItemType::Found),
            _ => Err(AppError::Validation("Invalid item type".to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Active,
    Resolved,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Active => "active",
            ItemStatus::Resolved => "resolved",
        }
    }
}

impl FromStr for ItemStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ItemStatus::Active),
            "resolved" | "inactive" => Ok(ItemStatus::Resolved),
            other => Err(AppError::Storage(format!("Unknown item status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    Electronics,
    Clothing,
    Jewelry,
    Keys,
    Documents,
    Bags,
    Books,
    Pets,
    Vehicles,
    #[serde(rename = "Sports Equipment")]
    SportsEquipment,
    Other,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Electronics,
        Category::Clothing,
        Category::Jewelry,
        Category::Keys,
        Category::Documents,
        Category::Bags,
        Category::Books,
        Category::Pets,
        Category::Vehicles,
        Category::SportsEquipment,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "Electronics",
            Category::Clothing => "Clothing",
            Category::Jewelry => "Jewelry",
            Category::Keys => "Keys",
            Category::Documents => "Documents",
            Category::Bags => "Bags",
            Category::Books => "Books",
            Category::Pets => "Pets",
            Category::Vehicles => "Vehicles",
            Category::SportsEquipment => "Sports Equipment",
            Category::Other => "Other",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|c| c.as_str()).collect()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppError;

    /// Case-insensitive on input; always yields the canonical name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AppError::Validation(format!("Unknown category '{}'", wanted)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: String,
    pub item_type: ItemType,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub date_lost_found: Option<String>,
    pub image: Option<String>,
    pub status: ItemStatus,
    pub user_id: i64,
}

impl Item {
    pub fn new(
        id: String,
        item_type: ItemType,
        draft: &ItemDraft,
        image: Option<String>,
        user_id: i64,
    ) -> Self {
        Self {
            id,
            item_type,
            title: draft.title.clone(),
            description: draft.description.clone(),
            category: draft.category,
            location: draft.location.clone(),
            created_at: timestamp_now(),
            date_lost_found: draft.date_lost_found.clone(),
            image,
            status: ItemStatus::Active,
            user_id,
        }
    }

    /// Apply an edit. The image is only replaced when a new one was stored.
    pub fn apply(&mut self, draft: &ItemDraft, new_image: Option<String>) {
        self.title = draft.title.clone();
        self.description = draft.description.clone();
        self.category = draft.category;
        self.location = draft.location.clone();
        self.date_lost_found = draft.date_lost_found.clone();
        if let Some(image) = new_image {
            self.image = Some(image);
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ItemStatus::Active
    }

    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }
}

/// Random 8 character hex token taken from a v4 UUID.
pub fn generate_item_id() -> String {
    Uuid::new_v4().simple().to_string()[..ITEM_ID_LEN].to_string()
}

const ITEM_FIELD_ORDER: &[&str] = &["title", "description", "category", "location"];

fn validate_category(category: &str) -> Result<(), ValidationError> {
    let mut error = if category.is_empty() {
        ValidationError::new("required")
    } else if category.parse::<Category>().is_err() {
        ValidationError::new("unknown_category")
    } else {
        return Ok(());
    };
    error.message = Some(Cow::from(if category.is_empty() {
        "Category is required".to_string()
    } else {
        format!("Category '{}' is not recognised", category)
    }));
    Err(error)
}

const MAX_TEXT_FIELD_LEN: usize = 200;

fn required_text(value: &str, label: &str) -> Result<(), ValidationError> {
    let (code, message) = if value.is_empty() {
        ("required", format!("{} is required", label))
    } else if value.chars().count() > MAX_TEXT_FIELD_LEN {
        (
            "too_long",
            format!("{} must be at most {} characters", label, MAX_TEXT_FIELD_LEN),
        )
    } else {
        return Ok(());
    };
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::from(message));
    Err(error)
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    required_text(title, "Title")
}

fn validate_location(location: &str) -> Result<(), ValidationError> {
    required_text(location, "Location")
}

/// Raw create/edit submission. Every field is optional at this stage so a
/// missing field is reported by validation rather than by extraction.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ItemForm {
    #[serde(default)]
    #[validate(custom = "validate_title")]
    pub title: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    #[serde(default)]
    #[validate(custom = "validate_category")]
    pub category: String,

    #[serde(default)]
    #[validate(custom = "validate_location")]
    pub location: String,

    pub date_lost_found: Option<String>,
}

impl ItemForm {
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            category: self.category.trim().to_string(),
            location: self.location.trim().to_string(),
            date_lost_found: non_blank(self.date_lost_found),
        }
    }

    /// Trim, validate and convert into a draft. Fields are checked in a fixed
    /// order and the first failure is reported.
    pub fn into_draft(self) -> AppResult<ItemDraft> {
        let form = self.normalized();
        form.validate().map_err(|errors| {
            AppError::Validation(first_validation_message(&errors, ITEM_FIELD_ORDER))
        })?;

        Ok(ItemDraft {
            category: form.category.parse()?,
            title: form.title,
            description: form.description,
            location: form.location,
            date_lost_found: form.date_lost_found,
        })
    }
}

/// A validated, trimmed item submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub location: String,
    pub date_lost_found: Option<String>,
}

/// Selection applied by the query layer. Blank strings are treated as
/// absent by the constructors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFilter {
    pub item_type: Option<ItemType>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub text: Option<String>,
    /// Also match `text` against the category name (global search).
    pub text_matches_category: bool,
    pub owner_id: Option<i64>,
    pub active_only: bool,
    pub limit: Option<u32>,
}

impl ItemFilter {
    pub fn browse(
        item_type: ItemType,
        category: Option<String>,
        location: Option<String>,
        search: Option<String>,
    ) -> Self {
        Self {
            item_type: Some(item_type),
            category: non_blank(category),
            location: non_blank(location),
            text: non_blank(search),
            active_only: true,
            ..Self::default()
        }
    }

    pub fn search(query: &str) -> Self {
        Self {
            text: non_blank(Some(query.to_string())),
            text_matches_category: true,
            active_only: true,
            ..Self::default()
        }
    }

    pub fn recent(item_type: ItemType, limit: u32) -> Self {
        Self {
            item_type: Some(item_type),
            active_only: true,
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn owned_by(user_id: i64) -> Self {
        Self {
            owner_id: Some(user_id),
            ..Self::default()
        }
    }

    /// In-process evaluation of the filter. Both stores run the substring
    /// parts through here so case folding is identical.
    pub fn matches(&self, item: &Item) -> bool {
        if self.active_only && !item.is_active() {
            return false;
        }
        if self.item_type.map_or(false, |t| t != item.item_type) {
            return false;
        }
        if self.owner_id.map_or(false, |owner| owner != item.user_id) {
            return false;
        }
        if let Some(category) = &self.category {
            if item.category.as_str() != category {
                return false;
            }
        }
        if let Some(location) = &self.location {
            if !contains_ignore_case(&item.location, location) {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let mut hit = contains_ignore_case(&item.title, text)
                || contains_ignore_case(&item.description, text)
                || contains_ignore_case(&item.location, text);
            if self.text_matches_category {
                hit = hit || contains_ignore_case(item.category.as_str(), text);
            }
            if !hit {
                return false;
            }
        }
        true
    }
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ItemForm {
        ItemForm {
            title: "  Black wallet ".to_string(),
            description: " Leather, two cards inside ".to_string(),
            category: "Other".to_string(),
            location: " Central Station ".to_string(),
            date_lost_found: Some(" 2024-03-01 ".to_string()),
        }
    }

    fn item(title: &str, description: &str, location: &str, category: Category) -> Item {
        let draft = ItemDraft {
            title: title.to_string(),
            description: description.to_string(),
            category,
            location: location.to_string(),
            date_lost_found: None,
        };
        Item::new(generate_item_id(), ItemType::Lost, &draft, None, 1)
    }

    #[test]
    fn test_generated_id_shape() {
        let id = generate_item_id();
        assert_eq!(id.len(), ITEM_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_draft_is_trimmed() {
        let draft = form().into_draft().unwrap();
        assert_eq!(draft.title, "Black wallet");
        assert_eq!(draft.description, "Leather, two cards inside");
        assert_eq!(draft.location, "Central Station");
        assert_eq!(draft.category, Category::Other);
        assert_eq!(draft.date_lost_found.as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn test_first_missing_field_is_reported() {
        let mut f = form();
        f.description = "   ".to_string();
        f.location = String::new();
        match f.into_draft() {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "Description is required"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_blank_title_reported_before_everything_else() {
        let f = ItemForm::default();
        match f.into_draft() {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "Title is required"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_overlong_fields_have_their_own_message() {
        let mut f = form();
        f.title = "x".repeat(201);
        match f.into_draft() {
            Err(AppError::Validation(msg)) => {
                assert_eq!(msg, "Title must be at most 200 characters")
            }
            other => panic!("unexpected: {:?}", other),
        }

        let mut f = form();
        f.location = "é".repeat(201);
        match f.into_draft() {
            Err(AppError::Validation(msg)) => {
                assert_eq!(msg, "Location must be at most 200 characters")
            }
            other => panic!("unexpected: {:?}", other),
        }

        let mut f = form();
        f.title = "é".repeat(200);
        assert!(f.into_draft().is_ok());
    }

    #[test]
    fn test_unknown_category_rejected() {
        let mut f = form();
        f.category = "Spaceships".to_string();
        match f.into_draft() {
            Err(AppError::Validation(msg)) => assert!(msg.contains("Spaceships")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_missing_category_message() {
        let mut f = form();
        f.category = " ".to_string();
        match f.into_draft() {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "Category is required"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_category_parse_is_canonical() {
        assert_eq!("sports equipment".parse::<Category>().unwrap(), Category::SportsEquipment);
        assert_eq!(Category::SportsEquipment.to_string(), "Sports Equipment");
        assert_eq!(Category::names().len(), 11);
    }

    #[test]
    fn test_category_serializes_as_display_name() {
        let json = serde_json::to_value(Category::SportsEquipment).unwrap();
        assert_eq!(json, "Sports Equipment");
    }

    #[test]
    fn test_edit_keeps_image_without_replacement() {
        let mut it = item("Keys", "Three keys", "Park", Category::Keys);
        it.image = Some("old.png".to_string());
        let draft = form().into_draft().unwrap();
        it.apply(&draft, None);
        assert_eq!(it.image.as_deref(), Some("old.png"));
        it.apply(&draft, Some("new.png".to_string()));
        assert_eq!(it.image.as_deref(), Some("new.png"));
        assert_eq!(it.title, "Black wallet");
    }

    #[test]
    fn test_filter_text_matches_title_description_location() {
        let filter = ItemFilter::browse(ItemType::Lost, None, None, Some("ABC".to_string()));
        assert!(filter.matches(&item("my abc phone", "d", "l", Category::Electronics)));
        assert!(filter.matches(&item("t", "has Abc inside", "l", Category::Electronics)));
        assert!(filter.matches(&item("t", "d", "abc street", Category::Electronics)));
        assert!(!filter.matches(&item("t", "d", "l", Category::Electronics)));
    }

    #[test]
    fn test_browse_does_not_match_category_text() {
        let filter = ItemFilter::browse(ItemType::Lost, None, None, Some("keys".to_string()));
        assert!(!filter.matches(&item("t", "d", "l", Category::Keys)));
        let search = ItemFilter::search("keys");
        assert!(search.matches(&item("t", "d", "l", Category::Keys)));
    }

    #[test]
    fn test_filter_category_exact_and_type() {
        let filter = ItemFilter::browse(ItemType::Lost, Some("Keys".to_string()), None, None);
        assert!(filter.matches(&item("t", "d", "l", Category::Keys)));
        assert!(!filter.matches(&item("t", "d", "l", Category::Bags)));

        let mut found = item("t", "d", "l", Category::Keys);
        found.item_type = ItemType::Found;
        assert!(!filter.matches(&found));
    }

    #[test]
    fn test_filter_excludes_resolved() {
        let filter = ItemFilter::search("wallet");
        let mut it = item("wallet", "d", "l", Category::Other);
        assert!(filter.matches(&it));
        it.status = ItemStatus::Resolved;
        assert!(!filter.matches(&it));
        assert!(ItemFilter::owned_by(1).matches(&it));
    }

    #[test]
    fn test_blank_filter_values_are_ignored() {
        let filter = ItemFilter::browse(
            ItemType::Found,
            Some(" ".to_string()),
            Some(String::new()),
            None,
        );
        assert_eq!(filter.category, None);
        assert_eq!(filter.location, None);
    }
}
