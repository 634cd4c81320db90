use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::common::RequestContext;
use crate::models::item::{
    generate_item_id, Category, Item, ItemDraft, ItemFilter, ItemForm, ItemStatus, ItemType,
};
use crate::services::notifications::NotificationService;
use crate::services::store::Store;
use crate::services::uploads::{ImageUpload, UploadService};

pub const RECENT_ITEMS_LIMIT: u32 = 6;

const MAX_ID_ATTEMPTS: usize = 5;

/// Item lifecycle: create, edit, resolve and delete, plus the read views
/// used by the listing pages.
pub struct ItemService {
    store: Arc<dyn Store>,
    uploads: Arc<UploadService>,
    notifications: Arc<NotificationService>,
}

impl ItemService {
    pub fn new(
        store: Arc<dyn Store>,
        uploads: Arc<UploadService>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            store,
            uploads,
            notifications,
        }
    }

    pub async fn create_item(
        &self,
        ctx: &RequestContext,
        item_type: ItemType,
        form: ItemForm,
        image: Option<ImageUpload>,
    ) -> AppResult<Item> {
        let draft = form.into_draft()?;
        let image_name = self.store_image(image.as_ref()).await?;

        let item = match self
            .insert_with_fresh_id(ctx, item_type, &draft, image_name.clone())
            .await
        {
            Ok(item) => item,
            Err(e) => {
                if let Some(name) = &image_name {
                    self.uploads.discard(name).await;
                }
                return Err(e);
            }
        };
        log::info!(
            "User {} posted {} item {} ({})",
            ctx.user_id,
            item.item_type,
            item.id,
            item.title
        );

        // The item stands even if nobody could be told about it.
        if let Err(e) = self.notifications.notify_lost_item(&item).await {
            log::error!("Failed to send notifications for item {}: {}", item.id, e);
        }

        Ok(item)
    }

    async fn insert_with_fresh_id(
        &self,
        ctx: &RequestContext,
        item_type: ItemType,
        draft: &ItemDraft,
        image: Option<String>,
    ) -> AppResult<Item> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let item = Item::new(generate_item_id(), item_type, draft, image.clone(), ctx.user_id);
            match self.store.insert_item(&item).await {
                Ok(()) => return Ok(item),
                Err(AppError::Conflict(msg)) => {
                    log::warn!("Item id collision, retrying: {}", msg);
                }
                Err(e) => return Err(e),
            }
        }
        Err(AppError::Storage(format!(
            "Could not allocate an item id after {} attempts",
            MAX_ID_ATTEMPTS
        )))
    }

    async fn store_image(&self, image: Option<&ImageUpload>) -> AppResult<Option<String>> {
        match image {
            Some(upload) => self.uploads.save(upload).await,
            None => Ok(None),
        }
    }

    pub async fn get_item(&self, item_id: &str) -> AppResult<Item> {
        self.store
            .get_item(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Item not found.".to_string()))
    }

    /// Unknown ids and items owned by someone else look the same.
    pub async fn get_owned_item(&self, ctx: &RequestContext, item_id: &str) -> AppResult<Item> {
        match self.store.get_item(item_id).await? {
            Some(item) if item.is_owned_by(ctx.user_id) => Ok(item),
            _ => Err(AppError::NotFound("Item not found.".to_string())),
        }
    }

    /// Edit an item. The image is only replaced when a new acceptable file
    /// comes with the form. Editing never notifies anyone.
    pub async fn update_item(
        &self,
        ctx: &RequestContext,
        item_id: &str,
        form: ItemForm,
        image: Option<ImageUpload>,
    ) -> AppResult<Item> {
        let mut item = self.get_owned_item(ctx, item_id).await?;
        let draft = form.into_draft()?;
        let new_image = self.store_image(image.as_ref()).await?;

        let previous_image = item.image.clone();
        item.apply(&draft, new_image.clone());

        if let Err(e) = self.store.update_item(&item).await {
            if let Some(name) = &new_image {
                self.uploads.discard(name).await;
            }
            return Err(e);
        }

        if let (Some(_), Some(old)) = (&new_image, &previous_image) {
            self.uploads.discard(old).await;
        }

        log::info!("User {} updated item {}", ctx.user_id, item.id);
        Ok(item)
    }

    pub async fn resolve_item(&self, ctx: &RequestContext, item_id: &str) -> AppResult<Item> {
        let mut item = self.get_owned_item(ctx, item_id).await?;
        item.status = ItemStatus::Resolved;
        self.store.update_item(&item).await?;
        log::info!("User {} resolved item {}", ctx.user_id, item.id);
        Ok(item)
    }

    pub async fn delete_item(&self, ctx: &RequestContext, item_id: &str) -> AppResult<()> {
        let item = self.get_owned_item(ctx, item_id).await?;
        if !self.store.delete_item(&item.id).await? {
            return Err(AppError::NotFound("Item not found.".to_string()));
        }
        if let Some(image) = &item.image {
            self.uploads.discard(image).await;
        }
        log::info!("User {} deleted item {}", ctx.user_id, item.id);
        Ok(())
    }

    /// Active items of one type. A category filter is matched against the
    /// canonical category name; an unrecognised category matches nothing.
    pub async fn browse(
        &self,
        item_type: ItemType,
        category: Option<String>,
        location: Option<String>,
        search: Option<String>,
    ) -> AppResult<Vec<Item>> {
        let category = category.map(|c| match c.trim().parse::<Category>() {
            Ok(known) => known.as_str().to_string(),
            Err(_) => c,
        });
        self.store
            .list_items(&ItemFilter::browse(item_type, category, location, search))
            .await
    }

    /// Global search across both types. A blank query finds nothing.
    pub async fn search(&self, query: &str) -> AppResult<Vec<Item>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.store.list_items(&ItemFilter::search(query)).await
    }

    pub async fn recent(&self, item_type: ItemType) -> AppResult<Vec<Item>> {
        self.store
            .list_items(&ItemFilter::recent(item_type, RECENT_ITEMS_LIMIT))
            .await
    }

    pub async fn items_for_owner(&self, ctx: &RequestContext) -> AppResult<Vec<Item>> {
        self.store.list_items(&ItemFilter::owned_by(ctx.user_id)).await
    }
}
