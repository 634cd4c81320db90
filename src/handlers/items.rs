use actix_multipart::form::{tempfile::TempFile, text::Text, MultipartForm};
use actix_web::{get, post, web, HttpRequest, HttpResponse, Result};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::flash_failure;
use crate::models::common::{FlashMessage, RequestContext};
use crate::models::item::{Category, Item, ItemForm, ItemType};
use crate::services::items::ItemService;
use crate::services::session::{page, redirect, redirect_with_flash, SessionSigner};
use crate::services::uploads::ImageUpload;

/// Multipart body of the create and edit forms.
#[derive(Debug, MultipartForm)]
pub struct ItemUploadForm {
    pub title: Option<Text<String>>,
    pub description: Option<Text<String>>,
    pub category: Option<Text<String>>,
    pub location: Option<Text<String>>,
    pub date_lost_found: Option<Text<String>>,
    pub image: Option<TempFile>,
}

fn text(field: Option<Text<String>>) -> String {
    field.map(|t| t.0).unwrap_or_default()
}

impl ItemUploadForm {
    /// Split into the form fields and the uploaded file, if one was chosen.
    /// Browsers send an empty, unnamed part when no file is selected.
    pub async fn into_parts(self) -> AppResult<(ItemForm, Option<ImageUpload>)> {
        let image = match self.image {
            Some(temp) => match temp.file_name.clone().filter(|name| !name.is_empty()) {
                Some(name) => {
                    let bytes = tokio::fs::read(temp.file.path()).await?;
                    Some(ImageUpload::new(name, bytes))
                }
                None => None,
            },
            None => None,
        };

        let form = ItemForm {
            title: text(self.title),
            description: text(self.description),
            category: text(self.category),
            location: text(self.location),
            date_lost_found: self.date_lost_found.map(|t| t.0),
        };
        Ok((form, image))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BrowseQuery {
    pub category: Option<String>,
    pub location: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Serialize)]
struct HomePage {
    lost_items: Vec<Item>,
    found_items: Vec<Item>,
}

#[derive(Serialize)]
struct PostFormPage {
    item_type: ItemType,
    categories: Vec<&'static str>,
}

#[derive(Serialize)]
struct BrowsePage {
    item_type: ItemType,
    items: Vec<Item>,
    categories: Vec<&'static str>,
    category: Option<String>,
    location: Option<String>,
    search: Option<String>,
}

#[derive(Serialize)]
struct SearchPage {
    query: String,
    items: Vec<Item>,
}

#[derive(Serialize)]
struct ItemPage {
    item: Item,
    is_owner: bool,
}

#[derive(Serialize)]
struct EditPage {
    item: Item,
    categories: Vec<&'static str>,
}

fn invalid_type() -> HttpResponse {
    redirect_with_flash("/", FlashMessage::error("Invalid item type"))
}

/// Where a failed owner-only action sends the user back to.
fn owner_failure(item_id: &str, err: AppError) -> HttpResponse {
    match err {
        AppError::NotFound(_) => flash_failure("/dashboard", err),
        _ => flash_failure(&format!("/item/{}/edit", item_id), err),
    }
}

#[get("/")]
pub async fn home(req: HttpRequest, items: web::Data<ItemService>) -> Result<HttpResponse> {
    let lost_items = items.recent(ItemType::Lost).await?;
    let found_items = items.recent(ItemType::Found).await?;
    Ok(page(
        &req,
        HomePage {
            lost_items,
            found_items,
        },
    ))
}

#[get("/post/{item_type}")]
pub async fn post_form(
    req: HttpRequest,
    _ctx: RequestContext,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let item_type = match path.parse::<ItemType>() {
        Ok(item_type) => item_type,
        Err(_) => return Ok(invalid_type()),
    };
    Ok(page(
        &req,
        PostFormPage {
            item_type,
            categories: Category::names(),
        },
    ))
}

#[post("/post/{item_type}")]
pub async fn create_item(
    ctx: RequestContext,
    path: web::Path<String>,
    items: web::Data<ItemService>,
    MultipartForm(upload): MultipartForm<ItemUploadForm>,
) -> Result<HttpResponse> {
    let item_type = match path.parse::<ItemType>() {
        Ok(item_type) => item_type,
        Err(_) => return Ok(invalid_type()),
    };
    let form_location = format!("/post/{}", item_type);

    let (form, image) = match upload.into_parts().await {
        Ok(parts) => parts,
        Err(e) => return Ok(flash_failure(&form_location, e)),
    };

    match items.create_item(&ctx, item_type, form, image).await {
        Ok(item) => Ok(redirect_with_flash(
            &format!("/item/{}", item.id),
            FlashMessage::success(format!(
                "Your {} item has been posted successfully!",
                item.item_type
            )),
        )),
        Err(e) => Ok(flash_failure(&form_location, e)),
    }
}

#[get("/browse/{item_type}")]
pub async fn browse(
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<BrowseQuery>,
    items: web::Data<ItemService>,
) -> Result<HttpResponse> {
    let item_type = match path.parse::<ItemType>() {
        Ok(item_type) => item_type,
        Err(_) => return Ok(invalid_type()),
    };
    let query = query.into_inner();

    let found = items
        .browse(
            item_type,
            query.category.clone(),
            query.location.clone(),
            query.search.clone(),
        )
        .await?;

    Ok(page(
        &req,
        BrowsePage {
            item_type,
            items: found,
            categories: Category::names(),
            category: query.category,
            location: query.location,
            search: query.search,
        },
    ))
}

#[get("/search")]
pub async fn search(
    req: HttpRequest,
    query: web::Query<SearchQuery>,
    items: web::Data<ItemService>,
) -> Result<HttpResponse> {
    let q = query.into_inner().q.unwrap_or_default().trim().to_string();
    if q.is_empty() {
        return Ok(redirect("/"));
    }

    let found = items.search(&q).await?;
    Ok(page(&req, SearchPage { query: q, items: found }))
}

#[get("/item/{item_id}")]
pub async fn item_detail(
    req: HttpRequest,
    path: web::Path<String>,
    items: web::Data<ItemService>,
    signer: web::Data<SessionSigner>,
) -> Result<HttpResponse> {
    let item = items.get_item(&path).await?;
    let is_owner = signer.user_id(&req) == Some(item.user_id);
    Ok(page(&req, ItemPage { item, is_owner }))
}

#[get("/item/{item_id}/edit")]
pub async fn edit_form(
    req: HttpRequest,
    ctx: RequestContext,
    path: web::Path<String>,
    items: web::Data<ItemService>,
) -> Result<HttpResponse> {
    match items.get_owned_item(&ctx, &path).await {
        Ok(item) => Ok(page(
            &req,
            EditPage {
                item,
                categories: Category::names(),
            },
        )),
        Err(e) => Ok(flash_failure("/dashboard", e)),
    }
}

#[post("/item/{item_id}/edit")]
pub async fn update_item(
    ctx: RequestContext,
    path: web::Path<String>,
    items: web::Data<ItemService>,
    MultipartForm(upload): MultipartForm<ItemUploadForm>,
) -> Result<HttpResponse> {
    let item_id = path.into_inner();
    let (form, image) = match upload.into_parts().await {
        Ok(parts) => parts,
        Err(e) => return Ok(owner_failure(&item_id, e)),
    };

    match items.update_item(&ctx, &item_id, form, image).await {
        Ok(item) => Ok(redirect_with_flash(
            &format!("/item/{}", item.id),
            FlashMessage::success("Item updated successfully!"),
        )),
        Err(e) => Ok(owner_failure(&item_id, e)),
    }
}

#[post("/item/{item_id}/delete")]
pub async fn delete_item(
    ctx: RequestContext,
    path: web::Path<String>,
    items: web::Data<ItemService>,
) -> Result<HttpResponse> {
    match items.delete_item(&ctx, &path).await {
        Ok(()) => Ok(redirect_with_flash(
            "/dashboard",
            FlashMessage::success("Item deleted successfully!"),
        )),
        Err(e) => Ok(flash_failure("/dashboard", e)),
    }
}

#[post("/item/{item_id}/resolve")]
pub async fn resolve_item(
    ctx: RequestContext,
    path: web::Path<String>,
    items: web::Data<ItemService>,
) -> Result<HttpResponse> {
    match items.resolve_item(&ctx, &path).await {
        Ok(item) => Ok(redirect_with_flash(
            &format!("/item/{}", item.id),
            FlashMessage::success("Item marked as resolved."),
        )),
        Err(e) => Ok(flash_failure("/dashboard", e)),
    }
}
