use actix_web::{get, web, HttpRequest, HttpResponse, Result};
use serde::Serialize;

use crate::error::AppError;
use crate::handlers::flash_failure;
use crate::models::common::{FlashMessage, RequestContext};
use crate::models::item::{Item, ItemType};
use crate::models::notification::Notification;
use crate::models::user::User;
use crate::services::auth::AuthService;
use crate::services::items::ItemService;
use crate::services::notifications::NotificationService;
use crate::services::session::{page, redirect_with_flash};

#[derive(Serialize)]
struct DashboardPage {
    user: User,
    items: Vec<Item>,
    lost_count: usize,
    found_count: usize,
    unread_count: i64,
    notifications: Vec<Notification>,
}

#[derive(Serialize)]
struct NotificationsPage {
    notifications: Vec<Notification>,
}

#[get("/dashboard")]
pub async fn dashboard(
    req: HttpRequest,
    ctx: RequestContext,
    auth: web::Data<AuthService>,
    items: web::Data<ItemService>,
    notifications: web::Data<NotificationService>,
) -> Result<HttpResponse> {
    let user = auth
        .current_user(ctx.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;
    let owned = items.items_for_owner(&ctx).await?;
    let lost_count = owned.iter().filter(|i| i.item_type == ItemType::Lost).count();
    let found_count = owned.len() - lost_count;

    Ok(page(
        &req,
        DashboardPage {
            user,
            items: owned,
            lost_count,
            found_count,
            unread_count: notifications.unread_count(&ctx).await?,
            notifications: notifications.recent(&ctx).await?,
        },
    ))
}

#[get("/notifications")]
pub async fn notifications_page(
    req: HttpRequest,
    ctx: RequestContext,
    notifications: web::Data<NotificationService>,
) -> Result<HttpResponse> {
    let notifications = notifications.list(&ctx).await?;
    Ok(page(&req, NotificationsPage { notifications }))
}

#[get("/notifications/{notification_id}/mark_read")]
pub async fn mark_notification_read(
    ctx: RequestContext,
    path: web::Path<i64>,
    notifications: web::Data<NotificationService>,
) -> Result<HttpResponse> {
    match notifications.mark_read(&ctx, path.into_inner()).await {
        Ok(()) => Ok(redirect_with_flash(
            "/notifications",
            FlashMessage::success("Notification marked as read."),
        )),
        Err(e) => Ok(flash_failure("/notifications", e)),
    }
}
