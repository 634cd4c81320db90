pub mod auth;
pub mod dashboard;
pub mod health;
pub mod items;
pub mod uploads;

use actix_web::{web, HttpResponse};

use crate::error::AppError;
use crate::models::common::FlashMessage;
use crate::services::session::redirect_with_flash;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // Listings and item lifecycle
        .service(items::home)
        .service(items::post_form)
        .service(items::create_item)
        .service(items::browse)
        .service(items::search)
        .service(items::item_detail)
        .service(items::edit_form)
        .service(items::update_item)
        .service(items::delete_item)
        .service(items::resolve_item)
        .service(uploads::uploaded_image)
        // Accounts
        .service(auth::register_form)
        .service(auth::register)
        .service(auth::login_form)
        .service(auth::login)
        .service(auth::logout)
        // Per-user pages
        .service(dashboard::dashboard)
        .service(dashboard::notifications_page)
        .service(dashboard::mark_notification_read)
        // Health check
        .service(health::health_check);
}

/// Send a failed form submission back to `location` with the error as a
/// flash message. Internal failures are logged and shown generically.
pub(crate) fn flash_failure(location: &str, err: AppError) -> HttpResponse {
    if err.is_internal() {
        log::error!("Form submission failed: {}", err);
    }
    redirect_with_flash(location, FlashMessage::error(err.user_message()))
}
