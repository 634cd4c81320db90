use actix_web::http::header;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Result};
use serde::{Deserialize, Serialize};

use crate::handlers::flash_failure;
use crate::models::common::FlashMessage;
use crate::models::user::{LoginRequest, RegisterUserRequest};
use crate::services::auth::AuthService;
use crate::services::session::{flash_cookie, page, redirect, redirect_with_flash, safe_next, SessionSigner};

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Serialize)]
struct AuthPage {
    next: Option<String>,
}

fn login_location(next: Option<&str>) -> String {
    match safe_next(next) {
        Some(next) => format!(
            "/login?{}",
            serde_urlencoded::to_string([("next", next.as_str())]).unwrap_or_default()
        ),
        None => "/login".to_string(),
    }
}

#[get("/register")]
pub async fn register_form(
    req: HttpRequest,
    signer: web::Data<SessionSigner>,
) -> Result<HttpResponse> {
    if signer.user_id(&req).is_some() {
        return Ok(redirect("/"));
    }
    Ok(page(&req, AuthPage { next: None }))
}

#[post("/register")]
pub async fn register(
    form: web::Form<RegisterUserRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse> {
    match auth.register(form.into_inner()).await {
        Ok(_) => Ok(redirect_with_flash(
            "/login",
            FlashMessage::success("Registration successful! Please log in."),
        )),
        Err(e) => Ok(flash_failure("/register", e)),
    }
}

#[get("/login")]
pub async fn login_form(
    req: HttpRequest,
    query: web::Query<NextQuery>,
    signer: web::Data<SessionSigner>,
) -> Result<HttpResponse> {
    if signer.user_id(&req).is_some() {
        return Ok(redirect("/"));
    }
    let next = safe_next(query.next.as_deref());
    Ok(page(&req, AuthPage { next }))
}

#[post("/login")]
pub async fn login(
    query: web::Query<NextQuery>,
    form: web::Form<LoginRequest>,
    auth: web::Data<AuthService>,
    signer: web::Data<SessionSigner>,
) -> Result<HttpResponse> {
    let user = match auth.authenticate(form.into_inner()).await {
        Ok(user) => user,
        Err(e) => return Ok(flash_failure(&login_location(query.next.as_deref()), e)),
    };

    let target = safe_next(query.next.as_deref()).unwrap_or_else(|| "/".to_string());
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, target))
        .cookie(signer.session_cookie(user.id)?)
        .cookie(flash_cookie(&FlashMessage::success(format!(
            "Welcome back, {}!",
            user.first_name
        ))))
        .finish())
}

#[get("/logout")]
pub async fn logout(signer: web::Data<SessionSigner>) -> Result<HttpResponse> {
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/"))
        .cookie(signer.removal_cookie())
        .cookie(flash_cookie(&FlashMessage::info("You have been logged out.")))
        .finish())
}
