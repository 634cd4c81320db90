use std::future::Future;
use std::pin::Pin;

use actix_web::cookie::{Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::error::InternalError;
use actix_web::http::{header, Method, Uri};
use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use crate::error::{AppError, AppResult};
use crate::models::common::{ApiResponse, FlashMessage, RequestContext};
use crate::services::auth::AuthService;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "lf_session";
pub const FLASH_COOKIE: &str = "lf_flash";
pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to access this page.";

/// Issues and checks the signed session cookie.
///
/// The cookie value is `{user_id}.{expires_unix}.{hex hmac}` where the MAC
/// covers the first two fields.
#[derive(Clone)]
pub struct SessionSigner {
    key: Vec<u8>,
    secure: bool,
    ttl: Duration,
}

impl SessionSigner {
    pub fn new(secret: &str, secure: bool, ttl_hours: i64) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
            secure,
            ttl: Duration::hours(ttl_hours),
        }
    }

    fn mac(&self, payload: &str) -> AppResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| AppError::Storage(format!("Invalid session key: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(mac)
    }

    pub fn sign(&self, user_id: i64) -> AppResult<String> {
        self.sign_at(user_id, Utc::now())
    }

    pub fn sign_at(&self, user_id: i64, now: DateTime<Utc>) -> AppResult<String> {
        let payload = format!("{}.{}", user_id, (now + self.ttl).timestamp());
        let signature = hex::encode(self.mac(&payload)?.finalize().into_bytes());
        Ok(format!("{}.{}", payload, signature))
    }

    pub fn verify(&self, value: &str) -> Option<i64> {
        self.verify_at(value, Utc::now())
    }

    /// Returns the user id when the signature matches and the cookie has
    /// not expired at `now`.
    pub fn verify_at(&self, value: &str, now: DateTime<Utc>) -> Option<i64> {
        let mut parts = value.splitn(3, '.');
        let user_id = parts.next()?;
        let expires = parts.next()?;
        let signature = hex::decode(parts.next()?).ok()?;

        let mac = self.mac(&format!("{}.{}", user_id, expires)).ok()?;
        mac.verify_slice(&signature).ok()?;

        if now.timestamp() >= expires.parse::<i64>().ok()? {
            return None;
        }
        user_id.parse().ok()
    }

    pub fn user_id(&self, req: &HttpRequest) -> Option<i64> {
        req.cookie(SESSION_COOKIE)
            .and_then(|cookie| self.verify(cookie.value()))
    }

    pub fn session_cookie(&self, user_id: i64) -> AppResult<Cookie<'static>> {
        Ok(Cookie::build(SESSION_COOKIE, self.sign(user_id)?)
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(actix_web::cookie::time::Duration::seconds(self.ttl.num_seconds()))
            .finish())
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        removal(SESSION_COOKIE)
    }
}

fn removal(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name, "").path("/").finish();
    cookie.make_removal();
    cookie
}

pub fn flash_cookie(flash: &FlashMessage) -> Cookie<'static> {
    let encoded = serde_json::to_vec(flash).map(hex::encode).unwrap_or_default();
    Cookie::build(FLASH_COOKIE, encoded)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

pub fn read_flash(req: &HttpRequest) -> Option<FlashMessage> {
    let cookie = req.cookie(FLASH_COOKIE)?;
    let bytes = hex::decode(cookie.value()).ok()?;
    serde_json::from_slice(&bytes).ok()
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

pub fn redirect_with_flash(location: &str, flash: FlashMessage) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .cookie(flash_cookie(&flash))
        .finish()
}

/// JSON page body. A pending flash message is moved into the envelope and
/// its cookie cleared.
pub fn page<T: Serialize>(req: &HttpRequest, data: T) -> HttpResponse {
    let flash = read_flash(req);
    let mut response = HttpResponse::Ok();
    if req.cookie(FLASH_COOKIE).is_some() {
        response.cookie(removal(FLASH_COOKIE));
    }
    response.json(ApiResponse::success(data).with_flash(flash))
}

/// Only same-site paths are followed after login.
pub fn safe_next(next: Option<&str>) -> Option<String> {
    let next = next?.trim();
    let local = next.starts_with('/') && !next.starts_with("//") && !next.contains('\\');
    local.then(|| next.to_string())
}

/// Where to send the user after they log in. Form posts cannot be replayed
/// as a GET, so those return to the same-site page they were sent from.
fn return_path(req: &HttpRequest) -> String {
    if req.method() == Method::GET {
        return req
            .uri()
            .path_and_query()
            .map_or("/", |pq| pq.as_str())
            .to_string();
    }

    let conn = req.connection_info();
    req.headers()
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<Uri>().ok())
        .filter(|uri| uri.authority().map_or(true, |a| a.as_str() == conn.host()))
        .and_then(|uri| safe_next(uri.path_and_query().map(|pq| pq.as_str())))
        .unwrap_or_else(|| "/".to_string())
}

fn login_redirect(req: &HttpRequest) -> HttpResponse {
    let target = return_path(req);
    let query = serde_urlencoded::to_string([("next", target.as_str())]).unwrap_or_default();

    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, format!("/login?{}", query)))
        .cookie(flash_cookie(&FlashMessage::info(LOGIN_REQUIRED_MESSAGE)))
        .cookie(removal(SESSION_COOKIE))
        .finish()
}

/// Requiring a `RequestContext` in a handler makes the route login-only.
/// Anonymous callers, expired cookies and deleted accounts are sent to the
/// login page.
impl FromRequest for RequestContext {
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let user_id = req
                .app_data::<web::Data<SessionSigner>>()
                .and_then(|signer| signer.user_id(&req));
            let auth = req.app_data::<web::Data<AuthService>>();

            if let (Some(user_id), Some(auth)) = (user_id, auth) {
                match auth.current_user(user_id).await {
                    Ok(Some(user)) => return Ok(RequestContext::new(user.id)),
                    Ok(None) => log::info!("Session for missing user {} discarded", user_id),
                    Err(e) => return Err(e.into()),
                }
            }

            Err(InternalError::from_response("login required", login_redirect(&req)).into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::common::FlashLevel;
    use actix_web::test::TestRequest;

    fn signer() -> SessionSigner {
        SessionSigner::new("test-secret", false, 1)
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = signer();
        let value = signer.sign(17).unwrap();
        assert!(value.starts_with("17."));
        assert_eq!(signer.verify(&value), Some(17));
    }

    #[test]
    fn test_tampered_cookie_rejected() {
        let signer = signer();
        let value = signer.sign(17).unwrap();
        let forged = value.replacen("17", "18", 1);
        assert_eq!(signer.verify(&forged), None);
        assert_eq!(signer.verify("garbage"), None);
        assert_eq!(signer.verify("1.2.zz"), None);

        let other = SessionSigner::new("other-secret", false, 1);
        assert_eq!(other.verify(&value), None);
    }

    #[test]
    fn test_expired_cookie_rejected() {
        let signer = signer();
        let issued = Utc::now() - Duration::hours(2);
        let value = signer.sign_at(5, issued).unwrap();
        assert_eq!(signer.verify(&value), None);
        assert_eq!(signer.verify_at(&value, issued), Some(5));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = SessionSigner::new("k", true, 1).session_cookie(3).unwrap();
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_flash_round_trip() {
        let cookie = flash_cookie(&FlashMessage::error("Title is required"));
        let req = TestRequest::default().cookie(cookie).to_http_request();
        let flash = read_flash(&req).unwrap();
        assert_eq!(flash.level, FlashLevel::Error);
        assert_eq!(flash.message, "Title is required");
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/dashboard")), Some("/dashboard".to_string()));
        assert_eq!(safe_next(Some("/item/abc?x=1")), Some("/item/abc?x=1".to_string()));
        assert_eq!(safe_next(Some("https://evil.example")), None);
        assert_eq!(safe_next(Some("//evil.example")), None);
        assert_eq!(safe_next(Some("/\\evil.example")), None);
        assert_eq!(safe_next(None), None);
    }

    #[test]
    fn test_login_redirect_keeps_path() {
        let req = TestRequest::get().uri("/post/lost?x=1").to_http_request();
        let response = login_redirect(&req);
        assert_eq!(response.status(), actix_web::http::StatusCode::SEE_OTHER);
        let location = response.headers().get(header::LOCATION).unwrap();
        assert_eq!(location, "/login?next=%2Fpost%2Flost%3Fx%3D1");
    }

    #[test]
    fn test_login_redirect_after_post_uses_referer() {
        let req = TestRequest::post()
            .uri("/item/abc12345/delete")
            .insert_header((header::HOST, "lost.example"))
            .insert_header((header::REFERER, "http://lost.example/item/abc12345"))
            .to_http_request();
        let location = login_redirect(&req).headers().get(header::LOCATION).cloned().unwrap();
        assert_eq!(location, "/login?next=%2Fitem%2Fabc12345");

        let req = TestRequest::post()
            .uri("/item/abc12345/resolve")
            .insert_header((header::HOST, "lost.example"))
            .insert_header((header::REFERER, "http://elsewhere.example/phish"))
            .to_http_request();
        let location = login_redirect(&req).headers().get(header::LOCATION).cloned().unwrap();
        assert_eq!(location, "/login?next=%2F");

        let req = TestRequest::post().uri("/item/abc12345/resolve").to_http_request();
        let location = login_redirect(&req).headers().get(header::LOCATION).cloned().unwrap();
        assert_eq!(location, "/login?next=%2F");
    }
}
