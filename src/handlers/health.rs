use actix_web::{get, web, HttpResponse, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::common::ApiResponse;
use crate::services::store::Store;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[get("/health")]
pub async fn health_check(store: web::Data<dyn Store>) -> Result<HttpResponse> {
    match store.health_check().await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success(HealthStatus {
            status: "healthy",
            timestamp: Utc::now(),
        }))),
        Err(e) => {
            log::error!("Health check failed: {}", e);
            Ok(HttpResponse::ServiceUnavailable()
                .json(ApiResponse::<()>::error("Storage unavailable".to_string())))
        }
    }
}
