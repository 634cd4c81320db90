use actix_web::http::header;
use actix_web::{get, web, HttpResponse, Result};

use crate::error::AppError;
use crate::services::uploads::{content_type, UploadService};

#[get("/static/uploads/{file_name}")]
pub async fn uploaded_image(
    path: web::Path<String>,
    uploads: web::Data<UploadService>,
) -> Result<HttpResponse> {
    let file_name = path.into_inner();
    let bytes = uploads
        .load(&file_name)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found.".to_string()))?;

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, content_type(&file_name)))
        .body(bytes))
}
