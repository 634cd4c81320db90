use std::sync::Arc;

use actix_multipart::form::MultipartFormConfig;
use actix_multipart::MultipartError;
use actix_web::error::{PayloadError, UrlencodedError};
use actix_web::web;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::handlers;
use crate::services::auth::AuthService;
use crate::services::items::ItemService;
use crate::services::notifications::NotificationService;
use crate::services::session::SessionSigner;
use crate::services::store::{open_store, Store};
use crate::services::uploads::UploadService;

/// Everything the handlers share, built once at startup and cloned into
/// each worker.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub uploads: Arc<UploadService>,
    pub notifications: Arc<NotificationService>,
    pub items: Arc<ItemService>,
    pub auth: Arc<AuthService>,
    pub signer: SessionSigner,
    pub max_content_length: usize,
}

impl AppState {
    pub async fn from_config(config: &Config) -> AppResult<Self> {
        let store = open_store(&config.database_url).await?;
        let uploads = Arc::new(UploadService::new(&config.app.upload_folder)?);
        let signer = SessionSigner::new(
            &config.app.secret_key,
            config.is_production(),
            config.app.session_ttl_hours,
        );
        Ok(Self::new(store, uploads, signer, config.app.max_content_length))
    }

    pub fn new(
        store: Arc<dyn Store>,
        uploads: Arc<UploadService>,
        signer: SessionSigner,
        max_content_length: usize,
    ) -> Self {
        let notifications = Arc::new(NotificationService::new(store.clone()));
        let items = Arc::new(ItemService::new(
            store.clone(),
            uploads.clone(),
            notifications.clone(),
        ));
        let auth = Arc::new(AuthService::new(store.clone()));

        Self {
            store,
            uploads,
            notifications,
            items,
            auth,
            signer,
            max_content_length,
        }
    }

    /// Register shared data, body limits and every route.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::from(self.store.clone()))
            .app_data(web::Data::from(self.uploads.clone()))
            .app_data(web::Data::from(self.notifications.clone()))
            .app_data(web::Data::from(self.items.clone()))
            .app_data(web::Data::from(self.auth.clone()))
            .app_data(web::Data::new(self.signer.clone()))
            .app_data(
                web::FormConfig::default()
                    .limit(self.max_content_length)
                    .error_handler(|err, _req| match err {
                        UrlencodedError::Overflow { .. } => body_too_large().into(),
                        err => err.into(),
                    }),
            )
            .app_data(
                MultipartFormConfig::default()
                    .total_limit(self.max_content_length)
                    .memory_limit(self.max_content_length)
                    .error_handler(|err, _req| match err {
                        MultipartError::Payload(PayloadError::Overflow) => body_too_large().into(),
                        err => err.into(),
                    }),
            );

        handlers::configure(cfg);
    }
}

fn body_too_large() -> AppError {
    AppError::PayloadTooLarge("The submitted content is too large.".to_string())
}
