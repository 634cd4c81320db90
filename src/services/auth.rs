use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};

use crate::error::{AppError, AppResult};
use crate::models::user::{LoginRequest, NewUser, RegisterUserRequest, User};
use crate::services::store::Store;

const INVALID_CREDENTIALS: &str = "Invalid username or password.";

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Storage(format!("Password hash error: {}", e)))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::error!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

pub struct AuthService {
    store: Arc<dyn Store>,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn register(&self, request: RegisterUserRequest) -> AppResult<User> {
        let request = request.normalized();
        request.check().map_err(AppError::Validation)?;

        if self
            .store
            .get_user_by_username(&request.username)
            .await?
            .is_some()
        {
            return Err(AppError::Validation("Username already exists.".to_string()));
        }
        if self
            .store
            .get_user_by_email(&request.email.to_lowercase())
            .await?
            .is_some()
        {
            return Err(AppError::Validation("Email already registered.".to_string()));
        }

        let password_hash = hash_password(&request.password)?;
        // A concurrent registration can still win the race; report it the same way.
        let user = self
            .store
            .create_user(NewUser::new(request, password_hash))
            .await
            .map_err(|e| match e {
                AppError::Conflict(msg) => AppError::Validation(msg),
                other => other,
            })?;

        log::info!("Registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    pub async fn authenticate(&self, request: LoginRequest) -> AppResult<User> {
        let username = request.username.trim();
        if username.is_empty() || request.password.is_empty() {
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let user = match self.store.get_user_by_username(username).await? {
            Some(user) if verify_password(&request.password, &user.password_hash) => user,
            _ => {
                log::warn!("Failed login attempt for {}", username);
                return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };

        if !user.active {
            log::warn!("Login refused for inactive user {}", user.id);
            return Err(AppError::Unauthorized(
                "This account has been deactivated.".to_string(),
            ));
        }

        log::info!("User {} logged in", user.id);
        Ok(user)
    }

    /// The user behind a session, if the account still exists and is active.
    pub async fn current_user(&self, user_id: i64) -> AppResult<Option<User>> {
        Ok(self.store.get_user(user_id).await?.filter(|u| u.active))
    }
}
