use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::common::{first_validation_message, non_blank, timestamp_now};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub profile_image: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A user row before the store has assigned it an id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    pub fn new(request: RegisterUserRequest, password_hash: String) -> Self {
        Self {
            username: request.username,
            email: request.email.to_lowercase(),
            password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            phone: non_blank(request.phone),
            created_at: timestamp_now(),
        }
    }

    pub fn into_user(self, id: i64) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            profile_image: None,
            active: true,
            created_at: self.created_at,
        }
    }
}

const REGISTER_FIELD_ORDER: &[&str] = &["username", "email", "first_name", "last_name", "phone"];

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RegisterUserRequest {
    #[serde(default)]
    #[validate(length(max = 80, message = "Username must be at most 80 characters"))]
    pub username: String,

    #[serde(default)]
    #[validate(
        email(message = "Please enter a valid email address"),
        length(max = 120, message = "Email must be at most 120 characters")
    )]
    pub email: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    #[validate(length(max = 50, message = "First name must be at most 50 characters"))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 50, message = "Last name must be at most 50 characters"))]
    pub last_name: String,

    #[validate(length(max = 20, message = "Phone must be at most 20 characters"))]
    pub phone: Option<String>,
}

impl RegisterUserRequest {
    /// Trim every field except the password.
    pub fn normalized(self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            phone: non_blank(self.phone),
        }
    }

    pub fn check(&self) -> Result<(), String> {
        let required = [
            &self.username,
            &self.email,
            &self.password,
            &self.first_name,
            &self.last_name,
        ];
        if required.iter().any(|value| value.is_empty()) {
            return Err("Please fill in all required fields.".to_string());
        }

        self.validate()
            .map_err(|errors| first_validation_message(&errors, REGISTER_FIELD_ORDER))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}
