use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error),
        }
    }

    /// Attach a pending flash message. Error flashes land in `error`,
    /// everything else in `message`; the page data itself is kept.
    pub fn with_flash(mut self, flash: Option<FlashMessage>) -> Self {
        if let Some(flash) = flash {
            match flash.level {
                FlashLevel::Error => self.error = Some(flash.message),
                FlashLevel::Success | FlashLevel::Info => self.message = Some(flash.message),
            }
        }
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

impl FlashMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }
}

/// Identity of the caller, resolved once per request from the session
/// cookie and handed explicitly to every ownership-checked operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: i64,
}

impl RequestContext {
    pub fn new(user_id: i64) -> Self {
        Self { user_id }
    }
}

/// Server-side creation timestamp. Truncated to microseconds so a record
/// read back from storage compares equal to the one that was written.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Pick the message of the first failing field, walking `order` so the
/// reported field does not depend on hash map iteration order.
pub fn first_validation_message(errors: &ValidationErrors, order: &[&str]) -> String {
    let field_errors = errors.field_errors();
    for field in order {
        if let Some(error) = field_errors.get(*field).and_then(|errs| errs.first()) {
            return error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{} is invalid", capitalize(field)));
        }
    }
    "Please fill in all required fields.".to_string()
}

pub fn capitalize(field: &str) -> String {
    let words: Vec<String> = field
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    words.join(" ")
}

/// Trim an optional form value, mapping blank input to `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_routes_to_error_field() {
        let response = ApiResponse::success(1).with_flash(Some(FlashMessage::error("Nope")));
        assert!(response.success);
        assert_eq!(response.error.as_deref(), Some("Nope"));
        assert!(response.message.is_none());
    }

    #[test]
    fn test_flash_routes_to_message_field() {
        let response = ApiResponse::success(1).with_flash(Some(FlashMessage::success("Saved")));
        assert_eq!(response.message.as_deref(), Some("Saved"));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("date_lost_found"), "Date Lost Found");
        assert_eq!(capitalize("title"), "Title");
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  x ".to_string())), Some("x".to_string()));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_timestamp_has_microsecond_precision() {
        let ts = timestamp_now();
        assert_eq!(ts.timestamp_subsec_nanos() % 1_000, 0);
    }
}
