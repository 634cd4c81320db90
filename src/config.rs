use serde::{Deserialize, Serialize};
use std::env;

pub const DEV_SECRET_KEY: &str = "dev-secret-key-change-in-production";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub environment: Environment,
    pub database_url: String,
    pub server: ServerConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(skip_serializing)]
    pub secret_key: String,
    pub upload_folder: String,
    pub max_content_length: usize,
    pub session_ttl_hours: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source. Only production
    /// insists on an explicit `SECRET_KEY`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, env::VarError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = Environment::parse(&lookup("APP_ENV").unwrap_or_default());

        let secret_key = match (lookup("SECRET_KEY"), environment) {
            (Some(key), _) if !key.is_empty() => key,
            (_, Environment::Production) => return Err(env::VarError::NotPresent),
            _ => {
                log::warn!("SECRET_KEY not set; using the development key");
                DEV_SECRET_KEY.to_string()
            }
        };

        Ok(Config {
            environment,
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://lost_and_found.db".to_string()),

            server: ServerConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: lookup("PORT")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(5000),
            },

            app: AppConfig {
                secret_key,
                upload_folder: lookup("UPLOAD_FOLDER")
                    .unwrap_or_else(|| "static/uploads".to_string()),
                max_content_length: lookup("MAX_CONTENT_LENGTH")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(16 * 1024 * 1024),
                session_ttl_hours: lookup("SESSION_TTL_HOURS")
                    .and_then(|v| v.parse().ok())
                    .filter(|h| *h > 0)
                    .unwrap_or(168),
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
