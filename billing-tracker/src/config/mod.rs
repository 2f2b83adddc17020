use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct BillingTrackerConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub store: StoreConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub mongodb: Option<MongoConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongo,
    Memory,
}

pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24 * 7;
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@billingtracker.local";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// HS256 bearer-token settings. Without a secret every request runs as a
/// trusted administrator.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub token_ttl_hours: i64,
    /// Account created at startup when no user exists yet.
    pub default_admin: DefaultAdmin,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DefaultAdmin {
    pub email: String,
    pub password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            default_admin: DefaultAdmin {
                email: DEFAULT_ADMIN_EMAIL.to_string(),
                password: DEFAULT_ADMIN_PASSWORD.to_string(),
            },
        }
    }
}

impl BillingTrackerConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let backend: StoreBackend = get_env("STORE_BACKEND", Some("mongo"), is_prod)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let mongodb = match backend {
            StoreBackend::Mongo => Some(MongoConfig {
                uri: get_env("MONGODB_URI", None, is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("billing-tracker"), is_prod)?,
            }),
            StoreBackend::Memory => None,
        };

        Ok(BillingTrackerConfig {
            common: common_config,
            service_name: get_env("SERVICE_NAME", Some("billing-tracker"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: optional_env("OTLP_ENDPOINT", is_prod)?,
            store: StoreConfig { backend, mongodb },
            auth: AuthConfig {
                jwt_secret: optional_env("AUTH_JWT_SECRET", is_prod)?,
                token_ttl_hours: get_env(
                    "AUTH_TOKEN_TTL_HOURS",
                    Some(&DEFAULT_TOKEN_TTL_HOURS.to_string()),
                    is_prod,
                )?
                .parse()
                .ok()
                .filter(|hours| *hours > 0)
                .ok_or_else(|| {
                    AppError::ConfigError(anyhow::anyhow!(
                        "AUTH_TOKEN_TTL_HOURS must be a positive number of hours"
                    ))
                })?,
                default_admin: DefaultAdmin {
                    email: get_env("DEFAULT_ADMIN_EMAIL", Some(DEFAULT_ADMIN_EMAIL), is_prod)?,
                    password: get_env(
                        "DEFAULT_ADMIN_PASSWORD",
                        Some(DEFAULT_ADMIN_PASSWORD),
                        is_prod,
                    )?,
                },
            },
        })
    }

    /// In-memory configuration with auth disabled, bound to `port`.
    pub fn in_memory(port: u16) -> Self {
        BillingTrackerConfig {
            common: core_config::Config { port },
            service_name: "billing-tracker".to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            store: StoreConfig {
                backend: StoreBackend::Memory,
                mongodb: None,
            },
            auth: AuthConfig::default(),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

/// Optional outside production; empty values count as unset.
fn optional_env(key: &str, is_prod: bool) -> Result<Option<String>, AppError> {
    match env::var(key) {
        Ok(val) if !val.trim().is_empty() => Ok(Some(val)),
        _ if is_prod => Err(AppError::ConfigError(anyhow::anyhow!(
            "{} is required in production but not set",
            key
        ))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_backend_parses_case_insensitively() {
        assert_eq!("Memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert_eq!("mongo".parse::<StoreBackend>(), Ok(StoreBackend::Mongo));
        assert!("redis".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn in_memory_config_disables_auth() {
        let config = BillingTrackerConfig::in_memory(0);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(config.auth.jwt_secret.is_none());
        assert_eq!(config.auth.token_ttl_hours, DEFAULT_TOKEN_TTL_HOURS);
        assert_eq!(config.auth.default_admin.email, DEFAULT_ADMIN_EMAIL);
        assert_eq!(config.common.port, 0);
    }
}
