//! Settings shared by every service: file and `APP__*` environment layers.

use crate::error::AppError;
use config::{Config as Cfg, Environment, File};
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    /// HTTP listen port; 0 picks a free port.
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl Config {
    /// Read `.env`, an optional `configuration.*` file, then `APP__*` variables.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_sources(
            File::with_name("configuration").required(false),
            Environment::with_prefix("APP").separator("__"),
        )
    }

    fn from_sources(
        file: File<config::FileSourceFile, config::FileFormat>,
        env: Environment,
    ) -> Result<Self, AppError> {
        let settings = Cfg::builder()
            .set_default("port", i64::from(DEFAULT_PORT))?
            .add_source(file)
            .add_source(env)
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_with(vars: &[(&str, &str)]) -> Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix("APP")
            .separator("__")
            .source(Some(source))
    }

    fn no_file() -> File<config::FileSourceFile, config::FileFormat> {
        File::with_name("does-not-exist").required(false)
    }

    #[test]
    fn port_defaults_when_unset() {
        let config = Config::from_sources(no_file(), env_with(&[])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn environment_overrides_port() {
        let config = Config::from_sources(no_file(), env_with(&[("APP__PORT", "9090")])).unwrap();
        assert_eq!(config.port, 9090);
    }
}
