use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::env;

/// Settings shared by every service.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_port() -> u16 {
    8080
}

fn default_environment() -> String {
    "dev".to_string()
}

impl Config {
    /// Layered load: `.env`, optional `configuration` file, then `APP__*`
    /// variables. `ENVIRONMENT` overrides `environment`.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .set_override_option("environment", env::var("ENVIRONMENT").ok())?
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "prod"
    }
}

/// Read `key`, falling back to `default` outside production.
///
/// In production a missing key is an error even when a default exists.
pub fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else {
                default.map(str::to_string).ok_or_else(|| {
                    AppError::ConfigError(anyhow::anyhow!("{} is not set", key))
                })
            }
        }
    }
}
