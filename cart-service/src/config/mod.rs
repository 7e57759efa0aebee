use rust_decimal::Decimal;
use secrecy::Secret;
use serde::Deserialize;
use service_core::config::{self as core_config, get_env};
use service_core::error::AppError;
use std::str::FromStr;

const DEFAULT_DISPLAY_TAX_RATE: &str = "0.15";

#[derive(Debug, Clone, Deserialize)]
pub struct CartConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub store: StoreConfig,
    pub cart: CartSettings,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: Secret<String>,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CartSettings {
    /// Display-only tax applied by the cart summary.
    pub display_tax_rate: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CartConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common = core_config::Config::load()?;
        let is_prod = common.is_production();

        let backend: StoreBackend = get_env("CART_STORE_BACKEND", Some("mongo"), is_prod)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;
        if is_prod && backend == StoreBackend::Memory {
            tracing::warn!("In-memory store selected in production; invoices are lost on restart");
        }

        let display_tax_rate = parse_tax_rate(&get_env(
            "CART_DISPLAY_TAX_RATE",
            Some(DEFAULT_DISPLAY_TAX_RATE),
            false,
        )?)?;

        let allowed_origins = get_env("CORS_ALLOWED_ORIGINS", Some("http://localhost:3000"), false)?
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(CartConfig {
            common,
            mongodb: MongoConfig {
                uri: Secret::new(get_env(
                    "MONGODB_URI",
                    Some("mongodb://localhost:27017"),
                    is_prod && backend == StoreBackend::Mongo,
                )?),
                database: get_env("MONGODB_DATABASE", Some("storefront"), false)?,
            },
            store: StoreConfig { backend },
            cart: CartSettings { display_tax_rate },
            cors: CorsConfig { allowed_origins },
        })
    }
}

fn parse_tax_rate(raw: &str) -> Result<Decimal, AppError> {
    let rate = Decimal::from_str(raw.trim()).map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("Invalid CART_DISPLAY_TAX_RATE {}: {}", raw, e))
    })?;
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(AppError::ConfigError(anyhow::anyhow!(
            "CART_DISPLAY_TAX_RATE must be between 0 and 1, got {}",
            rate
        )));
    }
    Ok(rate)
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_backend_parses_case_insensitively() {
        assert_eq!("Mongo".parse::<StoreBackend>(), Ok(StoreBackend::Mongo));
        assert_eq!("memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert!("redis".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn tax_rate_must_be_a_fraction() {
        assert_eq!(parse_tax_rate("0.15").unwrap(), Decimal::new(15, 2));
        assert!(parse_tax_rate("15").is_err());
        assert!(parse_tax_rate("-0.1").is_err());
        assert!(parse_tax_rate("abc").is_err());
    }
}
