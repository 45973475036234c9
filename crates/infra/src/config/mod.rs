//! Engine configuration
//!
//! Loads configuration from a TOML file with environment-variable overrides
//! layered on top. Secrets (client ids/secrets) normally arrive through the
//! environment; the file carries endpoints and behavior flags.
//!
//! ## Environment Variables
//! - `MERIDIAN_DRY_RUN`: run against payer sandboxes with placeholder
//!   tolerance (true/false)
//! - `MERIDIAN_DISCOVERY_CALLBACK_URL`: inbound callback URL for coverage
//!   discovery
//! - `MERIDIAN_AVAILITY_BASE_URL`, `MERIDIAN_AVAILITY_TOKEN_URL`,
//!   `MERIDIAN_AVAILITY_CLIENT_ID`, `MERIDIAN_AVAILITY_CLIENT_SECRET`
//! - `MERIDIAN_OPTUM_BASE_URL`, `MERIDIAN_OPTUM_TOKEN_URL`,
//!   `MERIDIAN_OPTUM_CLIENT_ID`, `MERIDIAN_OPTUM_CLIENT_SECRET`,
//!   `MERIDIAN_OPTUM_TRADING_PARTNER_ID`, `MERIDIAN_OPTUM_TENANT_ID`
//!
//! ## File Locations
//! `./meridian.toml`, then `./config.toml`.

use std::path::Path;

use meridian_domain::{EngineError, Result};
use serde::Deserialize;
use tracing::{debug, info};

/// Availity gateway configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AvailityConfig {
    pub base_url: String,
    pub service_reviews_base_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Default for AvailityConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.availity.com/availity/development-partner/v1".into(),
            service_reviews_base_url: "https://api.availity.com/availity/development-partner/v2"
                .into(),
            token_url: "https://api.availity.com/availity/v1/token".into(),
            client_id: String::new(),
            client_secret: String::new(),
        }
    }
}

/// Optum gateway configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OptumConfig {
    pub base_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub trading_partner_service_id: Option<String>,
    pub tenant_id: Option<String>,
    pub correlation_prefix: String,
}

impl Default for OptumConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sandbox-apigw.optum.com".into(),
            token_url: "https://sandbox-apigw.optum.com/oauth/token".into(),
            client_id: String::new(),
            client_secret: String::new(),
            trading_partner_service_id: None,
            tenant_id: None,
            correlation_prefix: "MRD".into(),
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub dry_run: bool,
    pub discovery_callback_url: Option<String>,
    pub availity: AvailityConfig,
    pub optum: OptumConfig,
}

/// Load configuration: file (when present) with environment overrides.
pub fn load() -> Result<EngineConfig> {
    let mut config = probe_config_file()?.unwrap_or_default();
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    info!(dry_run = config.dry_run, "engine configuration loaded");
    Ok(config)
}

/// Load configuration from a specific TOML file, no environment overlay.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|err| {
        EngineError::Config(format!("cannot read config file {}: {err}", path.display()))
    })?;
    toml::from_str(&raw).map_err(|err| {
        EngineError::Config(format!("invalid config file {}: {err}", path.display()))
    })
}

fn probe_config_file() -> Result<Option<EngineConfig>> {
    for candidate in ["meridian.toml", "config.toml"] {
        let path = Path::new(candidate);
        if path.exists() {
            debug!(path = candidate, "loading configuration file");
            return load_from_file(path).map(Some);
        }
    }
    Ok(None)
}

/// Overlay values from a key lookup (the environment in production).
fn apply_overrides<F>(config: &mut EngineConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("MERIDIAN_DRY_RUN") {
        config.dry_run = matches!(value.to_lowercase().as_str(), "1" | "true" | "yes");
    }
    if let Some(value) = lookup("MERIDIAN_DISCOVERY_CALLBACK_URL") {
        config.discovery_callback_url = Some(value);
    }

    for (key, target) in [
        ("MERIDIAN_AVAILITY_BASE_URL", &mut config.availity.base_url as &mut String),
        ("MERIDIAN_AVAILITY_TOKEN_URL", &mut config.availity.token_url),
        ("MERIDIAN_AVAILITY_CLIENT_ID", &mut config.availity.client_id),
        ("MERIDIAN_AVAILITY_CLIENT_SECRET", &mut config.availity.client_secret),
        ("MERIDIAN_OPTUM_BASE_URL", &mut config.optum.base_url),
        ("MERIDIAN_OPTUM_TOKEN_URL", &mut config.optum.token_url),
        ("MERIDIAN_OPTUM_CLIENT_ID", &mut config.optum.client_id),
        ("MERIDIAN_OPTUM_CLIENT_SECRET", &mut config.optum.client_secret),
    ] {
        if let Some(value) = lookup(key) {
            *target = value;
        }
    }

    if let Some(value) = lookup("MERIDIAN_OPTUM_TRADING_PARTNER_ID") {
        config.optum.trading_partner_service_id = Some(value);
    }
    if let Some(value) = lookup("MERIDIAN_OPTUM_TENANT_ID") {
        config.optum.tenant_id = Some(value);
    }
}
