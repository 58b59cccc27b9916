//! Settings for the console front end
//!
//! Values come from `<config dir>/bookings-cli/config.toml`, overridden by
//! environment variables (a `.env` file is loaded by `main` first).

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::api::constants::DEFAULT_V1_SERVICE_ROOT;

/// Environment variables and the legacy names the samples used
const ENV_TENANT_ID: [&str; 2] = ["BOOKINGS_TENANT_ID", "Bookings_TenantID"];
const ENV_CLIENT_ID: [&str; 2] = ["BOOKINGS_CLIENT_ID", "Bookings_ClientID"];
const ENV_USERNAME: [&str; 2] = ["BOOKINGS_USERNAME", "Bookings_Username"];
const ENV_PASSWORD: [&str; 2] = ["BOOKINGS_PASSWORD", "Bookings_Password"];
const ENV_SERVICE_ROOT: [&str; 1] = ["BOOKINGS_SERVICE_ROOT"];
const ENV_PROXY: [&str; 1] = ["BOOKINGS_PROXY"];
const ENV_MAX_PAGE_SIZE: [&str; 1] = ["BOOKINGS_MAX_PAGE_SIZE"];
const ENV_SCOPES: [&str; 1] = ["BOOKINGS_SCOPES"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub service_root: Option<String>,
    pub proxy: Option<String>,
    pub max_page_size: Option<u32>,
    pub scopes: Option<Vec<String>>,
}

impl Settings {
    /// Load the config file (if any) and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut settings = match config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        settings.apply_env(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Override values with whatever `lookup` finds
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let first = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(name))
                .find(|value| !value.trim().is_empty())
        };

        if let Some(v) = first(&ENV_TENANT_ID) {
            self.tenant_id = Some(v);
        }
        if let Some(v) = first(&ENV_CLIENT_ID) {
            self.client_id = Some(v);
        }
        if let Some(v) = first(&ENV_USERNAME) {
            self.username = Some(v);
        }
        if let Some(v) = first(&ENV_PASSWORD) {
            self.password = Some(v);
        }
        if let Some(v) = first(&ENV_SERVICE_ROOT) {
            self.service_root = Some(v);
        }
        if let Some(v) = first(&ENV_PROXY) {
            self.proxy = Some(v);
        }
        if let Some(v) = first(&ENV_MAX_PAGE_SIZE) {
            let size = v
                .trim()
                .parse()
                .with_context(|| format!("BOOKINGS_MAX_PAGE_SIZE is not a number: {v}"))?;
            self.max_page_size = Some(size);
        }
        if let Some(v) = first(&ENV_SCOPES) {
            self.scopes = Some(v.split_whitespace().map(str::to_string).collect());
        }
        Ok(())
    }

    pub fn require_tenant_id(&self) -> Result<&str> {
        require(&self.tenant_id, "tenant ID", "BOOKINGS_TENANT_ID", "tenant_id")
    }

    pub fn require_client_id(&self) -> Result<&str> {
        require(
            &self.client_id,
            "client application ID",
            "BOOKINGS_CLIENT_ID",
            "client_id",
        )
    }

    /// Service root, falling back to the public v1 endpoint
    pub fn service_root_url(&self) -> Result<Url> {
        let raw = self
            .service_root
            .as_deref()
            .unwrap_or(DEFAULT_V1_SERVICE_ROOT);
        Url::parse(raw).with_context(|| format!("Invalid service root: {raw}"))
    }

    pub fn proxy_url(&self) -> Result<Option<Url>> {
        self.proxy
            .as_deref()
            .map(|raw| Url::parse(raw).with_context(|| format!("Invalid proxy URL: {raw}")))
            .transpose()
    }
}

fn require<'a>(
    value: &'a Option<String>,
    what: &str,
    env_name: &str,
    key: &str,
) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => {
            let location = config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "the config file".to_string());
            bail!("No {what} configured. Set {env_name} or `{key}` in {location}")
        }
    }
}

/// `<config dir>/bookings-cli/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("bookings-cli").join("config.toml"))
}
