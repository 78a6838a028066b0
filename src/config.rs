//! Runtime configuration from environment variables

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::{debug, info};

use crate::upload::DEFAULT_MAX_UPLOAD_MB;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@notes.com";
pub const DEFAULT_UPLOAD_FOLDER: &str = "notes";
pub const DEFAULT_HIT_WINDOW_SECS: u64 = 30 * 60;
/// Largest accepted `NOTESHARE_MAX_UPLOAD_MB`
pub const MAX_UPLOAD_MB_LIMIT: u64 = 1024;

/// Credentials for the hosted file store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub upload_preset: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `.noteshare/notes.db`; current directory if unset
    pub root: Option<String>,
    pub in_memory: bool,
    pub port: u16,
    /// Admin bearer token; admin routes are closed without one
    pub admin_token: Option<String>,
    pub admin_emails: Vec<String>,
    pub max_upload_mb: u64,
    pub hit_window: Duration,
    pub cloudinary: Option<CloudinaryConfig>,
    pub upload_folder: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: None,
            in_memory: false,
            port: DEFAULT_PORT,
            admin_token: None,
            admin_emails: vec![DEFAULT_ADMIN_EMAIL.to_string()],
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            hit_window: Duration::from_secs(DEFAULT_HIT_WINDOW_SECS),
            cloudinary: None,
            upload_folder: DEFAULT_UPLOAD_FOLDER.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Config::default();

        let admin_emails = match var("NOTESHARE_ADMIN_EMAILS") {
            Some(list) => list
                .split(',')
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
            None => defaults.admin_emails,
        };

        let cloudinary = match (var("CLOUDINARY_CLOUD_NAME"), var("CLOUDINARY_UPLOAD_PRESET")) {
            (Some(cloud_name), Some(upload_preset)) => Some(CloudinaryConfig {
                cloud_name,
                upload_preset,
            }),
            (None, None) => None,
            _ => {
                return Err(anyhow!(
                    "CLOUDINARY_CLOUD_NAME and CLOUDINARY_UPLOAD_PRESET must be set together"
                ))
            }
        };

        let config = Config {
            root: var("NOTESHARE_ROOT"),
            in_memory: var("NOTESHARE_IN_MEMORY").is_some_and(|v| v == "1" || v == "true"),
            port: parse_or(&var, "NOTESHARE_PORT", defaults.port)?,
            admin_token: var("NOTESHARE_ADMIN_TOKEN"),
            admin_emails,
            max_upload_mb: parse_or(&var, "NOTESHARE_MAX_UPLOAD_MB", defaults.max_upload_mb)?,
            hit_window: Duration::from_secs(parse_or(
                &var,
                "NOTESHARE_HIT_WINDOW_SECS",
                DEFAULT_HIT_WINDOW_SECS,
            )?),
            cloudinary,
            upload_folder: var("CLOUDINARY_FOLDER").unwrap_or(defaults.upload_folder),
        };

        if config.max_upload_mb == 0 || config.max_upload_mb > MAX_UPLOAD_MB_LIMIT {
            return Err(anyhow!(
                "NOTESHARE_MAX_UPLOAD_MB must be between 1 and {}, got {}",
                MAX_UPLOAD_MB_LIMIT,
                config.max_upload_mb
            ));
        }
        if config.admin_token.is_none() {
            info!("NOTESHARE_ADMIN_TOKEN not set, admin routes are disabled");
        }
        if config.cloudinary.is_none() {
            info!("Cloudinary not configured, uploads are disabled");
        }
        Ok(config)
    }

    /// Request body limit: the upload limit plus 1 MiB for form fields
    pub fn body_limit_bytes(&self) -> usize {
        let bytes = self.max_upload_mb.saturating_add(1).saturating_mul(1024 * 1024);
        usize::try_from(bytes).unwrap_or(usize::MAX)
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow!("Invalid {} value '{}': {}", key, raw, e)),
        None => {
            debug!("{} not set, using default", key);
            Ok(default)
        }
    }
}
