//! # Configuration
//!
//! Settings come from three layers, later layers winning:
//! 1. `dizmen.toml` (missing file = defaults)
//! 2. `DIZMEN_*` environment variables
//! 3. CLI flags (applied by the `cli` module)
//!
//! ## Environment Variables
//!
//! - `DIZMEN_HOST`, `DIZMEN_PORT`
//! - `DIZMEN_RATE_LIMIT`: requests per second, 0 disables
//! - `DIZMEN_CORS_ORIGINS`: comma-separated origins, or "*"
//! - `DIZMEN_STORAGE`: `memory` or `redb`; `DIZMEN_DB_PATH`
//! - `DIZMEN_REVIEW_MODE`: `document_gated` or `immediate`
//! - `DIZMEN_TIMEZONE`: IANA zone used for menu availability
//! - `DIZMEN_RETRY_ATTEMPTS`
//! - `DIZMEN_JWT_SECRET`, `DIZMEN_JWT_ISSUER`, `DIZMEN_JWT_AUDIENCE`, `DIZMEN_TOKEN_TTL_SECS`

use chrono_tz::Tz;
use dizmen_core::{DizmenError, Platform, PlatformSettings, RetryPolicy, ReviewMode, Sleeper};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "dizmen.toml";

/// Shortest accepted HS256 signing secret, in bytes.
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Written by `dizmen init` when no configuration file exists.
pub const CONFIG_TEMPLATE: &str = r#"# Dizmen configuration

[server]
host = "127.0.0.1"
port = 8080
rate_limit = 100
cors_origins = []

[storage]
backend = "redb"
path = "dizmen.db"

[platform]
review_mode = "document_gated"
# timezone = "Europe/Istanbul"

[auth]
# jwt_secret = "at least 32 bytes of secret material"
issuer = "dizmen"
audience = "dizmen-clients"
token_ttl_secs = 86400
"#;

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub platform: PlatformConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
    /// Allowed CORS origins. Empty means localhost only; `["*"]` allows all.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            rate_limit: 100,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Storage backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Memory,
    #[default]
    Redb,
}

impl FromStr for StorageKind {
    type Err = DizmenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "redb" => Ok(Self::Redb),
            other => Err(DizmenError::ConfigError(format!(
                "unknown storage backend '{other}' (expected memory or redb)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageKind,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageKind::Redb,
            path: PathBuf::from("dizmen.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub review_mode: ReviewMode,
    /// IANA zone name. Unset means host local time.
    pub timezone: Option<String>,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub issuer: String,
    pub audience: String,
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            issuer: "dizmen".to_string(),
            audience: "dizmen-clients".to_string(),
            token_ttl_secs: 24 * 60 * 60,
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl Config {
    /// Read `path` (if it exists) and apply the process environment.
    pub fn load(path: &Path) -> Result<Self, DizmenError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path).map_err(|e| {
                DizmenError::IoError(format!("Cannot read {}: {}", path.display(), e))
            })?;
            Self::from_toml_str(&text)?
        } else {
            tracing::debug!("No configuration file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, DizmenError> {
        toml::from_str(text).map_err(|e| DizmenError::ConfigError(e.to_string()))
    }

    /// Apply `DIZMEN_*` overrides read through `get`.
    pub fn apply_env(
        &mut self,
        get: impl Fn(&str) -> Option<String>,
    ) -> Result<(), DizmenError> {
        if let Some(host) = get("DIZMEN_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("DIZMEN_PORT") {
            self.server.port = parse_number("DIZMEN_PORT", &port)?;
        }
        if let Some(limit) = get("DIZMEN_RATE_LIMIT") {
            self.server.rate_limit = parse_number("DIZMEN_RATE_LIMIT", &limit)?;
        }
        if let Some(origins) = get("DIZMEN_CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(backend) = get("DIZMEN_STORAGE") {
            self.storage.backend = backend.parse()?;
        }
        if let Some(path) = get("DIZMEN_DB_PATH") {
            self.storage.path = PathBuf::from(path);
        }
        if let Some(mode) = get("DIZMEN_REVIEW_MODE") {
            self.platform.review_mode = mode.parse()?;
        }
        if let Some(tz) = get("DIZMEN_TIMEZONE") {
            self.platform.timezone = Some(tz).filter(|t| !t.is_empty());
        }
        if let Some(attempts) = get("DIZMEN_RETRY_ATTEMPTS") {
            self.platform.retry.max_attempts = parse_number("DIZMEN_RETRY_ATTEMPTS", &attempts)?;
        }
        if let Some(secret) = get("DIZMEN_JWT_SECRET") {
            self.auth.jwt_secret = Some(secret).filter(|s| !s.is_empty());
        }
        if let Some(issuer) = get("DIZMEN_JWT_ISSUER") {
            self.auth.issuer = issuer;
        }
        if let Some(audience) = get("DIZMEN_JWT_AUDIENCE") {
            self.auth.audience = audience;
        }
        if let Some(ttl) = get("DIZMEN_TOKEN_TTL_SECS") {
            self.auth.token_ttl_secs = parse_number("DIZMEN_TOKEN_TTL_SECS", &ttl)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Derived values
    // -------------------------------------------------------------------------

    pub fn timezone(&self) -> Result<Option<Tz>, DizmenError> {
        self.platform
            .timezone
            .as_deref()
            .map(|name| {
                name.parse::<Tz>().map_err(|e| {
                    DizmenError::ConfigError(format!("invalid timezone '{name}': {e}"))
                })
            })
            .transpose()
    }

    pub fn platform_settings(&self) -> Result<PlatformSettings, DizmenError> {
        Ok(PlatformSettings {
            review_mode: self.platform.review_mode,
            retry: self.platform.retry,
            timezone: self.timezone()?,
        })
    }

    /// The signing secret; required and at least `MIN_JWT_SECRET_LENGTH` bytes.
    pub fn jwt_secret(&self) -> Result<&str, DizmenError> {
        match self.auth.jwt_secret.as_deref() {
            None => Err(DizmenError::ConfigError(
                "auth.jwt_secret (or DIZMEN_JWT_SECRET) must be set".to_string(),
            )),
            Some(secret) if secret.len() < MIN_JWT_SECRET_LENGTH => {
                Err(DizmenError::ConfigError(format!(
                    "auth.jwt_secret must be at least {MIN_JWT_SECRET_LENGTH} bytes"
                )))
            }
            Some(secret) => Ok(secret),
        }
    }

    /// Open the configured storage with the configured settings.
    pub fn open_platform(&self) -> Result<Platform, DizmenError> {
        let platform = match self.storage.backend {
            StorageKind::Memory => Platform::new(),
            StorageKind::Redb => Platform::with_redb(&self.storage.path)?,
        };
        Ok(platform
            .with_sleeper(Arc::new(RuntimeSleeper))
            .with_settings(self.platform_settings()?))
    }
}

/// Waits between storage retries without stalling a tokio worker.
///
/// On a multi-threaded runtime the worker's queued tasks move to another
/// thread for the duration of the wait. Anywhere else it is a thread sleep.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuntimeSleeper;

impl Sleeper for RuntimeSleeper {
    fn sleep(&self, duration: Duration) {
        let multi_thread = Handle::try_current()
            .is_ok_and(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread);
        if multi_thread {
            tokio::task::block_in_place(|| std::thread::sleep(duration));
        } else {
            std::thread::sleep(duration);
        }
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, DizmenError> {
    value
        .trim()
        .parse()
        .map_err(|_| DizmenError::ConfigError(format!("{key}: '{value}' is not a valid number")))
}

// =============================================================================
// TESTS
// =============================================================================
