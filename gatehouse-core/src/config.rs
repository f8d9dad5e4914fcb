//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "auth": { "sessionLifetimeMinutes": 120, "minPasswordLength": 8,
//!             "argon2": { "memoryCost": 19456, "timeCost": 2, "parallelism": 1 } },
//!   "database": { "filename": "gatehouse.duckdb" }
//! }
//! ```
//! Unknown keys are preserved when the file is saved back.

use std::collections::HashMap;
use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{Argon2Params, PasswordPolicy};

/// Default session lifetime in minutes
pub const DEFAULT_SESSION_LIFETIME_MINUTES: i64 = 120;

/// Default database file name
pub const DEFAULT_DB_FILENAME: &str = "gatehouse.duckdb";

/// Environment variable overriding the session lifetime (minutes)
pub const SESSION_LIFETIME_ENV: &str = "GATEHOUSE_SESSION_LIFETIME";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    auth: AuthSettings,
    #[serde(default)]
    database: DatabaseSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_lifetime_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_password_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    argon2: Option<Argon2Params>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatabaseSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Settings consumed by the user service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub session_lifetime: Duration,
    pub password_policy: PasswordPolicy,
    pub argon2: Argon2Params,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_lifetime: Duration::minutes(DEFAULT_SESSION_LIFETIME_MINUTES),
            password_policy: PasswordPolicy::default(),
            argon2: Argon2Params::default(),
        }
    }
}

fn session_lifetime(minutes: i64) -> Result<Duration> {
    if minutes <= 0 {
        return Err(Error::Config("Session lifetime must be positive".to_string()));
    }
    Duration::try_minutes(minutes)
        .ok_or_else(|| Error::Config(format!("Session lifetime of {} minutes is out of range", minutes)))
}

fn password_policy(min_length: usize) -> Result<PasswordPolicy> {
    if min_length == 0 {
        return Err(Error::Config("minPasswordLength must be at least 1".to_string()));
    }
    Ok(PasswordPolicy::new(min_length))
}

/// Gatehouse configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub auth: AuthConfig,
    pub db_filename: String,
    /// Lifetime came from the environment and is not written back
    lifetime_from_env: bool,
    // Keep the raw settings for preservation when saving
    raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth: AuthConfig::default(),
            db_filename: DEFAULT_DB_FILENAME.to_string(),
            lifetime_from_env: false,
            raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// A missing settings file yields defaults; a malformed one is an error.
    /// `GATEHOUSE_SESSION_LIFETIME` overrides the session lifetime.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).map_err(|e| {
                Error::Config(format!("Invalid {}: {}", settings_path.display(), e))
            })?
        } else {
            SettingsFile::default()
        };

        let env_lifetime = std::env::var(SESSION_LIFETIME_ENV).ok();
        let lifetime_from_env = env_lifetime.is_some();
        let lifetime_minutes = match env_lifetime {
            Some(value) => value.trim().parse::<i64>().map_err(|_| {
                Error::Config(format!("{} must be a number of minutes", SESSION_LIFETIME_ENV))
            })?,
            None => raw
                .auth
                .session_lifetime_minutes
                .unwrap_or(DEFAULT_SESSION_LIFETIME_MINUTES),
        };

        let min_password_length = raw
            .auth
            .min_password_length
            .unwrap_or(PasswordPolicy::default().min_length);

        let argon2 = raw.auth.argon2.unwrap_or_default();
        argon2.validate().map_err(Error::Config)?;

        Ok(Self {
            auth: AuthConfig {
                session_lifetime: session_lifetime(lifetime_minutes)?,
                password_policy: password_policy(min_password_length)?,
                argon2,
            },
            db_filename: raw
                .database
                .filename
                .clone()
                .unwrap_or_else(|| DEFAULT_DB_FILENAME.to_string()),
            lifetime_from_env,
            raw_settings: raw,
        })
    }

    /// Change the session lifetime; takes precedence over the environment on save
    pub fn set_session_lifetime_minutes(&mut self, minutes: i64) -> Result<()> {
        self.auth.session_lifetime = session_lifetime(minutes)?;
        self.lifetime_from_env = false;
        Ok(())
    }

    pub fn set_min_password_length(&mut self, min_length: usize) -> Result<()> {
        self.auth.password_policy = password_policy(min_length)?;
        Ok(())
    }

    /// Whether the session lifetime is currently set by `GATEHOUSE_SESSION_LIFETIME`
    pub fn session_lifetime_from_env(&self) -> bool {
        self.lifetime_from_env
    }

    /// Save config to the data directory
    /// Preserves settings this crate doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join("settings.json");

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            self.raw_settings.clone()
        };

        if !self.lifetime_from_env {
            settings.auth.session_lifetime_minutes = Some(self.auth.session_lifetime.num_minutes());
        }
        settings.auth.min_password_length = Some(self.auth.password_policy.min_length);
        settings.auth.argon2 = Some(self.auth.argon2);
        settings.database.filename = Some(self.db_filename.clone());

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}
