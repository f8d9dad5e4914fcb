//! CLI command implementations

pub mod config;
pub mod doctor;
pub mod login;
pub mod logout;
pub mod passwd;
pub mod register;
pub mod user;
pub mod whoami;

use std::path::PathBuf;

use anyhow::{Context, Result};
use dialoguer::Password;
use gatehouse_core::adapters::FileSessionStore;
use gatehouse_core::GatehouseContext;

/// Environment variable overriding the data directory
const DATA_DIR_ENV: &str = "GATEHOUSE_DIR";

/// Environment variable supplying a password without a prompt
const PASSWORD_ENV: &str = "GATEHOUSE_PASSWORD";

/// Environment variable supplying the current password to `passwd`
pub const CURRENT_PASSWORD_ENV: &str = "GATEHOUSE_CURRENT_PASSWORD";

/// Get the gatehouse directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".gatehouse"))
}

/// Get or create gatehouse context
pub fn get_context() -> Result<GatehouseContext> {
    let data_dir = get_data_dir()?;

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create gatehouse directory: {:?}", data_dir))?;

    tracing::debug!(data_dir = %data_dir.display(), "opening gatehouse context");
    GatehouseContext::new(&data_dir).context("Failed to initialize gatehouse context")
}

/// Session file of this terminal user
pub fn get_session_store() -> Result<FileSessionStore> {
    Ok(FileSessionStore::new(get_data_dir()?.join("session.json")))
}

/// Get password from GATEHOUSE_PASSWORD or prompt
pub fn password_or_prompt(prompt: &str) -> Result<String> {
    password_from_env_or_prompt(PASSWORD_ENV, prompt)
}

/// Get password from the given environment variable or prompt
pub fn password_from_env_or_prompt(env: &str, prompt: &str) -> Result<String> {
    if let Ok(p) = std::env::var(env) {
        return Ok(p);
    }
    let p = Password::new().with_prompt(prompt).interact()?;
    Ok(p)
}

/// Prompt for a new password twice
///
/// The environment variable, when set, is taken as already confirmed.
pub fn new_password_with_confirm(prompt: &str) -> Result<String> {
    if let Ok(p) = std::env::var(PASSWORD_ENV) {
        return Ok(p);
    }
    let p = Password::new()
        .with_prompt(prompt)
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()?;
    Ok(p)
}
