//! Config command - view and change settings.json

use anyhow::{Context, Result};
use clap::Subcommand;
use gatehouse_core::config::{Config, SESSION_LIFETIME_ENV};
use serde_json::json;

use super::get_data_dir;
use crate::output;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change settings and write them to settings.json
    Set {
        /// Session lifetime in minutes
        #[arg(long)]
        session_lifetime: Option<i64>,
        /// Minimum password length in characters
        #[arg(long)]
        min_password_length: Option<usize>,
    },
}

pub fn run(command: ConfigCommands) -> Result<()> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create gatehouse directory: {:?}", data_dir))?;
    let mut config = Config::load(&data_dir).context("Failed to load settings")?;

    match command {
        ConfigCommands::Show { json } => show(&config, json),
        ConfigCommands::Set { session_lifetime, min_password_length } => {
            if session_lifetime.is_none() && min_password_length.is_none() {
                anyhow::bail!("Nothing to change; pass --session-lifetime or --min-password-length");
            }
            if let Some(minutes) = session_lifetime {
                config.set_session_lifetime_minutes(minutes)?;
            }
            if let Some(length) = min_password_length {
                config.set_min_password_length(length)?;
            }
            config.save(&data_dir).context("Failed to save settings")?;
            output::success("Settings saved");
            if session_lifetime.is_some() && std::env::var(SESSION_LIFETIME_ENV).is_ok() {
                output::warning(&format!(
                    "{} is set and overrides the saved session lifetime",
                    SESSION_LIFETIME_ENV
                ));
            }
            Ok(())
        }
    }
}

fn show(config: &Config, json: bool) -> Result<()> {
    let argon2 = config.auth.argon2;
    let lifetime_source = if config.session_lifetime_from_env() {
        SESSION_LIFETIME_ENV
    } else {
        "settings.json"
    };

    if json {
        let value = json!({
            "sessionLifetimeMinutes": config.auth.session_lifetime.num_minutes(),
            "sessionLifetimeSource": lifetime_source,
            "minPasswordLength": config.auth.password_policy.min_length,
            "argon2": argon2,
            "databaseFilename": config.db_filename,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Setting", "Value"]);
    table.add_row(vec![
        "Session lifetime".to_string(),
        format!(
            "{} min ({})",
            config.auth.session_lifetime.num_minutes(),
            lifetime_source
        ),
    ]);
    table.add_row(vec![
        "Min password length".to_string(),
        config.auth.password_policy.min_length.to_string(),
    ]);
    table.add_row(vec![
        "Argon2 (memory KiB / iterations / lanes)".to_string(),
        format!("{} / {} / {}", argon2.memory_cost, argon2.time_cost, argon2.parallelism),
    ]);
    table.add_row(vec!["Database file".to_string(), config.db_filename.clone()]);
    println!("{}", table);
    Ok(())
}
