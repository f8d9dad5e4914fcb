//! User command - account administration for admins

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use gatehouse_core::{GatehouseContext, OperationResult, UserProfile, UserType};
use uuid::Uuid;

use super::{get_context, get_session_store};
use crate::output;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Re-enable a disabled account
    Enable {
        /// User ID, email or username
        user: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Disable an account; its sessions stop validating
    Disable {
        /// User ID, email or username
        user: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show an account
    Show {
        /// User ID, email or username
        user: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: UserCommands) -> Result<()> {
    let ctx = get_context()?;

    let json = match &command {
        UserCommands::Enable { json, .. }
        | UserCommands::Disable { json, .. }
        | UserCommands::Show { json, .. } => *json,
    };
    if let Some(denied) = require_admin(&ctx)? {
        return output::report(&denied, json);
    }

    match command {
        UserCommands::Enable { user, json } => set_active(&ctx, &user, true, json),
        UserCommands::Disable { user, json } => set_active(&ctx, &user, false, json),
        UserCommands::Show { user, json } => show(&ctx, &user, json),
    }
}

/// The failure to report when the session is not an admin's
fn require_admin(ctx: &GatehouseContext) -> Result<Option<OperationResult>> {
    let session = get_session_store()?;
    let Some(me) = ctx.user_service.current_user(&session)? else {
        return Ok(Some(OperationResult::fail("Not logged in")));
    };
    if !ctx.user_service.has_role(me.id, &[UserType::Admin])? {
        return Ok(Some(OperationResult::fail("Administrator access required")));
    }
    Ok(None)
}

fn resolve(ctx: &GatehouseContext, user: &str) -> Result<Option<UserProfile>> {
    if let Ok(id) = Uuid::parse_str(user) {
        return ctx
            .user_service
            .get_user_profile(id)
            .context("Failed to load user");
    }
    ctx.user_service.find_user(user).context("Failed to look up user")
}

fn set_active(ctx: &GatehouseContext, user: &str, active: bool, json: bool) -> Result<()> {
    let Some(profile) = resolve(ctx, user)? else {
        return output::report(&OperationResult::fail("User not found"), json);
    };
    let result = ctx.user_service.set_user_active(profile.id, active)?;
    output::report(&result, json)
}

fn show(ctx: &GatehouseContext, user: &str, json: bool) -> Result<()> {
    let Some(profile) = resolve(ctx, user)? else {
        return output::report(&OperationResult::fail("User not found"), json);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    println!("{}", profile.username.bold());
    println!("{}", output::profile_table(&profile));
    Ok(())
}
