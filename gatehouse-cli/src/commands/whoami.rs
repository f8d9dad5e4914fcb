//! Whoami command - show the logged-in user

use anyhow::Result;
use serde_json::json;

use super::{get_context, get_session_store};
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let session = get_session_store()?;

    let profile = ctx.user_service.current_user(&session)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "authenticated": profile.is_some(),
                "user": profile,
            }))?
        );
        return Ok(());
    }

    match profile {
        Some(profile) => println!("{}", output::profile_table(&profile)),
        None => {
            output::warning("Not logged in");
            std::process::exit(1);
        }
    }
    Ok(())
}
