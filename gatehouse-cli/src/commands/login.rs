//! Login command - authenticate and start a session

use anyhow::Result;
use dialoguer::Input;

use super::{get_context, get_session_store, password_or_prompt};
use crate::output;

pub fn run(identifier: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let session = get_session_store()?;

    let identifier = match identifier {
        Some(id) => id,
        None => Input::new()
            .with_prompt("Email or username")
            .interact_text()?,
    };
    let password = password_or_prompt("Password")?;

    let result = ctx
        .user_service
        .authenticate(&session, &identifier, &password)?;
    output::report(&result, json)
}
