//! Register command - create a user account

use anyhow::Result;
use dialoguer::Input;
use gatehouse_core::{NewUser, UserType};

use super::{get_context, get_session_store, new_password_with_confirm};
use crate::output;

/// Registration fields given on the command line; missing ones are prompted
pub struct RegisterArgs {
    pub username: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub user_type: Option<String>,
}

fn value_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?),
    }
}

pub fn run(args: RegisterArgs, json: bool) -> Result<()> {
    let ctx = get_context()?;

    let username = value_or_prompt(args.username, "Username")?;
    let email = value_or_prompt(args.email, "Email")?;
    let name = value_or_prompt(args.name, "First name")?;
    let surname = value_or_prompt(args.surname, "Last name")?;
    let password = new_password_with_confirm("Password")?;

    let mut new_user = NewUser::new(username, email, password, name, surname);
    if let Some(user_type) = args.user_type {
        new_user = new_user.with_user_type(user_type);
    }

    // An admin session may assign any role; otherwise registration is open
    let session = get_session_store()?;
    let is_admin = ctx
        .user_service
        .current_user(&session)?
        .is_some_and(|me| me.user_type == UserType::Admin);
    let result = if is_admin {
        ctx.user_service.create_user_as_admin(&session, &new_user)?
    } else {
        ctx.user_service.create_user(&new_user)?
    };
    output::report(&result, json)
}
