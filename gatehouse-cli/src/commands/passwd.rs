//! Passwd command - change the password of the logged-in user

use anyhow::Result;
use gatehouse_core::OperationResult;

use super::{
    get_context, get_session_store, new_password_with_confirm, password_from_env_or_prompt,
    CURRENT_PASSWORD_ENV,
};
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let session = get_session_store()?;

    let Some(me) = ctx.user_service.current_user(&session)? else {
        return output::report(&OperationResult::fail("Not logged in"), json);
    };

    let current = password_from_env_or_prompt(CURRENT_PASSWORD_ENV, "Current password")?;
    let new = new_password_with_confirm("New password")?;

    let result = ctx.user_service.update_password(me.id, &current, &new)?;
    output::report(&result, json)
}
