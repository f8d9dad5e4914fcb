//! Logout command - end the current session

use anyhow::Result;
use gatehouse_core::OperationResult;

use super::{get_context, get_session_store};
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let session = get_session_store()?;

    let result = if ctx.user_service.destroy_session(&session)? {
        OperationResult::ok("Logged out")
    } else {
        OperationResult::fail("Failed to end the session")
    };
    output::report(&result, json)
}
