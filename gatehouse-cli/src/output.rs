//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use gatehouse_core::{OperationResult, UserProfile};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Print an operation outcome; a failed outcome exits with status 1
pub fn report(result: &OperationResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else if result.success {
        success(&result.message);
    } else {
        error(&result.message);
    }

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

/// Render a profile as a two-column table
pub fn profile_table(profile: &UserProfile) -> Table {
    let mut table = create_table();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["ID".to_string(), profile.id.to_string()]);
    table.add_row(vec!["Username".to_string(), profile.username.clone()]);
    table.add_row(vec!["Email".to_string(), profile.email.clone()]);
    table.add_row(vec![
        "Name".to_string(),
        format!("{} {}", profile.name, profile.surname),
    ]);
    table.add_row(vec!["Role".to_string(), profile.user_type.to_string()]);
    table.add_row(vec![
        "Status".to_string(),
        if profile.active { "active" } else { "disabled" }.to_string(),
    ]);
    table.add_row(vec![
        "Created".to_string(),
        profile.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    ]);
    table
}
