//! Gatehouse CLI - user accounts and sessions from the terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod output;

use commands::{config, doctor, login, logout, passwd, register, user, whoami};

/// Environment variable holding the log filter
const LOG_ENV: &str = "GATEHOUSE_LOG";

/// Gatehouse - user registration, login and sessions
#[derive(Parser)]
#[command(name = "gatehouse", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new user account
    ///
    /// Roles other than student need an admin session, except for the very
    /// first account.
    Register {
        /// Login name
        #[arg(long)]
        username: Option<String>,
        /// Email address
        #[arg(long)]
        email: Option<String>,
        /// First name
        #[arg(long)]
        name: Option<String>,
        /// Last name
        #[arg(long)]
        surname: Option<String>,
        /// Role (admin, mentor, member, student); non-student roles need an admin session unless no account exists yet
        #[arg(long)]
        user_type: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Log in with email or username
    Login {
        /// Email address or username
        identifier: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the logged-in user
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// End the current session
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change the password of the logged-in user
    ///
    /// Reads the current password from GATEHOUSE_CURRENT_PASSWORD and the new
    /// one from GATEHOUSE_PASSWORD when set; prompts otherwise.
    Passwd {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Administer user accounts (requires an admin session)
    User {
        #[command(subcommand)]
        command: user::UserCommands,
    },

    /// Show or change settings.json
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },

    /// Run database health checks
    Doctor {
        /// Show verbose output
        #[arg(long, short)]
        verbose: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be installed; keep the existing one
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Register { username, email, name, surname, user_type, json } => {
            register::run(register::RegisterArgs { username, email, name, surname, user_type }, json)
        }
        Commands::Login { identifier, json } => login::run(identifier, json),
        Commands::Whoami { json } => whoami::run(json),
        Commands::Logout { json } => logout::run(json),
        Commands::Passwd { json } => passwd::run(json),
        Commands::User { command } => user::run(command),
        Commands::Config { command } => config::run(command),
        Commands::Doctor { verbose, json } => doctor::run(verbose, json),
    }
}
