//! vidnote - command line client for vidnote accounts.
//!
//! Signs in and out, restores the saved session, keeps it alive, and sends
//! authenticated requests to the backend.

mod app;

use std::io;
use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vidnote_core::Config;

use app::App;

/// Log file prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "vidnote.log";

#[derive(Parser)]
#[command(name = "vidnote", version, about = "vidnote account and session client")]
struct Cli {
    /// Also write logs to a daily file in the cache directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with email and password
    Login {
        /// Defaults to the last email used
        email: Option<String>,
    },
    /// Create an account and sign in
    Register {
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "student")]
        user_type: String,
    },
    /// Sign out and clear stored credentials
    Logout,
    /// Show the current session
    Whoami,
    /// Request a password reset email
    ResetPassword { email: String },
    /// Show the profile
    Profile {
        /// Show the cached profile without contacting the server
        #[arg(long)]
        offline: bool,
    },
    /// Update profile fields
    ProfileUpdate {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        institution: Option<String>,
        #[arg(long)]
        field_of_study: Option<String>,
    },
    /// Send an authenticated request to a backend path and print the body
    Request {
        path: String,
        #[arg(long, default_value = "GET")]
        method: String,
        /// JSON request body
        #[arg(long)]
        data: Option<String>,
    },
    /// Keep the session alive, refreshing periodically, until interrupted
    Watch,
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load()?;

    let log_dir = if cli.log_file {
        Some(config.cache_dir()?)
    } else {
        None
    };
    let _guard = init_tracing(log_dir.as_deref());
    info!(backend = %config.backend_url, "vidnote starting");

    let mut app = App::new(config)?;

    match cli.command {
        Command::Login { email } => app.login(email).await,
        Command::Register {
            email,
            name,
            user_type,
        } => app.register(email, name, user_type).await,
        Command::Logout => app.logout().await,
        Command::Whoami => app.whoami().await,
        Command::ResetPassword { email } => app.reset_password(&email).await,
        Command::Profile { offline } => app.profile(offline).await,
        Command::ProfileUpdate {
            name,
            institution,
            field_of_study,
        } => app.update_profile(name, institution, field_of_study).await,
        Command::Request { path, method, data } => app.request(&path, &method, data.as_deref()).await,
        Command::Watch => app.watch().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_without_email() {
        let cli = Cli::try_parse_from(["vidnote", "login"]).expect("parse");
        assert!(matches!(cli.command, Command::Login { email: None }));
        assert!(!cli.log_file);
    }

    #[test]
    fn test_parse_register_defaults_user_type() {
        let cli = Cli::try_parse_from(["vidnote", "register", "a@b.co", "--name", "Ada"])
            .expect("parse");
        match cli.command {
            Command::Register { user_type, name, .. } => {
                assert_eq!(user_type, "student");
                assert_eq!(name, "Ada");
            }
            _ => panic!("expected register"),
        }
    }

    #[test]
    fn test_parse_request_with_global_flag() {
        let cli = Cli::try_parse_from([
            "vidnote", "request", "/notes", "--method", "post", "--data", "{}", "--log-file",
        ])
        .expect("parse");
        assert!(cli.log_file);
        assert!(matches!(cli.command, Command::Request { ref method, .. } if method == "post"));
    }

    #[test]
    fn test_register_requires_name() {
        assert!(Cli::try_parse_from(["vidnote", "register", "a@b.co"]).is_err());
    }
}
