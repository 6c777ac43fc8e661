//! CLI argument definitions for the Watcher binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Watcher document and tax-record service
#[derive(Parser, Debug)]
#[command(name = "watcher")]
#[command(about = "Watcher: session-gated document and tax-record service")]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(
        short,
        long,
        global = true,
        default_value = "watcher.toml",
        env = "WATCHER_CONFIG"
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the Watcher server
    Serve(ServeArgs),
    /// Check health of a running Watcher server
    Health(HealthArgs),
    /// Read a password from the terminal and print its Argon2 hash
    HashPassword,
    /// Add a user to the user directory
    AddUser(AddUserArgs),
}

/// Arguments for the serve command
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "WATCHER_PORT")]
    pub port: Option<u16>,

    /// Bind address (overrides the config file)
    #[arg(long, env = "WATCHER_HOST")]
    pub host: Option<String>,

    /// Serve protected routes without the session gate (development only)
    #[arg(long)]
    pub no_gate: bool,
}

/// Arguments for the health command
#[derive(clap::Args, Debug)]
pub struct HealthArgs {
    /// Base URL of the server to check
    #[arg(short, long, default_value = "http://127.0.0.1:3000")]
    pub url: String,

    /// Timeout in seconds
    #[arg(short, long, default_value_t = 5)]
    pub timeout: u64,
}

/// Arguments for the add-user command
#[derive(clap::Args, Debug)]
pub struct AddUserArgs {
    /// Employee number used to log in
    #[arg(long)]
    pub nip: String,

    /// Display name
    #[arg(long)]
    pub name: String,

    /// Role name
    #[arg(long, default_value = "staff")]
    pub role: String,

    /// Job title
    #[arg(long, default_value = "")]
    pub title: String,

    /// Department identifier
    #[arg(long, default_value = "")]
    pub department_id: String,

    /// User identifier; a random UUID when omitted
    #[arg(long)]
    pub user_id: Option<String>,
}
