//! Command-line administration for the biobank specimen-tracking system.
//!
//! This CLI tool provides commands for:
//! - users: list users, show one, activate, lock and unlock
//! - events: show a collection event with its annotations
//! - specimens: show a specimen, mark it usable or unusable
//!
//! Configuration via environment:
//! - BIOBANK_URL: Base URL of the biobank API (default: http://localhost:9000/api)
//! - BIOBANK_TOKEN: Bearer token for authentication
//! - BIOBANK_TIMEOUT_SECS: Request timeout in seconds (default: 30)
//! - LOG_LEVEL: Logging level (default: warn for the CLI); RUST_LOG overrides it

mod commands;

use biobank_client::{ClientConfig, HttpRestClient};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use commands::{events::EventsArgs, specimens::SpecimensArgs, users::UsersArgs};

/// Biobank administration CLI
///
/// JSON output by default for scripting; --human for formatted output.
#[derive(Parser)]
#[command(name = "biobank")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output human-readable formatted text instead of JSON
    #[arg(long, global = true)]
    human: bool,

    /// Biobank API base URL
    #[arg(long, env = "BIOBANK_URL", global = true)]
    url: Option<String>,

    /// Bearer token for authentication
    #[arg(long, env = "BIOBANK_TOKEN", global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List and manage users
    Users(UsersArgs),

    /// Show collection events
    Events(EventsArgs),

    /// Show and manage specimens
    Specimens(SpecimensArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let client = match build_client(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Users(args) => commands::users::execute(&client, cli.human, args).await,
        Commands::Events(args) => commands::events::execute(&client, cli.human, args).await,
        Commands::Specimens(args) => commands::specimens::execute(&client, cli.human, args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration, apply command-line overrides, start logging and
/// build the HTTP client.
fn build_client(cli: &Cli) -> anyhow::Result<HttpRestClient> {
    let mut config = ClientConfig::from_lookup(|name| match name {
        // The CLI is quiet unless asked otherwise.
        "LOG_LEVEL" => std::env::var(name).ok().or_else(|| Some("warn".to_string())),
        _ => std::env::var(name).ok(),
    })?;
    if let Some(url) = &cli.url {
        config = config.with_base_url(url.clone());
    }
    if cli.token.is_some() {
        config = config.with_token(cli.token.clone());
    }

    init_tracing(&config.log_level);
    tracing::debug!(base_url = %config.base_url, timeout = ?config.timeout, "client configured");

    Ok(HttpRestClient::new(&config)?)
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
