//! tdx - interactive ticket creation for TeamDynamix
//!
//! # Configuration
//!
//! Set the following environment variables (or use a `.env` file):
//!
//! - `TDX_BASE_URL`: Base URL of the TDX Web API
//! - `TDX_USERNAME`/`TDX_PASSWORD` or `TDX_BEID`/`TDX_WEB_SERVICES_KEY`
//! - `TDX_APP_ID`, `REQUESTOR_UID`: Where and for whom tickets are created
//! - `OPENAI_API_KEY`, `MODEL_PROMPT`: Enable generated ticket text
//!
//! # Usage
//!
//! ```bash
//! # Prompt for ticket text (or generate it when OPENAI_API_KEY is set)
//! tdx create
//!
//! # Pick a category and generate tickets about it
//! tdx generate
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use tdx::cli::{Shell, Terminal};
use tdx::config::{Config, GeneratorConfig, TicketDefaults};
use tdx::generator::{TicketGenerator, TicketTextSource};
use tdx::tdx_client::TdxClient;
use tdx::tickets::TicketClient;

#[derive(Parser)]
#[command(name = "tdx", version, about = "Create TeamDynamix tickets interactively")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Do not use the ticket generator even if OPENAI_API_KEY is set
    #[arg(long, global = true)]
    no_generate: bool,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Create tickets one after another
    Create,
    /// Generate tickets for a chosen category
    Generate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore errors if not found)
    dotenvy::dotenv().ok();

    // Logs go to stderr so prompts on stdout stay readable
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tdx=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();
    let command = args.command.unwrap_or(Command::Create);

    let config = Config::from_env().context("Failed to load configuration")?;
    let defaults = TicketDefaults::from_env().context("Failed to load ticket defaults")?;

    tracing::debug!(
        base_url = %config.base_url,
        admin = config.credentials().is_admin(),
        "Configuration loaded"
    );

    let client = TdxClient::new(&config).context("Failed to create TDX client")?;
    let tickets = TicketClient::new(client).context("Failed to create ticket client")?;

    let generator = match GeneratorConfig::from_env().filter(|_| !args.no_generate) {
        Some(generator_config) => {
            tracing::debug!(model = %generator_config.model, "Ticket generator enabled");
            Some(TicketGenerator::new(generator_config).context("Failed to create ticket generator")?)
        }
        None => None,
    };
    let generator_ref = generator.as_ref().map(|g| g as &dyn TicketTextSource);

    let input = Terminal::new().context("Failed to open terminal")?;
    let mut shell = Shell::new(&tickets, &defaults, generator_ref, input, std::io::stdout());

    match command {
        Command::Create => shell.run_create().await?,
        Command::Generate => shell.run_generate().await?,
    }

    Ok(())
}
