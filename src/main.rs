use anyhow::Result;
use clap::{Parser, Subcommand};
use mnb_fx_sync::cli::ui::{StyleType, style_text};
use mnb_fx_sync::cli::{FetchOptions, setup::setup};
use mnb_fx_sync::core::config::AppConfig;
use mnb_fx_sync::core::log::init_logging;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    version,
    about,
    after_help = "Examples:\n  mnb-fx-sync                      # Fetch current rates\n  mnb-fx-sync --date 2025-11-07    # Fetch rates for a specific date\n  mnb-fx-sync -d 2025-11-07 -u     # Fetch and upload to Yokoy"
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Fetch rates for a specific date (format: YYYY-MM-DD)
    #[arg(short, long)]
    date: Option<String>,

    /// Upload the fetched rates to Yokoy
    #[arg(short, long)]
    upload: bool,

    /// Date to label uploaded rates with (defaults to --date, else the publication date)
    #[arg(short, long, requires = "upload")]
    effective_date: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Verify the Yokoy API credentials
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Setup) => {
            init_logging(cli.verbose);
            setup()
        }
        _ => run(cli).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Application failed");
            eprintln!("\n{} {e:#}", style_text("Error:", StyleType::Error));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config_path.as_deref())?;
    init_logging(cli.verbose || config.debug);

    let command = match cli.command {
        Some(Commands::Check) => mnb_fx_sync::AppCommand::Check,
        _ => mnb_fx_sync::AppCommand::Fetch(FetchOptions {
            date: cli.date,
            effective_date: cli.effective_date,
            upload: cli.upload,
        }),
    };

    mnb_fx_sync::run_command(command, &config).await
}
