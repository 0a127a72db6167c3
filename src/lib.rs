pub mod cli;
pub mod core;
pub mod providers;
pub mod upload;

use crate::cli::FetchOptions;
use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    /// Fetch one day of MNB rates, optionally uploading them to Yokoy
    Fetch(FetchOptions),
    /// Verify the Yokoy credentials
    Check,
}

pub async fn run_command(command: AppCommand, config: &AppConfig) -> Result<()> {
    info!("mnb-fx-sync starting...");
    debug!(
        mnb = %config.mnb.base_url,
        yokoy = %config.yokoy.api_url,
        configured = config.is_configured(),
        "Loaded config"
    );

    match command {
        AppCommand::Fetch(options) => {
            let provider = providers::MnbProvider::new(&config.mnb.base_url);
            cli::fetch::run(&options, &provider, config).await
        }
        AppCommand::Check => cli::check::run(config).await,
    }
}
