use super::ui;
use crate::core::config::AppConfig;
use crate::upload::YokoyClient;
use anyhow::{Context, Result, bail};

/// Probes the Yokoy credentials from `config`.
pub async fn run(config: &AppConfig) -> Result<()> {
    config.validate()?;
    let api_key = config
        .yokoy
        .api_key
        .as_deref()
        .context("YOKOY_API_KEY is not set")?;
    let client = YokoyClient::new(&config.yokoy.api_url, api_key)?;

    let pb = ui::new_spinner("Testing Yokoy connection...");
    let connected = client.test_connection().await;
    pb.finish_and_clear();

    if !connected {
        bail!(
            "Could not verify Yokoy credentials at {}",
            config.yokoy.api_url
        );
    }

    println!(
        "{}",
        ui::style_text(
            &format!("Yokoy credentials accepted by {}", config.yokoy.api_url),
            ui::StyleType::Success
        )
    );
    Ok(())
}
