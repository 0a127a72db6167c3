use super::ui;
use crate::core::config::AppConfig;
use crate::core::rates::rates_for_date;
use crate::core::{RateSet, RateSource};
use crate::upload::YokoyClient;
use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use comfy_table::Cell;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Day to fetch, `YYYY-MM-DD`. Current rates when absent.
    pub date: Option<String>,
    /// Day to label uploaded rates with.
    pub effective_date: Option<String>,
    pub upload: bool,
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        anyhow!("Invalid date format: {value}. Please use YYYY-MM-DD format (e.g., 2025-11-07)")
    })
}

impl RateSet {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Currency"),
            ui::header_cell("Unit"),
            ui::header_cell("Rate (HUF)"),
        ]);

        for entry in &self.rates {
            table.add_row(vec![
                Cell::new(&entry.currency),
                ui::number_cell(entry.unit.to_string()),
                ui::number_cell(format!("{:.4}", entry.rate)),
            ]);
        }

        let mut output = format!(
            "{} {}\n{} {}\n\n",
            ui::style_text("Date:", ui::StyleType::Label),
            self.date,
            ui::style_text("Total currencies:", ui::StyleType::Label),
            self.len()
        );
        output.push_str(&table.to_string());
        output
    }
}

/// Fetches one day of rates, prints them and optionally uploads them to Yokoy.
pub async fn run(
    options: &FetchOptions,
    source: &(dyn RateSource + Send + Sync),
    config: &AppConfig,
) -> Result<()> {
    let date = options.date.as_deref().map(parse_date).transpose()?;
    let effective_date = options.effective_date.as_deref().map(parse_date).transpose()?;

    // Credentials are checked before any request goes out.
    let client = if options.upload {
        config.validate()?;
        let api_key = config
            .yokoy
            .api_key
            .as_deref()
            .context("YOKOY_API_KEY is not set")?;
        Some(YokoyClient::new(&config.yokoy.api_url, api_key)?)
    } else {
        None
    };

    println!(
        "{}\n",
        ui::style_text("MNB Exchange Rate Fetcher", ui::StyleType::Title)
    );

    let pb = ui::new_spinner(&match date {
        Some(d) => format!("Fetching exchange rates for {d}..."),
        None => "Fetching current exchange rates...".to_string(),
    });
    let fetched = match date {
        Some(d) => rates_for_date(source, d).await,
        None => source.current_rates().await,
    };
    pb.finish_and_clear();

    let Some(rates) = fetched? else {
        let label = date.map_or("today".to_string(), |d| d.to_string());
        println!(
            "{}",
            ui::style_text(
                &format!("No rates available for {label}"),
                ui::StyleType::Warning
            )
        );
        println!(
            "{}",
            ui::style_text(
                "Rates are not published on weekends and holidays",
                ui::StyleType::Subtle
            )
        );
        bail!("No rates available for {label}");
    };
    debug!(date = %rates.date, count = rates.len(), "Fetched rates");

    println!("{}", rates.display_as_table());
    println!(
        "\n{}",
        ui::style_text(
            &format!("Successfully fetched {} exchange rates", rates.len()),
            ui::StyleType::Success
        )
    );

    let Some(client) = client else {
        return Ok(());
    };

    let target_date = effective_date.or(date).unwrap_or(rates.date);
    ui::print_separator();

    let pb = ui::new_spinner(&format!(
        "Uploading {} rates to Yokoy for {target_date}...",
        rates.len()
    ));
    let result = client.upload_fx_rates(&rates, target_date).await;
    pb.finish_and_clear();

    println!("{}", result.display_summary(target_date));
    if !result.is_success() {
        bail!("Upload to Yokoy failed");
    }
    Ok(())
}
