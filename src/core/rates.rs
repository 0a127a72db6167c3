//! Exchange rate abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A single published rate: HUF per `unit` units of `currency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    pub currency: String,
    pub rate: f64,
    pub unit: u32,
}

impl RateEntry {
    pub fn new(currency: &str, rate: f64) -> Self {
        Self {
            currency: currency.to_string(),
            rate,
            unit: 1,
        }
    }
}

/// One day's published rates, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSet {
    pub date: NaiveDate,
    pub rates: Vec<RateEntry>,
}

impl RateSet {
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

#[async_trait]
pub trait RateSource: Send + Sync {
    /// Latest published rates, `None` when the source has nothing to offer.
    async fn current_rates(&self) -> Result<Option<RateSet>>;

    /// All currency codes the source quotes.
    async fn currencies(&self) -> Result<Vec<String>>;

    /// One rate set per published day in `[start, end]`.
    async fn rates_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        currencies: &[String],
    ) -> Result<Vec<RateSet>>;
}

/// Fetches every quoted currency for a single day.
///
/// Returns `None` when no rates were published on `date` (weekends and holidays).
pub async fn rates_for_date(
    source: &(dyn RateSource + Send + Sync),
    date: NaiveDate,
) -> Result<Option<RateSet>> {
    let currencies = source.currencies().await?;
    debug!(count = currencies.len(), %date, "Requesting rates for date");

    let days = source.rates_between(date, date, &currencies).await?;
    Ok(days.into_iter().find(|day| !day.is_empty()))
}
