//! Request body of the Yokoy `fx-rates` endpoint

use crate::core::RateSet;
use chrono::NaiveDate;
use serde::Serialize;

/// Yokoy expects rates relative to a base currency; MNB quotes everything in HUF.
pub const BASE_CURRENCY: &str = "HUF";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayloadRate {
    pub currency: String,
    pub rate: f64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPayload {
    pub base_currency: String,
    pub rates: Vec<PayloadRate>,
    pub effective_date: NaiveDate,
}

impl UploadPayload {
    /// Labels every rate with `target_date`, whatever date the rate set itself carries.
    pub fn from_rates(rate_set: &RateSet, target_date: NaiveDate) -> Self {
        let rates = rate_set
            .rates
            .iter()
            .map(|entry| PayloadRate {
                currency: entry.currency.clone(),
                rate: entry.rate,
                date: target_date,
            })
            .collect();

        UploadPayload {
            base_currency: BASE_CURRENCY.to_string(),
            rates,
            effective_date: target_date,
        }
    }
}
