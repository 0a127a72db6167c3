use crate::core::{RateEntry, RateSet, RateSource};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{debug, instrument};

const SOAP_ACTION_PREFIX: &str = "http://www.mnb.hu/webservices/MNBArfolyamServiceSoap/";

/// Client for the MNB `arfolyamok.asmx` SOAP service.
pub struct MnbProvider {
    base_url: String,
}

impl MnbProvider {
    pub fn new(base_url: &str) -> Self {
        MnbProvider {
            base_url: base_url.to_string(),
        }
    }

    /// Invokes `operation` and returns the document embedded in its `<operation>Result` element.
    async fn call(&self, operation: &str, params: &str) -> Result<String> {
        debug!("Calling MNB operation {} at {}", operation, self.base_url);

        let client = reqwest::Client::builder()
            .user_agent("mnb-fx-sync/1.0")
            .build()?;
        let response = client
            .post(&self.base_url)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{SOAP_ACTION_PREFIX}{operation}\""))
            .body(soap_envelope(operation, params))
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for MNB operation: {}", e, operation))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to get response text for MNB operation: {operation}"))?;

        if !status.is_success() {
            let fault = element_text(&text, "faultstring").ok().flatten();
            return Err(match fault {
                Some(fault) => anyhow!(
                    "HTTP error: {} for MNB operation: {} ({})",
                    status,
                    operation,
                    fault.trim()
                ),
                None => anyhow!("HTTP error: {} for MNB operation: {}", status, operation),
            });
        }

        let result_element = format!("{operation}Result");
        element_text(&text, &result_element)
            .with_context(|| format!("Failed to parse SOAP response for {operation}"))?
            .ok_or_else(|| anyhow!("No {} element in MNB response", result_element))
    }
}

fn soap_envelope(operation: &str, params: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/" xmlns:web="http://www.mnb.hu/webservices/"><soap:Body><web:{operation}>{params}</web:{operation}></soap:Body></soap:Envelope>"#
    )
}

/// Text content of the first element named `local_name`, ignoring namespace prefixes.
fn element_text(xml: &str, local_name: &str) -> Result<Option<String>> {
    let name = local_name.as_bytes();
    let mut reader = Reader::from_str(xml);
    let mut inside = false;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == name => inside = true,
            Event::Empty(e) if e.local_name().as_ref() == name => return Ok(Some(String::new())),
            Event::Text(t) if inside => text.push_str(&t.unescape()?),
            Event::CData(c) if inside => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::End(e) if inside && e.local_name().as_ref() == name => return Ok(Some(text)),
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

#[derive(Debug, Deserialize)]
struct MnbRatesDocument {
    #[serde(rename = "Day", default)]
    days: Vec<MnbDay>,
}

#[derive(Debug, Deserialize)]
struct MnbDay {
    #[serde(rename = "@date")]
    date: String,
    #[serde(rename = "Rate", default)]
    rates: Vec<MnbRate>,
}

#[derive(Debug, Deserialize)]
struct MnbRate {
    #[serde(rename = "@unit", default)]
    unit: Option<String>,
    #[serde(rename = "@curr")]
    currency: String,
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct MnbCurrenciesDocument {
    #[serde(rename = "Currencies")]
    currencies: MnbCurrencyList,
}

#[derive(Debug, Deserialize)]
struct MnbCurrencyList {
    #[serde(rename = "Curr", default)]
    items: Vec<String>,
}

// MNB publishes rates with a decimal comma, e.g. "385,12".
fn parse_rate(value: &str) -> Result<f64> {
    value
        .trim()
        .replace(',', ".")
        .parse()
        .with_context(|| format!("Invalid rate value: {value}"))
}

fn parse_days(document: &str) -> Result<Vec<RateSet>> {
    let parsed: MnbRatesDocument =
        quick_xml::de::from_str(document).context("Failed to parse MNB rates document")?;

    parsed
        .days
        .into_iter()
        .map(|day| -> Result<RateSet> {
            let date = NaiveDate::parse_from_str(&day.date, "%Y-%m-%d")
                .with_context(|| format!("Failed to parse date: {}", day.date))?;
            let rates = day
                .rates
                .into_iter()
                .filter(|r| !r.value.trim().is_empty())
                .map(|r| -> Result<RateEntry> {
                    let unit = match r.unit.as_deref() {
                        Some(u) => u
                            .trim()
                            .parse::<u32>()
                            .with_context(|| format!("Invalid unit for {}: {u}", r.currency))?,
                        None => 1,
                    };
                    Ok(RateEntry {
                        rate: parse_rate(&r.value)?,
                        currency: r.currency,
                        unit,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(RateSet { date, rates })
        })
        .collect()
}

#[async_trait]
impl RateSource for MnbProvider {
    #[instrument(name = "MnbCurrentRates", skip(self))]
    async fn current_rates(&self) -> Result<Option<RateSet>> {
        let document = self.call("GetCurrentExchangeRates", "").await?;
        let day = parse_days(&document)?
            .into_iter()
            .find(|day| !day.is_empty());
        debug!(found = day.is_some(), "Parsed current exchange rates");
        Ok(day)
    }

    async fn currencies(&self) -> Result<Vec<String>> {
        let document = self.call("GetCurrencies", "").await?;
        let parsed: MnbCurrenciesDocument =
            quick_xml::de::from_str(&document).context("Failed to parse MNB currencies document")?;

        Ok(parsed
            .currencies
            .items
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect())
    }

    #[instrument(name = "MnbRatesBetween", skip(self, currencies), fields(count = currencies.len()))]
    async fn rates_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        currencies: &[String],
    ) -> Result<Vec<RateSet>> {
        let params = format!(
            "<web:startDate>{}</web:startDate><web:endDate>{}</web:endDate><web:currencyNames>{}</web:currencyNames>",
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
            currencies.join(",")
        );
        let document = self.call("GetExchangeRates", &params).await?;
        parse_days(&document)
    }
}
