use super::payload::UploadPayload;
use crate::core::RateSet;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Map, Value};
use std::fmt::Display;
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Body of a rejected request: JSON when it parses, the raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetail {
    Structured(Value),
    Raw(String),
}

impl ErrorDetail {
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str(body) {
            Ok(value) => ErrorDetail::Structured(value),
            Err(_) => ErrorDetail::Raw(body.to_string()),
        }
    }
}

impl Display for ErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorDetail::Structured(Value::String(text)) | ErrorDetail::Raw(text) => {
                write!(f, "{text}")
            }
            ErrorDetail::Structured(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The sink answered with a 4xx or 5xx status.
    Rejected,
    Timeout,
    Connection,
    /// A success status whose body is not JSON.
    Decode,
    /// Any other transport error.
    Request,
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                FailureKind::Rejected => "http-error",
                FailureKind::Timeout => "timeout",
                FailureKind::Connection => "connection",
                FailureKind::Decode => "decode",
                FailureKind::Request => "request",
            }
        )
    }
}

impl From<&reqwest::Error> for FailureKind {
    fn from(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            FailureKind::Timeout
        } else if err.is_connect() {
            FailureKind::Connection
        } else {
            FailureKind::Request
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadResult {
    Success {
        status_code: u16,
        data: Value,
        rates_uploaded: usize,
    },
    Failure {
        status_code: Option<u16>,
        error: String,
        detail: Option<ErrorDetail>,
        kind: FailureKind,
    },
}

impl UploadResult {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadResult::Success { .. })
    }

    fn transport(err: &reqwest::Error) -> Self {
        UploadResult::Failure {
            status_code: None,
            error: err.to_string(),
            detail: None,
            kind: FailureKind::from(err),
        }
    }
}

/// Client for the Yokoy public FX rates API.
pub struct YokoyClient {
    base_url: String,
    client: reqwest::Client,
    upload_timeout: Duration,
    probe_timeout: Duration,
}

impl YokoyClient {
    /// Every request carries `Authorization: Bearer <api_key>` and a JSON content type.
    pub fn new(api_url: &str, api_key: &str) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .context("API key is not a valid header value")?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .user_agent("mnb-fx-sync/1.0")
            .default_headers(headers)
            .build()?;

        Ok(YokoyClient {
            base_url: api_url.trim_end_matches('/').to_string(),
            client,
            upload_timeout: UPLOAD_TIMEOUT,
            probe_timeout: PROBE_TIMEOUT,
        })
    }

    pub fn with_timeouts(mut self, upload: Duration, probe: Duration) -> Self {
        self.upload_timeout = upload;
        self.probe_timeout = probe;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/fx-rates", self.base_url)
    }

    /// Posts `rate_set` labelled with `target_date`. Single attempt; HTTP and transport
    /// failures come back as [`UploadResult::Failure`].
    #[instrument(
        name = "YokoyUpload",
        skip(self, rate_set, target_date),
        fields(count = rate_set.len(), target_date = %target_date)
    )]
    pub async fn upload_fx_rates(&self, rate_set: &RateSet, target_date: NaiveDate) -> UploadResult {
        let payload = UploadPayload::from_rates(rate_set, target_date);
        let url = self.endpoint();
        debug!("Uploading {} rates to {}", payload.rates.len(), url);

        let response = match self
            .client
            .post(&url)
            .json(&payload)
            .timeout(self.upload_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Upload request failed");
                return UploadResult::transport(&e);
            }
        };

        let status = response.status();
        let rejection = response.error_for_status_ref().err().map(|e| e.to_string());
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to read upload response");
                return UploadResult::transport(&e);
            }
        };
        debug!(%status, "Received Yokoy response");

        if let Some(error) = rejection {
            warn!(%status, body = %body, "Yokoy rejected the upload");
            return UploadResult::Failure {
                status_code: Some(status.as_u16()),
                error,
                detail: Some(ErrorDetail::from_body(&body)),
                kind: FailureKind::Rejected,
            };
        }

        let data = if body.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            match serde_json::from_str(&body) {
                Ok(data) => data,
                Err(e) => {
                    warn!(error = %e, "Upload response is not JSON");
                    return UploadResult::Failure {
                        status_code: Some(status.as_u16()),
                        error: format!("Failed to parse response body: {e}"),
                        detail: Some(ErrorDetail::Raw(body)),
                        kind: FailureKind::Decode,
                    };
                }
            }
        };

        UploadResult::Success {
            status_code: status.as_u16(),
            data,
            rates_uploaded: payload.rates.len(),
        }
    }

    /// Best-effort credential probe.
    ///
    /// The endpoint only accepts POST, so a 404 on GET still means the key was not rejected.
    /// Everything else, including transport errors, is `false`; no diagnostics survive.
    pub async fn test_connection(&self) -> bool {
        let url = self.endpoint();
        debug!("Probing Yokoy credentials at {}", url);

        match self
            .client
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status();
                debug!(%status, "Probe response");
                status.is_success() || status == StatusCode::NOT_FOUND
            }
            Err(e) => {
                debug!(error = %e, "Probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RateEntry;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // Nothing listens on port 1, so connecting fails immediately.
    const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_rates() -> RateSet {
        RateSet {
            date: date("2025-11-07"),
            rates: vec![RateEntry::new("EUR", 404.5), RateEntry::new("USD", 365.2)],
        }
    }

    async fn mock_upload_response(server: &MockServer, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/fx-rates"))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_successful_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fx-rates"))
            .and(header("Authorization", "Bearer test-key"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(json!({
                "baseCurrency": "HUF",
                "effectiveDate": "2025-11-07",
                "rates": [
                    {"currency": "EUR", "rate": 404.5, "date": "2025-11-07"},
                    {"currency": "USD", "rate": 365.2, "date": "2025-11-07"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let client = YokoyClient::new(&server.uri(), "test-key").unwrap();
        let result = client
            .upload_fx_rates(&sample_rates(), date("2025-11-07"))
            .await;

        assert_eq!(
            result,
            UploadResult::Success {
                status_code: 200,
                data: json!({"id": 1}),
                rates_uploaded: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_upload_uses_target_date() {
        let server = MockServer::start().await;
        mock_upload_response(&server, ResponseTemplate::new(200)).await;

        let client = YokoyClient::new(&server.uri(), "test-key").unwrap();
        let result = client
            .upload_fx_rates(&sample_rates(), date("2025-11-10"))
            .await;
        assert!(result.is_success());

        let requests = server.received_requests().await.unwrap();
        let sent: Value = requests[0].body_json().unwrap();
        assert_eq!(sent["effectiveDate"], "2025-11-10");
        assert!(
            sent["rates"]
                .as_array()
                .unwrap()
                .iter()
                .all(|r| r["date"] == "2025-11-10")
        );
    }

    #[tokio::test]
    async fn test_empty_success_body_yields_empty_object() {
        let server = MockServer::start().await;
        mock_upload_response(&server, ResponseTemplate::new(201)).await;

        let client = YokoyClient::new(&server.uri(), "test-key").unwrap();
        let result = client
            .upload_fx_rates(&sample_rates(), date("2025-11-07"))
            .await;

        assert_eq!(
            result,
            UploadResult::Success {
                status_code: 201,
                data: json!({}),
                rates_uploaded: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_rates_uploaded_counts_entries_sent() {
        let server = MockServer::start().await;
        mock_upload_response(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({"processed": 40})),
        )
        .await;

        let mut rates = sample_rates();
        rates.rates.push(RateEntry::new("CHF", 418.9));

        let client = YokoyClient::new(&server.uri(), "test-key").unwrap();
        match client.upload_fx_rates(&rates, date("2025-11-07")).await {
            UploadResult::Success { rates_uploaded, .. } => assert_eq!(rates_uploaded, 3),
            other => panic!("Expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_upload() {
        let server = MockServer::start().await;
        mock_upload_response(
            &server,
            ResponseTemplate::new(401).set_body_string("unauthorized"),
        )
        .await;

        let client = YokoyClient::new(&server.uri(), "wrong-key").unwrap();
        let result = client
            .upload_fx_rates(&sample_rates(), date("2025-11-07"))
            .await;

        match result {
            UploadResult::Failure {
                status_code,
                error,
                detail,
                kind,
            } => {
                assert_eq!(status_code, Some(401));
                assert_eq!(kind, FailureKind::Rejected);
                assert!(error.contains("401"));
                assert_eq!(detail, Some(ErrorDetail::Raw("unauthorized".to_string())));
            }
            other => panic!("Expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejection_with_json_detail() {
        let server = MockServer::start().await;
        mock_upload_response(
            &server,
            ResponseTemplate::new(422).set_body_json(json!({"message": "unknown currency XDR"})),
        )
        .await;

        let client = YokoyClient::new(&server.uri(), "test-key").unwrap();
        let result = client
            .upload_fx_rates(&sample_rates(), date("2025-11-07"))
            .await;

        match result {
            UploadResult::Failure {
                status_code,
                detail,
                ..
            } => {
                assert_eq!(status_code, Some(422));
                assert_eq!(
                    detail,
                    Some(ErrorDetail::Structured(
                        json!({"message": "unknown currency XDR"})
                    ))
                );
            }
            other => panic!("Expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_success_body() {
        let server = MockServer::start().await;
        mock_upload_response(&server, ResponseTemplate::new(200).set_body_string("OK")).await;

        let client = YokoyClient::new(&server.uri(), "test-key").unwrap();
        let result = client
            .upload_fx_rates(&sample_rates(), date("2025-11-07"))
            .await;

        match result {
            UploadResult::Failure {
                status_code,
                detail,
                kind,
                ..
            } => {
                assert_eq!(status_code, Some(200));
                assert_eq!(kind, FailureKind::Decode);
                assert_eq!(detail, Some(ErrorDetail::Raw("OK".to_string())));
            }
            other => panic!("Expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload_timeout() {
        let server = MockServer::start().await;
        mock_upload_response(
            &server,
            ResponseTemplate::new(200).set_delay(Duration::from_secs(5)),
        )
        .await;

        let client = YokoyClient::new(&server.uri(), "test-key")
            .unwrap()
            .with_timeouts(Duration::from_millis(200), PROBE_TIMEOUT);
        let result = client
            .upload_fx_rates(&sample_rates(), date("2025-11-07"))
            .await;

        match result {
            UploadResult::Failure {
                status_code,
                detail,
                kind,
                ..
            } => {
                assert_eq!(status_code, None);
                assert_eq!(kind, FailureKind::Timeout);
                assert!(detail.is_none());
            }
            other => panic!("Expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload_connection_refused() {
        let client = YokoyClient::new(UNREACHABLE_URL, "test-key").unwrap();
        let result = client
            .upload_fx_rates(&sample_rates(), date("2025-11-07"))
            .await;

        match result {
            UploadResult::Failure {
                status_code, kind, ..
            } => {
                assert_eq!(status_code, None);
                assert_eq!(kind, FailureKind::Connection);
            }
            other => panic!("Expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_trailing_slash_is_stripped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/public/v1/fx-rates"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let base = format!("{}/public/v1/", server.uri());
        let client = YokoyClient::new(&base, "test-key").unwrap();
        let result = client
            .upload_fx_rates(&sample_rates(), date("2025-11-07"))
            .await;
        assert!(result.is_success());
    }

    #[test]
    fn test_invalid_api_key_is_rejected() {
        let result = YokoyClient::new("http://localhost", "bad\nkey");
        assert!(result.is_err());
    }

    #[test]
    fn test_error_detail_display() {
        assert_eq!(ErrorDetail::from_body("unauthorized").to_string(), "unauthorized");
        assert_eq!(
            ErrorDetail::from_body("\"unauthorized\"").to_string(),
            "unauthorized"
        );
        assert_eq!(
            ErrorDetail::from_body(r#"{"code":7}"#).to_string(),
            r#"{"code":7}"#
        );
    }

    #[tokio::test]
    async fn test_connection_accepts_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fx-rates"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = YokoyClient::new(&server.uri(), "test-key").unwrap();
        assert!(client.test_connection().await);
    }

    #[tokio::test]
    async fn test_connection_accepts_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fx-rates"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = YokoyClient::new(&server.uri(), "test-key").unwrap();
        assert!(client.test_connection().await);
    }

    #[tokio::test]
    async fn test_connection_rejects_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fx-rates"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let client = YokoyClient::new(&server.uri(), "wrong-key").unwrap();
        assert!(!client.test_connection().await);
    }

    #[tokio::test]
    async fn test_connection_transport_failure() {
        let client = YokoyClient::new(UNREACHABLE_URL, "test-key").unwrap();
        assert!(!client.test_connection().await);
    }
}
