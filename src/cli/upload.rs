use super::ui;
use crate::upload::{ErrorDetail, UploadResult};
use chrono::NaiveDate;

fn format_detail(detail: &ErrorDetail) -> String {
    match detail {
        ErrorDetail::Structured(value) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        ErrorDetail::Raw(text) => text.clone(),
    }
}

impl UploadResult {
    pub fn display_summary(&self, target_date: NaiveDate) -> String {
        match self {
            UploadResult::Success {
                status_code,
                data,
                rates_uploaded,
            } => {
                let mut output = ui::style_text(
                    &format!("Uploaded {rates_uploaded} rates to Yokoy for {target_date}"),
                    ui::StyleType::Success,
                );
                output.push_str(&format!(
                    "\n{} {}",
                    ui::style_text("Status:", ui::StyleType::Label),
                    status_code
                ));
                if data.as_object().is_none_or(|o| !o.is_empty()) {
                    output.push_str(&format!(
                        "\n{} {}",
                        ui::style_text("Response:", ui::StyleType::Label),
                        ui::style_text(&data.to_string(), ui::StyleType::Subtle)
                    ));
                }
                output
            }
            UploadResult::Failure {
                status_code,
                error,
                detail,
                kind,
            } => {
                let mut output = ui::style_text(
                    &format!("Failed to upload rates to Yokoy for {target_date}"),
                    ui::StyleType::Error,
                );
                let status = status_code.map_or("none".to_string(), |s| s.to_string());
                output.push_str(&format!(
                    "\n{} {}\n{} {}\n{} {}",
                    ui::style_text("Status:", ui::StyleType::Label),
                    status,
                    ui::style_text("Type:", ui::StyleType::Label),
                    kind,
                    ui::style_text("Error:", ui::StyleType::Label),
                    error
                ));
                if let Some(detail) = detail {
                    output.push_str(&format!(
                        "\n{} {}",
                        ui::style_text("Detail:", ui::StyleType::Label),
                        format_detail(detail)
                    ));
                }
                output
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::FailureKind;
    use serde_json::json;

    fn target() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 7).unwrap()
    }

    #[test]
    fn test_success_summary() {
        let result = UploadResult::Success {
            status_code: 200,
            data: json!({"id": 1}),
            rates_uploaded: 2,
        };

        let output = result.display_summary(target());
        assert!(output.contains("Uploaded 2 rates to Yokoy for 2025-11-07"));
        assert!(output.contains("200"));
        assert!(output.contains(r#"{"id":1}"#));
    }

    #[test]
    fn test_success_summary_omits_empty_response() {
        let result = UploadResult::Success {
            status_code: 204,
            data: json!({}),
            rates_uploaded: 2,
        };

        assert!(!result.display_summary(target()).contains("Response:"));
    }

    #[test]
    fn test_failure_summary() {
        let result = UploadResult::Failure {
            status_code: Some(401),
            error: "HTTP status client error (401 Unauthorized)".to_string(),
            detail: Some(ErrorDetail::Raw("unauthorized".to_string())),
            kind: FailureKind::Rejected,
        };

        let output = result.display_summary(target());
        assert!(output.contains("Failed to upload rates to Yokoy"));
        assert!(output.contains("401"));
        assert!(output.contains("http-error"));
        assert!(output.contains("unauthorized"));
    }

    #[test]
    fn test_transport_failure_summary() {
        let result = UploadResult::Failure {
            status_code: None,
            error: "operation timed out".to_string(),
            detail: None,
            kind: FailureKind::Timeout,
        };

        let output = result.display_summary(target());
        assert!(output.contains("none"));
        assert!(output.contains("timeout"));
        assert!(!output.contains("Detail:"));
    }
}
