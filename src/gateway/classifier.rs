//! Gateway outcome classification
//!
//! Maps whatever came back from a gateway call to exactly one of
//! `Success`, `Duplicate` or `Failure`. Never fails: malformed input degrades
//! to a `Failure` carrying the best available diagnostic.
//!
//! Duplicate detection is a substring match on the gateway's error text. The
//! gateway reports a retried submission as a business error ("... already
//! Exists", "already reversed", "duplicate ..."); since the gateway call is not
//! transactional with the row claim, such a report means an earlier attempt
//! went through, so it counts as success.

use super::envelope::ProcessingEnvelope;
use super::{GatewayError, GatewayResponse};
use crate::types::{RowResult, RowStatus};

/// First status code treated as an error
pub const ERROR_STATUS_THRESHOLD: u16 = 400;

/// Reference recorded when a success carries no header id
pub const MISSING_REFERENCE: &str = "N/A";

/// Reference recorded when a duplicate carries no header id
pub const EXISTING_REFERENCE: &str = "EXISTING";

/// Lower-cased markers of an idempotent duplicate report
const DUPLICATE_MARKERS: [&str; 3] = ["already exists", "already reversed", "duplicate"];

/// Outcome of one gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Posted; reference from the response header
    Success { reference: String },
    /// The gateway already had this transaction; treated as success
    Duplicate { reference: String, reason: String },
    /// Business rejection, malformed response or transport failure
    Failure { reason: String },
}

impl Classification {
    pub fn is_success(&self) -> bool {
        !matches!(self, Classification::Failure { .. })
    }

    /// Row status the claim is settled with
    pub fn row_status(&self) -> RowStatus {
        if self.is_success() {
            RowStatus::Completed
        } else {
            RowStatus::Failed
        }
    }

    /// The single result persisted for the row
    pub fn to_row_result(&self, batch_id: &str, line_number: u32) -> RowResult {
        match self {
            Classification::Success { reference } | Classification::Duplicate { reference, .. } => {
                RowResult::success(batch_id, line_number, reference.clone())
            }
            Classification::Failure { reason } => {
                RowResult::failed(batch_id, line_number, reason.clone())
            }
        }
    }
}

/// Whether an error message reports an already-processed transaction
pub fn is_duplicate_reason(reason: &str) -> bool {
    let lowered = reason.to_lowercase();
    DUPLICATE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Classify a gateway call outcome
pub fn classify(outcome: &Result<GatewayResponse, GatewayError>) -> Classification {
    let response = match outcome {
        Ok(response) => response,
        Err(error) => {
            return Classification::Failure {
                reason: format!("No response received from gateway: {}", error),
            }
        }
    };

    let body = match response.body.as_deref().map(str::trim) {
        Some(body) if !body.is_empty() => body,
        _ => {
            return Classification::Failure {
                reason: format!("HTTP {} with Empty Body", response.status),
            }
        }
    };

    let envelope: ProcessingEnvelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            return Classification::Failure {
                reason: format!(
                    "Unparseable gateway response (HTTP {}): {}",
                    response.status, e
                ),
            }
        }
    };

    classify_envelope(response.status, &envelope)
}

/// Classify a parsed envelope received with `status`
pub fn classify_envelope(status: u16, envelope: &ProcessingEnvelope) -> Classification {
    if status < ERROR_STATUS_THRESHOLD && envelope.is_successful() {
        return Classification::Success {
            reference: envelope
                .reference()
                .unwrap_or_else(|| MISSING_REFERENCE.to_string()),
        };
    }

    let reason = envelope.first_error_message().unwrap_or_else(|| {
        match envelope.error_type() {
            Some(error_type) => format!("HTTP {} [{}]", status, error_type),
            None => format!("HTTP {}", status),
        }
    });

    if is_duplicate_reason(&reason) {
        return Classification::Duplicate {
            reference: envelope
                .reference()
                .unwrap_or_else(|| EXISTING_REFERENCE.to_string()),
            reason,
        };
    }

    Classification::Failure { reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowOutcome;
    use rstest::rstest;

    fn respond(status: u16, body: &str) -> Result<GatewayResponse, GatewayError> {
        Ok(GatewayResponse::new(status, body))
    }

    #[test]
    fn test_success_captures_header_reference() {
        let outcome = respond(201, r#"{"header":{"id":"FT25057DB3JL","status":"success"},"body":{}}"#);
        assert_eq!(
            classify(&outcome),
            Classification::Success {
                reference: "FT25057DB3JL".to_string()
            }
        );
    }

    #[test]
    fn test_null_detail_lists_are_success() {
        let outcome = respond(
            200,
            r#"{"header":{"id":"FT1"},"error":{"errorDetails":null},"override":{"overrideDetails":null}}"#,
        );
        assert_eq!(
            classify(&outcome),
            Classification::Success {
                reference: "FT1".to_string()
            }
        );
    }

    #[test]
    fn test_success_without_header_uses_placeholder() {
        let outcome = respond(200, r#"{"body":{}}"#);
        assert_eq!(
            classify(&outcome),
            Classification::Success {
                reference: MISSING_REFERENCE.to_string()
            }
        );
    }

    #[rstest]
    #[case::already_exists("Transaction already Exists")]
    #[case::lowercase_exists("record already exists in ledger")]
    #[case::already_reversed("Transaction already reversed")]
    #[case::duplicate("duplicate submission detected")]
    fn test_duplicate_messages_reclassify_as_success(#[case] message: &str) {
        let body = format!(
            r#"{{"header":{{"id":"FT001"}},"error":{{"errorDetails":[{{"message":"{}"}}]}}}}"#,
            message
        );
        let classification = classify(&respond(400, &body));

        assert_eq!(
            classification,
            Classification::Duplicate {
                reference: "FT001".to_string(),
                reason: message.to_string()
            }
        );
        assert!(classification.is_success());
        assert_eq!(classification.row_status(), RowStatus::Completed);
    }

    #[test]
    fn test_duplicate_without_header_uses_existing_sentinel() {
        let body = r#"{"override":{"overrideDetails":[{"description":"Record already Exists"}]}}"#;
        assert_eq!(
            classify(&respond(400, body)),
            Classification::Duplicate {
                reference: EXISTING_REFERENCE.to_string(),
                reason: "Record already Exists".to_string()
            }
        );
    }

    #[rstest]
    #[case::business_error(
        400,
        r#"{"error":{"type":"BUSINESS","errorDetails":[{"message":"Account 123 is closed"}]}}"#,
        "Account 123 is closed"
    )]
    #[case::override_fallback(
        200,
        r#"{"header":{"id":"FT1"},"override":{"overrideDetails":[{"description":"Posting restriction"}]}}"#,
        "Posting restriction"
    )]
    #[case::status_only(503, r#"{"header":{}}"#, "HTTP 503")]
    #[case::status_with_type(500, r#"{"error":{"type":"TECHNICAL"}}"#, "HTTP 500 [TECHNICAL]")]
    #[case::empty_body(502, "   ", "HTTP 502 with Empty Body")]
    fn test_failures(#[case] status: u16, #[case] body: &str, #[case] expected: &str) {
        assert_eq!(
            classify(&respond(status, body)),
            Classification::Failure {
                reason: expected.to_string()
            }
        );
    }

    #[test]
    fn test_missing_body_is_failure() {
        let outcome = Ok(GatewayResponse::empty(204));
        assert_eq!(
            classify(&outcome),
            Classification::Failure {
                reason: "HTTP 204 with Empty Body".to_string()
            }
        );
    }

    #[test]
    fn test_unparseable_body_degrades_to_failure() {
        match classify(&respond(200, "<html>gateway down</html>")) {
            Classification::Failure { reason } => {
                assert!(reason.starts_with("Unparseable gateway response (HTTP 200)"))
            }
            other => panic!("Expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_transport_error_is_failure() {
        let outcome = Err(GatewayError::transport("connection refused"));
        assert_eq!(
            classify(&outcome),
            Classification::Failure {
                reason: "No response received from gateway: connection refused".to_string()
            }
        );
    }

    #[test]
    fn test_to_row_result() {
        let duplicate = Classification::Duplicate {
            reference: "FT7".to_string(),
            reason: "already Exists".to_string(),
        };
        let result = duplicate.to_row_result("b1", 7);
        assert_eq!(result.outcome, RowOutcome::Success);
        assert_eq!(result.external_reference.as_deref(), Some("FT7"));

        let failure = Classification::Failure {
            reason: "closed".to_string(),
        };
        let result = failure.to_row_result("b1", 8);
        assert_eq!(result.outcome, RowOutcome::Failed);
        assert_eq!(result.error_message.as_deref(), Some("closed"));
        assert_eq!(result.external_reference, None);
    }
}
