//! Gateway response envelope
//!
//! ```text
//! { "header":   { "id", "status", ... },
//!   "body":     { ... },                               present on success
//!   "error":    { "type", "errorDetails":   [ { "message", ... } ] },
//!   "override": { "overrideDetails": [ { "description", ... } ] } }
//! ```
//!
//! Unknown fields are ignored; every block is optional.

use serde::{Deserialize, Deserializer};

/// Explicit `null` lists read as empty
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResponseHeader {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "transactionStatus")]
    pub transaction_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorDetail {
    #[serde(default, rename = "fieldName")]
    pub field_name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Business error block
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorBlock {
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default, rename = "errorDetails", deserialize_with = "null_as_empty")]
    pub error_details: Vec<ErrorDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OverrideDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

/// Blocking override block (restrictions, posting issues)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OverrideBlock {
    #[serde(default, rename = "overrideDetails", deserialize_with = "null_as_empty")]
    pub override_details: Vec<OverrideDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProcessingEnvelope {
    #[serde(default)]
    pub header: Option<ResponseHeader>,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<ErrorBlock>,
    #[serde(default, rename = "override")]
    pub override_block: Option<OverrideBlock>,
}

impl ProcessingEnvelope {
    /// No business-error entries and no override entries
    pub fn is_successful(&self) -> bool {
        let no_errors = self
            .error
            .as_ref()
            .map_or(true, |e| e.error_details.is_empty());
        let no_overrides = self
            .override_block
            .as_ref()
            .map_or(true, |o| o.override_details.is_empty());
        no_errors && no_overrides
    }

    /// First business-error message, falling back to the first override description
    pub fn first_error_message(&self) -> Option<String> {
        if let Some(first) = self.error.as_ref().and_then(|e| e.error_details.first()) {
            return first.message.clone();
        }
        self.override_block
            .as_ref()
            .and_then(|o| o.override_details.first())
            .and_then(|o| o.description.clone())
    }

    /// Transaction id from the header, when present
    pub fn reference(&self) -> Option<String> {
        self.header.as_ref().and_then(|h| h.id.clone())
    }

    pub fn error_type(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.error_type.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(json: &str) -> ProcessingEnvelope {
        serde_json::from_str(json).unwrap()
    }

    #[rstest]
    #[case::header_only(r#"{"header":{"id":"FT1","status":"success"}}"#, true)]
    #[case::empty_error_list(r#"{"header":{},"error":{"errorDetails":[]}}"#, true)]
    #[case::null_lists(
        r#"{"header":{"id":"FT1"},"error":{"errorDetails":null},"override":{"overrideDetails":null}}"#,
        true
    )]
    #[case::business_error(r#"{"error":{"errorDetails":[{"message":"bad"}]}}"#, false)]
    #[case::override_only(r#"{"override":{"overrideDetails":[{"description":"limit"}]}}"#, false)]
    fn test_is_successful(#[case] json: &str, #[case] expected: bool) {
        assert_eq!(parse(json).is_successful(), expected);
    }

    #[rstest]
    #[case::error_first(
        r#"{"error":{"errorDetails":[{"message":"first"},{"message":"second"}]},"override":{"overrideDetails":[{"description":"ovr"}]}}"#,
        Some("first")
    )]
    #[case::override_fallback(r#"{"override":{"overrideDetails":[{"description":"ovr"}]}}"#, Some("ovr"))]
    #[case::nothing(r#"{"header":{"id":"x"}}"#, None)]
    fn test_first_error_message(#[case] json: &str, #[case] expected: Option<&str>) {
        assert_eq!(parse(json).first_error_message().as_deref(), expected);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let envelope = parse(
            r#"{"header":{"id":"FT9","audit":{"x":1}},"linkedActivities":[1,2],"body":{"transactionRef":"FT9"}}"#,
        );
        assert_eq!(envelope.reference().as_deref(), Some("FT9"));
        assert!(envelope.is_successful());
    }
}
