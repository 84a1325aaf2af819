//! Read-only reference data owned by administrative collaborators
//!
//! The engine only looks these documents up: the application a feature
//! processes, its enable flag, and the user/country chain that yields the
//! tenant (company) identifier rows are posted under.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Application (processing feature) configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    /// Feature key, e.g. `FUNDS_TRANSFER`
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Administrative enable flag for a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlag {
    pub config_key: String,
    pub enabled: bool,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// The part of a user's profile the engine reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub country_code: Option<String>,
}

/// Country to company (tenant) mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub code: String,
    pub company_id: String,
}

impl Country {
    /// Whether `code` looks like an ISO alpha-2 code (two uppercase letters)
    pub fn is_valid_code(code: &str) -> bool {
        code.len() == 2 && code.bytes().all(|b| b.is_ascii_uppercase())
    }
}
