use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Preference blob exactly as the profile store holds it
///
/// Field names and value types vary between onboarding flows, so the blob
/// stays untyped until the profile reader normalizes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPreferences {
    pub searcher_id: String,
    pub fields: Map<String, Value>,
}

impl RawPreferences {
    /// Wrap a stored JSON value; anything other than an object is an empty profile
    pub fn new(searcher_id: impl Into<String>, value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        Self {
            searcher_id: searcher_id.into(),
            fields,
        }
    }
}

/// Listing row as returned by the listing store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawListing {
    pub id: String,
    pub owner_id: Option<String>,
    pub city: Option<String>,
    pub monthly_rent: Option<i64>,
    pub charges: Option<i64>,
    pub bedrooms: Option<i32>,
    pub furnished: Option<bool>,
    pub smoking_allowed: Option<bool>,
    pub pets_allowed: Option<bool>,
    pub available_from: Option<NaiveDate>,
    pub status: String,
    pub listed_at: Option<DateTime<Utc>>,
}

/// Eligibility filter passed to the listing store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingFilter {
    /// Latest acceptable `available_from` date (inclusive)
    pub available_by: NaiveDate,
    /// Page size, most recently listed first
    pub limit: Option<usize>,
    /// Rows to skip in that order
    pub offset: usize,
}

/// Overdue-match query passed to the match store
///
/// A generated match is overdue once created before `generated_before`, a
/// contacted one once contacted before `contacted_before`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryFilter {
    pub generated_before: DateTime<Utc>,
    pub contacted_before: DateTime<Utc>,
    pub limit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_object_blob_is_empty_profile() {
        let raw = RawPreferences::new("s1", json!(["not", "an", "object"]));
        assert!(raw.fields.is_empty());
        assert_eq!(raw.searcher_id, "s1");
    }

    #[test]
    fn test_object_blob_is_kept() {
        let raw = RawPreferences::new("s1", json!({"budget_min": 500}));
        assert_eq!(raw.fields.get("budget_min"), Some(&json!(500)));
    }
}
