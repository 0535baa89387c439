use crate::core::error::MatchError;
use crate::models::{Lifestyle, RawPreferences, SearcherPreferences};
use crate::services::ProfileStore;
use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};
use std::sync::Arc;

// Aliases seen across onboarding flows, first present wins
const BUDGET_MIN_KEYS: &[&str] = &["budget_min", "min_budget", "budgetMin", "minBudget"];
const BUDGET_MAX_KEYS: &[&str] = &["budget_max", "max_budget", "budgetMax", "maxBudget"];
const CITY_KEYS: &[&str] = &[
    "preferred_cities",
    "preferredCities",
    "preferred_neighborhoods",
    "preferred_city",
    "preferred_neighborhood",
    "city",
];
const MIN_BEDROOMS_KEYS: &[&str] = &["min_bedrooms", "minBedrooms", "bedrooms_min"];
const SMOKER_KEYS: &[&str] = &["is_smoker", "isSmoker", "smoking", "smoker"];
const PETS_KEYS: &[&str] = &["has_pets", "hasPets", "pets"];
const CLEANLINESS_KEYS: &[&str] = &["cleanliness_level", "cleanlinessLevel", "cleanliness"];
const MOVE_IN_KEYS: &[&str] = &["move_in_date", "moveInDate", "desired_move_in_date"];

/// Reads and normalizes searcher preferences
#[derive(Clone)]
pub struct ProfileReader {
    store: Arc<dyn ProfileStore>,
}

impl ProfileReader {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Load a searcher's preferences
    ///
    /// An empty profile is valid and yields all-unknown preferences; only a
    /// searcher without any profile record is an error.
    pub async fn read(&self, searcher_id: &str) -> Result<SearcherPreferences, MatchError> {
        let raw = self
            .store
            .read_preferences(searcher_id)
            .await?
            .ok_or_else(|| MatchError::ProfileNotFound(searcher_id.to_string()))?;

        let preferences = normalize_preferences(&raw)?;

        tracing::debug!(
            searcher_id = %searcher_id,
            cities = preferences.preferred_cities.len(),
            has_budget = preferences.has_budget(),
            "Normalized searcher preferences"
        );

        Ok(preferences)
    }
}

/// Map a raw preference blob onto the canonical fields
pub fn normalize_preferences(raw: &RawPreferences) -> Result<SearcherPreferences, MatchError> {
    let searcher_id = raw.searcher_id.as_str();
    let fields = &raw.fields;
    let invalid =
        |field: &str, reason: String| MatchError::invalid_preferences(searcher_id, format!("{}: {}", field, reason));

    let budget_min = lookup(fields, BUDGET_MIN_KEYS)
        .map(parse_whole_number)
        .transpose()
        .map_err(|e| invalid("budget_min", e))?;
    let budget_max = lookup(fields, BUDGET_MAX_KEYS)
        .map(parse_whole_number)
        .transpose()
        .map_err(|e| invalid("budget_max", e))?;

    if let (Some(min), Some(max)) = (budget_min, budget_max) {
        if min > max {
            return Err(invalid(
                "budget",
                format!("minimum {} is greater than maximum {}", min, max),
            ));
        }
    }

    let preferred_cities = lookup(fields, CITY_KEYS)
        .map(parse_cities)
        .transpose()
        .map_err(|e| invalid("preferred_cities", e))?
        .unwrap_or_default();

    let min_bedrooms = lookup(fields, MIN_BEDROOMS_KEYS)
        .map(parse_whole_number)
        .transpose()
        .map_err(|e| invalid("min_bedrooms", e))?
        .map(|n| u16::try_from(n).map_err(|_| invalid("min_bedrooms", format!("{} is out of range", n))))
        .transpose()?;

    let is_smoker = lookup(fields, SMOKER_KEYS)
        .map(parse_bool)
        .transpose()
        .map_err(|e| invalid("is_smoker", e))?;
    let has_pets = lookup(fields, PETS_KEYS)
        .map(parse_bool)
        .transpose()
        .map_err(|e| invalid("has_pets", e))?;

    let cleanliness_level = lookup(fields, CLEANLINESS_KEYS)
        .map(parse_whole_number)
        .transpose()
        .map_err(|e| invalid("cleanliness_level", e))?
        .map(|level| match level {
            1..=10 => Ok(level as u8),
            other => Err(invalid(
                "cleanliness_level",
                format!("{} is outside 1..=10", other),
            )),
        })
        .transpose()?;

    let move_in_date = lookup(fields, MOVE_IN_KEYS)
        .map(parse_date)
        .transpose()
        .map_err(|e| invalid("move_in_date", e))?;

    Ok(SearcherPreferences {
        searcher_id: searcher_id.to_string(),
        budget_min,
        budget_max,
        preferred_cities,
        min_bedrooms,
        lifestyle: Lifestyle {
            is_smoker,
            has_pets,
            cleanliness_level,
        },
        move_in_date,
    })
}

/// First alias holding a non-blank value
fn lookup<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find(|value| !is_blank(value))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn parse_whole_number(value: &Value) -> Result<u32, String> {
    let number = match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("{} is not a number", n))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("{:?} is not a number", s))?,
        other => return Err(format!("expected a number, got {}", other)),
    };

    if !number.is_finite() {
        return Err("must be finite".to_string());
    }
    if number < 0.0 {
        return Err(format!("{} must not be negative", number));
    }
    if number > u32::MAX as f64 {
        return Err(format!("{} is out of range", number));
    }

    Ok(number.round() as u32)
}

fn parse_bool(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(format!("{} is not a boolean", n)),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            _ => Err(format!("{:?} is not a boolean", s)),
        },
        other => Err(format!("expected a boolean, got {}", other)),
    }
}

fn parse_date(value: &Value) -> Result<NaiveDate, String> {
    let s = value
        .as_str()
        .ok_or_else(|| format!("expected a date string, got {}", value))?
        .trim();

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.date_naive()))
        .map_err(|_| format!("{:?} is not a date", s))
}

fn parse_cities(value: &Value) -> Result<Vec<String>, String> {
    let names: Vec<String> = match value {
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| format!("expected city names, got {}", item))
            })
            .collect::<Result<_, _>>()?,
        other => return Err(format!("expected a city or list of cities, got {}", other)),
    };

    let mut cities: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        if !cities.iter().any(|c| c.eq_ignore_ascii_case(name)) {
            cities.push(name.to_string());
        }
    }

    Ok(cities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(value: Value) -> Result<SearcherPreferences, MatchError> {
        normalize_preferences(&RawPreferences::new("searcher-1", value))
    }

    #[test]
    fn test_empty_profile_is_all_unknown() {
        let prefs = normalize(json!({})).unwrap();
        assert_eq!(prefs, SearcherPreferences::unknown("searcher-1"));
    }

    #[test]
    fn test_aliases_are_resolved() {
        let prefs = normalize(json!({
            "min_budget": 500,
            "budgetMax": "800",
            "preferred_city": "Brussels",
            "minBedrooms": 2,
            "smoking": false,
            "pets": "yes",
            "cleanliness": 7,
            "moveInDate": "2026-09-01",
        }))
        .unwrap();

        assert_eq!(prefs.budget_min, Some(500));
        assert_eq!(prefs.budget_max, Some(800));
        assert_eq!(prefs.preferred_cities, vec!["Brussels"]);
        assert_eq!(prefs.min_bedrooms, Some(2));
        assert_eq!(prefs.lifestyle.is_smoker, Some(false));
        assert_eq!(prefs.lifestyle.has_pets, Some(true));
        assert_eq!(prefs.lifestyle.cleanliness_level, Some(7));
        assert_eq!(prefs.move_in_date, NaiveDate::from_ymd_opt(2026, 9, 1));
    }

    #[test]
    fn test_explicit_false_and_zero_are_not_unknown() {
        let prefs = normalize(json!({
            "is_smoker": false,
            "has_pets": false,
            "min_bedrooms": 0,
            "budget_min": 0,
        }))
        .unwrap();

        assert_eq!(prefs.lifestyle.is_smoker, Some(false));
        assert_eq!(prefs.lifestyle.has_pets, Some(false));
        assert_eq!(prefs.min_bedrooms, Some(0));
        assert_eq!(prefs.budget_min, Some(0));
    }

    #[test]
    fn test_null_falls_through_to_next_alias() {
        let prefs = normalize(json!({
            "budget_min": null,
            "min_budget": 450,
            "is_smoker": null,
        }))
        .unwrap();

        assert_eq!(prefs.budget_min, Some(450));
        assert_eq!(prefs.lifestyle.is_smoker, None);
    }

    #[test]
    fn test_inverted_budget_is_rejected() {
        let err = normalize(json!({"budget_min": 900, "budget_max": 600})).unwrap_err();
        assert!(matches!(err, MatchError::InvalidPreferences { .. }));
    }

    #[test]
    fn test_negative_budget_is_rejected() {
        assert!(normalize(json!({"budget_max": -10})).is_err());
    }

    #[test]
    fn test_cleanliness_out_of_range_is_rejected() {
        assert!(normalize(json!({"cleanliness_level": 0})).is_err());
        assert!(normalize(json!({"cleanliness_level": 11})).is_err());
    }

    #[test]
    fn test_unparseable_values_are_rejected() {
        assert!(normalize(json!({"is_smoker": "sometimes"})).is_err());
        assert!(normalize(json!({"move_in_date": "next month"})).is_err());
        assert!(normalize(json!({"budget_min": "cheap"})).is_err());
    }

    #[test]
    fn test_cities_are_trimmed_and_deduplicated() {
        let prefs = normalize(json!({
            "preferred_cities": [" Brussels ", "brussels", "", "Ghent"],
        }))
        .unwrap();

        assert_eq!(prefs.preferred_cities, vec!["Brussels", "Ghent"]);
    }

    #[test]
    fn test_comma_separated_city_string() {
        let prefs = normalize(json!({"preferred_neighborhoods": "Ixelles, Etterbeek"})).unwrap();
        assert_eq!(prefs.preferred_cities, vec!["Ixelles", "Etterbeek"]);
    }

    #[test]
    fn test_rfc3339_move_in_date() {
        let prefs = normalize(json!({"move_in_date": "2026-09-01T10:00:00+02:00"})).unwrap();
        assert_eq!(prefs.move_in_date, NaiveDate::from_ymd_opt(2026, 9, 1));
    }

    #[test]
    fn test_blank_strings_count_as_absent() {
        let prefs = normalize(json!({"budget_min": "  ", "preferred_city": ""})).unwrap();
        assert_eq!(prefs.budget_min, None);
        assert!(prefs.preferred_cities.is_empty());
    }
}
