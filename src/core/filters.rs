use crate::models::{ListingCandidate, ListingStatus, RawListing};
use chrono::NaiveDate;

/// Check if a listing can be offered at all
///
/// Only publication status and availability matter here; fit is the
/// scorer's job. A listing without an availability date is available now.
#[inline]
pub fn is_eligible(listing: &ListingCandidate, available_by: NaiveDate) -> bool {
    if listing.status != ListingStatus::Published {
        return false;
    }

    match listing.available_from {
        Some(from) => from <= available_by,
        None => true,
    }
}

/// Convert a stored listing row into a candidate
///
/// Rows that cannot describe a real offer (no owner, no city, non-positive
/// rent, unknown status) are rejected with the reason.
pub fn to_candidate(raw: RawListing) -> Result<ListingCandidate, String> {
    let owner_id = non_blank(raw.owner_id).ok_or("missing owner")?;
    let city = non_blank(raw.city).ok_or("missing city")?;

    let monthly_rent = match raw.monthly_rent {
        Some(rent) if rent > 0 => {
            u32::try_from(rent).map_err(|_| format!("rent {} is out of range", rent))?
        }
        Some(rent) => return Err(format!("rent {} is not positive", rent)),
        None => return Err("missing rent".to_string()),
    };

    let charges = match raw.charges {
        Some(c) if c < 0 => return Err(format!("charges {} are negative", c)),
        Some(c) => Some(u32::try_from(c).map_err(|_| format!("charges {} are out of range", c))?),
        None => None,
    };

    let bedrooms = match raw.bedrooms {
        Some(b) => u16::try_from(b).map_err(|_| format!("bedrooms {} are out of range", b))?,
        None => return Err("missing bedrooms".to_string()),
    };

    let status = raw.status.parse::<ListingStatus>()?;

    Ok(ListingCandidate {
        listing_id: raw.id,
        owner_id,
        city,
        monthly_rent,
        charges,
        bedrooms,
        furnished: raw.furnished.unwrap_or(false),
        smoking_allowed: raw.smoking_allowed,
        pets_allowed: raw.pets_allowed,
        available_from: raw.available_from,
        status,
        listed_at: raw.listed_at,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_raw_listing(id: &str) -> RawListing {
        RawListing {
            id: id.to_string(),
            owner_id: Some("owner-1".to_string()),
            city: Some("Brussels".to_string()),
            monthly_rent: Some(650),
            charges: None,
            bedrooms: Some(2),
            furnished: Some(true),
            smoking_allowed: Some(false),
            pets_allowed: None,
            available_from: NaiveDate::from_ymd_opt(2026, 9, 1),
            status: "published".to_string(),
            listed_at: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_well_formed_row_converts() {
        let candidate = to_candidate(create_raw_listing("l1")).unwrap();

        assert_eq!(candidate.listing_id, "l1");
        assert_eq!(candidate.monthly_rent, 650);
        assert_eq!(candidate.status, ListingStatus::Published);
        assert_eq!(candidate.pets_allowed, None);
    }

    #[test]
    fn test_non_positive_rent_is_rejected() {
        let mut raw = create_raw_listing("l1");
        raw.monthly_rent = Some(0);
        assert!(to_candidate(raw).is_err());
    }

    #[test]
    fn test_blank_city_is_rejected() {
        let mut raw = create_raw_listing("l1");
        raw.city = Some("   ".to_string());
        assert!(to_candidate(raw).is_err());
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let mut raw = create_raw_listing("l1");
        raw.status = "live".to_string();
        assert!(to_candidate(raw).is_err());
    }

    #[test]
    fn test_unpublished_listing_not_eligible() {
        let mut candidate = to_candidate(create_raw_listing("l1")).unwrap();
        candidate.status = ListingStatus::Draft;

        assert!(!is_eligible(&candidate, date(2026, 12, 31)));
    }

    #[test]
    fn test_future_availability_respects_cutoff() {
        let candidate = to_candidate(create_raw_listing("l1")).unwrap();

        assert!(is_eligible(&candidate, date(2026, 9, 1)));
        assert!(!is_eligible(&candidate, date(2026, 8, 31)));
    }

    #[test]
    fn test_missing_availability_is_eligible() {
        let mut raw = create_raw_listing("l1");
        raw.available_from = None;
        let candidate = to_candidate(raw).unwrap();

        assert!(is_eligible(&candidate, date(2020, 1, 1)));
    }
}
