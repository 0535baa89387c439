use crate::models::{
    CompatibilityResult, Confidence, Criterion, CriterionScore, ListingCandidate, ScoringWeights,
    SearcherPreferences, WeightsError,
};
use chrono::{Duration, NaiveDate};

/// Budget decays to zero this far (as a fraction of the bound) outside the range
const BUDGET_DECAY_SPAN: f64 = 0.5;

/// Points lost per bedroom short of the minimum
const BEDROOM_PENALTY: f64 = 25.0;

/// Days after the desired move-in date that still count as on time
const MOVE_IN_GRACE_DAYS: i64 = 30;

/// Days past the grace period over which the move-in score decays to zero
const MOVE_IN_DECAY_DAYS: f64 = 60.0;

/// Neutral score used when the input for a criterion is unknown
pub fn default_score(criterion: Criterion) -> f64 {
    match criterion {
        Criterion::Budget => 60.0,
        Criterion::City => 70.0,
        Criterion::Bedrooms => 70.0,
        Criterion::Smoking => 60.0,
        Criterion::Pets => 60.0,
        Criterion::MoveIn => 60.0,
    }
}

/// Compatibility scorer with validated weights
#[derive(Debug, Clone)]
pub struct Scorer {
    weights: ScoringWeights,
}

impl Scorer {
    pub fn new(weights: ScoringWeights) -> Result<Self, WeightsError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn with_default_weights() -> Self {
        Self {
            weights: ScoringWeights::default(),
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score a candidate against a searcher's preferences
    pub fn score(
        &self,
        preferences: &SearcherPreferences,
        candidate: &ListingCandidate,
    ) -> CompatibilityResult {
        calculate_compatibility(preferences, candidate, &self.weights)
    }

    /// Overall score of a profile with no known preferences
    pub fn neutral_baseline(&self) -> u8 {
        let total: f64 = Criterion::ALL
            .iter()
            .map(|c| default_score(*c) * self.weights.weight_for(*c))
            .sum();
        round_half_up(total / self.weights.sum())
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::with_default_weights()
    }
}

/// Calculate a compatibility result (0-100) for a listing
///
/// Scoring formula:
/// overall = (
///     budget * 0.30 +      # total monthly cost within budget range
///     city * 0.20 +        # listing city among preferred cities
///     bedrooms * 0.15 +    # at least the minimum bedrooms
///     smoking * 0.10 +     # smoker status matches house rule
///     pets * 0.10 +        # pet ownership matches house rule
///     move_in * 0.15       # available by the desired move-in date
/// )
///
/// Criteria whose input is unknown get a fixed neutral score and are tagged
/// `Confidence::Default`.
pub fn calculate_compatibility(
    preferences: &SearcherPreferences,
    candidate: &ListingCandidate,
    weights: &ScoringWeights,
) -> CompatibilityResult {
    let criterion_scores: Vec<CriterionScore> = Criterion::ALL
        .iter()
        .map(|&criterion| {
            let (score, confidence) = match criterion {
                Criterion::Budget => budget_score(
                    preferences.budget_min,
                    preferences.budget_max,
                    candidate.total_monthly_cost(),
                ),
                Criterion::City => city_score(&preferences.preferred_cities, &candidate.city),
                Criterion::Bedrooms => bedrooms_score(preferences.min_bedrooms, candidate.bedrooms),
                Criterion::Smoking => boolean_score(
                    Criterion::Smoking,
                    preferences.lifestyle.is_smoker,
                    candidate.smoking_allowed,
                ),
                Criterion::Pets => boolean_score(
                    Criterion::Pets,
                    preferences.lifestyle.has_pets,
                    candidate.pets_allowed,
                ),
                Criterion::MoveIn => move_in_score(preferences.move_in_date, candidate.available_from),
            };

            CriterionScore {
                criterion,
                score,
                weight: weights.weight_for(criterion),
                confidence,
            }
        })
        .collect();

    let overall_score = weighted_overall(&criterion_scores);

    CompatibilityResult {
        overall_score,
        criterion_scores,
    }
}

fn fallback(criterion: Criterion) -> (f64, Confidence) {
    (default_score(criterion), Confidence::Default)
}

/// Budget score (0-100)
/// Full marks inside the range, linear decay to zero at 50% beyond either bound
#[inline]
fn budget_score(min: Option<u32>, max: Option<u32>, cost: u32) -> (f64, Confidence) {
    if min.is_none() && max.is_none() {
        return fallback(Criterion::Budget);
    }

    let cost = cost as f64;

    if let Some(max) = max.map(f64::from) {
        if cost > max {
            return (relative_decay(cost - max, max), Confidence::Exact);
        }
    }

    if let Some(min) = min.map(f64::from) {
        if cost < min {
            return (relative_decay(min - cost, min), Confidence::Exact);
        }
    }

    (100.0, Confidence::Exact)
}

#[inline]
fn relative_decay(distance: f64, bound: f64) -> f64 {
    if bound <= 0.0 {
        return 0.0;
    }
    let ratio = distance / (bound * BUDGET_DECAY_SPAN);
    (100.0 * (1.0 - ratio)).clamp(0.0, 100.0)
}

/// City score (0-100)
/// No preferred city means no preference, not a penalty
#[inline]
fn city_score(preferred: &[String], city: &str) -> (f64, Confidence) {
    if preferred.is_empty() {
        return fallback(Criterion::City);
    }

    let city = city.trim().to_lowercase();
    let matched = preferred.iter().any(|p| p.trim().to_lowercase() == city);

    (if matched { 100.0 } else { 0.0 }, Confidence::Exact)
}

/// Bedrooms score (0-100)
#[inline]
fn bedrooms_score(min_bedrooms: Option<u16>, bedrooms: u16) -> (f64, Confidence) {
    let Some(min) = min_bedrooms else {
        return fallback(Criterion::Bedrooms);
    };

    if bedrooms >= min {
        return (100.0, Confidence::Exact);
    }

    let missing = f64::from(min - bedrooms);
    ((100.0 - missing * BEDROOM_PENALTY).max(0.0), Confidence::Exact)
}

/// House-rule score (0-100) for smoking and pets
/// Both sides must be known; they must agree boolean-for-boolean
#[inline]
fn boolean_score(
    criterion: Criterion,
    searcher: Option<bool>,
    listing: Option<bool>,
) -> (f64, Confidence) {
    match (searcher, listing) {
        (Some(a), Some(b)) => (if a == b { 100.0 } else { 0.0 }, Confidence::Exact),
        _ => fallback(criterion),
    }
}

/// Move-in score (0-100)
/// On time up to 30 days after the desired date, then linear decay over 60 days
#[inline]
fn move_in_score(move_in: Option<NaiveDate>, available_from: Option<NaiveDate>) -> (f64, Confidence) {
    let Some(move_in) = move_in else {
        return fallback(Criterion::MoveIn);
    };

    // No availability date means available immediately
    let Some(available_from) = available_from else {
        return (100.0, Confidence::Exact);
    };

    let deadline = move_in + Duration::days(MOVE_IN_GRACE_DAYS);
    if available_from <= deadline {
        return (100.0, Confidence::Exact);
    }

    let late_days = (available_from - deadline).num_days() as f64;
    let score = (100.0 * (1.0 - late_days / MOVE_IN_DECAY_DAYS)).clamp(0.0, 100.0);
    (score, Confidence::Exact)
}

/// Weighted mean of criterion scores, rounded half-up to an integer in [0, 100]
fn weighted_overall(scores: &[CriterionScore]) -> u8 {
    let total_weight: f64 = scores.iter().map(|s| s.weight).sum();
    if total_weight <= 0.0 {
        return 0;
    }

    let weighted: f64 = scores.iter().map(|s| s.score * s.weight).sum();
    round_half_up(weighted / total_weight)
}

/// Round half-up, clamped to [0, 100]
///
/// The epsilon absorbs binary representation error so that e.g. 63.5 computed
/// as 63.499999999 still rounds up.
pub fn round_half_up(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    (value + 0.5 + 1e-9).floor().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Lifestyle, ListingStatus};

    fn create_test_candidate(rent: u32, city: &str, bedrooms: u16) -> ListingCandidate {
        ListingCandidate {
            listing_id: "listing-1".to_string(),
            owner_id: "owner-1".to_string(),
            city: city.to_string(),
            monthly_rent: rent,
            charges: None,
            bedrooms,
            furnished: true,
            smoking_allowed: Some(false),
            pets_allowed: None,
            available_from: None,
            status: ListingStatus::Published,
            listed_at: None,
        }
    }

    fn create_test_preferences() -> SearcherPreferences {
        SearcherPreferences {
            searcher_id: "searcher-1".to_string(),
            budget_min: Some(500),
            budget_max: Some(800),
            preferred_cities: vec!["Brussels".to_string()],
            min_bedrooms: Some(2),
            lifestyle: Lifestyle {
                is_smoker: Some(false),
                has_pets: None,
                cleanliness_level: None,
            },
            move_in_date: None,
        }
    }

    #[test]
    fn test_budget_score() {
        // Inside range = full score
        assert_eq!(budget_score(Some(500), Some(800), 650), (100.0, Confidence::Exact));

        // 25% over max = half score
        assert_eq!(budget_score(Some(500), Some(800), 1000).0, 50.0);

        // 50% over max = zero
        assert_eq!(budget_score(Some(500), Some(800), 1200).0, 0.0);

        // 20% under min = 60
        assert!((budget_score(Some(500), Some(800), 400).0 - 60.0).abs() < 1e-9);

        // Unknown budget = neutral default
        assert_eq!(budget_score(None, None, 650), (60.0, Confidence::Default));
    }

    #[test]
    fn test_budget_with_single_bound() {
        assert_eq!(budget_score(None, Some(800), 100).0, 100.0);
        assert_eq!(budget_score(Some(500), None, 5000).0, 100.0);
        assert_eq!(budget_score(None, Some(0), 100).0, 0.0);
    }

    #[test]
    fn test_city_score_is_case_insensitive() {
        let preferred = vec!["Brussels".to_string()];
        assert_eq!(city_score(&preferred, " brussels").0, 100.0);
        assert_eq!(city_score(&preferred, "Ghent").0, 0.0);
        assert_eq!(city_score(&[], "Ghent"), (70.0, Confidence::Default));
    }

    #[test]
    fn test_bedrooms_score() {
        assert_eq!(bedrooms_score(Some(2), 3).0, 100.0);
        assert_eq!(bedrooms_score(Some(3), 2).0, 75.0);
        assert_eq!(bedrooms_score(Some(6), 1).0, 0.0);
        assert_eq!(bedrooms_score(Some(0), 0), (100.0, Confidence::Exact));
        assert_eq!(bedrooms_score(None, 1), (70.0, Confidence::Default));
    }

    #[test]
    fn test_boolean_score() {
        assert_eq!(boolean_score(Criterion::Smoking, Some(false), Some(false)).0, 100.0);
        assert_eq!(boolean_score(Criterion::Smoking, Some(true), Some(true)).0, 100.0);
        assert_eq!(boolean_score(Criterion::Smoking, Some(false), Some(true)).0, 0.0);
        assert_eq!(boolean_score(Criterion::Pets, Some(true), Some(false)).0, 0.0);
        assert_eq!(
            boolean_score(Criterion::Pets, Some(true), None),
            (60.0, Confidence::Default)
        );
    }

    #[test]
    fn test_move_in_score() {
        let move_in = NaiveDate::from_ymd_opt(2026, 9, 1);

        // Within 30 days of the desired date
        let on_time = NaiveDate::from_ymd_opt(2026, 10, 1);
        assert_eq!(move_in_score(move_in, on_time).0, 100.0);

        // 30 days past the grace period = half score
        let late = NaiveDate::from_ymd_opt(2026, 10, 31);
        assert_eq!(move_in_score(move_in, late).0, 50.0);

        // Far too late
        let very_late = NaiveDate::from_ymd_opt(2027, 3, 1);
        assert_eq!(move_in_score(move_in, very_late).0, 0.0);

        assert_eq!(move_in_score(move_in, None).0, 100.0);
        assert_eq!(move_in_score(None, on_time), (60.0, Confidence::Default));
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(63.5), 64);
        assert_eq!(round_half_up(63.49), 63);
        assert_eq!(round_half_up(0.5), 1);
        assert_eq!(round_half_up(-3.0), 0);
        assert_eq!(round_half_up(140.0), 100);
        assert_eq!(round_half_up(f64::NAN), 0);
    }

    #[test]
    fn test_calculate_compatibility_example() {
        let scorer = Scorer::with_default_weights();
        let result = scorer.score(
            &create_test_preferences(),
            &create_test_candidate(650, "Brussels", 2),
        );

        assert_eq!(result.overall_score, 90);
        assert_eq!(result.criterion_scores.len(), 6);
        assert_eq!(result.get(Criterion::Pets).unwrap().confidence, Confidence::Default);
        assert_eq!(result.get(Criterion::MoveIn).unwrap().score, 60.0);
    }

    #[test]
    fn test_charges_count_toward_budget() {
        let scorer = Scorer::with_default_weights();
        let mut candidate = create_test_candidate(780, "Brussels", 2);
        candidate.charges = Some(220);

        let result = scorer.score(&create_test_preferences(), &candidate);

        // 1000 total is 25% over the 800 max
        assert_eq!(result.get(Criterion::Budget).unwrap().score, 50.0);
    }

    #[test]
    fn test_neutral_baseline() {
        assert_eq!(Scorer::with_default_weights().neutral_baseline(), 64);
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let weights = ScoringWeights {
            budget: 0.9,
            ..ScoringWeights::default()
        };
        assert!(Scorer::new(weights).is_err());
    }
}
