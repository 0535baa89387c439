use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Lifestyle attributes declared by a searcher
///
/// `None` means the searcher never answered, which is not the same as an
/// explicit `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifestyle {
    #[serde(rename = "isSmoker")]
    pub is_smoker: Option<bool>,
    #[serde(rename = "hasPets")]
    pub has_pets: Option<bool>,
    #[serde(rename = "cleanlinessLevel")]
    pub cleanliness_level: Option<u8>,
}

/// Canonical searcher preferences, produced once by the profile reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearcherPreferences {
    #[serde(rename = "searcherId")]
    pub searcher_id: String,
    #[serde(rename = "budgetMin")]
    pub budget_min: Option<u32>,
    #[serde(rename = "budgetMax")]
    pub budget_max: Option<u32>,
    #[serde(rename = "preferredCities", default)]
    pub preferred_cities: Vec<String>,
    #[serde(rename = "minBedrooms")]
    pub min_bedrooms: Option<u16>,
    #[serde(default)]
    pub lifestyle: Lifestyle,
    #[serde(rename = "moveInDate")]
    pub move_in_date: Option<NaiveDate>,
}

impl SearcherPreferences {
    /// Preferences with every field unknown
    pub fn unknown(searcher_id: impl Into<String>) -> Self {
        Self {
            searcher_id: searcher_id.into(),
            budget_min: None,
            budget_max: None,
            preferred_cities: Vec::new(),
            min_bedrooms: None,
            lifestyle: Lifestyle::default(),
            move_in_date: None,
        }
    }

    pub fn has_budget(&self) -> bool {
        self.budget_min.is_some() || self.budget_max.is_some()
    }
}

/// Publication status of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Draft,
    Published,
    Paused,
    Rented,
    Archived,
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ListingStatus::Draft => "draft",
            ListingStatus::Published => "published",
            ListingStatus::Paused => "paused",
            ListingStatus::Rented => "rented",
            ListingStatus::Archived => "archived",
        };
        f.write_str(s)
    }
}

impl FromStr for ListingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(ListingStatus::Draft),
            "published" => Ok(ListingStatus::Published),
            "paused" => Ok(ListingStatus::Paused),
            "rented" => Ok(ListingStatus::Rented),
            "archived" => Ok(ListingStatus::Archived),
            other => Err(format!("unknown listing status: {}", other)),
        }
    }
}

/// A property listing eligible to be scored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingCandidate {
    #[serde(rename = "listingId")]
    pub listing_id: String,
    #[serde(rename = "ownerId")]
    pub owner_id: String,
    pub city: String,
    #[serde(rename = "monthlyRent")]
    pub monthly_rent: u32,
    #[serde(default)]
    pub charges: Option<u32>,
    pub bedrooms: u16,
    #[serde(default)]
    pub furnished: bool,
    #[serde(rename = "smokingAllowed")]
    pub smoking_allowed: Option<bool>,
    #[serde(rename = "petsAllowed")]
    pub pets_allowed: Option<bool>,
    #[serde(rename = "availableFrom")]
    pub available_from: Option<NaiveDate>,
    pub status: ListingStatus,
    #[serde(rename = "listedAt", default)]
    pub listed_at: Option<DateTime<Utc>>,
}

impl ListingCandidate {
    /// Rent plus service charges
    pub fn total_monthly_cost(&self) -> u32 {
        self.monthly_rent.saturating_add(self.charges.unwrap_or(0))
    }
}

/// One independently weighted dimension of compatibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Budget,
    City,
    Bedrooms,
    Smoking,
    Pets,
    MoveIn,
}

impl Criterion {
    /// All criteria in breakdown order
    pub const ALL: [Criterion; 6] = [
        Criterion::Budget,
        Criterion::City,
        Criterion::Bedrooms,
        Criterion::Smoking,
        Criterion::Pets,
        Criterion::MoveIn,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Criterion::Budget => "budget",
            Criterion::City => "city",
            Criterion::Bedrooms => "bedrooms",
            Criterion::Smoking => "smoking",
            Criterion::Pets => "pets",
            Criterion::MoveIn => "move_in",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a criterion was scored from real input or from the neutral fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Exact,
    Default,
}

/// Score of a single criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub criterion: Criterion,
    pub score: f64,
    pub weight: f64,
    pub confidence: Confidence,
}

/// Output of the compatibility scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityResult {
    #[serde(rename = "overallScore")]
    pub overall_score: u8,
    #[serde(rename = "criterionScores")]
    pub criterion_scores: Vec<CriterionScore>,
}

impl CompatibilityResult {
    pub fn get(&self, criterion: Criterion) -> Option<&CriterionScore> {
        self.criterion_scores.iter().find(|c| c.criterion == criterion)
    }

    /// Number of criteria scored from real input
    pub fn exact_count(&self) -> usize {
        self.criterion_scores
            .iter()
            .filter(|c| c.confidence == Confidence::Exact)
            .count()
    }
}

/// Lifecycle state of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "match_state", rename_all = "lowercase")]
pub enum MatchState {
    Generated,
    Contacted,
    Accepted,
    Declined,
    Expired,
}

impl MatchState {
    pub const ALL: [MatchState; 5] = [
        MatchState::Generated,
        MatchState::Contacted,
        MatchState::Accepted,
        MatchState::Declined,
        MatchState::Expired,
    ];

    /// Active matches count toward the per-pair uniqueness rule
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            MatchState::Generated | MatchState::Contacted | MatchState::Accepted
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchState::Declined | MatchState::Expired)
    }

    /// States that can still expire on a TTL
    pub fn is_open(&self) -> bool {
        matches!(self, MatchState::Generated | MatchState::Contacted)
    }

    pub fn allowed_transitions(&self) -> &'static [MatchState] {
        match self {
            MatchState::Generated => &[MatchState::Contacted, MatchState::Expired],
            MatchState::Contacted => &[
                MatchState::Accepted,
                MatchState::Declined,
                MatchState::Expired,
            ],
            MatchState::Accepted | MatchState::Declined | MatchState::Expired => &[],
        }
    }

    pub fn can_transition_to(&self, target: MatchState) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchState::Generated => "generated",
            MatchState::Contacted => "contacted",
            MatchState::Accepted => "accepted",
            MatchState::Declined => "declined",
            MatchState::Expired => "expired",
        }
    }
}

impl fmt::Display for MatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generated" => Ok(MatchState::Generated),
            "contacted" => Ok(MatchState::Contacted),
            "accepted" => Ok(MatchState::Accepted),
            "declined" => Ok(MatchState::Declined),
            "expired" => Ok(MatchState::Expired),
            other => Err(format!("unknown match state: {}", other)),
        }
    }
}

/// Persisted association between one searcher and one listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    #[serde(rename = "searcherId")]
    pub searcher_id: String,
    #[serde(rename = "listingId")]
    pub listing_id: String,
    #[serde(rename = "ownerId")]
    pub owner_id: String,
    pub score: u8,
    #[serde(rename = "criterionBreakdown")]
    pub criterion_breakdown: CompatibilityResult,
    pub state: MatchState,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "respondedAt")]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(rename = "conversationId")]
    pub conversation_id: Option<String>,
    #[serde(rename = "closedAt")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Match {
    /// New match in the `generated` state
    pub fn generated(
        searcher_id: &str,
        candidate: &ListingCandidate,
        result: CompatibilityResult,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            searcher_id: searcher_id.to_string(),
            listing_id: candidate.listing_id.clone(),
            owner_id: candidate.owner_id.clone(),
            score: result.overall_score,
            criterion_breakdown: result,
            state: MatchState::Generated,
            created_at: now,
            responded_at: None,
            conversation_id: None,
            closed_at: None,
        }
    }
}

/// State change applied through `MatchStore::update`
///
/// The update only lands if the stored state still equals `expected_state`.
/// `None` fields leave the stored value untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPatch {
    pub expected_state: MatchState,
    pub state: MatchState,
    pub responded_at: Option<DateTime<Utc>>,
    pub conversation_id: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl MatchPatch {
    pub fn transition(from: MatchState, to: MatchState) -> Self {
        Self {
            expected_state: from,
            state: to,
            responded_at: None,
            conversation_id: None,
            closed_at: None,
        }
    }

    /// Apply the patch to an in-memory copy
    pub fn apply_to(&self, m: &mut Match) {
        m.state = self.state;
        if let Some(at) = self.responded_at {
            m.responded_at = Some(at);
        }
        if let Some(conversation_id) = &self.conversation_id {
            m.conversation_id = Some(conversation_id.clone());
        }
        if let Some(at) = self.closed_at {
            m.closed_at = Some(at);
        }
    }
}

/// The party responding to a contacted match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    Searcher,
    Owner,
}

/// Resolution of a contacted match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Decline,
}

impl Decision {
    pub fn target_state(&self) -> MatchState {
        match self {
            Decision::Accept => MatchState::Accepted,
            Decision::Decline => MatchState::Declined,
        }
    }
}

/// Errors raised by weight validation
#[derive(Debug, Error, PartialEq)]
pub enum WeightsError {
    #[error("Weight for {criterion} must be finite and non-negative, got {value}")]
    InvalidWeight { criterion: Criterion, value: f64 },

    #[error("Weights must sum to 1.0, got {sum}")]
    BadSum { sum: f64 },
}

/// Tolerance on the weight sum
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Scoring weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub budget: f64,
    pub city: f64,
    pub bedrooms: f64,
    pub smoking: f64,
    pub pets: f64,
    #[serde(rename = "moveIn")]
    pub move_in: f64,
}

impl ScoringWeights {
    pub fn weight_for(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Budget => self.budget,
            Criterion::City => self.city,
            Criterion::Bedrooms => self.bedrooms,
            Criterion::Smoking => self.smoking,
            Criterion::Pets => self.pets,
            Criterion::MoveIn => self.move_in,
        }
    }

    pub fn sum(&self) -> f64 {
        Criterion::ALL.iter().map(|c| self.weight_for(*c)).sum()
    }

    /// Each weight finite and non-negative, total 1.0 within tolerance
    pub fn validate(&self) -> Result<(), WeightsError> {
        for criterion in Criterion::ALL {
            let value = self.weight_for(criterion);
            if !value.is_finite() || value < 0.0 {
                return Err(WeightsError::InvalidWeight { criterion, value });
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(WeightsError::BadSum { sum });
        }

        Ok(())
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            budget: 0.30,
            city: 0.20,
            bedrooms: 0.15,
            smoking: 0.10,
            pets: 0.10,
            move_in: 0.15,
        }
    }
}
