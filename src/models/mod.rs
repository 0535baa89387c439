// Model exports
pub mod domain;
pub mod raw;
pub mod requests;
pub mod responses;

pub use domain::{
    CompatibilityResult, Confidence, Criterion, CriterionScore, Decision, Lifestyle,
    ListingCandidate, ListingStatus, Match, MatchPatch, MatchState, Party, ScoringWeights,
    SearcherPreferences, WeightsError, WEIGHT_SUM_TOLERANCE,
};
pub use raw::{ExpiryFilter, ListingFilter, RawListing, RawPreferences};
pub use requests::{GenerateMatchesRequest, ListMatchesQuery, RespondRequest, SweepRequest};
pub use responses::{
    ErrorResponse, GenerateMatchesResponse, HealthResponse, ListMatchesResponse, MatchResponse,
    SweepResponse,
};
