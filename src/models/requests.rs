use crate::models::domain::{Decision, Party};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to generate matches for a searcher
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateMatchesRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "searcher_id", rename = "searcherId")]
    pub searcher_id: String,
    #[validate(range(max = 100))]
    #[serde(default, alias = "min_score_threshold", rename = "minScoreThreshold")]
    pub min_score_threshold: Option<u8>,
    #[validate(range(min = 1, max = 1000))]
    #[serde(default, alias = "candidate_cap", rename = "candidateCap")]
    pub candidate_cap: Option<usize>,
}

/// Query string of the match listing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ListMatchesQuery {
    #[validate(length(min = 1))]
    #[serde(alias = "searcher_id", rename = "searcherId")]
    pub searcher_id: String,
}

/// Accept or decline a contacted match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondRequest {
    pub decision: Decision,
    pub by: Party,
}

/// Request to run one expiry sweep
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SweepRequest {
    #[validate(range(min = 1, max = 10000))]
    #[serde(default)]
    pub batch: Option<usize>,
}
