use crate::core::{GenerationSummary, MatchInsights, SweepSummary};
use crate::models::domain::Match;
use serde::{Deserialize, Serialize};

/// Response for the generate endpoint
#[derive(Debug, Clone, Serialize)]
pub struct GenerateMatchesResponse {
    #[serde(rename = "searcherId")]
    pub searcher_id: String,
    #[serde(flatten)]
    pub summary: GenerationSummary,
}

/// A match with its presentation insights
#[derive(Debug, Clone, Serialize)]
pub struct MatchResponse {
    #[serde(flatten)]
    pub details: Match,
    pub insights: MatchInsights,
}

impl From<Match> for MatchResponse {
    fn from(details: Match) -> Self {
        let insights = MatchInsights::from_result(&details.criterion_breakdown);
        Self { details, insights }
    }
}

/// Response for the match listing endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ListMatchesResponse {
    pub matches: Vec<MatchResponse>,
    pub total: usize,
}

/// Response for the expiry sweep endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SweepResponse {
    pub examined: usize,
    pub expired: usize,
}

impl From<SweepSummary> for SweepResponse {
    fn from(summary: SweepSummary) -> Self {
        Self {
            examined: summary.examined,
            expired: summary.expired,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
