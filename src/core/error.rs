use crate::models::{MatchState, WeightsError};
use crate::services::StoreError;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the matching engine
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Profile not found for searcher {0}")]
    ProfileNotFound(String),

    #[error("Invalid preferences for searcher {searcher_id}: {reason}")]
    InvalidPreferences { searcher_id: String, reason: String },

    #[error("Match not found: {0}")]
    MatchNotFound(Uuid),

    #[error("Match {match_id} cannot be contacted: it is already {state}")]
    AlreadyContacted { match_id: Uuid, state: MatchState },

    #[error("Match {match_id} cannot move from {from} to {to}")]
    InvalidTransition {
        match_id: Uuid,
        from: MatchState,
        to: MatchState,
    },

    #[error("Invalid scoring weights: {0}")]
    InvalidWeights(#[from] WeightsError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl MatchError {
    pub(crate) fn invalid_preferences(searcher_id: &str, reason: impl Into<String>) -> Self {
        MatchError::InvalidPreferences {
            searcher_id: searcher_id.to_string(),
            reason: reason.into(),
        }
    }
}
