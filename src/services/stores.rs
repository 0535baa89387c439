use crate::models::{ExpiryFilter, ListingFilter, Match, MatchPatch, MatchState, RawListing, RawPreferences};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Errors reported by the storage collaborators
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Match {match_id} is {actual}, expected {expected}")]
    StaleState {
        match_id: Uuid,
        expected: MatchState,
        actual: MatchState,
    },

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

/// Source of raw searcher preference blobs
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `Ok(None)` when the searcher has no profile record at all
    async fn read_preferences(&self, searcher_id: &str)
        -> Result<Option<RawPreferences>, StoreError>;
}

/// Source of published listings
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Publication status is compared case-insensitively. Rows come most
    /// recently listed first, ties broken by id, so pages are stable.
    async fn query_published(&self, filter: &ListingFilter) -> Result<Vec<RawListing>, StoreError>;
}

/// Persistence for matches
///
/// Implementations must reject a second active match for the same
/// `(searcher_id, listing_id)` pair with `StoreError::Conflict`.
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn find_active(
        &self,
        searcher_id: &str,
        listing_id: &str,
    ) -> Result<Option<Match>, StoreError>;

    /// Most recently closed declined/expired match for the pair
    async fn find_latest_terminal(
        &self,
        searcher_id: &str,
        listing_id: &str,
    ) -> Result<Option<Match>, StoreError>;

    async fn insert(&self, new_match: Match) -> Result<Match, StoreError>;

    /// Compare-and-set update; `StaleState` if the stored state moved on
    async fn update(&self, match_id: Uuid, patch: MatchPatch) -> Result<Match, StoreError>;

    async fn get(&self, match_id: Uuid) -> Result<Option<Match>, StoreError>;

    /// All matches of a searcher, highest score first
    async fn list_for_searcher(&self, searcher_id: &str) -> Result<Vec<Match>, StoreError>;

    /// Overdue generated/contacted matches, earliest deadline first
    async fn list_overdue(&self, filter: &ExpiryFilter) -> Result<Vec<Match>, StoreError>;
}

/// Messaging subsystem entry point used on first contact
#[async_trait]
pub trait ConversationBridge: Send + Sync {
    /// Returns the existing conversation between the two users, or creates one
    async fn get_or_create(&self, user_a: &str, user_b: &str) -> Result<String, StoreError>;
}
