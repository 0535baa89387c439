use crate::models::{
    CompatibilityResult, ExpiryFilter, ListingFilter, Match, MatchPatch, MatchState, RawListing,
    RawPreferences,
};
use crate::services::stores::{
    ConversationBridge, ListingStore, MatchStore, ProfileStore, StoreError,
};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

const MATCH_COLUMNS: &str = "id, searcher_id, listing_id, owner_id, score, criterion_breakdown, \
     state, created_at, responded_at, conversation_id, closed_at";

/// PostgreSQL client backing every store
///
/// Active-match uniqueness lives in a partial unique index, so concurrent
/// generation runs for the same searcher cannot create duplicates.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

fn match_from_row(row: &PgRow) -> Result<Match, StoreError> {
    let score: i16 = row.try_get("score")?;
    let breakdown: Json<CompatibilityResult> = row.try_get("criterion_breakdown")?;

    Ok(Match {
        id: row.try_get("id")?,
        searcher_id: row.try_get("searcher_id")?,
        listing_id: row.try_get("listing_id")?,
        owner_id: row.try_get("owner_id")?,
        score: u8::try_from(score)
            .map_err(|_| StoreError::InvalidData(format!("score {} out of range", score)))?,
        criterion_breakdown: breakdown.0,
        state: row.try_get("state")?,
        created_at: row.try_get("created_at")?,
        responded_at: row.try_get("responded_at")?,
        conversation_id: row.try_get("conversation_id")?,
        closed_at: row.try_get("closed_at")?,
    })
}

fn listing_from_row(row: &PgRow) -> Result<RawListing, StoreError> {
    Ok(RawListing {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        city: row.try_get("city")?,
        monthly_rent: row.try_get("monthly_rent")?,
        charges: row.try_get("charges")?,
        bedrooms: row.try_get("bedrooms")?,
        furnished: row.try_get("furnished")?,
        smoking_allowed: row.try_get("smoking_allowed")?,
        pets_allowed: row.try_get("pets_allowed")?,
        available_from: row.try_get("available_from")?,
        status: row.try_get("status")?,
        listed_at: row.try_get("listed_at")?,
    })
}

/// Conversation participants in storage order
fn ordered_pair<'a>(user_a: &'a str, user_b: &'a str) -> (&'a str, &'a str) {
    if user_a <= user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    }
}

#[async_trait]
impl ProfileStore for PostgresClient {
    async fn read_preferences(
        &self,
        searcher_id: &str,
    ) -> Result<Option<RawPreferences>, StoreError> {
        let query = r#"
            SELECT preferences
            FROM searcher_profiles
            WHERE searcher_id = $1
        "#;

        let row = sqlx::query(query)
            .bind(searcher_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| -> Result<RawPreferences, StoreError> {
            let blob: Option<Value> = row.try_get("preferences")?;
            Ok(RawPreferences::new(searcher_id, blob.unwrap_or(Value::Null)))
        })
        .transpose()
    }
}

#[async_trait]
impl ListingStore for PostgresClient {
    async fn query_published(&self, filter: &ListingFilter) -> Result<Vec<RawListing>, StoreError> {
        let query = r#"
            SELECT id, owner_id, city, monthly_rent, charges, bedrooms, furnished,
                   smoking_allowed, pets_allowed, available_from, status, listed_at
            FROM listings
            WHERE lower(status) = 'published'
              AND (available_from IS NULL OR available_from <= $1)
            ORDER BY listed_at DESC NULLS LAST, id ASC
            LIMIT $2
            OFFSET $3
        "#;

        let rows = sqlx::query(query)
            .bind(filter.available_by)
            .bind(filter.limit.map(|l| l as i64))
            .bind(filter.offset as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(listing_from_row).collect()
    }
}

#[async_trait]
impl MatchStore for PostgresClient {
    async fn find_active(
        &self,
        searcher_id: &str,
        listing_id: &str,
    ) -> Result<Option<Match>, StoreError> {
        let query = format!(
            "SELECT {} FROM matches \
             WHERE searcher_id = $1 AND listing_id = $2 \
               AND state IN ('generated', 'contacted', 'accepted') \
             LIMIT 1",
            MATCH_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(searcher_id)
            .bind(listing_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn find_latest_terminal(
        &self,
        searcher_id: &str,
        listing_id: &str,
    ) -> Result<Option<Match>, StoreError> {
        let query = format!(
            "SELECT {} FROM matches \
             WHERE searcher_id = $1 AND listing_id = $2 \
               AND state IN ('declined', 'expired') \
             ORDER BY COALESCE(closed_at, created_at) DESC \
             LIMIT 1",
            MATCH_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(searcher_id)
            .bind(listing_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    /// Insert a new match
    ///
    /// Uses ON CONFLICT against the active-pair index; losing the race is
    /// reported as `StoreError::Conflict`.
    async fn insert(&self, new_match: Match) -> Result<Match, StoreError> {
        let query = r#"
            INSERT INTO matches (id, searcher_id, listing_id, owner_id, score,
                                 criterion_breakdown, state, created_at, responded_at,
                                 conversation_id, closed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (searcher_id, listing_id)
                WHERE state IN ('generated', 'contacted', 'accepted')
            DO NOTHING
            RETURNING id
        "#;

        let inserted = sqlx::query(query)
            .bind(new_match.id)
            .bind(&new_match.searcher_id)
            .bind(&new_match.listing_id)
            .bind(&new_match.owner_id)
            .bind(i16::from(new_match.score))
            .bind(Json(new_match.criterion_breakdown.clone()))
            .bind(new_match.state)
            .bind(new_match.created_at)
            .bind(new_match.responded_at)
            .bind(&new_match.conversation_id)
            .bind(new_match.closed_at)
            .fetch_optional(&self.pool)
            .await?;

        if inserted.is_none() {
            return Err(StoreError::Conflict(format!(
                "active match exists for {}/{}",
                new_match.searcher_id, new_match.listing_id
            )));
        }

        tracing::debug!(
            match_id = %new_match.id,
            searcher_id = %new_match.searcher_id,
            listing_id = %new_match.listing_id,
            "Inserted match"
        );

        Ok(new_match)
    }

    async fn update(&self, match_id: Uuid, patch: MatchPatch) -> Result<Match, StoreError> {
        let query = format!(
            "UPDATE matches SET \
                 state = $3, \
                 responded_at = COALESCE($4, responded_at), \
                 conversation_id = COALESCE($5, conversation_id), \
                 closed_at = COALESCE($6, closed_at) \
             WHERE id = $1 AND state = $2 \
             RETURNING {}",
            MATCH_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(match_id)
            .bind(patch.expected_state)
            .bind(patch.state)
            .bind(patch.responded_at)
            .bind(&patch.conversation_id)
            .bind(patch.closed_at)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            return match_from_row(&row);
        }

        // Nothing updated: either the match is gone or its state moved on
        let current = sqlx::query("SELECT state FROM matches WHERE id = $1")
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await?;

        match current {
            Some(row) => {
                let actual: MatchState = row.try_get("state")?;
                Err(StoreError::StaleState {
                    match_id,
                    expected: patch.expected_state,
                    actual,
                })
            }
            None => Err(StoreError::NotFound(match_id.to_string())),
        }
    }

    async fn get(&self, match_id: Uuid) -> Result<Option<Match>, StoreError> {
        let query = format!("SELECT {} FROM matches WHERE id = $1", MATCH_COLUMNS);

        let row = sqlx::query(&query)
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn list_for_searcher(&self, searcher_id: &str) -> Result<Vec<Match>, StoreError> {
        let query = format!(
            "SELECT {} FROM matches \
             WHERE searcher_id = $1 \
             ORDER BY score DESC, created_at DESC",
            MATCH_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(searcher_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn list_overdue(&self, filter: &ExpiryFilter) -> Result<Vec<Match>, StoreError> {
        // Distance past each cutoff orders by deadline across both TTLs
        let query = format!(
            "SELECT {} FROM matches \
             WHERE (state = 'generated' AND created_at < $1) \
                OR (state = 'contacted' AND COALESCE(responded_at, created_at) < $2) \
             ORDER BY CASE WHEN state = 'generated' THEN created_at - $1 \
                           ELSE COALESCE(responded_at, created_at) - $2 END ASC \
             LIMIT $3",
            MATCH_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(filter.generated_before)
            .bind(filter.contacted_before)
            .bind(filter.limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(match_from_row).collect()
    }
}

#[async_trait]
impl ConversationBridge for PostgresClient {
    /// Uses INSERT ... ON CONFLICT so both sides of a race get the same row
    async fn get_or_create(&self, user_a: &str, user_b: &str) -> Result<String, StoreError> {
        let (low, high) = ordered_pair(user_a, user_b);

        let query = r#"
            INSERT INTO conversations (id, participant_low, participant_high)
            VALUES ($1, $2, $3)
            ON CONFLICT (participant_low, participant_high)
            DO UPDATE SET participant_low = EXCLUDED.participant_low
            RETURNING id
        "#;

        let row = sqlx::query(query)
            .bind(Uuid::new_v4().to_string())
            .bind(low)
            .bind(high)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("id")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participants_are_ordered() {
        assert_eq!(ordered_pair("owner-1", "searcher-1"), ("owner-1", "searcher-1"));
        assert_eq!(ordered_pair("searcher-1", "owner-1"), ("owner-1", "searcher-1"));
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn test_missing_profile_reads_as_none() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let client = PostgresClient::from_settings(&url, Some(2), Some(1), None, None)
            .await
            .expect("Failed to connect");

        let prefs = client
            .read_preferences(&format!("missing-{}", Uuid::new_v4()))
            .await
            .unwrap();

        assert!(prefs.is_none());
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn test_published_status_ignores_case() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let client = PostgresClient::from_settings(&url, Some(2), Some(1), None, None)
            .await
            .expect("Failed to connect");

        let id = format!("listing-{}", Uuid::new_v4());
        sqlx::query(
            "INSERT INTO listings (id, owner_id, city, monthly_rent, bedrooms, status) \
             VALUES ($1, 'owner-1', 'Brussels', 650, 2, 'Published')",
        )
        .bind(&id)
        .execute(&client.pool)
        .await
        .unwrap();

        let filter = ListingFilter {
            available_by: chrono::NaiveDate::from_ymd_opt(2100, 1, 1).unwrap(),
            limit: None,
            offset: 0,
        };
        let rows = client.query_published(&filter).await.unwrap();

        assert!(rows.iter().any(|row| row.id == id));
    }
}
