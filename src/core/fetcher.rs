use crate::core::clock::Clock;
use crate::core::error::MatchError;
use crate::core::filters::{is_eligible, to_candidate};
use crate::models::{ListingCandidate, ListingFilter, RawListing, SearcherPreferences};
use crate::services::ListingStore;
use chrono::{Duration, NaiveDate};
use std::sync::Arc;

/// Candidate fetch settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    /// How far ahead of today a listing may become available
    pub grace_window: Duration,
    /// Soft cap on candidates per run, most recently listed first
    pub candidate_cap: Option<usize>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            grace_window: Duration::zero(),
            candidate_cap: Some(500),
        }
    }
}

/// Retrieves the pool of listings that may be offered to a searcher
#[derive(Clone)]
pub struct CandidateFetcher {
    store: Arc<dyn ListingStore>,
    clock: Arc<dyn Clock>,
    settings: FetchSettings,
}

impl CandidateFetcher {
    pub fn new(store: Arc<dyn ListingStore>, clock: Arc<dyn Clock>, settings: FetchSettings) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Fetch eligible candidates with the configured cap
    pub async fn fetch_candidates(
        &self,
        preferences: &SearcherPreferences,
    ) -> Result<Vec<ListingCandidate>, MatchError> {
        self.fetch_with_cap(preferences, self.settings.candidate_cap)
            .await
    }

    /// Fetch eligible candidates with an explicit cap
    ///
    /// Fit is not considered; only publication, availability and ownership.
    /// The cap counts usable candidates: rows dropped as malformed or owned by
    /// the searcher are made up for by reading further pages.
    pub async fn fetch_with_cap(
        &self,
        preferences: &SearcherPreferences,
        cap: Option<usize>,
    ) -> Result<Vec<ListingCandidate>, MatchError> {
        let available_by = (self.clock.now() + self.settings.grace_window).date_naive();

        let mut candidates: Vec<ListingCandidate> = Vec::new();
        let mut offset = 0;

        loop {
            let filter = ListingFilter {
                available_by,
                limit: cap,
                offset,
            };

            let rows = self.store.query_published(&filter).await?;
            let fetched = rows.len();
            offset += fetched;

            candidates.extend(
                rows.into_iter()
                    .filter_map(|raw| usable_candidate(raw, available_by, &preferences.searcher_id)),
            );

            // A short page means the catalog is exhausted
            match cap {
                Some(cap) if fetched == cap && candidates.len() < cap => continue,
                _ => break,
            }
        }

        // Most recently listed first, then by id for a stable order
        candidates.sort_by(|a, b| {
            b.listed_at
                .cmp(&a.listed_at)
                .then_with(|| a.listing_id.cmp(&b.listing_id))
        });

        if let Some(cap) = cap {
            candidates.truncate(cap);
        }

        tracing::debug!(
            searcher_id = %preferences.searcher_id,
            rows = offset,
            candidates = candidates.len(),
            "Fetched listing candidates"
        );

        Ok(candidates)
    }
}

fn usable_candidate(
    raw: RawListing,
    available_by: NaiveDate,
    searcher_id: &str,
) -> Option<ListingCandidate> {
    let listing_id = raw.id.clone();
    let candidate = match to_candidate(raw) {
        Ok(candidate) => candidate,
        Err(reason) => {
            tracing::warn!(listing_id = %listing_id, "Skipping malformed listing: {}", reason);
            return None;
        }
    };

    // Exclude the searcher's own listings
    (is_eligible(&candidate, available_by) && candidate.owner_id != searcher_id).then_some(candidate)
}
