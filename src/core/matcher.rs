use crate::core::{
    clock::Clock,
    error::MatchError,
    fetcher::CandidateFetcher,
    lifecycle::ExpiryPolicy,
    preferences::ProfileReader,
    scoring::Scorer,
};
use crate::models::{CompatibilityResult, ListingCandidate, Match};
use crate::services::{MatchStore, NotificationEvent, Notifier, StoreError};
use chrono::Duration;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Generation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationSettings {
    /// Candidates scoring below this are dropped
    pub min_score_threshold: u8,
    /// How long a declined or expired pair stays out of new runs
    pub regeneration_cooldown: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            min_score_threshold: 40,
            regeneration_cooldown: Duration::days(30),
        }
    }
}

/// Per-call overrides for one generation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    pub min_score_threshold: Option<u8>,
    pub candidate_cap: Option<usize>,
}

/// Outcome counts of one generation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerationSummary {
    pub created: usize,
    pub skipped: usize,
    pub scored: usize,
    #[serde(rename = "belowThreshold")]
    pub below_threshold: usize,
}

/// Why a scored candidate did not become a new match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PersistOutcome {
    Created,
    ActiveExists,
    CoolingDown,
    LostRace,
}

/// Match generation orchestrator
///
/// # Pipeline Stages
/// 1. Preference normalization
/// 2. Candidate fetch (publication and availability only)
/// 3. Scoring and threshold
/// 4. Deduplication against existing matches
/// 5. Persistence of survivors as `generated`
///
/// Dropping the returned future between candidates is safe; matches already
/// persisted stay valid.
#[derive(Clone)]
pub struct MatchGenerator {
    reader: ProfileReader,
    fetcher: CandidateFetcher,
    scorer: Scorer,
    matches: Arc<dyn MatchStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    expiry: ExpiryPolicy,
    settings: GenerationSettings,
}

impl MatchGenerator {
    pub fn new(
        reader: ProfileReader,
        fetcher: CandidateFetcher,
        scorer: Scorer,
        matches: Arc<dyn MatchStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reader,
            fetcher,
            scorer,
            matches,
            notifier,
            clock,
            expiry: ExpiryPolicy::default(),
            settings: GenerationSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_expiry(mut self, expiry: ExpiryPolicy) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Create new matches for a searcher
    ///
    /// Only preference and fetch failures abort the run. Anything going wrong
    /// for a single candidate is counted as skipped.
    pub async fn generate(
        &self,
        searcher_id: &str,
        options: Option<GenerateOptions>,
    ) -> Result<GenerationSummary, MatchError> {
        let options = options.unwrap_or_default();
        let threshold = options
            .min_score_threshold
            .unwrap_or(self.settings.min_score_threshold);
        let cap = options
            .candidate_cap
            .or(self.fetcher.settings().candidate_cap);

        let preferences = self.reader.read(searcher_id).await?;
        let candidates = self.fetcher.fetch_with_cap(&preferences, cap).await?;

        let mut summary = GenerationSummary::default();

        for candidate in candidates {
            let result = self.scorer.score(&preferences, &candidate);
            summary.scored += 1;

            if result.overall_score < threshold {
                summary.below_threshold += 1;
                tracing::debug!(
                    searcher_id = %searcher_id,
                    listing_id = %candidate.listing_id,
                    score = result.overall_score,
                    "Below threshold"
                );
                continue;
            }

            match self.persist(searcher_id, &candidate, result).await {
                Ok(PersistOutcome::Created) => summary.created += 1,
                Ok(outcome) => {
                    summary.skipped += 1;
                    tracing::debug!(
                        searcher_id = %searcher_id,
                        listing_id = %candidate.listing_id,
                        outcome = ?outcome,
                        "Skipped candidate"
                    );
                }
                Err(e) => {
                    summary.skipped += 1;
                    tracing::warn!(
                        searcher_id = %searcher_id,
                        listing_id = %candidate.listing_id,
                        "Failed to persist match: {}",
                        e
                    );
                }
            }
        }

        tracing::info!(
            searcher_id = %searcher_id,
            created = summary.created,
            skipped = summary.skipped,
            scored = summary.scored,
            below_threshold = summary.below_threshold,
            "Match generation finished"
        );

        if summary.created > 0 {
            self.notifier.notify(
                searcher_id,
                NotificationEvent::MatchesGenerated,
                json!({ "created": summary.created }),
            );
        }

        Ok(summary)
    }

    async fn persist(
        &self,
        searcher_id: &str,
        candidate: &ListingCandidate,
        result: CompatibilityResult,
    ) -> Result<PersistOutcome, StoreError> {
        let now = self.clock.now();

        if let Some(active) = self
            .matches
            .find_active(searcher_id, &candidate.listing_id)
            .await?
        {
            // An overdue open match is expired first and then treated as terminal
            let current = self.expiry.apply(self.matches.as_ref(), active, now).await?;
            if current.state.is_active() {
                return Ok(PersistOutcome::ActiveExists);
            }
        }

        if let Some(terminal) = self
            .matches
            .find_latest_terminal(searcher_id, &candidate.listing_id)
            .await?
        {
            let closed_at = terminal.closed_at.unwrap_or(terminal.created_at);
            if now - closed_at < self.settings.regeneration_cooldown {
                return Ok(PersistOutcome::CoolingDown);
            }
        }

        let new_match = Match::generated(searcher_id, candidate, result, now);
        match self.matches.insert(new_match).await {
            Ok(created) => {
                tracing::debug!(
                    match_id = %created.id,
                    listing_id = %created.listing_id,
                    score = created.score,
                    "Created match"
                );
                Ok(PersistOutcome::Created)
            }
            // Another run created the pair first
            Err(StoreError::Conflict(_)) => Ok(PersistOutcome::LostRace),
            Err(e) => Err(e),
        }
    }
}
