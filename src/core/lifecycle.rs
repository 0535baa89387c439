use crate::core::clock::Clock;
use crate::core::error::MatchError;
use crate::models::{Decision, ExpiryFilter, Match, MatchPatch, MatchState, Party};
use crate::services::{
    ConversationBridge, MatchStore, NotificationEvent, Notifier, StoreError,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Time-to-live rule for open matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    pub generated_ttl: Duration,
    pub contacted_ttl: Duration,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            generated_ttl: Duration::days(14),
            contacted_ttl: Duration::days(21),
        }
    }
}

impl ExpiryPolicy {
    /// Moment after which an open match expires, `None` for any other state
    pub fn deadline(&self, m: &Match) -> Option<DateTime<Utc>> {
        match m.state {
            MatchState::Generated => Some(m.created_at + self.generated_ttl),
            MatchState::Contacted => {
                let contacted_at = m.responded_at.unwrap_or(m.created_at);
                Some(contacted_at + self.contacted_ttl)
            }
            _ => None,
        }
    }

    pub fn is_due(&self, m: &Match, now: DateTime<Utc>) -> bool {
        self.deadline(m).map_or(false, |deadline| now > deadline)
    }

    /// Store query selecting exactly the matches `is_due` accepts at `now`
    pub fn overdue_filter(&self, now: DateTime<Utc>, limit: usize) -> ExpiryFilter {
        ExpiryFilter {
            generated_before: now - self.generated_ttl,
            contacted_before: now - self.contacted_ttl,
            limit,
        }
    }

    /// Expire the match if its TTL has run out, otherwise return it unchanged
    ///
    /// When another writer moved the match first, the stored version wins.
    pub async fn apply(
        &self,
        store: &dyn MatchStore,
        m: Match,
        now: DateTime<Utc>,
    ) -> Result<Match, StoreError> {
        let Some(deadline) = self.deadline(&m).filter(|d| now > *d) else {
            return Ok(m);
        };

        let mut patch = MatchPatch::transition(m.state, MatchState::Expired);
        patch.closed_at = Some(deadline);

        match store.update(m.id, patch).await {
            Ok(expired) => {
                tracing::info!(
                    match_id = %expired.id,
                    searcher_id = %expired.searcher_id,
                    listing_id = %expired.listing_id,
                    "Match expired"
                );
                Ok(expired)
            }
            Err(StoreError::StaleState { .. }) => store
                .get(m.id)
                .await?
                .ok_or_else(|| StoreError::NotFound(m.id.to_string())),
            Err(e) => Err(e),
        }
    }
}

/// Result of one expiry sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub examined: usize,
    pub expired: usize,
}

/// Drives matches through their states and the side effects of each step
#[derive(Clone)]
pub struct LifecycleManager {
    matches: Arc<dyn MatchStore>,
    conversations: Arc<dyn ConversationBridge>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    expiry: ExpiryPolicy,
}

impl LifecycleManager {
    pub fn new(
        matches: Arc<dyn MatchStore>,
        conversations: Arc<dyn ConversationBridge>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        expiry: ExpiryPolicy,
    ) -> Self {
        Self {
            matches,
            conversations,
            notifier,
            clock,
            expiry,
        }
    }

    pub fn expiry(&self) -> &ExpiryPolicy {
        &self.expiry
    }

    async fn load(&self, match_id: Uuid) -> Result<Match, MatchError> {
        self.matches
            .get(match_id)
            .await?
            .ok_or(MatchError::MatchNotFound(match_id))
    }

    /// Load a match with the TTL rule applied
    pub async fn get(&self, match_id: Uuid) -> Result<Match, MatchError> {
        let m = self.load(match_id).await?;
        Ok(self
            .expiry
            .apply(self.matches.as_ref(), m, self.clock.now())
            .await?)
    }

    /// All matches of a searcher, best first, with the TTL rule applied
    pub async fn matches_for_searcher(&self, searcher_id: &str) -> Result<Vec<Match>, MatchError> {
        let now = self.clock.now();
        let stored = self.matches.list_for_searcher(searcher_id).await?;

        let mut matches = Vec::with_capacity(stored.len());
        for m in stored {
            matches.push(self.expiry.apply(self.matches.as_ref(), m, now).await?);
        }

        // Sort by score (descending) and then by creation (newest first)
        matches.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });

        Ok(matches)
    }

    /// Searcher reaches out about a generated match
    ///
    /// Opens (or reuses) the conversation between searcher and owner. The
    /// side-effecting part runs on its own task, so it completes even if the
    /// caller stops waiting.
    pub async fn contact(&self, match_id: Uuid) -> Result<Match, MatchError> {
        let m = self.get(match_id).await?;

        if m.state != MatchState::Generated {
            return Err(MatchError::AlreadyContacted {
                match_id,
                state: m.state,
            });
        }

        let manager = self.clone();
        tokio::spawn(async move { manager.complete_contact(m).await }).await?
    }

    async fn complete_contact(&self, m: Match) -> Result<Match, MatchError> {
        let conversation_id = self
            .conversations
            .get_or_create(&m.searcher_id, &m.owner_id)
            .await?;

        let mut patch = MatchPatch::transition(MatchState::Generated, MatchState::Contacted);
        patch.responded_at = Some(self.clock.now());
        patch.conversation_id = Some(conversation_id);

        let contacted = match self.matches.update(m.id, patch).await {
            Ok(updated) => updated,
            Err(StoreError::StaleState { actual, .. }) => {
                return Err(MatchError::AlreadyContacted {
                    match_id: m.id,
                    state: actual,
                })
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            match_id = %contacted.id,
            searcher_id = %contacted.searcher_id,
            listing_id = %contacted.listing_id,
            "Match contacted"
        );

        self.notifier.notify(
            &contacted.owner_id,
            NotificationEvent::MatchContacted,
            json!({
                "matchId": contacted.id,
                "listingId": contacted.listing_id,
                "searcherId": contacted.searcher_id,
                "conversationId": contacted.conversation_id,
            }),
        );

        Ok(contacted)
    }

    pub async fn accept(&self, match_id: Uuid, by: Party) -> Result<Match, MatchError> {
        self.respond(match_id, Decision::Accept, by).await
    }

    pub async fn decline(&self, match_id: Uuid, by: Party) -> Result<Match, MatchError> {
        self.respond(match_id, Decision::Decline, by).await
    }

    /// Resolve a contacted match and tell the other party
    pub async fn respond(
        &self,
        match_id: Uuid,
        decision: Decision,
        by: Party,
    ) -> Result<Match, MatchError> {
        let m = self.get(match_id).await?;
        let target = decision.target_state();

        if !m.state.can_transition_to(target) {
            return Err(MatchError::InvalidTransition {
                match_id,
                from: m.state,
                to: target,
            });
        }

        let now = self.clock.now();
        let mut patch = MatchPatch::transition(m.state, target);
        if m.responded_at.is_none() {
            patch.responded_at = Some(now);
        }
        if target.is_terminal() {
            patch.closed_at = Some(now);
        }

        let resolved = match self.matches.update(match_id, patch).await {
            Ok(updated) => updated,
            Err(StoreError::StaleState { actual, .. }) => {
                return Err(MatchError::InvalidTransition {
                    match_id,
                    from: actual,
                    to: target,
                })
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            match_id = %resolved.id,
            state = %resolved.state,
            by = ?by,
            "Match resolved"
        );

        let (recipient, event) = match (by, decision) {
            (Party::Searcher, Decision::Accept) => (&resolved.owner_id, NotificationEvent::MatchAccepted),
            (Party::Searcher, Decision::Decline) => (&resolved.owner_id, NotificationEvent::MatchDeclined),
            (Party::Owner, Decision::Accept) => (&resolved.searcher_id, NotificationEvent::MatchAccepted),
            (Party::Owner, Decision::Decline) => (&resolved.searcher_id, NotificationEvent::MatchDeclined),
        };

        self.notifier.notify(
            recipient,
            event,
            json!({
                "matchId": resolved.id,
                "listingId": resolved.listing_id,
                "by": by,
            }),
        );

        Ok(resolved)
    }

    /// Apply the TTL rule to one open match
    pub async fn expire_if_due(&self, match_id: Uuid) -> Result<Match, MatchError> {
        let m = self.load(match_id).await?;

        if !m.state.is_open() {
            return Err(MatchError::InvalidTransition {
                match_id,
                from: m.state,
                to: MatchState::Expired,
            });
        }

        Ok(self
            .expiry
            .apply(self.matches.as_ref(), m, self.clock.now())
            .await?)
    }

    /// Expire up to `batch` overdue open matches, earliest deadline first
    ///
    /// Only overdue rows are loaded, so matches that are open but not yet due
    /// never use up the batch. Failures on individual matches are logged and
    /// do not stop the sweep.
    pub async fn sweep_expired(&self, batch: usize) -> Result<SweepSummary, MatchError> {
        let now = self.clock.now();
        let filter = self.expiry.overdue_filter(now, batch);
        let overdue = self.matches.list_overdue(&filter).await?;
        let mut summary = SweepSummary {
            examined: overdue.len(),
            expired: 0,
        };

        for m in overdue {
            let match_id = m.id;
            match self.expiry.apply(self.matches.as_ref(), m, now).await {
                Ok(updated) if updated.state == MatchState::Expired => summary.expired += 1,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(match_id = %match_id, "Failed to expire match: {}", e);
                }
            }
        }

        tracing::info!(
            examined = summary.examined,
            expired = summary.expired,
            "Expiry sweep finished"
        );

        Ok(summary)
    }
}
