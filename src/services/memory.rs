use crate::models::{
    ExpiryFilter, ListingFilter, Match, MatchPatch, MatchState, RawListing, RawPreferences,
};
use crate::services::notifier::{NotificationEvent, Notifier};
use crate::services::stores::{
    ConversationBridge, ListingStore, MatchStore, ProfileStore, StoreError,
};
use async_trait::async_trait;
use chrono::Duration;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Default)]
struct State {
    preferences: HashMap<String, Value>,
    listings: Vec<RawListing>,
    matches: Vec<Match>,
    conversations: HashMap<(String, String), String>,
    failing_listings: HashSet<String>,
    concealed_listings: HashSet<String>,
}

/// Mutex-guarded implementation of every store
///
/// Enforces the same active-match uniqueness rule as the Postgres adapter.
/// Used by tests, benchmarks and local runs without a database.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a searcher's raw preference blob, replacing any previous one
    pub fn set_preferences(&self, searcher_id: &str, blob: Value) {
        self.lock()
            .preferences
            .insert(searcher_id.to_string(), blob);
    }

    /// Add a listing row, replacing one with the same id
    pub fn add_listing(&self, listing: RawListing) {
        let mut state = self.lock();
        state.listings.retain(|l| l.id != listing.id);
        state.listings.push(listing);
    }

    /// Make every match insert for this listing fail with a storage error
    pub fn fail_inserts_for(&self, listing_id: &str) {
        self.lock().failing_listings.insert(listing_id.to_string());
    }

    /// Hide this listing's active match from `find_active` only
    ///
    /// Inserts still see it, which reproduces a concurrent run committing its
    /// match between our lookup and our insert.
    pub fn conceal_active_for(&self, listing_id: &str) {
        self.lock().concealed_listings.insert(listing_id.to_string());
    }

    /// Snapshot of all stored matches in insertion order
    pub fn all_matches(&self) -> Vec<Match> {
        self.lock().matches.clone()
    }

    pub fn conversation_count(&self) -> usize {
        self.lock().conversations.len()
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn read_preferences(
        &self,
        searcher_id: &str,
    ) -> Result<Option<RawPreferences>, StoreError> {
        Ok(self
            .lock()
            .preferences
            .get(searcher_id)
            .map(|blob| RawPreferences::new(searcher_id, blob.clone())))
    }
}

#[async_trait]
impl ListingStore for InMemoryStore {
    async fn query_published(&self, filter: &ListingFilter) -> Result<Vec<RawListing>, StoreError> {
        let state = self.lock();

        let mut rows: Vec<RawListing> = state
            .listings
            .iter()
            .filter(|l| l.status.eq_ignore_ascii_case("published"))
            .filter(|l| l.available_from.map_or(true, |from| from <= filter.available_by))
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            b.listed_at
                .cmp(&a.listed_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let page = rows
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(page)
    }
}

#[async_trait]
impl MatchStore for InMemoryStore {
    async fn find_active(
        &self,
        searcher_id: &str,
        listing_id: &str,
    ) -> Result<Option<Match>, StoreError> {
        let state = self.lock();
        if state.concealed_listings.contains(listing_id) {
            return Ok(None);
        }

        Ok(state
            .matches
            .iter()
            .find(|m| {
                m.searcher_id == searcher_id && m.listing_id == listing_id && m.state.is_active()
            })
            .cloned())
    }

    async fn find_latest_terminal(
        &self,
        searcher_id: &str,
        listing_id: &str,
    ) -> Result<Option<Match>, StoreError> {
        Ok(self
            .lock()
            .matches
            .iter()
            .filter(|m| {
                m.searcher_id == searcher_id && m.listing_id == listing_id && m.state.is_terminal()
            })
            .max_by_key(|m| m.closed_at.unwrap_or(m.created_at))
            .cloned())
    }

    async fn insert(&self, new_match: Match) -> Result<Match, StoreError> {
        let mut state = self.lock();

        if state.failing_listings.contains(&new_match.listing_id) {
            return Err(StoreError::InvalidData(format!(
                "insert rejected for listing {}",
                new_match.listing_id
            )));
        }

        let duplicate = state.matches.iter().any(|m| {
            m.searcher_id == new_match.searcher_id
                && m.listing_id == new_match.listing_id
                && m.state.is_active()
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "active match exists for {}/{}",
                new_match.searcher_id, new_match.listing_id
            )));
        }

        state.matches.push(new_match.clone());
        Ok(new_match)
    }

    async fn update(&self, match_id: Uuid, patch: MatchPatch) -> Result<Match, StoreError> {
        let mut state = self.lock();

        let m = state
            .matches
            .iter_mut()
            .find(|m| m.id == match_id)
            .ok_or_else(|| StoreError::NotFound(match_id.to_string()))?;

        if m.state != patch.expected_state {
            return Err(StoreError::StaleState {
                match_id,
                expected: patch.expected_state,
                actual: m.state,
            });
        }

        patch.apply_to(m);
        Ok(m.clone())
    }

    async fn get(&self, match_id: Uuid) -> Result<Option<Match>, StoreError> {
        Ok(self.lock().matches.iter().find(|m| m.id == match_id).cloned())
    }

    async fn list_for_searcher(&self, searcher_id: &str) -> Result<Vec<Match>, StoreError> {
        let mut matches: Vec<Match> = self
            .lock()
            .matches
            .iter()
            .filter(|m| m.searcher_id == searcher_id)
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });

        Ok(matches)
    }

    async fn list_overdue(&self, filter: &ExpiryFilter) -> Result<Vec<Match>, StoreError> {
        // Time left past the cutoff, which orders by deadline across both TTLs
        let overdue_by = |m: &Match| match m.state {
            MatchState::Generated => Some(m.created_at - filter.generated_before),
            MatchState::Contacted => {
                Some(m.responded_at.unwrap_or(m.created_at) - filter.contacted_before)
            }
            _ => None,
        };

        let mut overdue: Vec<(Duration, Match)> = self
            .lock()
            .matches
            .iter()
            .filter_map(|m| {
                overdue_by(m)
                    .filter(|left| *left < Duration::zero())
                    .map(|left| (left, m.clone()))
            })
            .collect();

        overdue.sort_by_key(|(left, _)| *left);

        Ok(overdue
            .into_iter()
            .take(filter.limit)
            .map(|(_, m)| m)
            .collect())
    }
}

#[async_trait]
impl ConversationBridge for InMemoryStore {
    async fn get_or_create(&self, user_a: &str, user_b: &str) -> Result<String, StoreError> {
        // Participants are unordered
        let key = if user_a <= user_b {
            (user_a.to_string(), user_b.to_string())
        } else {
            (user_b.to_string(), user_a.to_string())
        };

        Ok(self
            .lock()
            .conversations
            .entry(key)
            .or_insert_with(|| Uuid::new_v4().to_string())
            .clone())
    }
}

/// A notification captured by `RecordingNotifier`
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedNotification {
    pub user_id: String,
    pub event: NotificationEvent,
    pub payload: Value,
}

/// Notifier that keeps every call for later inspection
#[derive(Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<RecordedNotification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RecordedNotification> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events delivered to one user, in call order
    pub fn events_for(&self, user_id: &str) -> Vec<NotificationEvent> {
        self.calls()
            .into_iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.event)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, user_id: &str, event: NotificationEvent, payload: Value) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedNotification {
                user_id: user_id.to_string(),
                event,
                payload,
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompatibilityResult, ListingCandidate, ListingStatus, MatchState};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn create_test_match(listing_id: &str) -> Match {
        let candidate = ListingCandidate {
            listing_id: listing_id.to_string(),
            owner_id: "owner-1".to_string(),
            city: "Brussels".to_string(),
            monthly_rent: 650,
            charges: None,
            bedrooms: 2,
            furnished: false,
            smoking_allowed: None,
            pets_allowed: None,
            available_from: None,
            status: ListingStatus::Published,
            listed_at: None,
        };
        let result = CompatibilityResult {
            overall_score: 70,
            criterion_scores: vec![],
        };
        Match::generated(
            "searcher-1",
            &candidate,
            result,
            Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_second_active_match_conflicts() {
        let store = InMemoryStore::new();

        tokio_test::block_on(store.insert(create_test_match("listing-1"))).unwrap();
        let second = tokio_test::block_on(store.insert(create_test_match("listing-1")));

        assert!(matches!(second, Err(StoreError::Conflict(_))));
        assert_eq!(store.all_matches().len(), 1);
    }

    #[test]
    fn test_terminal_match_frees_the_pair() {
        let store = InMemoryStore::new();
        let first = tokio_test::block_on(store.insert(create_test_match("listing-1"))).unwrap();

        let patch = MatchPatch::transition(MatchState::Generated, MatchState::Expired);
        tokio_test::block_on(store.update(first.id, patch)).unwrap();

        assert!(tokio_test::block_on(store.insert(create_test_match("listing-1"))).is_ok());
    }

    #[test]
    fn test_update_checks_expected_state() {
        let store = InMemoryStore::new();
        let m = tokio_test::block_on(store.insert(create_test_match("listing-1"))).unwrap();

        let patch = MatchPatch::transition(MatchState::Contacted, MatchState::Accepted);
        let result = tokio_test::block_on(store.update(m.id, patch));

        assert!(matches!(
            result,
            Err(StoreError::StaleState {
                actual: MatchState::Generated,
                ..
            })
        ));
    }

    fn create_raw_listing(id: &str, status: &str) -> RawListing {
        RawListing {
            id: id.to_string(),
            owner_id: Some("owner-1".to_string()),
            city: Some("Brussels".to_string()),
            monthly_rent: Some(650),
            charges: None,
            bedrooms: Some(2),
            furnished: None,
            smoking_allowed: None,
            pets_allowed: None,
            available_from: None,
            status: status.to_string(),
            listed_at: None,
        }
    }

    #[test]
    fn test_published_rows_are_paged_in_stable_order() {
        let store = InMemoryStore::new();
        store.add_listing(create_raw_listing("c", "published"));
        store.add_listing(create_raw_listing("a", "Published"));
        store.add_listing(create_raw_listing("b", "PUBLISHED"));
        store.add_listing(create_raw_listing("d", "draft"));

        let page = |offset| ListingFilter {
            available_by: chrono::NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            limit: Some(2),
            offset,
        };

        let first = tokio_test::block_on(store.query_published(&page(0))).unwrap();
        let second = tokio_test::block_on(store.query_published(&page(2))).unwrap();

        let ids: Vec<&str> = first.iter().chain(&second).map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_overdue_matches_ordered_by_deadline() {
        let store = InMemoryStore::new();
        let created = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();

        // Old contacted match, not due yet
        let mut contacted = create_test_match("listing-1");
        contacted.state = MatchState::Contacted;
        contacted.responded_at = Some(created + Duration::days(10));
        tokio_test::block_on(store.insert(contacted)).unwrap();

        // Generated later, but overdue
        let mut late = create_test_match("listing-2");
        late.created_at = created + Duration::days(2);
        let late = tokio_test::block_on(store.insert(late)).unwrap();

        let early = tokio_test::block_on(store.insert(create_test_match("listing-3"))).unwrap();

        let now = created + Duration::days(20);
        let filter = ExpiryFilter {
            generated_before: now - Duration::days(14),
            contacted_before: now - Duration::days(21),
            limit: 10,
        };

        let overdue = tokio_test::block_on(store.list_overdue(&filter)).unwrap();
        let ids: Vec<Uuid> = overdue.iter().map(|m| m.id).collect();

        assert_eq!(ids, vec![early.id, late.id]);
    }

    #[test]
    fn test_conversation_reused_for_either_order() {
        let store = InMemoryStore::new();

        let first = tokio_test::block_on(store.get_or_create("searcher-1", "owner-1")).unwrap();
        let second = tokio_test::block_on(store.get_or_create("owner-1", "searcher-1")).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.conversation_count(), 1);
    }

    #[test]
    fn test_recording_notifier_keeps_calls() {
        let notifier = RecordingNotifier::new();
        notifier.notify("owner-1", NotificationEvent::MatchContacted, json!({}));

        assert_eq!(notifier.events_for("owner-1"), vec![NotificationEvent::MatchContacted]);
        assert!(notifier.events_for("searcher-1").is_empty());
    }
}
