//! Coliving Match - compatibility matching engine for the coliving marketplace
//!
//! Turns a searcher's declared preferences and the catalog of published
//! listings into scored, deduplicated matches, then drives each match through
//! its lifecycle (generated, contacted, accepted/declined, expired).

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{LifecycleManager, MatchError, MatchGenerator, Scorer};
pub use models::{CompatibilityResult, Match, MatchState, ScoringWeights, SearcherPreferences};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that the library exports work correctly
        let scorer = Scorer::new(ScoringWeights::default()).unwrap();
        assert_eq!(scorer.neutral_baseline(), 64);
    }
}
