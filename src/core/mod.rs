// Core algorithm exports
pub mod clock;
pub mod error;
pub mod fetcher;
pub mod filters;
pub mod insights;
pub mod lifecycle;
pub mod matcher;
pub mod preferences;
pub mod scoring;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::MatchError;
pub use fetcher::{CandidateFetcher, FetchSettings};
pub use filters::{is_eligible, to_candidate};
pub use insights::{MatchInsights, MatchQuality};
pub use lifecycle::{ExpiryPolicy, LifecycleManager, SweepSummary};
pub use matcher::{GenerateOptions, GenerationSettings, GenerationSummary, MatchGenerator};
pub use preferences::{normalize_preferences, ProfileReader};
pub use scoring::{calculate_compatibility, Scorer};
