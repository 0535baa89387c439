// Service exports
pub mod cache;
pub mod memory;
pub mod notifier;
pub mod postgres;
pub mod stores;

pub use cache::{CacheKey, CachedProfileStore};
pub use memory::{InMemoryStore, RecordedNotification, RecordingNotifier};
pub use notifier::{LogNotifier, NotificationEvent, Notifier, NotifierError, WebhookNotifier};
pub use postgres::PostgresClient;
pub use stores::{ConversationBridge, ListingStore, MatchStore, ProfileStore, StoreError};
