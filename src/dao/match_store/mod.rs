/// In-process store backed by concurrent maps.
pub mod memory;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::{
    dao::{models::MatchEntity, storage::StorageResult},
    state::events::MatchEvent,
};

pub use self::memory::MemoryMatchStore;

/// Abstraction over the persistence layer for live matches and their event logs.
pub trait MatchStore: Send + Sync {
    /// Insert or replace the stored state of a match.
    fn save_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Append one event to a match's log. Sequences must arrive in order.
    fn append_event(&self, event: MatchEvent) -> BoxFuture<'static, StorageResult<()>>;
    /// Load the stored state of a match.
    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Load a match's event log in insertion order.
    fn list_events(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Vec<MatchEvent>>>;
    /// Check that the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
