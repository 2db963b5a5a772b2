use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::{
    dao::{
        match_store::MatchStore,
        models::MatchEntity,
        storage::{StorageError, StorageResult},
    },
    state::events::MatchEvent,
};

/// Store keeping every match and event log in memory.
#[derive(Clone, Default)]
pub struct MemoryMatchStore {
    matches: Arc<DashMap<Uuid, MatchEntity>>,
    events: Arc<DashMap<Uuid, Vec<MatchEvent>>>,
}

impl MemoryMatchStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MatchStore for MemoryMatchStore {
    fn save_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let matches = self.matches.clone();
        Box::pin(async move {
            // Writes can race through the worker; never go back to an older version.
            matches
                .entry(entity.id)
                .and_modify(|stored| {
                    if stored.version <= entity.version {
                        *stored = entity.clone();
                    }
                })
                .or_insert(entity);
            Ok(())
        })
    }

    fn append_event(&self, event: MatchEvent) -> BoxFuture<'static, StorageResult<()>> {
        let events = self.events.clone();
        Box::pin(async move {
            let mut log = events.entry(event.match_id).or_default();
            let expected = log.len() as u64 + 1;
            if event.sequence < expected {
                // Already stored by an earlier attempt.
                return Ok(());
            }
            if event.sequence > expected {
                return Err(StorageError::OutOfOrder {
                    match_id: event.match_id,
                    sequence: event.sequence,
                });
            }
            log.push(event);
            Ok(())
        })
    }

    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let matches = self.matches.clone();
        Box::pin(async move { Ok(matches.get(&id).map(|entity| entity.clone())) })
    }

    fn list_events(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Vec<MatchEvent>>> {
        let events = self.events.clone();
        Box::pin(async move {
            Ok(events
                .get(&id)
                .map(|log| log.clone())
                .unwrap_or_default())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
