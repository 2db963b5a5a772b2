/// Per-match notification topics.
pub mod broadcast;
/// Countdown game clock.
pub mod clock;
/// Typed failures of the match core.
pub mod error;
/// Append-only match event log entries.
pub mod events;
/// Live match session and its commands.
pub mod live_match;
/// Lineup, foul and playing-time tracking.
pub mod roster;
/// Competition rules.
pub mod rules;
/// Match status transitions.
pub mod state_machine;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::match_store::MatchStore,
    services::persistence::{PersistenceQueue, PersistenceWorker},
};

use self::{
    broadcast::MatchBroadcaster,
    error::{MatchError, MatchResult},
    live_match::LiveMatch,
};

/// Application state shared by every handler and background task.
pub type SharedState = Arc<AppState>;
/// Lock guarding every mutation of one match.
pub type MatchHandle = Arc<Mutex<LiveMatch>>;

/// Central application state: the live match registry and its collaborators.
pub struct AppState {
    config: AppConfig,
    matches: DashMap<Uuid, MatchHandle>,
    broadcaster: MatchBroadcaster,
    store: Arc<dyn MatchStore>,
    persistence: PersistenceQueue,
}

impl AppState {
    /// Build the shared state and the worker that drains its persistence queue.
    ///
    /// The worker must be spawned by the caller; until it runs, writes stay queued.
    pub fn new(config: AppConfig, store: Arc<dyn MatchStore>) -> (SharedState, PersistenceWorker) {
        let (persistence, worker) = PersistenceQueue::new(store.clone());
        let state = Arc::new(Self {
            broadcaster: MatchBroadcaster::new(config.subscriber_capacity()),
            matches: DashMap::new(),
            config,
            store,
            persistence,
        });
        (state, worker)
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Per-match notification topics.
    pub fn broadcaster(&self) -> &MatchBroadcaster {
        &self.broadcaster
    }

    /// Backing match store.
    pub fn store(&self) -> Arc<dyn MatchStore> {
        self.store.clone()
    }

    /// Write-behind queue in front of the store.
    pub fn persistence(&self) -> &PersistenceQueue {
        &self.persistence
    }

    /// Lock handle of a loaded match.
    pub fn match_handle(&self, id: Uuid) -> MatchResult<MatchHandle> {
        self.matches
            .get(&id)
            .map(|handle| handle.clone())
            .ok_or_else(|| MatchError::NotFound(format!("match {id} does not exist")))
    }

    /// Whether a match is loaded in memory.
    pub fn contains_match(&self, id: Uuid) -> bool {
        self.matches.contains_key(&id)
    }

    /// Register a match. An already loaded match with the same id is kept and returned.
    pub fn insert_match(&self, live: LiveMatch) -> MatchHandle {
        self.matches
            .entry(live.id())
            .or_insert_with(|| Arc::new(Mutex::new(live)))
            .clone()
    }

    /// Handles of every loaded match.
    pub fn match_handles(&self) -> Vec<MatchHandle> {
        self.matches
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}
