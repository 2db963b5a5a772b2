//! Write-behind persistence: commands enqueue, a background worker writes.

use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, time::sleep};
use tracing::{debug, info, warn};

use crate::{
    dao::{match_store::MatchStore, models::MatchEntity, storage::StorageResult},
    state::events::MatchEvent,
};

const INITIAL_DELAY: Duration = Duration::from_millis(200);
const MAX_DELAY: Duration = Duration::from_secs(5);
const MAX_ATTEMPTS: u32 = 5;

/// One unit of write-behind work produced by an accepted command.
#[derive(Debug, Clone)]
pub struct PersistJob {
    /// Match state after the command.
    pub entity: MatchEntity,
    /// Event appended by the command, if any.
    pub event: Option<MatchEvent>,
}

/// Sending side of the write-behind queue.
#[derive(Clone)]
pub struct PersistenceQueue {
    tx: mpsc::UnboundedSender<PersistJob>,
}

impl PersistenceQueue {
    /// Create the queue and the worker draining it into `store`.
    pub fn new(store: Arc<dyn MatchStore>) -> (Self, PersistenceWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, PersistenceWorker { rx, store })
    }

    /// Hand a job to the worker without waiting for the write.
    pub fn enqueue(&self, job: PersistJob) {
        let match_id = job.entity.id;
        if self.tx.send(job).is_err() {
            warn!(%match_id, "persistence worker stopped; match state not saved");
        }
    }
}

/// Background task writing queued jobs to the store, one at a time.
pub struct PersistenceWorker {
    rx: mpsc::UnboundedReceiver<PersistJob>,
    store: Arc<dyn MatchStore>,
}

impl PersistenceWorker {
    /// Drain the queue until every sender is dropped.
    pub async fn run(mut self) {
        info!("persistence worker started");
        while let Some(job) = self.rx.recv().await {
            write_with_retry(self.store.as_ref(), job).await;
        }
        info!("persistence worker stopped");
    }
}

/// Write a job, retrying with exponential backoff before giving up on it.
async fn write_with_retry(store: &dyn MatchStore, job: PersistJob) {
    let match_id = job.entity.id;
    let mut delay = INITIAL_DELAY;

    for attempt in 1..=MAX_ATTEMPTS {
        match write(store, &job).await {
            Ok(()) => {
                debug!(%match_id, version = job.entity.version, "match state persisted");
                return;
            }
            Err(err) if attempt < MAX_ATTEMPTS => {
                warn!(%match_id, attempt, error = %err, "persisting match failed; retrying");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(
                    %match_id,
                    attempt,
                    error = %err,
                    "exhausted persistence attempts; in-memory state remains authoritative"
                );
            }
        }
    }
}

async fn write(store: &dyn MatchStore, job: &PersistJob) -> StorageResult<()> {
    if let Some(event) = &job.event {
        store.append_event(event.clone()).await?;
    }
    store.save_match(job.entity.clone()).await
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use uuid::Uuid;

    use super::*;
    use crate::{
        dao::match_store::MemoryMatchStore,
        state::{live_match::LiveMatch, rules::MatchRules},
    };

    #[tokio::test]
    async fn worker_writes_queued_jobs_in_order() {
        let store = MemoryMatchStore::new();
        let (queue, worker) = PersistenceQueue::new(Arc::new(store.clone()));

        let now = Instant::now();
        let mut live = LiveMatch::schedule(Uuid::new_v4(), 1, 2, MatchRules::default()).unwrap();
        live.declare_lineup(1, &[10, 11, 12, 13, 14], &[10, 11, 12, 13, 14], now)
            .unwrap();
        live.start_clock(now).unwrap();
        for clock in [590, 570] {
            let outcome = live.record_basket(10, 2, 1, clock, now).unwrap();
            queue.enqueue(PersistJob {
                entity: MatchEntity::from(&live),
                event: outcome.event,
            });
        }
        drop(queue);
        worker.run().await;

        let stored = store.find_match(live.id()).await.unwrap().unwrap();
        assert_eq!(stored.home.score, 4);
        assert_eq!(store.list_events(live.id()).await.unwrap().len(), 2);
    }
}
