//! The indexing loop: drain the event source in order, apply through the
//! engine, persist dirty entities and the checkpoint atomically per batch.
//!
//! Single logical writer: the ledger and processor live behind one mutex
//! and events are applied one at a time. If an event is rejected, the
//! prefix of the batch that did apply is still persisted with the
//! checkpoint at the last good event, and the error is surfaced — the
//! indexer never runs past a known-inconsistent state.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::datasource::{EventSource, EventSourceError};
use crate::db::Repository;
use crate::engine::{EventProcessor, Ledger, LedgerError};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Source(#[from] EventSourceError),
    #[error("event rejected: {0}")]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

struct IndexerState {
    ledger: Ledger,
    processor: EventProcessor,
}

pub struct Indexer {
    source: Arc<dyn EventSource>,
    repo: Arc<Repository>,
    state: Mutex<IndexerState>,
}

impl Indexer {
    /// Restore the ledger and cursor from the repository.
    pub async fn from_repository(
        source: Arc<dyn EventSource>,
        repo: Arc<Repository>,
    ) -> Result<Self, IndexError> {
        let ledger = repo.load_ledger().await?;
        let checkpoint = repo.get_checkpoint().await?;
        info!(
            positions = ledger.positions().count(),
            user_positions = ledger.user_positions().count(),
            checkpoint = ?checkpoint,
            "ledger restored"
        );
        Ok(Indexer {
            source,
            repo,
            state: Mutex::new(IndexerState {
                ledger,
                processor: EventProcessor::with_checkpoint(checkpoint),
            }),
        })
    }

    /// Fetch and apply one batch. Returns the number of applied events.
    pub async fn sync_once(&self, batch_size: usize) -> Result<usize, IndexError> {
        let mut state = self.state.lock().await;
        let after = state.processor.last_key();
        let events = self.source.fetch_events(after, batch_size).await?;
        if events.is_empty() {
            return Ok(0);
        }

        let IndexerState { ledger, processor } = &mut *state;
        let mut applied = 0usize;
        let mut failure: Option<LedgerError> = None;
        for event in &events {
            match processor.apply(ledger, event) {
                Ok(()) => applied += 1,
                Err(err) => {
                    error!(
                        kind = event.kind(),
                        key = ?event.key(),
                        %err,
                        "halting at rejected event"
                    );
                    failure = Some(err);
                    break;
                }
            }
        }

        // Persist the applied prefix even when the batch failed midway; the
        // checkpoint stays at the last good event.
        let dirty = ledger.take_dirty();
        if !dirty.is_empty() || applied > 0 {
            self.repo
                .persist_batch(ledger, &dirty, processor.last_key())
                .await?;
        }

        match failure {
            Some(err) => Err(IndexError::Ledger(err)),
            None => Ok(applied),
        }
    }

    /// Run the sync loop until the source fails persistently or an event is
    /// rejected. Ledger rejections stop the loop for operator intervention.
    pub async fn run(&self, interval: Duration, batch_size: usize) -> IndexError {
        loop {
            match self.sync_once(batch_size).await {
                Ok(0) => tokio::time::sleep(interval).await,
                Ok(applied) => {
                    info!(applied, "batch applied");
                }
                Err(IndexError::Source(err)) => {
                    error!(%err, "event source error; retrying after interval");
                    tokio::time::sleep(interval).await;
                }
                Err(err) => return err,
            }
        }
    }
}
