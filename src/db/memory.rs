//! In-memory record store
//!
//! Same staging and transaction semantics as the MongoDB binding, kept in
//! process. Used in development mode and by tests.

use async_trait::async_trait;
use bson::oid::ObjectId;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::db::schemas::ActorDoc;
use crate::db::{stage, RecordStore, TransactionGateway};
use crate::types::{NavError, Result};

/// State shared by every unit of work of one store
#[derive(Default)]
struct Committed {
    actors: DashMap<ObjectId, ActorDoc>,
    flushes: AtomicU64,
    commits: AtomicU64,
}

/// One unit of work over a shared in-memory collection.
///
/// Staged writes and the open transaction belong to this handle only; use
/// [`MemoryRecordStore::unit_of_work`] to get a handle per request.
#[derive(Default)]
pub struct MemoryRecordStore {
    committed: Arc<Committed>,
    /// Staged by `persist`, written by `flush`
    pending: Mutex<Vec<ActorDoc>>,
    /// Flushed inside the open transaction, applied by `commit`
    uncommitted: Mutex<Option<Vec<ActorDoc>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh handle over the same committed data, with nothing staged and no
    /// open transaction
    pub fn unit_of_work(&self) -> Self {
        Self {
            committed: self.committed.clone(),
            pending: Mutex::new(Vec::new()),
            uncommitted: Mutex::new(None),
        }
    }

    /// Insert a committed actor directly, assigning an ID when missing
    pub fn insert(&self, mut actor: ActorDoc) -> ObjectId {
        let id = *actor._id.get_or_insert_with(ObjectId::new);
        self.committed.actors.insert(id, actor);
        id
    }

    /// Number of `flush` calls so far, across all units of work
    pub fn flush_count(&self) -> u64 {
        self.committed.flushes.load(Ordering::SeqCst)
    }

    /// Number of successful `commit` calls so far, across all units of work
    pub fn commit_count(&self) -> u64 {
        self.committed.commits.load(Ordering::SeqCst)
    }

    fn write(&self, mut actor: ActorDoc) {
        actor.metadata.touch();
        let id = *actor._id.get_or_insert_with(ObjectId::new);
        self.committed.actors.insert(id, actor);
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_actor(&self, id: &ObjectId) -> Result<Option<ActorDoc>> {
        if let Some(open) = self.uncommitted.lock().await.as_ref() {
            if let Some(actor) = open.iter().rev().find(|a| a._id.as_ref() == Some(id)) {
                return Ok(Some(actor.clone()));
            }
        }

        Ok(self
            .committed
            .actors
            .get(id)
            .filter(|a| !a.metadata.is_deleted)
            .map(|a| a.value().clone()))
    }

    async fn persist(&self, actor: &ActorDoc) -> Result<()> {
        stage(&mut *self.pending.lock().await, actor);
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        let staged: Vec<ActorDoc> = self.pending.lock().await.drain(..).collect();
        let mut uncommitted = self.uncommitted.lock().await;

        debug!(count = staged.len(), in_transaction = uncommitted.is_some(), "Flushing actors");

        match uncommitted.as_mut() {
            Some(open) => open.extend(staged),
            None => staged.into_iter().for_each(|actor| self.write(actor)),
        }

        self.committed.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl TransactionGateway for MemoryRecordStore {
    async fn begin(&self) -> Result<()> {
        let mut uncommitted = self.uncommitted.lock().await;
        if uncommitted.is_some() {
            return Err(NavError::Transaction("Transaction already active".into()));
        }
        *uncommitted = Some(Vec::new());
        Ok(())
    }

    async fn is_transaction_active(&self) -> bool {
        self.uncommitted.lock().await.is_some()
    }

    async fn commit(&self) -> Result<()> {
        let Some(open) = self.uncommitted.lock().await.take() else {
            return Err(NavError::Transaction("No active transaction".into()));
        };

        open.into_iter().for_each(|actor| self.write(actor));
        self.committed.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
