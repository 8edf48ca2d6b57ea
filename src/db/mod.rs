//! Persistence bindings
//!
//! The engine never talks to a database directly. It stages the bound actor
//! through a [`RecordStore`] and closes the unit of work through a
//! [`TransactionGateway`]. Two bindings ship with the crate:
//!
//! - [`MongoRecordStore`]: MongoDB collection plus a client session for
//!   transactions
//! - [`MemoryRecordStore`]: DashMap-backed, for development and tests

pub mod memory;
pub mod mongo;
pub mod schemas;

use async_trait::async_trait;
use bson::oid::ObjectId;

pub use memory::MemoryRecordStore;
pub use mongo::{MongoClient, MongoCollection, MongoRecordStore};
pub use schemas::{ActorDoc, ACTOR_COLLECTION};

use crate::types::Result;

/// Record store / identity map holding actor documents
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up an actor by ID
    async fn find_actor(&self, id: &ObjectId) -> Result<Option<ActorDoc>>;

    /// Stage the actor for the next flush. Staging the same actor twice keeps
    /// only the latest copy.
    async fn persist(&self, actor: &ActorDoc) -> Result<()>;

    /// Write every staged actor
    async fn flush(&self) -> Result<()>;
}

/// Transaction boundary of the host's unit of work
#[async_trait]
pub trait TransactionGateway: Send + Sync {
    async fn begin(&self) -> Result<()>;

    async fn is_transaction_active(&self) -> bool;

    async fn commit(&self) -> Result<()>;
}

/// Replace a staged copy of the same actor, or append a new one.
pub(crate) fn stage(pending: &mut Vec<ActorDoc>, actor: &ActorDoc) {
    let existing = actor
        ._id
        .and_then(|id| pending.iter().position(|p| p._id == Some(id)));

    match existing {
        Some(index) => pending[index] = actor.clone(),
        None => pending.push(actor.clone()),
    }
}
