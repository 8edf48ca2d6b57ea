//! MongoDB client, collection wrapper and record store
//!
//! Pattern adapted from holo-host/rust/util_libs/db/src/mongodb

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use mongodb::{
    options::{IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, ClientSession, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::db::schemas::{ActorDoc, Metadata, ACTOR_COLLECTION};
use crate::db::{stage, RecordStore, TransactionGateway};
use crate::types::{NavError, Result};

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| NavError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| NavError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(client: &Client, db_name: &str, collection_name: &str) -> Result<Self> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<()> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| NavError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Find one document by filter, skipping soft-deleted documents
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        self.inner
            .find_one(full_filter)
            .await
            .map_err(|e| NavError::Database(format!("Find failed: {}", e)))
    }

    /// Update one document
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| NavError::Database(format!("Update failed: {}", e)))
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}

/// Actor record store on MongoDB.
///
/// `persist` only stages; nothing reaches the server until `flush`. While a
/// transaction is open, flushed writes run inside its session and become
/// visible to other clients on `commit`. Staged writes and the session belong
/// to one handle; take a [`MongoRecordStore::unit_of_work`] per request.
pub struct MongoRecordStore {
    client: MongoClient,
    actors: MongoCollection<ActorDoc>,
    pending: Mutex<Vec<ActorDoc>>,
    session: Mutex<Option<ClientSession>>,
}

impl MongoRecordStore {
    pub async fn new(client: MongoClient) -> Result<Self> {
        let actors = client.collection::<ActorDoc>(ACTOR_COLLECTION).await?;
        Ok(Self {
            client,
            actors,
            pending: Mutex::new(Vec::new()),
            session: Mutex::new(None),
        })
    }

    /// Fresh handle on the same collection with nothing staged and no
    /// session
    pub fn unit_of_work(&self) -> Self {
        Self {
            client: self.client.clone(),
            actors: self.actors.clone(),
            pending: Mutex::new(Vec::new()),
            session: Mutex::new(None),
        }
    }

    /// Drop both navigation snapshots of an actor, outside any unit of work
    pub async fn clear_navigation(&self, id: &ObjectId) -> Result<bool> {
        let result = self
            .actors
            .update_one(
                doc! { "_id": *id },
                doc! {
                    "$unset": { "allowed_navs": "", "allowed_navs_cache": "" },
                    "$set": { "metadata.updated_at": bson::DateTime::now() },
                },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn write_actor(
        &self,
        actor: &mut ActorDoc,
        session: Option<&mut ClientSession>,
    ) -> Result<()> {
        actor.mut_metadata().touch();
        let collection = self.actors.inner();

        match actor._id {
            Some(id) => {
                let action = collection.replace_one(doc! { "_id": id }, &*actor).upsert(true);
                let outcome = match session {
                    Some(session) => action.session(session).await,
                    None => action.await,
                };
                outcome
                    .map(|_| ())
                    .map_err(|e| NavError::Database(format!("Replace failed: {}", e)))
            }
            None => {
                let action = collection.insert_one(&*actor);
                let outcome = match session {
                    Some(session) => action.session(session).await,
                    None => action.await,
                };
                outcome
                    .map(|_| ())
                    .map_err(|e| NavError::Database(format!("Insert failed: {}", e)))
            }
        }
    }
}

#[async_trait]
impl RecordStore for MongoRecordStore {
    async fn find_actor(&self, id: &ObjectId) -> Result<Option<ActorDoc>> {
        self.actors.find_one(doc! { "_id": *id }).await
    }

    async fn persist(&self, actor: &ActorDoc) -> Result<()> {
        stage(&mut *self.pending.lock().await, actor);
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        let mut pending = self.pending.lock().await;
        let mut session = self.session.lock().await;

        debug!(count = pending.len(), in_transaction = session.is_some(), "Flushing actors");

        while !pending.is_empty() {
            let mut actor = pending.remove(0);
            if let Err(e) = self.write_actor(&mut actor, session.as_mut()).await {
                // Keep the failed write staged so a retry sees it
                pending.insert(0, actor);
                warn!("Flush failed: {}", e);
                return Err(e);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl TransactionGateway for MongoRecordStore {
    async fn begin(&self) -> Result<()> {
        let mut slot = self.session.lock().await;
        if slot.is_some() {
            return Err(NavError::Transaction("Transaction already active".into()));
        }

        let mut session = self
            .client
            .inner()
            .start_session()
            .await
            .map_err(|e| NavError::Transaction(format!("Failed to start session: {}", e)))?;
        session
            .start_transaction()
            .await
            .map_err(|e| NavError::Transaction(format!("Failed to start transaction: {}", e)))?;

        *slot = Some(session);
        Ok(())
    }

    async fn is_transaction_active(&self) -> bool {
        self.session.lock().await.is_some()
    }

    async fn commit(&self) -> Result<()> {
        let mut slot = self.session.lock().await;
        let Some(mut session) = slot.take() else {
            return Err(NavError::Transaction("No active transaction".into()));
        };

        session
            .commit_transaction()
            .await
            .map_err(|e| NavError::Transaction(format!("Commit failed: {}", e)))
    }
}
