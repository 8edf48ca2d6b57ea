//! Actor document schema
//!
//! The identity a navigation engine authorizes on behalf of, together with
//! its persisted navigation snapshots.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::PermissionLevel;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::nav::LinkRecord;

/// Collection name for actors
pub const ACTOR_COLLECTION: &str = "actors";

/// Actor document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ActorDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Display name of the actor
    pub name: String,

    /// Groups the actor belongs to, checked by group restrictions
    #[serde(default)]
    pub groups: Vec<String>,

    /// Permission tier, checked by level restrictions
    #[serde(default)]
    pub permission_level: PermissionLevel,

    /// Links offered by the last rendered page
    #[serde(
        default,
        deserialize_with = "lenient_snapshot",
        skip_serializing_if = "Option::is_none"
    )]
    pub allowed_navs: Option<Vec<LinkRecord>>,

    /// Secondary copy written when a page asks for its navigation to be cached
    #[serde(
        default,
        deserialize_with = "lenient_snapshot",
        skip_serializing_if = "Option::is_none"
    )]
    pub allowed_navs_cache: Option<Vec<LinkRecord>>,
}

impl ActorDoc {
    /// Create a new actor document
    pub fn new(name: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            name,
            groups: Vec::new(),
            permission_level: PermissionLevel::default(),
            allowed_navs: None,
            allowed_navs_cache: None,
        }
    }

    pub fn with_groups(mut self, groups: &[&str]) -> Self {
        self.groups = groups.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn with_permission(mut self, level: PermissionLevel) -> Self {
        self.permission_level = level;
        self
    }
}

/// A stored snapshot that is not a list of link records (legacy scalar,
/// corrupted write, null) loads as "no snapshot" rather than failing the
/// whole document.
fn lenient_snapshot<'de, D>(deserializer: D) -> Result<Option<Vec<LinkRecord>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Snapshot {
        List(Vec<LinkRecord>),
        Invalid(serde::de::IgnoredAny),
    }

    Ok(match Snapshot::deserialize(deserializer)? {
        Snapshot::List(records) => Some(records),
        Snapshot::Invalid(_) => None,
    })
}

impl IntoIndexes for ActorDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "name": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("name_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for ActorDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
