//! Link restrictions
//!
//! A restriction is the capability an actor needs before a link is offered
//! to them. It is evaluated once, when the link is added; a link that made it
//! into the registry stays trusted until the registry is cleared or reloaded.

use bson::oid::ObjectId;
use std::fmt;
use std::sync::Arc;

use super::PermissionLevel;
use crate::db::schemas::ActorDoc;

/// Capability check against the current actor.
///
/// `actor` is `None` on public pages; restricted links are never offered to
/// nobody.
pub trait AuthorizationPredicate: fmt::Debug + Send + Sync {
    fn is_allowed_by(&self, actor: Option<&ActorDoc>) -> bool;
}

/// Capability required to traverse a link
#[derive(Debug, Clone)]
pub enum Restriction {
    /// Actor must be a member of the named group
    Group(String),
    /// Actor must be this specific record
    Owner(ObjectId),
    /// Actor must hold at least this permission level
    Level(PermissionLevel),
    /// Host-defined check
    Custom(Arc<dyn AuthorizationPredicate>),
}

impl Restriction {
    pub fn group(name: impl Into<String>) -> Self {
        Restriction::Group(name.into())
    }

    pub fn custom(predicate: impl AuthorizationPredicate + 'static) -> Self {
        Restriction::Custom(Arc::new(predicate))
    }
}

impl AuthorizationPredicate for Restriction {
    fn is_allowed_by(&self, actor: Option<&ActorDoc>) -> bool {
        let Some(actor) = actor else {
            return false;
        };

        match self {
            Restriction::Group(group) => actor.groups.iter().any(|g| g == group),
            Restriction::Owner(id) => actor._id.as_ref() == Some(id),
            Restriction::Level(required) => actor.permission_level.satisfies(*required),
            Restriction::Custom(predicate) => predicate.is_allowed_by(Some(actor)),
        }
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Restriction::Group(group) => write!(f, "group:{}", group),
            Restriction::Owner(id) => write!(f, "owner:{}", id),
            Restriction::Level(level) => write!(f, "level:{}", level),
            Restriction::Custom(predicate) => write!(f, "custom:{:?}", predicate),
        }
    }
}
