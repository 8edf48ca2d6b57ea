//! Authorization for navigation links
//!
//! Provides:
//! - Permission levels held by actors
//! - Restrictions attached to links and the predicate that evaluates them

pub mod permissions;
pub mod restriction;

pub use permissions::PermissionLevel;
pub use restriction::{AuthorizationPredicate, Restriction};
