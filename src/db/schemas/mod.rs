//! Database schemas for Waymark
//!
//! Defines MongoDB document structures for actors and their navigation state.

mod actor;
mod metadata;

pub use actor::{ActorDoc, ACTOR_COLLECTION};
pub use metadata::Metadata;
