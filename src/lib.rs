//! Waymark - click-path navigation authorization
//!
//! A page may only be reached through a link the previous page offered.
//! Waymark keeps, per actor, the list of links offered by the last rendered
//! page, checks each incoming request against it, and persists it with the
//! actor record so the check survives across requests.
//!
//! ## Pieces
//!
//! - **Auth**: restrictions that gate which links an actor is offered
//! - **Nav**: link registry, per-request engine, redirect protocol
//! - **DB**: record store and transaction bindings (MongoDB, in-memory)
//! - **Logging**: navigation audit trail

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod nav;
pub mod types;

pub use config::Args;
pub use nav::{AddOutcome, Link, NavServices, NavigationEngine, Redirect};
pub use types::{NavError, Result};
