//! Logging infrastructure for Waymark
//!
//! Provides the navigation audit trail. Diagnostic logging goes through
//! `tracing` directly.

pub mod audit;

pub use audit::{AuditLog, EventType, JsonlAuditLog, NavigationEvent, Severity, TracingAudit};
