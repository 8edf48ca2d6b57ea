//! Navigation audit trail
//!
//! Records which URLs an actor was allowed to open. Auditing is best-effort:
//! a failing sink logs the failure and never changes an authorization
//! outcome, so [`AuditLog::record`] has no error to return.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::db::schemas::ActorDoc;

/// Audit event types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A request URL matched an offered link
    RequestAuthorized,
    /// A redirect was issued after committing navigation state
    Redirected,
}

/// How chatty an event is
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Verbose,
    Info,
}

/// One audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationEvent {
    /// Event timestamp
    pub timestamp: DateTime<Utc>,
    /// Event type
    pub event_type: EventType,
    pub severity: Severity,
    /// Actor ID (hex), if the actor has been stored
    pub actor_id: Option<String>,
    pub actor_name: Option<String>,
    /// Human readable summary, e.g. `Open page=home`
    pub message: String,
    /// URL the event is about
    pub url: Option<String>,
}

impl NavigationEvent {
    /// Create a new audit event
    pub fn new(event_type: EventType, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            severity,
            actor_id: None,
            actor_name: None,
            message: message.into(),
            url: None,
        }
    }

    /// Attribute the event to an actor
    pub fn with_actor(mut self, actor: Option<&ActorDoc>) -> Self {
        if let Some(actor) = actor {
            self.actor_id = actor._id.map(|id| id.to_hex());
            self.actor_name = Some(actor.name.clone());
        }
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Convert to JSONL line
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Audit sink
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, event: NavigationEvent);
}

/// Audit through `tracing` under the `waymark::audit` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAudit;

#[async_trait]
impl AuditLog for TracingAudit {
    async fn record(&self, event: NavigationEvent) {
        match event.severity {
            Severity::Verbose => debug!(
                target: "waymark::audit",
                actor = event.actor_name.as_deref().unwrap_or("-"),
                "{}",
                event.message
            ),
            Severity::Info => info!(
                target: "waymark::audit",
                actor = event.actor_name.as_deref().unwrap_or("-"),
                "{}",
                event.message
            ),
        }
    }
}

/// Audit logger that appends events to a JSONL file
#[derive(Clone)]
pub struct JsonlAuditLog {
    inner: Arc<Mutex<JsonlAuditInner>>,
}

struct JsonlAuditInner {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl JsonlAuditLog {
    /// Open (or create) the audit file for appending
    pub fn open(path: PathBuf) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        info!("Audit logging initialized to {}", path.display());
        Ok(Self {
            inner: Arc::new(Mutex::new(JsonlAuditInner {
                writer: BufWriter::new(file),
                path,
            })),
        })
    }

    /// Path of the audit file
    pub async fn path(&self) -> PathBuf {
        self.inner.lock().await.path.clone()
    }
}

#[async_trait]
impl AuditLog for JsonlAuditLog {
    async fn record(&self, event: NavigationEvent) {
        let jsonl = match event.to_jsonl() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize audit event: {}", e);
                return;
            }
        };

        let mut inner = self.inner.lock().await;

        if let Err(e) = writeln!(inner.writer, "{}", jsonl) {
            error!("Failed to write audit event: {}", e);
        }
        if let Err(e) = inner.writer.flush() {
            error!("Failed to flush audit log: {}", e);
        }
    }
}
