//! Configuration for Waymark
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::logging::{AuditLog, JsonlAuditLog, TracingAudit};
use crate::nav::{AllowAllPaths, PageNamespace, PathValidator, RedirectSettings};

/// Waymark - inspect and maintain actors' offered navigation
#[derive(Parser, Debug, Clone)]
#[command(name = "waymark")]
#[command(about = "Click-path navigation authorization for actor sessions")]
pub struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "waymark")]
    pub mongodb_db: String,

    /// Prefix for redirect locations (the page script)
    #[arg(long, env = "BASE_URL", default_value = "/")]
    pub base_url: String,

    /// Serve a "Continue" page instead of a Location header on redirect
    #[arg(long, env = "MANUAL_REDIRECT", default_value = "false")]
    pub manual_redirect: bool,

    /// Directory holding the pages; link targets must name a file in it
    /// If unset, link targets only get syntactic checks
    #[arg(long, env = "PAGE_ROOT")]
    pub page_root: Option<PathBuf>,

    /// File extension of pages under PAGE_ROOT
    #[arg(long, env = "PAGE_EXTENSION", default_value = "html")]
    pub page_extension: String,

    /// Append audit events to this JSONL file instead of the log
    #[arg(long, env = "AUDIT_LOG")]
    pub audit_log: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Enable development mode (accepts every link target)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print an actor's stored navigation and cache snapshots
    Show {
        /// Actor ID (hex ObjectId)
        actor: String,
    },
    /// Drop an actor's stored navigation, forcing a fresh start
    Clear { actor: String },
    /// Check whether a URL is currently offered to an actor
    Check {
        actor: String,
        url: String,
        /// Consume the offered links like a real request would
        #[arg(long)]
        consume: bool,
    },
    /// Offer an extra link to an actor
    Offer {
        actor: String,
        name: String,
        url: String,
        /// Link container
        #[arg(long, default_value = crate::nav::DEFAULT_CONTAINER)]
        container: String,
    },
}

impl Args {
    /// Redirect emission settings
    pub fn redirect_settings(&self) -> RedirectSettings {
        RedirectSettings {
            base_url: self.base_url.clone(),
            manual: self.manual_redirect,
        }
    }

    /// Link target validator (everything passes in dev mode)
    pub fn path_validator(&self) -> Arc<dyn PathValidator> {
        if self.dev_mode {
            return Arc::new(AllowAllPaths);
        }
        match &self.page_root {
            Some(root) => Arc::new(PageNamespace::rooted(root.clone(), self.page_extension.clone())),
            None => Arc::new(PageNamespace::new()),
        }
    }

    /// Audit sink: JSONL file when AUDIT_LOG is set, tracing otherwise
    pub fn audit_sink(&self) -> std::io::Result<Arc<dyn AuditLog>> {
        match &self.audit_log {
            Some(path) => Ok(Arc::new(JsonlAuditLog::open(path.clone())?)),
            None => Ok(Arc::new(TracingAudit)),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.contains('?') {
            return Err("BASE_URL must not contain a query string".to_string());
        }

        if self.page_extension.is_empty() || self.page_extension.contains(['/', '.']) {
            return Err("PAGE_EXTENSION must be a bare extension like 'html'".to_string());
        }

        if let Some(root) = &self.page_root {
            if !root.is_dir() {
                return Err(format!("PAGE_ROOT {} is not a directory", root.display()));
            }
        }

        Ok(())
    }
}
