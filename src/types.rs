//! Shared error and result types

use thiserror::Error;

/// Errors raised by the navigation engine and its bindings.
///
/// Authorization failures are not errors: a refused link is an
/// [`AddOutcome::Rejected`](crate::nav::AddOutcome) and an unknown request
/// URL is `None` from `check_request_url`.
#[derive(Debug, Error)]
pub enum NavError {
    /// A link needs at least a display name or a URL
    #[error("Link has neither a display name nor a URL")]
    EmptyLink,

    /// An inline link was requested but the engine has nowhere to write it
    #[error("No output sink configured; inline link for '{0}' cannot be rendered")]
    OutputSinkUnavailable(String),

    /// Record store read/write/flush failure
    #[error("Database error: {0}")]
    Database(String),

    /// Transaction begin/commit failure
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, NavError>;
