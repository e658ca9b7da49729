//! # Cache Errors
//!
//! This module defines the error taxonomy shared by the loader, the client and
//! the mutation layers built on top of them.
//!
//! The type is `Clone` because a single fetch outcome is handed to every caller
//! attached to the same in-flight request.

/// Errors that can occur while loading, invalidating or mutating resources.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CacheError {
    /// Unknown or duplicate resource name. This is a programmer error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A request target needs a selection that is absent from the context.
    #[error("Resource {resource} needs a selected {missing}")]
    ContextIncomplete {
        resource: &'static str,
        missing: &'static str,
    },

    /// Transport failure, non-success response or malformed body.
    #[error("Fetch failed for {endpoint}: {message}")]
    Fetch { endpoint: String, message: String },

    /// Local input check failed; nothing was sent.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Resource {0} has no cached data")]
    NotLoaded(String),

    #[error("Resource {0} is read-only")]
    ReadOnly(String),

    #[error("Cache closed")]
    CacheClosed,

    #[error("Cache dropped response channel")]
    CacheDropped,
}

impl CacheError {
    pub(crate) fn unknown_resource(name: &str) -> Self {
        CacheError::Configuration(format!("unknown resource `{name}`"))
    }

    /// Whether the caller can recover by prompting the user or retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CacheError::ContextIncomplete { .. } | CacheError::Fetch { .. } | CacheError::Validation(_)
        )
    }
}

/// Returned by request-target builders when the context lacks a selection.
///
/// The loader turns it into [`CacheError::ContextIncomplete`] tagged with the
/// resource name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingContext(pub &'static str);
