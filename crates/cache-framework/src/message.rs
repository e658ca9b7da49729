//! # Cache Messages
//!
//! Requests sent from a [`CacheClient`](crate::CacheClient) to the
//! [`CacheActor`](crate::CacheActor). Each carries a oneshot sender for its
//! answer, so the actor never blocks on a caller.

use crate::error::CacheError;
use crate::schema::CacheSchema;
use serde_json::Value;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by the cache actor.
pub type Response<T> = oneshot::Sender<Result<T, CacheError>>;

/// In-place change applied to a cached value.
pub type Edit<S> =
    Box<dyn FnOnce(&mut <S as CacheSchema>::Value) -> Result<(), CacheError> + Send>;

/// Operations understood by the cache actor.
///
/// - `EnsureFresh`: loader pipeline (cache hit, or single-flight fetch).
/// - `Peek`: cached data regardless of staleness, never fetches.
/// - `IsActual`, `MarkStale`, `MarkAllStaleExcept`, `MarkAllStale`: staleness tracking.
/// - `Edit`, `Pack`: the mutable round-trip exception for packable resources.
pub enum CacheRequest<S: CacheSchema> {
    EnsureFresh {
        name: String,
        context: S::Context,
        respond_to: Response<S::Value>,
    },
    Peek {
        name: String,
        respond_to: Response<Option<S::Value>>,
    },
    IsActual {
        name: String,
        respond_to: Response<bool>,
    },
    MarkStale {
        name: String,
        respond_to: Response<()>,
    },
    MarkAllStaleExcept {
        keep: Vec<String>,
        respond_to: Response<()>,
    },
    MarkAllStale {
        respond_to: Response<()>,
    },
    Edit {
        name: String,
        edit: Edit<S>,
        respond_to: Response<()>,
    },
    Pack {
        name: String,
        respond_to: Response<Value>,
    },
}

impl<S: CacheSchema> CacheRequest<S> {
    /// Short operation label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheRequest::EnsureFresh { .. } => "ensure_fresh",
            CacheRequest::Peek { .. } => "peek",
            CacheRequest::IsActual { .. } => "is_actual",
            CacheRequest::MarkStale { .. } => "mark_stale",
            CacheRequest::MarkAllStaleExcept { .. } => "mark_all_stale_except",
            CacheRequest::MarkAllStale { .. } => "mark_all_stale",
            CacheRequest::Edit { .. } => "edit",
            CacheRequest::Pack { .. } => "pack",
        }
    }
}
