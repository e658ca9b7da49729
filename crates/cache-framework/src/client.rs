//! # Cache Client
//!
//! The handle every consumer and the mutation coordinator use to talk to the
//! [`CacheActor`](crate::CacheActor).

use crate::error::CacheError;
use crate::message::CacheRequest;
use crate::schema::CacheSchema;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::instrument;

/// ## CacheClient
///
/// Async API over the cache actor's request channel. Holds only a sender, so
/// cloning is inexpensive and clones can be handed to every consumer.
///
/// Errors from the channel itself surface as [`CacheError::CacheClosed`]
/// (actor gone before the request was sent) or [`CacheError::CacheDropped`]
/// (actor gone before it answered).
pub struct CacheClient<S: CacheSchema> {
    sender: mpsc::Sender<CacheRequest<S>>,
}

impl<S: CacheSchema> Clone for CacheClient<S> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<S: CacheSchema> CacheClient<S> {
    pub fn new(sender: mpsc::Sender<CacheRequest<S>>) -> Self {
        Self { sender }
    }

    async fn call<T>(
        &self,
        request: impl FnOnce(oneshot::Sender<Result<T, CacheError>>) -> CacheRequest<S>,
    ) -> Result<T, CacheError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(request(respond_to))
            .await
            .map_err(|_| CacheError::CacheClosed)?;
        response.await.map_err(|_| CacheError::CacheDropped)?
    }

    /// Returns the resource's data, fetching it first if it is stale.
    ///
    /// Concurrent callers for the same resource share one network request.
    #[instrument(skip(self, context), fields(resource = %name))]
    pub async fn ensure_fresh(&self, name: &str, context: S::Context) -> Result<S::Value, CacheError> {
        self.call(|respond_to| CacheRequest::EnsureFresh {
            name: name.to_string(),
            context,
            respond_to,
        })
        .await
    }

    /// Cached data regardless of staleness. Never touches the network.
    pub async fn peek(&self, name: &str) -> Result<Option<S::Value>, CacheError> {
        self.call(|respond_to| CacheRequest::Peek {
            name: name.to_string(),
            respond_to,
        })
        .await
    }

    pub async fn is_actual(&self, name: &str) -> Result<bool, CacheError> {
        self.call(|respond_to| CacheRequest::IsActual {
            name: name.to_string(),
            respond_to,
        })
        .await
    }

    #[instrument(skip(self), fields(resource = %name))]
    pub async fn mark_stale(&self, name: &str) -> Result<(), CacheError> {
        self.call(|respond_to| CacheRequest::MarkStale {
            name: name.to_string(),
            respond_to,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn mark_all_stale_except(&self, keep: &[&str]) -> Result<(), CacheError> {
        let keep = keep.iter().map(|k| k.to_string()).collect();
        self.call(|respond_to| CacheRequest::MarkAllStaleExcept { keep, respond_to })
            .await
    }

    #[instrument(skip(self))]
    pub async fn mark_all_stale(&self) -> Result<(), CacheError> {
        self.call(|respond_to| CacheRequest::MarkAllStale { respond_to })
            .await
    }

    /// Applies `edit` to the cached value of a packable resource, in place.
    ///
    /// Fails with [`CacheError::ReadOnly`] for resources without a packer and
    /// [`CacheError::NotLoaded`] when nothing is cached yet.
    pub async fn edit(
        &self,
        name: &str,
        edit: impl FnOnce(&mut S::Value) -> Result<(), CacheError> + Send + 'static,
    ) -> Result<(), CacheError> {
        self.call(|respond_to| CacheRequest::Edit {
            name: name.to_string(),
            edit: Box::new(edit),
            respond_to,
        })
        .await
    }

    /// Serializes the cached (possibly edited) value back into a submission body.
    #[instrument(skip(self), fields(resource = %name))]
    pub async fn pack(&self, name: &str) -> Result<Value, CacheError> {
        self.call(|respond_to| CacheRequest::Pack {
            name: name.to_string(),
            respond_to,
        })
        .await
    }
}
