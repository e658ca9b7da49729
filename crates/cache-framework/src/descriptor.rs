//! # Resource Descriptors
//!
//! A `ResourceDescriptor` is the immutable recipe for one named resource: how
//! to build its request target from the context, how to normalize the raw
//! response, how to pack it back into a submission payload, and which event
//! announces fresh data.

use crate::error::{CacheError, MissingContext};
use crate::schema::CacheSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

type UrlBuilder<S> =
    Box<dyn Fn(&<S as CacheSchema>::Context) -> Result<String, MissingContext> + Send + Sync>;
type DataProcessor<S> =
    Box<dyn Fn(Value) -> Result<<S as CacheSchema>::Value, String> + Send + Sync>;
type Packer<S> = Box<dyn Fn(&<S as CacheSchema>::Value) -> Result<Value, String> + Send + Sync>;

/// Immutable description of a server-backed resource.
///
/// The cached data and staleness flag are not stored here; they belong to the
/// loader actor, which is the only component allowed to mutate them.
pub struct ResourceDescriptor<S: CacheSchema> {
    name: &'static str,
    url_builder: UrlBuilder<S>,
    data_processor: DataProcessor<S>,
    packer: Option<Packer<S>>,
    event: Option<S::Event>,
}

impl<S: CacheSchema> ResourceDescriptor<S> {
    /// Creates a descriptor with a custom data processor.
    ///
    /// The processor returns a plain message on failure; the loader reports it
    /// as a [`CacheError::Fetch`] for the request target.
    pub fn new(
        name: &'static str,
        url_builder: impl Fn(&S::Context) -> Result<String, MissingContext> + Send + Sync + 'static,
        data_processor: impl Fn(Value) -> Result<S::Value, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            url_builder: Box::new(url_builder),
            data_processor: Box::new(data_processor),
            packer: None,
            event: None,
        }
    }

    /// Creates a descriptor whose response is taken as-is.
    ///
    /// The body is decoded into `T` and wrapped into the schema's value type.
    pub fn decoded<T: DeserializeOwned>(
        name: &'static str,
        url_builder: impl Fn(&S::Context) -> Result<String, MissingContext> + Send + Sync + 'static,
        wrap: impl Fn(T) -> S::Value + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, url_builder, move |raw| {
            serde_json::from_value::<T>(raw)
                .map(&wrap)
                .map_err(|e| format!("malformed response: {e}"))
        })
    }

    /// Announces fresh data for this resource on `event`.
    pub fn announce(mut self, event: S::Event) -> Self {
        self.event = Some(event);
        self
    }

    /// Marks the resource as round-tripping to the server.
    ///
    /// Only resources with a packer accept in-place edits of their cached data.
    pub fn with_packer(
        mut self,
        packer: impl Fn(&S::Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.packer = Some(Box::new(packer));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn event(&self) -> Option<S::Event> {
        self.event
    }

    pub fn is_packable(&self) -> bool {
        self.packer.is_some()
    }

    /// Builds the request target, failing if the context lacks a selection.
    pub fn build_target(&self, context: &S::Context) -> Result<String, CacheError> {
        (self.url_builder)(context).map_err(|MissingContext(missing)| {
            CacheError::ContextIncomplete {
                resource: self.name,
                missing,
            }
        })
    }

    /// Normalizes a raw response fetched from `endpoint`.
    pub fn process(&self, endpoint: &str, raw: Value) -> Result<S::Value, CacheError> {
        (self.data_processor)(raw).map_err(|message| CacheError::Fetch {
            endpoint: endpoint.to_string(),
            message,
        })
    }

    /// Serializes a cached value into a submission payload.
    pub fn pack(&self, value: &S::Value) -> Result<Value, CacheError> {
        let packer = self
            .packer
            .as_ref()
            .ok_or_else(|| CacheError::ReadOnly(self.name.to_string()))?;
        packer(value).map_err(|e| CacheError::Validation(format!("cannot pack {}: {e}", self.name)))
    }
}

impl<S: CacheSchema> std::fmt::Debug for ResourceDescriptor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("name", &self.name)
            .field("event", &self.event)
            .field("packable", &self.is_packable())
            .finish()
    }
}
