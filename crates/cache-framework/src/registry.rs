//! # Resource Registry
//!
//! The immutable table of resource descriptors. It is built once at startup,
//! owned by the application root and shared by reference (`Arc`) with the
//! components that need it. There is no ambient global lookup.

use crate::descriptor::ResourceDescriptor;
use crate::error::CacheError;
use crate::schema::CacheSchema;
use std::collections::HashMap;

/// Fixed set of named resources.
pub struct ResourceRegistry<S: CacheSchema> {
    descriptors: HashMap<&'static str, ResourceDescriptor<S>>,
    order: Vec<&'static str>,
}

impl<S: CacheSchema> ResourceRegistry<S> {
    pub fn builder() -> RegistryBuilder<S> {
        RegistryBuilder {
            descriptors: Vec::new(),
        }
    }

    /// Looks up a descriptor; unknown names are a [`CacheError::Configuration`].
    pub fn get(&self, name: &str) -> Result<&ResourceDescriptor<S>, CacheError> {
        self.descriptors
            .get(name)
            .ok_or_else(|| CacheError::unknown_resource(name))
    }

    /// Resource names in registration order.
    pub fn names(&self) -> &[&'static str] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<S: CacheSchema> std::fmt::Debug for ResourceRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("names", &self.order)
            .finish()
    }
}

/// Collects descriptors and rejects duplicate names.
pub struct RegistryBuilder<S: CacheSchema> {
    descriptors: Vec<ResourceDescriptor<S>>,
}

impl<S: CacheSchema> RegistryBuilder<S> {
    pub fn register(mut self, descriptor: ResourceDescriptor<S>) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn build(self) -> Result<ResourceRegistry<S>, CacheError> {
        let mut descriptors = HashMap::with_capacity(self.descriptors.len());
        let mut order = Vec::with_capacity(self.descriptors.len());
        for descriptor in self.descriptors {
            let name = descriptor.name();
            if descriptors.insert(name, descriptor).is_some() {
                return Err(CacheError::Configuration(format!(
                    "duplicate resource `{name}`"
                )));
            }
            order.push(name);
        }
        Ok(ResourceRegistry { descriptors, order })
    }
}
