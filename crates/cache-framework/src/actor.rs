//! # Cache Actor (Resource Loader)
//!
//! The `CacheActor` is the server half of the cache. It owns every piece of
//! mutable cache state (cached values, staleness flags, in-flight fetches)
//! and processes [`CacheRequest`]s sequentially, so no two operations ever
//! mutate the cache at the same time.
//!
//! ## Loading pipeline
//!
//! For `EnsureFresh`:
//! 1. An actual resource answers from the cache, no network call.
//! 2. Otherwise the descriptor builds the request target from the caller's
//!    context. A missing selection fails right away, nothing is sent.
//! 3. The `GET` runs in its own task; the actor keeps serving other requests.
//! 4. On completion the response is normalized, stored, the flag cleared and
//!    the descriptor's event published. Failures leave the cache untouched.
//!
//! ## Single-flight
//!
//! While a fetch is outstanding, further requests for the same resource attach
//! to it and receive the same outcome. If the resource was invalidated after
//! the fetch started, a new request starts a fresh fetch instead; the outdated
//! one still answers its own waiters but is never committed.

use crate::bus::EventBus;
use crate::client::CacheClient;
use crate::descriptor::ResourceDescriptor;
use crate::error::CacheError;
use crate::message::{CacheRequest, Edit, Response};
use crate::registry::ResourceRegistry;
use crate::schema::CacheSchema;
use crate::staleness::StalenessTracker;
use crate::transport::{Transport, TransportError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The loader actor for one resource registry.
///
/// # Usage Pattern
///
/// 1. **Create**: `CacheActor::new()` returns the actor and its client.
/// 2. **Wire**: pass the transport and the event bus into `actor.run(..)`.
/// 3. **Run**: spawn the run loop; drop every client to stop it.
pub struct CacheActor<S: CacheSchema> {
    receiver: mpsc::Receiver<CacheRequest<S>>,
    registry: Arc<ResourceRegistry<S>>,
}

struct Flight<S: CacheSchema> {
    name: &'static str,
    target: String,
    generation: u64,
    waiters: Vec<Response<S::Value>>,
}

struct FetchOutcome {
    flight: u64,
    result: Result<Value, TransportError>,
}

impl<S: CacheSchema> CacheActor<S> {
    /// Creates the actor and its client.
    ///
    /// `buffer_size` is the capacity of the request channel; callers wait when
    /// it is full.
    pub fn new(registry: Arc<ResourceRegistry<S>>, buffer_size: usize) -> (Self, CacheClient<S>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self { receiver, registry };
        (actor, CacheClient::new(sender))
    }

    /// Runs the request loop until every client is dropped.
    pub async fn run(mut self, transport: Arc<dyn Transport>, bus: Arc<EventBus<S::Event, S::Value>>) {
        let schema = std::any::type_name::<S>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        let (done, mut completions) = mpsc::unbounded_channel();
        let mut loader = Loader {
            tracker: StalenessTracker::new(self.registry.names().iter().copied()),
            registry: self.registry,
            cache: HashMap::new(),
            flights: HashMap::new(),
            current: HashMap::new(),
            next_flight: 1,
            transport,
            bus,
            done,
        };
        info!(schema, resources = loader.registry.len(), "Cache started");

        loop {
            tokio::select! {
                Some(outcome) = completions.recv() => loader.complete(outcome),
                msg = self.receiver.recv() => match msg {
                    Some(msg) => loader.handle(msg),
                    None => break,
                },
            }
        }

        info!(
            schema,
            cached = loader.cache.len(),
            in_flight = loader.flights.len(),
            "Shutdown"
        );
    }
}

struct Loader<S: CacheSchema> {
    registry: Arc<ResourceRegistry<S>>,
    tracker: StalenessTracker,
    cache: HashMap<&'static str, S::Value>,
    flights: HashMap<u64, Flight<S>>,
    current: HashMap<&'static str, u64>,
    next_flight: u64,
    transport: Arc<dyn Transport>,
    bus: Arc<EventBus<S::Event, S::Value>>,
    done: mpsc::UnboundedSender<FetchOutcome>,
}

impl<S: CacheSchema> Loader<S> {
    fn handle(&mut self, msg: CacheRequest<S>) {
        tracing::trace!(op = msg.kind(), "Request");
        match msg {
            CacheRequest::EnsureFresh {
                name,
                context,
                respond_to,
            } => self.ensure_fresh(&name, context, respond_to),
            CacheRequest::Peek { name, respond_to } => {
                let result = self
                    .registry
                    .get(&name)
                    .map(|d| self.cache.get(d.name()).cloned());
                let _ = respond_to.send(result);
            }
            CacheRequest::IsActual { name, respond_to } => {
                let _ = respond_to.send(self.tracker.is_actual(&name));
            }
            CacheRequest::MarkStale { name, respond_to } => {
                let result = self.tracker.mark_stale(&name);
                debug!(resource = %name, ok = result.is_ok(), "Marked stale");
                let _ = respond_to.send(result);
            }
            CacheRequest::MarkAllStaleExcept { keep, respond_to } => {
                let result = self.tracker.mark_all_stale_except(&keep);
                debug!(?keep, ok = result.is_ok(), "Marked all stale except");
                let _ = respond_to.send(result);
            }
            CacheRequest::MarkAllStale { respond_to } => {
                self.tracker.mark_all_stale();
                debug!("Marked all stale");
                let _ = respond_to.send(Ok(()));
            }
            CacheRequest::Edit {
                name,
                edit,
                respond_to,
            } => {
                let result = self.edit(&name, edit);
                if let Err(e) = &result {
                    warn!(resource = %name, error = %e, "Edit rejected");
                }
                let _ = respond_to.send(result);
            }
            CacheRequest::Pack { name, respond_to } => {
                let result = self.pack(&name);
                let _ = respond_to.send(result);
            }
        }
    }

    fn ensure_fresh(&mut self, name: &str, context: S::Context, respond_to: Response<S::Value>) {
        let registry = Arc::clone(&self.registry);
        let descriptor = match registry.get(name) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(resource = name, error = %e, "Unknown resource requested");
                let _ = respond_to.send(Err(e));
                return;
            }
        };
        let key = descriptor.name();

        if self.tracker.is_actual(key).unwrap_or(false) {
            if let Some(value) = self.cache.get(key) {
                debug!(resource = key, "Cache hit");
                let _ = respond_to.send(Ok(value.clone()));
                return;
            }
        }

        let generation = match self.tracker.generation(key) {
            Ok(generation) => generation,
            Err(e) => {
                let _ = respond_to.send(Err(e));
                return;
            }
        };

        if let Some(flight) = self
            .current
            .get(key)
            .and_then(|id| self.flights.get_mut(id))
        {
            if flight.generation == generation {
                flight.waiters.push(respond_to);
                debug!(resource = key, waiters = flight.waiters.len(), "Attached to in-flight fetch");
                return;
            }
        }

        let target = match descriptor.build_target(&context) {
            Ok(target) => target,
            Err(e) => {
                debug!(resource = key, error = %e, "Context incomplete");
                let _ = respond_to.send(Err(e));
                return;
            }
        };

        let id = self.next_flight;
        self.next_flight += 1;
        if let Some(previous) = self.current.insert(key, id) {
            debug!(resource = key, flight = previous, "Superseded outdated fetch");
        }
        self.flights.insert(
            id,
            Flight {
                name: key,
                target: target.clone(),
                generation,
                waiters: vec![respond_to],
            },
        );
        info!(resource = key, endpoint = %target, flight = id, "Fetch");

        let transport = Arc::clone(&self.transport);
        let done = self.done.clone();
        tokio::spawn(async move {
            let result = transport.get(&target).await;
            let _ = done.send(FetchOutcome { flight: id, result });
        });
    }

    fn complete(&mut self, outcome: FetchOutcome) {
        let Some(flight) = self.flights.remove(&outcome.flight) else {
            return;
        };
        let is_current = self.current.get(flight.name) == Some(&outcome.flight);
        if is_current {
            self.current.remove(flight.name);
        }
        // Invalidated while in flight: the result may belong to an older context.
        let committable = is_current
            && self.tracker.generation(flight.name).ok() == Some(flight.generation);

        let registry = Arc::clone(&self.registry);
        let result = registry.get(flight.name).and_then(|descriptor| {
            let raw = outcome
                .result
                .map_err(|e| e.into_cache_error(&flight.target))?;
            let value = descriptor.process(&flight.target, raw)?;
            if committable {
                self.commit(descriptor, flight.generation, &value);
            } else {
                debug!(
                    resource = flight.name,
                    flight = outcome.flight,
                    superseded = !is_current,
                    "Discarded outdated result"
                );
            }
            Ok(value)
        });

        if let Err(e) = &result {
            warn!(
                resource = flight.name,
                endpoint = %flight.target,
                error = %e,
                waiters = flight.waiters.len(),
                "Fetch failed"
            );
        }
        for waiter in flight.waiters {
            let _ = waiter.send(result.clone());
        }
    }

    fn commit(&mut self, descriptor: &ResourceDescriptor<S>, generation: u64, value: &S::Value) {
        let name = descriptor.name();
        self.cache.insert(name, value.clone());
        let fresh = self.tracker.mark_actual(name, generation).unwrap_or(false);
        info!(resource = name, fresh, "Loaded");
        if let Some(event) = descriptor.event() {
            self.bus.publish(event, Some(value.clone()));
        }
    }

    fn edit(&mut self, name: &str, edit: Edit<S>) -> Result<(), CacheError> {
        let descriptor = self.registry.get(name)?;
        if !descriptor.is_packable() {
            return Err(CacheError::ReadOnly(name.to_string()));
        }
        let value = self
            .cache
            .get_mut(descriptor.name())
            .ok_or_else(|| CacheError::NotLoaded(name.to_string()))?;
        edit(value)
    }

    fn pack(&self, name: &str) -> Result<Value, CacheError> {
        let descriptor = self.registry.get(name)?;
        let value = self
            .cache
            .get(descriptor.name())
            .ok_or_else(|| CacheError::NotLoaded(name.to_string()))?;
        descriptor.pack(value)
    }
}
