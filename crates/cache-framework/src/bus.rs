//! # Event Bus
//!
//! An in-process publish/subscribe service injected into the components that
//! need it. It replaces a global dispatch target while keeping publishers and
//! consumers decoupled.
//!
//! ## Dispatch rules
//!
//! - Handlers for one publish run synchronously, in subscription order.
//! - Nothing is buffered for later subscribers: the handler list is captured
//!   when the event is published.
//! - Dispatches never interleave. A publish issued while another one is being
//!   dispatched (e.g. from inside a handler) is queued and delivered right after
//!   the current dispatch finishes, on the dispatching thread.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Callback invoked with the event payload, if any.
pub type Handler<P> = Arc<dyn Fn(Option<&P>) + Send + Sync>;

/// Token returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Pending<E, P> {
    event: E,
    payload: Option<P>,
    handlers: Vec<Handler<P>>,
}

struct DispatchState<E, P> {
    dispatching: bool,
    queue: VecDeque<Pending<E, P>>,
}

/// Publish/subscribe channel keyed by event name.
pub struct EventBus<E, P> {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<E, Vec<(SubscriptionId, Handler<P>)>>>,
    dispatch: Mutex<DispatchState<E, P>>,
}

impl<E, P> Default for EventBus<E, P>
where
    E: Copy + Eq + Hash + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, P> EventBus<E, P>
where
    E: Copy + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: Mutex::new(HashMap::new()),
            dispatch: Mutex::new(DispatchState {
                dispatching: false,
                queue: VecDeque::new(),
            }),
        }
    }

    pub fn subscribe(
        &self,
        event: E,
        handler: impl Fn(Option<&P>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handler: Handler<P> = Arc::new(handler);
        self.subscribers
            .lock()
            .entry(event)
            .or_default()
            .push((id, handler));
        debug!(?event, ?id, "Subscribed");
        id
    }

    /// Removes a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, event: E, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let Some(handlers) = subscribers.get_mut(&event) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            subscribers.remove(&event);
        }
        debug!(?event, ?id, removed, "Unsubscribed");
        removed
    }

    pub fn subscriber_count(&self, event: E) -> usize {
        self.subscribers.lock().get(&event).map_or(0, Vec::len)
    }

    /// Delivers `payload` to every current subscriber of `event`.
    pub fn publish(&self, event: E, payload: Option<P>) {
        let handlers: Vec<Handler<P>> = self
            .subscribers
            .lock()
            .get(&event)
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        {
            let mut state = self.dispatch.lock();
            state.queue.push_back(Pending {
                event,
                payload,
                handlers,
            });
            if state.dispatching {
                trace!(?event, "Queued behind running dispatch");
                return;
            }
            state.dispatching = true;
        }

        let _reset = DispatchReset(&self.dispatch);
        loop {
            let next = self.dispatch.lock().queue.pop_front();
            let Some(pending) = next else { break };
            debug!(event = ?pending.event, handlers = pending.handlers.len(), "Publish");
            for handler in &pending.handlers {
                handler(pending.payload.as_ref());
            }
        }
    }
}

/// Releases the dispatch flag even if a handler panics.
struct DispatchReset<'a, E, P>(&'a Mutex<DispatchState<E, P>>);

impl<E, P> Drop for DispatchReset<'_, E, P> {
    fn drop(&mut self) {
        self.0.lock().dispatching = false;
    }
}
