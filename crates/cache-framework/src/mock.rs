//! # Mock Transport & Testing Guide
//!
//! [`MockTransport`] implements [`Transport`] entirely in memory. Tests queue
//! expectations with canned responses, run the code under test, then inspect
//! what was actually sent.
//!
//! ## When to use Mocks vs a real server
//!
//! | Feature | MockTransport | HttpTransport |
//! |---------|---------------|---------------|
//! | **Speed** | Instant (in-memory) | Network bound |
//! | **Determinism** | Responses released on demand with [`Gate`] | Subject to the server |
//! | **Request counting** | `request_count()`, `requests()` | Server logs |
//! | **Error Injection** | Easy (`return_err`) | Hard |
//!
//! ## Testing Strategies
//!
//! <details>
//! <summary><b>Pattern 1: Cache Actor Test</b></summary>
//!
//! Spawn a `CacheActor` over a mock and assert on the number of requests.
//!
//! ```rust
//! use cache_framework::mock::MockTransport;
//! use cache_framework::{CacheActor, CacheSchema, EventBus, ResourceDescriptor, ResourceRegistry};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Signal { Invalidated }
//! impl std::fmt::Display for Signal {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str("invalidated") }
//! }
//!
//! struct Names;
//! impl CacheSchema for Names {
//!     type Context = ();
//!     type Value = Vec<String>;
//!     type Event = Signal;
//!     const STATE_INVALIDATED: Signal = Signal::Invalidated;
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = ResourceRegistry::<Names>::builder()
//!         .register(ResourceDescriptor::decoded("names", |_| Ok("/names".into()), |v: Vec<String>| v))
//!         .build()
//!         .unwrap();
//!
//!     let mock = MockTransport::new();
//!     mock.expect_get("/names").return_ok(json!(["a", "b"]));
//!
//!     let (actor, client) = CacheActor::new(Arc::new(registry), 8);
//!     tokio::spawn(actor.run(Arc::new(mock.clone()), Arc::new(EventBus::new())));
//!
//!     assert_eq!(client.ensure_fresh("names", ()).await.unwrap(), vec!["a", "b"]);
//!     assert_eq!(client.ensure_fresh("names", ()).await.unwrap(), vec!["a", "b"]);
//!     assert_eq!(mock.request_count(), 1);
//!     mock.verify();
//! }
//! ```
//! </details>
//!
//! <details>
//! <summary><b>Pattern 2: Holding a Response in Flight</b></summary>
//!
//! `expect_get(..).gated_ok(..)` returns a [`Gate`]. The request is recorded
//! immediately but only answered once the gate is opened, which lets a test
//! issue concurrent calls or invalidate the resource mid-flight.
//! </details>
//!
//! <details>
//! <summary><b>Pattern 3: Full System Test</b></summary>
//!
//! Wire a mock into the whole application and drive it through its public
//! entry points. See the `storage-admin` crate's `tests/` directory.
//! </details>

use crate::indicator::ActivityIndicator;
use crate::transport::{Transport, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

/// A request the mock received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub target: String,
    pub body: Option<Value>,
}

struct Expectation {
    method: Method,
    target: String,
    response: Result<Value, TransportError>,
    gate: Option<Arc<Notify>>,
}

#[derive(Default)]
struct MockState {
    expectations: Vec<Expectation>,
    requests: Vec<RecordedRequest>,
}

/// In-memory transport with expectation tracking.
///
/// Expectations are matched by method and target, first queued first used.
/// A request with no matching expectation is recorded and answered with a
/// [`TransportError`].
///
/// # Example
/// ```ignore
/// let mock = MockTransport::new();
/// mock.expect_get("/info_about_businesses").return_ok(json!([]));
/// mock.expect_post("/add_new_business").return_err(TransportError::with_status(409, "exists"));
///
/// let transport: Arc<dyn Transport> = Arc::new(mock.clone());
/// // Use transport in tests...
/// mock.verify(); // Ensures all expectations were met
/// ```
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_get(&self, target: impl Into<String>) -> ExpectationBuilder {
        ExpectationBuilder {
            method: Method::Get,
            target: target.into(),
            state: Arc::clone(&self.state),
        }
    }

    pub fn expect_post(&self, target: impl Into<String>) -> ExpectationBuilder {
        ExpectationBuilder {
            method: Method::Post,
            target: target.into(),
            state: Arc::clone(&self.state),
        }
    }

    pub fn expect_delete(&self, target: impl Into<String>) -> ExpectationBuilder {
        ExpectationBuilder {
            method: Method::Delete,
            target: target.into(),
            state: Arc::clone(&self.state),
        }
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Number of requests sent to `target`.
    pub fn count_for(&self, target: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.target == target)
            .count()
    }

    /// Panics if any expectation is still unused.
    pub fn verify(&self) {
        let state = self.state.lock();
        if !state.expectations.is_empty() {
            let remaining: Vec<_> = state
                .expectations
                .iter()
                .map(|e| format!("{:?} {}", e.method, e.target))
                .collect();
            panic!(
                "Not all expectations were met. {} remaining: {remaining:?}",
                remaining.len()
            );
        }
    }

    async fn respond(&self, method: Method, target: &str, body: Option<Value>) -> Result<Value, TransportError> {
        let matched = {
            let mut state = self.state.lock();
            state.requests.push(RecordedRequest {
                method,
                target: target.to_string(),
                body,
            });
            state
                .expectations
                .iter()
                .position(|e| e.method == method && e.target == target)
                .map(|index| state.expectations.remove(index))
        };

        let Some(expectation) = matched else {
            return Err(TransportError::new(format!("unexpected {method:?} {target}")));
        };
        if let Some(gate) = expectation.gate {
            gate.notified().await;
        }
        expectation.response
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, target: &str) -> Result<Value, TransportError> {
        self.respond(Method::Get, target, None).await
    }

    async fn post(&self, target: &str, body: Value) -> Result<Value, TransportError> {
        self.respond(Method::Post, target, Some(body)).await
    }

    async fn delete(&self, target: &str, body: Value) -> Result<Value, TransportError> {
        self.respond(Method::Delete, target, Some(body)).await
    }
}

/// Builder for one expected request.
pub struct ExpectationBuilder {
    method: Method,
    target: String,
    state: Arc<Mutex<MockState>>,
}

impl ExpectationBuilder {
    pub fn return_ok(self, value: Value) {
        self.push(Ok(value), None);
    }

    pub fn return_err(self, error: TransportError) {
        self.push(Err(error), None);
    }

    /// Answers with `value` once the returned gate is opened.
    pub fn gated_ok(self, value: Value) -> Gate {
        let gate = Arc::new(Notify::new());
        self.push(Ok(value), Some(Arc::clone(&gate)));
        Gate(gate)
    }

    /// Answers with `error` once the returned gate is opened.
    pub fn gated_err(self, error: TransportError) -> Gate {
        let gate = Arc::new(Notify::new());
        self.push(Err(error), Some(Arc::clone(&gate)));
        Gate(gate)
    }

    fn push(self, response: Result<Value, TransportError>, gate: Option<Arc<Notify>>) {
        self.state.lock().expectations.push(Expectation {
            method: self.method,
            target: self.target,
            response,
            gate,
        });
    }
}

/// Releases a held response. Opening before the request arrives is fine.
#[derive(Clone)]
pub struct Gate(Arc<Notify>);

impl Gate {
    pub fn open(&self) {
        self.0.notify_one();
    }
}

/// Indicator that remembers every transition.
#[derive(Debug, Default)]
pub struct RecordingIndicator {
    transitions: Mutex<Vec<bool>>,
}

impl RecordingIndicator {
    pub fn is_busy(&self) -> bool {
        self.transitions.lock().last().copied().unwrap_or(false)
    }

    pub fn transitions(&self) -> Vec<bool> {
        self.transitions.lock().clone()
    }
}

impl ActivityIndicator for RecordingIndicator {
    fn set_busy(&self, busy: bool) {
        self.transitions.lock().push(busy);
    }
}
