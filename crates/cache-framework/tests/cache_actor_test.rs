use cache_framework::mock::MockTransport;
use cache_framework::{
    CacheActor, CacheClient, CacheError, CacheSchema, EventBus, MissingContext, ResourceDescriptor,
    ResourceRegistry, TransportError,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Clone, Debug, PartialEq)]
enum Data {
    Totals(Vec<u32>),
    Draft(Vec<u32>),
    Listing(Vec<String>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Signal {
    TotalsUpdated,
    DraftSelected,
    Invalidated,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

struct Shop;

impl CacheSchema for Shop {
    type Context = Option<u32>;
    type Value = Data;
    type Event = Signal;
    const STATE_INVALIDATED: Signal = Signal::Invalidated;
}

fn owner_target(prefix: &'static str) -> impl Fn(&Option<u32>) -> Result<String, MissingContext> {
    move |owner| {
        owner
            .map(|id| format!("{prefix}/{id}"))
            .ok_or(MissingContext("owner"))
    }
}

fn registry() -> Arc<ResourceRegistry<Shop>> {
    let registry = ResourceRegistry::builder()
        .register(
            ResourceDescriptor::decoded("totals", owner_target("/totals"), Data::Totals)
                .announce(Signal::TotalsUpdated),
        )
        .register(
            ResourceDescriptor::decoded("draft", owner_target("/draft"), Data::Draft)
                .announce(Signal::DraftSelected)
                .with_packer(|data| match data {
                    Data::Draft(items) => Ok(json!({ "items": items })),
                    other => Err(format!("not a draft: {other:?}")),
                }),
        )
        .register(ResourceDescriptor::decoded(
            "listing",
            |_: &Option<u32>| Ok("/listing".to_string()),
            Data::Listing,
        ))
        .build()
        .unwrap();
    Arc::new(registry)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn start(mock: &MockTransport) -> (CacheClient<Shop>, Arc<EventBus<Signal, Data>>, JoinHandle<()>) {
    init_tracing();
    let bus = Arc::new(EventBus::new());
    let (actor, client) = CacheActor::new(registry(), 16);
    let handle = tokio::spawn(actor.run(Arc::new(mock.clone()), Arc::clone(&bus)));
    (client, bus, handle)
}

fn record(bus: &EventBus<Signal, Data>, event: Signal) -> Arc<Mutex<Vec<Option<Data>>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bus.subscribe(event, move |payload| sink.lock().push(payload.cloned()));
    seen
}

async fn wait_for_requests(mock: &MockTransport, count: usize) {
    for _ in 0..200 {
        if mock.request_count() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("expected {count} requests, saw {}", mock.request_count());
}

#[tokio::test]
async fn test_actual_resource_is_served_without_network() {
    let mock = MockTransport::new();
    mock.expect_get("/totals/1").return_ok(json!([3, 4]));
    let (client, _bus, _handle) = start(&mock);

    let first = client.ensure_fresh("totals", Some(1)).await.unwrap();
    let second = client.ensure_fresh("totals", Some(1)).await.unwrap();

    assert_eq!(first, Data::Totals(vec![3, 4]));
    assert_eq!(second, first);
    assert!(client.is_actual("totals").await.unwrap());
    assert_eq!(mock.request_count(), 1);
    mock.verify();
}

#[tokio::test]
async fn test_concurrent_requests_share_one_fetch() {
    let mock = MockTransport::new();
    let gate = mock.expect_get("/totals/1").gated_ok(json!([7]));
    let (client, _bus, _handle) = start(&mock);

    let release = async {
        wait_for_requests(&mock, 1).await;
        // Queued behind the three loads, so all of them have been handled.
        client.is_actual("totals").await.unwrap();
        gate.open();
    };
    let (a, b, c, ()) = tokio::join!(
        client.ensure_fresh("totals", Some(1)),
        client.ensure_fresh("totals", Some(1)),
        client.ensure_fresh("totals", Some(1)),
        release,
    );

    for result in [a, b, c] {
        assert_eq!(result.unwrap(), Data::Totals(vec![7]));
    }
    assert_eq!(mock.count_for("/totals/1"), 1);
}

#[tokio::test]
async fn test_concurrent_failure_reaches_every_caller() {
    let mock = MockTransport::new();
    let gate = mock
        .expect_get("/totals/1")
        .gated_err(TransportError::with_status(500, "database is down"));
    let (client, _bus, _handle) = start(&mock);

    let release = async {
        wait_for_requests(&mock, 1).await;
        client.is_actual("totals").await.unwrap();
        gate.open();
    };
    let (a, b, ()) = tokio::join!(
        client.ensure_fresh("totals", Some(1)),
        client.ensure_fresh("totals", Some(1)),
        release,
    );

    let expected = CacheError::Fetch {
        endpoint: "/totals/1".into(),
        message: "database is down (HTTP 500)".into(),
    };
    assert_eq!(a.unwrap_err(), expected);
    assert_eq!(b.unwrap_err(), expected);
    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn test_failed_fetch_leaves_resource_stale() {
    let mock = MockTransport::new();
    mock.expect_get("/totals/1")
        .return_err(TransportError::new("connection refused"));
    mock.expect_get("/totals/1").return_ok(json!([1]));
    let (client, bus, _handle) = start(&mock);
    let seen = record(&bus, Signal::TotalsUpdated);

    let err = client.ensure_fresh("totals", Some(1)).await.unwrap_err();
    assert!(matches!(err, CacheError::Fetch { ref endpoint, .. } if endpoint == "/totals/1"));
    assert!(!client.is_actual("totals").await.unwrap());
    assert_eq!(client.peek("totals").await.unwrap(), None);
    assert!(seen.lock().is_empty());

    // Next access retries.
    assert_eq!(
        client.ensure_fresh("totals", Some(1)).await.unwrap(),
        Data::Totals(vec![1])
    );
    assert_eq!(mock.request_count(), 2);
}

#[tokio::test]
async fn test_malformed_body_is_a_fetch_error() {
    let mock = MockTransport::new();
    mock.expect_get("/totals/1").return_ok(json!({ "unexpected": true }));
    let (client, _bus, _handle) = start(&mock);

    match client.ensure_fresh("totals", Some(1)).await {
        Err(CacheError::Fetch { message, .. }) => assert!(message.starts_with("malformed response")),
        other => panic!("Expected Fetch error, got {:?}", other),
    }
    assert!(!client.is_actual("totals").await.unwrap());
}

#[tokio::test]
async fn test_fresh_data_is_announced() {
    let mock = MockTransport::new();
    mock.expect_get("/totals/1").return_ok(json!([5]));
    mock.expect_get("/listing").return_ok(json!(["Acme"]));
    let (client, bus, _handle) = start(&mock);
    let totals = record(&bus, Signal::TotalsUpdated);
    let drafts = record(&bus, Signal::DraftSelected);

    client.ensure_fresh("totals", Some(1)).await.unwrap();
    client.ensure_fresh("listing", None).await.unwrap();
    // Served from cache: no second announcement.
    client.ensure_fresh("totals", Some(1)).await.unwrap();

    assert_eq!(*totals.lock(), vec![Some(Data::Totals(vec![5]))]);
    assert!(drafts.lock().is_empty());
}

#[tokio::test]
async fn test_missing_selection_sends_nothing() {
    let mock = MockTransport::new();
    let (client, _bus, _handle) = start(&mock);

    let err = client.ensure_fresh("draft", None).await.unwrap_err();
    assert_eq!(
        err,
        CacheError::ContextIncomplete {
            resource: "draft",
            missing: "owner"
        }
    );
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn test_unknown_resource_is_configuration_error() {
    let mock = MockTransport::new();
    let (client, _bus, _handle) = start(&mock);

    assert!(matches!(
        client.ensure_fresh("bogus", Some(1)).await,
        Err(CacheError::Configuration(_))
    ));
    assert!(matches!(
        client.mark_stale("bogus").await,
        Err(CacheError::Configuration(_))
    ));
    assert!(matches!(
        client.mark_all_stale_except(&["totals", "bogus"]).await,
        Err(CacheError::Configuration(_))
    ));
}

#[tokio::test]
async fn test_invalidation_keeps_data_until_refetch() {
    let mock = MockTransport::new();
    mock.expect_get("/totals/1").return_ok(json!([1]));
    mock.expect_get("/totals/1").return_ok(json!([1, 2]));
    let (client, _bus, _handle) = start(&mock);

    client.ensure_fresh("totals", Some(1)).await.unwrap();
    client.mark_stale("totals").await.unwrap();

    assert!(!client.is_actual("totals").await.unwrap());
    assert_eq!(
        client.peek("totals").await.unwrap(),
        Some(Data::Totals(vec![1]))
    );
    assert_eq!(
        client.ensure_fresh("totals", Some(1)).await.unwrap(),
        Data::Totals(vec![1, 2])
    );
    mock.verify();
}

#[tokio::test]
async fn test_mark_all_stale_except_keeps_listed_resources() {
    let mock = MockTransport::new();
    mock.expect_get("/totals/1").return_ok(json!([1]));
    mock.expect_get("/listing").return_ok(json!(["Acme"]));
    let (client, _bus, _handle) = start(&mock);

    client.ensure_fresh("totals", Some(1)).await.unwrap();
    client.ensure_fresh("listing", None).await.unwrap();
    client.mark_all_stale_except(&["listing"]).await.unwrap();

    assert!(client.is_actual("listing").await.unwrap());
    assert!(!client.is_actual("totals").await.unwrap());

    client.mark_all_stale().await.unwrap();
    assert!(!client.is_actual("listing").await.unwrap());
}

#[tokio::test]
async fn test_fetch_started_before_invalidation_is_superseded() {
    let mock = MockTransport::new();
    let gate = mock.expect_get("/totals/1").gated_ok(json!([1]));
    mock.expect_get("/totals/1").return_ok(json!([2]));
    let (client, bus, _handle) = start(&mock);
    let seen = record(&bus, Signal::TotalsUpdated);

    let early = {
        let client = client.clone();
        tokio::spawn(async move { client.ensure_fresh("totals", Some(1)).await })
    };
    wait_for_requests(&mock, 1).await;

    client.mark_stale("totals").await.unwrap();
    let late = client.ensure_fresh("totals", Some(1)).await.unwrap();
    assert_eq!(late, Data::Totals(vec![2]));

    gate.open();
    // The outdated fetch still answers its own caller...
    assert_eq!(early.await.unwrap().unwrap(), Data::Totals(vec![1]));
    // ...but never overwrites the newer data.
    assert_eq!(
        client.peek("totals").await.unwrap(),
        Some(Data::Totals(vec![2]))
    );
    assert!(client.is_actual("totals").await.unwrap());
    assert_eq!(*seen.lock(), vec![Some(Data::Totals(vec![2]))]);
}

#[tokio::test]
async fn test_invalidation_during_fetch_leaves_resource_stale() {
    let mock = MockTransport::new();
    mock.expect_get("/totals/1").return_ok(json!([5]));
    let gate = mock.expect_get("/totals/2").gated_ok(json!([1]));
    mock.expect_get("/totals/2").return_ok(json!([2]));
    let (client, bus, _handle) = start(&mock);
    let updates = record(&bus, Signal::TotalsUpdated);

    client.ensure_fresh("totals", Some(1)).await.unwrap();
    client.mark_stale("totals").await.unwrap();
    let pending = {
        let client = client.clone();
        tokio::spawn(async move { client.ensure_fresh("totals", Some(2)).await })
    };
    wait_for_requests(&mock, 2).await;
    client.mark_all_stale().await.unwrap();
    gate.open();

    // The caller still gets its answer, but nothing is committed or announced.
    assert_eq!(pending.await.unwrap().unwrap(), Data::Totals(vec![1]));
    assert_eq!(*updates.lock(), vec![Some(Data::Totals(vec![5]))]);
    assert_eq!(client.peek("totals").await.unwrap(), Some(Data::Totals(vec![5])));
    assert!(!client.is_actual("totals").await.unwrap());

    assert_eq!(
        client.ensure_fresh("totals", Some(2)).await.unwrap(),
        Data::Totals(vec![2])
    );
    assert_eq!(updates.lock().len(), 2);
    assert!(client.is_actual("totals").await.unwrap());
    mock.verify();
}

#[tokio::test]
async fn test_edit_and_pack_round_trip() {
    let mock = MockTransport::new();
    mock.expect_get("/draft/3").return_ok(json!([1, 2]));
    mock.expect_get("/totals/3").return_ok(json!([10]));
    let (client, _bus, _handle) = start(&mock);

    assert_eq!(
        client.edit("draft", |_| Ok(())).await,
        Err(CacheError::NotLoaded("draft".into()))
    );

    client.ensure_fresh("draft", Some(3)).await.unwrap();
    client
        .edit("draft", |data| match data {
            Data::Draft(items) => {
                items.push(9);
                Ok(())
            }
            _ => Err(CacheError::Validation("wrong variant".into())),
        })
        .await
        .unwrap();

    assert_eq!(client.pack("draft").await.unwrap(), json!({ "items": [1, 2, 9] }));
    // Edits stay local until the resource is refetched.
    assert!(client.is_actual("draft").await.unwrap());

    client.ensure_fresh("totals", Some(3)).await.unwrap();
    assert_eq!(
        client.edit("totals", |_| Ok(())).await,
        Err(CacheError::ReadOnly("totals".into()))
    );
    assert_eq!(
        client.pack("totals").await,
        Err(CacheError::ReadOnly("totals".into()))
    );
}

#[tokio::test]
async fn test_actor_stops_when_clients_are_dropped() {
    let mock = MockTransport::new();
    let (client, _bus, handle) = start(&mock);
    let other = client.clone();
    drop(client);
    drop(other);

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("actor should stop")
        .unwrap();
}
