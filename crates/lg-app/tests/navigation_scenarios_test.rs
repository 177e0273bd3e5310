//! End-to-end navigation scenarios over the in-process identity source and
//! the in-memory key-value store.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{timeout, Instant};

use lg_app::{GateDeps, GateRuntime, NavigationWatcher};
use lg_core::ports::{keys, IdentitySourcePort, KeyValueStorePort};
use lg_core::{CachedIdentitySnapshot, Identity, NavigationTarget, SessionResolution};
use lg_infra::{ChannelIdentitySource, IdentityFeed, InMemoryKeyValueStore, SystemClock};

const DEFAULT_DEADLINE: Duration = Duration::from_millis(5_000);

struct Harness {
    gate: GateRuntime,
    feed: IdentityFeed,
    source: ChannelIdentitySource,
    store: Arc<InMemoryKeyValueStore>,
}

fn harness(store: InMemoryKeyValueStore, deadline: Duration) -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let (source, feed) = ChannelIdentitySource::new();
    let store = Arc::new(store);
    let identity_source: Arc<dyn IdentitySourcePort> = Arc::new(source.clone());
    let kv: Arc<dyn KeyValueStorePort> = store.clone();
    let gate = GateRuntime::new(
        GateDeps {
            identity_source,
            store: kv,
            clock: Arc::new(SystemClock),
        },
        deadline,
    );
    Harness {
        gate,
        feed,
        source,
        store,
    }
}

fn onboarded_store() -> InMemoryKeyValueStore {
    InMemoryKeyValueStore::with_entries([(keys::ONBOARDING_COMPLETED, "true")])
}

fn alice() -> Identity {
    Identity::new("u1", Some("a@b.com".to_string()))
}

async fn next_target(watcher: &mut NavigationWatcher) -> NavigationTarget {
    timeout(Duration::from_secs(1), watcher.changed())
        .await
        .expect("navigation change within timeout")
        .expect("session store alive")
}

/// Poll until the cached snapshot matches `expected`.
async fn wait_for_cache(store: &InMemoryKeyValueStore, expected: Option<&Identity>) -> bool {
    for _ in 0..200 {
        let cached = store
            .peek(keys::CACHED_IDENTITY)
            .and_then(|raw| serde_json::from_str::<CachedIdentitySnapshot>(&raw).ok());
        let matches = match (expected, cached) {
            (Some(identity), Some(snapshot)) => snapshot.matches(identity),
            (None, None) => true,
            _ => false,
        };
        if matches {
            return true;
        }
        tokio::task::yield_now().await;
    }
    false
}

#[tokio::test]
async fn fresh_install_goes_from_loading_to_onboarding() {
    let h = harness(InMemoryKeyValueStore::new(), DEFAULT_DEADLINE);
    let mut watcher = h.gate.navigation();
    assert_eq!(watcher.last(), NavigationTarget::Loading);

    h.gate.start().await.unwrap();
    h.feed.push_identity(alice()).unwrap();

    assert_eq!(next_target(&mut watcher).await, NavigationTarget::Onboarding);
    assert!(h.gate.session().is_authenticated());
}

#[tokio::test]
async fn onboarded_user_goes_from_loading_to_main_application() {
    let h = harness(onboarded_store(), DEFAULT_DEADLINE);
    let mut watcher = h.gate.navigation();

    h.gate.start().await.unwrap();
    h.feed.push_identity(alice()).unwrap();

    assert_eq!(
        next_target(&mut watcher).await,
        NavigationTarget::MainApplication
    );
}

#[tokio::test(start_paused = true)]
async fn silent_source_resolves_unauthenticated_at_the_deadline() {
    let h = harness(onboarded_store(), DEFAULT_DEADLINE);
    let mut watcher = h.gate.navigation();
    let started = Instant::now();
    h.gate.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(4_999)).await;
    assert_eq!(h.gate.current_target(), NavigationTarget::Loading);

    let target = watcher.changed().await;

    assert_eq!(target, Some(NavigationTarget::Unauthenticated));
    assert!(started.elapsed() >= DEFAULT_DEADLINE);
    assert_eq!(h.gate.session().resolution_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn short_deadline_resolves_when_source_never_emits() {
    let h = harness(InMemoryKeyValueStore::new(), Duration::from_millis(50));
    let mut watcher = h.gate.navigation();
    h.gate.start().await.unwrap();

    assert_eq!(
        watcher.changed().await,
        Some(NavigationTarget::Unauthenticated)
    );
    let snapshot = h.gate.snapshot();
    assert_eq!(snapshot.resolution, SessionResolution::Resolved);
    assert_eq!(snapshot.identity, None);
}

#[tokio::test]
async fn sign_out_moves_main_application_to_unauthenticated() {
    let h = harness(onboarded_store(), DEFAULT_DEADLINE);
    let mut watcher = h.gate.navigation();
    h.gate.start().await.unwrap();

    h.feed.push_identity(alice()).unwrap();
    assert_eq!(
        next_target(&mut watcher).await,
        NavigationTarget::MainApplication
    );

    h.feed.push_absent().unwrap();
    assert_eq!(
        next_target(&mut watcher).await,
        NavigationTarget::Unauthenticated
    );
    // Sign-out never clears the onboarding flag.
    assert!(h.gate.snapshot().onboarding_completed);
    assert_eq!(h.gate.session().resolution_count(), 1);
}

#[tokio::test]
async fn completing_onboarding_moves_to_main_application() {
    let h = harness(InMemoryKeyValueStore::new(), DEFAULT_DEADLINE);
    let mut watcher = h.gate.navigation();
    h.gate.start().await.unwrap();
    h.feed.push_identity(alice()).unwrap();
    assert_eq!(next_target(&mut watcher).await, NavigationTarget::Onboarding);

    h.gate.mark_onboarding_complete();

    assert_eq!(
        next_target(&mut watcher).await,
        NavigationTarget::MainApplication
    );
    h.gate.shutdown().await;
    assert_eq!(
        h.store.peek(keys::ONBOARDING_COMPLETED).as_deref(),
        Some("true")
    );
}

#[tokio::test]
async fn many_notifications_resolve_exactly_once() {
    let h = harness(onboarded_store(), DEFAULT_DEADLINE);
    let mut watcher = h.gate.navigation();
    h.gate.start().await.unwrap();

    for _ in 0..5 {
        h.feed.push_identity(alice()).unwrap();
        h.feed.push_absent().unwrap();
    }
    h.feed.push_identity(alice()).unwrap();

    assert!(wait_for_cache(&h.store, Some(&alice())).await);
    while watcher.current() != NavigationTarget::MainApplication {
        next_target(&mut watcher).await;
    }
    assert_eq!(h.gate.session().resolution_count(), 1);
}

#[tokio::test]
async fn cache_mirrors_confirmed_identity() {
    let h = harness(onboarded_store(), DEFAULT_DEADLINE);
    h.gate.start().await.unwrap();

    h.feed.push_identity(alice()).unwrap();
    assert!(wait_for_cache(&h.store, Some(&alice())).await);

    h.feed.push_absent().unwrap();
    assert!(wait_for_cache(&h.store, None).await);
}

#[tokio::test]
async fn identity_then_error_keeps_identity() {
    let h = harness(onboarded_store(), DEFAULT_DEADLINE);
    let mut watcher = h.gate.navigation();
    h.gate.start().await.unwrap();

    h.feed.push_identity(alice()).unwrap();
    h.feed.push_error("token refresh failed").unwrap();

    assert_eq!(
        next_target(&mut watcher).await,
        NavigationTarget::MainApplication
    );
    assert!(wait_for_cache(&h.store, Some(&alice())).await);
    assert_eq!(h.gate.snapshot().identity, Some(alice()));
    assert_eq!(h.gate.session().resolution_count(), 1);
}

#[tokio::test]
async fn sign_out_after_transient_error_reaches_unauthenticated() {
    let h = harness(onboarded_store(), DEFAULT_DEADLINE);
    let mut watcher = h.gate.navigation();
    h.gate.start().await.unwrap();

    h.feed.push_identity(alice()).unwrap();
    assert_eq!(
        next_target(&mut watcher).await,
        NavigationTarget::MainApplication
    );

    h.feed.push_error("token refresh hiccup").unwrap();
    h.feed.push_absent().unwrap();

    assert_eq!(
        next_target(&mut watcher).await,
        NavigationTarget::Unauthenticated
    );
    assert_eq!(h.gate.snapshot().identity, None);
    assert!(wait_for_cache(&h.store, None).await);

    h.feed.push_identity(alice()).unwrap();
    assert_eq!(
        next_target(&mut watcher).await,
        NavigationTarget::MainApplication
    );
    assert_eq!(h.gate.session().resolution_count(), 1);
}

#[tokio::test]
async fn error_then_identity_fails_open() {
    let h = harness(onboarded_store(), DEFAULT_DEADLINE);
    let mut watcher = h.gate.navigation();
    h.gate.start().await.unwrap();

    h.feed.push_error("provider offline").unwrap();
    h.feed.push_identity(alice()).unwrap();

    assert_eq!(
        next_target(&mut watcher).await,
        NavigationTarget::Unauthenticated
    );
    // The identity pushed after the error is never applied.
    assert!(wait_for_cache(&h.store, None).await);
    assert_eq!(h.gate.snapshot().identity, None);
    assert_eq!(h.gate.session().resolution_count(), 1);
}

#[tokio::test]
async fn closed_source_fails_open_on_start() {
    let h = harness(onboarded_store(), DEFAULT_DEADLINE);
    h.feed.close();

    h.gate.start().await.unwrap();

    assert_eq!(h.gate.current_target(), NavigationTarget::Unauthenticated);
}

#[tokio::test]
async fn stop_before_notification_is_a_no_op() {
    let h = harness(onboarded_store(), DEFAULT_DEADLINE);
    h.gate.start().await.unwrap();
    let mut session_rx = h.gate.session().subscribe();

    h.gate.shutdown().await;
    // The subscription is gone, so the push reaches nobody.
    h.feed.push_identity(alice()).unwrap();
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }

    assert_eq!(h.source.subscriber_count(), 0);
    assert!(!session_rx.has_changed().unwrap_or(false));
    assert_eq!(h.gate.current_target(), NavigationTarget::Loading);
    assert_eq!(h.store.write_count(), 0);
}

#[tokio::test]
async fn cached_identity_does_not_shortcut_resolution() {
    let snapshot = CachedIdentitySnapshot::capture(&alice(), 1_700_000_000_000);
    let store = InMemoryKeyValueStore::with_entries([
        (keys::ONBOARDING_COMPLETED, "true".to_string()),
        (
            keys::CACHED_IDENTITY,
            serde_json::to_string(&snapshot).unwrap(),
        ),
    ]);
    let h = harness(store, DEFAULT_DEADLINE);

    h.gate.start().await.unwrap();
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }

    assert_eq!(h.gate.current_target(), NavigationTarget::Loading);
}
