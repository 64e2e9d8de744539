mod common;

// std
use std::{
	path::PathBuf,
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	time::{SystemTime, UNIX_EPOCH},
};
// crates.io
use serde::Deserialize;
// self
use common::*;
use concertly_client::{
	error::Error,
	http_types::StatusCode,
	identity::IdentityError,
	request::ApiRequest,
	store::{CredentialStore, FileStore, MemoryStore},
};

const N: usize = 8;
const BODY: &str = r#"{"items":["a","b"]}"#;

#[derive(Debug, PartialEq, Deserialize)]
struct Listing {
	items: Vec<String>,
}

fn scratch_path(label: &str) -> PathBuf {
	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System clock should be after the epoch.")
		.as_nanos();

	std::env::temp_dir().join(format!("concertly-{label}-{}-{nanos}.json", std::process::id()))
}

async fn concurrent_401s_share_one_refresh() {
	let store = MemoryStore::with_credentials(stale_set());
	let api = FakeApi::new(StatusCode::OK, BODY);
	let identity = GatedIdentity::new(Ok(fresh_set()));
	let fetcher = fake_fetcher(Arc::new(store.clone()), &api, &identity);
	let handles = (0..N)
		.map(|_| {
			let fetcher = fetcher.clone();

			tokio::spawn(async move { fetcher.fetch::<Listing>(&ApiRequest::get("listing")).await })
		})
		.collect::<Vec<_>>();

	wait_until(|| identity.calls() == 1 && fetcher.metrics().joined() == (N - 1) as u64).await;
	identity.gate.add_permits(1);

	for handle in handles {
		let listing = handle
			.await
			.expect("Fetch task should not panic.")
			.expect("Every caller should succeed after the shared refresh.");

		assert_eq!(listing.items, ["a", "b"]);
	}

	assert_eq!(identity.calls(), 1);
	assert_eq!(api.rejected(), N);
	assert_eq!(api.sent(), 2 * N);
	assert_eq!(fetcher.metrics().started(), 1);
	assert_eq!(fetcher.metrics().successes(), 1);
	assert_eq!(store.load().await.expect("Store should load."), Some(fresh_set()));
}

async fn concurrent_401s_share_one_failure() {
	let store = MemoryStore::with_credentials(stale_set());
	let api = FakeApi::new(StatusCode::OK, BODY);
	let rejection = IdentityError::Rejected {
		error: "invalid_grant".into(),
		description: Some("session revoked".into()),
	};
	let identity = GatedIdentity::new(Err(rejection.clone()));
	let fetcher = fake_fetcher(Arc::new(store.clone()), &api, &identity);
	let handles = (0..N)
		.map(|_| {
			let fetcher = fetcher.clone();

			tokio::spawn(async move { fetcher.fetch::<Listing>(&ApiRequest::get("listing")).await })
		})
		.collect::<Vec<_>>();

	wait_until(|| identity.calls() == 1 && fetcher.metrics().joined() == (N - 1) as u64).await;
	identity.gate.add_permits(1);

	for handle in handles {
		let err = handle
			.await
			.expect("Fetch task should not panic.")
			.expect_err("Every caller should see the shared refresh failure.");

		match err {
			Error::RefreshFailed(inner) => assert_eq!(inner, rejection),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	assert_eq!(identity.calls(), 1);
	assert_eq!(api.sent(), N);
	assert_eq!(fetcher.metrics().failures(), 1);
	assert_eq!(store.load().await.expect("Store should load."), Some(stale_set()));
}

#[tokio::test]
async fn single_flight_success_on_current_thread() {
	concurrent_401s_share_one_refresh().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_flight_success_on_worker_threads() {
	concurrent_401s_share_one_refresh().await;
}

#[tokio::test]
async fn single_flight_failure_on_current_thread() {
	concurrent_401s_share_one_failure().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_flight_failure_on_worker_threads() {
	concurrent_401s_share_one_failure().await;
}

#[tokio::test]
async fn server_error_never_triggers_refresh() {
	let store = MemoryStore::with_credentials(fresh_set());
	let api = FakeApi::new(StatusCode::INTERNAL_SERVER_ERROR, "oops");
	let identity = GatedIdentity::open(Ok(fresh_set()));
	let fetcher = fake_fetcher(Arc::new(store), &api, &identity);
	let err = fetcher
		.fetch::<Listing>(&ApiRequest::get("listing"))
		.await
		.expect_err("A 500 should fail the fetch.");

	assert!(matches!(err, Error::InvalidResponse { status: 500 }));
	assert_eq!(api.sent(), 1);
	assert_eq!(identity.calls(), 0);
}

#[tokio::test]
async fn second_401_is_terminal() {
	let store = MemoryStore::with_credentials(stale_set());
	let api = FakeApi::new(StatusCode::OK, BODY);
	// The renewed set still carries a token the API rejects.
	let identity =
		GatedIdentity::open(Ok(concertly_client::auth::CredentialSet::new("a-2", "id-2", "r-2")));
	let fetcher = fake_fetcher(Arc::new(store.clone()), &api, &identity);
	let err = fetcher
		.fetch::<Listing>(&ApiRequest::get("listing"))
		.await
		.expect_err("A 401 on the retried request should be terminal.");

	assert!(matches!(err, Error::Unauthorized));
	assert_eq!(api.sent(), 2);
	assert_eq!(api.rejected(), 2);
	assert_eq!(identity.calls(), 1);
	assert_eq!(fetcher.metrics().started(), 1);
}

#[tokio::test]
async fn missing_credential_never_reaches_transport() {
	let api = FakeApi::new(StatusCode::OK, BODY);
	let identity = GatedIdentity::open(Ok(fresh_set()));
	let fetcher = fake_fetcher(Arc::new(MemoryStore::default()), &api, &identity);
	let err = fetcher
		.fetch::<Listing>(&ApiRequest::get("listing"))
		.await
		.expect_err("Fetching without credentials should fail.");

	assert!(matches!(err, Error::MissingCredential));
	assert_eq!(api.sent(), 0);
	assert_eq!(identity.calls(), 0);
}

#[tokio::test]
async fn missing_refresh_credential_is_reported_without_renewal() {
	let store = MemoryStore::with_credentials(stale_set());

	store
		.delete(concertly_client::auth::CredentialKey::RefreshToken)
		.await
		.expect("Refresh token should be removable.");

	let api = FakeApi::new(StatusCode::OK, BODY);
	let identity = GatedIdentity::open(Ok(fresh_set()));
	let fetcher = fake_fetcher(Arc::new(store), &api, &identity);
	let err = fetcher
		.fetch::<Listing>(&ApiRequest::get("listing"))
		.await
		.expect_err("Refresh without a refresh token should fail.");

	assert!(matches!(err, Error::NoRefreshCredential));
	assert_eq!(api.sent(), 1);
	assert_eq!(identity.calls(), 0);
}

async fn readers_never_observe_a_mixed_triple(store: Arc<dyn CredentialStore>) {
	let api = FakeApi::new(StatusCode::OK, BODY);
	let identity = GatedIdentity::new(Ok(fresh_set()));
	let fetcher = fake_fetcher(Arc::clone(&store), &api, &identity);
	let done = Arc::new(AtomicBool::new(false));
	let reads = Arc::new(AtomicUsize::new(0));
	let reader = {
		let store = Arc::clone(&store);
		let done = Arc::clone(&done);
		let reads = Arc::clone(&reads);

		tokio::spawn(async move {
			while !done.load(Ordering::SeqCst) {
				let seen = store
					.load()
					.await
					.expect("Store should load.")
					.expect("The triple should never be partially missing.");

				assert!(seen == stale_set() || seen == fresh_set(), "Observed a mixed triple.");

				reads.fetch_add(1, Ordering::SeqCst);
				tokio::task::yield_now().await;
			}
		})
	};
	let writer = {
		let fetcher = fetcher.clone();

		tokio::spawn(async move { fetcher.fetch::<Listing>(&ApiRequest::get("listing")).await })
	};

	wait_until(|| identity.calls() == 1 && reads.load(Ordering::SeqCst) > 0).await;
	identity.gate.add_permits(1);
	writer
		.await
		.expect("Fetch task should not panic.")
		.expect("Fetch should succeed after the refresh.");
	done.store(true, Ordering::SeqCst);

	reader.await.expect("Reader task should not panic.");

	assert!(reads.load(Ordering::SeqCst) > 0);
	assert_eq!(store.load().await.expect("Store should load."), Some(fresh_set()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn memory_store_replacement_is_atomic() {
	readers_never_observe_a_mixed_triple(Arc::new(MemoryStore::with_credentials(stale_set())))
		.await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn file_store_replacement_is_atomic() {
	let path = scratch_path("atomic");
	let store = FileStore::open(&path).expect("File store should open.");

	store.replace(stale_set()).await.expect("Seeding the file store should succeed.");
	readers_never_observe_a_mixed_triple(Arc::new(store)).await;

	let _ = std::fs::remove_file(path);
}
