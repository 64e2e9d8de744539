//! Single-flight session refresh.
//!
//! The first caller that needs a refresh installs a shared future in the coordinator's slot and
//! every caller arriving while it is set awaits that same future, so the identity service sees
//! one renewal per cycle no matter how many requests were rejected at once. The renewal clears
//! the slot itself, before any waiter observes its outcome, so the next rejected request starts
//! a fresh cycle.
//!
//! The slot lock is held only to inspect or swap the slot, never across an `.await`. Dropping a
//! waiter only stops that waiter from observing the outcome; the renewal and the remaining
//! waiters carry on. Once every waiter is gone the renewal has nobody to drive it, so the next
//! caller discards it and starts a new generation instead of resuming a renewal that may have
//! been overtaken by a later sign-in. A discarded renewal never writes to the store.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::sync::Weak;
// crates.io
use futures::future::{BoxFuture, FutureExt, Shared};
// self
use crate::{
	_prelude::*,
	auth::CredentialKey,
	error::RefreshError,
	identity::IdentityService,
	obs::{self, CallOutcome, CallSpan, Operation},
	store::CredentialStore,
};

type SharedRenewal = Shared<BoxFuture<'static, Result<(), RefreshError>>>;

#[derive(Default)]
struct Slot {
	next_generation: u64,
	in_flight: Option<InFlight>,
}

struct InFlight {
	generation: u64,
	renewal: SharedRenewal,
}
impl InFlight {
	/// A handle on the renewal, unless the slot holds the only one left.
	fn join(&self) -> Option<SharedRenewal> {
		(self.renewal.strong_count()? > 1).then(|| self.renewal.clone())
	}
}

/// Owns the in-flight refresh slot; clones share the slot.
#[derive(Clone)]
pub(crate) struct RefreshCoordinator {
	store: Arc<dyn CredentialStore>,
	identity: Arc<dyn IdentityService>,
	slot: Arc<Mutex<Slot>>,
	metrics: Arc<RefreshMetrics>,
}
impl RefreshCoordinator {
	pub(crate) fn new(store: Arc<dyn CredentialStore>, identity: Arc<dyn IdentityService>) -> Self {
		Self { store, identity, slot: Default::default(), metrics: Default::default() }
	}

	pub(crate) fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Runs a refresh, or waits on the one already in flight.
	pub(crate) async fn run(&self) -> Result<(), RefreshError> {
		let mut abandoned = None;
		let renewal = {
			let mut slot = self.slot.lock();

			if let Some(renewal) = slot.in_flight.as_ref().and_then(InFlight::join) {
				self.metrics.record_joined();
				obs::record_refresh_joined();

				renewal
			} else {
				let generation = slot.next_generation;
				let renewal = self.renewal(generation).boxed().shared();

				abandoned = slot.in_flight.replace(InFlight { generation, renewal: renewal.clone() });
				slot.next_generation += 1;

				renewal
			}
		};

		if abandoned.is_some() {
			self.metrics.record_discarded();
		}
		// Drops the stale renewal outside the lock.
		drop(abandoned);

		renewal.await
	}

	fn renewal(
		&self,
		generation: u64,
	) -> impl 'static + Send + Future<Output = Result<(), RefreshError>> {
		let store = Arc::clone(&self.store);
		let identity = Arc::clone(&self.identity);
		let metrics = Arc::clone(&self.metrics);
		let slot = Arc::downgrade(&self.slot);

		async move {
			const OPERATION: Operation = Operation::Refresh;

			let span = CallSpan::new(OPERATION, "renew_session");

			obs::record_call_outcome(OPERATION, CallOutcome::Attempt);
			metrics.record_started();

			let outcome = span.instrument(renew(store.as_ref(), identity.as_ref())).await;

			match &outcome {
				Ok(()) => metrics.record_success(),
				Err(_) => metrics.record_failure(),
			}

			obs::record_call_outcome(OPERATION, CallOutcome::of(&outcome));
			settle(&slot, generation);

			outcome
		}
	}
}

async fn renew(
	store: &dyn CredentialStore,
	identity: &dyn IdentityService,
) -> Result<(), RefreshError> {
	let refresh_token = store
		.get(CredentialKey::RefreshToken)
		.await
		.map_err(RefreshError::Storage)?
		.ok_or(RefreshError::NoRefreshCredential)?;
	let renewed =
		identity.renew_session(&refresh_token).await.map_err(RefreshError::Rejected)?;

	store.replace(renewed).await.map_err(RefreshError::Storage)
}

fn settle(slot: &Weak<Mutex<Slot>>, generation: u64) {
	let Some(slot) = slot.upgrade() else {
		return;
	};
	let mut slot = slot.lock();

	if slot.in_flight.as_ref().is_some_and(|in_flight| in_flight.generation == generation) {
		slot.in_flight = None;
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use tokio::sync::Semaphore;
	// self
	use super::*;
	use crate::{
		auth::{CredentialSet, TokenSecret},
		identity::{IdentityError, IdentityFuture},
		store::MemoryStore,
	};

	struct GatedIdentity {
		calls: AtomicUsize,
		presented: Mutex<Vec<String>>,
		gate: Semaphore,
		outcome: Result<CredentialSet, IdentityError>,
	}
	impl GatedIdentity {
		fn new(outcome: Result<CredentialSet, IdentityError>) -> Arc<Self> {
			Arc::new(Self {
				calls: AtomicUsize::new(0),
				presented: Mutex::new(Vec::new()),
				gate: Semaphore::new(0),
				outcome,
			})
		}

		fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl IdentityService for GatedIdentity {
		fn renew_session<'a>(
			&'a self,
			refresh_token: &'a TokenSecret,
		) -> IdentityFuture<'a, CredentialSet> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);
				self.presented.lock().push(refresh_token.expose().to_owned());

				let _permit = self
					.gate
					.acquire()
					.await
					.map_err(|e| IdentityError::Unexpected { message: e.to_string() })?;

				self.outcome.clone()
			})
		}
	}

	fn coordinator(store: &MemoryStore, identity: &Arc<GatedIdentity>) -> RefreshCoordinator {
		RefreshCoordinator::new(Arc::new(store.clone()), identity.clone())
	}

	async fn wait_until(mut condition: impl FnMut() -> bool) {
		while !condition() {
			tokio::task::yield_now().await;
		}
	}

	#[tokio::test]
	async fn followers_share_one_renewal() {
		let store = MemoryStore::with_credentials(CredentialSet::new("a-1", "i-1", "r-1"));
		let identity = GatedIdentity::new(Ok(CredentialSet::new("a-2", "i-2", "r-2")));
		let coordinator = coordinator(&store, &identity);
		let handles = (0..5)
			.map(|_| {
				let coordinator = coordinator.clone();

				tokio::spawn(async move { coordinator.run().await })
			})
			.collect::<Vec<_>>();

		wait_until(|| identity.calls() == 1 && coordinator.metrics().joined() == 4).await;
		identity.gate.add_permits(1);

		for handle in handles {
			handle.await.expect("Refresh task should not panic.").expect("Refresh should succeed.");
		}

		assert_eq!(identity.calls(), 1);
		assert_eq!(coordinator.metrics().started(), 1);
		assert_eq!(coordinator.metrics().successes(), 1);
		assert_eq!(
			store.load().await.expect("Store should load."),
			Some(CredentialSet::new("a-2", "i-2", "r-2"))
		);
	}

	#[tokio::test]
	async fn failure_reaches_every_waiter_and_clears_the_slot() {
		let store = MemoryStore::with_credentials(CredentialSet::new("a-1", "i-1", "r-1"));
		let rejection = IdentityError::Rejected { error: "invalid_grant".into(), description: None };
		let identity = GatedIdentity::new(Err(rejection.clone()));
		let coordinator = coordinator(&store, &identity);
		let handles = (0..3)
			.map(|_| {
				let coordinator = coordinator.clone();

				tokio::spawn(async move { coordinator.run().await })
			})
			.collect::<Vec<_>>();

		wait_until(|| coordinator.metrics().joined() == 2).await;
		identity.gate.add_permits(1);

		for handle in handles {
			let err = handle
				.await
				.expect("Refresh task should not panic.")
				.expect_err("Rejected renewals should fail every waiter.");

			assert_eq!(err, RefreshError::Rejected(rejection.clone()));
		}

		assert_eq!(
			store.load().await.expect("Store should load."),
			Some(CredentialSet::new("a-1", "i-1", "r-1"))
		);

		// The permit returned by the first renewal lets a new cycle run to completion.
		let err = coordinator.run().await.expect_err("Second cycle should fail the same way.");

		assert_eq!(err, RefreshError::Rejected(rejection));
		assert_eq!(identity.calls(), 2);
		assert_eq!(coordinator.metrics().started(), 2);
		assert_eq!(coordinator.metrics().failures(), 2);
	}

	#[tokio::test]
	async fn missing_refresh_token_skips_identity_service() {
		let store = MemoryStore::default();
		let identity = GatedIdentity::new(Ok(CredentialSet::new("a-2", "i-2", "r-2")));
		let err = coordinator(&store, &identity)
			.run()
			.await
			.expect_err("Refresh without a refresh token should fail.");

		assert_eq!(err, RefreshError::NoRefreshCredential);
		assert_eq!(identity.calls(), 0);
	}

	#[tokio::test]
	async fn abandoned_renewal_is_discarded_and_never_writes() {
		let store = MemoryStore::with_credentials(CredentialSet::new("a-1", "i-1", "r-1"));
		let identity = GatedIdentity::new(Ok(CredentialSet::new("a-2", "i-2", "r-2")));
		let coordinator = coordinator(&store, &identity);
		let leader = {
			let coordinator = coordinator.clone();

			tokio::spawn(async move { coordinator.run().await })
		};

		wait_until(|| identity.calls() == 1).await;
		leader.abort();

		assert!(leader.await.expect_err("Aborted task should report cancellation.").is_cancelled());

		// A sign-in lands while the orphaned renewal sits in the slot.
		store
			.replace(CredentialSet::new("a-9", "i-9", "r-9"))
			.await
			.expect("Signing in should replace the triple.");
		identity.gate.add_permits(1);

		for _ in 0..10 {
			tokio::task::yield_now().await;
		}

		assert_eq!(coordinator.metrics().successes(), 0);
		assert_eq!(
			store.load().await.expect("Store should load."),
			Some(CredentialSet::new("a-9", "i-9", "r-9"))
		);

		coordinator.run().await.expect("A fresh renewal should succeed.");

		assert_eq!(identity.calls(), 2);
		assert_eq!(*identity.presented.lock(), ["r-1", "r-9"]);
		assert_eq!(coordinator.metrics().started(), 2);
		assert_eq!(coordinator.metrics().discarded(), 1);
		assert_eq!(coordinator.metrics().joined(), 0);
		assert_eq!(coordinator.metrics().successes(), 1);
		assert_eq!(
			store.load().await.expect("Store should load."),
			Some(CredentialSet::new("a-2", "i-2", "r-2"))
		);
	}

	#[tokio::test]
	async fn dropping_one_waiter_leaves_the_others_unaffected() {
		let store = MemoryStore::with_credentials(CredentialSet::new("a-1", "i-1", "r-1"));
		let identity = GatedIdentity::new(Ok(CredentialSet::new("a-2", "i-2", "r-2")));
		let coordinator = coordinator(&store, &identity);
		let spawn_waiter = || {
			let coordinator = coordinator.clone();

			tokio::spawn(async move { coordinator.run().await })
		};
		let leader = spawn_waiter();
		let follower = spawn_waiter();

		wait_until(|| identity.calls() == 1 && coordinator.metrics().joined() == 1).await;
		leader.abort();

		assert!(leader.await.expect_err("Aborted task should report cancellation.").is_cancelled());

		identity.gate.add_permits(1);
		follower
			.await
			.expect("Refresh task should not panic.")
			.expect("The remaining waiter should see the renewal succeed.");

		assert_eq!(identity.calls(), 1);
		assert_eq!(coordinator.metrics().started(), 1);
		assert_eq!(coordinator.metrics().discarded(), 0);
		assert_eq!(
			store.load().await.expect("Store should load.").map(|set| set.id_token),
			Some(TokenSecret::new("i-2"))
		);
	}
}
