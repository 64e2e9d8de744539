//! Thread-safe in-memory [`CredentialStore`] for ephemeral sessions and tests.

// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, CredentialSet, TokenSecret},
	store::{self, CredentialStore, Snapshot, StoreFuture},
};

type StoreMap = Arc<RwLock<Snapshot>>;

/// Keeps credentials in-process behind a single lock so triple writes are atomic.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Creates a store pre-populated with `credentials`.
	pub fn with_credentials(credentials: CredentialSet) -> Self {
		Self(Arc::new(RwLock::new(store::snapshot_of(credentials))))
	}
}
impl CredentialStore for MemoryStore {
	fn get(&self, key: CredentialKey) -> StoreFuture<'_, Option<TokenSecret>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(&key).cloned()) })
	}

	fn save(&self, key: CredentialKey, value: TokenSecret) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(key, value);

			Ok(())
		})
	}

	fn delete(&self, key: CredentialKey) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().remove(&key);

			Ok(())
		})
	}

	fn load(&self) -> StoreFuture<'_, Option<CredentialSet>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(store::set_from_snapshot(&map.read())) })
	}

	fn replace(&self, credentials: CredentialSet) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			*map.write() = store::snapshot_of(credentials);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().clear();

			Ok(())
		})
	}
}
