//! OS keychain [`CredentialStore`] backed by the `keyring` crate.

// crates.io
use keyring::{Entry, Error as KeyringError};
// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, CredentialSet, TokenSecret},
	store::{self, CredentialStore, Snapshot, StoreError, StoreFuture},
};

/// Stores the whole credential triple as one JSON secret in the platform keychain.
///
/// Keeping the triple in a single keychain item is what makes [`CredentialStore::replace`]
/// atomic; per-key operations read, modify, and rewrite that item under a local lock.
pub struct KeyringStore {
	entry: Entry,
	write_lock: Mutex<()>,
}
impl KeyringStore {
	/// Default keychain service name.
	pub const DEFAULT_SERVICE: &'static str = "concertly";

	/// Opens the keychain item for `account` under `service`.
	pub fn new(service: &str, account: &str) -> Result<Self, StoreError> {
		let entry = Entry::new(service, account).map_err(map_keyring_error)?;

		Ok(Self { entry, write_lock: Mutex::new(()) })
	}

	fn read_snapshot(&self) -> Result<Snapshot, StoreError> {
		match self.entry.get_password() {
			Ok(raw) => serde_json::from_str(&raw).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse keychain item: {e}"),
			}),
			Err(KeyringError::NoEntry) => Ok(Snapshot::new()),
			Err(e) => Err(map_keyring_error(e)),
		}
	}

	fn write_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
		if snapshot.is_empty() {
			return match self.entry.delete_credential() {
				Ok(()) | Err(KeyringError::NoEntry) => Ok(()),
				Err(e) => Err(map_keyring_error(e)),
			};
		}

		let raw = serde_json::to_string(snapshot).map_err(|e| StoreError::Serialization {
			message: format!("Failed to serialize keychain item: {e}"),
		})?;

		self.entry.set_password(&raw).map_err(map_keyring_error)
	}

	fn mutate<F>(&self, apply: F) -> Result<(), StoreError>
	where
		F: FnOnce(&mut Snapshot),
	{
		let _guard = self.write_lock.lock();
		let mut snapshot = self.read_snapshot()?;

		apply(&mut snapshot);

		self.write_snapshot(&snapshot)
	}
}
impl Debug for KeyringStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("KeyringStore(..)")
	}
}
impl CredentialStore for KeyringStore {
	fn get(&self, key: CredentialKey) -> StoreFuture<'_, Option<TokenSecret>> {
		Box::pin(async move { Ok(self.read_snapshot()?.remove(&key)) })
	}

	fn save(&self, key: CredentialKey, value: TokenSecret) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.mutate(|snapshot| {
				snapshot.insert(key, value);
			})
		})
	}

	fn delete(&self, key: CredentialKey) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.mutate(|snapshot| {
				snapshot.remove(&key);
			})
		})
	}

	fn load(&self) -> StoreFuture<'_, Option<CredentialSet>> {
		Box::pin(async move { Ok(store::set_from_snapshot(&self.read_snapshot()?)) })
	}

	fn replace(&self, credentials: CredentialSet) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let _guard = self.write_lock.lock();

			self.write_snapshot(&store::snapshot_of(credentials))
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let _guard = self.write_lock.lock();

			self.write_snapshot(&Snapshot::new())
		})
	}
}

fn map_keyring_error(e: KeyringError) -> StoreError {
	StoreError::Backend { message: format!("Keychain error: {e}") }
}
