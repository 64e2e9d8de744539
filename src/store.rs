//! Credential store contract and built-in store implementations.

pub mod file;
#[cfg(feature = "keyring")] pub mod keychain;
pub mod memory;

pub use file::FileStore;
#[cfg(feature = "keyring")] pub use keychain::KeyringStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, CredentialSet, TokenSecret},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Secure storage for the credential triple.
///
/// Single-key operations mirror a platform keychain. The fetcher itself only writes through
/// [`replace`](CredentialStore::replace) and [`clear`](CredentialStore::clear), which must be
/// atomic with respect to [`load`](CredentialStore::load) and [`get`](CredentialStore::get):
/// no reader may observe a mix of old and new tokens.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Reads a single secret.
	fn get(&self, key: CredentialKey) -> StoreFuture<'_, Option<TokenSecret>>;

	/// Writes a single secret.
	fn save(&self, key: CredentialKey, value: TokenSecret) -> StoreFuture<'_, ()>;

	/// Removes a single secret; removing an absent key succeeds.
	fn delete(&self, key: CredentialKey) -> StoreFuture<'_, ()>;

	/// Reads the complete triple in one step, or `None` if any member is missing.
	fn load(&self) -> StoreFuture<'_, Option<CredentialSet>>;

	/// Replaces all three secrets in one step.
	fn replace(&self, credentials: CredentialSet) -> StoreFuture<'_, ()>;

	/// Removes all three secrets in one step.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

type Snapshot = BTreeMap<CredentialKey, TokenSecret>;

fn snapshot_of(credentials: CredentialSet) -> Snapshot {
	let CredentialSet { access_token, id_token, refresh_token } = credentials;

	BTreeMap::from([
		(CredentialKey::AccessToken, access_token),
		(CredentialKey::IdToken, id_token),
		(CredentialKey::RefreshToken, refresh_token),
	])
}

fn set_from_snapshot(snapshot: &Snapshot) -> Option<CredentialSet> {
	CredentialSet::from_entries(|key| snapshot.get(&key).cloned())
}
