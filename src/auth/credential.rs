//! The access/ID/refresh token triple and the keys it is stored under.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Storage key for one member of a [`CredentialSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CredentialKey {
	/// Access token issued by the identity service.
	AccessToken,
	/// OIDC ID token, sent as the bearer by default.
	IdToken,
	/// Refresh token used to renew the session.
	RefreshToken,
}
impl CredentialKey {
	/// All keys in storage order.
	pub const ALL: [Self; 3] = [Self::AccessToken, Self::IdToken, Self::RefreshToken];

	/// Returns the key string persisted by credential stores.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::AccessToken => "accessToken",
			Self::IdToken => "idToken",
			Self::RefreshToken => "refreshToken",
		}
	}
}
impl Display for CredentialKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Complete credential triple; always written and replaced as one unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSet {
	/// Access token secret.
	pub access_token: TokenSecret,
	/// ID token secret.
	pub id_token: TokenSecret,
	/// Refresh token secret.
	pub refresh_token: TokenSecret,
}
impl CredentialSet {
	/// Builds a credential set from raw token strings.
	pub fn new(
		access_token: impl Into<String>,
		id_token: impl Into<String>,
		refresh_token: impl Into<String>,
	) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			id_token: TokenSecret::new(id_token),
			refresh_token: TokenSecret::new(refresh_token),
		}
	}

	/// Returns the secret stored under `key`.
	pub fn get(&self, key: CredentialKey) -> &TokenSecret {
		match key {
			CredentialKey::AccessToken => &self.access_token,
			CredentialKey::IdToken => &self.id_token,
			CredentialKey::RefreshToken => &self.refresh_token,
		}
	}

	/// Iterates over `(key, secret)` pairs in storage order.
	pub fn entries(&self) -> impl Iterator<Item = (CredentialKey, &TokenSecret)> {
		CredentialKey::ALL.into_iter().map(move |key| (key, self.get(key)))
	}

	/// Reassembles a set from per-key lookups, yielding `None` unless all three are present.
	pub fn from_entries<F>(mut lookup: F) -> Option<Self>
	where
		F: FnMut(CredentialKey) -> Option<TokenSecret>,
	{
		Some(Self {
			access_token: lookup(CredentialKey::AccessToken)?,
			id_token: lookup(CredentialKey::IdToken)?,
			refresh_token: lookup(CredentialKey::RefreshToken)?,
		})
	}
}
