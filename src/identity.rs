//! Identity-service contract used to renew a session from a refresh credential.

pub mod oauth;

pub use oauth::OAuthIdentityService;

// self
use crate::{
	_prelude::*,
	auth::{CredentialSet, TokenSecret},
};

/// Boxed future returned by [`IdentityService`] operations.
pub type IdentityFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, IdentityError>> + 'a + Send>>;

/// Exchanges a refresh credential for a fresh access/ID/refresh triple.
pub trait IdentityService
where
	Self: Send + Sync,
{
	/// Renews the session identified by `refresh_token`.
	///
	/// Implementations return the complete new triple. When the provider does not rotate the
	/// refresh token, the returned set carries `refresh_token` unchanged.
	fn renew_session<'a>(
		&'a self,
		refresh_token: &'a TokenSecret,
	) -> IdentityFuture<'a, CredentialSet>;
}

/// Failure reported by an [`IdentityService`].
///
/// The type is `Clone` because one refresh outcome is handed to every caller waiting on it.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdentityError {
	/// The identity service answered with an OAuth error such as `invalid_grant`.
	#[error("Identity service rejected the request: {error}.")]
	Rejected {
		/// OAuth error code.
		error: String,
		/// Optional human-readable description from the service.
		description: Option<String>,
	},
	/// The identity service could not be reached.
	#[error("Identity service could not be reached: {message}.")]
	Transport {
		/// Rendered transport failure.
		message: String,
	},
	/// The token response could not be parsed.
	#[error("Identity service returned a malformed token response: {message}.")]
	MalformedResponse {
		/// Parser diagnostics, including the offending field path.
		message: String,
	},
	/// The token response did not include an ID token.
	#[error("Identity service response did not include an ID token.")]
	MissingIdToken,
	/// Any other failure reported by the identity service.
	#[error("Identity service failed unexpectedly: {message}.")]
	Unexpected {
		/// Human-readable error payload.
		message: String,
	},
}
