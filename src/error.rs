//! Client-level error types shared by the fetcher, stores, and identity service.

// self
use crate::{_prelude::*, identity::IdentityError, store::StoreError};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error surfaced to callers of [`fetch`](crate::fetcher::AuthenticatedFetcher::fetch).
#[derive(Debug, ThisError)]
pub enum Error {
	/// No bearer credential is stored; nothing was sent.
	#[error("No credential is stored; sign in before issuing requests.")]
	MissingCredential,
	/// A refresh was needed but no refresh credential is stored.
	#[error("No refresh credential is stored.")]
	NoRefreshCredential,
	/// Transport failure (DNS, TCP, TLS, IO).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Server answered with a status other than 200 or 401.
	#[error("Server returned an unexpected status: {status}.")]
	InvalidResponse {
		/// HTTP status code returned by the server.
		status: u16,
	},
	/// Body of a 200 response could not be decoded into the requested shape.
	#[error("Response body could not be decoded at `{}`.", .source.path())]
	InvalidData {
		/// Structured decoding failure, including the path of the offending field.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Server rejected the credential again after a successful refresh.
	#[error("Server rejected the refreshed credential.")]
	Unauthorized,
	/// Identity service refused to renew the session.
	#[error("Session refresh failed: {0}")]
	RefreshFailed(#[source] IdentityError),
	/// Credential store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		StoreError,
	),
	/// Local configuration or request construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl From<RefreshError> for Error {
	fn from(e: RefreshError) -> Self {
		match e {
			RefreshError::NoRefreshCredential => Self::NoRefreshCredential,
			RefreshError::Rejected(inner) => Self::RefreshFailed(inner),
			RefreshError::Storage(inner) => Self::Storage(inner),
		}
	}
}

/// Outcome of a failed refresh, handed unchanged to every caller waiting on it.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// No refresh credential is stored; the identity service was not contacted.
	#[error("No refresh credential is stored.")]
	NoRefreshCredential,
	/// Identity service rejected the renewal.
	#[error("Identity service rejected the session renewal: {0}")]
	Rejected(#[source] IdentityError),
	/// Credential store failed while reading or replacing the credential set.
	#[error("{0}")]
	Storage(#[source] StoreError),
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Client configuration lacks an API base URL.
	#[error("Missing API base URL.")]
	MissingApiBase,
	/// Identity configuration lacks a token endpoint.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Endpoint path could not be joined onto the API base.
	#[error("Endpoint `{endpoint}` is not a valid path.")]
	InvalidEndpoint {
		/// Endpoint path supplied by the caller.
		endpoint: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	RequestBody(#[source] serde_json::Error),
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {target}.")]
	Network {
		/// Host or endpoint being called, for diagnostics.
		target: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error for the given target.
	pub fn network(
		target: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { target: target.into(), source: Box::new(src) }
	}
}
