//! Authenticated fetches with single-flight refresh and a single retry.
//!
//! [`AuthenticatedFetcher::fetch`] reads the bearer credential from the store on every call,
//! sends the request, and on a `401` runs (or joins) the shared refresh before resending the
//! request exactly once. A second `401` is terminal.

pub mod refresh;

pub use refresh::RefreshMetrics;

// crates.io
use oauth2::{HttpResponse, http::StatusCode};
// self
use crate::{
	_prelude::*,
	auth::{CredentialSet, TokenSecret},
	config::ClientConfig,
	dates::{self, DateDecoding},
	error::RefreshError,
	fetcher::refresh::RefreshCoordinator,
	http::HttpTransport,
	identity::IdentityService,
	obs::{self, CallOutcome, CallSpan, Operation},
	request::ApiRequest,
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Fetcher specialized for the crate's default reqwest transport.
pub type ReqwestFetcher = AuthenticatedFetcher<ReqwestTransport>;

/// Issues bearer-authenticated API requests and keeps the stored session fresh.
///
/// Clones share the transport, the credential store, and the refresh slot, so every clone
/// coordinates with the others.
pub struct AuthenticatedFetcher<T>
where
	T: ?Sized + HttpTransport,
{
	config: ClientConfig,
	transport: Arc<T>,
	store: Arc<dyn CredentialStore>,
	refresh: RefreshCoordinator,
}
impl<T> AuthenticatedFetcher<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a fetcher over a caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		identity: Arc<dyn IdentityService>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		let refresh = RefreshCoordinator::new(Arc::clone(&store), identity);

		Self { config, transport: transport.into(), store, refresh }
	}

	/// Client configuration in use.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Refresh counters shared by every clone of this fetcher.
	pub fn metrics(&self) -> &RefreshMetrics {
		self.refresh.metrics()
	}

	/// Sends `request` and decodes a `200` response body as `R`.
	///
	/// See the module docs for the retry contract. Errors map as follows: no stored bearer is
	/// [`Error::MissingCredential`], statuses other than `200`/`401` are
	/// [`Error::InvalidResponse`], undecodable bodies are [`Error::InvalidData`], and a `401` on
	/// the retried request is [`Error::Unauthorized`].
	pub async fn fetch<R>(&self, request: &ApiRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		const OPERATION: Operation = Operation::Fetch;

		let span = CallSpan::new(OPERATION, "fetch");

		obs::record_call_outcome(OPERATION, CallOutcome::Attempt);

		let result = span
			.instrument(async {
				let bearer = self.bearer().await?;

				span.record_credential(&bearer);

				let response = self.send(request, &bearer).await?;

				if response.status() != StatusCode::UNAUTHORIZED {
					return decode(response, request.date_decoding());
				}

				self.refresh.run().await?;

				let bearer = self.bearer().await?;

				span.record_credential(&bearer);

				let response = self.send(request, &bearer).await?;

				if response.status() == StatusCode::UNAUTHORIZED {
					return Err(Error::Unauthorized);
				}

				decode(response, request.date_decoding())
			})
			.await;

		obs::record_call_outcome(OPERATION, CallOutcome::of(&result));

		result
	}

	/// Renews the session, or joins the renewal already in flight.
	pub async fn refresh(&self) -> Result<(), RefreshError> {
		self.refresh.run().await
	}

	/// Stores a freshly issued credential set, replacing any previous one in one step.
	pub async fn sign_in(&self, credentials: CredentialSet) -> Result<()> {
		const OPERATION: Operation = Operation::SignIn;

		let span = CallSpan::new(OPERATION, "sign_in");

		obs::record_call_outcome(OPERATION, CallOutcome::Attempt);
		span.record_credential(credentials.get(self.config.bearer.key()));

		let result = span.instrument(self.store.replace(credentials)).await.map_err(Error::from);

		obs::record_call_outcome(OPERATION, CallOutcome::of(&result));

		result
	}

	/// Removes the stored credential set.
	pub async fn sign_out(&self) -> Result<()> {
		const OPERATION: Operation = Operation::SignOut;

		let span = CallSpan::new(OPERATION, "sign_out");

		obs::record_call_outcome(OPERATION, CallOutcome::Attempt);

		let result = span.instrument(self.store.clear()).await.map_err(Error::from);

		obs::record_call_outcome(OPERATION, CallOutcome::of(&result));

		result
	}

	/// Returns `true` when a bearer credential is stored.
	pub async fn is_signed_in(&self) -> Result<bool> {
		Ok(self.store.get(self.config.bearer.key()).await?.is_some())
	}

	async fn bearer(&self) -> Result<TokenSecret> {
		self.store.get(self.config.bearer.key()).await?.ok_or(Error::MissingCredential)
	}

	async fn send(&self, request: &ApiRequest, bearer: &TokenSecret) -> Result<HttpResponse> {
		let http_request = request.to_http(&self.config, bearer)?;

		Ok(self.transport.send(http_request).await?)
	}
}
#[cfg(feature = "reqwest")]
impl AuthenticatedFetcher<ReqwestTransport> {
	/// Creates a fetcher that provisions its own reqwest transport.
	pub fn new(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		identity: Arc<dyn IdentityService>,
	) -> Self {
		Self::with_transport(config, store, identity, ReqwestTransport::default())
	}
}
impl<T> Clone for AuthenticatedFetcher<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			transport: Arc::clone(&self.transport),
			store: Arc::clone(&self.store),
			refresh: self.refresh.clone(),
		}
	}
}
impl<T> Debug for AuthenticatedFetcher<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedFetcher")
			.field("config", &self.config)
			.field("metrics", self.refresh.metrics())
			.finish()
	}
}

fn decode<R>(response: HttpResponse, policy: DateDecoding) -> Result<R>
where
	R: DeserializeOwned,
{
	let status = response.status();

	if status != StatusCode::OK {
		return Err(Error::InvalidResponse { status: status.as_u16() });
	}

	dates::decode(response.body(), policy).map_err(|source| Error::InvalidData { source })
}
