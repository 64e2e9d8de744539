//! Fixtures shared by the integration tests.

#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use tokio::sync::Semaphore;
// self
use concertly_client::{
	auth::{CredentialSet, TokenSecret},
	config::ClientConfig,
	fetcher::AuthenticatedFetcher,
	http::{HttpTransport, TransportFuture},
	http_types::{Request, Response, StatusCode, header::AUTHORIZATION},
	identity::{IdentityError, IdentityFuture, IdentityService},
	store::CredentialStore,
	url::Url,
};

pub const STALE: (&str, &str, &str) = ("access-stale", "id-stale", "refresh-1");
pub const FRESH: (&str, &str, &str) = ("access-fresh", "id-fresh", "refresh-2");

pub fn stale_set() -> CredentialSet {
	CredentialSet::new(STALE.0, STALE.1, STALE.2)
}

pub fn fresh_set() -> CredentialSet {
	CredentialSet::new(FRESH.0, FRESH.1, FRESH.2)
}

pub fn url(value: &str) -> Url {
	Url::parse(value).expect("Test URL should parse.")
}

pub fn client_config(base: &str) -> ClientConfig {
	ClientConfig::builder().api_base(url(base)).build().expect("Client config should build.")
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
	while !condition() {
		tokio::task::yield_now().await;
	}
}

/// Fake API that accepts only the fresh ID token.
///
/// Requests bearing any other token get `401`; requests bearing the fresh token get
/// `accepted_status` with `body`.
pub struct FakeApi {
	pub accepted_status: StatusCode,
	pub body: &'static str,
	pub sent: AtomicUsize,
	pub rejected: AtomicUsize,
}
impl FakeApi {
	pub fn new(accepted_status: StatusCode, body: &'static str) -> Arc<Self> {
		Arc::new(Self {
			accepted_status,
			body,
			sent: AtomicUsize::new(0),
			rejected: AtomicUsize::new(0),
		})
	}

	pub fn sent(&self) -> usize {
		self.sent.load(Ordering::SeqCst)
	}

	pub fn rejected(&self) -> usize {
		self.rejected.load(Ordering::SeqCst)
	}
}
impl HttpTransport for FakeApi {
	fn send(&self, request: Request<Vec<u8>>) -> TransportFuture<'_> {
		self.sent.fetch_add(1, Ordering::SeqCst);

		let expected = format!("Bearer {}", FRESH.1);
		let fresh =
			request.headers().get(AUTHORIZATION).is_some_and(|value| value == expected.as_str());
		let status = if fresh {
			self.accepted_status
		} else {
			self.rejected.fetch_add(1, Ordering::SeqCst);

			StatusCode::UNAUTHORIZED
		};

		Box::pin(async move {
			let mut response = Response::new(self.body.as_bytes().to_vec());

			*response.status_mut() = status;

			Ok(response)
		})
	}
}

/// Identity service that blocks every renewal until the test opens the gate.
pub struct GatedIdentity {
	pub calls: AtomicUsize,
	pub gate: Semaphore,
	pub outcome: Result<CredentialSet, IdentityError>,
}
impl GatedIdentity {
	pub fn new(outcome: Result<CredentialSet, IdentityError>) -> Arc<Self> {
		Arc::new(Self { calls: AtomicUsize::new(0), gate: Semaphore::new(0), outcome })
	}

	/// Same as [`GatedIdentity::new`] with the gate already open.
	pub fn open(outcome: Result<CredentialSet, IdentityError>) -> Arc<Self> {
		let identity = Self::new(outcome);

		identity.gate.add_permits(1024);

		identity
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl IdentityService for GatedIdentity {
	fn renew_session<'a>(
		&'a self,
		refresh_token: &'a TokenSecret,
	) -> IdentityFuture<'a, CredentialSet> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			let _permit = self
				.gate
				.acquire()
				.await
				.map_err(|e| IdentityError::Unexpected { message: e.to_string() })?;

			if refresh_token.expose() != STALE.2 {
				return Err(IdentityError::Rejected {
					error: "invalid_grant".into(),
					description: Some("refresh token already rotated".into()),
				});
			}

			self.outcome.clone()
		})
	}
}

pub fn fake_fetcher(
	store: Arc<dyn CredentialStore>,
	api: &Arc<FakeApi>,
	identity: &Arc<GatedIdentity>,
) -> AuthenticatedFetcher<FakeApi> {
	AuthenticatedFetcher::with_transport(
		client_config("https://api.concertly.test/"),
		store,
		identity.clone(),
		api.clone(),
	)
}

#[cfg(feature = "reqwest")]
pub fn insecure_transport() -> concertly_client::http::ReqwestTransport {
	let client = concertly_client::reqwest::Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.redirect(concertly_client::reqwest::redirect::Policy::none())
		.build()
		.expect("Failed to build insecure reqwest client for tests.");

	concertly_client::http::ReqwestTransport::with_client(client)
}
