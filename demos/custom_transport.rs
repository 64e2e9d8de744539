//! Demonstrates plugging an in-process [`HttpTransport`] into the fetcher and the identity
//! service.
//!
//! 1. Implement [`HttpTransport::send`] so it answers both API and token requests.
//! 2. Share one `Arc` of it between [`OAuthIdentityService`] and [`AuthenticatedFetcher`].
//! 3. Watch concurrent callers collapse onto a single refresh.

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use color_eyre::Result;
use serde::Deserialize;
// self
use concertly_client::{
	auth::CredentialSet,
	config::{ClientConfig, IdentityConfig},
	fetcher::AuthenticatedFetcher,
	http::{HttpTransport, TransportFuture},
	http_types::{Request, Response, StatusCode, header::AUTHORIZATION},
	identity::OAuthIdentityService,
	request::ApiRequest,
	store::{CredentialStore, MemoryStore},
	url::Url,
};

const TOKEN_RESPONSE: &str = "{\"access_token\":\"access-2\",\"id_token\":\"id-2\",\"refresh_token\":\"refresh-2\",\"token_type\":\"bearer\"}";

#[derive(Debug, Deserialize)]
struct Profile {
	name: String,
}

/// Serves `/token` renewals and a `/me` endpoint that accepts only the renewed ID token.
#[derive(Default)]
struct LoopbackBackend {
	renewals: AtomicUsize,
}
impl LoopbackBackend {
	fn respond(&self, request: &Request<Vec<u8>>) -> Response<Vec<u8>> {
		let (status, body) = if request.uri().path() == "/token" {
			self.renewals.fetch_add(1, Ordering::SeqCst);

			(StatusCode::OK, TOKEN_RESPONSE)
		} else if request.headers().get(AUTHORIZATION).is_some_and(|value| value == "Bearer id-2") {
			(StatusCode::OK, "{\"name\":\"Robin\"}")
		} else {
			(StatusCode::UNAUTHORIZED, "")
		};
		let mut response = Response::new(body.as_bytes().to_vec());

		*response.status_mut() = status;

		response
	}
}
impl HttpTransport for LoopbackBackend {
	fn send(&self, request: Request<Vec<u8>>) -> TransportFuture<'_> {
		Box::pin(async move {
			tokio::task::yield_now().await;

			Ok(self.respond(&request))
		})
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let backend = Arc::new(LoopbackBackend::default());
	let store = MemoryStore::with_credentials(CredentialSet::new("access-1", "id-1", "refresh-1"));
	let identity = <OAuthIdentityService<LoopbackBackend>>::with_transport(
		&IdentityConfig::builder("concertly-demo")
			.token_endpoint(Url::parse("https://id.concertly.example/token")?)
			.client_secret("demo-secret")
			.build()?,
		Arc::clone(&backend),
	)?;
	let fetcher = <AuthenticatedFetcher<LoopbackBackend>>::with_transport(
		ClientConfig::builder().api_base(Url::parse("https://api.concertly.example/")?).build()?,
		Arc::new(store.clone()),
		Arc::new(identity),
		Arc::clone(&backend),
	);
	let callers = (0..4)
		.map(|_| {
			let fetcher = fetcher.clone();

			tokio::spawn(async move { fetcher.fetch::<Profile>(&ApiRequest::get("me")).await })
		})
		.collect::<Vec<_>>();

	for caller in callers {
		println!("Signed in as {}.", caller.await??.name);
	}

	println!(
		"Token endpoint calls: {}; refreshes started: {}; joined: {}.",
		backend.renewals.load(Ordering::SeqCst),
		fetcher.metrics().started(),
		fetcher.metrics().joined(),
	);
	println!("Session present: {}.", store.load().await?.is_some());

	fetcher.sign_out().await?;

	println!("Signed in after sign-out: {}.", fetcher.is_signed_in().await?);

	Ok(())
}
