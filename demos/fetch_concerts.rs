//! Demonstrates the reqwest-backed fetcher recovering from an expired ID token.
//!
//! A mock API rejects the stale token with `401`, the fetcher renews the session against a mock
//! token endpoint, stores the rotated triple, and replays the request once.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use concertly_client::{
	auth::CredentialSet,
	catalog::{Catalog, ConcertCategory},
	config::{ClientConfig, IdentityConfig},
	fetcher::AuthenticatedFetcher,
	identity::OAuthIdentityService,
	store::{CredentialStore, MemoryStore},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/concerts").header("authorization", "Bearer id-expired");
			then.status(401);
		})
		.await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").body_includes("grant_type=refresh_token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"access-2\",\"id_token\":\"id-2\",\"refresh_token\":\"refresh-2\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let concerts = server
		.mock_async(|when, then| {
			when.method(GET).path("/concerts").header("authorization", "Bearer id-2");
			then.status(200).header("content-type", "application/json").body(
				"[{\"id\":\"c-7\",\"artist\":\"Fontaines D.C.\",\"title\":\"Romance\",\"venue\":\"Brixton Academy\",\"city\":\"London\",\"startsAt\":\"2025-09-12T19:00:00+01:00\"}]",
			);
		})
		.await;
	let store = MemoryStore::with_credentials(CredentialSet::new(
		"access-expired",
		"id-expired",
		"refresh-1",
	));
	let identity = OAuthIdentityService::new(
		&IdentityConfig::builder("concertly-demo")
			.token_endpoint(Url::parse(&server.url("/token"))?)
			.build()?,
	)?;
	let fetcher = AuthenticatedFetcher::new(
		ClientConfig::builder().api_base(Url::parse(&server.url("/"))?).build()?,
		Arc::new(store.clone()),
		Arc::new(identity),
	);
	let catalog = Catalog::new(fetcher);

	for concert in catalog.concerts(ConcertCategory::Trending).await? {
		println!("{} at {} on {}.", concert.artist, concert.venue, concert.starts_at);
	}

	if let Some(credentials) = store.load().await? {
		println!("Stored ID token fingerprint: {}.", credentials.id_token.fingerprint());
	}

	println!("Refreshes started: {}.", catalog.fetcher().metrics().started());

	expired.assert_async().await;
	token.assert_async().await;
	concerts.assert_async().await;

	Ok(())
}
