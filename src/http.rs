//! Transport primitives shared by API fetches and identity-service calls.
//!
//! [`HttpTransport`] is the client's only dependency on an HTTP stack. It moves
//! `http::Request<Vec<u8>>` in and `http::Response<Vec<u8>>` out, so API calls and OAuth token
//! exchanges run over the same implementation. [`OAuthHttpClient`] adapts any transport to the
//! `oauth2` crate's [`AsyncHttpClient`] contract.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send + Sync>>;

/// Sends a fully built request and returns the raw response.
///
/// Implementations report every HTTP status as `Ok`; only failures to obtain a response at
/// all (DNS, TCP, TLS, IO) are errors. Status classification belongs to the caller. Futures
/// must be `Sync` because token exchanges run them inside `oauth2`'s request futures.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Dispatches `request`.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}
impl<T> HttpTransport for Arc<T>
where
	T: ?Sized + HttpTransport,
{
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		T::send(self, request)
	}
}

/// Adapter that lets the `oauth2` crate drive token requests over an [`HttpTransport`].
pub struct OAuthHttpClient<T>(Arc<T>)
where
	T: ?Sized + HttpTransport;
impl<T> OAuthHttpClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Wraps a shared transport.
	pub fn new(transport: impl Into<Arc<T>>) -> Self {
		Self(transport.into())
	}
}
impl<T> Clone for OAuthHttpClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self(Arc::clone(&self.0))
	}
}
impl<'c, T> AsyncHttpClient<'c> for OAuthHttpClient<T>
where
	T: ?Sized + HttpTransport,
{
	type Error = HttpClientError<TransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			// The variant name is historical; `oauth2` boxes any transport error in it.
			self.0.send(request).await.map_err(|e| HttpClientError::Reqwest(Box::new(e)))
		})
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Configure any custom [`ReqwestClient`] to disable redirect following when it is also used for
/// the identity service; token endpoints answer directly.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let target = request.uri().host().unwrap_or_default().to_owned();
			let request = reqwest::Request::try_from(request)
				.map_err(|e| TransportError::network(&target, e))?;
			let response =
				client.execute(request).await.map_err(|e| TransportError::network(&target, e))?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body =
				response.bytes().await.map_err(|e| TransportError::network(&target, e))?.to_vec();
			let mut converted = HttpResponse::new(body);

			*converted.status_mut() = status;
			*converted.headers_mut() = headers;

			Ok(converted)
		})
	}
}
