//! Immutable per-call request descriptors.

// crates.io
use oauth2::{
	HttpRequest,
	http::{
		Method,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue},
	},
};
// self
use crate::{
	_prelude::*, auth::TokenSecret, config::ClientConfig, dates::DateDecoding, error::ConfigError,
};

const APPLICATION_JSON: &str = "application/json";

/// Endpoint, method, query, optional JSON body, and date policy for one API call.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiRequest {
	endpoint: String,
	method: Method,
	query: Vec<(String, String)>,
	body: Option<Vec<u8>>,
	dates: DateDecoding,
}
impl ApiRequest {
	/// Creates a request for `endpoint`, resolved against the configured API base.
	pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
		Self {
			endpoint: endpoint.into(),
			method,
			query: Vec::new(),
			body: None,
			dates: DateDecoding::default(),
		}
	}

	/// `GET endpoint`.
	pub fn get(endpoint: impl Into<String>) -> Self {
		Self::new(Method::GET, endpoint)
	}

	/// `POST endpoint`.
	pub fn post(endpoint: impl Into<String>) -> Self {
		Self::new(Method::POST, endpoint)
	}

	/// `PUT endpoint`.
	pub fn put(endpoint: impl Into<String>) -> Self {
		Self::new(Method::PUT, endpoint)
	}

	/// `DELETE endpoint`.
	pub fn delete(endpoint: impl Into<String>) -> Self {
		Self::new(Method::DELETE, endpoint)
	}

	/// Appends a query pair; pairs keep insertion order and are URL-encoded on send.
	pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Serializes `body` as the JSON payload.
	pub fn json<B>(mut self, body: &B) -> Result<Self, ConfigError>
	where
		B: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(body).map_err(ConfigError::RequestBody)?);

		Ok(self)
	}

	/// Selects how timestamps in the response body are decoded.
	pub fn dates(mut self, policy: DateDecoding) -> Self {
		self.dates = policy;

		self
	}

	/// Endpoint path as supplied.
	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	/// HTTP method.
	pub fn method(&self) -> &Method {
		&self.method
	}

	/// Query pairs in insertion order.
	pub fn query_pairs(&self) -> &[(String, String)] {
		&self.query
	}

	/// Serialized JSON body, if any.
	pub fn body(&self) -> Option<&[u8]> {
		self.body.as_deref()
	}

	/// Date policy applied when decoding the response.
	pub fn date_decoding(&self) -> DateDecoding {
		self.dates
	}

	pub(crate) fn to_http(
		&self,
		config: &ClientConfig,
		bearer: &TokenSecret,
	) -> Result<HttpRequest, ConfigError> {
		let mut url = config.endpoint_url(&self.endpoint)?;

		if !self.query.is_empty() {
			url.query_pairs_mut().extend_pairs(self.query.iter());
		}

		let mut authorization = HeaderValue::try_from(format!("Bearer {}", bearer.expose()))
			.map_err(oauth2::http::Error::from)?;

		authorization.set_sensitive(true);

		let mut builder = oauth2::http::Request::builder()
			.method(self.method.clone())
			.uri(url.as_str())
			.header(AUTHORIZATION, authorization)
			.header(ACCEPT, APPLICATION_JSON);

		if self.body.is_some() {
			builder = builder.header(CONTENT_TYPE, APPLICATION_JSON);
		}

		Ok(builder.body(self.body.clone().unwrap_or_default())?)
	}
}
impl Debug for ApiRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiRequest")
			.field("method", &self.method)
			.field("endpoint", &self.endpoint)
			.field("query", &self.query)
			.field("body_len", &self.body.as_ref().map(Vec::len))
			.field("dates", &self.dates)
			.finish()
	}
}
