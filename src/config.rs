//! Validated client and identity configuration.
//!
//! Both configs are plain data (`Serialize`/`Deserialize`) so applications can load them from
//! their own settings files, and both are assembled through builders that enforce HTTPS
//! endpoints. Plain HTTP is accepted only for loopback hosts.

// self
use crate::{_prelude::*, auth::CredentialKey, error::ConfigError};

/// Which stored token is sent as the bearer credential.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BearerToken {
	/// Send the OIDC ID token.
	#[default]
	IdToken,
	/// Send the OAuth access token.
	AccessToken,
}
impl BearerToken {
	/// Store key holding the bearer credential.
	pub const fn key(self) -> CredentialKey {
		match self {
			Self::IdToken => CredentialKey::IdToken,
			Self::AccessToken => CredentialKey::AccessToken,
		}
	}
}

/// Client authentication mode used at the identity token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// HTTP Basic with `client_id`/`client_secret`.
	#[default]
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}

/// Settings for the API the fetcher talks to.
///
/// Deserialized values pass through [`ClientConfigBuilder::build`], so configs loaded from a
/// settings file get the same validation and normalization as built ones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawClientConfig")]
pub struct ClientConfig {
	/// Base URL every endpoint is joined onto; its path always ends in `/`.
	pub api_base: Url,
	/// Token sent in the `Authorization` header.
	pub bearer: BearerToken,
}
impl ClientConfig {
	/// Creates a new builder.
	pub fn builder() -> ClientConfigBuilder {
		ClientConfigBuilder::default()
	}

	/// Resolves `endpoint` against the API base, ignoring a leading `/`.
	pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, ConfigError> {
		self.api_base.join(endpoint.trim_start_matches('/')).map_err(|source| {
			ConfigError::InvalidEndpoint { endpoint: endpoint.to_owned(), source }
		})
	}
}

#[derive(Deserialize)]
struct RawClientConfig {
	api_base: Url,
	#[serde(default)]
	bearer: BearerToken,
}
impl TryFrom<RawClientConfig> for ClientConfig {
	type Error = ConfigError;

	fn try_from(raw: RawClientConfig) -> Result<Self, Self::Error> {
		ClientConfig::builder().api_base(raw.api_base).bearer(raw.bearer).build()
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
	/// API base URL.
	pub api_base: Option<Url>,
	/// Bearer token selection.
	pub bearer: BearerToken,
}
impl ClientConfigBuilder {
	/// Sets the API base URL.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Selects which stored token is sent as the bearer.
	pub fn bearer(mut self, bearer: BearerToken) -> Self {
		self.bearer = bearer;

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let mut api_base = self.api_base.ok_or(ConfigError::MissingApiBase)?;

		validate_endpoint("api", &api_base)?;

		if !api_base.path().ends_with('/') {
			let path = format!("{}/", api_base.path());

			api_base.set_path(&path);
		}

		Ok(ClientConfig { api_base, bearer: self.bearer })
	}
}

/// Settings for the identity service that renews sessions.
///
/// Like [`ClientConfig`], deserialization runs the builder's validation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawIdentityConfig")]
pub struct IdentityConfig {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// Optional client secret for confidential clients.
	pub client_secret: Option<String>,
	/// Token endpoint that accepts `grant_type=refresh_token`.
	pub token_endpoint: Url,
	/// Client authentication mode.
	pub auth_method: ClientAuthMethod,
}
impl IdentityConfig {
	/// Creates a new builder for `client_id`.
	pub fn builder(client_id: impl Into<String>) -> IdentityConfigBuilder {
		IdentityConfigBuilder {
			client_id: client_id.into(),
			client_secret: None,
			token_endpoint: None,
			auth_method: ClientAuthMethod::default(),
		}
	}
}
impl Debug for IdentityConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IdentityConfig")
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("token_endpoint", &self.token_endpoint)
			.field("auth_method", &self.auth_method)
			.finish()
	}
}

#[derive(Deserialize)]
struct RawIdentityConfig {
	client_id: String,
	#[serde(default)]
	client_secret: Option<String>,
	token_endpoint: Url,
	#[serde(default)]
	auth_method: ClientAuthMethod,
}
impl TryFrom<RawIdentityConfig> for IdentityConfig {
	type Error = ConfigError;

	fn try_from(raw: RawIdentityConfig) -> Result<Self, Self::Error> {
		let mut builder = IdentityConfig::builder(raw.client_id)
			.token_endpoint(raw.token_endpoint)
			.auth_method(raw.auth_method);

		if let Some(secret) = raw.client_secret {
			builder = builder.client_secret(secret);
		}

		builder.build()
	}
}

/// Builder for [`IdentityConfig`] values.
pub struct IdentityConfigBuilder {
	client_id: String,
	client_secret: Option<String>,
	token_endpoint: Option<Url>,
	auth_method: ClientAuthMethod,
}
impl IdentityConfigBuilder {
	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the client secret used for confidential client authentication.
	pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Overrides the client authentication method.
	pub fn auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.auth_method = method;

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<IdentityConfig, ConfigError> {
		let token_endpoint = self.token_endpoint.ok_or(ConfigError::MissingTokenEndpoint)?;

		validate_endpoint("token", &token_endpoint)?;

		Ok(IdentityConfig {
			client_id: self.client_id,
			client_secret: self.client_secret,
			token_endpoint,
			auth_method: self.auth_method,
		})
	}
}
impl Debug for IdentityConfigBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IdentityConfigBuilder")
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("token_endpoint", &self.token_endpoint)
			.finish()
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ConfigError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(ConfigError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
		Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
		None => false,
	}
}
