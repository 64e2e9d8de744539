//! OAuth 2.0 `refresh_token` grant backed by the `oauth2` crate.

// crates.io
use oauth2::{
	AuthType, Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet, ExtraTokenFields,
	HttpClientError, RefreshToken, RequestTokenError, StandardRevocableToken, StandardTokenResponse,
	TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
		BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	auth::{CredentialSet, TokenSecret},
	config::{ClientAuthMethod, IdentityConfig},
	error::{ConfigError, TransportError},
	http::{HttpTransport, OAuthHttpClient},
	identity::{IdentityError, IdentityFuture, IdentityService},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

type RenewalResponse = StandardTokenResponse<IdTokenFields, BasicTokenType>;
type RenewalClient = Client<
	BasicErrorResponse,
	RenewalResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;
type RenewalError = RequestTokenError<HttpClientError<TransportError>, BasicErrorResponse>;

#[derive(Clone, Default, Serialize, Deserialize)]
struct IdTokenFields {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	id_token: Option<String>,
}
impl ExtraTokenFields for IdTokenFields {}
impl Debug for IdTokenFields {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IdTokenFields").field("id_token_set", &self.id_token.is_some()).finish()
	}
}

/// Renews sessions by calling a token endpoint with `grant_type=refresh_token`.
///
/// Token requests travel over the same [`HttpTransport`] the fetcher uses.
pub struct OAuthIdentityService<T>
where
	T: ?Sized + HttpTransport,
{
	oauth_client: RenewalClient,
	http_client: OAuthHttpClient<T>,
}
impl<T> OAuthIdentityService<T>
where
	T: ?Sized + HttpTransport,
{
	/// Builds a service for `config` that sends token requests through `transport`.
	pub fn with_transport(
		config: &IdentityConfig,
		transport: impl Into<Arc<T>>,
	) -> Result<Self, ConfigError> {
		let token_url = TokenUrl::new(config.token_endpoint.to_string()).map_err(|source| {
			ConfigError::InvalidEndpoint { endpoint: config.token_endpoint.to_string(), source }
		})?;
		let mut oauth_client: RenewalClient =
			Client::new(ClientId::new(config.client_id.clone())).set_token_uri(token_url);

		if let Some(secret) = &config.client_secret {
			oauth_client = oauth_client.set_client_secret(ClientSecret::new(secret.clone()));
		}
		if matches!(config.auth_method, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self { oauth_client, http_client: OAuthHttpClient::new(transport) })
	}
}
#[cfg(feature = "reqwest")]
impl OAuthIdentityService<ReqwestTransport> {
	/// Builds a service that provisions its own reqwest transport.
	pub fn new(config: &IdentityConfig) -> Result<Self, ConfigError> {
		Self::with_transport(config, ReqwestTransport::default())
	}
}
impl<T> IdentityService for OAuthIdentityService<T>
where
	T: ?Sized + HttpTransport,
{
	fn renew_session<'a>(
		&'a self,
		refresh_token: &'a TokenSecret,
	) -> IdentityFuture<'a, CredentialSet> {
		Box::pin(async move {
			let refresh_secret = RefreshToken::new(refresh_token.expose().to_owned());
			let response = self
				.oauth_client
				.exchange_refresh_token(&refresh_secret)
				.request_async(&self.http_client)
				.await
				.map_err(map_request_error)?;

			credentials_from_response(response, refresh_token)
		})
	}
}
impl<T> Debug for OAuthIdentityService<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthIdentityService")
			.field("client_id", self.oauth_client.client_id())
			.field("token_uri", self.oauth_client.token_uri())
			.finish()
	}
}

fn credentials_from_response(
	response: RenewalResponse,
	previous_refresh: &TokenSecret,
) -> Result<CredentialSet, IdentityError> {
	let id_token =
		response.extra_fields().id_token.clone().ok_or(IdentityError::MissingIdToken)?;
	let refresh_token = response
		.refresh_token()
		.map(|token| TokenSecret::new(token.secret().to_owned()))
		.unwrap_or_else(|| previous_refresh.clone());

	Ok(CredentialSet {
		access_token: TokenSecret::new(response.access_token().secret().to_owned()),
		id_token: TokenSecret::new(id_token),
		refresh_token,
	})
}

fn map_request_error(err: RenewalError) -> IdentityError {
	match err {
		RequestTokenError::ServerResponse(response) => IdentityError::Rejected {
			error: response.error().as_ref().to_owned(),
			description: response.error_description().cloned(),
		},
		RequestTokenError::Request(error) => IdentityError::Transport { message: render(&error) },
		RequestTokenError::Parse(error, _body) =>
			IdentityError::MalformedResponse { message: render(&error) },
		RequestTokenError::Other(message) => IdentityError::Unexpected { message },
	}
}

fn render(error: &(dyn StdError + 'static)) -> String {
	let mut rendered = error.to_string();
	let mut source = error.source();

	while let Some(cause) = source {
		rendered.push_str(": ");
		rendered.push_str(&cause.to_string());

		source = cause.source();
	}

	rendered
}
