//! Confidential web flow: authorization code redeemed with the client secret.

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::TokenHttpClient,
	obs::FlowKind,
	oauth::{
		OAuthClientOptions, OAuthCore,
		endpoint::{GrantType, TokenRequest},
		observe,
	},
	token::{OAuthToken, TokenSecret},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Input of [`WebOAuthClient::get_oauth_url`].
#[derive(Clone, Debug, Default)]
pub struct WebOAuthUrlRequest {
	/// Redirect URI registered for the app.
	pub redirect_uri: String,
	/// Opaque state echoed back on redirect.
	pub state: String,
	/// Workspace the authorization page is scoped to.
	pub workspace_id: Option<String>,
}
impl WebOAuthUrlRequest {
	/// Creates a request without a workspace.
	pub fn new(redirect_uri: impl Into<String>, state: impl Into<String>) -> Self {
		Self { redirect_uri: redirect_uri.into(), state: state.into(), workspace_id: None }
	}

	/// Scopes the authorization page to a workspace.
	pub fn with_workspace_id(mut self, workspace_id: impl Into<String>) -> Self {
		self.workspace_id = Some(workspace_id.into());

		self
	}
}

/// Code redemption input for [`WebOAuthClient::get_access_token`].
#[derive(Clone, Debug)]
pub struct WebAccessTokenRequest {
	/// Authorization code from the redirect.
	pub code: String,
	/// Redirect URI used for the authorization request.
	pub redirect_uri: String,
}
impl WebAccessTokenRequest {
	/// Creates the redemption input.
	pub fn new(code: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
		Self { code: code.into(), redirect_uri: redirect_uri.into() }
	}
}

/// OAuth client for server-side apps holding a client secret.
pub struct WebOAuthClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	core: OAuthCore<C>,
}
impl<C> WebOAuthClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates a client over a caller-provided transport; the secret must be non-empty.
	pub fn with_http_client(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		options: OAuthClientOptions,
		http_client: Arc<C>,
	) -> Result<Self> {
		let client_secret = TokenSecret::new(client_secret);

		if client_secret.is_empty() {
			return Err(ConfigError::MissingField { field: "client_secret" }.into());
		}

		Ok(Self { core: OAuthCore::new(client_id, Some(client_secret), &options, http_client)? })
	}

	/// OAuth client identifier.
	pub fn client_id(&self) -> &str {
		self.core.client_id()
	}

	/// Builds the authorization page URL.
	pub fn get_oauth_url(&self, request: &WebOAuthUrlRequest) -> Result<Url> {
		self.core.authorize_url(
			&request.redirect_uri,
			&request.state,
			request.workspace_id.as_deref(),
			&[],
		)
	}

	/// Redeems an authorization code with the client secret as bearer credential.
	pub async fn get_access_token(&self, request: &WebAccessTokenRequest) -> Result<OAuthToken> {
		observe(FlowKind::Web, "get_access_token", async {
			let mut body = TokenRequest::new(self.core.client_id(), GrantType::AuthorizationCode);

			body.code = Some(request.code.clone());
			body.redirect_uri = Some(request.redirect_uri.clone());

			self.core.exchange(&body, self.core.client_secret()).await
		})
		.await
	}

	/// Redeems a refresh token with the client secret as bearer credential.
	pub async fn refresh_token(&self, refresh_token: &str) -> Result<OAuthToken> {
		self.core.refresh(refresh_token, true).await
	}
}
#[cfg(feature = "reqwest")]
impl WebOAuthClient<ReqwestHttpClient> {
	/// Creates a client backed by a default [`ReqwestHttpClient`].
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		options: OAuthClientOptions,
	) -> Result<Self> {
		Self::with_http_client(
			client_id,
			client_secret,
			options,
			Arc::new(ReqwestHttpClient::new()?),
		)
	}
}
impl<C> Debug for WebOAuthClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("WebOAuthClient").field("core", &self.core).finish()
	}
}
