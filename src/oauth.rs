//! Coze OAuth client family.
//!
//! Four clients share one core: [`PkceOAuthClient`], [`DeviceOAuthClient`],
//! [`JwtOAuthClient`], and [`WebOAuthClient`]. Each speaks its own acquisition protocol against
//! the same token endpoint; [`OAuthClient`] wraps them behind a single `acquire` call.

pub mod config;
pub mod device;
pub mod endpoint;
pub mod jwt;
pub mod pkce;
pub mod scope;
pub mod web;

pub use config::*;
pub use device::*;
pub use endpoint::GrantType;
pub use jwt::*;
pub use pkce::*;
pub use scope::*;
pub use web::*;

// crates.io
use oauth2::http::Method;
// self
use crate::{
	_prelude::*,
	cache::TokenCache,
	dispatch::{Dispatched, Dispatcher, RequestOptions},
	error::ConfigError,
	http::TokenHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	oauth::endpoint::{TokenEndpointResponse, TokenRequest, authorize_path},
	token::{OAuthToken, TokenSecret},
};

/// International API base URL.
pub const COM_BASE_URL: &str = "https://api.coze.com";
/// Mainland China API base URL.
pub const CN_BASE_URL: &str = "https://api.coze.cn";

/// Connection options shared by every OAuth client.
#[derive(Clone)]
pub struct OAuthClientOptions {
	/// API base URL; token and device endpoints hang off it.
	pub base_url: String,
	/// Console URL hosting the authorization page. Defaults to the base URL with its first `api.`
	/// replaced by `www.`.
	pub www_url: Option<String>,
	/// Cache consulted by [`JwtOAuthClient`]; a sweeping [`crate::cache::MemoryTokenCache`] is
	/// created when absent.
	pub token_cache: Option<Arc<dyn TokenCache>>,
}
impl OAuthClientOptions {
	/// Options targeting [`COM_BASE_URL`].
	pub fn new() -> Self {
		Self::default()
	}

	/// Overrides the API base URL.
	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into();

		self
	}

	/// Overrides the console URL.
	pub fn with_www_url(mut self, www_url: impl Into<String>) -> Self {
		self.www_url = Some(www_url.into());

		self
	}

	/// Injects the token cache used by JWT clients.
	pub fn with_token_cache(mut self, cache: Arc<dyn TokenCache>) -> Self {
		self.token_cache = Some(cache);

		self
	}
}
impl Default for OAuthClientOptions {
	fn default() -> Self {
		Self { base_url: COM_BASE_URL.into(), www_url: None, token_cache: None }
	}
}
impl Debug for OAuthClientOptions {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthClientOptions")
			.field("base_url", &self.base_url)
			.field("www_url", &self.www_url)
			.field("token_cache_set", &self.token_cache.is_some())
			.finish()
	}
}

/// State shared by every client variant.
pub(crate) struct OAuthCore<C>
where
	C: ?Sized + TokenHttpClient,
{
	client_id: String,
	client_secret: Option<TokenSecret>,
	www_url: String,
	host_name: String,
	dispatcher: Dispatcher<C>,
}
impl<C> OAuthCore<C>
where
	C: ?Sized + TokenHttpClient,
{
	pub(crate) fn new(
		client_id: impl Into<String>,
		client_secret: Option<TokenSecret>,
		options: &OAuthClientOptions,
		http_client: Arc<C>,
	) -> Result<Self> {
		let client_id = client_id.into();

		if client_id.is_empty() {
			return Err(ConfigError::MissingField { field: "client_id" }.into());
		}

		let base = parse_base(&options.base_url)?;
		let host = base
			.host_str()
			.ok_or_else(|| ConfigError::MissingHost { url: options.base_url.clone() })?;
		let host_name = match base.port() {
			Some(port) => format!("{host}:{port}"),
			None => host.to_owned(),
		};
		let www_url = match &options.www_url {
			Some(www_url) => www_url.clone(),
			None => options.base_url.replacen("api.", "www.", 1),
		};

		parse_base(&www_url)?;

		Ok(Self {
			client_id,
			client_secret,
			www_url: www_url.trim_end_matches('/').to_owned(),
			host_name,
			dispatcher: Dispatcher::new(&options.base_url, http_client),
		})
	}

	pub(crate) fn client_id(&self) -> &str {
		&self.client_id
	}

	/// `host[:port]` of the API base, used as the JWT audience.
	pub(crate) fn host_name(&self) -> &str {
		&self.host_name
	}

	pub(crate) fn client_secret(&self) -> Option<&str> {
		self.client_secret.as_ref().map(TokenSecret::expose)
	}

	/// Builds the authorization page URL; empty `redirect_uri` and `state` are omitted.
	pub(crate) fn authorize_url(
		&self,
		redirect_uri: &str,
		state: &str,
		workspace_id: Option<&str>,
		extra: &[(&str, &str)],
	) -> Result<Url> {
		let mut url = Url::parse(&format!("{}{}", self.www_url, authorize_path(workspace_id)))?;

		let mut pairs = url.query_pairs_mut();

		pairs.append_pair("response_type", "code");
		pairs.append_pair("client_id", &self.client_id);

		if !redirect_uri.is_empty() {
			pairs.append_pair("redirect_uri", redirect_uri);
		}
		if !state.is_empty() {
			pairs.append_pair("state", state);
		}

		pairs.extend_pairs(extra.iter());

		drop(pairs);

		Ok(url)
	}

	/// Posts `request` to its token path, optionally with a bearer credential.
	pub(crate) async fn exchange(
		&self,
		request: &TokenRequest,
		bearer: Option<&str>,
	) -> Result<OAuthToken> {
		let options = match bearer {
			Some(token) => RequestOptions::new().with_bearer(token),
			None => RequestOptions::new(),
		};
		let response: Dispatched<TokenEndpointResponse> =
			self.dispatcher.request(Method::POST, &request.path(), Some(request), options).await?;

		Ok(response.body.into_token(OffsetDateTime::now_utc(), response.log_id))
	}

	/// Redeems a refresh token; `with_secret` attaches the client secret as bearer.
	pub(crate) async fn refresh(&self, refresh_token: &str, with_secret: bool) -> Result<OAuthToken> {
		observe(FlowKind::Refresh, "refresh_token", async {
			if refresh_token.is_empty() {
				return Err(Error::from(ConfigError::MissingField { field: "refresh_token" }));
			}

			let mut request = TokenRequest::new(&self.client_id, GrantType::RefreshToken);

			request.refresh_token = Some(refresh_token.into());

			let secret = if with_secret { self.client_secret() } else { None };

			self.exchange(&request, secret).await
		})
		.await
	}

	pub(crate) fn dispatcher(&self) -> &Dispatcher<C> {
		&self.dispatcher
	}
}
impl<C> Debug for OAuthCore<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthCore")
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("www_url", &self.www_url)
			.field("host_name", &self.host_name)
			.field("dispatcher", &self.dispatcher)
			.finish()
	}
}

/// Runs `fut` inside a flow span and records attempt plus outcome counters.
pub(crate) async fn observe<F, T>(kind: FlowKind, stage: &'static str, fut: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	obs::record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = FlowSpan::new(kind, stage).instrument(fut).await;

	obs::record_flow_outcome(
		kind,
		if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure },
	);

	result
}

fn parse_base(url: &str) -> Result<Url, ConfigError> {
	Url::parse(url).map_err(|source| ConfigError::InvalidBaseUrl { url: url.to_owned(), source })
}

/// Any of the four OAuth clients.
pub enum OAuthClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Public client using authorization code + PKCE.
	Pkce(PkceOAuthClient<C>),
	/// Device authorization client.
	Device(DeviceOAuthClient<C>),
	/// Service client exchanging signed JWT assertions.
	Jwt(JwtOAuthClient<C>),
	/// Confidential web client holding a client secret.
	Web(WebOAuthClient<C>),
}
impl<C> OAuthClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// OAuth client identifier.
	pub fn client_id(&self) -> &str {
		match self {
			Self::Pkce(client) => client.client_id(),
			Self::Device(client) => client.client_id(),
			Self::Jwt(client) => client.client_id(),
			Self::Web(client) => client.client_id(),
		}
	}

	/// Variant label.
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Pkce(_) => "pkce",
			Self::Device(_) => "device",
			Self::Jwt(_) => "jwt",
			Self::Web(_) => "web",
		}
	}

	/// Acquires a token with the protocol of this variant.
	///
	/// Fails with [`ConfigError::GrantMismatch`] when `request` belongs to another variant.
	pub async fn acquire(&self, request: AccessTokenRequest) -> Result<OAuthToken> {
		match (self, request) {
			(Self::Pkce(client), AccessTokenRequest::Pkce(request)) =>
				client.get_access_token(&request).await,
			(Self::Device(client), AccessTokenRequest::Device(request)) =>
				client.get_access_token(request).await,
			(Self::Jwt(client), AccessTokenRequest::Jwt(request)) =>
				client.get_access_token(&request).await,
			(Self::Web(client), AccessTokenRequest::Web(request)) =>
				client.get_access_token(&request).await,
			(client, request) => Err(ConfigError::GrantMismatch {
				client: client.kind(),
				grant: request.kind(),
			}
			.into()),
		}
	}

	/// Redeems a refresh token; only [`OAuthClient::Web`] attaches its client secret.
	pub async fn refresh_token(&self, refresh_token: &str) -> Result<OAuthToken> {
		match self {
			Self::Pkce(client) => client.refresh_token(refresh_token).await,
			Self::Device(client) => client.refresh_token(refresh_token).await,
			Self::Jwt(client) => client.refresh_token(refresh_token).await,
			Self::Web(client) => client.refresh_token(refresh_token).await,
		}
	}
}
impl<C> Debug for OAuthClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Pkce(client) => f.debug_tuple("Pkce").field(client).finish(),
			Self::Device(client) => f.debug_tuple("Device").field(client).finish(),
			Self::Jwt(client) => f.debug_tuple("Jwt").field(client).finish(),
			Self::Web(client) => f.debug_tuple("Web").field(client).finish(),
		}
	}
}
impl<C> From<PkceOAuthClient<C>> for OAuthClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn from(value: PkceOAuthClient<C>) -> Self {
		Self::Pkce(value)
	}
}
impl<C> From<DeviceOAuthClient<C>> for OAuthClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn from(value: DeviceOAuthClient<C>) -> Self {
		Self::Device(value)
	}
}
impl<C> From<JwtOAuthClient<C>> for OAuthClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn from(value: JwtOAuthClient<C>) -> Self {
		Self::Jwt(value)
	}
}
impl<C> From<WebOAuthClient<C>> for OAuthClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn from(value: WebOAuthClient<C>) -> Self {
		Self::Web(value)
	}
}

/// Per-variant token request accepted by [`OAuthClient::acquire`].
#[derive(Clone, Debug)]
pub enum AccessTokenRequest {
	/// Authorization code plus PKCE verifier.
	Pkce(PkceAccessTokenRequest),
	/// Device code, optionally polled.
	Device(DeviceAccessTokenRequest),
	/// JWT exchange options.
	Jwt(JwtAccessTokenRequest),
	/// Authorization code for a confidential client.
	Web(WebAccessTokenRequest),
}
impl AccessTokenRequest {
	/// Variant label.
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Pkce(_) => "pkce",
			Self::Device(_) => "device",
			Self::Jwt(_) => "jwt",
			Self::Web(_) => "web",
		}
	}
}
