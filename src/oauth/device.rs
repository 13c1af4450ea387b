//! Device authorization flow with optional polling.

// crates.io
use oauth2::http::Method;
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	dispatch::{ApiResponse, BaseResponse, Dispatched, RequestOptions},
	error::{AuthError, AuthErrorKind},
	http::TokenHttpClient,
	obs::{self, FlowKind},
	oauth::{
		OAuthClientOptions, OAuthCore,
		endpoint::{GrantType, TokenRequest, device_code_path},
		observe,
	},
	token::OAuthToken,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Starting wait between two polls.
pub const DEFAULT_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);
/// Added to the wait whenever the server answers `slow_down`.
pub const SLOW_DOWN_STEP: std::time::Duration = std::time::Duration::from_secs(5);
/// Upper bound of the wait between two polls.
pub const MAX_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

/// Device and user code pair issued by the device endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct DeviceCode {
	#[serde(flatten)]
	base: BaseResponse,
	/// Code the client redeems once the user approves.
	pub device_code: String,
	/// Code the user types on the verification page.
	pub user_code: String,
	/// Verification page without parameters.
	pub verification_uri: String,
	/// Verification page with the user code pre-filled.
	#[serde(default)]
	pub verification_url: String,
	/// Seconds until the codes expire.
	#[serde(default)]
	pub expires_in: i64,
	/// Suggested seconds between polls.
	#[serde(default)]
	pub interval: i64,
	/// Remote log identifier of the request.
	#[serde(skip)]
	pub log_id: Option<String>,
}
impl ApiResponse for DeviceCode {
	fn status(&self) -> Option<&BaseResponse> {
		Some(&self.base)
	}
}

#[derive(Serialize)]
struct DeviceCodeRequest<'a> {
	client_id: &'a str,
}

/// Device code redemption input for [`DeviceOAuthClient::get_access_token`].
#[derive(Clone, Debug)]
pub struct DeviceAccessTokenRequest {
	/// Device code from [`DeviceOAuthClient::get_device_code`].
	pub device_code: String,
	/// Keep polling while the authorization is pending.
	pub poll: bool,
	/// Starting wait between polls.
	pub interval: std::time::Duration,
	/// Stops the poll loop with [`Error::Cancelled`] before its next wait.
	pub cancellation: Option<CancellationToken>,
}
impl DeviceAccessTokenRequest {
	/// Single-attempt request for `device_code`.
	pub fn new(device_code: impl Into<String>) -> Self {
		Self {
			device_code: device_code.into(),
			poll: false,
			interval: DEFAULT_POLL_INTERVAL,
			cancellation: None,
		}
	}

	/// Enables or disables polling.
	pub fn with_poll(mut self, poll: bool) -> Self {
		self.poll = poll;

		self
	}

	/// Overrides the starting wait.
	pub fn with_interval(mut self, interval: std::time::Duration) -> Self {
		self.interval = interval;

		self
	}

	/// Attaches a cancellation token observed by the poll loop.
	pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
		self.cancellation = Some(token);

		self
	}
}

/// OAuth client for input-constrained devices.
pub struct DeviceOAuthClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	core: OAuthCore<C>,
}
impl<C> DeviceOAuthClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates a client over a caller-provided transport.
	pub fn with_http_client(
		client_id: impl Into<String>,
		options: OAuthClientOptions,
		http_client: Arc<C>,
	) -> Result<Self> {
		Ok(Self { core: OAuthCore::new(client_id, None, &options, http_client)? })
	}

	/// OAuth client identifier.
	pub fn client_id(&self) -> &str {
		self.core.client_id()
	}

	/// Requests a device and user code pair, optionally scoped to a workspace.
	pub async fn get_device_code(&self, workspace_id: Option<&str>) -> Result<DeviceCode> {
		observe(FlowKind::Device, "get_device_code", async {
			let body = DeviceCodeRequest { client_id: self.core.client_id() };
			let Dispatched { body: mut code, log_id, .. } = self
				.core
				.dispatcher()
				.request::<_, DeviceCode>(
					Method::POST,
					&device_code_path(workspace_id),
					Some(&body),
					RequestOptions::new(),
				)
				.await?;

			code.verification_url = format!("{}?user_code={}", code.verification_uri, code.user_code);
			code.log_id = log_id;

			Ok(code)
		})
		.await
	}

	/// Redeems a device code.
	///
	/// Without polling a single exchange is made. With polling, `authorization_pending` keeps the
	/// current wait, `slow_down` widens it by [`SLOW_DOWN_STEP`] up to [`MAX_POLL_INTERVAL`], and
	/// every other failure ends the loop.
	pub async fn get_access_token(&self, request: DeviceAccessTokenRequest) -> Result<OAuthToken> {
		observe(FlowKind::Device, "get_access_token", async move {
			let mut body = TokenRequest::new(self.core.client_id(), GrantType::DeviceCode);

			body.device_code = Some(request.device_code.clone());

			if !request.poll {
				return self.core.exchange(&body, None).await;
			}

			let mut interval = request.interval;

			loop {
				let err = match self.core.exchange(&body, None).await {
					Ok(token) => return Ok(token),
					Err(err) => err,
				};
				let code = match err.as_auth_error().map(AuthError::kind) {
					Some(AuthErrorKind::AuthorizationPending) => "authorization_pending",
					Some(AuthErrorKind::SlowDown) => {
						interval = next_interval(interval);

						"slow_down"
					},
					_ => return Err(err),
				};

				obs::record_poll_wait(code, interval);
				wait(interval, request.cancellation.as_ref()).await?;
			}
		})
		.await
	}

	/// Redeems a refresh token without a client secret.
	pub async fn refresh_token(&self, refresh_token: &str) -> Result<OAuthToken> {
		self.core.refresh(refresh_token, false).await
	}
}
#[cfg(feature = "reqwest")]
impl DeviceOAuthClient<ReqwestHttpClient> {
	/// Creates a client backed by a default [`ReqwestHttpClient`].
	pub fn new(client_id: impl Into<String>, options: OAuthClientOptions) -> Result<Self> {
		Self::with_http_client(client_id, options, Arc::new(ReqwestHttpClient::new()?))
	}
}
impl<C> Debug for DeviceOAuthClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DeviceOAuthClient").field("core", &self.core).finish()
	}
}

fn next_interval(interval: std::time::Duration) -> std::time::Duration {
	(interval + SLOW_DOWN_STEP).min(MAX_POLL_INTERVAL)
}

async fn wait(interval: std::time::Duration, cancellation: Option<&CancellationToken>) -> Result<()> {
	let Some(token) = cancellation else {
		tokio::time::sleep(interval).await;

		return Ok(());
	};

	if token.is_cancelled() {
		return Err(Error::Cancelled);
	}

	tokio::select! {
		_ = token.cancelled() => Err(Error::Cancelled),
		_ = tokio::time::sleep(interval) => Ok(()),
	}
}
