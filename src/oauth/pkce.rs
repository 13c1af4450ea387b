//! Public client flow: authorization code with a PKCE verifier.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
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
	token::OAuthToken,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

const VERIFIER_BYTES: usize = 16;

/// PKCE challenge derivation methods.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CodeChallengeMethod {
	/// Challenge equals the verifier.
	Plain,
	/// Challenge is the unpadded base64url SHA-256 of the verifier.
	#[default]
	S256,
}
impl CodeChallengeMethod {
	/// Wire identifier of the method.
	pub const fn as_str(self) -> &'static str {
		match self {
			CodeChallengeMethod::Plain => "plain",
			CodeChallengeMethod::S256 => "S256",
		}
	}

	/// Derives the challenge sent with the authorization URL.
	pub fn challenge(self, verifier: &str) -> String {
		match self {
			CodeChallengeMethod::Plain => verifier.to_owned(),
			CodeChallengeMethod::S256 => URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes())),
		}
	}
}
impl Display for CodeChallengeMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Input of [`PkceOAuthClient::get_oauth_url`].
#[derive(Clone, Debug, Default)]
pub struct PkceOAuthUrlRequest {
	/// Redirect URI registered for the app; required.
	pub redirect_uri: String,
	/// Opaque state echoed back on redirect.
	pub state: String,
	/// Challenge method, `S256` by default.
	pub method: CodeChallengeMethod,
	/// Workspace the authorization page is scoped to.
	pub workspace_id: Option<String>,
}
impl PkceOAuthUrlRequest {
	/// Creates a request with the default challenge method.
	pub fn new(redirect_uri: impl Into<String>, state: impl Into<String>) -> Self {
		Self { redirect_uri: redirect_uri.into(), state: state.into(), ..Default::default() }
	}

	/// Overrides the challenge method.
	pub fn with_method(mut self, method: CodeChallengeMethod) -> Self {
		self.method = method;

		self
	}

	/// Scopes the authorization page to a workspace.
	pub fn with_workspace_id(mut self, workspace_id: impl Into<String>) -> Self {
		self.workspace_id = Some(workspace_id.into());

		self
	}
}

/// Authorization URL plus the verifier the caller must keep until the code comes back.
#[derive(Clone)]
pub struct PkceOAuthUrl {
	/// Secret verifier to send with [`PkceAccessTokenRequest`].
	pub code_verifier: String,
	/// Page the end user should open.
	pub authorization_url: Url,
}
impl Debug for PkceOAuthUrl {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PkceOAuthUrl")
			.field("code_verifier", &"<redacted>")
			.field("authorization_url", &self.authorization_url.as_str())
			.finish()
	}
}

/// Code redemption input for [`PkceOAuthClient::get_access_token`].
#[derive(Clone, Debug)]
pub struct PkceAccessTokenRequest {
	/// Authorization code from the redirect.
	pub code: String,
	/// Redirect URI used for the authorization request.
	pub redirect_uri: String,
	/// Verifier returned by [`PkceOAuthClient::get_oauth_url`].
	pub code_verifier: String,
}
impl PkceAccessTokenRequest {
	/// Creates the redemption input.
	pub fn new(
		code: impl Into<String>,
		redirect_uri: impl Into<String>,
		code_verifier: impl Into<String>,
	) -> Self {
		Self {
			code: code.into(),
			redirect_uri: redirect_uri.into(),
			code_verifier: code_verifier.into(),
		}
	}
}

/// OAuth client for apps that cannot keep a secret.
pub struct PkceOAuthClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	core: OAuthCore<C>,
}
impl<C> PkceOAuthClient<C>
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

	/// Generates a fresh verifier and the authorization URL carrying its challenge.
	pub fn get_oauth_url(&self, request: &PkceOAuthUrlRequest) -> Result<PkceOAuthUrl> {
		if request.redirect_uri.is_empty() {
			return Err(ConfigError::MissingField { field: "redirect_uri" }.into());
		}

		let code_verifier = hex::encode(rand::random::<[u8; VERIFIER_BYTES]>());
		let challenge = request.method.challenge(&code_verifier);
		let authorization_url = self.core.authorize_url(
			&request.redirect_uri,
			&request.state,
			request.workspace_id.as_deref(),
			&[("code_challenge", challenge.as_str()), ("code_challenge_method", request.method.as_str())],
		)?;

		Ok(PkceOAuthUrl { code_verifier, authorization_url })
	}

	/// Redeems an authorization code; no client secret is sent.
	pub async fn get_access_token(&self, request: &PkceAccessTokenRequest) -> Result<OAuthToken> {
		observe(FlowKind::Pkce, "get_access_token", async {
			let mut body = TokenRequest::new(self.core.client_id(), GrantType::AuthorizationCode);

			body.code = Some(request.code.clone());
			body.redirect_uri = Some(request.redirect_uri.clone());
			body.code_verifier = Some(request.code_verifier.clone());

			self.core.exchange(&body, None).await
		})
		.await
	}

	/// Redeems a refresh token without a client secret.
	pub async fn refresh_token(&self, refresh_token: &str) -> Result<OAuthToken> {
		self.core.refresh(refresh_token, false).await
	}
}
#[cfg(feature = "reqwest")]
impl PkceOAuthClient<ReqwestHttpClient> {
	/// Creates a client backed by a default [`ReqwestHttpClient`].
	pub fn new(client_id: impl Into<String>, options: OAuthClientOptions) -> Result<Self> {
		Self::with_http_client(client_id, options, Arc::new(ReqwestHttpClient::new()?))
	}
}
impl<C> Debug for PkceOAuthClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PkceOAuthClient").field("core", &self.core).finish()
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	fn client() -> PkceOAuthClient<ReqwestHttpClient> {
		PkceOAuthClient::with_http_client(
			"pkce-client",
			OAuthClientOptions::new().with_base_url("https://api.coze.cn"),
			Arc::new(test_reqwest_http_client()),
		)
		.expect("PKCE client should build.")
	}

	fn query(url: &Url, key: &str) -> Option<String> {
		url.query_pairs().find(|(name, _)| name == key).map(|(_, value)| value.into_owned())
	}

	#[test]
	fn s256_challenge_matches_rfc_7636_vector() {
		assert_eq!(
			CodeChallengeMethod::S256.challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
			"E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
		);
		assert_eq!(CodeChallengeMethod::Plain.challenge("abc"), "abc");
	}

	#[test]
	fn oauth_url_carries_challenge_of_fresh_verifier() {
		let client = client();
		let first = client
			.get_oauth_url(&PkceOAuthUrlRequest::new("https://app/cb", "st"))
			.expect("Authorization URL should build.");
		let second = client
			.get_oauth_url(&PkceOAuthUrlRequest::new("https://app/cb", "st"))
			.expect("Authorization URL should build.");
		let url = &first.authorization_url;

		assert_eq!(first.code_verifier.len(), 32);
		assert!(first.code_verifier.bytes().all(|byte| byte.is_ascii_hexdigit()));
		assert_ne!(first.code_verifier, second.code_verifier);
		assert_eq!(url.host_str(), Some("www.coze.cn"));
		assert_eq!(url.path(), "/api/permission/oauth2/authorize");
		assert_eq!(query(url, "response_type").as_deref(), Some("code"));
		assert_eq!(query(url, "client_id").as_deref(), Some("pkce-client"));
		assert_eq!(query(url, "redirect_uri").as_deref(), Some("https://app/cb"));
		assert_eq!(query(url, "state").as_deref(), Some("st"));
		assert_eq!(query(url, "code_challenge_method").as_deref(), Some("S256"));
		assert_eq!(
			query(url, "code_challenge"),
			Some(CodeChallengeMethod::S256.challenge(&first.code_verifier))
		);
	}

	#[test]
	fn workspace_and_plain_method_are_honored() {
		let url = client()
			.get_oauth_url(
				&PkceOAuthUrlRequest::new("https://app/cb", "")
					.with_method(CodeChallengeMethod::Plain)
					.with_workspace_id("ws-1"),
			)
			.expect("Authorization URL should build.");

		assert_eq!(url.authorization_url.path(), "/api/permission/oauth2/workspace_id/ws-1/authorize");
		assert_eq!(query(&url.authorization_url, "state"), None);
		assert_eq!(query(&url.authorization_url, "code_challenge"), Some(url.code_verifier.clone()));
	}

	#[test]
	fn empty_redirect_uri_is_rejected() {
		let err = client()
			.get_oauth_url(&PkceOAuthUrlRequest::new("", "st"))
			.expect_err("Empty redirect URI should fail.");

		assert!(matches!(err, Error::Config(ConfigError::MissingField { field: "redirect_uri" })));
	}
}
