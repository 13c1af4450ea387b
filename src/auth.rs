//! Token sources handing bearer tokens to API callers.

// self
use crate::{
	_prelude::*,
	http::TokenHttpClient,
	obs,
	oauth::{DEFAULT_JWT_TTL, JwtAccessTokenRequest, JwtOAuthClient},
	token::TokenSecret,
};

/// Seconds before expiry at which a token of lifetime `ttl` seconds is replaced.
pub fn refresh_before(ttl: i64) -> i64 {
	match ttl {
		600.. => 30,
		60.. => 10,
		30.. => 5,
		_ => 0,
	}
}

/// Source of the bearer token attached to API calls.
pub enum Auth<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Long-lived token supplied by the caller.
	Fixed(TokenSecret),
	/// Token minted by a JWT client and replaced ahead of expiry.
	Jwt(JwtAuth<C>),
}
impl<C> Auth<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Wraps a fixed access token.
	pub fn fixed(token: impl Into<String>) -> Self {
		Self::Fixed(TokenSecret::new(token))
	}

	/// Mints tokens through `client` with the given request options.
	pub fn jwt(client: Arc<JwtOAuthClient<C>>, request: JwtAccessTokenRequest) -> Self {
		Self::Jwt(JwtAuth::new(client, request))
	}

	/// Returns a usable access token.
	pub async fn token(&self) -> Result<TokenSecret> {
		match self {
			Self::Fixed(token) => Ok(token.clone()),
			Self::Jwt(auth) => auth.token().await,
		}
	}
}
impl<C> Debug for Auth<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Fixed(token) => f.debug_tuple("Fixed").field(token).finish(),
			Self::Jwt(auth) => f.debug_tuple("Jwt").field(auth).finish(),
		}
	}
}

struct HeldToken {
	token: TokenSecret,
	refresh_at: OffsetDateTime,
}

/// Refreshing JWT token source.
///
/// The held token is reused until `expires_at - refresh_before(ttl)`. Concurrent callers that
/// find it stale wait on one in-flight exchange instead of each starting their own.
pub struct JwtAuth<C>
where
	C: ?Sized + TokenHttpClient,
{
	client: Arc<JwtOAuthClient<C>>,
	request: JwtAccessTokenRequest,
	refresh_before: Duration,
	held: AsyncMutex<Option<HeldToken>>,
}
impl<C> JwtAuth<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates a source; a missing or non-positive ttl becomes [`DEFAULT_JWT_TTL`].
	pub fn new(client: Arc<JwtOAuthClient<C>>, mut request: JwtAccessTokenRequest) -> Self {
		let ttl = request.ttl.filter(|ttl| *ttl > 0).unwrap_or(DEFAULT_JWT_TTL);

		request.ttl = Some(ttl);

		Self {
			client,
			request,
			refresh_before: Duration::seconds(refresh_before(ttl)),
			held: AsyncMutex::new(None),
		}
	}

	/// Returns the held token or exchanges a new one once the refresh instant has passed.
	pub async fn token(&self) -> Result<TokenSecret> {
		let mut held = self.held.lock().await;

		let now = OffsetDateTime::now_utc();

		if let Some(current) = held.as_ref().filter(|entry| now <= entry.refresh_at) {
			return Ok(current.token.clone());
		}

		let fresh = self.client.get_access_token(&self.request).await?;
		let refresh_at = fresh.expires_at() - self.refresh_before;

		obs::record_token_refresh(self.client.client_id(), refresh_at);

		*held = Some(HeldToken { token: fresh.access_token.clone(), refresh_at });

		Ok(fresh.access_token)
	}
}
impl<C> Debug for JwtAuth<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("JwtAuth")
			.field("client_id", &self.client.client_id())
			.field("request", &self.request)
			.field("refresh_before", &self.refresh_before)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn refresh_margin_shrinks_with_lifetime() {
		assert_eq!(refresh_before(900), 30);
		assert_eq!(refresh_before(600), 30);
		assert_eq!(refresh_before(599), 10);
		assert_eq!(refresh_before(60), 10);
		assert_eq!(refresh_before(30), 5);
		assert_eq!(refresh_before(29), 0);
	}

	#[cfg(feature = "reqwest")]
	#[tokio::test]
	async fn fixed_source_returns_its_token() {
		let auth = Auth::<crate::http::ReqwestHttpClient>::fixed("pat_fixed");
		let token = auth.token().await.expect("Fixed token should be returned.");

		assert_eq!(token.expose(), "pat_fixed");
		assert_eq!(format!("{auth:?}"), "Fixed(TokenSecret(\"<redacted>\"))");
	}
}
