//! Normalized OAuth token values shared by every flow, the token cache, and token sources.
//!
//! Every flow funnels the wire `expires_in` through [`normalize_expires_in`], so a token
//! always carries the number of seconds it stays valid counted from its `generated_at`
//! instant, regardless of whether the endpoint answered with a relative duration or an
//! absolute Unix timestamp.

pub mod secret;

pub use secret::TokenSecret;

// self
use crate::_prelude::*;

/// Safety margin subtracted from a token's lifetime before it is treated as expired.
pub const TOKEN_EXPIRY_BUFFER: Duration = Duration::seconds(30);

/// Wire `expires_in` values at or above this threshold are absolute Unix timestamps.
const ABSOLUTE_EXPIRY_THRESHOLD: i64 = 1_000_000_000;

/// Converts a wire `expires_in` into seconds remaining from `generated_at`.
pub fn normalize_expires_in(raw: i64, generated_at: OffsetDateTime) -> i64 {
	if raw >= ABSOLUTE_EXPIRY_THRESHOLD {
		(raw - generated_at.unix_timestamp()).max(0)
	} else {
		raw.max(0)
	}
}

/// Token produced by one of the OAuth client variants.
#[derive(Clone)]
pub struct OAuthToken {
	/// Bearer access token.
	pub access_token: TokenSecret,
	/// Seconds the access token stays valid, counted from [`OAuthToken::generated_at`].
	pub expires_in: i64,
	/// Refresh token, when the flow issues one.
	pub refresh_token: Option<TokenSecret>,
	/// Instant the token was obtained.
	pub generated_at: OffsetDateTime,
	/// Remote log identifier of the exchange that produced the token.
	pub log_id: Option<String>,
}
impl OAuthToken {
	/// Absolute expiry instant.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.generated_at + Duration::seconds(self.expires_in)
	}
}
impl Debug for OAuthToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthToken")
			.field("access_token", &"<redacted>")
			.field("expires_in", &self.expires_in)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("generated_at", &self.generated_at)
			.field("log_id", &self.log_id)
			.finish()
	}
}
impl From<TokenResponse> for OAuthToken {
	fn from(value: TokenResponse) -> Self {
		Self {
			access_token: value.access_token,
			expires_in: value.expires_in,
			refresh_token: value.refresh_token,
			generated_at: value.generated_at,
			log_id: None,
		}
	}
}

/// Cache representation of a token plus the instant it was generated.
#[derive(Clone)]
pub struct TokenResponse {
	/// Token type label, `Bearer` for every supported flow.
	pub token_type: String,
	/// Bearer access token.
	pub access_token: TokenSecret,
	/// Refresh token, when the flow issues one.
	pub refresh_token: Option<TokenSecret>,
	/// Seconds the access token stays valid, counted from [`TokenResponse::generated_at`].
	pub expires_in: i64,
	/// Instant the token was obtained.
	pub generated_at: OffsetDateTime,
}
impl TokenResponse {
	/// Token type stamped on responses converted from [`OAuthToken`].
	pub const BEARER: &'static str = "Bearer";

	/// Absolute expiry instant.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.generated_at + Duration::seconds(self.expires_in)
	}

	/// Time left before the absolute expiry, clamped at zero.
	pub fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		let remaining = self.expires_at() - now;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}

	/// Returns `true` once `now` is within [`TOKEN_EXPIRY_BUFFER`] of the expiry, or when the
	/// access token is absent.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		if self.access_token.is_empty() {
			return true;
		}

		now + TOKEN_EXPIRY_BUFFER >= self.expires_at()
	}

	/// Evaluates [`TokenResponse::is_expired_at`] against the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}
}
impl Debug for TokenResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenResponse")
			.field("token_type", &self.token_type)
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_in", &self.expires_in)
			.field("generated_at", &self.generated_at)
			.finish()
	}
}
impl From<&OAuthToken> for TokenResponse {
	fn from(value: &OAuthToken) -> Self {
		Self {
			token_type: Self::BEARER.into(),
			access_token: value.access_token.clone(),
			refresh_token: value.refresh_token.clone(),
			expires_in: value.expires_in,
			generated_at: value.generated_at,
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn response(access: &str, expires_in: i64, generated_at: OffsetDateTime) -> TokenResponse {
		TokenResponse {
			token_type: TokenResponse::BEARER.into(),
			access_token: TokenSecret::new(access),
			refresh_token: None,
			expires_in,
			generated_at,
		}
	}

	#[test]
	fn expires_in_accepts_relative_and_absolute_values() {
		let generated = macros::datetime!(2025-01-01 00:00 UTC);

		assert_eq!(normalize_expires_in(900, generated), 900);
		assert_eq!(normalize_expires_in(generated.unix_timestamp() + 900, generated), 900);
		assert_eq!(normalize_expires_in(generated.unix_timestamp() - 5, generated), 0);
		assert_eq!(normalize_expires_in(-3, generated), 0);
	}

	#[test]
	fn expiry_applies_buffer() {
		let generated = macros::datetime!(2025-01-01 00:00 UTC);
		let token = response("access", 900, generated);

		assert!(!token.is_expired_at(macros::datetime!(2025-01-01 00:14:29 UTC)));
		assert!(token.is_expired_at(macros::datetime!(2025-01-01 00:14:30 UTC)));
		assert_eq!(token.remaining_at(macros::datetime!(2025-01-01 00:20 UTC)), Duration::ZERO);
	}

	#[test]
	fn missing_access_token_is_expired() {
		let token = response("", 3600, OffsetDateTime::now_utc());

		assert!(token.is_expired());
	}
}
