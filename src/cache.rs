//! Token cache contract and the built-in in-memory implementation.

pub mod memory;

pub use memory::MemoryTokenCache;

// self
use crate::{
	_prelude::*,
	token::{TOKEN_EXPIRY_BUFFER, TokenResponse},
};

/// Concurrent key → token store consulted by the JWT flow.
///
/// Implementations must be safe to share across tasks without external locking and must
/// treat expired entries as absent on read.
pub trait TokenCache
where
	Self: Send + Sync,
{
	/// Returns the token stored under `key` unless it has expired.
	fn get(&self, key: &str) -> Option<TokenResponse>;

	/// Stores or replaces the token for `key` and schedules its eviction.
	fn set(&self, key: &str, token: TokenResponse);

	/// Removes the entry for `key`, if any.
	fn delete(&self, key: &str);
}

/// Builds the composite cache key for a JWT exchange.
///
/// Each component is optional except the client identifier; absent components keep their slot
/// so that, e.g., an account id can never be confused with an enterprise id.
pub fn cache_key(
	client_id: &str,
	scope_json: Option<&str>,
	account_id: Option<i64>,
	enterprise_id: Option<&str>,
	session_name: Option<&str>,
) -> String {
	let account = account_id.map(|id| id.to_string()).unwrap_or_default();

	[
		client_id,
		scope_json.unwrap_or_default(),
		&account,
		enterprise_id.unwrap_or_default(),
		session_name.unwrap_or_default(),
	]
	.join(":")
}

/// Computes how long after `now` an entry for `token` should be evicted.
///
/// The buffer is [`TOKEN_EXPIRY_BUFFER`] unless the remaining lifetime is shorter than ten
/// buffers, in which case a tenth of the remaining lifetime is used. The delay never drops below
/// one second. Returns [`None`] when the token has no lifetime left.
pub fn eviction_delay(token: &TokenResponse, now: OffsetDateTime) -> Option<Duration> {
	const MIN_DELAY: Duration = Duration::SECOND;

	let remaining = token.remaining_at(now);

	if !remaining.is_positive() {
		return None;
	}

	let buffer =
		if remaining < TOKEN_EXPIRY_BUFFER * 10 { remaining / 10 } else { TOKEN_EXPIRY_BUFFER };

	Some((remaining - buffer).max(MIN_DELAY))
}
