//! Thread-safe in-memory [`TokenCache`] with read-time expiry and an optional background sweeper.

// std
use std::sync::Weak;
// crates.io
use tokio::runtime::Handle;
// self
use crate::{
	_prelude::*,
	cache::{TokenCache, eviction_delay},
	obs,
	token::TokenResponse,
};

/// Default period between two sweeps of [`MemoryTokenCache::with_sweeper`].
pub const DEFAULT_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);

type EntryMap = RwLock<HashMap<String, Entry>>;

#[derive(Clone, Debug)]
struct Entry {
	token: TokenResponse,
	evict_at: OffsetDateTime,
}
impl Entry {
	fn is_evictable_at(&self, now: OffsetDateTime) -> bool {
		now >= self.evict_at
	}

	fn is_stale_at(&self, now: OffsetDateTime) -> bool {
		self.is_evictable_at(now) || self.token.is_expired_at(now)
	}
}

/// In-process token cache shared by clones.
///
/// Entries become invisible once their eviction instant passes or the token itself counts as
/// expired. Evictable entries are deleted in three places: on read, on every `set`, and by one
/// background sweeper task that ends on its own once every clone is dropped.
#[derive(Clone, Debug)]
pub struct MemoryTokenCache(Arc<EntryMap>);
impl MemoryTokenCache {
	/// Creates an empty cache swept every [`DEFAULT_SWEEP_INTERVAL`].
	///
	/// See [`MemoryTokenCache::with_sweeper`] for behavior outside a Tokio runtime.
	pub fn new() -> Self {
		Self::with_sweeper(DEFAULT_SWEEP_INTERVAL)
	}

	/// Creates an empty cache and spawns a sweeper on the current Tokio runtime.
	///
	/// Outside a runtime no task is spawned; evictable entries are then only deleted by `get`
	/// and `set`.
	pub fn with_sweeper(interval: std::time::Duration) -> Self {
		let cache = Self::unswept();

		match Handle::try_current() {
			Ok(handle) => {
				handle.spawn(Self::sweep_loop(Arc::downgrade(&cache.0), interval));
			},
			Err(_) => {
				#[cfg(feature = "tracing")]
				tracing::warn!("no Tokio runtime available; token cache sweeps only on get and set");
			},
		}

		cache
	}

	fn unswept() -> Self {
		Self(Arc::default())
	}

	/// Number of stored entries, including ones awaiting eviction.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no entries are stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Drops every entry whose eviction instant is at or before `now` and returns the count.
	pub fn purge_expired_at(&self, now: OffsetDateTime) -> usize {
		Self::purge(&self.0, now)
	}

	fn purge(map: &EntryMap, now: OffsetDateTime) -> usize {
		let mut guard = map.write();
		let before = guard.len();

		guard.retain(|_, entry| !entry.is_evictable_at(now));

		before - guard.len()
	}

	async fn sweep_loop(map: Weak<EntryMap>, interval: std::time::Duration) {
		let mut ticker = tokio::time::interval(interval);

		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

		loop {
			ticker.tick().await;

			let Some(map) = map.upgrade() else { break };

			obs::record_sweep(Self::purge(&map, OffsetDateTime::now_utc()));
		}
	}

	fn get_at(&self, key: &str, now: OffsetDateTime) -> Option<TokenResponse> {
		{
			let guard = self.0.read();
			let entry = guard.get(key)?;

			if !entry.is_stale_at(now) {
				return Some(entry.token.clone());
			}
		}

		let mut guard = self.0.write();

		// Re-check under the write lock; a concurrent `set` may have replaced the entry.
		if guard.get(key).is_some_and(|entry| entry.is_stale_at(now)) {
			guard.remove(key);
		}

		None
	}

	fn set_at(&self, key: &str, token: TokenResponse, now: OffsetDateTime) {
		let mut guard = self.0.write();

		guard.retain(|_, entry| !entry.is_evictable_at(now));

		match eviction_delay(&token, now) {
			Some(delay) => {
				guard.insert(key.to_owned(), Entry { token, evict_at: now + delay });
			},
			None => {
				guard.remove(key);
			},
		}
	}
}
impl Default for MemoryTokenCache {
	fn default() -> Self {
		Self::new()
	}
}
impl TokenCache for MemoryTokenCache {
	fn get(&self, key: &str) -> Option<TokenResponse> {
		let token = self.get_at(key, OffsetDateTime::now_utc());

		obs::record_cache_lookup(key, token.is_some());

		token
	}

	fn set(&self, key: &str, token: TokenResponse) {
		self.set_at(key, token, OffsetDateTime::now_utc());
	}

	fn delete(&self, key: &str) {
		self.0.write().remove(key);
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::token::TokenSecret;

	fn token(access: &str, expires_in: i64, generated_at: OffsetDateTime) -> TokenResponse {
		TokenResponse {
			token_type: TokenResponse::BEARER.into(),
			access_token: TokenSecret::new(access),
			refresh_token: None,
			expires_in,
			generated_at,
		}
	}

	#[test]
	fn entries_disappear_at_eviction_instant() {
		let cache = MemoryTokenCache::new();
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		cache.set_at("k", token("a", 3600, now), now);

		assert!(cache.get_at("k", macros::datetime!(2025-01-01 00:59:29 UTC)).is_some());
		assert!(cache.get_at("k", macros::datetime!(2025-01-01 00:59:30 UTC)).is_none());
		assert!(cache.is_empty(), "Expired entry should be removed on read.");
	}

	#[test]
	fn short_lived_tokens_respect_expiry_buffer_on_read() {
		let cache = MemoryTokenCache::new();
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		// Evicted at 90s by the sweeper, but already within the 30s expiry buffer at 70s.
		cache.set_at("k", token("a", 100, now), now);

		assert!(cache.get_at("k", now + Duration::seconds(69)).is_some());
		assert!(cache.get_at("k", now + Duration::seconds(70)).is_none());
		assert!(cache.is_empty());
	}

	#[test]
	fn set_replaces_existing_entry() {
		let cache = MemoryTokenCache::new();
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		cache.set_at("k", token("first", 3600, now), now);
		cache.set_at("k", token("second", 3600, now), now);

		let cached = cache.get_at("k", now).expect("Replaced entry should be readable.");

		assert_eq!(cached.access_token.expose(), "second");
		assert_eq!(cache.len(), 1);
	}

	#[test]
	fn already_expired_tokens_are_not_stored() {
		let cache = MemoryTokenCache::new();
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		cache.set_at("k", token("a", 3600, now), now);
		cache.set_at("k", token("b", 0, now), now);

		assert!(cache.is_empty());
	}

	#[test]
	fn delete_and_purge_remove_entries() {
		let cache = MemoryTokenCache::new();
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		cache.set_at("short", token("a", 10, now), now);
		cache.set_at("long", token("b", 3600, now), now);
		cache.set_at("gone", token("c", 3600, now), now);
		cache.delete("gone");

		assert_eq!(cache.purge_expired_at(now + Duration::minutes(1)), 1);
		assert_eq!(cache.len(), 1);
		assert!(cache.get_at("long", now).is_some());
	}

	#[test]
	fn set_drops_evictable_entries_under_other_keys() {
		let cache = MemoryTokenCache::new();
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		cache.set_at("session-1", token("a", 10, now), now);
		cache.set_at("session-2", token("b", 3600, now), now + Duration::minutes(1));

		assert_eq!(cache.len(), 1, "Stale entry should go without ever being read.");
		assert!(cache.get_at("session-2", now + Duration::minutes(1)).is_some());
	}

	#[test]
	fn clones_share_entries() {
		let cache = MemoryTokenCache::new();
		let clone = cache.clone();

		clone.set("k", token("a", 3600, OffsetDateTime::now_utc()));

		assert!(cache.get("k").is_some());
	}

	#[test]
	fn sweeper_is_skipped_outside_runtime() {
		let cache = MemoryTokenCache::with_sweeper(DEFAULT_SWEEP_INTERVAL);

		assert!(cache.is_empty());
	}

	#[tokio::test]
	async fn sweeper_evicts_without_reads() {
		let cache = MemoryTokenCache::with_sweeper(std::time::Duration::from_millis(50));

		cache.set("k", token("a", 1, OffsetDateTime::now_utc()));

		assert_eq!(cache.len(), 1);

		tokio::time::sleep(std::time::Duration::from_millis(1_500)).await;

		assert_eq!(cache.len(), 0, "Sweeper should evict the entry without any read.");
	}

	#[tokio::test]
	async fn default_cache_evicts_without_reads() {
		let cache = MemoryTokenCache::default();

		cache.set("k", token("a", 1, OffsetDateTime::now_utc()));

		assert_eq!(cache.len(), 1);

		tokio::time::sleep(std::time::Duration::from_millis(2_500)).await;

		assert_eq!(cache.len(), 0, "Default cache should sweep expired entries on its own.");
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_access_keeps_entries_consistent() {
		let cache = MemoryTokenCache::new();
		let tasks = (0..8)
			.map(|task| {
				let cache = cache.clone();

				tokio::spawn(async move {
					for round in 0..200 {
						let own = format!("task-{task}");
						let access = format!("{task}-{round}");

						cache.set(&own, token(&access, 3600, OffsetDateTime::now_utc()));

						let read = cache.get(&own).expect("Own entry should be readable.");

						assert_eq!(read.access_token.expose(), access);

						cache.set("shared", token("shared", 3600, OffsetDateTime::now_utc()));

						if round % 3 == 0 {
							cache.delete("shared");
						}
						if round % 2 == 0 {
							cache.delete(&own);

							assert!(cache.get(&own).is_none());
						}

						tokio::task::yield_now().await;
					}
				})
			})
			.collect::<Vec<_>>();

		for task in tasks {
			task.await.expect("Cache task should not panic.");
		}

		// Every task ends on round 199, which keeps its own entry.
		for task in 0..8 {
			let read = cache.get(&format!("task-{task}")).expect("Final entry should remain.");

			assert_eq!(read.access_token.expose(), format!("{task}-199"));
		}

		assert!(cache.len() <= 9);
	}
}
