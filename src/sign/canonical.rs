//! Canonical request text, credential scope, and query encoding.

// self
use crate::{_prelude::*, sign::key};

/// Timestamp pair used by one signing call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SigningTime {
	/// `YYYYMMDDTHHMMSSZ` in UTC.
	pub amz_date: String,
	/// `YYYYMMDD` in UTC.
	pub date: String,
}
impl SigningTime {
	pub fn new(now: OffsetDateTime) -> Self {
		let now = now.to_offset(time::UtcOffset::UTC);
		let date = format!("{:04}{:02}{:02}", now.year(), u8::from(now.month()), now.day());
		let amz_date =
			format!("{date}T{:02}{:02}{:02}Z", now.hour(), now.minute(), now.second());

		Self { amz_date, date }
	}

	pub fn credential_scope(&self, region: &str, service: &str) -> String {
		format!("{}/{region}/{service}/{}", self.date, key::SCOPE_TERMINATOR)
	}
}

pub(crate) struct CanonicalRequest<'a> {
	pub method: &'a str,
	pub uri: &'a str,
	pub query: &'a str,
	/// Lower-cased `name:value\n` lines in signed order.
	pub headers: String,
	pub signed_headers: &'a str,
	pub payload_hash: String,
}
impl CanonicalRequest<'_> {
	pub fn string_to_sign(&self, time: &SigningTime, scope: &str) -> String {
		format!(
			"{}\n{}\n{scope}\n{}",
			super::ALGORITHM,
			time.amz_date,
			key::sha256_hex(self.to_string().as_bytes())
		)
	}
}
impl Display for CanonicalRequest<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(
			f,
			"{}\n{}\n{}\n{}\n{}\n{}",
			self.method,
			self.uri,
			self.query,
			self.headers,
			self.signed_headers,
			self.payload_hash
		)
	}
}

/// Returns `/` for an empty path.
pub(crate) fn canonical_uri(path: &str) -> &str {
	if path.is_empty() { "/" } else { path }
}

/// Form-style escaping: space becomes `+`, only `A-Za-z0-9-_.~` stay literal.
pub(crate) fn query_escape(value: &str) -> String {
	url::form_urlencoded::byte_serialize(value.as_bytes())
		.collect::<String>()
		.replace('*', "%2A")
		.replace("%7E", "~")
}

/// Joins `key=value` pairs sorted by key, using the first value of every key.
pub(crate) fn canonical_query(params: &BTreeMap<String, Vec<String>>) -> String {
	params
		.iter()
		.map(|(key, values)| {
			let value = values.first().map(String::as_str).unwrap_or_default();

			format!("{}={}", query_escape(key), query_escape(value))
		})
		.collect::<Vec<_>>()
		.join("&")
}

/// Encodes every value of every key, keys sorted.
pub(crate) fn encode_query(params: &BTreeMap<String, Vec<String>>) -> String {
	params
		.iter()
		.flat_map(|(key, values)| {
			values.iter().map(move |value| format!("{}={}", query_escape(key), query_escape(value)))
		})
		.collect::<Vec<_>>()
		.join("&")
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn signing_time_is_utc() {
		let time = SigningTime::new(macros::datetime!(2024-01-02 11:04:05 +08:00));

		assert_eq!(time.amz_date, "20240102T030405Z");
		assert_eq!(time.date, "20240102");
		assert_eq!(time.credential_scope("cn-north-1", "rtc"), "20240102/cn-north-1/rtc/request");
	}

	#[test]
	fn query_escape_keeps_unreserved_only() {
		assert_eq!(query_escape("a b*c~d/e"), "a+b%2Ac~d%2Fe");
		assert_eq!(query_escape("AKLT/20240102/cn-north-1/rtc/request"), "AKLT%2F20240102%2Fcn-north-1%2Frtc%2Frequest");
	}

	#[test]
	fn canonical_query_sorts_by_key_bytes() {
		let mut params = BTreeMap::new();

		params.insert("b".to_owned(), vec!["2".to_owned()]);
		params.insert("a".to_owned(), vec!["1".to_owned(), "9".to_owned()]);
		params.insert("X-Date".to_owned(), vec!["20240102T030405Z".to_owned()]);

		assert_eq!(canonical_query(&params), "X-Date=20240102T030405Z&a=1&b=2");
		assert_eq!(encode_query(&params), "X-Date=20240102T030405Z&a=1&a=9&b=2");
	}

	#[test]
	fn empty_path_is_root() {
		assert_eq!(canonical_uri(""), "/");
		assert_eq!(canonical_uri("/v1/rooms"), "/v1/rooms");
	}
}
