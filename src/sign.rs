//! Canonical HMAC-SHA256 request signing for Volcengine OpenAPI calls.
//!
//! Two variants share one canonical form:
//!
//! - [`sign`] stamps `X-Date`, `Host`, the optional `X-Security-Token`, and `Authorization` onto an
//!   outgoing request. The query string is signed verbatim and the payload is not covered.
//! - [`sign_url`] moves every signing input into the query string (sorted, form-escaped) so the URL
//!   can be handed to a third party, and covers the body hash.
//!
//! Incomplete credentials are not an error: both variants pass their input through unsigned.

mod canonical;
mod key;

// crates.io
use oauth2::http::{
	HeaderName, HeaderValue, Request,
	header::{AUTHORIZATION, HOST},
};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	obs,
	sign::canonical::{CanonicalRequest, SigningTime},
};

/// Signature algorithm label used in the string-to-sign and `Authorization` header.
pub const ALGORITHM: &str = "HMAC-SHA256";
/// Header (and pre-signed query key) carrying the signing timestamp.
pub const DATE_HEADER: &str = "X-Date";
/// Header (and pre-signed query key) carrying the temporary session token.
pub const SECURITY_TOKEN_HEADER: &str = "X-Security-Token";

const Q_EXPIRES: &str = "X-Expires";
const Q_CREDENTIAL: &str = "X-Credential";
const Q_SIGNED_HEADERS: &str = "X-SignedHeaders";
const Q_SIGNATURE: &str = "X-Signature";

/// Long-term access key plus the service scope it signs for.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
	/// Access key identifier.
	pub access_key_id: String,
	/// Secret access key.
	pub secret_access_key: String,
	/// Target service name, e.g. `rtc`.
	pub service: String,
	/// Target region, e.g. `cn-north-1`.
	pub region: String,
	/// Temporary session token issued with STS credentials.
	#[serde(default)]
	pub session_token: Option<String>,
}
impl Credentials {
	/// Creates credentials without a session token.
	pub fn new(
		access_key_id: impl Into<String>,
		secret_access_key: impl Into<String>,
		service: impl Into<String>,
		region: impl Into<String>,
	) -> Self {
		Self {
			access_key_id: access_key_id.into(),
			secret_access_key: secret_access_key.into(),
			service: service.into(),
			region: region.into(),
			session_token: None,
		}
	}

	/// Attaches a temporary session token.
	pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
		self.session_token = Some(token.into());

		self
	}

	/// Returns `true` when both the key id and the secret are present.
	pub fn is_complete(&self) -> bool {
		!self.access_key_id.is_empty() && !self.secret_access_key.is_empty()
	}

	fn session_token(&self) -> Option<&str> {
		self.session_token.as_deref().filter(|token| !token.is_empty())
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("access_key_id", &self.access_key_id)
			.field("secret_access_key", &"<redacted>")
			.field("service", &self.service)
			.field("region", &self.region)
			.field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Signs `request` in place using the current UTC time.
pub fn sign<B>(credentials: &Credentials, request: &mut Request<B>) {
	sign_at(credentials, request, OffsetDateTime::now_utc());
}

/// Signs `request` in place as of `now`.
pub fn sign_at<B>(credentials: &Credentials, request: &mut Request<B>, now: OffsetDateTime) {
	if !credentials.is_complete() {
		return;
	}

	let time = SigningTime::new(now);
	let session_token = credentials.session_token();
	let host = request_host(request);
	let mut canonical_headers = format!("host:{host}\nx-date:{}\n", time.amz_date);
	let mut signed_headers = String::from("host;x-date");

	if let Some(token) = session_token {
		canonical_headers.push_str(&format!("x-security-token:{token}\n"));
		signed_headers.push_str(";x-security-token");
	}

	let canonical = CanonicalRequest {
		method: request.method().as_str(),
		uri: canonical::canonical_uri(request.uri().path()),
		query: request.uri().query().unwrap_or_default(),
		headers: canonical_headers,
		signed_headers: &signed_headers,
		payload_hash: key::sha256_hex(b""),
	};
	let scope = time.credential_scope(&credentials.region, &credentials.service);
	let Ok(signature) = signature(credentials, &time, &canonical.string_to_sign(&time, &scope))
	else {
		obs::record_header_skipped(AUTHORIZATION.as_str());

		return;
	};
	let authorization = format!(
		"{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
		credentials.access_key_id
	);

	set_header(request, HeaderName::from_static("x-date"), &time.amz_date);

	if let Some(token) = session_token {
		set_header(request, HeaderName::from_static("x-security-token"), token);
	}

	set_header(request, HOST, &host);
	set_header(request, AUTHORIZATION, &authorization);
}

/// Produces a pre-signed URL using the current UTC time.
///
/// `expires` becomes `X-Expires` in whole seconds when positive.
pub fn sign_url(
	credentials: &Credentials,
	method: &str,
	url: &str,
	body: &str,
	expires: Option<std::time::Duration>,
) -> Result<String> {
	sign_url_at(credentials, method, url, body, expires, OffsetDateTime::now_utc())
}

/// Produces a pre-signed URL as of `now`.
pub fn sign_url_at(
	credentials: &Credentials,
	method: &str,
	url: &str,
	body: &str,
	expires: Option<std::time::Duration>,
	now: OffsetDateTime,
) -> Result<String> {
	if !credentials.is_complete() {
		return Ok(url.to_owned());
	}

	let mut parsed = Url::parse(url)?;
	let mut params = BTreeMap::<String, Vec<String>>::new();

	for (key, value) in parsed.query_pairs() {
		params.entry(key.into_owned()).or_default().push(value.into_owned());
	}

	let time = SigningTime::new(now);
	let set = |params: &mut BTreeMap<String, Vec<String>>, key: &str, value: String| {
		params.insert(key.to_owned(), vec![value]);
	};

	set(&mut params, DATE_HEADER, time.amz_date.clone());

	if let Some(token) = credentials.session_token() {
		set(&mut params, SECURITY_TOKEN_HEADER, token.to_owned());
	}
	if let Some(expires) = expires.filter(|expires| expires.as_secs() > 0) {
		set(&mut params, Q_EXPIRES, expires.as_secs().to_string());
	}

	let signed_headers = "host";
	let query = canonical::canonical_query(&params);
	let canonical = CanonicalRequest {
		method,
		uri: canonical::canonical_uri(parsed.path()),
		query: &query,
		headers: format!("host:{}\n", url_host(&parsed)),
		signed_headers,
		payload_hash: key::sha256_hex(body.as_bytes()),
	};
	let scope = time.credential_scope(&credentials.region, &credentials.service);
	let signature = signature(credentials, &time, &canonical.string_to_sign(&time, &scope))
		.map_err(|_| ConfigError::InvalidSecretKey)?;

	set(&mut params, Q_CREDENTIAL, format!("{}/{scope}", credentials.access_key_id));
	set(&mut params, Q_SIGNED_HEADERS, signed_headers.to_owned());
	set(&mut params, Q_SIGNATURE, signature);

	parsed.set_query(Some(&canonical::encode_query(&params)));

	Ok(parsed.into())
}

fn signature(
	credentials: &Credentials,
	time: &SigningTime,
	string_to_sign: &str,
) -> Result<String, hmac::digest::InvalidLength> {
	let signing_key = key::signing_key(
		&credentials.secret_access_key,
		&time.date,
		&credentials.region,
		&credentials.service,
	)?;

	Ok(hex::encode(key::hmac_sha256(&signing_key, string_to_sign.as_bytes())?))
}

fn request_host<B>(request: &Request<B>) -> String {
	let uri = request.uri();

	match (uri.host(), uri.port_u16()) {
		(Some(host), Some(port)) => format!("{host}:{port}"),
		(Some(host), None) => host.to_owned(),
		(None, _) => request
			.headers()
			.get(HOST)
			.and_then(|value| value.to_str().ok())
			.unwrap_or_default()
			.to_owned(),
	}
}

fn url_host(url: &Url) -> String {
	match (url.host_str(), url.port()) {
		(Some(host), Some(port)) => format!("{host}:{port}"),
		(Some(host), None) => host.to_owned(),
		(None, _) => String::new(),
	}
}

fn set_header<B>(request: &mut Request<B>, name: HeaderName, value: &str) {
	match HeaderValue::from_str(value) {
		Ok(value) => {
			request.headers_mut().insert(name, value);
		},
		Err(_) => obs::record_header_skipped(name.as_str()),
	}
}
