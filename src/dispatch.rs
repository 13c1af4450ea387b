//! JSON request dispatcher shared by the OAuth clients.
//!
//! A [`Dispatcher`] joins a path onto its base URL, serializes the body, runs the request through a
//! [`TokenHttpClient`], and turns the response into one of three outcomes: a decoded value, an
//! [`AuthError`] for non-success statuses, or a [`ServiceError`] when a successful body carries a
//! non-zero business code.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		HeaderValue, Method,
		header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
	},
};
// self
use crate::{
	_prelude::*,
	error::{AuthError, ConfigError, DecodeError, ServiceError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	obs,
};

const USER_AGENT_VALUE: &str = concat!("volc-auth-rust/", env!("CARGO_PKG_VERSION"));

/// Business status envelope embedded in API response bodies.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseResponse {
	/// Business status code, zero on success.
	#[serde(default)]
	pub code: i64,
	/// Business status message.
	#[serde(default)]
	pub msg: String,
}

/// Response bodies that may carry a [`BaseResponse`] envelope.
pub trait ApiResponse
where
	Self: Sized + for<'de> Deserialize<'de>,
{
	/// Returns the embedded business status, if the body has one.
	fn status(&self) -> Option<&BaseResponse> {
		None
	}
}
impl ApiResponse for serde_json::Value {}

/// Decoded response plus transport metadata.
#[derive(Clone, Debug)]
pub struct Dispatched<T> {
	/// Decoded body.
	pub body: T,
	/// HTTP status code.
	pub status: u16,
	/// Remote log identifier, when present.
	pub log_id: Option<String>,
}

/// Per-request headers and query parameters.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
	headers: Vec<(String, String)>,
	query: Vec<(String, String)>,
}
impl RequestOptions {
	/// Creates empty options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a request header; later values for the same name replace earlier ones.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Appends a query parameter.
	pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((name.into(), value.into()));

		self
	}

	/// Sets `Authorization: Bearer <token>`.
	pub fn with_bearer(self, token: &str) -> Self {
		self.with_header(AUTHORIZATION.as_str(), format!("Bearer {token}"))
	}
}

#[derive(Deserialize)]
struct AuthErrorEnvelope {
	#[serde(alias = "error")]
	error_code: String,
	#[serde(default, alias = "error_description")]
	error_message: String,
}

/// Sends JSON requests relative to a base URL.
pub struct Dispatcher<C>
where
	C: ?Sized + TokenHttpClient,
{
	base_url: String,
	http_client: Arc<C>,
}
impl<C> Dispatcher<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates a dispatcher; a trailing `/` on `base_url` is dropped.
	pub fn new(base_url: &str, http_client: Arc<C>) -> Self {
		Self { base_url: base_url.trim_end_matches('/').to_owned(), http_client }
	}

	/// Base URL every path is appended to.
	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	/// Sends `body` (if any) to `base_url + path` and decodes the response as `T`.
	pub async fn request<B, T>(
		&self,
		method: Method,
		path: &str,
		body: Option<&B>,
		options: RequestOptions,
	) -> Result<Dispatched<T>>
	where
		B: ?Sized + Serialize,
		T: ApiResponse,
	{
		let request = self.build_request(method, path, body, options)?;
		let slot = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(slot.clone());
		let response = handle.call(request).await.map_err(map_http_client_error::<C>)?;
		let meta = slot.take().unwrap_or_else(|| {
			ResponseMetadata::from_parts(response.status().as_u16(), response.headers())
		});

		decode_response(response, meta)
	}

	fn build_request<B>(
		&self,
		method: Method,
		path: &str,
		body: Option<&B>,
		options: RequestOptions,
	) -> Result<HttpRequest>
	where
		B: ?Sized + Serialize,
	{
		let mut url = Url::parse(&format!("{}{path}", self.base_url))?;

		if !options.query.is_empty() {
			url.query_pairs_mut().extend_pairs(options.query.iter());
		}

		let payload = match body {
			Some(body) => serde_json::to_vec(body).map_err(ConfigError::RequestSerialize)?,
			None => Vec::new(),
		};
		let mut request = HttpRequest::new(payload);

		*request.method_mut() = method;
		*request.uri_mut() = url
			.as_str()
			.parse()
			.map_err(|e| ConfigError::from(oauth2::http::Error::from(e)))?;

		let headers = request.headers_mut();

		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

		for (name, value) in options.headers {
			match (
				oauth2::http::HeaderName::from_bytes(name.as_bytes()),
				HeaderValue::from_str(&value),
			) {
				(Ok(name), Ok(value)) => {
					headers.insert(name, value);
				},
				_ => obs::record_header_skipped(&name),
			}
		}

		Ok(request)
	}
}
impl<C> Debug for Dispatcher<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Dispatcher").field("base_url", &self.base_url).finish_non_exhaustive()
	}
}

fn decode_response<T>(response: HttpResponse, meta: ResponseMetadata) -> Result<Dispatched<T>>
where
	T: ApiResponse,
{
	let status = response.status();
	let log_id = meta.log_id;
	let bytes = response.into_body();

	if !status.is_success() {
		return Err(match serde_json::from_slice::<AuthErrorEnvelope>(&bytes) {
			Ok(envelope) => AuthError {
				code: envelope.error_code,
				message: envelope.error_message,
				log_id,
				http_status: status.as_u16(),
			}
			.into(),
			Err(_) => TransportError::UnexpectedResponse {
				status: status.as_u16(),
				body: String::from_utf8_lossy(&bytes).into_owned(),
				log_id,
			}
			.into(),
		});
	}

	let mut deserializer = serde_json::Deserializer::from_slice(&bytes);
	let body: T = serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
		DecodeError { source, status: status.as_u16(), log_id: log_id.clone() }
	})?;

	if let Some(base) = body.status().filter(|base| base.code != 0) {
		return Err(ServiceError { code: base.code, message: base.msg.clone(), log_id }.into());
	}

	Ok(Dispatched { body, status: status.as_u16(), log_id })
}

fn map_http_client_error<C>(err: HttpClientError<C::TransportError>) -> Error
where
	C: ?Sized + TokenHttpClient,
{
	match err {
		HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransportError::Other { message }.into(),
		_ => TransportError::Other { message: "unknown transport failure".into() }.into(),
	}
}
