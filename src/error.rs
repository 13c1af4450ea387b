//! Crate-level error types shared across signing, OAuth flows, caches, and codecs.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, unreadable responses).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Structured OAuth error returned with a non-success HTTP status.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Non-zero business code embedded in an otherwise successful response.
	#[error(transparent)]
	Service(#[from] ServiceError),
	/// Private key material could not be used for signing.
	#[error(transparent)]
	KeyFormat(#[from] KeyFormatError),
	/// Response body could not be decoded.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// IM session token could not be produced or inspected.
	#[error(transparent)]
	Codec(#[from] crate::im::CodecError),
	/// URL handed to a signing or dispatch helper is malformed.
	#[error("URL is malformed: {0}.")]
	UrlParse(#[from] url::ParseError),
	/// Caller cancelled the operation before it completed.
	#[error("Operation was cancelled before completion.")]
	Cancelled,
}
impl Error {
	/// Returns the structured OAuth error, if this is one.
	pub fn as_auth_error(&self) -> Option<&AuthError> {
		match self {
			Self::Auth(err) => Some(err),
			_ => None,
		}
	}

	/// Returns the remote log identifier attached to the failure, when the server supplied one.
	pub fn log_id(&self) -> Option<&str> {
		match self {
			Self::Auth(err) => err.log_id.as_deref(),
			Self::Service(err) => err.log_id.as_deref(),
			Self::Decode(err) => err.log_id.as_deref(),
			Self::Transport(TransportError::UnexpectedResponse { log_id, .. }) => log_id.as_deref(),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised before any request leaves the process.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	RequestSerialize(#[source] serde_json::Error),
	/// Base or www URL cannot be parsed.
	#[error("Base URL `{url}` is invalid.")]
	InvalidBaseUrl {
		/// Offending URL string.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL parsed but carries no host component.
	#[error("Base URL `{url}` has no host.")]
	MissingHost {
		/// Offending URL string.
		url: String,
	},
	/// Secret access key could not seed the HMAC signing key.
	#[error("Secret access key cannot be used as an HMAC key.")]
	InvalidSecretKey,
	/// A required configuration value was empty.
	#[error("Configuration value `{field}` is required.")]
	MissingField {
		/// Field label.
		field: &'static str,
	},
	/// Client configuration names an unknown client type.
	#[error("OAuth client type `{client_type}` is not supported.")]
	UnsupportedClientType {
		/// Client type string from configuration.
		client_type: String,
	},
	/// A token request was handed to a client that implements a different flow.
	#[error("The {client} client cannot serve a {grant} request.")]
	GrantMismatch {
		/// Client variant label.
		client: &'static str,
		/// Request variant label.
		grant: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, unreadable error bodies).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
	/// Transport reported a failure without a typed error.
	#[error("HTTP client error occurred while calling the API: {message}.")]
	Other {
		/// Transport-supplied description.
		message: String,
	},
	/// Server answered with a failure status whose body is not a structured auth error.
	#[error("API returned HTTP {status}: {body} (log_id: {}).", .log_id.as_deref().unwrap_or("-"))]
	UnexpectedResponse {
		/// HTTP status code.
		status: u16,
		/// Raw response body.
		body: String,
		/// Remote log identifier, if present.
		log_id: Option<String>,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// OAuth error codes that callers and the device poll loop react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
	/// User has not completed the device authorization yet.
	AuthorizationPending,
	/// Client polls too fast and must widen its interval.
	SlowDown,
	/// User denied the authorization request.
	AccessDenied,
	/// Device code or authorization code expired.
	ExpiredToken,
	/// Code, refresh token, or assertion was rejected.
	InvalidGrant,
	/// Any other code.
	Other,
}
impl AuthErrorKind {
	/// Classifies a wire error code.
	pub fn from_code(code: &str) -> Self {
		match code {
			"authorization_pending" => Self::AuthorizationPending,
			"slow_down" => Self::SlowDown,
			"access_denied" => Self::AccessDenied,
			"expired_token" => Self::ExpiredToken,
			"invalid_grant" => Self::InvalidGrant,
			_ => Self::Other,
		}
	}
}

/// Structured error decoded from a non-success OAuth response.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error(
	"Authorization failed with `{code}`: {message} (log_id: {}).",
	.log_id.as_deref().unwrap_or("-")
)]
pub struct AuthError {
	/// Wire error code, e.g. `authorization_pending`.
	pub code: String,
	/// Human-readable message supplied by the server.
	pub message: String,
	/// Remote log identifier taken from the response headers.
	pub log_id: Option<String>,
	/// HTTP status that carried the error.
	pub http_status: u16,
}
impl AuthError {
	/// Classifies [`AuthError::code`].
	pub fn kind(&self) -> AuthErrorKind {
		AuthErrorKind::from_code(&self.code)
	}
}

/// Non-zero business status embedded in a successful HTTP response.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Service returned code {code}: {message} (log_id: {}).", .log_id.as_deref().unwrap_or("-"))]
pub struct ServiceError {
	/// Business status code.
	pub code: i64,
	/// Business status message.
	pub message: String,
	/// Remote log identifier taken from the response headers.
	pub log_id: Option<String>,
}

/// Private key material that could not be turned into an RS256 signer.
#[derive(Debug, ThisError)]
pub enum KeyFormatError {
	/// PEM body is not valid standard base64.
	#[error("Private key is not valid base64.")]
	Base64(#[source] base64::DecodeError),
	/// Decoded bytes are not an RSA PKCS8 private key.
	#[error("Private key is not an RSA PKCS8 key.")]
	Pkcs8(#[source] jsonwebtoken::errors::Error),
	/// Parsed key was rejected while signing an assertion.
	#[error("Private key could not sign the assertion.")]
	Signing(#[source] jsonwebtoken::errors::Error),
}

/// Response body that failed JSON decoding.
#[derive(Debug, ThisError)]
#[error("Response body is malformed JSON (log_id: {}).", .log_id.as_deref().unwrap_or("-"))]
pub struct DecodeError {
	/// Structured parsing failure including the offending JSON path.
	#[source]
	pub source: serde_path_to_error::Error<serde_json::Error>,
	/// HTTP status code.
	pub status: u16,
	/// Remote log identifier, if present.
	pub log_id: Option<String>,
}
