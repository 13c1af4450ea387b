//! Credential lifecycle for Volcengine and Coze APIs: canonical HMAC request signing, OAuth token
//! flows backed by a self-expiring cache, and encrypted base-62 IM session tokens.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod im;
pub mod oauth;
pub mod obs;
pub mod sign;
pub mod token;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		http::ReqwestHttpClient,
		oauth::{JwtOAuthClient, JwtOAuthClientParams, OAuthClientOptions},
	};

	/// PKCS8 RSA private key used to sign JWT assertions in tests.
	pub const TEST_PRIVATE_KEY_PEM: &str = include_str!("../tests/fixtures/jwt_private_key.pem");
	/// Public key identifier advertised in the `kid` header of test assertions.
	pub const TEST_PUBLIC_KEY_ID: &str = "test-public-key-id";

	/// Builds a reqwest HTTP client suitable for talking to `httpmock` servers.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.timeout(std::time::Duration::from_secs(5))
			.build()
			.expect("Failed to build Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds client options pointing both the API and www bases at `base_url`.
	pub fn test_client_options(base_url: &str) -> OAuthClientOptions {
		OAuthClientOptions::new().with_base_url(base_url).with_www_url(base_url)
	}

	/// Constructs a [`JwtOAuthClient`] backed by the fixture key and the reqwest transport.
	pub fn build_jwt_test_client(
		base_url: &str,
		client_id: &str,
	) -> JwtOAuthClient<ReqwestHttpClient> {
		let params =
			JwtOAuthClientParams::new(client_id, TEST_PUBLIC_KEY_ID, TEST_PRIVATE_KEY_PEM);

		JwtOAuthClient::with_http_client(
			params,
			test_client_options(base_url),
			Arc::new(test_reqwest_http_client()),
		)
		.expect("Failed to build JWT OAuth client for tests.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
