//! Declarative client configuration.

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::TokenHttpClient,
	oauth::{
		DeviceOAuthClient, JwtOAuthClient, JwtOAuthClientParams, OAuthClient, OAuthClientOptions,
		PkceOAuthClient, WebOAuthClient,
	},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Client settings as stored in an app config file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
	/// OAuth client identifier.
	pub client_id: String,
	/// One of `jwt`, `pkce`, `device`, or `web`.
	pub client_type: String,
	/// Client secret of `web` clients.
	pub client_secret: String,
	/// PKCS8 RSA private key of `jwt` clients.
	pub private_key: String,
	/// Key identifier of `jwt` clients.
	pub public_key_id: String,
	/// API base URL override.
	pub coze_api_base: String,
	/// Console URL override.
	pub coze_www_base: String,
}
impl OAuthConfig {
	fn options(&self) -> OAuthClientOptions {
		let mut options = OAuthClientOptions::new();

		if !self.coze_api_base.is_empty() {
			options = options.with_base_url(&self.coze_api_base);
		}
		if !self.coze_www_base.is_empty() {
			options = options.with_www_url(&self.coze_www_base);
		}

		options
	}
}

fn require(value: &str, field: &'static str) -> Result<(), ConfigError> {
	if value.is_empty() { Err(ConfigError::MissingField { field }) } else { Ok(()) }
}

impl<C> OAuthClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Builds the client variant named by `config.client_type` over a caller-provided transport.
	pub fn from_config_with_http_client(config: &OAuthConfig, http_client: Arc<C>) -> Result<Self> {
		require(&config.client_id, "client_id")?;
		require(&config.client_type, "client_type")?;

		let options = config.options();

		Ok(match config.client_type.as_str() {
			"jwt" => {
				require(&config.private_key, "private_key")?;
				require(&config.public_key_id, "public_key_id")?;

				let params = JwtOAuthClientParams::new(
					&config.client_id,
					&config.public_key_id,
					&config.private_key,
				);

				JwtOAuthClient::with_http_client(params, options, http_client)?.into()
			},
			"pkce" => PkceOAuthClient::with_http_client(&config.client_id, options, http_client)?.into(),
			"device" =>
				DeviceOAuthClient::with_http_client(&config.client_id, options, http_client)?.into(),
			"web" => {
				require(&config.client_secret, "client_secret")?;

				WebOAuthClient::with_http_client(
					&config.client_id,
					&config.client_secret,
					options,
					http_client,
				)?
				.into()
			},
			other =>
				return Err(
					ConfigError::UnsupportedClientType { client_type: other.to_owned() }.into()
				),
		})
	}
}
#[cfg(feature = "reqwest")]
impl OAuthClient<ReqwestHttpClient> {
	/// Builds the client variant named by `config.client_type` with a default transport.
	pub fn from_config(config: &OAuthConfig) -> Result<Self> {
		Self::from_config_with_http_client(config, Arc::new(ReqwestHttpClient::new()?))
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::_preludet::*;

	fn load(value: serde_json::Value) -> Result<OAuthClient<ReqwestHttpClient>> {
		let config: OAuthConfig = serde_json::from_value(value).expect("Config should decode.");

		OAuthClient::from_config_with_http_client(&config, Arc::new(test_reqwest_http_client()))
	}

	#[test]
	fn every_client_type_is_supported() {
		let jwt = load(json!({
			"client_id": "c",
			"client_type": "jwt",
			"private_key": TEST_PRIVATE_KEY_PEM,
			"public_key_id": "kid",
			"coze_api_base": "https://api.coze.cn"
		}))
		.expect("JWT config should load.");

		assert_eq!(jwt.kind(), "jwt");
		assert_eq!(jwt.client_id(), "c");

		for (client_type, extra) in
			[("pkce", json!({})), ("device", json!({})), ("web", json!({ "client_secret": "s" }))]
		{
			let mut value = json!({ "client_id": "c", "client_type": client_type });

			if let (Some(target), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
				target.extend(extra.clone());
			}

			let client = load(value).expect("Config should load.");

			assert_eq!(client.kind(), client_type);
		}
	}

	#[test]
	fn missing_fields_and_unknown_types_fail() {
		let err = load(json!({ "client_type": "jwt" })).expect_err("Missing client id should fail.");

		assert!(matches!(err, Error::Config(ConfigError::MissingField { field: "client_id" })));

		let err = load(json!({ "client_id": "c", "client_type": "jwt", "private_key": "k" }))
			.expect_err("Missing key id should fail.");

		assert!(matches!(err, Error::Config(ConfigError::MissingField { field: "public_key_id" })));

		let err = load(json!({ "client_id": "c", "client_type": "web" }))
			.expect_err("Missing secret should fail.");

		assert!(matches!(err, Error::Config(ConfigError::MissingField { field: "client_secret" })));

		let err = load(json!({ "client_id": "c", "client_type": "saml" }))
			.expect_err("Unknown type should fail.");

		assert!(matches!(
			err,
			Error::Config(ConfigError::UnsupportedClientType { ref client_type }) if client_type == "saml"
		));
	}
}
