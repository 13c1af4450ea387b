//! Token endpoint paths and wire bodies.

// self
use crate::{
	_prelude::*,
	dispatch::{ApiResponse, BaseResponse},
	oauth::scope::Scope,
	token::{OAuthToken, TokenSecret, normalize_expires_in},
};

/// Base token exchange path.
pub const TOKEN_PATH: &str = "/api/permission/oauth2/token";
/// Base device code path.
pub const DEVICE_CODE_PATH: &str = "/api/permission/oauth2/device/code";
/// Base authorization page path on the www host.
pub const AUTHORIZE_PATH: &str = "/api/permission/oauth2/authorize";

// Identifiers are percent-encoded so each stays a single path segment.

/// Token path for an exchange scoped to an account (when `> 0`) or an enterprise (when non-empty).
pub fn token_path(account_id: Option<i64>, enterprise_id: Option<&str>) -> String {
	match (account_id.filter(|id| *id > 0), enterprise_id.filter(|id| !id.is_empty())) {
		(Some(account), _) => format!("/api/permission/oauth2/account/{account}/token"),
		(None, Some(enterprise)) => format!(
			"/api/permission/oauth2/enterprise_id/{}/token",
			urlencoding::encode(enterprise)
		),
		(None, None) => TOKEN_PATH.into(),
	}
}

/// Device code path, optionally scoped to a workspace.
pub fn device_code_path(workspace_id: Option<&str>) -> String {
	match workspace_id {
		Some(workspace) => format!(
			"/api/permission/oauth2/workspace_id/{}/device/code",
			urlencoding::encode(workspace)
		),
		None => DEVICE_CODE_PATH.into(),
	}
}

/// Authorization page path, optionally scoped to a workspace.
pub fn authorize_path(workspace_id: Option<&str>) -> String {
	match workspace_id {
		Some(workspace) => format!(
			"/api/permission/oauth2/workspace_id/{}/authorize",
			urlencoding::encode(workspace)
		),
		None => AUTHORIZE_PATH.into(),
	}
}

/// OAuth grant types accepted by the token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum GrantType {
	/// Authorization code redemption (PKCE and web clients).
	#[serde(rename = "authorization_code")]
	AuthorizationCode,
	/// Device code redemption.
	#[serde(rename = "urn:ietf:params:oauth:grant-type:device_code")]
	DeviceCode,
	/// JWT bearer assertion.
	#[serde(rename = "urn:ietf:params:oauth:grant-type:jwt-bearer")]
	JwtBearer,
	/// Refresh token redemption.
	#[serde(rename = "refresh_token")]
	RefreshToken,
}
impl GrantType {
	/// Wire value of the grant type.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantType::AuthorizationCode => "authorization_code",
			GrantType::DeviceCode => "urn:ietf:params:oauth:grant-type:device_code",
			GrantType::JwtBearer => "urn:ietf:params:oauth:grant-type:jwt-bearer",
			GrantType::RefreshToken => "refresh_token",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// JSON body posted to the token endpoint.
#[derive(Clone, Serialize)]
pub(crate) struct TokenRequest {
	pub client_id: String,
	pub grant_type: GrantType,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub code: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub redirect_uri: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub code_verifier: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub device_code: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub duration_seconds: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub scope: Option<Scope>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub account_id: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub enterprise_id: Option<String>,
}
impl TokenRequest {
	pub fn new(client_id: &str, grant_type: GrantType) -> Self {
		Self {
			client_id: client_id.into(),
			grant_type,
			code: None,
			redirect_uri: None,
			refresh_token: None,
			code_verifier: None,
			device_code: None,
			duration_seconds: None,
			scope: None,
			account_id: None,
			enterprise_id: None,
		}
	}

	pub fn path(&self) -> String {
		token_path(self.account_id, self.enterprise_id.as_deref())
	}
}

/// Token endpoint success body.
#[derive(Deserialize)]
pub(crate) struct TokenEndpointResponse {
	#[serde(flatten)]
	base: BaseResponse,
	#[serde(default)]
	access_token: String,
	#[serde(default)]
	expires_in: i64,
	#[serde(default)]
	refresh_token: Option<String>,
}
impl TokenEndpointResponse {
	pub fn into_token(self, generated_at: OffsetDateTime, log_id: Option<String>) -> OAuthToken {
		OAuthToken {
			access_token: TokenSecret::new(self.access_token),
			expires_in: normalize_expires_in(self.expires_in, generated_at),
			refresh_token: self.refresh_token.filter(|token| !token.is_empty()).map(TokenSecret::new),
			generated_at,
			log_id,
		}
	}
}
impl ApiResponse for TokenEndpointResponse {
	fn status(&self) -> Option<&BaseResponse> {
		Some(&self.base)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn token_path_prefers_account_over_enterprise() {
		assert_eq!(token_path(Some(42), Some("ent")), "/api/permission/oauth2/account/42/token");
		assert_eq!(token_path(Some(0), Some("ent")), "/api/permission/oauth2/enterprise_id/ent/token");
		assert_eq!(token_path(None, Some("")), TOKEN_PATH);
		assert_eq!(token_path(None, None), TOKEN_PATH);
	}

	#[test]
	fn workspace_paths_are_templated() {
		assert_eq!(device_code_path(Some("ws")), "/api/permission/oauth2/workspace_id/ws/device/code");
		assert_eq!(authorize_path(Some("ws")), "/api/permission/oauth2/workspace_id/ws/authorize");
		assert_eq!(authorize_path(None), AUTHORIZE_PATH);
	}

	#[test]
	fn path_identifiers_stay_one_segment() {
		assert_eq!(
			token_path(None, Some("ent/../x?y#z")),
			"/api/permission/oauth2/enterprise_id/ent%2F..%2Fx%3Fy%23z/token"
		);
		assert_eq!(
			device_code_path(Some("ws 1/a")),
			"/api/permission/oauth2/workspace_id/ws%201%2Fa/device/code"
		);
		assert_eq!(
			authorize_path(Some("ws?x")),
			"/api/permission/oauth2/workspace_id/ws%3Fx/authorize"
		);
	}

	#[test]
	fn token_request_omits_absent_fields() {
		let mut request = TokenRequest::new("client", GrantType::JwtBearer);

		request.duration_seconds = Some(900);

		assert_eq!(
			serde_json::to_value(&request).expect("Token request should serialize."),
			json!({
				"client_id": "client",
				"grant_type": "urn:ietf:params:oauth:grant-type:jwt-bearer",
				"duration_seconds": 900
			})
		);
	}

	#[test]
	fn empty_refresh_token_is_dropped() {
		let response: TokenEndpointResponse = serde_json::from_value(json!({
			"code": 0,
			"access_token": "at",
			"expires_in": 900,
			"refresh_token": ""
		}))
		.expect("Token response should decode.");
		let token = response.into_token(OffsetDateTime::now_utc(), None);

		assert_eq!(token.access_token.expose(), "at");
		assert_eq!(token.expires_in, 900);
		assert!(token.refresh_token.is_none());
	}
}
