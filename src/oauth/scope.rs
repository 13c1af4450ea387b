//! Permission scopes and session context attached to JWT exchanges.

// self
use crate::_prelude::*;

/// Permission granted when [`Scope::build_bot_chat`] receives no explicit list.
pub const DEFAULT_BOT_CHAT_PERMISSION: &str = "Connector.botChat";

/// Permission scope requested for a JWT token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
	/// Account-level permissions.
	pub account_permission: Option<AccountPermission>,
	/// Attribute constraints narrowing the permissions.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub attribute_constraint: Option<AttributeConstraint>,
	/// Workspace-level permissions.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub workspace_permission: Option<WorkspacePermission>,
}
impl Scope {
	/// Builds a bot chat scope, optionally restricted to `bot_ids`.
	pub fn build_bot_chat<I, P>(bot_ids: I, permissions: P) -> Self
	where
		I: IntoIterator,
		I::Item: Into<String>,
		P: IntoIterator,
		P::Item: Into<String>,
	{
		let mut permission_list = permissions.into_iter().map(Into::into).collect::<Vec<_>>();

		if permission_list.is_empty() {
			permission_list.push(DEFAULT_BOT_CHAT_PERMISSION.into());
		}

		let bot_id_list = bot_ids.into_iter().map(Into::into).collect::<Vec<_>>();
		let attribute_constraint = (!bot_id_list.is_empty()).then(|| AttributeConstraint {
			connector_bot_chat_attribute: Some(BotChatAttribute { bot_id_list }),
		});

		Self {
			account_permission: Some(AccountPermission { permission_list }),
			attribute_constraint,
			workspace_permission: None,
		}
	}
}

/// Account-level permission list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPermission {
	/// Permission identifiers.
	pub permission_list: Vec<String>,
}

/// Workspace-level permission list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspacePermission {
	/// Workspaces the permissions apply to.
	pub workspace_id_list: Vec<String>,
	/// Permission identifiers.
	pub permission_list: Vec<String>,
}

/// Attribute constraints on a scope.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeConstraint {
	/// Restricts bot chat to specific bots.
	pub connector_bot_chat_attribute: Option<BotChatAttribute>,
}

/// Bot chat restriction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotChatAttribute {
	/// Allowed bot identifiers.
	pub bot_id_list: Vec<String>,
}

/// Caller context embedded in a JWT assertion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
	/// Device the session runs on.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub device_info: Option<DeviceInfo>,
}

/// Device description carried in a [`SessionContext`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
	/// Device identifier.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub device_id: Option<String>,
	/// Custom consumer label.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub custom_consumer: Option<String>,
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn bot_chat_defaults_permission() {
		let scope = Scope::build_bot_chat(["bot-1"], Vec::<String>::new());

		assert_eq!(
			serde_json::to_value(&scope).expect("Scope should serialize."),
			json!({
				"account_permission": { "permission_list": ["Connector.botChat"] },
				"attribute_constraint": {
					"connector_bot_chat_attribute": { "bot_id_list": ["bot-1"] }
				}
			})
		);
	}

	#[test]
	fn bot_chat_without_bots_has_no_constraint() {
		let scope = Scope::build_bot_chat(Vec::<String>::new(), ["Bot.read"]);

		assert!(scope.attribute_constraint.is_none());
		assert_eq!(
			scope.account_permission.map(|permission| permission.permission_list),
			Some(vec!["Bot.read".to_owned()])
		);
	}
}
