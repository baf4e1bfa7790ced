//! Account records as persisted in the `accounts` collection.
//!
//! Field names follow the launcher's historical on-disk layout, so an
//! `Account` round-trips through JSON written by earlier launcher versions.

use serde::{Deserialize, Serialize};

/// How an account was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthType {
    /// Authenticated against the configured AZauth server
    #[serde(rename = "AZauth")]
    VerifiedProvider,
    /// Any other provider (Mojang, Microsoft, offline); stale for this launcher
    #[serde(rename = "other", other)]
    Other,
}

/// Session metadata attached to an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountMeta {
    #[serde(rename = "type")]
    pub auth_type: AuthType,
    #[serde(default)]
    pub offline: bool,
}

/// Server-side role of the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Profile details reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub role: Option<Role>,
    /// In-game currency balance
    #[serde(rename = "monnaie", default)]
    pub balance: f64,
    #[serde(default)]
    pub verified: bool,
}

/// A cached, authenticated game account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub uuid: String,
    pub access_token: String,
    #[serde(default)]
    pub client_token: String,
    /// Display name
    pub name: String,
    #[serde(default = "default_user_properties")]
    pub user_properties: serde_json::Value,
    pub meta: AccountMeta,
    #[serde(default)]
    pub user_info: UserInfo,
}

fn default_user_properties() -> serde_json::Value {
    serde_json::Value::String("[]".to_string())
}

impl Account {
    /// Whether the account was issued by the configured AZauth server.
    pub fn is_verified_provider(&self) -> bool {
        self.meta.auth_type == AuthType::VerifiedProvider
    }

    /// Short form of the access token for log output.
    pub fn token_hint(&self) -> String {
        let visible: String = self.access_token.chars().take(6).collect();
        format!("{}…", visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_layout_parses() {
        let value = json!({
            "access_token": "tok",
            "client_token": "u1",
            "uuid": "u1",
            "name": "Steve",
            "user_properties": "[]",
            "meta": { "type": "AZauth", "offline": true },
            "user_info": { "role": { "name": "Admin", "color": "ff0000" }, "monnaie": 12.5, "verified": true }
        });
        let account: Account = serde_json::from_value(value).unwrap();
        assert!(account.is_verified_provider());
        assert_eq!(account.user_info.balance, 12.5);
        assert_eq!(account.user_info.role.as_ref().unwrap().name, "Admin");

        let back = serde_json::to_value(&account).unwrap();
        assert_eq!(back["meta"]["type"], "AZauth");
        assert_eq!(back["user_info"]["monnaie"], 12.5);
    }

    #[test]
    fn test_foreign_auth_type_is_other() {
        let value = json!({
            "access_token": "tok",
            "uuid": "u2",
            "name": "Alex",
            "meta": { "type": "Xbox", "offline": false }
        });
        let account: Account = serde_json::from_value(value).unwrap();
        assert_eq!(account.meta.auth_type, AuthType::Other);
        assert!(!account.is_verified_provider());
        assert!(!account.user_info.verified);
    }
}
