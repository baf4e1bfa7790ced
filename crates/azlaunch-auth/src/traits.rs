//! Authenticator trait definitions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use azlaunch_core::{Account, AccountMeta, AuthError, UserInfo};

/// Profile returned by the provider after a successful login or refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthProfile {
    /// Fresh access token
    pub access_token: String,
    /// Player uuid as reported by the provider
    pub uuid: String,
    /// Display name
    pub name: String,
    /// Opaque properties handed to the game
    pub user_properties: serde_json::Value,
    pub meta: AccountMeta,
    pub user_info: UserInfo,
}

impl AuthProfile {
    /// Build a new account record from this profile.
    pub fn into_account(self) -> Account {
        Account {
            client_token: self.uuid.clone(),
            uuid: self.uuid,
            access_token: self.access_token,
            name: self.name,
            user_properties: self.user_properties,
            meta: self.meta,
            user_info: self.user_info,
        }
    }

    /// Merge refreshed credentials into a cached account.
    ///
    /// The stored uuid is kept so the record stays addressable under the key
    /// it was inserted with.
    pub fn merge_into(self, account: &Account) -> Account {
        Account {
            uuid: account.uuid.clone(),
            client_token: account.uuid.clone(),
            access_token: self.access_token,
            name: self.name,
            user_properties: self.user_properties,
            meta: self.meta,
            user_info: self.user_info,
        }
    }
}

/// Why the provider refused a session or credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    UserBanned,
    InvalidCredentials,
    InvalidTwoFactor,
    Other(String),
}

impl RejectReason {
    /// Map the provider's `reason` code.
    pub fn from_code(code: &str) -> Self {
        match code {
            "user_banned" => RejectReason::UserBanned,
            "invalid_credentials" => RejectReason::InvalidCredentials,
            "invalid_2fa" => RejectReason::InvalidTwoFactor,
            other => RejectReason::Other(other.to_string()),
        }
    }

    pub fn to_auth_error(&self, uuid: &str, message: &str) -> AuthError {
        match self {
            RejectReason::UserBanned => AuthError::UserBanned,
            RejectReason::InvalidCredentials => AuthError::InvalidCredentials,
            RejectReason::InvalidTwoFactor => AuthError::InvalidTwoFactor,
            RejectReason::Other(_) => AuthError::AuthenticationFailed {
                uuid: uuid.to_string(),
                message: message.to_string(),
            },
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::UserBanned => write!(f, "user_banned"),
            RejectReason::InvalidCredentials => write!(f, "invalid_credentials"),
            RejectReason::InvalidTwoFactor => write!(f, "invalid_2fa"),
            RejectReason::Other(code) => write!(f, "{}", code),
        }
    }
}

/// Result of revalidating a cached session.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    /// Session is valid; carries the refreshed profile
    Refreshed(AuthProfile),
    /// Provider refused the session
    Rejected { reason: RejectReason, message: String },
    /// Provider could not be reached
    Unreachable { message: String },
}

/// Result of a credential login.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Success(AuthProfile),
    /// Credentials accepted, a second factor code is needed
    SecondFactorRequired,
    Rejected { reason: RejectReason, message: String },
    Unreachable { message: String },
}

/// Remote authentication provider.
///
/// Failures are reported through the outcome enums and never as `Err`.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Provider identifier.
    fn id(&self) -> &str;

    /// Revalidate a cached account and return refreshed credentials.
    async fn verify(&self, account: &Account) -> VerifyOutcome;

    /// Log in with an identifier and secret, optionally with a second factor.
    async fn login(&self, identifier: &str, secret: &str, two_factor: Option<&str>) -> LoginOutcome;
}
