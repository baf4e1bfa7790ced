//! AZauth (Azuriom) authenticator.
//!
//! Talks to the `api/auth` endpoints of an Azuriom website. Every reply is
//! JSON: either a user payload, or an object with `status` set to `error` or
//! `pending` plus a `reason` code.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use azlaunch_core::config::AuthConfig;
use azlaunch_core::{Account, AccountMeta, AuthError, AuthType, Role, UserInfo};

use crate::traits::{AuthProfile, Authenticator, LoginOutcome, RejectReason, VerifyOutcome};

/// Client for an Azuriom AZauth server.
pub struct AzAuthClient {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl AzAuthClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, AuthError> {
        let mut base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(AuthError::NotConfigured);
        }
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AuthError::NetworkUnavailable {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url,
            timeout_secs,
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        Self::new(config.base_url(), config.timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body to `api/auth/{endpoint}` and classify the reply.
    async fn call<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Reply {
        let url = format!("{}api/auth/{}", self.base_url, endpoint);
        debug!(url = %url, "Sending AZauth request");

        let response = match self.client.post(&url).json(body).send().await {
            Ok(response) => response,
            Err(e) => return Reply::Unreachable(self.transport_message(&e)),
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return Reply::Unreachable(self.transport_message(&e)),
        };

        classify(status, &text)
    }

    fn transport_message(&self, error: &reqwest::Error) -> String {
        if error.is_timeout() {
            AuthError::Timeout {
                seconds: self.timeout_secs,
            }
            .to_string()
        } else {
            AuthError::NetworkUnavailable {
                message: error.to_string(),
            }
            .to_string()
        }
    }
}

#[async_trait]
impl Authenticator for AzAuthClient {
    fn id(&self) -> &str {
        "azauth"
    }

    #[instrument(skip(self, account), fields(uuid = %account.uuid))]
    async fn verify(&self, account: &Account) -> VerifyOutcome {
        let body = VerifyRequest {
            access_token: &account.access_token,
        };

        match self.call("verify", &body).await {
            Reply::User(user) => VerifyOutcome::Refreshed(user.into_profile()),
            Reply::Error { reason, message } => VerifyOutcome::Rejected { reason, message },
            Reply::Pending { reason } => VerifyOutcome::Rejected {
                message: format!("unexpected pending state '{}'", reason),
                reason: RejectReason::Other(reason),
            },
            Reply::Unreachable(message) => {
                warn!(message = %message, "AZauth server unreachable");
                VerifyOutcome::Unreachable { message }
            }
        }
    }

    #[instrument(skip(self, secret, two_factor))]
    async fn login(&self, identifier: &str, secret: &str, two_factor: Option<&str>) -> LoginOutcome {
        let body = AuthenticateRequest {
            email: identifier,
            password: secret,
            code: two_factor,
        };

        match self.call("authenticate", &body).await {
            Reply::User(user) => LoginOutcome::Success(user.into_profile()),
            Reply::Pending { reason } if reason == "2fa" => LoginOutcome::SecondFactorRequired,
            Reply::Pending { reason } => LoginOutcome::Rejected {
                message: format!("unexpected pending state '{}'", reason),
                reason: RejectReason::Other(reason),
            },
            Reply::Error { reason, message } => LoginOutcome::Rejected { reason, message },
            Reply::Unreachable(message) => LoginOutcome::Unreachable { message },
        }
    }
}

#[derive(Serialize)]
struct AuthenticateRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    access_token: &'a str,
}

/// User payload returned by `authenticate` and `verify`.
#[derive(Debug, Deserialize)]
struct AzUser {
    username: String,
    uuid: String,
    access_token: String,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    money: f64,
    #[serde(default)]
    role: Option<AzRole>,
}

#[derive(Debug, Deserialize)]
struct AzRole {
    name: String,
    #[serde(default)]
    color: Option<String>,
}

impl AzUser {
    fn into_profile(self) -> AuthProfile {
        AuthProfile {
            access_token: self.access_token,
            uuid: self.uuid,
            name: self.username,
            user_properties: serde_json::Value::String("[]".to_string()),
            meta: AccountMeta {
                auth_type: AuthType::VerifiedProvider,
                offline: false,
            },
            user_info: UserInfo {
                role: self.role.map(|r| Role {
                    name: r.name,
                    color: r.color,
                }),
                balance: self.money,
                verified: self.email_verified,
            },
        }
    }
}

#[derive(Debug)]
enum Reply {
    User(AzUser),
    Pending { reason: String },
    Error { reason: RejectReason, message: String },
    Unreachable(String),
}

/// Classify an HTTP reply. Server errors and unreadable bodies count as
/// unreachable so a flaky server never costs the user a cached account.
fn classify(status: StatusCode, text: &str) -> Reply {
    if status.is_server_error() {
        return Reply::Unreachable(format!("server answered {}", status));
    }

    let body: serde_json::Value = match serde_json::from_str(text) {
        Ok(body) => body,
        Err(e) => return Reply::Unreachable(format!("malformed reply ({}): {}", status, e)),
    };

    let field = |name: &str| {
        body.get(name)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    match body.get("status").and_then(|v| v.as_str()) {
        Some("error") => Reply::Error {
            reason: RejectReason::from_code(&field("reason")),
            message: field("message"),
        },
        Some("pending") => Reply::Pending {
            reason: field("reason"),
        },
        _ => match serde_json::from_value::<AzUser>(body.clone()) {
            Ok(user) => Reply::User(user),
            Err(e) if status.is_success() => {
                Reply::Unreachable(format!("malformed user payload: {}", e))
            }
            Err(_) => Reply::Error {
                reason: RejectReason::Other(status.as_u16().to_string()),
                message: field("message"),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = r##"{
        "id": 1,
        "username": "Steve",
        "uuid": "0f1c3e2a",
        "access_token": "abc123",
        "email_verified": true,
        "money": 42.5,
        "banned": false,
        "role": { "name": "Member", "color": "#3498db" },
        "created_at": "2024-01-01T00:00:00Z"
    }"##;

    #[test]
    fn test_user_payload() {
        let Reply::User(user) = classify(StatusCode::OK, USER) else {
            panic!("expected user payload");
        };
        let profile = user.into_profile();
        assert_eq!(profile.name, "Steve");
        assert_eq!(profile.meta.auth_type, AuthType::VerifiedProvider);
        assert_eq!(profile.user_info.balance, 42.5);
        assert!(profile.user_info.verified);
        assert_eq!(profile.user_info.role.unwrap().name, "Member");
    }

    #[test]
    fn test_error_payload() {
        let body = r#"{"status":"error","reason":"invalid_credentials","message":"Invalid credentials"}"#;
        match classify(StatusCode::UNPROCESSABLE_ENTITY, body) {
            Reply::Error { reason, message } => {
                assert_eq!(reason, RejectReason::InvalidCredentials);
                assert_eq!(message, "Invalid credentials");
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[test]
    fn test_pending_two_factor() {
        let body = r#"{"status":"pending","reason":"2fa","message":"2FA required"}"#;
        assert!(matches!(
            classify(StatusCode::UNPROCESSABLE_ENTITY, body),
            Reply::Pending { reason } if reason == "2fa"
        ));
    }

    #[test]
    fn test_server_error_is_unreachable() {
        assert!(matches!(
            classify(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>"),
            Reply::Unreachable(_)
        ));
        assert!(matches!(classify(StatusCode::OK, "not json"), Reply::Unreachable(_)));
    }

    #[test]
    fn test_client_error_without_status_is_rejected() {
        assert!(matches!(
            classify(StatusCode::FORBIDDEN, r#"{"message":"Forbidden"}"#),
            Reply::Error { .. }
        ));
    }

    #[test]
    fn test_new_normalizes_base_url() {
        let client = AzAuthClient::new("https://mc.example.com", 5).unwrap();
        assert_eq!(client.base_url(), "https://mc.example.com/");
        assert!(matches!(AzAuthClient::new("  ", 5), Err(AuthError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        // Port 9 (discard) on localhost is closed in test environments.
        let client = AzAuthClient::new("http://127.0.0.1:9/", 2).unwrap();
        let outcome = client.login("steve@example.com", "secret", None).await;
        assert!(matches!(outcome, LoginOutcome::Unreachable { .. }));
    }
}
