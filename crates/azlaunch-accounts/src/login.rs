//! Credential login.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use azlaunch_auth::{Authenticator, LoginOutcome, RejectReason};
use azlaunch_core::{Account, Config};

use crate::error::{AccountError, Result};
use crate::lifecycle::SessionLifecycle;

/// What a login attempt produced.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginResult {
    /// Account stored and selected
    Added(Account),
    /// Ask the user for a second factor and call again with it
    SecondFactorRequired,
    Rejected { reason: RejectReason, message: String },
    /// Authentication server unreachable
    Offline { message: String },
    /// Credentials accepted but the email is not verified
    VerificationRequired,
}

/// Logs users in and stores the resulting accounts.
pub struct LoginFlow {
    lifecycle: Arc<SessionLifecycle>,
    authenticator: Arc<dyn Authenticator>,
    require_verified_email: bool,
}

impl LoginFlow {
    pub fn new(
        lifecycle: Arc<SessionLifecycle>,
        authenticator: Arc<dyn Authenticator>,
        require_verified_email: bool,
    ) -> Self {
        Self {
            lifecycle,
            authenticator,
            require_verified_email,
        }
    }

    pub fn from_config(
        lifecycle: Arc<SessionLifecycle>,
        authenticator: Arc<dyn Authenticator>,
        config: &Config,
    ) -> Self {
        Self::new(lifecycle, authenticator, config.auth.email_verified)
    }

    #[instrument(skip(self, secret, two_factor))]
    pub async fn login(
        &self,
        identifier: &str,
        secret: &str,
        two_factor: Option<&str>,
    ) -> Result<LoginResult> {
        let identifier = identifier.trim();
        if identifier.is_empty() || secret.is_empty() {
            return Err(AccountError::MissingCredentials);
        }
        let two_factor = match two_factor.map(str::trim) {
            Some("") => return Err(AccountError::MissingCredentials),
            other => other,
        };

        let profile = match self.authenticator.login(identifier, secret, two_factor).await {
            LoginOutcome::Success(profile) => profile,
            LoginOutcome::SecondFactorRequired => return Ok(LoginResult::SecondFactorRequired),
            LoginOutcome::Rejected { reason, message } => {
                warn!(reason = %reason, "Login rejected");
                return Ok(LoginResult::Rejected { reason, message });
            }
            LoginOutcome::Unreachable { message } => {
                warn!(message = %message, "Authentication server unreachable");
                return Ok(LoginResult::Offline { message });
            }
        };

        if self.require_verified_email && !profile.user_info.verified {
            info!(uuid = %profile.uuid, "Login refused until the email is verified");
            return Ok(LoginResult::VerificationRequired);
        }

        let mut account = profile.into_account();
        account.meta.offline = true;
        self.lifecycle.add_from_login(&account).await?;

        Ok(LoginResult::Added(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use azlaunch_auth::{AuthProfile, VerifyOutcome};
    use azlaunch_core::{AccountMeta, AuthType, UserInfo};
    use std::sync::Mutex;

    use crate::lifecycle::tests::memory_store;

    struct MockAuthenticator {
        outcome: LoginOutcome,
        last_code: Mutex<Option<String>>,
    }

    impl MockAuthenticator {
        fn new(outcome: LoginOutcome) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                last_code: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl Authenticator for MockAuthenticator {
        fn id(&self) -> &str {
            "mock"
        }

        async fn verify(&self, _account: &Account) -> VerifyOutcome {
            VerifyOutcome::Unreachable {
                message: "not scripted".to_string(),
            }
        }

        async fn login(&self, _: &str, _: &str, two_factor: Option<&str>) -> LoginOutcome {
            *self.last_code.lock().unwrap() = two_factor.map(str::to_string);
            self.outcome.clone()
        }
    }

    fn profile(verified: bool) -> AuthProfile {
        AuthProfile {
            access_token: "tok".to_string(),
            uuid: "u1".to_string(),
            name: "Steve".to_string(),
            user_properties: serde_json::json!("[]"),
            meta: AccountMeta {
                auth_type: AuthType::VerifiedProvider,
                offline: false,
            },
            user_info: UserInfo {
                verified,
                ..Default::default()
            },
        }
    }

    fn make_flow(auth: Arc<MockAuthenticator>, require_verified: bool) -> (LoginFlow, Arc<SessionLifecycle>) {
        let lifecycle = Arc::new(SessionLifecycle::new(memory_store()));
        (LoginFlow::new(lifecycle.clone(), auth, require_verified), lifecycle)
    }

    #[tokio::test]
    async fn test_success_adds_and_selects() {
        let (flow, lifecycle) = make_flow(MockAuthenticator::new(LoginOutcome::Success(profile(true))), false);

        let result = flow.login("steve@example.com", "secret", None).await.unwrap();
        let LoginResult::Added(account) = result else {
            panic!("expected account");
        };
        assert!(account.meta.offline);
        assert_eq!(account.client_token, "u1");
        assert_eq!(lifecycle.selected_uuid().await.unwrap().as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let (flow, _) = make_flow(MockAuthenticator::new(LoginOutcome::SecondFactorRequired), false);
        assert!(matches!(
            flow.login("  ", "secret", None).await,
            Err(AccountError::MissingCredentials)
        ));
        assert!(matches!(
            flow.login("steve", "", None).await,
            Err(AccountError::MissingCredentials)
        ));
        assert!(matches!(
            flow.login("steve", "secret", Some(" ")).await,
            Err(AccountError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn test_second_factor_passed_through() {
        let auth = MockAuthenticator::new(LoginOutcome::SecondFactorRequired);
        let (flow, lifecycle) = make_flow(auth.clone(), false);

        let result = flow.login("steve", "secret", Some("123456")).await.unwrap();
        assert_eq!(result, LoginResult::SecondFactorRequired);
        assert_eq!(auth.last_code.lock().unwrap().as_deref(), Some("123456"));
        assert!(lifecycle.accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_and_offline() {
        let (flow, _) = make_flow(
            MockAuthenticator::new(LoginOutcome::Rejected {
                reason: RejectReason::UserBanned,
                message: "banned".to_string(),
            }),
            false,
        );
        assert!(matches!(
            flow.login("steve", "secret", None).await.unwrap(),
            LoginResult::Rejected {
                reason: RejectReason::UserBanned,
                ..
            }
        ));

        let (flow, _) = flow_offline();
        assert!(matches!(
            flow.login("steve", "secret", None).await.unwrap(),
            LoginResult::Offline { .. }
        ));
    }

    fn flow_offline() -> (LoginFlow, Arc<SessionLifecycle>) {
        make_flow(
            MockAuthenticator::new(LoginOutcome::Unreachable {
                message: "timeout".to_string(),
            }),
            false,
        )
    }

    #[tokio::test]
    async fn test_unverified_email_refused() {
        let (flow, lifecycle) = make_flow(MockAuthenticator::new(LoginOutcome::Success(profile(false))), true);
        assert_eq!(
            flow.login("steve", "secret", None).await.unwrap(),
            LoginResult::VerificationRequired
        );
        assert!(lifecycle.accounts().await.unwrap().is_empty());
    }
}
