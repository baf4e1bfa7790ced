//! Startup reconciliation of cached accounts.
//!
//! Walks every cached account, revalidates it against the authenticator and
//! applies the result: stale or rejected accounts are removed, refreshed
//! credentials are written back, and accounts are kept untouched while the
//! server cannot be reached. Removals go through [`SessionLifecycle::remove`]
//! so the selection pointer follows the same rules as a user deletion.
//!
//! Accounts are processed one at a time. A failure on one account is recorded
//! in the [`ReconcileReport`] and the batch continues; decisions already
//! applied are never rolled back.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use azlaunch_auth::{Authenticator, RejectReason, VerifyOutcome};
use azlaunch_core::{Account, Config};
use azlaunch_store::Record;

use crate::error::{AccountError, Result};
use crate::lifecycle::{SessionLifecycle, SessionState};

/// Progress of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ReconcileState {
    Idle,
    Loading,
    /// Verifying the account at zero-based `index` out of `total`
    Verifying { index: usize, total: usize },
    Finalizing,
    Done,
}

/// What happened to one cached account.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum AccountOutcome {
    /// Credentials refreshed and written back
    Refreshed { uuid: String, name: String },
    /// Kept as is, the server could not be asked
    Kept { uuid: String },
    /// Removed, not an AZauth account or not an account record at all
    RemovedStaleType { uuid: String },
    /// Removed, the server refused the session
    RemovedRejected {
        uuid: String,
        reason: RejectReason,
        message: String,
    },
    /// Removed, email not verified while verification is required
    RemovedUnverified { uuid: String },
    /// A store operation failed for this account
    StoreFailure { uuid: String, message: String },
    /// Not processed, the run was cancelled first
    Skipped { uuid: String },
}

impl AccountOutcome {
    pub fn uuid(&self) -> &str {
        match self {
            AccountOutcome::Refreshed { uuid, .. }
            | AccountOutcome::Kept { uuid }
            | AccountOutcome::RemovedStaleType { uuid }
            | AccountOutcome::RemovedRejected { uuid, .. }
            | AccountOutcome::RemovedUnverified { uuid }
            | AccountOutcome::StoreFailure { uuid, .. }
            | AccountOutcome::Skipped { uuid } => uuid,
        }
    }

    pub fn is_removal(&self) -> bool {
        matches!(
            self,
            AccountOutcome::RemovedStaleType { .. }
                | AccountOutcome::RemovedRejected { .. }
                | AccountOutcome::RemovedUnverified { .. }
        )
    }
}

/// Result of a reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileReport {
    /// One entry per cached account, in processing order
    pub outcomes: Vec<AccountOutcome>,
    /// Selection after the run
    pub selected: Option<String>,
    /// The authenticator was unreachable at least once
    pub offline: bool,
    pub cancelled: bool,
    pub state: SessionState,
}

impl ReconcileReport {
    pub fn removed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_removal()).count()
    }

    pub fn refreshed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, AccountOutcome::Refreshed { .. }))
            .count()
    }

    pub fn outcome_for(&self, uuid: &str) -> Option<&AccountOutcome> {
        self.outcomes.iter().find(|o| o.uuid() == uuid)
    }
}

/// Rules applied while reconciling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// Remove refreshed accounts whose email is not verified
    pub require_verified_email: bool,
    /// When false the authenticator is never called
    pub online: bool,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            require_verified_email: false,
            online: true,
        }
    }
}

impl ReconcilePolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            require_verified_email: config.auth.email_verified,
            online: config.auth.online,
        }
    }
}

/// Revalidates cached accounts against an [`Authenticator`].
pub struct AccountReconciler {
    lifecycle: Arc<SessionLifecycle>,
    authenticator: Arc<dyn Authenticator>,
    policy: ReconcilePolicy,
    state: watch::Sender<ReconcileState>,
    cancel_token: Option<CancellationToken>,
}

impl AccountReconciler {
    pub fn new(
        lifecycle: Arc<SessionLifecycle>,
        authenticator: Arc<dyn Authenticator>,
        policy: ReconcilePolicy,
    ) -> Self {
        let (state, _) = watch::channel(ReconcileState::Idle);
        Self {
            lifecycle,
            authenticator,
            policy,
            state,
            cancel_token: None,
        }
    }

    /// Stop verifying when `token` is cancelled. Checked between accounts.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<ReconcileState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ReconcileState {
        *self.state.borrow()
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_token
            .as_ref()
            .map(|t| t.is_cancelled())
            .unwrap_or(false)
    }

    fn set_state(&self, state: ReconcileState) {
        debug!(?state, "Reconcile state");
        self.state.send_replace(state);
    }

    /// Run one reconciliation pass.
    ///
    /// Fails only when the cached accounts cannot be loaded. Per-account
    /// problems are reported in [`ReconcileReport::outcomes`].
    #[instrument(skip(self), fields(provider = %self.authenticator.id()))]
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        self.set_state(ReconcileState::Loading);

        let records = match self.load().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Failed to load cached accounts");
                self.set_state(ReconcileState::Done);
                return Err(e);
            }
        };

        let total = records.len();
        info!(total, "Reconciling cached accounts");

        let mut outcomes = Vec::with_capacity(total);
        let mut offline = false;
        let mut cancelled = false;

        for (index, record) in records.iter().enumerate() {
            if cancelled || self.is_cancelled() {
                cancelled = true;
                outcomes.push(AccountOutcome::Skipped {
                    uuid: record.identifier.clone(),
                });
                continue;
            }

            self.set_state(ReconcileState::Verifying { index, total });
            let outcome = match record.decode::<Account>() {
                Ok(account) => self.process(&account, &mut offline).await,
                Err(e) => {
                    warn!(identifier = %record.identifier, error = %e, "Removing undecodable account record");
                    let uuid = record.identifier.clone();
                    self.remove(&uuid, AccountOutcome::RemovedStaleType { uuid: uuid.clone() })
                        .await
                }
            };
            debug!(uuid = %record.identifier, ?outcome, "Account reconciled");
            outcomes.push(outcome);
        }

        if cancelled {
            info!("Reconciliation cancelled, finalizing early");
        }

        self.set_state(ReconcileState::Finalizing);
        let (selected, state) = self.finalize().await;
        self.set_state(ReconcileState::Done);

        let report = ReconcileReport {
            outcomes,
            selected,
            offline,
            cancelled,
            state,
        };
        info!(
            refreshed = report.refreshed(),
            removed = report.removed(),
            offline = report.offline,
            selected = ?report.selected,
            "Reconciliation finished"
        );
        Ok(report)
    }

    async fn load(&self) -> Result<Vec<Record>> {
        // Creates the pointer on first run.
        self.lifecycle.pointer().await?;
        self.lifecycle.account_records().await
    }

    async fn process(&self, account: &Account, offline: &mut bool) -> AccountOutcome {
        let uuid = account.uuid.clone();

        if !account.is_verified_provider() {
            info!(uuid = %uuid, "Removing account with unsupported auth type");
            return self
                .remove(&uuid, AccountOutcome::RemovedStaleType { uuid: uuid.clone() })
                .await;
        }

        if !self.policy.online {
            *offline = true;
            return AccountOutcome::Kept { uuid };
        }

        match self.authenticator.verify(account).await {
            VerifyOutcome::Rejected { reason, message } => {
                warn!(uuid = %uuid, reason = %reason, message = %message, "Session rejected");
                self.remove(
                    &uuid,
                    AccountOutcome::RemovedRejected {
                        uuid: uuid.clone(),
                        reason,
                        message,
                    },
                )
                .await
            }
            VerifyOutcome::Unreachable { message } => {
                if !*offline {
                    warn!(message = %message, "Authentication server unreachable, keeping cached accounts");
                }
                *offline = true;
                AccountOutcome::Kept { uuid }
            }
            VerifyOutcome::Refreshed(profile) => {
                if self.policy.require_verified_email && !profile.user_info.verified {
                    warn!(uuid = %uuid, "Email not verified, removing account");
                    return self
                        .remove(&uuid, AccountOutcome::RemovedUnverified { uuid: uuid.clone() })
                        .await;
                }

                let refreshed = profile.merge_into(account);
                match self.lifecycle.refresh(&refreshed).await {
                    Ok(()) => AccountOutcome::Refreshed {
                        uuid,
                        name: refreshed.name,
                    },
                    Err(e) => store_failure(uuid, e),
                }
            }
        }
    }

    async fn remove(&self, uuid: &str, outcome: AccountOutcome) -> AccountOutcome {
        match self.lifecycle.remove(uuid).await {
            // Already gone, the decision stands.
            Ok(_) | Err(AccountError::UnknownAccount(_)) => outcome,
            Err(e) => store_failure(uuid.to_string(), e),
        }
    }

    async fn finalize(&self) -> (Option<String>, SessionState) {
        let selected = match self.lifecycle.ensure_selection().await {
            Ok(selected) => selected,
            Err(e) => {
                error!(error = %e, "Failed to repair selection");
                None
            }
        };

        let state = match self.lifecycle.session_state().await {
            Ok(state) => state,
            Err(e) => {
                error!(error = %e, "Failed to count accounts");
                if selected.is_some() {
                    SessionState::Ready
                } else {
                    SessionState::NoAccounts
                }
            }
        };

        (selected, state)
    }
}

fn store_failure(uuid: String, error: AccountError) -> AccountOutcome {
    error!(uuid = %uuid, error = %error, "Store failure during reconciliation");
    AccountOutcome::StoreFailure {
        uuid,
        message: error.to_string(),
    }
}
