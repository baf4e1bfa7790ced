//! Account list and selection management.
//!
//! [`SessionLifecycle`] owns every mutation of the `accounts` and
//! `accounts-selected` collections. After each public call the selection
//! pointer either names an existing account or is empty, and it is only empty
//! once [`SessionLifecycle::ensure_selection`] finds no account to pick.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use azlaunch_core::{Account, SelectionPointer, SENTINEL_ID};
use azlaunch_store::{Collection, Record, RecordStore, RecordStoreExt, StoreError};

use crate::error::{AccountError, Result};

/// Whether the user has anything to play with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No cached account; the user must log in
    NoAccounts,
    /// At least one account exists
    Ready,
}

/// Consumer-facing account list and selection.
pub struct SessionLifecycle {
    store: Arc<dyn RecordStore>,
    /// Serializes mutations of accounts and the pointer.
    gate: Mutex<()>,
    selection: watch::Sender<Option<String>>,
}

impl SessionLifecycle {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        let (selection, _) = watch::channel(None);
        Self {
            store,
            gate: Mutex::new(()),
            selection,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Watch the selected uuid. Every pointer write is broadcast.
    pub fn subscribe_selection(&self) -> watch::Receiver<Option<String>> {
        self.selection.subscribe()
    }

    /// All cached accounts in insertion order. Records that do not decode as
    /// an account are skipped.
    pub async fn accounts(&self) -> Result<Vec<Account>> {
        let records = self.store.get_all(Collection::Accounts).await?;
        Ok(records.iter().filter_map(decode_account).collect())
    }

    /// Raw account records in insertion order, decodable or not.
    pub async fn account_records(&self) -> Result<Vec<Record>> {
        Ok(self.store.get_all(Collection::Accounts).await?)
    }

    /// Look up one account by uuid.
    pub async fn account(&self, uuid: &str) -> Result<Option<Account>> {
        match self.record(uuid).await? {
            Some(record) => Ok(Some(record.decode()?)),
            None => Ok(None),
        }
    }

    /// The stored record for `uuid`.
    async fn record(&self, uuid: &str) -> Result<Option<Record>> {
        match self.store.get(Collection::Accounts, uuid).await? {
            // A key collision returns another identifier's record.
            Some(record) if record.identifier == uuid => Ok(Some(record)),
            _ => Ok(None),
        }
    }

    /// The selection pointer, created empty on first access.
    pub async fn pointer(&self) -> Result<SelectionPointer> {
        let _guard = self.gate.lock().await;
        self.load_pointer().await
    }

    /// Uuid named by the pointer, if any.
    pub async fn selected_uuid(&self) -> Result<Option<String>> {
        Ok(self.pointer().await?.selected)
    }

    /// The account the pointer names.
    pub async fn selected(&self) -> Result<Option<Account>> {
        match self.selected_uuid().await? {
            Some(uuid) => self.account(&uuid).await,
            None => Ok(None),
        }
    }

    /// Same as [`selected`](Self::selected).
    pub async fn current(&self) -> Result<Option<Account>> {
        self.selected().await
    }

    /// Point the selection at an existing account.
    pub async fn select(&self, uuid: &str) -> Result<Account> {
        let _guard = self.gate.lock().await;

        let account = self
            .account(uuid)
            .await?
            .ok_or_else(|| AccountError::UnknownAccount(uuid.to_string()))?;
        self.write_pointer(Some(uuid)).await?;

        info!(uuid = %uuid, name = %account.name, "Account selected");
        Ok(account)
    }

    /// Delete an account, including one whose record no longer decodes. When
    /// it was selected the pointer moves to the first remaining account, or is
    /// cleared. Returns the selection afterwards.
    pub async fn remove(&self, uuid: &str) -> Result<Option<String>> {
        let _guard = self.gate.lock().await;

        if self.record(uuid).await?.is_none() {
            return Err(AccountError::UnknownAccount(uuid.to_string()));
        }
        self.store.delete(Collection::Accounts, uuid).await?;

        let pointer = self.load_pointer().await?;
        if pointer.selected.as_deref() != Some(uuid) {
            debug!(uuid = %uuid, "Removed unselected account");
            return Ok(pointer.selected);
        }

        let next = self.first_account_uuid().await?;
        self.write_pointer(next.as_deref()).await?;
        info!(uuid = %uuid, next = ?next, "Removed selected account");
        Ok(next)
    }

    /// Store an account obtained from a login and select it. Logging in again
    /// with a cached account replaces its record.
    pub async fn add_from_login(&self, account: &Account) -> Result<()> {
        if !account.is_verified_provider() {
            return Err(AccountError::UnsupportedAuthType {
                uuid: account.uuid.clone(),
            });
        }

        let _guard = self.gate.lock().await;

        if self.record(&account.uuid).await?.is_some() {
            self.store
                .update_json(Collection::Accounts, &account.uuid, account)
                .await?;
        } else {
            self.store
                .add_json(Collection::Accounts, &account.uuid, account)
                .await?;
        }
        self.write_pointer(Some(&account.uuid)).await?;

        info!(uuid = %account.uuid, name = %account.name, "Account added");
        Ok(())
    }

    /// Replace the stored record of an account with refreshed data.
    pub async fn refresh(&self, account: &Account) -> Result<()> {
        let _guard = self.gate.lock().await;

        if self.record(&account.uuid).await?.is_none() {
            return Err(AccountError::UnknownAccount(account.uuid.clone()));
        }
        self.store
            .update_json(Collection::Accounts, &account.uuid, account)
            .await?;
        Ok(())
    }

    /// Repair a missing or stale pointer: keep a valid selection, otherwise
    /// pick the first account, otherwise clear it.
    pub async fn ensure_selection(&self) -> Result<Option<String>> {
        let _guard = self.gate.lock().await;

        let pointer = self.load_pointer().await?;
        if let Some(uuid) = pointer.selected.as_deref() {
            if self.record(uuid).await?.as_ref().and_then(decode_account).is_some() {
                self.selection.send_replace(pointer.selected.clone());
                return Ok(pointer.selected);
            }
            debug!(uuid = %uuid, "Selection points at a missing account");
        }

        let next = self.first_account_uuid().await?;
        if next != pointer.selected {
            self.write_pointer(next.as_deref()).await?;
        } else {
            self.selection.send_replace(next.clone());
        }
        Ok(next)
    }

    pub async fn session_state(&self) -> Result<SessionState> {
        if self.store.count(Collection::Accounts).await? == 0 {
            Ok(SessionState::NoAccounts)
        } else {
            Ok(SessionState::Ready)
        }
    }

    async fn first_account_uuid(&self) -> Result<Option<String>> {
        let records = self.store.get_all(Collection::Accounts).await?;
        Ok(records
            .iter()
            .find(|r| decode_account(r).is_some())
            .map(|r| r.identifier.clone()))
    }

    async fn load_pointer(&self) -> Result<SelectionPointer> {
        let existing: Option<SelectionPointer> = self
            .store
            .get_as(Collection::AccountsSelected, SENTINEL_ID)
            .await?;
        if let Some(pointer) = existing {
            return Ok(pointer);
        }

        let pointer = SelectionPointer::empty();
        match self
            .store
            .add_json(Collection::AccountsSelected, SENTINEL_ID, &pointer)
            .await
        {
            Ok(_) => Ok(pointer),
            // Created by another handle on the same database in the meantime.
            Err(StoreError::DuplicateKey { .. }) => Ok(self
                .store
                .get_as(Collection::AccountsSelected, SENTINEL_ID)
                .await?
                .unwrap_or_default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_pointer(&self, selected: Option<&str>) -> Result<()> {
        let pointer = match selected {
            Some(uuid) => SelectionPointer::pointing_at(uuid),
            None => SelectionPointer::empty(),
        };

        match self
            .store
            .update_json(Collection::AccountsSelected, SENTINEL_ID, &pointer)
            .await
        {
            Err(StoreError::NotFound { .. }) => {
                self.store
                    .add_json(Collection::AccountsSelected, SENTINEL_ID, &pointer)
                    .await?;
            }
            other => other?,
        }

        self.selection.send_replace(pointer.selected);
        Ok(())
    }
}

fn decode_account(record: &Record) -> Option<Account> {
    match record.decode() {
        Ok(account) => Some(account),
        Err(e) => {
            warn!(identifier = %record.identifier, error = %e, "Skipping undecodable account record");
            None
        }
    }
}
