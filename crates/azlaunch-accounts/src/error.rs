//! Error types for account management.

use thiserror::Error;

use azlaunch_store::StoreError;

/// Errors returned by the account lifecycle, login flow and settings facade.
#[derive(Error, Debug)]
pub enum AccountError {
    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Account {uuid} was not issued by the AZauth server")]
    UnsupportedAuthType { uuid: String },

    #[error("No account is selected")]
    NoSelectedAccount,

    #[error("Both an identifier and a password are required")]
    MissingCredentials,

    #[error("Invalid value for {field}: {message}")]
    InvalidSetting { field: String, message: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AccountError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        AccountError::InvalidSetting {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AccountError>;
