//! Error types for azlaunch.
//!
//! Structured errors with recovery suggestions, shared by the binary and the
//! library crates that need to report authentication problems.

use thiserror::Error;

/// Result type alias using the azlaunch [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for azlaunch.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication error with structured details
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Local record store error
    #[error("Store error: {0}")]
    Store(String),

    /// Account management error
    #[error("Account error: {0}")]
    Account(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Error::Config(_) => Some("Check your config file at ~/.config/azlaunch/config.toml"),
            Error::Auth(e) => e.recovery_suggestion(),
            Error::Store(_) => Some("Run 'azlaunch doctor' to check the data directory"),
            Error::NotFound(_) => Some("Use 'azlaunch accounts list' to see stored accounts"),
            _ => None,
        }
    }
}

/// Authentication errors reported by the AZauth provider or the transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No authentication server configured
    #[error("No authentication server is configured")]
    NotConfigured,

    /// The provider rejected the stored session or credentials
    #[error("Authentication failed for {uuid}: {message}")]
    AuthenticationFailed { uuid: String, message: String },

    /// The provider accepted the account but it has not verified its email
    #[error("Account {uuid} must verify its email address before use")]
    VerificationRequired { uuid: String },

    /// The provider could not be reached
    #[error("Authentication server unreachable: {message}")]
    NetworkUnavailable { message: String },

    /// Timeout
    #[error("Request to the authentication server timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The user is banned on the server
    #[error("This account is banned")]
    UserBanned,

    /// Wrong identifier or password
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Wrong second factor code
    #[error("Invalid two-factor code")]
    InvalidTwoFactor,
}

impl AuthError {
    /// Get a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            AuthError::NotConfigured => Some("Set auth.url in ~/.config/azlaunch/config.toml"),
            AuthError::AuthenticationFailed { .. } => Some("Log in again with 'azlaunch accounts login'"),
            AuthError::VerificationRequired { .. } => {
                Some("Confirm the email sent by the server, then log in again")
            }
            AuthError::NetworkUnavailable { .. } => Some("Check your internet connection"),
            AuthError::Timeout { .. } => Some("The server is slow to answer. Try again later"),
            AuthError::InvalidTwoFactor => Some("Use the current code from your authenticator app"),
            AuthError::InvalidCredentials => Some("Reset your password on the server website"),
            AuthError::UserBanned => None,
        }
    }

    /// Whether this error reflects connectivity rather than the account itself.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuthError::NetworkUnavailable { .. } | AuthError::Timeout { .. }
        )
    }
}

/// Format an error with its recovery suggestion.
pub fn format_error_with_suggestion(error: &Error) -> String {
    let mut output = error.to_string();
    if let Some(suggestion) = error.recovery_suggestion() {
        output.push_str(&format!("\n  Suggestion: {}", suggestion));
    }
    output
}
