//! # azlaunch-accounts
//!
//! Account management for azlaunch.
//!
//! This crate provides:
//! - `SessionLifecycle`: the account list, the selection pointer and the
//!   mutations that keep the pointer valid
//! - `AccountReconciler`: startup revalidation of cached accounts
//! - `LoginFlow`: credential login that stores and selects the new account
//! - `SettingsStore`: RAM, screen, launcher and Java settings
//! - `LaunchOptions`: what the external launch engine receives

pub mod error;
pub mod launch;
pub mod lifecycle;
pub mod login;
pub mod reconcile;
pub mod settings;

pub use error::{AccountError, Result};
pub use launch::{LaunchOptions, Memory};
pub use lifecycle::{SessionLifecycle, SessionState};
pub use login::{LoginFlow, LoginResult};
pub use reconcile::{
    AccountOutcome, AccountReconciler, ReconcilePolicy, ReconcileReport, ReconcileState,
};
pub use settings::SettingsStore;
