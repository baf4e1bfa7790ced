//! # azlaunch-core
//!
//! Core types and abstractions for azlaunch, the AZauth game launcher.
//!
//! This crate provides:
//! - Account records as they are persisted locally
//! - Singleton settings records (RAM, screen, launcher, Java) and the selection pointer
//! - Configuration system
//! - Common error types

pub mod account;
pub mod config;
pub mod error;
pub mod settings;

pub use account::{Account, AccountMeta, AuthType, Role, UserInfo};
pub use config::Config;
pub use error::{AuthError, Error, Result};
pub use settings::{
    CloseBehavior, JavaArgs, JavaPath, LauncherOptions, LauncherSettings, RamSettings,
    Resolution, ScreenSettings, SelectionPointer, SENTINEL_ID,
};
