//! # azlaunch-auth
//!
//! Authentication provider abstraction for azlaunch.
//!
//! This crate provides:
//! - The `Authenticator` trait used to revalidate cached accounts and log in
//! - Typed outcomes so provider failures never surface as errors
//! - `AzAuthClient`, the Azuriom AZauth implementation

pub mod azauth;
pub mod traits;

pub use azauth::AzAuthClient;
pub use traits::{AuthProfile, Authenticator, LoginOutcome, RejectReason, VerifyOutcome};
