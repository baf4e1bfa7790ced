//! CLI command implementations.

pub mod accounts;
pub mod config;
pub mod doctor;
pub mod launch;
pub mod reconcile;
pub mod settings;
