//! # azlaunch-store
//!
//! Local record store for azlaunch.
//!
//! This crate provides:
//! - Named collections of JSON records addressed by a derived 32-bit key
//! - The key derivation function shared with earlier launcher versions
//! - A SQLite-backed [`SqliteRecordStore`] with one transaction per call
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use azlaunch_store::{Collection, RecordStore, RecordStoreExt, SqliteRecordStore};
//!
//! let store = SqliteRecordStore::open_default()?;
//! store.add_json(Collection::Accounts, &account.uuid, &account).await?;
//! let cached: Vec<Account> = store.get_all_as(Collection::Accounts).await?;
//! ```
//!
//! ## Storage Architecture
//!
//! Records live in `~/.local/share/azlaunch/records.db`, one row per record,
//! ordered by insertion. Singleton collections (settings, selection pointer)
//! hold one record under the sentinel identifier `"1234"`.

pub mod collection;
pub mod key;
pub mod store;

pub use collection::Collection;
pub use key::{derive_key, RecordKey};
pub use store::{Record, RecordStore, RecordStoreExt, SqliteRecordStore, StoreError};
