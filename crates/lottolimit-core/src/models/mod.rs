//! Data models for the limits service.
//!
//! This module contains the record types exchanged with the remote
//! service, one per endpoint family:
//!
//! - `LimitCategory`, `LimitRecord`, `LimitTable`: per-number limits and amounts
//! - `Settings`: alert threshold and default limits
//! - `Transaction`: entries in the activity log
//! - `User`, `LoginResponse`: account management
//! - `Snapshot`: full-state export/import body
//!
//! `status` holds the percent-of-limit and alert helpers computed from them.

pub mod limits;
pub mod settings;
pub mod snapshot;
pub mod status;
pub mod transaction;
pub mod user;

pub use limits::{normalize_number, LimitCategory, LimitRecord, LimitTable, NumberError};
pub use settings::Settings;
pub use snapshot::{DbInfo, Snapshot};
pub use status::{active_entries, collect_alerts, filter_table, usage_percent, Alert, LimitEntry, LimitStatus, StatusFilter};
pub use transaction::{NewTransaction, Transaction, TransactionId};
pub use user::{LoginResponse, MutationResponse, User};
