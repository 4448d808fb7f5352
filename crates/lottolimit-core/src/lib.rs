//! Core library for lottolimit.
//!
//! Talks to the remote limits service through a retrying, caching
//! [`api::ApiClient`] and exposes a degrading data-access facade in
//! [`store::LimitStore`]. Bet bookkeeping built on top of the facade lives
//! in [`ledger`].

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod ledger;
pub mod models;
pub mod store;
pub mod utils;

pub use api::{ApiClient, ApiError, HttpMethod, RequestOptions, RetryPolicy};
pub use config::Config;
pub use store::LimitStore;
