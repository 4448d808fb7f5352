//! REST API client module for the limits service.
//!
//! This module provides the `ApiClient` for communicating with the
//! remote service that owns limits, settings, users and the transaction log.
//!
//! Every call goes through a retry loop with exponential backoff and a
//! short-lived read cache that is dropped wholesale on any successful write.

pub mod client;
pub mod error;
pub mod transport;

pub use client::{ApiClient, RequestOptions, RetryPolicy};
pub use error::ApiError;
pub use transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, Transport};

#[cfg(test)]
pub(crate) mod testing;
