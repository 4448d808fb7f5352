//! Short-lived in-memory response cache.
//!
//! This module provides the `ResponseCache` used by the API client to
//! serve repeated reads without touching the network. Entries expire after
//! 5 seconds and the whole cache is dropped on any successful write.
//!
//! Time comes from a `Clock` so expiry can be driven by hand in tests.

pub mod clock;
pub mod response;

pub use clock::{Clock, ManualClock, SystemClock};
pub use response::{ResponseCache, CACHE_TTL};
