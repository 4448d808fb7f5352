//! Authentication module for managing the signed-in user.
//!
//! This module provides `Session`: who is signed in and the bearer token the
//! service issued, persisted to disk so the CLI stays signed in between runs.
//! Sessions expire 24 hours after login.

pub mod session;

pub use session::{Session, SessionData};
