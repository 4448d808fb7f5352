// Allow dead code: API response structs have fields for completeness
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the built-in account the service refuses to delete.
pub const ADMIN_USERNAME: &str = "admin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.username == ADMIN_USERNAME
    }

    pub fn created_display(&self) -> String {
        self.created_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    pub token: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl LoginResponse {
    pub fn failure_reason(&self) -> &str {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or("Invalid username or password")
    }
}

/// Acknowledgement returned by write endpoints. Every field is optional
/// because several endpoints answer with an empty body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MutationResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
}

impl MutationResponse {
    /// Only an explicit `success: false` counts as a rejection.
    pub fn is_rejected(&self) -> bool {
        self.success == Some(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_created_display() {
        let user: User = serde_json::from_str(r#"{"username":"staff1","createdAt":"2026-01-05T10:00:00Z"}"#).unwrap();
        assert_eq!(user.created_display(), "2026-01-05");
        assert!(!user.is_admin());

        let admin: User = serde_json::from_str(r#"{"username":"admin"}"#).unwrap();
        assert_eq!(admin.created_display(), "-");
        assert!(admin.is_admin());
    }

    #[test]
    fn test_mutation_rejection() {
        let rejected: MutationResponse = serde_json::from_str(r#"{"success":false,"message":"exists"}"#).unwrap();
        assert!(rejected.is_rejected());
        assert!(!MutationResponse::default().is_rejected());
    }
}
