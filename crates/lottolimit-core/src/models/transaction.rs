use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{LimitCategory, LimitRecord};

/// Server-assigned transaction id; numeric or textual depending on the backend store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(untagged)]
pub enum TransactionId {
    Number(i64),
    Text(String),
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionId::Number(n) => write!(f, "{}", n),
            TransactionId::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for TransactionId {
    fn from(s: &str) -> Self {
        s.parse::<i64>()
            .map(TransactionId::Number)
            .unwrap_or_else(|_| TransactionId::Text(s.to_string()))
    }
}

/// One entry of the append-only activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TransactionId>,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub category: LimitCategory,
    pub number: String,
    /// Amount added by this entry.
    pub amount: f64,
    /// Accumulated amount for the number after this entry.
    pub total_amount: f64,
    pub limit: f64,
}

/// Body for appending to the log; the service assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub category: LimitCategory,
    pub number: String,
    pub amount: f64,
    pub total_amount: f64,
    pub limit: f64,
}

impl NewTransaction {
    /// Log entry for `amount` just added to `record` (already updated).
    pub fn for_bet(category: LimitCategory, number: &str, amount: f64, record: &LimitRecord, date: DateTime<Utc>) -> Self {
        Self {
            date,
            category,
            number: number.to_string(),
            amount,
            total_amount: record.amount,
            limit: record.limit,
        }
    }
}
