use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{LimitTable, Settings, Transaction, User};

/// Full-state body of `/api/export` and `/api/import`.
///
/// Fields this client does not know about are carried through untouched and
/// empty known fields are omitted, so an export re-imports losslessly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default, rename = "limits2Digit", skip_serializing_if = "BTreeMap::is_empty")]
    pub limits_2digit: LimitTable,
    #[serde(default, rename = "limits3DigitTode", skip_serializing_if = "BTreeMap::is_empty")]
    pub limits_3digit_tode: LimitTable,
    #[serde(default, rename = "limits3DigitTeng", skip_serializing_if = "BTreeMap::is_empty")]
    pub limits_3digit_teng: LimitTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transactions: Vec<Transaction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<User>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Snapshot {
    pub fn record_count(&self) -> usize {
        self.limits_2digit.len() + self.limits_3digit_tode.len() + self.limits_3digit_teng.len()
    }
}

/// Whatever `/api/db-info` reports about the backing store.
pub type DbInfo = BTreeMap<String, Value>;
