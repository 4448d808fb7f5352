//! Percent-of-limit classification and alert collection.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::Serialize;

use super::{LimitCategory, LimitRecord, LimitTable};

/// Share of `limit` already taken by `amount`, in percent. Zero when no limit is set.
pub fn usage_percent(amount: f64, limit: f64) -> f64 {
    if limit > 0.0 {
        amount / limit * 100.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitStatus {
    Safe,
    Warning,
    Over,
}

impl LimitStatus {
    /// `Over` at or past 100 %, `Warning` at or past the alert threshold.
    pub fn classify(percent: f64, alert_threshold: u32) -> Self {
        if percent >= 100.0 {
            LimitStatus::Over
        } else if percent >= f64::from(alert_threshold) {
            LimitStatus::Warning
        } else {
            LimitStatus::Safe
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LimitStatus::Safe => "OK",
            LimitStatus::Warning => "NEAR LIMIT",
            LimitStatus::Over => "OVER LIMIT",
        }
    }
}

/// Row filter for table listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    /// Any amount taken at all
    HasAmount,
    NearLimit,
    OverLimit,
}

impl StatusFilter {
    pub fn matches(&self, record: &LimitRecord, alert_threshold: u32) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::HasAmount => record.amount != 0.0,
            StatusFilter::NearLimit => record.percent() >= f64::from(alert_threshold),
            StatusFilter::OverLimit => record.percent() >= 100.0,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            "has-amount" | "active" => Ok(StatusFilter::HasAmount),
            "near-limit" | "near" => Ok(StatusFilter::NearLimit),
            "over-limit" | "over" => Ok(StatusFilter::OverLimit),
            other => Err(format!(
                "unknown filter '{}' (expected all, has-amount, near-limit or over-limit)",
                other
            )),
        }
    }
}

/// Rows of `table` passing `filter` whose number contains `search`.
/// An empty search matches every number.
pub fn filter_table(table: &LimitTable, filter: StatusFilter, search: &str, alert_threshold: u32) -> LimitTable {
    let search = search.trim();
    table
        .iter()
        .filter(|(number, _)| number.contains(search))
        .filter(|(_, record)| filter.matches(record, alert_threshold))
        .map(|(number, record)| (number.clone(), *record))
        .collect()
}

/// A number at or above the alert threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub category: LimitCategory,
    pub number: String,
    pub percent: f64,
    pub amount: f64,
    pub limit: f64,
}

impl Alert {
    pub fn status(&self) -> LimitStatus {
        if self.percent >= 100.0 {
            LimitStatus::Over
        } else {
            LimitStatus::Warning
        }
    }
}

/// A number that has taken any amount at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitEntry {
    pub category: LimitCategory,
    pub number: String,
    pub record: LimitRecord,
}

/// Every record at or above `alert_threshold`, highest percent first.
pub fn collect_alerts<'a, I>(tables: I, alert_threshold: u32) -> Vec<Alert>
where
    I: IntoIterator<Item = (LimitCategory, &'a LimitTable)>,
{
    let threshold = f64::from(alert_threshold);
    let mut alerts: Vec<Alert> = tables
        .into_iter()
        .flat_map(|(category, table)| {
            table.iter().filter_map(move |(number, record)| {
                let percent = record.percent();
                (percent >= threshold).then(|| Alert {
                    category,
                    number: number.clone(),
                    percent,
                    amount: record.amount,
                    limit: record.limit,
                })
            })
        })
        .collect();

    alerts.sort_by(|a, b| b.percent.partial_cmp(&a.percent).unwrap_or(Ordering::Equal));
    alerts
}

/// Every record with a positive amount, largest amount first.
pub fn active_entries<'a, I>(tables: I) -> Vec<LimitEntry>
where
    I: IntoIterator<Item = (LimitCategory, &'a LimitTable)>,
{
    let mut entries: Vec<LimitEntry> = tables
        .into_iter()
        .flat_map(|(category, table)| {
            table
                .iter()
                .filter(|(_, record)| record.amount > 0.0)
                .map(move |(number, record)| LimitEntry {
                    category,
                    number: number.clone(),
                    record: *record,
                })
        })
        .collect();

    entries.sort_by(|a, b| b.record.amount.partial_cmp(&a.record.amount).unwrap_or(Ordering::Equal));
    entries
}
