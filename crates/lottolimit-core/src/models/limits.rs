use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Settings;

/// The three bet categories, each tracked as its own record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum LimitCategory {
    #[serde(rename = "2digit")]
    TwoDigit,
    #[serde(rename = "3digit-tode")]
    ThreeDigitTode,
    #[serde(rename = "3digit-teng")]
    ThreeDigitTeng,
}

impl LimitCategory {
    pub const ALL: [LimitCategory; 3] = [
        LimitCategory::TwoDigit,
        LimitCategory::ThreeDigitTode,
        LimitCategory::ThreeDigitTeng,
    ];

    /// Path segment under `/api/limits/`, also the wire name in transactions.
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitCategory::TwoDigit => "2digit",
            LimitCategory::ThreeDigitTode => "3digit-tode",
            LimitCategory::ThreeDigitTeng => "3digit-teng",
        }
    }

    /// Number of digits in a key of this category.
    pub fn width(&self) -> usize {
        match self {
            LimitCategory::TwoDigit => 2,
            LimitCategory::ThreeDigitTode | LimitCategory::ThreeDigitTeng => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LimitCategory::TwoDigit => "2-digit",
            LimitCategory::ThreeDigitTode => "3-digit tode",
            LimitCategory::ThreeDigitTeng => "3-digit teng",
        }
    }

    /// The service only allows deleting single 3-digit records.
    pub fn supports_delete(&self) -> bool {
        !matches!(self, LimitCategory::TwoDigit)
    }

    pub fn default_limit(&self, settings: &Settings) -> f64 {
        match self {
            LimitCategory::TwoDigit => settings.default_limit_2digit,
            LimitCategory::ThreeDigitTode => settings.default_limit_3digit_tode,
            LimitCategory::ThreeDigitTeng => settings.default_limit_3digit_teng,
        }
    }

    pub fn collection_path(&self) -> String {
        format!("/api/limits/{}", self.as_str())
    }

    pub fn record_path(&self, number: &str) -> String {
        format!("/api/limits/{}/{}", self.as_str(), number)
    }
}

impl fmt::Display for LimitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LimitCategory {
    type Err = NumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "2digit" | "2" | "two" => Ok(LimitCategory::TwoDigit),
            "3digit-tode" | "tode" => Ok(LimitCategory::ThreeDigitTode),
            "3digit-teng" | "teng" => Ok(LimitCategory::ThreeDigitTeng),
            other => Err(NumberError::UnknownCategory(other.to_string())),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NumberError {
    #[error("Number is empty")]
    Empty,

    #[error("'{input}' is not a {width}-digit number")]
    Invalid { input: String, width: usize },

    #[error("Unknown category '{0}' (expected 2digit, 3digit-tode or 3digit-teng)")]
    UnknownCategory(String),
}

/// Validate user input as a key of `category`, left-padding with zeros.
///
/// "7" becomes "07" for 2-digit and "007" for 3-digit categories. Anything
/// with non-digits or more digits than the category width is rejected.
pub fn normalize_number(category: LimitCategory, input: &str) -> Result<String, NumberError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(NumberError::Empty);
    }

    let width = category.width();
    if trimmed.len() > width || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(NumberError::Invalid {
            input: trimmed.to_string(),
            width,
        });
    }

    Ok(format!("{:0>width$}", trimmed, width = width))
}

/// Accumulated amount against a configured ceiling for one number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LimitRecord {
    #[serde(default)]
    pub limit: f64,
    #[serde(default)]
    pub amount: f64,
}

impl LimitRecord {
    pub fn new(limit: f64, amount: f64) -> Self {
        Self { limit, amount }
    }

    pub fn percent(&self) -> f64 {
        super::usage_percent(self.amount, self.limit)
    }

    pub fn remaining(&self) -> f64 {
        (self.limit - self.amount).max(0.0)
    }
}

/// All records of one category keyed by fixed-width number string.
pub type LimitTable = BTreeMap<String, LimitRecord>;
