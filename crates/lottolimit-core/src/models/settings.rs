use serde::{Deserialize, Serialize};

/// Alert threshold used when the service has none.
pub const DEFAULT_ALERT_THRESHOLD: u32 = 80;
pub const DEFAULT_LIMIT_2DIGIT: f64 = 5000.0;
pub const DEFAULT_LIMIT_3DIGIT_TODE: f64 = 3000.0;
pub const DEFAULT_LIMIT_3DIGIT_TENG: f64 = 2000.0;

/// Dashboard-wide settings stored by the service.
///
/// `Default` is also the fallback record served when settings cannot be fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Percent of limit at which a number is flagged as near its limit.
    pub alert_threshold: u32,
    #[serde(rename = "defaultLimit2Digit")]
    pub default_limit_2digit: f64,
    #[serde(rename = "defaultLimit3DigitTode")]
    pub default_limit_3digit_tode: f64,
    #[serde(rename = "defaultLimit3DigitTeng")]
    pub default_limit_3digit_teng: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            default_limit_2digit: DEFAULT_LIMIT_2DIGIT,
            default_limit_3digit_tode: DEFAULT_LIMIT_3DIGIT_TODE,
            default_limit_3digit_teng: DEFAULT_LIMIT_3DIGIT_TENG,
        }
    }
}

impl Settings {
    /// Threshold must be a whole percent in 1..=100.
    pub fn is_valid_threshold(threshold: u32) -> bool {
        (1..=100).contains(&threshold)
    }
}
