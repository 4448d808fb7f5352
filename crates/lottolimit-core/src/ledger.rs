//! Bet bookkeeping on top of `LimitStore`.
//!
//! Each operation is a read-modify-write against the service: read the
//! current table, adjust one or more records, write them back, and for bets
//! append an entry to the transaction log. Tables are read without the
//! fallback so an outage can never be written back as an empty table.

use anyhow::{bail, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::api::Transport;
use crate::models::{normalize_number, LimitCategory, LimitRecord, LimitStatus, LimitTable, NewTransaction, Settings};
use crate::store::LimitStore;

/// Result of recording one bet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BetOutcome {
    pub category: LimitCategory,
    pub number: String,
    pub added: f64,
    pub record: LimitRecord,
    pub percent: f64,
    pub status: LimitStatus,
    /// The number is at or past the alert threshold after this bet.
    pub alert: bool,
}

fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        bail!("Amount must be a positive number, got {}", amount);
    }
    Ok(())
}

fn validate_limit(limit: f64) -> Result<()> {
    if !limit.is_finite() || limit < 0.0 {
        bail!("Limit must be zero or more, got {}", limit);
    }
    Ok(())
}

/// Add `amount` to `number` and log it.
///
/// A number with no record yet starts from the category's default limit.
pub async fn record_bet<T: Transport>(
    store: &LimitStore<T>,
    category: LimitCategory,
    number: &str,
    amount: f64,
) -> Result<BetOutcome> {
    let number = normalize_number(category, number)?;
    validate_amount(amount)?;

    let table = store.try_limits(category).await?;
    let settings = store.settings().await;

    let mut record = table
        .get(&number)
        .copied()
        .unwrap_or_else(|| LimitRecord::new(category.default_limit(&settings), 0.0));
    record.amount += amount;

    store.update_limit(category, &number, record).await?;
    store
        .add_transaction(&NewTransaction::for_bet(category, &number, amount, &record, Utc::now()))
        .await?;

    let percent = record.percent();
    let status = LimitStatus::classify(percent, settings.alert_threshold);
    let alert = percent >= f64::from(settings.alert_threshold);
    if alert {
        warn!(category = %category, number = %number, percent = percent, "Number near limit");
    } else {
        info!(category = %category, number = %number, amount = amount, "Bet recorded");
    }

    Ok(BetOutcome {
        category,
        number,
        added: amount,
        record,
        percent,
        status,
        alert,
    })
}

/// Set the limit of one number, keeping whatever amount it already has.
pub async fn set_limit<T: Transport>(
    store: &LimitStore<T>,
    category: LimitCategory,
    number: &str,
    limit: f64,
) -> Result<LimitRecord> {
    let number = normalize_number(category, number)?;
    validate_limit(limit)?;

    let table = store.try_limits(category).await?;
    let amount = table.get(&number).map(|r| r.amount).unwrap_or(0.0);
    let record = LimitRecord::new(limit, amount);
    store.update_limit(category, &number, record).await?;
    Ok(record)
}

/// Every 2-digit number from 00 to 99.
pub fn two_digit_numbers() -> impl Iterator<Item = String> {
    (0..=99).map(|n| format!("{:02}", n))
}

/// Numbers a bulk edit touches: the full 00..99 range for 2-digit, which
/// is always displayed in full, and only the stored records for 3-digit.
fn bulk_numbers(category: LimitCategory, table: &LimitTable) -> Vec<String> {
    match category {
        LimitCategory::TwoDigit => two_digit_numbers().collect(),
        _ => table.keys().cloned().collect(),
    }
}

/// Give every number of `category` the same limit, keeping amounts.
pub async fn apply_default_limit<T: Transport>(
    store: &LimitStore<T>,
    category: LimitCategory,
    limit: f64,
) -> Result<usize> {
    validate_limit(limit)?;
    let table = store.try_limits(category).await?;

    let mut updated = 0;
    for number in bulk_numbers(category, &table) {
        let amount = table.get(&number).map(|r| r.amount).unwrap_or(0.0);
        store
            .update_limit(category, &number, LimitRecord::new(limit, amount))
            .await?;
        updated += 1;
    }
    info!(category = %category, limit = limit, updated = updated, "Applied limit to all numbers");
    Ok(updated)
}

/// Zero every amount of `category`, keeping limits.
pub async fn reset_amounts<T: Transport>(store: &LimitStore<T>, category: LimitCategory) -> Result<usize> {
    let table = store.try_limits(category).await?;
    // Unset 2-digit numbers are written with the configured default limit
    let fallback_limit = match category {
        LimitCategory::TwoDigit => category.default_limit(&store.try_settings().await?),
        _ => 0.0,
    };

    let mut updated = 0;
    for number in bulk_numbers(category, &table) {
        let limit = table.get(&number).map(|r| r.limit).unwrap_or(fallback_limit);
        store
            .update_limit(category, &number, LimitRecord::new(limit, 0.0))
            .await?;
        updated += 1;
    }
    info!(category = %category, updated = updated, "Reset all amounts");
    Ok(updated)
}

/// Read the settings, apply `edit`, and write them back. The read has no
/// fallback, so an outage aborts instead of saving default values.
pub async fn update_settings<T, F>(store: &LimitStore<T>, edit: F) -> Result<Settings>
where
    T: Transport,
    F: FnOnce(&mut Settings),
{
    let mut settings = store.try_settings().await?;
    edit(&mut settings);
    store.save_settings(&settings).await?;
    info!(alert_threshold = settings.alert_threshold, "Settings saved");
    Ok(settings)
}

/// Change a password after re-checking the current one.
pub async fn change_password<T: Transport>(
    store: &mut LimitStore<T>,
    username: &str,
    current: &str,
    new: &str,
) -> Result<()> {
    if new.is_empty() {
        bail!("New password must not be empty");
    }
    let check = store.login(username, current).await?;
    if !check.success {
        bail!("Current password is incorrect");
    }
    store.update_password(username, new).await?;
    info!(username = username, "Password changed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedTransport;
    use crate::api::{ApiClient, HttpMethod};
    use std::sync::Arc;

    fn store(transport: &Arc<ScriptedTransport>) -> LimitStore<Arc<ScriptedTransport>> {
        LimitStore::new(ApiClient::with_transport(transport.clone(), "http://limits.test"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_bet_on_new_number_uses_default_limit() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(200, "{}");
        transport.push_ok(200, r#"{"alertThreshold":80,"defaultLimit3DigitTode":3000}"#);
        transport.push_ok(200, r#"{"success":true}"#);
        transport.push_ok(200, r#"{"success":true}"#);
        let store = store(&transport);

        let outcome = record_bet(&store, LimitCategory::ThreeDigitTode, "7", 150.0).await.unwrap();

        assert_eq!(outcome.number, "007");
        assert_eq!(outcome.record, LimitRecord::new(3000.0, 150.0));
        assert_eq!(outcome.status, LimitStatus::Safe);
        assert!(!outcome.alert);

        let requests = transport.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[2].method, HttpMethod::Put);
        assert_eq!(requests[2].url, "http://limits.test/api/limits/3digit-tode/007");
        assert_eq!(requests[3].method, HttpMethod::Post);
        let logged: serde_json::Value = serde_json::from_str(requests[3].body.as_deref().unwrap()).unwrap();
        assert_eq!(logged["type"], "3digit-tode");
        assert_eq!(logged["totalAmount"], 150.0);
        assert_eq!(logged["limit"], 3000.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_bet_flags_alert() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(200, r#"{"07":{"limit":5000,"amount":3900}}"#);
        transport.push_ok(200, r#"{"alertThreshold":80}"#);
        transport.push_ok(200, "");
        transport.push_ok(200, "");
        let store = store(&transport);

        let outcome = record_bet(&store, LimitCategory::TwoDigit, "07", 250.0).await.unwrap();

        assert_eq!(outcome.record.amount, 4150.0);
        assert_eq!(outcome.percent, 83.0);
        assert_eq!(outcome.status, LimitStatus::Warning);
        assert!(outcome.alert);
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_bet_aborts_when_table_unreadable() {
        let transport = Arc::new(ScriptedTransport::new());
        for _ in 0..3 {
            transport.push_ok(500, "");
        }
        let store = store(&transport);

        assert!(record_bet(&store, LimitCategory::TwoDigit, "07", 10.0).await.is_err());
        // Nothing written after the failed read
        assert!(transport.requests().iter().all(|r| r.method == HttpMethod::Get));
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_bet_validates_input() {
        let transport = Arc::new(ScriptedTransport::new());
        let store = store(&transport);

        assert!(record_bet(&store, LimitCategory::TwoDigit, "abc", 10.0).await.is_err());
        assert!(record_bet(&store, LimitCategory::TwoDigit, "07", 0.0).await.is_err());
        assert!(record_bet(&store, LimitCategory::TwoDigit, "07", f64::NAN).await.is_err());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_limit_keeps_amount() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(200, r#"{"123":{"limit":2000,"amount":700}}"#);
        transport.push_ok(200, "");
        let store = store(&transport);

        let record = set_limit(&store, LimitCategory::ThreeDigitTeng, "123", 2500.0).await.unwrap();
        assert_eq!(record, LimitRecord::new(2500.0, 700.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_default_limit_writes_every_number() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(200, r#"{"42":{"limit":1000,"amount":300}}"#);
        for _ in 0..100 {
            transport.push_ok(200, "");
        }
        let store = store(&transport);

        let updated = apply_default_limit(&store, LimitCategory::TwoDigit, 4000.0).await.unwrap();

        assert_eq!(updated, 100);
        let requests = transport.requests();
        assert_eq!(requests.len(), 101);
        assert_eq!(requests[1].url, "http://limits.test/api/limits/2digit/00");
        assert_eq!(requests[43].url, "http://limits.test/api/limits/2digit/42");
        assert_eq!(requests[43].body.as_deref(), Some(r#"{"amount":300.0,"limit":4000.0}"#));
        assert_eq!(requests[100].url, "http://limits.test/api/limits/2digit/99");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_amounts_keeps_limits() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(200, r#"{"00":{"limit":1234,"amount":300}}"#);
        transport.push_ok(200, r#"{"defaultLimit2Digit":5000}"#);
        for _ in 0..100 {
            transport.push_ok(200, "");
        }
        let store = store(&transport);

        reset_amounts(&store, LimitCategory::TwoDigit).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[2].body.as_deref(), Some(r#"{"amount":0.0,"limit":1234.0}"#));
        assert_eq!(requests[3].body.as_deref(), Some(r#"{"amount":0.0,"limit":5000.0}"#));
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_default_limit_to_stored_tode_numbers() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(200, r#"{"123":{"limit":3000,"amount":450},"908":{"limit":1000,"amount":0}}"#);
        transport.push_ok(200, "");
        transport.push_ok(200, "");
        let store = store(&transport);

        let updated = apply_default_limit(&store, LimitCategory::ThreeDigitTode, 2500.0).await.unwrap();

        assert_eq!(updated, 2);
        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].url, "http://limits.test/api/limits/3digit-tode/123");
        assert_eq!(requests[1].body.as_deref(), Some(r#"{"amount":450.0,"limit":2500.0}"#));
        assert_eq!(requests[2].url, "http://limits.test/api/limits/3digit-tode/908");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_teng_amounts_touches_only_stored_numbers() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(200, r#"{"456":{"limit":2000,"amount":1900}}"#);
        transport.push_ok(200, "");
        let store = store(&transport);

        let updated = reset_amounts(&store, LimitCategory::ThreeDigitTeng).await.unwrap();

        assert_eq!(updated, 1);
        let requests = transport.requests();
        // No settings read for 3-digit tables
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].url, "http://limits.test/api/limits/3digit-teng/456");
        assert_eq!(requests[1].body.as_deref(), Some(r#"{"amount":0.0,"limit":2000.0}"#));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bulk_edit_of_empty_tode_table_writes_nothing() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(200, "{}");
        let store = store(&transport);

        assert_eq!(reset_amounts(&store, LimitCategory::ThreeDigitTode).await.unwrap(), 0);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_settings_keeps_other_fields() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(
            200,
            r#"{"alertThreshold":80,"defaultLimit2Digit":7000,"defaultLimit3DigitTode":4000,"defaultLimit3DigitTeng":2500}"#,
        );
        transport.push_ok(200, r#"{"success":true}"#);
        let store = store(&transport);

        let saved = update_settings(&store, |s| s.alert_threshold = 90).await.unwrap();

        assert_eq!(saved.alert_threshold, 90);
        assert_eq!(saved.default_limit_2digit, 7000.0);
        let requests = transport.requests();
        assert_eq!(requests[1].method, HttpMethod::Put);
        let body: serde_json::Value = serde_json::from_str(requests[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["alertThreshold"], 90);
        assert_eq!(body["defaultLimit3DigitTode"], 4000.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_settings_aborts_when_settings_unreadable() {
        let transport = Arc::new(ScriptedTransport::new());
        for _ in 0..3 {
            transport.push_ok(503, "");
        }
        transport.push_ok(200, r#"{"success":true}"#);
        let store = store(&transport);

        assert!(update_settings(&store, |s| s.alert_threshold = 90).await.is_err());
        assert_eq!(transport.call_count(), 3);
        assert!(transport.requests().iter().all(|r| r.method == HttpMethod::Get));
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_password_requires_current() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(200, r#"{"success":false}"#);
        let mut store = store(&transport);

        let err = change_password(&mut store, "staff1", "wrong", "new").await.unwrap_err();
        assert!(err.to_string().contains("incorrect"));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_password_rejected_current_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(401, r#"{"success":false,"message":"bad password"}"#);
        transport.push_ok(200, r#"{"success":true}"#);
        let mut store = store(&transport);

        assert!(change_password(&mut store, "staff1", "wrong", "new").await.is_err());
        assert_eq!(transport.call_count(), 1);
    }

    #[test]
    fn test_two_digit_numbers() {
        let numbers: Vec<String> = two_digit_numbers().collect();
        assert_eq!(numbers.len(), 100);
        assert_eq!(numbers[0], "00");
        assert_eq!(numbers[99], "99");
    }
}
