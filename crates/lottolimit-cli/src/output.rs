//! Plain-text rendering of command results.

use anyhow::Result;
use lottolimit_core::ledger::BetOutcome;
use lottolimit_core::models::{LimitCategory, LimitStatus, LimitTable, Settings, Transaction, User};
use lottolimit_core::store::Overview;
use lottolimit_core::utils::{format_amount, format_date, format_percent, truncate_string};
use serde::Serialize;

/// Rows shown per section on the dashboard
const DASHBOARD_ROWS: usize = 10;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_overview(overview: &Overview) {
    let threshold = overview.settings.alert_threshold;

    println!("Totals");
    for (category, table) in overview.tables() {
        println!(
            "  {:<14} {:>14}  ({} numbers)",
            category.label(),
            format_amount(overview.total_amount(category)),
            table.len()
        );
    }

    let alerts = overview.alerts();
    println!();
    if alerts.is_empty() {
        println!("No numbers at or above {}%", threshold);
    } else {
        println!("Alerts (threshold {}%)", threshold);
        for alert in alerts.iter().take(DASHBOARD_ROWS) {
            println!(
                "  {:<14} {:>4}  {:>8}  {:>12} / {:<12} {}",
                alert.category.label(),
                alert.number,
                format_percent(alert.percent),
                format_amount(alert.amount),
                format_amount(alert.limit),
                alert.status().label()
            );
        }
        if alerts.len() > DASHBOARD_ROWS {
            println!("  ... and {} more", alerts.len() - DASHBOARD_ROWS);
        }
    }

    let active = overview.active_entries();
    if !active.is_empty() {
        println!();
        println!("Top amounts");
        for entry in active.iter().take(DASHBOARD_ROWS) {
            println!(
                "  {:<14} {:>4}  {:>12} / {:<12} {:>8}",
                entry.category.label(),
                entry.number,
                format_amount(entry.record.amount),
                format_amount(entry.record.limit),
                format_percent(entry.record.percent())
            );
        }
    }
}

pub fn print_limit_table(category: LimitCategory, table: &LimitTable, threshold: u32) {
    if table.is_empty() {
        println!("No {} numbers match", category.label());
        return;
    }

    println!(
        "{:<6} {:>12} {:>12} {:>12} {:>8}  {}",
        "Number", "Amount", "Limit", "Remaining", "Used", "Status"
    );
    for (number, record) in table {
        let percent = record.percent();
        println!(
            "{:<6} {:>12} {:>12} {:>12} {:>8}  {}",
            number,
            format_amount(record.amount),
            format_amount(record.limit),
            format_amount(record.remaining()),
            format_percent(percent),
            LimitStatus::classify(percent, threshold).label()
        );
    }
}

pub fn print_bet(outcome: &BetOutcome) {
    println!(
        "Recorded {} on {} {}: {} of {} ({})",
        format_amount(outcome.added),
        outcome.category.label(),
        outcome.number,
        format_amount(outcome.record.amount),
        format_amount(outcome.record.limit),
        format_percent(outcome.percent)
    );
    if outcome.alert {
        println!("Warning: {} {} is {}", outcome.category.label(), outcome.number, outcome.status.label());
    }
}

pub fn print_transactions(transactions: &[Transaction]) {
    if transactions.is_empty() {
        println!("No transactions");
        return;
    }

    println!(
        "{:<12} {:<16} {:<14} {:>6} {:>12} {:>12} {:>12}",
        "Id", "Date", "Category", "Number", "Amount", "Total", "Limit"
    );
    for tx in transactions {
        let id = tx.id.as_ref().map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<12} {:<16} {:<14} {:>6} {:>12} {:>12} {:>12}",
            truncate_string(&id, 12),
            format_date(&tx.date),
            tx.category.label(),
            tx.number,
            format_amount(tx.amount),
            format_amount(tx.total_amount),
            format_amount(tx.limit)
        );
    }
}

pub fn print_settings(settings: &Settings) {
    println!("Alert threshold:      {}%", settings.alert_threshold);
    for category in LimitCategory::ALL {
        println!(
            "Default {:<13} {}",
            format!("{}:", category.label()),
            format_amount(category.default_limit(settings))
        );
    }
}

pub fn print_users(users: &[User]) {
    if users.is_empty() {
        println!("No users");
        return;
    }
    println!("{:<24} {}", "Username", "Created");
    for user in users {
        let name = if user.is_admin() {
            format!("{} (admin)", user.username)
        } else {
            user.username.clone()
        };
        println!("{:<24} {}", truncate_string(&name, 24), user.created_display());
    }
}
