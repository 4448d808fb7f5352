//! Command handlers. Each one signs in from the stored session, talks to the
//! service through `LimitStore`, and hands results to `output` for printing.

use std::path::Path;

use anyhow::{bail, Context as _, Result};
use lottolimit_core::api::ApiClient;
use lottolimit_core::auth::{Session, SessionData};
use lottolimit_core::ledger;
use lottolimit_core::models::{filter_table, LimitCategory, LimitRecord, Snapshot, StatusFilter, TransactionId};
use lottolimit_core::{Config, LimitStore};
use tracing::{info, warn};

use crate::output;

/// Environment variable read instead of prompting for a password
const PASSWORD_ENV: &str = "LOTTOLIMIT_PASSWORD";

pub struct Context {
    pub config: Config,
    pub session: Session,
    pub store: LimitStore,
    pub json: bool,
}

impl Context {
    pub fn new(api_url: Option<&str>, json: bool) -> Result<Self> {
        let config = Config::load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        });

        let mut session = Session::new(config.cache_dir()?);
        if let Err(e) = session.load() {
            warn!(error = %e, "Ignoring unreadable session file");
        }

        let base_url = config.resolve_api_url(api_url);
        info!(base_url = %base_url, "Using limits service");
        let mut client = ApiClient::new(base_url)
            .context("Failed to create HTTP client")?
            .with_retry(config.retry_policy());
        if let Some(token) = session.token() {
            client.set_token(token.to_string());
        }

        Ok(Self {
            config,
            session,
            store: LimitStore::new(client),
            json,
        })
    }

    fn require_login(&self) -> Result<&str> {
        match self.session.username() {
            Some(username) if self.session.is_valid() => Ok(username),
            _ => bail!("Not signed in. Run `lottolimit login` first."),
        }
    }
}

fn confirm(yes: bool, action: &str) -> Result<()> {
    if !yes {
        bail!("{} cannot be undone; pass --yes to confirm", action);
    }
    Ok(())
}

fn read_password(prompt: &str) -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    rpassword::prompt_password(prompt).context("Failed to read password")
}

fn read_line(prompt: &str) -> Result<String> {
    use std::io::Write;

    print!("{}", prompt);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

// ===== Session =====

pub async fn login(ctx: &mut Context, username: Option<String>) -> Result<()> {
    let username = match username.or_else(|| ctx.config.last_username.clone()) {
        Some(name) => name,
        None => read_line("Username: ")?,
    };
    if username.is_empty() {
        bail!("Username is required");
    }
    let password = read_password("Password: ")?;

    let response = ctx.store.login(&username, &password).await?;
    if !response.success {
        bail!("Login failed: {}", response.failure_reason());
    }

    ctx.session.update(SessionData::new(&username, response.token));
    ctx.session.save()?;
    ctx.config.last_username = Some(username.clone());
    if let Err(e) = ctx.config.save() {
        warn!(error = %e, "Failed to save config");
    }

    println!("Signed in as {}", username);
    Ok(())
}

pub fn logout(ctx: &mut Context) -> Result<()> {
    ctx.session.clear()?;
    println!("Signed out");
    Ok(())
}

pub fn whoami(ctx: &Context) -> Result<()> {
    let username = ctx.require_login()?;
    let minutes = ctx
        .session
        .data
        .as_ref()
        .map(|d| d.minutes_until_expiry())
        .unwrap_or(0);
    println!("{} (session expires in {}h {}m)", username, minutes / 60, minutes % 60);
    Ok(())
}

// ===== Dashboard & limits =====

pub async fn dashboard(ctx: &Context) -> Result<()> {
    ctx.require_login()?;
    let overview = ctx.store.overview().await;
    if ctx.json {
        return output::print_json(&serde_json::json!({
            "totals": LimitCategory::ALL
                .iter()
                .map(|c| (c.as_str(), overview.total_amount(*c)))
                .collect::<std::collections::BTreeMap<_, _>>(),
            "alerts": overview.alerts(),
            "active": overview.active_entries(),
        }));
    }
    output::print_overview(&overview);
    Ok(())
}

pub async fn limits(ctx: &Context, category: LimitCategory, filter: StatusFilter, search: Option<&str>) -> Result<()> {
    ctx.require_login()?;
    let settings = ctx.store.settings().await;
    let mut table = ctx.store.limits(category).await;

    // Every 2-digit number is always shown, unset ones at the default limit
    if category == LimitCategory::TwoDigit {
        let default = LimitRecord::new(category.default_limit(&settings), 0.0);
        for number in ledger::two_digit_numbers() {
            table.entry(number).or_insert(default);
        }
    }

    let rows = filter_table(&table, filter, search.unwrap_or_default(), settings.alert_threshold);

    if ctx.json {
        return output::print_json(&rows);
    }
    output::print_limit_table(category, &rows, settings.alert_threshold);
    Ok(())
}

pub async fn bet(ctx: &Context, category: LimitCategory, number: &str, amount: f64) -> Result<()> {
    ctx.require_login()?;
    let outcome = ledger::record_bet(&ctx.store, category, number, amount).await?;
    if ctx.json {
        return output::print_json(&outcome);
    }
    output::print_bet(&outcome);
    Ok(())
}

pub async fn set_limit(ctx: &Context, category: LimitCategory, number: &str, limit: f64) -> Result<()> {
    ctx.require_login()?;
    let record = ledger::set_limit(&ctx.store, category, number, limit).await?;
    println!(
        "{} {} limit set to {} (amount {})",
        category.label(),
        number,
        lottolimit_core::utils::format_amount(record.limit),
        lottolimit_core::utils::format_amount(record.amount)
    );
    Ok(())
}

pub async fn delete_limit(ctx: &Context, category: LimitCategory, number: &str) -> Result<()> {
    ctx.require_login()?;
    ctx.store.delete_limit(category, number).await?;
    println!("Deleted {} {}", category.label(), number);
    Ok(())
}

pub async fn default_limit(ctx: &Context, category: LimitCategory, limit: f64, yes: bool) -> Result<()> {
    ctx.require_login()?;
    confirm(yes, &format!("Overwriting every {} limit", category.label()))?;
    let updated = ledger::apply_default_limit(&ctx.store, category, limit).await?;
    println!("Set {} numbers to a limit of {}", updated, lottolimit_core::utils::format_amount(limit));
    Ok(())
}

pub async fn reset_amounts(ctx: &Context, category: LimitCategory, yes: bool) -> Result<()> {
    ctx.require_login()?;
    confirm(yes, &format!("Resetting every {} amount", category.label()))?;
    let updated = ledger::reset_amounts(&ctx.store, category).await?;
    println!("Reset {} numbers to zero", updated);
    Ok(())
}

// ===== Transactions =====

pub async fn list_transactions(ctx: &Context, limit: Option<usize>) -> Result<()> {
    ctx.require_login()?;
    let mut transactions = ctx.store.transactions().await;
    transactions.sort_by(|a, b| b.date.cmp(&a.date));
    if let Some(limit) = limit {
        transactions.truncate(limit);
    }
    if ctx.json {
        return output::print_json(&transactions);
    }
    output::print_transactions(&transactions);
    Ok(())
}

pub async fn delete_transaction(ctx: &Context, id: &str) -> Result<()> {
    ctx.require_login()?;
    ctx.store.delete_transaction(&TransactionId::from(id)).await?;
    println!("Deleted transaction {}", id);
    Ok(())
}

pub async fn clear_transactions(ctx: &Context, yes: bool) -> Result<()> {
    ctx.require_login()?;
    confirm(yes, "Clearing the transaction log")?;
    ctx.store.clear_transactions().await?;
    println!("Transaction log cleared");
    Ok(())
}

// ===== Settings =====

pub async fn show_settings(ctx: &Context) -> Result<()> {
    ctx.require_login()?;
    let settings = ctx.store.settings().await;
    if ctx.json {
        return output::print_json(&settings);
    }
    output::print_settings(&settings);
    Ok(())
}

pub async fn set_threshold(ctx: &Context, percent: u32) -> Result<()> {
    ctx.require_login()?;
    ledger::update_settings(&ctx.store, |s| s.alert_threshold = percent).await?;
    println!("Alert threshold set to {}%", percent);
    Ok(())
}

pub async fn set_defaults(ctx: &Context, two: Option<f64>, tode: Option<f64>, teng: Option<f64>) -> Result<()> {
    ctx.require_login()?;
    if two.is_none() && tode.is_none() && teng.is_none() {
        bail!("Nothing to change; pass --two, --tode and/or --teng");
    }
    if [two, tode, teng].iter().flatten().any(|v| !v.is_finite() || *v < 0.0) {
        bail!("Default limits must be zero or more");
    }

    let settings = ledger::update_settings(&ctx.store, |settings| {
        if let Some(v) = two {
            settings.default_limit_2digit = v;
        }
        if let Some(v) = tode {
            settings.default_limit_3digit_tode = v;
        }
        if let Some(v) = teng {
            settings.default_limit_3digit_teng = v;
        }
    })
    .await?;
    output::print_settings(&settings);
    Ok(())
}

// ===== Users =====

pub async fn list_users(ctx: &Context) -> Result<()> {
    ctx.require_login()?;
    let users = ctx.store.users().await;
    if ctx.json {
        return output::print_json(&users);
    }
    output::print_users(&users);
    Ok(())
}

pub async fn add_user(ctx: &Context, username: &str) -> Result<()> {
    ctx.require_login()?;
    let password = read_password(&format!("Password for {}: ", username))?;
    ctx.store.add_user(username, &password).await?;
    println!("Added user {}", username);
    Ok(())
}

pub async fn change_password(ctx: &mut Context) -> Result<()> {
    let username = ctx.require_login()?.to_string();
    let current = rpassword::prompt_password("Current password: ")?;
    let new = rpassword::prompt_password("New password: ")?;
    let confirmation = rpassword::prompt_password("Confirm new password: ")?;
    if new != confirmation {
        bail!("New passwords do not match");
    }

    ledger::change_password(&mut ctx.store, &username, &current, &new).await?;
    println!("Password changed");
    Ok(())
}

pub async fn delete_user(ctx: &Context, username: &str, yes: bool) -> Result<()> {
    ctx.require_login()?;
    confirm(yes, "Deleting a user")?;
    ctx.store.delete_user(username).await?;
    println!("Deleted user {}", username);
    Ok(())
}

// ===== Data management =====

pub async fn export(ctx: &Context, file: &Path) -> Result<()> {
    ctx.require_login()?;
    let raw = ctx.store.export().await?;
    let contents = serde_json::to_string_pretty(&raw)?;
    std::fs::write(file, contents).with_context(|| format!("Failed to write {}", file.display()))?;

    match serde_json::from_value::<Snapshot>(raw) {
        Ok(snapshot) => println!(
            "Exported {} limit records and {} transactions to {}",
            snapshot.record_count(),
            snapshot.transactions.len(),
            file.display()
        ),
        Err(_) => println!("Exported snapshot to {}", file.display()),
    }
    Ok(())
}

pub async fn import(ctx: &Context, file: &Path, yes: bool) -> Result<()> {
    ctx.require_login()?;
    confirm(yes, "Importing replaces all current data and")?;
    let contents = std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let snapshot: serde_json::Value = serde_json::from_str(&contents).context("Import file is not valid JSON")?;
    ctx.store.import(&snapshot).await?;
    println!("Imported {}", file.display());
    Ok(())
}

pub async fn clear_amounts(ctx: &Context, yes: bool) -> Result<()> {
    ctx.require_login()?;
    confirm(yes, "Clearing all amounts")?;
    ctx.store.clear_amounts().await?;
    println!("All amounts cleared, limits kept");
    Ok(())
}

pub async fn clear_all(ctx: &Context, yes: bool) -> Result<()> {
    ctx.require_login()?;
    confirm(yes, "Deleting all data")?;
    ctx.store.clear_all().await?;
    println!("All data deleted");
    Ok(())
}

pub async fn db_info(ctx: &Context) -> Result<()> {
    ctx.require_login()?;
    let info = ctx.store.db_info().await?;
    output::print_json(&info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_requires_yes() {
        assert!(confirm(false, "Deleting all data").is_err());
        assert!(confirm(true, "Deleting all data").is_ok());
    }
}
