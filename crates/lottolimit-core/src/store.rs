//! Data-access facade over the API client.
//!
//! `LimitStore` exposes one method per endpoint family. Reads never fail:
//! when the client gives up they log the error and hand back the documented
//! default for that family (empty table, default settings, empty list) so
//! callers can keep rendering through an outage. Writes surface their errors.

use anyhow::{bail, Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError, HttpMethod, HttpTransport, Transport};
use crate::models::{
    active_entries, collect_alerts, normalize_number, Alert, DbInfo, LimitCategory, LimitEntry,
    LimitRecord, LimitTable, LoginResponse, MutationResponse, NewTransaction, Settings, Snapshot,
    Transaction, TransactionId, User,
};
use crate::models::user::ADMIN_USERNAME;

pub struct LimitStore<T = HttpTransport> {
    client: ApiClient<T>,
}

impl<T: Transport> LimitStore<T> {
    pub fn new(client: ApiClient<T>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient<T> {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut ApiClient<T> {
        &mut self.client
    }

    /// GET `path`, substituting `fallback` if the request ultimately fails.
    async fn read_or<R: DeserializeOwned>(&self, path: &str, fallback: impl FnOnce() -> R) -> R {
        match self.client.get_json(path).await {
            Ok(data) => data,
            Err(e) => {
                warn!(path = path, error = %e, "Read failed, using fallback value");
                fallback()
            }
        }
    }

    async fn write<B: Serialize>(&self, method: HttpMethod, path: &str, body: Option<&B>) -> Result<MutationResponse> {
        let response: MutationResponse = self
            .client
            .send_json(method, path, body)
            .await
            .with_context(|| format!("{} {} failed", method.as_str(), path))?;

        if response.is_rejected() {
            bail!(
                "{} {} rejected: {}",
                method.as_str(),
                path,
                response.message.as_deref().unwrap_or("no reason given")
            );
        }
        Ok(response)
    }

    // ===== Auth & Users =====

    /// Check credentials. On success any token the service hands out is
    /// attached to the client for subsequent requests.
    ///
    /// Sent once with no retry: a rejected password is an answer, and the
    /// server's reason in a 401 body is kept for `failure_reason`.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<LoginResponse> {
        let body = json!({ "username": username, "password": password });
        let raw = self
            .client
            .send_once(HttpMethod::Post, "/api/login", Some(&body))
            .await
            .context("Login request failed")?;

        let response = if raw.is_success() {
            if raw.body.trim().is_empty() {
                LoginResponse::default()
            } else {
                serde_json::from_str(&raw.body).context("Failed to parse login response")?
            }
        } else if raw.status == 401 {
            let mut rejected: LoginResponse = serde_json::from_str(&raw.body).unwrap_or_default();
            rejected.success = false;
            rejected
        } else {
            return Err(ApiError::from_status(raw.status, &raw.body)).context("Login request failed");
        };

        if response.success {
            info!(username = username, "Logged in");
            if let Some(ref token) = response.token {
                self.client.set_token(token.clone());
            }
        } else {
            warn!(username = username, reason = response.failure_reason(), "Login rejected");
        }
        Ok(response)
    }

    pub async fn users(&self) -> Vec<User> {
        self.read_or("/api/users", Vec::new).await
    }

    pub async fn add_user(&self, username: &str, password: &str) -> Result<MutationResponse> {
        if username.trim().is_empty() || password.is_empty() {
            bail!("Username and password are required");
        }
        let body = json!({ "username": username.trim(), "password": password });
        self.write(HttpMethod::Post, "/api/users", Some(&body)).await
    }

    pub async fn update_password(&self, username: &str, password: &str) -> Result<MutationResponse> {
        if password.is_empty() {
            bail!("Password must not be empty");
        }
        let body = json!({ "password": password });
        self.write(HttpMethod::Put, &format!("/api/users/{}", username), Some(&body))
            .await
    }

    pub async fn delete_user(&self, username: &str) -> Result<MutationResponse> {
        if username == ADMIN_USERNAME {
            bail!("The {} account cannot be deleted", ADMIN_USERNAME);
        }
        self.write::<Value>(HttpMethod::Delete, &format!("/api/users/{}", username), None)
            .await
    }

    // ===== Settings =====

    pub async fn settings(&self) -> Settings {
        self.read_or("/api/settings", Settings::default).await
    }

    /// Like `settings` but without the fallback, for callers that edit and
    /// write the settings back.
    pub async fn try_settings(&self) -> Result<Settings> {
        self.client
            .get_json("/api/settings")
            .await
            .context("Failed to load settings")
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<MutationResponse> {
        if !Settings::is_valid_threshold(settings.alert_threshold) {
            bail!("Alert threshold must be between 1 and 100, got {}", settings.alert_threshold);
        }
        self.write(HttpMethod::Put, "/api/settings", Some(settings)).await
    }

    // ===== Limits =====

    pub async fn limits(&self, category: LimitCategory) -> LimitTable {
        self.read_or(&category.collection_path(), LimitTable::new).await
    }

    /// Like `limits` but without the fallback, for read-modify-write callers
    /// that must not mistake an outage for an empty table.
    pub async fn try_limits(&self, category: LimitCategory) -> Result<LimitTable> {
        self.client
            .get_json(&category.collection_path())
            .await
            .with_context(|| format!("Failed to load {} limits", category.label()))
    }

    pub async fn update_limit(&self, category: LimitCategory, number: &str, record: LimitRecord) -> Result<MutationResponse> {
        let number = normalize_number(category, number)?;
        self.write(HttpMethod::Put, &category.record_path(&number), Some(&record))
            .await
    }

    /// Replace the whole table of `category`.
    pub async fn save_limits(&self, category: LimitCategory, table: &LimitTable) -> Result<MutationResponse> {
        self.write(HttpMethod::Put, &category.collection_path(), Some(table))
            .await
    }

    pub async fn delete_limit(&self, category: LimitCategory, number: &str) -> Result<MutationResponse> {
        if !category.supports_delete() {
            bail!("{} records cannot be deleted, set the amount to zero instead", category.label());
        }
        let number = normalize_number(category, number)?;
        self.write::<Value>(HttpMethod::Delete, &category.record_path(&number), None)
            .await
    }

    // ===== Transactions =====

    pub async fn transactions(&self) -> Vec<Transaction> {
        self.read_or("/api/transactions", Vec::new).await
    }

    pub async fn add_transaction(&self, transaction: &NewTransaction) -> Result<MutationResponse> {
        self.write(HttpMethod::Post, "/api/transactions", Some(transaction))
            .await
    }

    pub async fn delete_transaction(&self, id: &TransactionId) -> Result<MutationResponse> {
        self.write::<Value>(HttpMethod::Delete, &format!("/api/transactions/{}", id), None)
            .await
    }

    pub async fn clear_transactions(&self) -> Result<MutationResponse> {
        self.write::<Value>(HttpMethod::Delete, "/api/transactions", None)
            .await
    }

    // ===== Export / Import =====

    /// Full-state snapshot exactly as the service sent it.
    pub async fn export(&self) -> Result<Value> {
        self.client
            .get_json("/api/export")
            .await
            .context("Failed to export data")
    }

    pub async fn export_snapshot(&self) -> Result<Snapshot> {
        let raw = self.export().await?;
        serde_json::from_value(raw).context("Failed to parse exported snapshot")
    }

    /// Replace all server state with `snapshot`.
    pub async fn import(&self, snapshot: &Value) -> Result<MutationResponse> {
        if !snapshot.is_object() {
            bail!("Import data must be a JSON object");
        }
        self.write(HttpMethod::Post, "/api/import", Some(snapshot)).await
    }

    // ===== Bulk operations =====

    /// Zero every amount, keeping limits.
    pub async fn clear_amounts(&self) -> Result<MutationResponse> {
        self.write::<Value>(HttpMethod::Post, "/api/clear-amounts", None)
            .await
    }

    /// Delete all limits, amounts and transactions.
    pub async fn clear_all(&self) -> Result<MutationResponse> {
        self.write::<Value>(HttpMethod::Post, "/api/clear-all", None)
            .await
    }

    pub async fn db_info(&self) -> Result<DbInfo> {
        self.client
            .get_json("/api/db-info")
            .await
            .context("Failed to fetch database info")
    }

    pub fn clear_cache(&self) {
        self.client.clear_cache();
    }

    // ===== Dashboard =====

    /// All three tables and the settings, fetched concurrently.
    pub async fn overview(&self) -> Overview {
        let (two_digit, tode, teng, settings) = futures::join!(
            self.limits(LimitCategory::TwoDigit),
            self.limits(LimitCategory::ThreeDigitTode),
            self.limits(LimitCategory::ThreeDigitTeng),
            self.settings(),
        );
        Overview {
            two_digit,
            tode,
            teng,
            settings,
        }
    }
}

/// Snapshot of everything the dashboard shows.
#[derive(Debug, Clone, Default)]
pub struct Overview {
    pub two_digit: LimitTable,
    pub tode: LimitTable,
    pub teng: LimitTable,
    pub settings: Settings,
}

impl Overview {
    pub fn table(&self, category: LimitCategory) -> &LimitTable {
        match category {
            LimitCategory::TwoDigit => &self.two_digit,
            LimitCategory::ThreeDigitTode => &self.tode,
            LimitCategory::ThreeDigitTeng => &self.teng,
        }
    }

    pub fn tables(&self) -> impl Iterator<Item = (LimitCategory, &LimitTable)> {
        LimitCategory::ALL.into_iter().map(move |c| (c, self.table(c)))
    }

    pub fn total_amount(&self, category: LimitCategory) -> f64 {
        self.table(category).values().map(|r| r.amount).sum()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        collect_alerts(self.tables(), self.settings.alert_threshold)
    }

    pub fn active_entries(&self) -> Vec<LimitEntry> {
        active_entries(self.tables())
    }
}

// ============================================================================
// Tests
// ============================================================================
