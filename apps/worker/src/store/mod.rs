//! Credential store and run ledger contracts
//!
//! The scheduler and sync job talk to storage exclusively through these
//! traits. `PostgresStore` is the production implementation; tests supply an
//! in-memory one.

pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use postgres::PostgresStore;

/// Floor on the per-user sync interval, protecting the remote API from
/// misconfigured accounts
pub const SYNC_INTERVAL_FLOOR_MINUTES: u32 = 30;

/// Storage-layer errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Credential lookup found nothing
    #[error("cannot get user: {0}")]
    CannotGetUser(String),

    /// Database query failed
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// The scheduling policies a credential can be enrolled in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunType {
    DefaultPlaylistSync,
}

impl RunType {
    /// The tag stored in the run ledger for a completed run of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DefaultPlaylistSync => "defaultPlaylistSync",
        }
    }
}

/// The tag written to the ledger when a run attempt settles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunRecordType {
    /// The run completed successfully
    Completed(RunType),
    /// The run failed in a way that should back off until the next window
    Error,
    /// The remote service reported the refresh token as revoked; the
    /// credential is excluded from all future due-sets until re-enrolled
    RevokedCredentials,
}

impl RunRecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed(run_type) => run_type.as_str(),
            Self::Error => "error",
            Self::RevokedCredentials => "revokedCredentials",
        }
    }
}

/// Per-user settings stored in the credentials row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserConfig {
    /// Minutes between sync runs for this user
    pub sync_interval_minutes: u32,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            sync_interval_minutes: SYNC_INTERVAL_FLOOR_MINUTES,
        }
    }
}

impl UserConfig {
    /// Clamp the configured interval to the platform floor
    pub fn sanitize(self) -> Self {
        Self {
            sync_interval_minutes: self.sync_interval_minutes.max(SYNC_INTERVAL_FLOOR_MINUTES),
        }
    }
}

/// One user's delegated access to the remote service
#[derive(Clone)]
pub struct Credential {
    /// Stable internal identifier
    pub id: i64,
    /// Remote-service identity string; unique per credential
    pub user_id: String,
    /// Short-lived token, replaced on every successful refresh
    pub access_token: String,
    /// Long-lived token, replaced only when the remote service rotates it
    pub refresh_token: String,
    /// Per-user settings
    pub config: UserConfig,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("access_token", &truncate_token(&self.access_token))
            .field("refresh_token", &truncate_token(&self.refresh_token))
            .field("config", &self.config)
            .finish()
    }
}

fn truncate_token(token: &str) -> String {
    let prefix: String = token.chars().take(10).collect();
    format!("{}...", prefix)
}

/// How to address a credential row
#[derive(Debug, Clone, Copy)]
pub enum CredentialLookup<'a> {
    ById(i64),
    ByUserId(&'a str),
}

/// A token pair to persist after a refresh or enrollment
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Key-value contract over the credentials table
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch one credential; absent rows fail with [`StoreError::CannotGetUser`]
    async fn get(&self, lookup: CredentialLookup<'_>) -> StoreResult<Credential>;

    /// Upsert tokens for a user; an insert seeds the default config, an
    /// update replaces tokens only and preserves the stored config
    async fn save(&self, tokens: &TokenPair, user_id: &str) -> StoreResult<()>;

    /// Replace a user's settings (sanitized before writing)
    async fn save_config(&self, config: UserConfig, user_id: &str) -> StoreResult<()>;

    /// Delete a credential
    async fn remove(&self, lookup: CredentialLookup<'_>) -> StoreResult<()>;
}

/// Append-only run ledger plus the due-set query derived from it
#[async_trait]
pub trait RunLedger: Send + Sync {
    /// Record one settled run attempt; never updated or deleted
    async fn record_run(&self, credentials_id: i64, record: RunRecordType) -> StoreResult<()>;

    /// Credentials eligible for a new run of `run_type` this tick
    async fn due_credentials(
        &self,
        run_type: RunType,
        floor_minutes: u32,
    ) -> StoreResult<Vec<Credential>>;
}

/// Decide whether a credential is due given its run history
///
/// This is the contract both store implementations follow: a credential with
/// no relevant run is always due; the latest completed-or-error run starts a
/// quiet window of the configured interval (clamped to the floor); a revoked
/// record excludes the credential permanently.
pub fn is_due(
    latest_relevant_run: Option<DateTime<Utc>>,
    revoked: bool,
    config: &UserConfig,
    floor_minutes: u32,
    now: DateTime<Utc>,
) -> bool {
    if revoked {
        return false;
    }
    match latest_relevant_run {
        None => true,
        Some(last) => {
            let minutes = config.sync_interval_minutes.max(floor_minutes);
            now - last >= chrono::Duration::minutes(i64::from(minutes))
        }
    }
}
