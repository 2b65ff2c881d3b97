//! In-memory credential store and run ledger for integration tests
//!
//! Implements the same contracts as the Postgres store, with the due-set
//! policy delegated to the shared `is_due` decision so the tests exercise
//! the real scheduling rules without a database.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use reprise_worker::store::{
    is_due, Credential, CredentialLookup, CredentialStore, RunLedger, RunRecordType, RunType,
    StoreError, StoreResult, TokenPair, UserConfig,
};

/// One ledger entry as the memory store keeps it
#[derive(Debug, Clone)]
pub struct RecordedRun {
    pub credentials_id: i64,
    pub tag: String,
    pub at: DateTime<Utc>,
}

/// In-memory store standing in for Postgres
#[derive(Default)]
pub struct MemoryStore {
    credentials: Mutex<Vec<Credential>>,
    runs: Mutex<Vec<RecordedRun>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a credential row and return its assigned id
    pub fn insert_credential(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: &str,
        config: UserConfig,
    ) -> i64 {
        let mut credentials = self.credentials.lock().unwrap();
        let id = credentials.len() as i64 + 1;
        credentials.push(Credential {
            id,
            user_id: user_id.to_string(),
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            config,
        });
        id
    }

    /// Insert a ledger entry with an explicit timestamp (to simulate age)
    pub fn insert_run_at(&self, credentials_id: i64, record: RunRecordType, at: DateTime<Utc>) {
        self.runs.lock().unwrap().push(RecordedRun {
            credentials_id,
            tag: record.as_str().to_string(),
            at,
        });
    }

    /// All ledger entries recorded so far
    pub fn runs(&self) -> Vec<RecordedRun> {
        self.runs.lock().unwrap().clone()
    }

    /// Credential ids of entries with the given tag
    pub fn runs_of_type(&self, tag: &str) -> Vec<i64> {
        self.runs
            .lock()
            .unwrap()
            .iter()
            .filter(|run| run.tag == tag)
            .map(|run| run.credentials_id)
            .collect()
    }

    /// Look up a credential row by user id
    pub fn credential(&self, user_id: &str) -> Option<Credential> {
        self.credentials
            .lock()
            .unwrap()
            .iter()
            .find(|credential| credential.user_id == user_id)
            .cloned()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get(&self, lookup: CredentialLookup<'_>) -> StoreResult<Credential> {
        let credentials = self.credentials.lock().unwrap();
        let found = match lookup {
            CredentialLookup::ById(id) => credentials.iter().find(|c| c.id == id),
            CredentialLookup::ByUserId(user_id) => {
                credentials.iter().find(|c| c.user_id == user_id)
            }
        };
        found
            .cloned()
            .ok_or_else(|| StoreError::CannotGetUser("no_user_found".to_string()))
    }

    async fn save(&self, tokens: &TokenPair, user_id: &str) -> StoreResult<()> {
        let mut credentials = self.credentials.lock().unwrap();
        match credentials.iter_mut().find(|c| c.user_id == user_id) {
            Some(existing) => {
                existing.access_token = tokens.access_token.clone();
                existing.refresh_token = tokens.refresh_token.clone();
            }
            None => {
                let id = credentials.len() as i64 + 1;
                credentials.push(Credential {
                    id,
                    user_id: user_id.to_string(),
                    access_token: tokens.access_token.clone(),
                    refresh_token: tokens.refresh_token.clone(),
                    config: UserConfig::default(),
                });
            }
        }
        Ok(())
    }

    async fn save_config(&self, config: UserConfig, user_id: &str) -> StoreResult<()> {
        let mut credentials = self.credentials.lock().unwrap();
        if let Some(existing) = credentials.iter_mut().find(|c| c.user_id == user_id) {
            existing.config = config.sanitize();
        }
        Ok(())
    }

    async fn remove(&self, lookup: CredentialLookup<'_>) -> StoreResult<()> {
        let mut credentials = self.credentials.lock().unwrap();
        match lookup {
            CredentialLookup::ById(id) => credentials.retain(|c| c.id != id),
            CredentialLookup::ByUserId(user_id) => credentials.retain(|c| c.user_id != user_id),
        }
        Ok(())
    }
}

#[async_trait]
impl RunLedger for MemoryStore {
    async fn record_run(&self, credentials_id: i64, record: RunRecordType) -> StoreResult<()> {
        self.insert_run_at(credentials_id, record, Utc::now());
        Ok(())
    }

    async fn due_credentials(
        &self,
        run_type: RunType,
        floor_minutes: u32,
    ) -> StoreResult<Vec<Credential>> {
        let credentials = self.credentials.lock().unwrap();
        let runs = self.runs.lock().unwrap();
        let now = Utc::now();

        let due = credentials
            .iter()
            .filter(|credential| {
                let revoked = runs.iter().any(|run| {
                    run.credentials_id == credential.id
                        && run.tag == RunRecordType::RevokedCredentials.as_str()
                });
                let latest_relevant = runs
                    .iter()
                    .filter(|run| {
                        run.credentials_id == credential.id
                            && (run.tag == run_type.as_str()
                                || run.tag == RunRecordType::Error.as_str())
                    })
                    .map(|run| run.at)
                    .max();
                is_due(
                    latest_relevant,
                    revoked,
                    &credential.config,
                    floor_minutes,
                    now,
                )
            })
            .cloned()
            .collect();
        Ok(due)
    }
}
