//! Polling scheduler and failure-isolating job runner
//!
//! One loop per run type: poll the due-set, drain it through a bounded pool
//! of sync jobs, classify each settled job into a ledger action, and sleep
//! when nothing is due. A stop signal prevents new dispatch while letting
//! in-flight jobs finish, and the handle lets the caller await full drain.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reprise_spotify_client::SpotifyClient;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::RunDisposition;
use crate::jobs::liked_songs_sync::{self, SyncOptions};
use crate::store::{
    Credential, CredentialStore, RunLedger, RunRecordType, RunType, SYNC_INTERVAL_FLOOR_MINUTES,
};

/// Default width of the job pool
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 5;

/// Scheduler tuning
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How long to sleep after a tick with no due credentials
    pub poll_interval: Duration,

    /// Maximum number of sync jobs in flight at once
    pub max_concurrent_jobs: usize,

    /// Floor applied to per-user sync intervals in the due-set query
    pub sync_interval_floor_minutes: u32,

    /// Options forwarded to each sync job
    pub sync: SyncOptions,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            sync_interval_floor_minutes: SYNC_INTERVAL_FLOOR_MINUTES,
            sync: SyncOptions::default(),
        }
    }
}

/// Control surface handed to the process supervisor
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal a graceful stop: no new jobs are dispatched, in-flight jobs
    /// run to completion
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Wait until the loop has fully drained and exited
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// Start the polling loop for the default-playlist sync run type
pub fn start<S>(client: SpotifyClient, store: Arc<S>, config: SchedulerConfig) -> SchedulerHandle
where
    S: CredentialStore + RunLedger + 'static,
{
    let (shutdown, receiver) = watch::channel(false);
    let task = tokio::spawn(run_loop(client, store, config, receiver));
    SchedulerHandle { shutdown, task }
}

async fn run_loop<S>(
    client: SpotifyClient,
    store: Arc<S>,
    config: SchedulerConfig,
    mut shutdown: watch::Receiver<bool>,
) where
    S: CredentialStore + RunLedger + 'static,
{
    info!(
        poll_interval_secs = config.poll_interval.as_secs(),
        max_concurrent_jobs = config.max_concurrent_jobs,
        "scheduler started"
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        let due = match store
            .due_credentials(
                RunType::DefaultPlaylistSync,
                config.sync_interval_floor_minutes,
            )
            .await
        {
            Ok(due) => due,
            Err(err) => {
                error!(error = %err, "failed to query due credentials");
                Vec::new()
            }
        };

        if due.is_empty() {
            debug!("no credentials due");
            tokio::select! {
                _ = tokio::time::sleep(config.poll_interval) => {}
                _ = shutdown.changed() => {}
            }
            continue;
        }

        info!(count = due.len(), "draining due credentials");
        futures_util::stream::iter(due)
            .for_each_concurrent(config.max_concurrent_jobs, |credential| {
                run_one(&client, store.as_ref(), &config, &shutdown, credential)
            })
            .await;
        // Loop straight back to the poll: new work may already be due.
    }

    info!("scheduler stopped");
}

/// Run one credential's sync fully isolated from its peers
async fn run_one<S>(
    client: &SpotifyClient,
    store: &S,
    config: &SchedulerConfig,
    shutdown: &watch::Receiver<bool>,
    credential: Credential,
) where
    S: CredentialStore + RunLedger,
{
    if *shutdown.borrow() {
        debug!(credential_id = credential.id, "stop requested, not dispatching");
        return;
    }

    info!(
        credential_id = credential.id,
        user_id = %credential.user_id,
        "starting sync run"
    );

    match liked_songs_sync::execute(client, store, &config.sync, &credential).await {
        Ok(report) => {
            info!(
                credential_id = credential.id,
                liked = report.liked_count,
                add_ok = report.playlist_add_ok,
                snapshot = report.snapshot_created.as_deref().unwrap_or("-"),
                pruned = report.snapshots_pruned,
                "sync run completed"
            );
            record(
                store,
                credential.id,
                RunRecordType::Completed(RunType::DefaultPlaylistSync),
            )
            .await;
        }
        Err(err) => match err.run_disposition() {
            RunDisposition::RecordError => {
                error!(credential_id = credential.id, error = %err, "sync run failed");
                record(store, credential.id, RunRecordType::Error).await;
            }
            RunDisposition::RecordRevoked => {
                warn!(
                    credential_id = credential.id,
                    "refresh token revoked, excluding credential from future runs"
                );
                record(store, credential.id, RunRecordType::RevokedCredentials).await;
            }
            RunDisposition::Backoff { retry_after_secs } => {
                warn!(
                    credential_id = credential.id,
                    retry_after_secs, "rate limit exceeded, pausing before further jobs"
                );
                tokio::time::sleep(Duration::from_secs(retry_after_secs)).await;
            }
            RunDisposition::Transient => {
                error!(
                    credential_id = credential.id,
                    error = %err,
                    "unexpected error during sync run, will retry next cycle"
                );
            }
        },
    }
}

/// Append a ledger record; a failed write is logged, never fatal to the pool
async fn record<L: RunLedger + ?Sized>(ledger: &L, credentials_id: i64, entry: RunRecordType) {
    if let Err(err) = ledger.record_run(credentials_id, entry).await {
        error!(
            credentials_id,
            entry = entry.as_str(),
            error = %err,
            "failed to record run"
        );
    }
}
