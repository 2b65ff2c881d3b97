//! Liked-songs sync job
//!
//! The unit of work the scheduler dispatches per credential: refresh the
//! token, fetch the liked library, reconcile the managed playlist, and
//! (when enabled) rotate dated snapshot playlists.

use chrono::Local;
use reprise_spotify_client::{SpotifyClient, SpotifyError};
use tracing::{debug, info, warn};

use crate::error::WorkerResult;
use crate::jobs::snapshots::{self, MANAGED_PLAYLIST_NAME};
use crate::store::{Credential, CredentialStore, TokenPair};

/// Default number of dated snapshots kept by the retention pass
pub const DEFAULT_SNAPSHOT_RETENTION: usize = 5;

/// Per-deployment knobs for the sync job
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Whether dated snapshot playlists are produced and pruned
    pub snapshots_enabled: bool,

    /// How many dated snapshots the retention pass keeps
    pub snapshot_retention: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            snapshots_enabled: true,
            snapshot_retention: DEFAULT_SNAPSHOT_RETENTION,
        }
    }
}

/// Outcome of one sync run, reported up to the scheduler
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Remote identity the run executed as
    pub user_id: String,

    /// Size of the liked library at fetch time
    pub liked_count: usize,

    /// Whether every add batch into the managed playlist was accepted
    pub playlist_add_ok: bool,

    /// Id of the snapshot playlist created this run, if any
    pub snapshot_created: Option<String>,

    /// How many old snapshots the retention pass deleted
    pub snapshots_pruned: usize,
}

/// Run the sync for one credential
///
/// Authentication failures propagate untouched so the scheduler can classify
/// them; a failed add into the managed playlist is reported in the result
/// rather than raised.
pub async fn execute(
    client: &SpotifyClient,
    credentials: &dyn CredentialStore,
    options: &SyncOptions,
    credential: &Credential,
) -> WorkerResult<SyncReport> {
    debug!("resolving identity");
    let identity = client
        .resolve_identity(&credential.access_token, &credential.refresh_token)
        .await?;

    // Persist the token before anything else can fail: a refreshed access
    // token must never be lost.
    credentials
        .save(
            &TokenPair {
                access_token: identity.access_token.clone(),
                refresh_token: credential.refresh_token.clone(),
            },
            &identity.user_id,
        )
        .await?;
    let access_token = identity.access_token;

    debug!("fetching liked tracks");
    let liked = client.liked_tracks(&access_token).await?;
    debug!(count = liked.len(), "liked tracks retrieved");

    let playlist_add_ok = sync_managed_playlist(client, &access_token, &liked).await?;

    let mut snapshot_created = None;
    let mut snapshots_pruned = 0;
    if options.snapshots_enabled {
        snapshot_created = create_snapshot(client, &access_token, &liked).await?;
        snapshots_pruned =
            prune_snapshots(client, &access_token, options.snapshot_retention).await?;
    }

    Ok(SyncReport {
        user_id: identity.user_id,
        liked_count: liked.len(),
        playlist_add_ok,
        snapshot_created,
        snapshots_pruned,
    })
}

/// Reconcile the managed playlist against the liked library
///
/// The playlist is always fully cleared and re-added rather than diffed, so
/// stale and duplicate entries cannot accumulate regardless of remote
/// ordering or duplicate semantics.
async fn sync_managed_playlist(
    client: &SpotifyClient,
    access_token: &str,
    liked: &[String],
) -> WorkerResult<bool> {
    let playlists = client.all_playlists(access_token).await?;
    let playlist_id = match playlists
        .iter()
        .find(|playlist| playlist.name == MANAGED_PLAYLIST_NAME)
    {
        Some(playlist) => playlist.id.clone(),
        None => {
            debug!("managed playlist not found, creating");
            client
                .create_playlist(access_token, MANAGED_PLAYLIST_NAME)
                .await?
        }
    };

    let current = client.playlist_tracks(access_token, &playlist_id).await?;
    debug!(current = current.len(), "clearing managed playlist");
    client
        .remove_all_tracks(access_token, &playlist_id, &current)
        .await?;

    let add_ok = client.add_tracks(access_token, &playlist_id, liked).await?;
    if add_ok {
        debug!(count = liked.len(), "managed playlist synced");
    } else {
        warn!(
            playlist_id = %playlist_id,
            "some track additions to the managed playlist failed"
        );
    }
    Ok(add_ok)
}

/// Create today's snapshot playlist unless it already exists
async fn create_snapshot(
    client: &SpotifyClient,
    access_token: &str,
    liked: &[String],
) -> WorkerResult<Option<String>> {
    let name = snapshots::snapshot_name(Local::now().date_naive());
    let playlists = client.all_playlists(access_token).await?;
    if playlists.iter().any(|playlist| playlist.name == name) {
        debug!(name, "snapshot for today already exists");
        return Ok(None);
    }

    let playlist_id = client.create_playlist(access_token, &name).await?;
    let add_ok = client.add_tracks(access_token, &playlist_id, liked).await?;
    if !add_ok {
        warn!(playlist_id = %playlist_id, "some track additions to the snapshot failed");
    }
    info!(playlist_id = %playlist_id, name, "snapshot created");
    Ok(Some(playlist_id))
}

/// Delete all but the most recent snapshots, retrying once on a partial
/// failure
async fn prune_snapshots(
    client: &SpotifyClient,
    access_token: &str,
    keep: usize,
) -> WorkerResult<usize> {
    let (deleted, failed) = prune_once(client, access_token, keep).await?;
    if failed == 0 {
        return Ok(deleted);
    }
    warn!(failed, "some snapshot deletions failed, retrying");
    let (retried, _) = prune_once(client, access_token, keep).await?;
    Ok(deleted + retried)
}

async fn prune_once(
    client: &SpotifyClient,
    access_token: &str,
    keep: usize,
) -> WorkerResult<(usize, usize)> {
    let playlists = client.all_playlists(access_token).await?;
    let prunable = snapshots::select_prunable(&playlists, keep);
    debug!(count = prunable.len(), "snapshots to delete");

    let mut deleted = 0;
    let mut failed = 0;
    for playlist_id in prunable {
        match client.delete_playlist(access_token, &playlist_id).await {
            Ok(()) => deleted += 1,
            Err(err @ SpotifyError::RateLimitExceeded { .. }) => return Err(err.into()),
            Err(err) => {
                warn!(playlist_id = %playlist_id, error = %err, "failed to delete snapshot");
                failed += 1;
            }
        }
    }
    Ok((deleted, failed))
}
