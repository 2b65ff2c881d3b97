//! Wire models for the Spotify Web API

use serde::Deserialize;

/// Current-user response from the identity endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct PrivateUser {
    pub id: String,
}

/// One saved-track entry; only the track id is carried through
#[derive(Debug, Deserialize)]
pub(crate) struct SavedTrackItem {
    pub track: TrackRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackRef {
    pub id: String,
}

/// A page of the liked-tracks listing
#[derive(Debug, Deserialize)]
pub(crate) struct SavedTracksPage {
    pub next: Option<String>,
    pub items: Vec<SavedTrackItem>,
}

/// A page of a playlist's track listing
///
/// `items` is optional so a malformed page can be rejected explicitly
/// instead of surfacing as an opaque parse failure.
#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistTracksPage {
    pub next: Option<String>,
    pub items: Option<Vec<SavedTrackItem>>,
}

/// A page of the current user's playlist listing
#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistsPage {
    pub next: Option<String>,
    pub items: Vec<PlaylistSummary>,
}

/// A playlist as listed for the current user
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
}

/// Response to playlist creation
#[derive(Debug, Deserialize)]
pub(crate) struct CreatedPlaylist {
    pub id: String,
}

/// Token response from the accounts service
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Present only when the accounts service rotates the refresh token
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    pub token_type: String,
    #[serde(default)]
    pub scope: Option<String>,
}

/// A resolved remote identity together with the token that proved it
#[derive(Clone)]
pub struct Identity {
    pub user_id: String,
    pub access_token: String,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("user_id", &self.user_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}
