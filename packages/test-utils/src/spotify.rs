//! Mock Spotify server for testing the client and the sync worker
//!
//! Provides a [`MockSpotifyServer`] that simulates the handful of Spotify
//! Web API and accounts-service endpoints the worker touches, without any
//! network dependency.

use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock Spotify server for client and sync-job tests
///
/// Wraps a [`wiremock::MockServer`] and provides convenience methods for the
/// identity endpoint, token grants, paginated listings and playlist
/// mutations. Resource endpoints live under `/v1`, token grants under
/// `/api/token`, mirroring the real service's path shapes so one server can
/// stand in for both hosts.
///
/// # Example
///
/// ```rust,ignore
/// use reprise_test_utils::{track_ids, MockSpotifyServer};
///
/// #[tokio::test]
/// async fn test_sync() {
///     let server = MockSpotifyServer::start().await;
///     server.mock_identity("valid-token", "user-1").await;
///     server.mock_liked_tracks(&track_ids(120), 50).await;
///
///     // Configure your client with server.api_base_url() and
///     // server.accounts_base_url()
/// }
/// ```
pub struct MockSpotifyServer {
    server: MockServer,
}

impl MockSpotifyServer {
    /// Start a new mock Spotify server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Access the underlying mock server for custom mounts
    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Base URL for Web API resource calls
    pub fn api_base_url(&self) -> String {
        format!("{}/v1", self.server.uri())
    }

    /// Base URL for accounts-service token calls
    pub fn accounts_base_url(&self) -> String {
        self.server.uri()
    }

    /// Mount a successful identity lookup for a specific bearer token
    pub async fn mock_identity(&self, access_token: &str, user_id: &str) {
        Mock::given(method("GET"))
            .and(path("/v1/me"))
            .and(header("authorization", format!("Bearer {}", access_token).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": user_id })))
            .mount(&self.server)
            .await;
    }

    /// Mount a 401 identity lookup for a specific bearer token
    pub async fn mock_identity_unauthorized(&self, access_token: &str) {
        Mock::given(method("GET"))
            .and(path("/v1/me"))
            .and(header("authorization", format!("Bearer {}", access_token).as_str()))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "status": 401, "message": "The access token expired" }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a successful refresh-token exchange
    pub async fn mock_token_refresh(&self, new_access_token: &str) {
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": new_access_token,
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "user-library-read playlist-modify-public"
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a refresh-token exchange rejected as revoked
    pub async fn mock_token_refresh_revoked(&self) {
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Refresh token revoked"
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a successful authorization-code exchange
    pub async fn mock_auth_code_exchange(&self, access_token: &str, refresh_token: &str) {
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": access_token,
                "refresh_token": refresh_token,
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "user-library-read playlist-modify-public"
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a paginated liked-tracks listing
    ///
    /// Pages after the first live under synthetic paths; the client follows
    /// the `next` links verbatim, so the path shape does not matter.
    pub async fn mock_liked_tracks(&self, track_ids: &[String], page_size: usize) {
        let pages: Vec<&[String]> = if track_ids.is_empty() {
            vec![&[]]
        } else {
            track_ids.chunks(page_size).collect()
        };
        let count = pages.len();
        for (index, page) in pages.into_iter().enumerate() {
            let next = if index + 1 < count {
                json!(format!(
                    "{}/v1/me/tracks-page-{}",
                    self.server.uri(),
                    index + 1
                ))
            } else {
                json!(null)
            };
            let items: Vec<_> = page
                .iter()
                .map(|id| json!({ "track": { "id": id } }))
                .collect();
            let page_path = if index == 0 {
                "/v1/me/tracks".to_string()
            } else {
                format!("/v1/me/tracks-page-{}", index)
            };
            Mock::given(method("GET"))
                .and(path(page_path.as_str()))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({ "next": next, "items": items })),
                )
                .mount(&self.server)
                .await;
        }
    }

    /// Mount a single-page playlist listing of `(id, name)` pairs
    pub async fn mock_playlists(&self, playlists: &[(&str, &str)]) {
        let items: Vec<_> = playlists
            .iter()
            .map(|(id, name)| json!({ "id": id, "name": name }))
            .collect();
        Mock::given(method("GET"))
            .and(path("/v1/me/playlists"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "next": null, "items": items })),
            )
            .mount(&self.server)
            .await;
    }

    /// Mount playlist creation returning a fixed id regardless of name
    pub async fn mock_create_playlist(&self, playlist_id: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/me/playlists"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": playlist_id })))
            .mount(&self.server)
            .await;
    }

    /// Mount playlist creation matching one exact name
    pub async fn mock_create_playlist_named(&self, name: &str, playlist_id: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/me/playlists"))
            .and(body_string_contains(
                format!("{{\"name\":\"{}\"}}", name).as_str(),
            ))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": playlist_id })))
            .mount(&self.server)
            .await;
    }

    /// Mount a single-page track listing for one playlist
    pub async fn mock_playlist_tracks(&self, playlist_id: &str, track_ids: &[String]) {
        let items: Vec<_> = track_ids
            .iter()
            .map(|id| json!({ "track": { "id": id } }))
            .collect();
        Mock::given(method("GET"))
            .and(path(format!("/v1/playlists/{}/tracks", playlist_id).as_str()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "next": null, "items": items })),
            )
            .mount(&self.server)
            .await;
    }

    /// Mount a malformed playlist track listing without an `items` array
    pub async fn mock_playlist_tracks_without_items(&self, playlist_id: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/playlists/{}/tracks", playlist_id).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "next": null })))
            .mount(&self.server)
            .await;
    }

    /// Mount successful track addition for one playlist
    pub async fn mock_add_tracks(&self, playlist_id: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/v1/playlists/{}/tracks", playlist_id).as_str()))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({ "snapshot_id": "snapshot" })),
            )
            .mount(&self.server)
            .await;
    }

    /// Mount successful track removal for one playlist
    pub async fn mock_remove_tracks(&self, playlist_id: &str) {
        Mock::given(method("DELETE"))
            .and(path(format!("/v1/playlists/{}/tracks", playlist_id).as_str()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "snapshot_id": "snapshot" })),
            )
            .mount(&self.server)
            .await;
    }

    /// Mount a successful unfollow (delete) for one playlist
    pub async fn mock_unfollow(&self, playlist_id: &str) {
        Mock::given(method("DELETE"))
            .and(path(format!("/v1/playlists/{}/followers", playlist_id).as_str()))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.server)
            .await;
    }

    /// Mount a one-shot 429 with a `Retry-After` header on an arbitrary call
    ///
    /// Mount this before the success mock for the same path; once consumed
    /// it stops matching and the success mock takes over.
    pub async fn mock_rate_limited_once(
        &self,
        http_method: &str,
        request_path: &str,
        retry_after_secs: u64,
    ) {
        Mock::given(method(http_method))
            .and(path(request_path))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("Retry-After", retry_after_secs.to_string().as_str()),
            )
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
    }

    /// Mount an arbitrary status and JSON body on an arbitrary call
    pub async fn mock_status(
        &self,
        http_method: &str,
        request_path: &str,
        status: u16,
        body: serde_json::Value,
    ) {
        Mock::given(method(http_method))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }
}

/// Generate deterministic track-id fixtures
pub fn track_ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("track{:04}", i)).collect()
}
