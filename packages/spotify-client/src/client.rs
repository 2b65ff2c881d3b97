//! Spotify Web API client implementation

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::future::try_join_all;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response, StatusCode};
use reprise_shared_config::SpotifyConfig;
use tracing::{debug, instrument, warn};

use crate::cache::ResponseCache;
use crate::error::{SpotifyError, SpotifyResult};
use crate::models::{
    CreatedPlaylist, Identity, PlaylistSummary, PlaylistTracksPage, PlaylistsPage, PrivateUser,
    SavedTracksPage, TokenGrant,
};

/// Spotify Web API base URL
const API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Spotify accounts service base URL (token grants)
const ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default connection timeout in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Attempt budget shared by transport failures and unexpected statuses
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Protocol limit on track ids per add/remove request
const TRACKS_PER_BATCH: usize = 100;

/// Delay before retrying an unexpected status
const UNEXPECTED_STATUS_DELAY: Duration = Duration::from_secs(1);

/// Safety margin added on top of a Retry-After wait
const RATE_LIMIT_EPSILON: Duration = Duration::from_millis(500);

/// Cap on the total time a single call may spend sleeping on 429 responses
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Expiry for the read-only response cache
const CACHE_TTL: Duration = Duration::from_secs(600);

/// Maximum error body size carried in error variants
const MAX_ERROR_BODY_SIZE: usize = 1000;

/// Statuses accepted by resource calls
const EXPECTED_OK: &[StatusCode] = &[StatusCode::OK, StatusCode::CREATED];

/// Spotify Web API client
#[derive(Clone)]
pub struct SpotifyClient {
    http_client: Client,
    config: SpotifyConfig,
    api_base_url: String,
    accounts_base_url: String,
    max_attempts: u32,
    cache: Arc<ResponseCache>,
}

impl std::fmt::Debug for SpotifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyClient")
            .field("config", &self.config)
            .field("api_base_url", &self.api_base_url)
            .field("accounts_base_url", &self.accounts_base_url)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl SpotifyClient {
    /// Create a new client for the given application identity
    pub fn new(config: &SpotifyConfig) -> SpotifyResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent("Reprise/0.1")
            .build()
            .map_err(|source| SpotifyError::Fetch {
                attempts: 0,
                source,
            })?;

        Ok(Self {
            http_client,
            config: config.clone(),
            api_base_url: API_BASE_URL.to_string(),
            accounts_base_url: ACCOUNTS_BASE_URL.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            cache: Arc::new(ResponseCache::new(CACHE_TTL)),
        })
    }

    /// Point the client at alternative base URLs (useful for testing)
    pub fn with_base_urls(
        mut self,
        api_base_url: impl Into<String>,
        accounts_base_url: impl Into<String>,
    ) -> Self {
        self.api_base_url = api_base_url.into();
        self.accounts_base_url = accounts_base_url.into();
        self
    }

    /// Override the attempt budget (clamped to at least one attempt)
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Override the response-cache expiry; `Duration::ZERO` disables caching
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = Arc::new(ResponseCache::new(ttl));
        self
    }

    /// Resolve the remote user behind an access token, refreshing it if needed
    ///
    /// A 401 on the identity endpoint triggers exactly one refresh-token
    /// exchange followed by one re-check with the fresh token. A revoked
    /// refresh grant propagates as [`SpotifyError::RefreshTokenRevoked`];
    /// every other refresh failure collapses into
    /// [`SpotifyError::CouldNotAuthenticate`].
    #[instrument(skip(self, access_token, refresh_token))]
    pub async fn resolve_identity(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> SpotifyResult<Identity> {
        if let Some(identity) = self.cache.identities.get(access_token) {
            return Ok(identity);
        }

        if let Some(user_id) = self.fetch_identity(access_token).await? {
            debug!("access token valid, no refresh needed");
            let identity = Identity {
                user_id,
                access_token: access_token.to_string(),
            };
            self.cache.identities.insert(access_token, identity.clone());
            return Ok(identity);
        }

        if refresh_token.is_empty() {
            debug!("access token rejected and no refresh token available");
            return Err(SpotifyError::CouldNotAuthenticate { status: 401 });
        }

        debug!("access token rejected, refreshing");
        let grant = match self.refresh_access_token(refresh_token).await {
            Ok(grant) => grant,
            Err(
                err @ (SpotifyError::RefreshTokenRevoked { .. }
                | SpotifyError::RateLimitExceeded { .. }),
            ) => return Err(err),
            Err(err) => {
                warn!(error = %err, "token refresh failed");
                return Err(SpotifyError::CouldNotAuthenticate {
                    status: err.status_code().unwrap_or(401),
                });
            }
        };

        match self.fetch_identity(&grant.access_token).await? {
            Some(user_id) => {
                debug!("access token refreshed");
                let identity = Identity {
                    user_id,
                    access_token: grant.access_token,
                };
                self.cache.identities.insert(access_token, identity.clone());
                Ok(identity)
            }
            None => Err(SpotifyError::CouldNotAuthenticate { status: 401 }),
        }
    }

    /// Fetch every liked track id, following pagination until exhausted
    #[instrument(skip(self, access_token))]
    pub async fn liked_tracks(&self, access_token: &str) -> SpotifyResult<Vec<String>> {
        if let Some(tracks) = self.cache.liked_tracks.get(access_token) {
            return Ok(tracks);
        }

        let mut all = Vec::new();
        let mut next_url = Some(format!("{}/me/tracks", self.api_base_url));
        let mut page = 0u32;
        while let Some(url) = next_url {
            page += 1;
            debug!(page, "fetching liked tracks page");
            let response = self
                .send_with_policy(
                    || self.http_client.get(&url).bearer_auth(access_token),
                    EXPECTED_OK,
                )
                .await?;
            let parsed: SavedTracksPage = read_json(response).await?;
            all.extend(parsed.items.into_iter().map(|item| item.track.id));
            next_url = parsed.next;
        }

        debug!(count = all.len(), "fetched liked tracks");
        self.cache.liked_tracks.insert(access_token, all.clone());
        Ok(all)
    }

    /// List the current user's playlists, following pagination until exhausted
    #[instrument(skip(self, access_token))]
    pub async fn all_playlists(&self, access_token: &str) -> SpotifyResult<Vec<PlaylistSummary>> {
        if let Some(playlists) = self.cache.playlists.get(access_token) {
            return Ok(playlists);
        }

        let mut all = Vec::new();
        let mut next_url = Some(format!("{}/me/playlists", self.api_base_url));
        while let Some(url) = next_url {
            let response = self
                .send_with_policy(
                    || self.http_client.get(&url).bearer_auth(access_token),
                    EXPECTED_OK,
                )
                .await?;
            let parsed: PlaylistsPage = read_json(response).await?;
            all.extend(parsed.items);
            next_url = parsed.next;
        }

        debug!(count = all.len(), "fetched playlists");
        self.cache.playlists.insert(access_token, all.clone());
        Ok(all)
    }

    /// Fetch the full track listing of one playlist
    #[instrument(skip(self, access_token))]
    pub async fn playlist_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
    ) -> SpotifyResult<Vec<String>> {
        let mut all = Vec::new();
        let mut next_url = Some(format!(
            "{}/playlists/{}/tracks",
            self.api_base_url, playlist_id
        ));
        while let Some(url) = next_url {
            let response = self
                .send_with_policy(
                    || self.http_client.get(&url).bearer_auth(access_token),
                    EXPECTED_OK,
                )
                .await?;
            let parsed: PlaylistTracksPage = read_json(response).await?;
            let items = parsed.items.ok_or_else(|| SpotifyError::PlaylistWithoutItems {
                playlist_id: playlist_id.to_string(),
            })?;
            all.extend(items.into_iter().map(|item| item.track.id));
            next_url = parsed.next;
        }
        Ok(all)
    }

    /// Create a playlist for the current user and return its id
    #[instrument(skip(self, access_token))]
    pub async fn create_playlist(&self, access_token: &str, name: &str) -> SpotifyResult<String> {
        let url = format!("{}/me/playlists", self.api_base_url);
        let body = serde_json::json!({ "name": name });
        let response = self
            .send_with_policy(
                || {
                    self.http_client
                        .post(&url)
                        .bearer_auth(access_token)
                        .json(&body)
                },
                EXPECTED_OK,
            )
            .await?;
        let created: CreatedPlaylist = read_json(response).await?;
        debug!(playlist_id = %created.id, name, "created playlist");
        Ok(created.id)
    }

    /// Add tracks to a playlist in batches of 100, submitted sequentially
    ///
    /// Returns `true` only if every batch was accepted. A failed batch is
    /// reported, the remaining batches are still attempted, and the caller
    /// decides what a partial add means; this layer never re-submits.
    #[instrument(skip(self, access_token, track_ids), fields(track_count = track_ids.len()))]
    pub async fn add_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        track_ids: &[String],
    ) -> SpotifyResult<bool> {
        let url = format!("{}/playlists/{}/tracks", self.api_base_url, playlist_id);
        let mut all_ok = true;
        for (index, batch) in track_ids.chunks(TRACKS_PER_BATCH).enumerate() {
            let body = serde_json::json!({ "uris": track_uris(batch) });
            let result = self
                .send_with_policy(
                    || {
                        self.http_client
                            .post(&url)
                            .bearer_auth(access_token)
                            .json(&body)
                    },
                    EXPECTED_OK,
                )
                .await;
            match result {
                Ok(_) => {}
                Err(err @ SpotifyError::RateLimitExceeded { .. }) => return Err(err),
                Err(err) => {
                    warn!(batch = index, error = %err, "track addition batch failed");
                    all_ok = false;
                }
            }
        }
        Ok(all_ok)
    }

    /// Remove tracks from a playlist in batches of 100, submitted concurrently
    #[instrument(skip(self, access_token, track_ids), fields(track_count = track_ids.len()))]
    pub async fn remove_all_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        track_ids: &[String],
    ) -> SpotifyResult<()> {
        let url = format!("{}/playlists/{}/tracks", self.api_base_url, playlist_id);
        let batches = track_ids.chunks(TRACKS_PER_BATCH).map(|batch| {
            let body = serde_json::json!({
                "tracks": batch
                    .iter()
                    .map(|id| serde_json::json!({ "uri": format!("spotify:track:{}", id) }))
                    .collect::<Vec<_>>(),
            });
            let url = url.clone();
            async move {
                self.send_with_policy(
                    || {
                        self.http_client
                            .delete(&url)
                            .bearer_auth(access_token)
                            .json(&body)
                    },
                    EXPECTED_OK,
                )
                .await
                .map(|_| ())
            }
        });
        try_join_all(batches).await?;
        Ok(())
    }

    /// Unfollow (delete) a playlist; already-deleted playlists are not an error
    #[instrument(skip(self, access_token))]
    pub async fn delete_playlist(&self, access_token: &str, playlist_id: &str) -> SpotifyResult<()> {
        let url = format!(
            "{}/playlists/{}/followers",
            self.api_base_url, playlist_id
        );
        self.send_with_policy(
            || self.http_client.delete(&url).bearer_auth(access_token),
            &[StatusCode::OK, StatusCode::NO_CONTENT],
        )
        .await?;
        Ok(())
    }

    /// Exchange an authorization code for the initial token pair
    #[instrument(skip(self, code))]
    pub async fn exchange_auth_code(&self, code: &str) -> SpotifyResult<TokenGrant> {
        let url = format!("{}/api/token", self.accounts_base_url);
        let response = self
            .send_with_policy(
                || {
                    self.http_client
                        .post(&url)
                        .header(AUTHORIZATION, self.basic_auth_header())
                        .form(&[
                            ("code", code),
                            ("redirect_uri", self.config.redirect_uri.as_str()),
                            ("grant_type", "authorization_code"),
                        ])
                },
                &[StatusCode::OK],
            )
            .await
            .map_err(|err| SpotifyError::CouldNotExchangeCode(err.to_string()))?;
        let body = response
            .text()
            .await
            .map_err(|err| SpotifyError::CouldNotExchangeCode(err.to_string()))?;
        serde_json::from_str(&body)
            .map_err(|err| SpotifyError::CouldNotExchangeCode(err.to_string()))
    }

    /// Exchange a refresh token for a fresh access token
    async fn refresh_access_token(&self, refresh_token: &str) -> SpotifyResult<TokenGrant> {
        let url = format!("{}/api/token", self.accounts_base_url);
        let response = self
            .send_with_policy(
                || {
                    self.http_client
                        .post(&url)
                        .header(AUTHORIZATION, self.basic_auth_header())
                        .form(&[
                            ("grant_type", "refresh_token"),
                            ("refresh_token", refresh_token),
                        ])
                },
                &[StatusCode::OK],
            )
            .await?;
        read_json(response).await
    }

    /// GET the identity endpoint; `Ok(None)` means the token was rejected
    async fn fetch_identity(&self, access_token: &str) -> SpotifyResult<Option<String>> {
        let url = format!("{}/me", self.api_base_url);
        let response = self
            .send_with_policy(
                || self.http_client.get(&url).bearer_auth(access_token),
                &[StatusCode::OK, StatusCode::UNAUTHORIZED],
            )
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        let user: PrivateUser = read_json(response).await?;
        Ok(Some(user.id))
    }

    fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.config.client_id, self.config.client_secret);
        format!("Basic {}", BASE64.encode(raw))
    }

    /// Send a request under the uniform retry and back-off policy
    ///
    /// Transport failures and statuses outside `expected` share one attempt
    /// budget; 429 responses are slept through on a separate wall-clock
    /// budget so a long `Retry-After` cannot stall a call indefinitely.
    async fn send_with_policy<F>(
        &self,
        build: F,
        expected: &[StatusCode],
    ) -> SpotifyResult<Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempts = 0u32;
        let mut rate_limit_wait = Duration::ZERO;
        loop {
            let response = match build().send().await {
                Ok(response) => response,
                Err(source) => {
                    attempts += 1;
                    if attempts >= self.max_attempts {
                        return Err(SpotifyError::Fetch { attempts, source });
                    }
                    warn!(attempt = attempts, error = %source, "transport error, retrying");
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = retry_after_secs(&response);
                let wait = Duration::from_secs(retry_after_secs) + RATE_LIMIT_EPSILON;
                if rate_limit_wait + wait > MAX_RATE_LIMIT_WAIT {
                    return Err(SpotifyError::RateLimitExceeded { retry_after_secs });
                }
                warn!(retry_after_secs, "rate limited, backing off");
                tokio::time::sleep(wait).await;
                rate_limit_wait += wait;
                continue;
            }

            if expected.contains(&status) {
                return Ok(response);
            }

            attempts += 1;
            if attempts >= self.max_attempts {
                let body = truncate_error_body(response.text().await.unwrap_or_default());
                return Err(SpotifyError::from_status(status.as_u16(), body));
            }
            warn!(
                attempt = attempts,
                status = status.as_u16(),
                "unexpected status, retrying"
            );
            tokio::time::sleep(UNEXPECTED_STATUS_DELAY).await;
        }
    }
}

/// Read a response body and parse it as JSON
async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> SpotifyResult<T> {
    let body = response
        .text()
        .await
        .map_err(|source| SpotifyError::Fetch {
            attempts: 1,
            source,
        })?;
    Ok(serde_json::from_str(&body)?)
}

fn track_uris(ids: &[String]) -> Vec<String> {
    ids.iter().map(|id| format!("spotify:track:{}", id)).collect()
}

fn retry_after_secs(response: &Response) -> u64 {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .unwrap_or(1)
}

/// Truncate an error body on a UTF-8 boundary so huge responses are not
/// carried around in error values
fn truncate_error_body(body: String) -> String {
    if body.len() <= MAX_ERROR_BODY_SIZE {
        return body;
    }
    let truncate_at = body
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|i| *i <= MAX_ERROR_BODY_SIZE)
        .last()
        .unwrap_or(0);
    format!("{}... (truncated)", &body[..truncate_at])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> SpotifyClient {
        SpotifyClient::new(&SpotifyConfig::new("app-id", "app-secret")).unwrap()
    }

    #[test]
    fn test_batch_sizes() {
        let ids: Vec<String> = (0..250).map(|i| format!("track{i}")).collect();
        let batches: Vec<usize> = ids.chunks(TRACKS_PER_BATCH).map(|b| b.len()).collect();
        assert_eq!(batches, vec![100, 100, 50]);
    }

    #[test]
    fn test_track_uri_format() {
        let uris = track_uris(&["abc123".to_string()]);
        assert_eq!(uris, vec!["spotify:track:abc123".to_string()]);
    }

    #[test]
    fn test_debug_redacts_client_secret() {
        let client = test_client();
        let debug_str = format!("{:?}", client);
        assert!(!debug_str.contains("app-secret"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_max_attempts_clamped_to_one() {
        let client = test_client().with_max_attempts(0);
        assert_eq!(client.max_attempts, 1);
    }

    #[test]
    fn test_truncate_error_body_short() {
        assert_eq!(truncate_error_body("short".to_string()), "short");
    }

    #[test]
    fn test_truncate_error_body_long() {
        let long = "x".repeat(MAX_ERROR_BODY_SIZE * 2);
        let truncated = truncate_error_body(long);
        assert!(truncated.ends_with("... (truncated)"));
        assert!(truncated.len() < MAX_ERROR_BODY_SIZE * 2);
    }

    #[test]
    fn test_truncate_error_body_multibyte_boundary() {
        let long = "é".repeat(MAX_ERROR_BODY_SIZE);
        let truncated = truncate_error_body(long);
        assert!(truncated.ends_with("... (truncated)"));
    }

    #[test]
    fn test_basic_auth_header_is_base64() {
        let client = test_client();
        let header = client.basic_auth_header();
        assert!(header.starts_with("Basic "));
        let decoded = BASE64.decode(header.trim_start_matches("Basic ")).unwrap();
        assert_eq!(decoded, b"app-id:app-secret");
    }
}
