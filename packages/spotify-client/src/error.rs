//! Spotify API error types

use thiserror::Error;

/// Spotify API client errors
///
/// Every failure is a distinct variant so callers can match exhaustively
/// when deciding whether a run is erroneous, a credential is revoked, or
/// the whole drain should pause.
#[derive(Error, Debug)]
pub enum SpotifyError {
    /// Transport-level failure that survived the full retry budget
    #[error("request failed after {attempts} attempts: {source}")]
    Fetch {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// Rate limited and the per-call wait budget is spent
    #[error("rate limited by the Spotify API, retry after {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },

    /// 401 on a resource call
    #[error("access token expired: {body}")]
    AccessTokenExpired { body: String },

    /// 400 `invalid_grant` from the accounts service
    #[error("refresh token revoked by the accounts service: {body}")]
    RefreshTokenRevoked { body: String },

    /// 429 classified after the retry budget (as opposed to the in-call back-off)
    #[error("too many requests: {body}")]
    TooManyRequests { body: String },

    /// 500
    #[error("Spotify internal server error: {body}")]
    InternalServerError { body: String },

    /// 502
    #[error("bad gateway from the Spotify API: {body}")]
    BadGateway { body: String },

    /// 503
    #[error("Spotify API unavailable: {body}")]
    ServiceUnavailable { body: String },

    /// 504
    #[error("gateway timeout from the Spotify API: {body}")]
    GatewayTimeout { body: String },

    /// Any other unexpected status, kept with its body for diagnostics
    #[error("unexpected status {status} from the Spotify API: {body}")]
    Captured { status: u16, body: String },

    /// Identity could not be resolved even after attempting a token refresh
    #[error("could not authenticate (status {status})")]
    CouldNotAuthenticate { status: u16 },

    /// Authorization-code exchange failed during credential bootstrap
    #[error("could not exchange authorization code: {0}")]
    CouldNotExchangeCode(String),

    /// Playlist listing came back without an `items` array
    #[error("playlist {playlist_id} response is missing items")]
    PlaylistWithoutItems { playlist_id: String },

    /// JSON parsing failed
    #[error("failed to parse Spotify response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl SpotifyError {
    /// Classify a non-success status after the retry budget is exhausted
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => Self::AccessTokenExpired { body },
            400 if body.contains("invalid_grant") => Self::RefreshTokenRevoked { body },
            429 => Self::TooManyRequests { body },
            500 => Self::InternalServerError { body },
            502 => Self::BadGateway { body },
            503 => Self::ServiceUnavailable { body },
            504 => Self::GatewayTimeout { body },
            _ => Self::Captured { status, body },
        }
    }

    /// The HTTP status behind this error, when one exists
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::AccessTokenExpired { .. } => Some(401),
            Self::RefreshTokenRevoked { .. } => Some(400),
            Self::TooManyRequests { .. } | Self::RateLimitExceeded { .. } => Some(429),
            Self::InternalServerError { .. } => Some(500),
            Self::BadGateway { .. } => Some(502),
            Self::ServiceUnavailable { .. } => Some(503),
            Self::GatewayTimeout { .. } => Some(504),
            Self::Captured { status, .. } | Self::CouldNotAuthenticate { status } => Some(*status),
            Self::Fetch { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for Spotify operations
pub type SpotifyResult<T> = Result<T, SpotifyError>;
