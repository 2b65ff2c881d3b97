//! Worker error types and run-outcome classification

use reprise_spotify_client::SpotifyError;
use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the worker's jobs and scheduler
#[derive(Error, Debug)]
pub enum WorkerError {
    /// A remote API call failed
    #[error("spotify API error: {0}")]
    Spotify(#[from] SpotifyError),

    /// A store operation failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for worker operations
pub type WorkerResult<T> = Result<T, WorkerError>;

/// What the scheduler should do with a settled, failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunDisposition {
    /// Record an `error` run; the ledger window backs the credential off
    RecordError,
    /// Record a `revokedCredentials` run; the credential leaves the due-set
    RecordRevoked,
    /// Record nothing; sleep this long before draining further jobs
    Backoff { retry_after_secs: u64 },
    /// Record nothing; the next natural due-cycle retries
    Transient,
}

impl WorkerError {
    /// Classify this failure into the ledger action the scheduler applies
    pub fn run_disposition(&self) -> RunDisposition {
        match self {
            Self::Spotify(
                SpotifyError::CouldNotAuthenticate { .. }
                | SpotifyError::PlaylistWithoutItems { .. },
            ) => RunDisposition::RecordError,
            Self::Spotify(SpotifyError::RefreshTokenRevoked { .. }) => {
                RunDisposition::RecordRevoked
            }
            Self::Spotify(SpotifyError::RateLimitExceeded { retry_after_secs }) => {
                RunDisposition::Backoff {
                    retry_after_secs: *retry_after_secs,
                }
            }
            _ => RunDisposition::Transient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failures_record_error_runs() {
        let err = WorkerError::Spotify(SpotifyError::CouldNotAuthenticate { status: 401 });
        assert_eq!(err.run_disposition(), RunDisposition::RecordError);

        let err = WorkerError::Spotify(SpotifyError::PlaylistWithoutItems {
            playlist_id: "p1".to_string(),
        });
        assert_eq!(err.run_disposition(), RunDisposition::RecordError);
    }

    #[test]
    fn test_revoked_refresh_token_records_revocation() {
        let err = WorkerError::Spotify(SpotifyError::RefreshTokenRevoked {
            body: String::new(),
        });
        assert_eq!(err.run_disposition(), RunDisposition::RecordRevoked);
    }

    #[test]
    fn test_rate_limit_backs_off_without_a_record() {
        let err = WorkerError::Spotify(SpotifyError::RateLimitExceeded {
            retry_after_secs: 17,
        });
        assert_eq!(
            err.run_disposition(),
            RunDisposition::Backoff {
                retry_after_secs: 17
            }
        );
    }

    #[test]
    fn test_everything_else_is_transient() {
        let err = WorkerError::Spotify(SpotifyError::ServiceUnavailable {
            body: String::new(),
        });
        assert_eq!(err.run_disposition(), RunDisposition::Transient);

        let err = WorkerError::Store(StoreError::CannotGetUser("x".to_string()));
        assert_eq!(err.run_disposition(), RunDisposition::Transient);

        let err = WorkerError::Configuration("bad".to_string());
        assert_eq!(err.run_disposition(), RunDisposition::Transient);
    }
}
