//! Worker configuration loaded from environment variables
//!
//! Configuration is loaded once at startup and passed by reference into the
//! scheduler and job components; nothing reads environment variables after
//! boot.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use reprise_shared_config::{CommonConfig, DatabaseConfig, Environment, SpotifyConfig};

use crate::jobs::liked_songs_sync::{SyncOptions, DEFAULT_SNAPSHOT_RETENTION};
use crate::scheduler::{SchedulerConfig, DEFAULT_MAX_CONCURRENT_JOBS};
use crate::store::SYNC_INTERVAL_FLOOR_MINUTES;

/// Worker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Common configuration shared with other services
    pub common: CommonConfig,

    /// Idle-tick polling interval in seconds
    pub poll_interval_secs: u64,

    /// Maximum concurrent sync jobs
    pub max_concurrent_jobs: usize,

    /// Floor on per-user sync intervals, in minutes
    pub sync_interval_floor_minutes: u32,

    /// Whether dated snapshot playlists are produced
    pub snapshots_enabled: bool,

    /// How many dated snapshots to keep
    pub snapshot_retention: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let common = CommonConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        Ok(Self {
            common,

            poll_interval_secs: env::var("WORKER_POLL_INTERVAL")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("Invalid WORKER_POLL_INTERVAL value")?,

            max_concurrent_jobs: env::var("WORKER_MAX_CONCURRENT_JOBS")
                .unwrap_or_else(|_| DEFAULT_MAX_CONCURRENT_JOBS.to_string())
                .parse()
                .context("Invalid WORKER_MAX_CONCURRENT_JOBS value")?,

            sync_interval_floor_minutes: env::var("SYNC_INTERVAL_FLOOR_MINUTES")
                .unwrap_or_else(|_| SYNC_INTERVAL_FLOOR_MINUTES.to_string())
                .parse()
                .context("Invalid SYNC_INTERVAL_FLOOR_MINUTES value")?,

            snapshots_enabled: env::var("SNAPSHOTS_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .context("Invalid SNAPSHOTS_ENABLED value")?,

            snapshot_retention: env::var("SNAPSHOT_RETENTION")
                .unwrap_or_else(|_| DEFAULT_SNAPSHOT_RETENTION.to_string())
                .parse()
                .context("Invalid SNAPSHOT_RETENTION value")?,
        })
    }

    // Convenience accessors for common config fields

    /// Get database URL
    pub fn database_url(&self) -> &str {
        &self.common.database.url
    }

    /// Get database configuration
    pub fn database(&self) -> &DatabaseConfig {
        &self.common.database
    }

    /// Get Spotify application configuration
    pub fn spotify(&self) -> &SpotifyConfig {
        &self.common.spotify
    }

    /// Get environment mode
    pub fn environment(&self) -> Environment {
        self.common.environment
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.common.environment.is_production()
    }

    /// Assemble the scheduler tuning from this configuration
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            max_concurrent_jobs: self.max_concurrent_jobs,
            sync_interval_floor_minutes: self.sync_interval_floor_minutes,
            sync: SyncOptions {
                snapshots_enabled: self.snapshots_enabled,
                snapshot_retention: self.snapshot_retention,
            },
        }
    }
}
