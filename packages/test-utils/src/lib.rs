//! Shared test utilities for the Reprise workspace
//!
//! Provides a mock Spotify server plus small fixture generators used by the
//! client and worker test suites.

mod spotify;

pub use spotify::{track_ids, MockSpotifyServer};
