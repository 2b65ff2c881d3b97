//! Spotify Web API client for Reprise
//!
//! Wraps the handful of Spotify endpoints the sync worker needs (identity,
//! liked tracks, playlist management, token grants) behind typed methods
//! with a uniform retry and rate-limit back-off policy.

mod cache;
mod client;
mod error;
mod models;

pub use client::SpotifyClient;
pub use error::{SpotifyError, SpotifyResult};
pub use models::{Identity, PlaylistSummary, TokenGrant};
