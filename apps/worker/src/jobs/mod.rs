//! Background job definitions
//!
//! One job type exists today: the liked-songs sync, which mirrors a user's
//! saved tracks into the managed playlist and rotates dated snapshots.

pub mod liked_songs_sync;
pub mod snapshots;

pub use liked_songs_sync::{SyncOptions, SyncReport};
