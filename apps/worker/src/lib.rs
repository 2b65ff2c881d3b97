//! Reprise background sync worker
//!
//! Mirrors each enrolled user's liked songs into a managed playlist and
//! rotates dated snapshot playlists on a polling schedule. The binary in
//! `main.rs` wires the pieces together; this library exposes them so the
//! integration tests can drive the scheduler and jobs directly.

pub mod config;
pub mod error;
pub mod jobs;
pub mod scheduler;
pub mod store;
