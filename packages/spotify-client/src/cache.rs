//! Time-bounded memoization for read-only API calls
//!
//! Keyed by access token, so repeated reads within one sync run (and
//! back-to-back runs inside the expiry window) reuse the first response
//! instead of issuing duplicate calls.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::models::{Identity, PlaylistSummary};

/// A concurrent map whose entries expire after a fixed TTL
pub(crate) struct TtlMap<V> {
    entries: DashMap<String, (Instant, V)>,
    ttl: Duration,
}

impl<V: Clone> TtlMap<V> {
    fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        {
            let entry = self.entries.get(key)?;
            if entry.0.elapsed() < self.ttl {
                return Some(entry.1.clone());
            }
        }
        // Guard dropped above; safe to evict the stale entry now.
        self.entries.remove(key);
        None
    }

    pub fn insert(&self, key: &str, value: V) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries.insert(key.to_string(), (Instant::now(), value));
    }
}

/// Per-client cache over the read-only Spotify calls
pub(crate) struct ResponseCache {
    pub identities: TtlMap<Identity>,
    pub liked_tracks: TtlMap<Vec<String>>,
    pub playlists: TtlMap<Vec<PlaylistSummary>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            identities: TtlMap::new(ttl),
            liked_tracks: TtlMap::new(ttl),
            playlists: TtlMap::new(ttl),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_within_ttl() {
        let map = TtlMap::new(Duration::from_secs(60));
        map.insert("token", vec!["a".to_string()]);
        assert_eq!(map.get("token"), Some(vec!["a".to_string()]));
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let map = TtlMap::new(Duration::from_millis(10));
        map.insert("token", vec!["a".to_string()]);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(map.get("token"), None);
        assert!(map.entries.is_empty());
    }

    #[test]
    fn test_zero_ttl_disables_caching() {
        let map = TtlMap::new(Duration::ZERO);
        map.insert("token", vec!["a".to_string()]);
        assert_eq!(map.get("token"), None);
    }

    #[test]
    fn test_miss_on_unknown_key() {
        let map: TtlMap<Vec<String>> = TtlMap::new(Duration::from_secs(60));
        assert_eq!(map.get("absent"), None);
    }
}
