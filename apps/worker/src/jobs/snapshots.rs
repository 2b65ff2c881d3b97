//! Snapshot playlist naming and retention selection

use chrono::NaiveDate;
use reprise_spotify_client::PlaylistSummary;

/// Display name of the playlist kept in sync with liked songs
pub const MANAGED_PLAYLIST_NAME: &str = "Liked Songs";

/// Render the dated snapshot name, e.g. `Liked Songs (Aug 5, 2026)`
pub fn snapshot_name(date: NaiveDate) -> String {
    format!(
        "{} ({})",
        MANAGED_PLAYLIST_NAME,
        date.format("%b %-d, %Y")
    )
}

/// Parse the date out of a snapshot name; anything off-template is `None`
pub fn parse_snapshot_date(name: &str) -> Option<NaiveDate> {
    let inner = name
        .strip_prefix(MANAGED_PLAYLIST_NAME)?
        .strip_prefix(" (")?
        .strip_suffix(')')?;
    NaiveDate::parse_from_str(inner, "%b %d, %Y").ok()
}

/// Ids of the snapshots to delete, keeping only the `keep` most recent
///
/// Playlists whose names do not parse are neither kept nor deleted; they are
/// simply not snapshots.
pub fn select_prunable(playlists: &[PlaylistSummary], keep: usize) -> Vec<String> {
    let mut dated: Vec<(NaiveDate, &PlaylistSummary)> = playlists
        .iter()
        .filter_map(|playlist| parse_snapshot_date(&playlist.name).map(|date| (date, playlist)))
        .collect();
    dated.sort_by(|a, b| b.0.cmp(&a.0));
    dated
        .into_iter()
        .skip(keep)
        .map(|(_, playlist)| playlist.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist(id: &str, name: &str) -> PlaylistSummary {
        PlaylistSummary {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_snapshot_name_format() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        assert_eq!(snapshot_name(date), "Liked Songs (Aug 5, 2026)");

        let date = NaiveDate::from_ymd_opt(2025, 12, 25).unwrap();
        assert_eq!(snapshot_name(date), "Liked Songs (Dec 25, 2025)");
    }

    #[test]
    fn test_name_round_trip() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();
        assert_eq!(parse_snapshot_date(&snapshot_name(date)), Some(date));
    }

    #[test]
    fn test_off_template_names_do_not_parse() {
        assert_eq!(parse_snapshot_date("Liked Songs"), None);
        assert_eq!(parse_snapshot_date("Liked Songs (not a date)"), None);
        assert_eq!(parse_snapshot_date("Road Trip Mix"), None);
        assert_eq!(parse_snapshot_date("Liked Songs (Aug 5, 2026"), None);
        assert_eq!(parse_snapshot_date("liked songs (Aug 5, 2026)"), None);
    }

    #[test]
    fn test_retention_deletes_exactly_the_oldest() {
        let playlists: Vec<PlaylistSummary> = (1..=8)
            .map(|day| {
                let date = NaiveDate::from_ymd_opt(2026, 3, day).unwrap();
                playlist(&format!("snap-{}", day), &snapshot_name(date))
            })
            .collect();

        let mut prunable = select_prunable(&playlists, 5);
        prunable.sort();
        assert_eq!(prunable, vec!["snap-1", "snap-2", "snap-3"]);
    }

    #[test]
    fn test_unparseable_names_are_never_deleted() {
        let mut playlists: Vec<PlaylistSummary> = (1..=8)
            .map(|day| {
                let date = NaiveDate::from_ymd_opt(2026, 3, day).unwrap();
                playlist(&format!("snap-{}", day), &snapshot_name(date))
            })
            .collect();
        playlists.push(playlist("mix", "Workout Mix"));
        playlists.push(playlist("managed", MANAGED_PLAYLIST_NAME));

        let prunable = select_prunable(&playlists, 5);
        assert_eq!(prunable.len(), 3);
        assert!(!prunable.contains(&"mix".to_string()));
        assert!(!prunable.contains(&"managed".to_string()));
    }

    #[test]
    fn test_under_retention_deletes_nothing() {
        let playlists: Vec<PlaylistSummary> = (1..=4)
            .map(|day| {
                let date = NaiveDate::from_ymd_opt(2026, 3, day).unwrap();
                playlist(&format!("snap-{}", day), &snapshot_name(date))
            })
            .collect();
        assert!(select_prunable(&playlists, 5).is_empty());
    }
}
