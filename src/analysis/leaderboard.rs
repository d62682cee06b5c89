//! Top-N user agent counts.

use std::collections::BTreeMap;

use super::dedup::latest_per_peer;
use super::types::*;

/// Default number of rows kept in a leaderboard.
pub const DEFAULT_LIMIT: usize = 20;

/// Count occurrences of each label. Keys come back in byte order.
pub fn count_labels<I, S>(labels: I) -> BTreeMap<String, u64>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for label in labels {
        *counts.entry(label.as_ref().to_string()).or_insert(0) += 1;
    }
    counts
}

/// Order counts descending and keep the first `limit`.
///
/// The sort is stable, so equal counts keep their input order.
pub fn top_n<I>(counts: I, limit: usize) -> Vec<RankedCount>
where
    I: IntoIterator<Item = (String, u64)>,
{
    let mut ranked: Vec<RankedCount> = counts
        .into_iter()
        .map(|(label, count)| RankedCount::new(label, count))
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}

/// Most common user agents over every successful observation.
///
/// Counts observations, not peers: a peer seen a hundred times counts a
/// hundred times.
pub fn all_time_leaderboard(observations: &[Observation], limit: usize) -> Leaderboard {
    let counts = count_labels(
        observations
            .iter()
            .filter(|obs| obs.success)
            .filter_map(|obs| obs.user_agent.as_deref()),
    );

    Leaderboard {
        title: "Top User Agents".to_string(),
        entries: top_n(counts, limit),
    }
}

/// Most common latest user agent per peer inside `window`.
pub fn windowed_leaderboard(
    observations: &[Observation],
    window: Window,
    limit: usize,
) -> Leaderboard {
    let latest = latest_per_peer(observations, window);
    let counts = count_labels(
        latest
            .values()
            .filter_map(|obs| obs.user_agent.as_deref()),
    );

    Leaderboard {
        title: window.title().to_string(),
        entries: top_n(counts, limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_labels() {
        let counts = count_labels(["/b/", "/a/", "/b/", "/b/", "/a/", "/c/"]);
        let pairs: Vec<(&str, u64)> = counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(pairs, vec![("/a/", 2), ("/b/", 3), ("/c/", 1)]);
        assert!(count_labels(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_top_n_truncates_in_order() {
        let counts = vec![
            ("A".to_string(), 50),
            ("B".to_string(), 30),
            ("C".to_string(), 10),
        ];
        let top = top_n(counts, 2);
        assert_eq!(top, vec![RankedCount::new("A", 50), RankedCount::new("B", 30)]);
    }

    #[test]
    fn test_top_n_sorts_descending_and_keeps_tie_order() {
        let counts = vec![
            ("low".to_string(), 1),
            ("tie-first".to_string(), 5),
            ("high".to_string(), 9),
            ("tie-second".to_string(), 5),
        ];
        let labels: Vec<String> = top_n(counts, 10).into_iter().map(|r| r.label).collect();
        assert_eq!(labels, vec!["high", "tie-first", "tie-second", "low"]);
    }

    #[test]
    fn test_top_n_empty() {
        assert!(top_n(Vec::<(String, u64)>::new(), DEFAULT_LIMIT).is_empty());
    }

    #[test]
    fn test_all_time_counts_successful_rows_only() {
        let rows = vec![
            Observation::new("a", 1, 1, Some("/x/"), true),
            Observation::new("a", 1, 2, Some("/x/"), true),
            Observation::new("b", 1, 3, Some("/y/"), true),
            Observation::new("c", 1, 4, Some("/y/"), false),
            Observation::new("d", 1, 5, None, true),
        ];

        let board = all_time_leaderboard(&rows, DEFAULT_LIMIT);
        assert_eq!(
            board.entries,
            vec![RankedCount::new("/x/", 2), RankedCount::new("/y/", 1)]
        );
    }

    #[test]
    fn test_windowed_counts_one_per_peer() {
        let rows = vec![
            Observation::new("a", 1, 1, Some("/old/"), true),
            Observation::new("a", 1, 2, Some("/new/"), true),
            Observation::new("b", 1, 3, Some("/new/"), false),
            Observation::new("c", 1, 4, Some("/old/"), true),
            Observation::new("d", 1, 50, Some("/later/"), true),
        ];

        let board = windowed_leaderboard(&rows, Window::Before(Cutoff::new(10)), DEFAULT_LIMIT);
        assert_eq!(board.title, "BEFORE");
        assert_eq!(
            board.entries,
            vec![RankedCount::new("/new/", 2), RankedCount::new("/old/", 1)]
        );

        let board = windowed_leaderboard(&rows, Window::AtOrAfter(Cutoff::new(10)), DEFAULT_LIMIT);
        assert_eq!(board.title, "AFTER");
        assert_eq!(board.entries, vec![RankedCount::new("/later/", 1)]);
    }
}
