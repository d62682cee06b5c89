//! Latest-observation-per-peer selection.
//!
//! For a window, every peer with at least one qualifying observation (inside
//! the window, user agent present) contributes exactly one record: the one
//! with the greatest timestamp.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use super::types::*;

/// Latest qualifying observation per peer, ordered by peer.
pub type LatestByPeer = BTreeMap<PeerKey, Observation>;

/// Select the most recent observation of each peer inside `window`.
///
/// Observations without a user agent are ignored. When several observations
/// share a peer's maximum timestamp, the one with the lexicographically
/// smallest user agent is kept, so the result does not depend on input order.
pub fn latest_per_peer<'a, I>(observations: I, window: Window) -> LatestByPeer
where
    I: IntoIterator<Item = &'a Observation>,
{
    let mut latest = LatestByPeer::new();

    for obs in observations {
        if obs.user_agent.is_none() || !window.contains(obs.timestamp) {
            continue;
        }

        match latest.entry(obs.peer()) {
            Entry::Vacant(slot) => {
                slot.insert(obs.clone());
            }
            Entry::Occupied(mut slot) => {
                if supersedes(obs, slot.get()) {
                    slot.insert(obs.clone());
                }
            }
        }
    }

    log::debug!(
        "{} window (cutoff {}): {} peers with a known user agent",
        window.title(),
        window.cutoff(),
        latest.len()
    );

    latest
}

fn supersedes(candidate: &Observation, current: &Observation) -> bool {
    candidate
        .timestamp
        .cmp(&current.timestamp)
        .then_with(|| current.user_agent.cmp(&candidate.user_agent))
        .is_gt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(address: &str, port: u16, timestamp: EpochSecs, ua: Option<&str>) -> Observation {
        Observation::new(address, port, timestamp, ua, true)
    }

    #[test]
    fn test_latest_within_window() {
        let rows = vec![
            obs("10.0.0.1", 8333, 10, Some("/a/")),
            obs("10.0.0.1", 8333, 20, Some("/b/")),
            obs("10.0.0.1", 8333, 30, Some("/c/")),
        ];

        let latest = latest_per_peer(&rows, Window::Before(Cutoff::new(25)));
        assert_eq!(latest.len(), 1);
        let selected = &latest[&PeerKey::new("10.0.0.1", 8333)];
        assert_eq!(selected.timestamp, 20);
        assert_eq!(selected.user_agent.as_deref(), Some("/b/"));

        let latest = latest_per_peer(&rows, Window::AtOrAfter(Cutoff::new(25)));
        assert_eq!(latest[&PeerKey::new("10.0.0.1", 8333)].timestamp, 30);
    }

    #[test]
    fn test_port_is_part_of_identity() {
        let rows = vec![
            obs("10.0.0.1", 8333, 10, Some("/a/")),
            obs("10.0.0.1", 18333, 11, Some("/b/")),
        ];

        let latest = latest_per_peer(&rows, Window::Before(Cutoff::new(100)));
        assert_eq!(latest.len(), 2);
    }

    #[test]
    fn test_null_user_agent_is_skipped() {
        let rows = vec![
            obs("10.0.0.1", 8333, 10, Some("/old/")),
            obs("10.0.0.1", 8333, 20, None),
            obs("10.0.0.2", 8333, 20, None),
        ];

        let latest = latest_per_peer(&rows, Window::Before(Cutoff::new(100)));
        // A later null does not hide the earlier user agent, and a peer with
        // only nulls contributes nothing.
        assert_eq!(latest.len(), 1);
        assert_eq!(
            latest[&PeerKey::new("10.0.0.1", 8333)].user_agent.as_deref(),
            Some("/old/")
        );
    }

    #[test]
    fn test_peer_without_qualifying_rows_is_absent() {
        let rows = vec![obs("10.0.0.1", 8333, 50, Some("/a/"))];
        let latest = latest_per_peer(&rows, Window::Before(Cutoff::new(50)));
        assert!(latest.is_empty());
    }

    #[test]
    fn test_tie_break_is_smallest_user_agent() {
        let forward = vec![
            obs("10.0.0.1", 8333, 40, Some("/Satoshi:30.0.0/")),
            obs("10.0.0.1", 8333, 40, Some("/Knots:1.0/")),
        ];
        let reversed: Vec<Observation> = forward.iter().rev().cloned().collect();

        let window = Window::Before(Cutoff::new(100));
        let a = latest_per_peer(&forward, window);
        let b = latest_per_peer(&reversed, window);

        assert_eq!(a, b);
        assert_eq!(
            a[&PeerKey::new("10.0.0.1", 8333)].user_agent.as_deref(),
            Some("/Knots:1.0/")
        );
    }
}
