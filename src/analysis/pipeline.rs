//! Query-then-aggregate entry points.
//!
//! Each function pulls the observations it needs from a source and runs the
//! matching aggregation over them.

use super::dedup::latest_per_peer;
use super::leaderboard::{all_time_leaderboard, windowed_leaderboard};
use super::migration::TransitionMatrix;
use super::types::*;
use crate::error::DataSourceError;
use crate::store::{ObservationQuery, ObservationSource};

/// Leaderboards for the two windows around a cutoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowedLeaderboards {
    pub before: Leaderboard,
    pub after: Leaderboard,
}

/// Most common user agents over all successful observations.
pub fn top_user_agents<S>(source: &S, limit: usize) -> Result<Leaderboard, DataSourceError>
where
    S: ObservationSource + ?Sized,
{
    let rows = source.observations(&ObservationQuery::successful())?;
    Ok(all_time_leaderboard(&rows, limit))
}

/// Most common latest-per-peer user agents before and after `cutoff`.
pub fn windowed_user_agents<S>(
    source: &S,
    cutoff: Cutoff,
    limit: usize,
) -> Result<WindowedLeaderboards, DataSourceError>
where
    S: ObservationSource + ?Sized,
{
    let before_window = Window::Before(cutoff);
    let after_window = Window::AtOrAfter(cutoff);

    let before_rows = source.observations(&ObservationQuery::in_window(before_window))?;
    let after_rows = source.observations(&ObservationQuery::in_window(after_window))?;

    Ok(WindowedLeaderboards {
        before: windowed_leaderboard(&before_rows, before_window, limit),
        after: windowed_leaderboard(&after_rows, after_window, limit),
    })
}

/// Category transitions of every peer across `cutoff`.
pub fn user_agent_migrations<S>(source: &S, cutoff: Cutoff) -> Result<TransitionMatrix, DataSourceError>
where
    S: ObservationSource + ?Sized,
{
    let before_window = Window::Before(cutoff);
    let after_window = Window::AtOrAfter(cutoff);

    let before_rows = source.observations(&ObservationQuery::in_window(before_window))?;
    let after_rows = source.observations(&ObservationQuery::in_window(after_window))?;

    let before = latest_per_peer(&before_rows, before_window);
    let after = latest_per_peer(&after_rows, after_window);

    Ok(TransitionMatrix::from_windows(&before, &after))
}
