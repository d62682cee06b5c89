//! User agent prevalence and migration analysis.
//!
//! This module classifies peer user agents, picks the latest observation of
//! each peer per time window, and aggregates leaderboards and transition
//! matrices across a cutoff.

pub mod types;
pub mod classifier;
pub mod dedup;
pub mod leaderboard;
pub mod migration;
pub mod pipeline;
pub mod report;

pub use types::*;
pub use classifier::classify;
pub use dedup::{latest_per_peer, LatestByPeer};
pub use leaderboard::{top_n, DEFAULT_LIMIT};
pub use migration::{AxisPolicy, MatrixView, TransitionMatrix};
pub use pipeline::{top_user_agents, user_agent_migrations, windowed_user_agents, WindowedLeaderboards};
pub use report::{format_leaderboard, format_matrix, write_json_report};
