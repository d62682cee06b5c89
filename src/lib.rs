//! # NodeHistory - User agent analysis for Bitcoin node history
//!
//! This library reads a historical log of Bitcoin peer observations and
//! reports which client software peers ran, and how that changed around a
//! cutoff time.
//!
//! ## Overview
//!
//! A node history database holds one row per sighting of a peer in its
//! `nodes` table: `address`, `port`, `timestamp` (epoch seconds),
//! `user_agent` and a `success` flag. From that the library produces:
//!
//! - **All-time leaderboard**: most common user agents over every successful
//!   observation
//! - **Windowed leaderboards**: most common *latest* user agent per peer,
//!   before and after the cutoff
//! - **Migration matrix**: peers counted by category before and after the
//!   cutoff, with `New` and `Gone` for peers seen on one side only
//!
//! ## Architecture
//!
//! - `store`: read-only observation sources (SQLite file or in memory)
//! - `analysis::classifier`: user agent to category mapping
//! - `analysis::dedup`: latest observation per peer inside a window
//! - `analysis::leaderboard`: top-N counting
//! - `analysis::migration`: full outer join and transition matrix
//! - `analysis::report`: text tables and JSON artifacts
//! - `config`: explicit run configuration and cutoff parsing
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use nodehistory::analysis::{self, AxisPolicy, LabelStyle};
//! use nodehistory::{config, store::SqliteSource};
//!
//! let cutoff = config::cutoff_from_env()?;
//! let source = SqliteSource::open(Path::new("nodes_history.sqlite"), "nodes")?;
//!
//! let matrix = analysis::user_agent_migrations(&source, cutoff)?;
//! let view = matrix.view(&AxisPolicy::default());
//! print!("{}", analysis::format_matrix(&view, LabelStyle::Core));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! Library functions return typed errors (`ConfigError`, `DataSourceError`).
//! The binary wraps them with `color_eyre` for reporting.

pub mod analysis;
pub mod config;
pub mod error;
pub mod store;

pub use error::{ConfigError, DataSourceError};
