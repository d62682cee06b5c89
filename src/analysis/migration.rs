//! User agent migration across the cutoff.
//!
//! Joins the latest-observation sets of the two windows on peer identity
//! (full outer join) and counts peers per (before, after) category pair.
//! Peers seen only after the cutoff are `New`; peers seen only before are
//! `Gone`.

use std::collections::BTreeSet;

use super::classifier::classify;
use super::dedup::LatestByPeer;
use super::types::*;

/// One peer's category on each side of the cutoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerTransition {
    pub peer: PeerKey,
    pub before: Category,
    pub after: Category,
}

fn category_of(obs: &Observation) -> Category {
    obs.user_agent.as_deref().map(classify).unwrap_or(Category::Other)
}

/// Full outer join of the two windows, ordered by peer.
pub fn join_windows(before: &LatestByPeer, after: &LatestByPeer) -> Vec<PeerTransition> {
    let mut transitions: Vec<PeerTransition> = before
        .iter()
        .map(|(peer, obs)| PeerTransition {
            peer: peer.clone(),
            before: category_of(obs),
            after: after.get(peer).map(category_of).unwrap_or(Category::Gone),
        })
        .collect();

    transitions.extend(
        after
            .iter()
            .filter(|(peer, _)| !before.contains_key(*peer))
            .map(|(peer, obs)| PeerTransition {
                peer: peer.clone(),
                before: Category::New,
                after: category_of(obs),
            }),
    );

    transitions.sort_by(|a, b| a.peer.cmp(&b.peer));
    transitions
}

/// Peer counts per (before, after) category.
///
/// Rows cover every label except `Gone`, columns every label except `New`.
/// Zero cells are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionMatrix {
    rows: Vec<Category>,
    cols: Vec<Category>,
    cells: Vec<Vec<u64>>,
}

impl Default for TransitionMatrix {
    fn default() -> Self {
        let rows: Vec<Category> = Category::ALL
            .into_iter()
            .filter(|c| *c != Category::Gone)
            .collect();
        let cols: Vec<Category> = Category::ALL
            .into_iter()
            .filter(|c| *c != Category::New)
            .collect();
        let cells = vec![vec![0; cols.len()]; rows.len()];
        Self { rows, cols, cells }
    }
}

impl TransitionMatrix {
    /// Build the matrix from the latest observations of each window.
    pub fn from_windows(before: &LatestByPeer, after: &LatestByPeer) -> Self {
        let transitions = join_windows(before, after);
        log::info!(
            "Joined {} peers ({} before, {} after)",
            transitions.len(),
            before.len(),
            after.len()
        );
        Self::from_transitions(&transitions)
    }

    pub fn from_transitions(transitions: &[PeerTransition]) -> Self {
        let mut matrix = Self::default();
        for t in transitions {
            matrix.increment(t.before, t.after);
        }
        matrix
    }

    fn increment(&mut self, before: Category, after: Category) {
        match (self.row_index(before), self.col_index(after)) {
            (Some(row), Some(col)) => self.cells[row][col] += 1,
            _ => log::warn!("Ignoring impossible transition {} -> {}", before, after),
        }
    }

    fn row_index(&self, category: Category) -> Option<usize> {
        self.rows.iter().position(|c| *c == category)
    }

    fn col_index(&self, category: Category) -> Option<usize> {
        self.cols.iter().position(|c| *c == category)
    }

    pub fn rows(&self) -> &[Category] {
        &self.rows
    }

    pub fn cols(&self) -> &[Category] {
        &self.cols
    }

    pub fn cells(&self) -> &[Vec<u64>] {
        &self.cells
    }

    /// Count for a pair; zero for pairs outside the matrix.
    pub fn get(&self, before: Category, after: Category) -> u64 {
        match (self.row_index(before), self.col_index(after)) {
            (Some(row), Some(col)) => self.cells[row][col],
            _ => 0,
        }
    }

    /// Sum of every cell: the number of distinct peers in either window.
    pub fn total(&self) -> u64 {
        self.cells.iter().flatten().sum()
    }

    pub fn max_cell(&self) -> u64 {
        self.cells.iter().flatten().copied().max().unwrap_or(0)
    }

    /// Non-zero cells in row-major order, for flow diagrams.
    pub fn flows(&self) -> Vec<Flow> {
        let mut flows = Vec::new();
        for (row, before) in self.rows.iter().enumerate() {
            for (col, after) in self.cols.iter().enumerate() {
                let count = self.cells[row][col];
                if count > 0 {
                    flows.push(Flow {
                        before: *before,
                        after: *after,
                        count,
                    });
                }
            }
        }
        flows
    }

    /// Project the matrix through an axis policy.
    pub fn view(&self, policy: &AxisPolicy) -> MatrixView {
        let row_idx: Vec<usize> = (0..self.rows.len())
            .filter(|&i| !policy.hidden_rows.contains(&self.rows[i]))
            .collect();
        let col_idx: Vec<usize> = (0..self.cols.len())
            .filter(|&j| !policy.hidden_cols.contains(&self.cols[j]))
            .collect();

        let cells: Vec<Vec<u64>> = row_idx
            .iter()
            .map(|&i| col_idx.iter().map(|&j| self.cells[i][j]).collect())
            .collect();

        let shown: u64 = cells.iter().flatten().sum();
        let hidden_peers = self.total() - shown;
        if hidden_peers > 0 {
            log::warn!(
                "Axis policy hides {} peers from the transition matrix",
                hidden_peers
            );
        }

        MatrixView {
            rows: row_idx.iter().map(|&i| self.rows[i]).collect(),
            cols: col_idx.iter().map(|&j| self.cols[j]).collect(),
            cells,
            hidden_peers,
        }
    }
}

/// Labels to suppress per axis when presenting a matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxisPolicy {
    pub hidden_rows: BTreeSet<Category>,
    pub hidden_cols: BTreeSet<Category>,
}

impl AxisPolicy {
    /// Flow diagrams treat BIP-110 as the migration target only.
    pub fn sankey() -> Self {
        Self::default().hide_row(Category::UasfBip110)
    }

    pub fn hide_row(mut self, category: Category) -> Self {
        self.hidden_rows.insert(category);
        self
    }

    pub fn hide_col(mut self, category: Category) -> Self {
        self.hidden_cols.insert(category);
        self
    }
}

/// A matrix shaped for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixView {
    pub rows: Vec<Category>,
    pub cols: Vec<Category>,
    pub cells: Vec<Vec<u64>>,
    /// Peers counted in suppressed rows or columns
    pub hidden_peers: u64,
}
