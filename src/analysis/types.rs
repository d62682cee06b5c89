//! Core data types for user agent analysis.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Timestamp in seconds since the Unix epoch, as stored in the `nodes` table.
pub type EpochSecs = i64;

/// One recorded sighting of a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub address: String,
    pub port: u16,
    pub timestamp: EpochSecs,
    pub user_agent: Option<String>,
    pub success: bool,
}

impl Observation {
    pub fn new(
        address: impl Into<String>,
        port: u16,
        timestamp: EpochSecs,
        user_agent: Option<&str>,
        success: bool,
    ) -> Self {
        Self {
            address: address.into(),
            port,
            timestamp,
            user_agent: user_agent.map(String::from),
            success,
        }
    }

    /// Identity of the peer this observation belongs to.
    pub fn peer(&self) -> PeerKey {
        PeerKey {
            address: self.address.clone(),
            port: self.port,
        }
    }
}

/// A network endpoint, identified by address and port.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerKey {
    pub address: String,
    pub port: u16,
}

impl PeerKey {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

impl fmt::Display for PeerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Bracket IPv6 literals so the port stays unambiguous
        if self.address.contains(':') {
            write!(f, "[{}]:{}", self.address, self.port)
        } else {
            write!(f, "{}:{}", self.address, self.port)
        }
    }
}

/// The instant that splits the history into a before and an after window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cutoff(EpochSecs);

impl Cutoff {
    pub fn new(secs: EpochSecs) -> Self {
        Self(secs)
    }

    pub fn secs(self) -> EpochSecs {
        self.0
    }

    /// RFC 3339 rendering in UTC, if the timestamp is representable.
    pub fn to_rfc3339(self) -> Option<String> {
        chrono::DateTime::from_timestamp(self.0, 0).map(|dt| dt.to_rfc3339())
    }
}

impl fmt::Display for Cutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Half-open time range relative to a cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Window {
    /// `timestamp < cutoff`
    Before(Cutoff),
    /// `timestamp >= cutoff`
    AtOrAfter(Cutoff),
}

impl Window {
    pub fn contains(&self, timestamp: EpochSecs) -> bool {
        match self {
            Window::Before(cutoff) => timestamp < cutoff.secs(),
            Window::AtOrAfter(cutoff) => timestamp >= cutoff.secs(),
        }
    }

    pub fn cutoff(&self) -> Cutoff {
        match self {
            Window::Before(cutoff) | Window::AtOrAfter(cutoff) => *cutoff,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Window::Before(_) => "BEFORE",
            Window::AtOrAfter(_) => "AFTER",
        }
    }
}

/// How the BIP-110 signalling bucket is spelled in output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelStyle {
    /// `UASF-BIP110`, as used by the transition table and heatmap
    #[default]
    Core,
    /// `BIP-110`, as used by flow diagrams
    Sankey,
}

/// Taxonomy bucket for a user agent, plus the synthetic migration labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Core30")]
    Core30,
    #[serde(rename = "Core28-29")]
    Core28To29,
    #[serde(rename = "OlderCore")]
    OlderCore,
    #[serde(rename = "Knots")]
    Knots,
    #[serde(rename = "UASF-BIP110")]
    UasfBip110,
    #[serde(rename = "Other")]
    Other,
    /// Peer absent before the cutoff
    #[serde(rename = "New")]
    New,
    /// Peer absent after the cutoff
    #[serde(rename = "Gone")]
    Gone,
}

impl Category {
    /// Display order for every label.
    pub const ALL: [Category; 8] = [
        Category::Core30,
        Category::Core28To29,
        Category::OlderCore,
        Category::Knots,
        Category::UasfBip110,
        Category::Other,
        Category::New,
        Category::Gone,
    ];

    /// Labels a user agent string can be classified into.
    pub const TAXONOMY: [Category; 6] = [
        Category::Core30,
        Category::Core28To29,
        Category::OlderCore,
        Category::Knots,
        Category::UasfBip110,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        self.label(LabelStyle::Core)
    }

    pub fn label(self, style: LabelStyle) -> &'static str {
        match self {
            Category::Core30 => "Core30",
            Category::Core28To29 => "Core28-29",
            Category::OlderCore => "OlderCore",
            Category::Knots => "Knots",
            Category::UasfBip110 => match style {
                LabelStyle::Core => "UASF-BIP110",
                LabelStyle::Sankey => "BIP-110",
            },
            Category::Other => "Other",
            Category::New => "New",
            Category::Gone => "Gone",
        }
    }

    pub fn is_synthetic(self) -> bool {
        matches!(self, Category::New | Category::Gone)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "BIP-110" {
            return Ok(Category::UasfBip110);
        }
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownLabel(s.to_string()))
    }
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCount {
    pub label: String,
    pub count: u64,
}

impl RankedCount {
    pub fn new(label: impl Into<String>, count: u64) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// Titled, descending list of user agent counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub title: String,
    pub entries: Vec<RankedCount>,
}

/// A non-zero link between a before label and an after label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub before: Category,
    pub after: Category,
    pub count: u64,
}

/// A flow with both endpoints spelled in a report's label style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledFlow {
    pub before: String,
    pub after: String,
    pub count: u64,
}

impl LabeledFlow {
    pub fn new(flow: &Flow, style: LabelStyle) -> Self {
        Self {
            before: flow.before.label(style).to_string(),
            after: flow.after.label(style).to_string(),
            count: flow.count,
        }
    }
}

/// Inputs that shaped a report, repeated in every artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub database: String,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutoff: Option<EpochSecs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutoff_utc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// All-time leaderboard of successfully contacted peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopAgentsReport {
    pub metadata: ReportMetadata,
    pub leaderboard: Leaderboard,
}

/// Per-window leaderboards of each peer's latest user agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowedAgentsReport {
    pub metadata: ReportMetadata,
    pub before: Leaderboard,
    pub after: Leaderboard,
}

/// Transition matrix between categories across the cutoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    pub metadata: ReportMetadata,
    pub label_style: LabelStyle,
    /// Row labels (before the cutoff)
    pub rows: Vec<String>,
    /// Column labels (after the cutoff)
    pub cols: Vec<String>,
    /// `cells[row][col]`, zeros kept
    pub cells: Vec<Vec<u64>>,
    /// Non-zero cells, labelled like `rows` and `cols`
    pub flows: Vec<LabeledFlow>,
    /// Distinct peers seen in either window
    pub total_peers: u64,
    /// Peers whose row or column was suppressed from `cells`
    pub hidden_peers: u64,
}
