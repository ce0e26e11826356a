//! Shared primitive types used across the entire control tower.

use crate::error::TowerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One heartbeat. The dashboard beats once every five seconds.
pub type Tick = u64;

/// A stable, unique identifier for any fixture entity.
pub type EntityId = String;

/// The canonical run identifier.
pub type RunId = String;

/// A fresh run identifier for interactive sessions.
pub fn new_run_id() -> RunId {
    format!("run-{}", uuid::Uuid::new_v4())
}

/// The six fixed revenue-lifecycle phases, in pipeline order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LifecycleStage {
    Catalog,
    #[serde(rename = "CPQ")]
    Cpq,
    Contracts,
    Orders,
    Assets,
    Billing,
}

impl LifecycleStage {
    /// Pipeline order. NEVER reorder — views iterate stages in this order.
    pub const ALL: [LifecycleStage; 6] = [
        Self::Catalog,
        Self::Cpq,
        Self::Contracts,
        Self::Orders,
        Self::Assets,
        Self::Billing,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Catalog   => "Catalog",
            Self::Cpq       => "CPQ",
            Self::Contracts => "Contracts",
            Self::Orders    => "Orders",
            Self::Assets    => "Assets",
            Self::Billing   => "Billing",
        }
    }
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LifecycleStage {
    type Err = TowerError;

    /// Case-insensitive, so `cpq`, `CPQ` and `Cpq` all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|stage| stage.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TowerError::UnknownStage { name: s.to_string() })
    }
}

/// Severity shared by issues and signals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// A stage selector as the dashboard filter bars use it: everything, or one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageFilter {
    #[default]
    All,
    Only(LifecycleStage),
}

impl StageFilter {
    pub fn matches(&self, stage: LifecycleStage) -> bool {
        match self {
            Self::All         => true,
            Self::Only(only)  => *only == stage,
        }
    }
}

impl FromStr for StageFilter {
    type Err = TowerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}
