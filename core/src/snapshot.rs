//! Dashboard snapshot — everything a UI client needs to render one frame.
//!
//! A snapshot is built on demand for clients and saved to the audit trail
//! every SNAPSHOT_INTERVAL ticks.

use crate::{
    config::{Agent, Issue, KpiMetrics, Signal, StageData},
    lifecycle::PortfolioTotals,
    rule_catalog::{ControlPlaneStats, StageUsage},
    scenario::{ImpactResult, ScenarioParams},
    types::{RunId, Tick},
};
use serde::{Deserialize, Serialize};

/// One hour of five-second beats.
pub const SNAPSHOT_INTERVAL: Tick = 720;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabPreview {
    pub params:         ScenarioParams,
    pub impact:         ImpactResult,
    pub revenue_label:  String,
    pub ops_load_label: String,
}

impl LabPreview {
    pub fn new(params: ScenarioParams, impact: ImpactResult) -> Self {
        Self {
            revenue_label:  impact.revenue_label(),
            ops_load_label: impact.ops_load_label(),
            params,
            impact,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub run_id:        RunId,
    pub tick:          Tick,
    /// The wrapped counter shown in the header.
    pub heartbeat:     Tick,
    pub stages:        Vec<StageData>,
    pub totals:        PortfolioTotals,
    pub issues:        Vec<Issue>,
    pub agents:        Vec<Agent>,
    pub signals:       Vec<Signal>,
    pub kpi_metrics:   KpiMetrics,
    pub top_insights:  Vec<String>,
    pub control_plane: ControlPlaneStats,
    pub usage:         Vec<StageUsage>,
    /// The lab at its last evaluated parameters.
    pub lab:           LabPreview,
}
