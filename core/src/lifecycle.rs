//! Lifecycle views — the stepper, the funnel tiles and the stage dashboards.

use crate::{
    config::{Agent, Issue, StageData, StageStatus, TowerConfig},
    error::{TowerError, TowerResult},
    types::LifecycleStage,
};
use serde::{Deserialize, Serialize};

/// Healthy and Stable stages render as on track; anything else gets flagged.
pub fn on_track(status: StageStatus) -> bool {
    matches!(status, StageStatus::Healthy | StageStatus::Stable)
}

#[derive(Debug, Clone, Serialize)]
pub struct StageDashboard<'a> {
    pub stage:  &'a StageData,
    pub issues: Vec<&'a Issue>,
    /// The stage's specialist agent, if one is assigned.
    pub agent:  Option<&'a Agent>,
}

/// A stage's page. `issues` is passed in so the caller's live statuses show.
pub fn stage_dashboard<'a>(
    config: &'a TowerConfig,
    issues: &'a [Issue],
    stage: LifecycleStage,
) -> TowerResult<StageDashboard<'a>> {
    let data = config
        .stage(stage)
        .ok_or_else(|| TowerError::UnknownStage { name: stage.name().to_string() })?;
    Ok(StageDashboard {
        stage:  data,
        issues: issues.iter().filter(|i| i.stage == stage).collect(),
        agent:  config.agents.iter().find(|a| a.specialty == stage),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioTotals {
    pub records:        u32,
    pub at_risk:        u32,
    pub pending:        u32,
    pub stages_flagged: usize,
    /// Mean stage health, 0–100.
    pub mean_health:    f64,
}

pub fn portfolio_totals(stages: &[StageData]) -> PortfolioTotals {
    let mean_health = if stages.is_empty() {
        0.0
    } else {
        stages.iter().map(|s| s.health as f64).sum::<f64>() / stages.len() as f64
    };
    PortfolioTotals {
        records:        stages.iter().map(|s| s.counts.total).sum(),
        at_risk:        stages.iter().map(|s| s.counts.at_risk).sum(),
        pending:        stages.iter().map(|s| s.counts.pending).sum(),
        stages_flagged: stages.iter().filter(|s| !on_track(s.status)).count(),
        mean_health,
    }
}
