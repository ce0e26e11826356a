//! Work queue — the operational inbox of issues raised by stage agents.
//!
//! Filtering and grouping are read-only views. The fix lifecycle
//! (`FixAction` applied to an `IssueStatus`) is the only rule that moves
//! an issue; the engine owns the mutable copy it is applied to.

use crate::{
    config::{Issue, IssueStatus},
    types::{LifecycleStage, Severity, StageFilter},
};
use serde::{Deserialize, Serialize};

/// The work queue's filter bar.
#[derive(Debug, Clone, Default)]
pub struct IssueQuery {
    pub stage:  StageFilter,
    /// Case-insensitive substring over title and description. Empty matches all.
    pub search: String,
}

impl IssueQuery {
    pub fn matches(&self, issue: &Issue) -> bool {
        if !self.stage.matches(issue.stage) {
            return false;
        }
        let needle = self.search.to_lowercase();
        issue.title.to_lowercase().contains(&needle)
            || issue.description.to_lowercase().contains(&needle)
    }
}

pub fn filter_issues<'a>(issues: &'a [Issue], query: &IssueQuery) -> Vec<&'a Issue> {
    issues.iter().filter(|i| query.matches(i)).collect()
}

/// Issues sharing one root cause.
#[derive(Debug, Clone, Serialize)]
pub struct RootCauseGroup<'a> {
    pub root_cause:   &'a str,
    pub issues:       Vec<&'a Issue>,
    pub impact_value: f64,
}

/// Group by root cause. Groups appear in order of their first issue.
pub fn group_by_root_cause<'a>(issues: &[&'a Issue]) -> Vec<RootCauseGroup<'a>> {
    let mut groups: Vec<RootCauseGroup<'a>> = Vec::new();
    for &issue in issues {
        match groups.iter_mut().find(|g| g.root_cause == issue.root_cause) {
            Some(group) => {
                group.issues.push(issue);
                group.impact_value += issue.impact_value;
            }
            None => groups.push(RootCauseGroup {
                root_cause:   &issue.root_cause,
                issues:       vec![issue],
                impact_value: issue.impact_value,
            }),
        }
    }
    groups
}

/// Per-stage issue count for the queue's stage chips.
pub fn count_by_stage(issues: &[Issue]) -> Vec<(LifecycleStage, usize)> {
    LifecycleStage::ALL
        .iter()
        .map(|stage| (*stage, issues.iter().filter(|i| i.stage == *stage).count()))
        .collect()
}

/// Most severe first, then largest impact. Stable for equal keys.
pub fn prioritized<'a>(issues: &[&'a Issue]) -> Vec<&'a Issue> {
    let mut ordered = issues.to_vec();
    ordered.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(b.impact_value.total_cmp(&a.impact_value))
    });
    ordered
}

pub fn critical_count(issues: &[Issue]) -> usize {
    issues.iter().filter(|i| i.severity == Severity::Critical).count()
}

// ── Fix lifecycle ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FixAction {
    Triage,
    ProposeFix,
    ApplyFix,
    VerifyFix,
}

impl FixAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Triage     => "triage",
            Self::ProposeFix => "propose_fix",
            Self::ApplyFix   => "apply_fix",
            Self::VerifyFix  => "verify_fix",
        }
    }

    /// The status an issue moves to, or why it cannot.
    ///
    /// New → Triaged, New | Triaged → FixProposed,
    /// FixProposed → Applied, Applied → Verified.
    pub fn apply(&self, from: IssueStatus) -> Result<IssueStatus, String> {
        use IssueStatus::*;
        match (self, from) {
            (Self::Triage, New)                   => Ok(Triaged),
            (Self::ProposeFix, New | Triaged)     => Ok(FixProposed),
            (Self::ApplyFix, FixProposed)         => Ok(Applied),
            (Self::VerifyFix, Applied)            => Ok(Verified),
            (action, status) => Err(format!(
                "cannot {} an issue in status {}",
                action.name(),
                status.as_str()
            )),
        }
    }
}
