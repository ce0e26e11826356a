//! Rule catalog — the logic control plane over business rule sets.

use crate::{
    config::{
        ControlPlaneBaseline, EvaluationLog, Rule, RuleSet, RuleStatus, RuleVersion, TowerConfig,
    },
    error::{TowerError, TowerResult},
    types::{LifecycleStage, StageFilter},
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The status chips above the rule-set list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Status(RuleStatus),
    /// Violations above the trending threshold, whatever the status.
    Trending,
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL"      => Ok(Self::All),
            "TRENDING" => Ok(Self::Trending),
            other => RuleStatus::parse(other)
                .map(Self::Status)
                .ok_or_else(|| format!("unknown rule status filter '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleSetQuery {
    pub area:   StageFilter,
    pub status: StatusFilter,
    /// Case-insensitive substring over name and description.
    pub search: String,
}

pub fn is_trending(rule_set: &RuleSet, baseline: &ControlPlaneBaseline) -> bool {
    rule_set.violations_90d > baseline.trending_violations_above
}

pub fn filter_rule_sets<'a>(config: &'a TowerConfig, query: &RuleSetQuery) -> Vec<&'a RuleSet> {
    let needle = query.search.to_lowercase();
    config
        .rule_sets
        .iter()
        .filter(|rs| query.area.matches(rs.area))
        .filter(|rs| match query.status {
            StatusFilter::All            => true,
            StatusFilter::Status(status) => rs.status == status,
            StatusFilter::Trending       => is_trending(rs, &config.control_plane),
        })
        .filter(|rs| {
            rs.name.to_lowercase().contains(&needle)
                || rs.description.to_lowercase().contains(&needle)
        })
        .collect()
}

/// One row of the usage map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageUsage {
    pub stage:    LifecycleStage,
    /// Rule sets in ACTIVE status.
    pub now:      usize,
    pub trending: usize,
    pub legacy:   usize,
}

pub fn usage_map(config: &TowerConfig) -> Vec<StageUsage> {
    LifecycleStage::ALL
        .iter()
        .map(|stage| {
            let area_sets: Vec<&RuleSet> =
                config.rule_sets.iter().filter(|rs| rs.area == *stage).collect();
            StageUsage {
                stage:    *stage,
                now:      area_sets.iter().filter(|rs| rs.status == RuleStatus::Active).count(),
                trending: area_sets.iter().filter(|rs| is_trending(rs, &config.control_plane)).count(),
                legacy:   area_sets.iter().filter(|rs| rs.status == RuleStatus::Legacy).count(),
            }
        })
        .collect()
}

/// The health strip on the control plane.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ControlPlaneStats {
    pub rules_in_prod:     u32,
    pub tests_passing:     String,
    pub pending_approvals: u32,
    pub drift_alerts:      u32,
}

pub fn control_plane_stats(config: &TowerConfig) -> ControlPlaneStats {
    let active = config
        .rule_sets
        .iter()
        .filter(|rs| rs.status == RuleStatus::Active)
        .count() as u32;
    let baseline = &config.control_plane;
    ControlPlaneStats {
        rules_in_prod:     active + baseline.rules_outside_fixture,
        tests_passing:     baseline.tests_passing.clone(),
        pending_approvals: baseline.pending_approvals,
        drift_alerts:      baseline.drift_alerts,
    }
}

/// Everything the rule-set drawer shows.
#[derive(Debug, Clone, Serialize)]
pub struct RuleSetDetail<'a> {
    pub rule_set:    &'a RuleSet,
    pub rules:       Vec<&'a Rule>,
    pub versions:    Vec<&'a RuleVersion>,
    /// The set that supersedes this one, if any.
    pub replacement: Option<&'a RuleSet>,
}

pub fn rule_set_detail<'a>(config: &'a TowerConfig, id: &str) -> TowerResult<RuleSetDetail<'a>> {
    let rule_set = config
        .rule_set(id)
        .ok_or_else(|| TowerError::UnknownRuleSet { id: id.to_string() })?;
    Ok(RuleSetDetail {
        rule_set,
        rules:       config.rules.iter().filter(|r| r.rule_set_id == id).collect(),
        versions:    config.versions.iter().filter(|v| v.rule_set_id == id).collect(),
        replacement: rule_set.replacement_id.as_deref().and_then(|r| config.rule_set(r)),
    })
}

/// An evaluation log joined with the rule set and rule that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt<'a> {
    pub log:      &'a EvaluationLog,
    pub rule_set: &'a RuleSet,
    pub rule:     &'a Rule,
}

fn receipt_for<'a>(config: &'a TowerConfig, log: &'a EvaluationLog) -> Option<Receipt<'a>> {
    Some(Receipt {
        log,
        rule_set: config.rule_set(&log.rule_set_id)?,
        rule:     config.rules.iter().find(|r| r.id == log.rule_id)?,
    })
}

pub fn receipt<'a>(config: &'a TowerConfig, log_id: &str) -> Option<Receipt<'a>> {
    let log = config.evaluation_logs.iter().find(|l| l.id == log_id)?;
    receipt_for(config, log)
}

/// The first logged evaluation of a rule, as the drawer's "show receipt" link opens.
pub fn receipt_for_rule<'a>(config: &'a TowerConfig, rule_id: &str) -> Option<Receipt<'a>> {
    let log = config.evaluation_logs.iter().find(|l| l.rule_id == rule_id)?;
    receipt_for(config, log)
}

/// Legacy rule sets paired with the set replacing them. Safe-to-retire candidates.
pub fn retirement_candidates(config: &TowerConfig) -> Vec<(&RuleSet, Option<&RuleSet>)> {
    config
        .rule_sets
        .iter()
        .filter(|rs| rs.status == RuleStatus::Legacy)
        .map(|rs| (rs, rs.replacement_id.as_deref().and_then(|r| config.rule_set(r))))
        .collect()
}
