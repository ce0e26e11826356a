//! The control tower fixture.
//!
//! Every business number on the dashboard comes from here. The fixture is
//! read-only: the engine copies what it mutates (issue status) into its own
//! state and never writes back.

use crate::{
    error::{TowerError, TowerResult},
    types::{EntityId, LifecycleStage, Severity},
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// ── Lifecycle stages ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StageStatus {
    Stable,
    Healthy,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageCounts {
    pub total:   u32,
    pub at_risk: u32,
    pub pending: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageMetric {
    pub label: String,
    pub value: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageData {
    pub name:    LifecycleStage,
    /// 0–100.
    pub health:  u8,
    pub status:  StageStatus,
    pub counts:  StageCounts,
    #[serde(default)]
    pub metrics: Vec<StageMetric>,
}

#[derive(Debug, Clone, Deserialize)]
struct StagesFile {
    stages: Vec<StageData>,
}

// ── Issues ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum IssueStatus {
    New,
    Triaged,
    FixProposed,
    Applied,
    Verified,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New         => "New",
            Self::Triaged     => "Triaged",
            Self::FixProposed => "FixProposed",
            Self::Applied     => "Applied",
            Self::Verified    => "Verified",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "New"         => Some(Self::New),
            "Triaged"     => Some(Self::Triaged),
            "FixProposed" => Some(Self::FixProposed),
            "Applied"     => Some(Self::Applied),
            "Verified"    => Some(Self::Verified),
            _             => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id:                EntityId,
    pub stage:             LifecycleStage,
    pub title:             String,
    /// Plain-language impact, e.g. "$120k ARR risk".
    pub impact:            String,
    pub description:       String,
    pub root_cause:        String,
    pub impact_value:      f64,
    pub severity:          Severity,
    pub status:            IssueStatus,
    /// Routing team: Deal Desk, RevOps, Billing...
    pub owner:             String,
    pub suggested_actions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct IssuesFile {
    issues: Vec<Issue>,
}

// ── Agents and signals ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AgentStatus {
    Idle,
    Analyzing,
    ProposingFix,
    Monitoring,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id:        EntityId,
    pub name:      String,
    pub specialty: LifecycleStage,
    pub status:    AgentStatus,
    pub reasoning: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AgentsFile {
    agents: Vec<Agent>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SignalKind {
    Anomaly,
    Risk,
    Opportunity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id:           EntityId,
    /// A stage name or an external feed.
    pub source:       String,
    pub kind:         SignalKind,
    pub severity:     Severity,
    pub summary:      String,
    pub impact_value: String,
    pub probability:  f64,
    pub timestamp:    NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
struct SignalsFile {
    signals: Vec<Signal>,
}

// ── Business rules ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleStatus {
    Active,
    Dormant,
    Legacy,
    Proposed,
    Deprecated,
}

impl RuleStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE"     => Some(Self::Active),
            "DORMANT"    => Some(Self::Dormant),
            "LEGACY"     => Some(Self::Legacy),
            "PROPOSED"   => Some(Self::Proposed),
            "DEPRECATED" => Some(Self::Deprecated),
            _            => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    pub id:              EntityId,
    pub name:            String,
    pub area:            LifecycleStage,
    pub owner:           String,
    pub description:     String,
    pub status:          RuleStatus,
    pub current_version: String,
    pub evaluations_7d:  u64,
    pub evaluations_30d: u64,
    pub evaluations_90d: u64,
    pub violations_90d:  u64,
    pub issues_count:    u32,
    pub last_change:     String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_source:   Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement_id:  Option<EntityId>,
}

#[derive(Debug, Clone, Deserialize)]
struct RuleSetsFile {
    rule_sets: Vec<RuleSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id:              EntityId,
    pub rule_set_id:     EntityId,
    pub name:            String,
    pub status:          RuleStatus,
    pub summary:         String,
    pub inputs:          BTreeMap<String, String>,
    pub outputs:         BTreeMap<String, String>,
    pub last_triggered:  String,
    pub evaluations_90d: u64,
    pub violations_90d:  u64,
}

#[derive(Debug, Clone, Deserialize)]
struct RulesFile {
    rules: Vec<Rule>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeployEnv {
    Prod,
    Stage,
    Dev,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleVersion {
    pub id:          EntityId,
    pub rule_set_id: EntityId,
    pub version:     String,
    pub created_at:  NaiveDate,
    pub created_by:  String,
    pub reason:      String,
    pub env:         DeployEnv,
    #[serde(default)]
    pub deployed_at: Option<NaiveDate>,
    pub diff_plain:  String,
    #[serde(default)]
    pub diff_tech:   Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct VersionsFile {
    versions: Vec<RuleVersion>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EvaluationOutcome {
    Pass,
    Violation,
    #[serde(rename = "Auto-Fix")]
    AutoFix,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationLog {
    pub id:          EntityId,
    pub timestamp:   NaiveDateTime,
    pub rule_set_id: EntityId,
    pub rule_id:     EntityId,
    pub version_id:  EntityId,
    pub record_ref:  String,
    pub record_name: String,
    pub outcome:     EvaluationOutcome,
    pub reason:      String,
    pub inputs:      BTreeMap<String, String>,
    pub outputs:     BTreeMap<String, String>,
    #[serde(default)]
    pub issue_id:    Option<EntityId>,
}

#[derive(Debug, Clone, Deserialize)]
struct EvaluationLogsFile {
    evaluation_logs: Vec<EvaluationLog>,
}

// ── KPIs and control plane ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiMetrics {
    pub items_needing_attention: u32,
    pub revenue_at_risk:         String,
    pub cycle_time_hotspots:     String,
    pub billing_risk:            String,
    pub net_revenue_efficiency:  String,
}

/// Control-plane numbers that have no source rows in the fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPlaneBaseline {
    /// Production rules that live outside the tracked rule sets.
    pub rules_outside_fixture:     u32,
    pub tests_passing:             String,
    pub pending_approvals:         u32,
    pub drift_alerts:              u32,
    /// A rule set is "trending" when violations_90d exceeds this.
    pub trending_violations_above: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct KpisFile {
    kpi_metrics:   KpiMetrics,
    top_insights:  Vec<String>,
    control_plane: ControlPlaneBaseline,
}

// ── Optimization lab ───────────────────────────────────────────────

/// Static coefficients of the impact calculator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulatorConfig {
    pub baseline_discount:          u32,
    pub baseline_uplift:            f64,
    pub revenue_per_uplift_point:   f64,
    pub revenue_per_discount_point: f64,
    /// Ops load when the threshold is below baseline (more approvals).
    pub ops_load_loose_discount:    i32,
    pub ops_load_tight_discount:    i32,
    pub early_dunning_before_day:   i32,
    pub ops_load_early_dunning:     i32,
    pub ops_load_late_dunning:      i32,
    /// Simulated record population.
    pub population:                 u32,
    /// Share of the population affected at baseline, percent.
    pub base_affected_pct:          u32,
    pub medium_risk_above:          u32,
    pub high_risk_above:            u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            baseline_discount:          20,
            baseline_uplift:            3.0,
            revenue_per_uplift_point:   142_000.0,
            revenue_per_discount_point: 45_000.0,
            ops_load_loose_discount:    15,
            ops_load_tight_discount:    -8,
            early_dunning_before_day:   5,
            ops_load_early_dunning:     12,
            ops_load_late_dunning:      -5,
            population:                 1000,
            base_affected_pct:          12,
            medium_risk_above:          22,
            high_risk_above:            25,
        }
    }
}

// ── Assembled fixture ──────────────────────────────────────────────

const BUILTIN_FILES: [(&str, &str); 10] = [
    ("stages.json",          include_str!("../../data/stages.json")),
    ("issues.json",          include_str!("../../data/issues.json")),
    ("agents.json",          include_str!("../../data/agents.json")),
    ("signals.json",         include_str!("../../data/signals.json")),
    ("rule_sets.json",       include_str!("../../data/rule_sets.json")),
    ("rules.json",           include_str!("../../data/rules.json")),
    ("versions.json",        include_str!("../../data/versions.json")),
    ("evaluation_logs.json", include_str!("../../data/evaluation_logs.json")),
    ("kpis.json",            include_str!("../../data/kpis.json")),
    ("simulator.json",       include_str!("../../data/simulator.json")),
];

#[derive(Debug, Clone)]
pub struct TowerConfig {
    /// Pipeline order, one entry per stage.
    pub stages:          Vec<StageData>,
    pub issues:          Vec<Issue>,
    pub agents:          Vec<Agent>,
    pub signals:         Vec<Signal>,
    pub rule_sets:       Vec<RuleSet>,
    pub rules:           Vec<Rule>,
    pub versions:        Vec<RuleVersion>,
    pub evaluation_logs: Vec<EvaluationLog>,
    pub kpi_metrics:     KpiMetrics,
    pub top_insights:    Vec<String>,
    pub control_plane:   ControlPlaneBaseline,
    pub simulator:       SimulatorConfig,
}

impl TowerConfig {
    /// Load from the data/ directory.
    /// In tests, use TowerConfig::builtin().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let config = Self::assemble(|name| {
            let path = format!("{data_dir}/{name}");
            std::fs::read_to_string(&path).map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))
        })?;
        log::info!(
            "fixture: loaded {} stages, {} issues, {} rule sets from {data_dir}",
            config.stages.len(),
            config.issues.len(),
            config.rule_sets.len()
        );
        Ok(config)
    }

    /// The fixture compiled into the crate.
    pub fn builtin() -> TowerResult<Self> {
        Self::assemble(|name| {
            BUILTIN_FILES
                .iter()
                .find(|(file, _)| *file == name)
                .map(|(_, content)| content.to_string())
                .ok_or_else(|| anyhow::anyhow!("No built-in fixture file {name}"))
        })
    }

    fn assemble<F>(read: F) -> TowerResult<Self>
    where
        F: Fn(&str) -> anyhow::Result<String>,
    {
        let stages: StagesFile = parse_file(&read, "stages.json")?;
        let issues: IssuesFile = parse_file(&read, "issues.json")?;
        let agents: AgentsFile = parse_file(&read, "agents.json")?;
        let signals: SignalsFile = parse_file(&read, "signals.json")?;
        let rule_sets: RuleSetsFile = parse_file(&read, "rule_sets.json")?;
        let rules: RulesFile = parse_file(&read, "rules.json")?;
        let versions: VersionsFile = parse_file(&read, "versions.json")?;
        let logs: EvaluationLogsFile = parse_file(&read, "evaluation_logs.json")?;
        let kpis: KpisFile = parse_file(&read, "kpis.json")?;
        let simulator: SimulatorConfig = parse_file(&read, "simulator.json")?;

        let mut stages = stages.stages;
        stages.sort_by_key(|s| s.name);

        let config = Self {
            stages,
            issues:          issues.issues,
            agents:          agents.agents,
            signals:         signals.signals,
            rule_sets:       rule_sets.rule_sets,
            rules:           rules.rules,
            versions:        versions.versions,
            evaluation_logs: logs.evaluation_logs,
            kpi_metrics:     kpis.kpi_metrics,
            top_insights:    kpis.top_insights,
            control_plane:   kpis.control_plane,
            simulator,
        };
        config.validate()?;
        Ok(config)
    }

    /// Referential integrity across fixture files.
    pub fn validate(&self) -> TowerResult<()> {
        let stage_names: Vec<LifecycleStage> = self.stages.iter().map(|s| s.name).collect();
        if stage_names != LifecycleStage::ALL {
            return Err(fixture_error(format!(
                "stages must list each lifecycle stage exactly once, got {stage_names:?}"
            )));
        }
        if let Some(stage) = self.stages.iter().find(|s| s.health > 100) {
            return Err(fixture_error(format!("{} health {} exceeds 100", stage.name, stage.health)));
        }

        unique_ids("issue", self.issues.iter().map(|i| i.id.as_str()))?;
        unique_ids("rule set", self.rule_sets.iter().map(|r| r.id.as_str()))?;
        unique_ids("rule", self.rules.iter().map(|r| r.id.as_str()))?;
        unique_ids("evaluation log", self.evaluation_logs.iter().map(|l| l.id.as_str()))?;

        for rs in &self.rule_sets {
            if let Some(replacement) = &rs.replacement_id {
                self.require_rule_set(replacement, &format!("rule set {}", rs.id))?;
            }
        }
        for rule in &self.rules {
            self.require_rule_set(&rule.rule_set_id, &format!("rule {}", rule.id))?;
        }
        for version in &self.versions {
            self.require_rule_set(&version.rule_set_id, &format!("version {}", version.id))?;
        }
        for log in &self.evaluation_logs {
            let owner = format!("evaluation log {}", log.id);
            self.require_rule_set(&log.rule_set_id, &owner)?;
            if !self.rules.iter().any(|r| r.id == log.rule_id) {
                return Err(fixture_error(format!("{owner} refers to unknown rule {}", log.rule_id)));
            }
            if let Some(issue_id) = &log.issue_id {
                if self.issue(issue_id).is_none() {
                    return Err(fixture_error(format!("{owner} refers to unknown issue {issue_id}")));
                }
            }
        }
        for signal in &self.signals {
            if !(0.0..=1.0).contains(&signal.probability) {
                return Err(fixture_error(format!(
                    "signal {} probability {} outside 0..=1",
                    signal.id, signal.probability
                )));
            }
        }
        if self.simulator.population == 0 {
            return Err(fixture_error("simulator population must be positive".into()));
        }
        Ok(())
    }

    fn require_rule_set(&self, id: &str, owner: &str) -> TowerResult<()> {
        if self.rule_set(id).is_some() {
            Ok(())
        } else {
            Err(fixture_error(format!("{owner} refers to unknown rule set {id}")))
        }
    }

    pub fn stage(&self, stage: LifecycleStage) -> Option<&StageData> {
        self.stages.iter().find(|s| s.name == stage)
    }

    pub fn issue(&self, id: &str) -> Option<&Issue> {
        self.issues.iter().find(|i| i.id == id)
    }

    pub fn rule_set(&self, id: &str) -> Option<&RuleSet> {
        self.rule_sets.iter().find(|r| r.id == id)
    }
}

fn parse_file<T, F>(read: &F, name: &str) -> TowerResult<T>
where
    T: DeserializeOwned,
    F: Fn(&str) -> anyhow::Result<String>,
{
    let content = read(name)?;
    serde_json::from_str(&content).map_err(|e| fixture_error(format!("{name}: {e}")))
}

fn unique_ids<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> TowerResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(fixture_error(format!("duplicate {kind} id {id}")));
        }
    }
    Ok(())
}

fn fixture_error(message: String) -> TowerError {
    TowerError::Fixture { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_fixture_is_consistent() {
        let config = TowerConfig::builtin().unwrap();
        assert_eq!(config.stages.len(), 6);
        assert_eq!(config.rule_sets.len(), 31);
        assert_eq!(config.simulator, SimulatorConfig::default());
    }

    #[test]
    fn dangling_rule_reference_is_rejected() {
        let mut config = TowerConfig::builtin().unwrap();
        config.rules[0].rule_set_id = "missing".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("unknown rule set missing"), "{err}");
    }

    #[test]
    fn missing_stage_is_rejected() {
        let mut config = TowerConfig::builtin().unwrap();
        config.stages.pop();
        assert!(matches!(config.validate(), Err(TowerError::Fixture { .. })));
    }
}
