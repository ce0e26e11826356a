//! The event log — every state change the control tower makes.
//!
//! RULE: The engine never mutates issue state without emitting an event.
//! Same fixture + same command sequence must yield byte-identical payloads,
//! so events never carry wall-clock time or random ids.

use crate::{
    config::IssueStatus,
    scenario::{ImpactResult, ScenarioParams},
    types::{EntityId, RunId, Tick},
    work_queue::FixAction,
};
use serde::{Deserialize, Serialize};

/// Variants are appended — never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TowerEvent {
    // ── Engine events ──────────────────────────────
    TickStarted {
        tick: Tick,
    },
    TickCompleted {
        tick: Tick,
    },
    RunInitialized {
        run_id:    RunId,
        issues:    usize,
        rule_sets: usize,
    },

    // ── Operator command events ────────────────────
    CommandReceived {
        tick:         Tick,
        command_id:   i64,
        command_type: String,
    },

    // ── Work queue ─────────────────────────────────
    IssueStatusChanged {
        tick:     Tick,
        issue_id: EntityId,
        action:   FixAction,
        from:     IssueStatus,
        to:       IssueStatus,
    },
    IssueTransitionRejected {
        tick:     Tick,
        issue_id: EntityId,
        action:   FixAction,
        reason:   String,
    },

    // ── Optimization lab ───────────────────────────
    ScenarioEvaluated {
        tick:   Tick,
        params: ScenarioParams,
        impact: ImpactResult,
    },
}

impl TowerEvent {
    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::TickStarted { .. }             => "tick_started",
            Self::TickCompleted { .. }           => "tick_completed",
            Self::RunInitialized { .. }          => "run_initialized",
            Self::CommandReceived { .. }         => "command_received",
            Self::IssueStatusChanged { .. }      => "issue_status_changed",
            Self::IssueTransitionRejected { .. } => "issue_transition_rejected",
            Self::ScenarioEvaluated { .. }       => "scenario_evaluated",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub run_id:     RunId,
    pub tick:       Tick,
    /// Which part of the tower emitted it: engine, work_queue, lab.
    pub source:     String,
    pub event_type: String,
    pub payload:    String, // JSON-serialized TowerEvent
}
