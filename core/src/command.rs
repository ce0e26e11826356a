use crate::{
    scenario::ScenarioParams,
    types::{EntityId, RunId, Tick},
    work_queue::FixAction,
};
use serde::{Deserialize, Serialize};

/// All operator-issued commands.
/// Variants are appended — never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum OperatorCommand {
    // ── Work queue ────────────────────────────────
    TriageIssue { issue_id: EntityId },
    ProposeFix  { issue_id: EntityId },
    ApplyFix    { issue_id: EntityId },
    VerifyFix   { issue_id: EntityId },

    // ── Optimization lab ──────────────────────────
    RunScenario { params: ScenarioParams },
}

impl OperatorCommand {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::TriageIssue { .. } => "triage_issue",
            Self::ProposeFix { .. }  => "propose_fix",
            Self::ApplyFix { .. }    => "apply_fix",
            Self::VerifyFix { .. }   => "verify_fix",
            Self::RunScenario { .. } => "run_scenario",
        }
    }

    /// The lifecycle step a work-queue command asks for.
    pub fn fix_action(&self) -> Option<(FixAction, &str)> {
        match self {
            Self::TriageIssue { issue_id } => Some((FixAction::Triage, issue_id.as_str())),
            Self::ProposeFix { issue_id }  => Some((FixAction::ProposeFix, issue_id.as_str())),
            Self::ApplyFix { issue_id }    => Some((FixAction::ApplyFix, issue_id.as_str())),
            Self::VerifyFix { issue_id }   => Some((FixAction::VerifyFix, issue_id.as_str())),
            Self::RunScenario { .. }       => None,
        }
    }
}

/// A queued operator command with its submission tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedCommand {
    pub run_id:     RunId,
    pub queued_at:  Tick,
    /// Row id in operator_command.
    pub command_id: i64,
    pub command:    OperatorCommand,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_use_tagged_json() {
        let cmd: OperatorCommand =
            serde_json::from_str(r#"{"cmd":"apply_fix","issue_id":"1"}"#).unwrap();
        assert_eq!(cmd, OperatorCommand::ApplyFix { issue_id: "1".into() });
        assert_eq!(cmd.fix_action(), Some((FixAction::ApplyFix, "1")));

        let cmd: OperatorCommand = serde_json::from_str(
            r#"{"cmd":"run_scenario","params":{"discount_threshold":30,"renewal_uplift":5.0,"dunning_start":3}}"#,
        )
        .unwrap();
        assert_eq!(cmd.type_name(), "run_scenario");
        assert!(cmd.fix_action().is_none());
    }
}
