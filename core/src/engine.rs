//! The control tower engine.
//!
//! PER-TICK ORDER (fixed, documented, never reordered):
//!   1. Advance the heartbeat.
//!   2. Apply queued operator commands in submission order.
//!   3. Snapshot the dashboard every SNAPSHOT_INTERVAL ticks.
//!
//! RULES:
//!   - The fixture is read-only. Issue status is the only mutable business state.
//!   - Commands take effect on the tick after submission, never inline.
//!   - Every state change is recorded in the event log.
//!   - The impact calculator is pure and may be called at any time.

use crate::{
    clock::Heartbeat,
    command::{OperatorCommand, QueuedCommand},
    config::{Issue, TowerConfig},
    error::TowerResult,
    event::{EventLogEntry, TowerEvent},
    lifecycle,
    rule_catalog,
    scenario::{compute_impact_with, ImpactResult, ScenarioParams},
    snapshot::{DashboardSnapshot, LabPreview, SNAPSHOT_INTERVAL},
    store::{ScenarioRunRecord, TowerStore},
    types::{RunId, Tick},
    work_queue::FixAction,
};

pub struct TowerEngine {
    pub run_id: RunId,
    pub clock:  Heartbeat,
    config:     TowerConfig,
    store:      TowerStore,
    /// Live copy of the fixture issues; statuses move, nothing else does.
    issues:     Vec<Issue>,
    pending:    Vec<QueuedCommand>,
    /// Parameters of the most recent lab run.
    lab_params: ScenarioParams,
}

impl TowerEngine {
    /// Wire an engine to a migrated store. If the store already holds this
    /// run, issue statuses, the clock and unapplied commands are restored.
    pub fn new(run_id: RunId, config: TowerConfig, store: TowerStore) -> TowerResult<Self> {
        store.insert_run(&run_id, env!("CARGO_PKG_VERSION"))?;

        let mut issues = config.issues.clone();
        let stored = store.issue_statuses(&run_id)?;
        if stored.is_empty() {
            for issue in &issues {
                store.upsert_issue_status(&run_id, &issue.id, issue.status, 0)?;
            }
        } else {
            for (issue_id, status) in stored {
                if let Some(issue) = issues.iter_mut().find(|i| i.id == issue_id) {
                    issue.status = status;
                }
            }
        }

        let mut clock = Heartbeat::new(run_id.clone());
        clock.current_tick = store.run_tick(&run_id)?;

        let pending = store
            .pending_commands(&run_id)?
            .into_iter()
            .map(|(command_id, command)| QueuedCommand {
                run_id: run_id.clone(),
                queued_at: clock.current_tick,
                command_id,
                command,
            })
            .collect();

        let lab_params = store
            .scenario_runs(&run_id)?
            .last()
            .map(|r| r.params)
            .unwrap_or_default();

        Ok(Self {
            clock,
            config,
            store,
            issues,
            pending,
            lab_params,
            run_id,
        })
    }

    /// Load the fixture from `data_dir`, or use the built-in one.
    pub fn build(run_id: RunId, data_dir: Option<&str>, store: TowerStore) -> TowerResult<Self> {
        let config = match data_dir {
            Some(dir) => TowerConfig::load(dir)?,
            None => TowerConfig::builtin()?,
        };
        Self::new(run_id, config, store)
    }

    /// Built-in fixture over a fresh in-memory store.
    pub fn build_test(run_id: RunId) -> TowerResult<Self> {
        let store = TowerStore::in_memory()?;
        store.migrate()?;
        Self::build(run_id, None, store)
    }

    pub fn config(&self) -> &TowerConfig {
        &self.config
    }

    pub fn store(&self) -> &TowerStore {
        &self.store
    }

    /// Issues with their live statuses.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn issue(&self, id: &str) -> Option<&Issue> {
        self.issues.iter().find(|i| i.id == id)
    }

    pub fn pending_commands(&self) -> &[QueuedCommand] {
        &self.pending
    }

    /// Evaluate a scenario without recording it. Safe on every slider move.
    pub fn simulate(&self, params: &ScenarioParams) -> ImpactResult {
        compute_impact_with(params, &self.config.simulator)
    }

    /// Persist and queue a command. It applies on the next tick.
    pub fn submit_command(&mut self, command: OperatorCommand) -> TowerResult<i64> {
        let tick = self.clock.current_tick;
        let command_id = self.store.insert_command(&self.run_id, tick, &command)?;
        log::debug!("tick={tick} engine: queued {} as #{command_id}", command.type_name());
        self.pending.push(QueuedCommand {
            run_id: self.run_id.clone(),
            queued_at: tick,
            command_id,
            command,
        });
        Ok(command_id)
    }

    /// Advance one tick.
    pub fn tick(&mut self) -> TowerResult<Vec<TowerEvent>> {
        assert!(!self.clock.paused, "tick() called on paused engine");

        let current_tick = self.clock.advance();
        let mut tick_events = vec![TowerEvent::TickStarted { tick: current_tick }];

        for queued in std::mem::take(&mut self.pending) {
            let received = TowerEvent::CommandReceived {
                tick:         current_tick,
                command_id:   queued.command_id,
                command_type: queued.command.type_name().to_string(),
            };
            self.record(current_tick, "engine", &received)?;
            tick_events.push(received);

            let (source, events) = self.apply_command(current_tick, &queued.command)?;
            for event in &events {
                self.record(current_tick, source, event)?;
            }
            tick_events.extend(events);
            self.store.mark_command_applied(queued.command_id, current_tick)?;
        }

        tick_events.push(TowerEvent::TickCompleted { tick: current_tick });
        self.store.set_run_tick(&self.run_id, current_tick)?;

        if current_tick % SNAPSHOT_INTERVAL == 0 {
            self.take_snapshot(current_tick)?;
        }

        Ok(tick_events)
    }

    /// Run n ticks in a loop. Used for testing and fast-forward.
    pub fn run_ticks(&mut self, n: u64) -> TowerResult<()> {
        let fresh = self.clock.current_tick == 0
            && self.store.event_count(&self.run_id, "run_initialized")? == 0;
        if fresh {
            let init = TowerEvent::RunInitialized {
                run_id:    self.run_id.clone(),
                issues:    self.config.issues.len(),
                rule_sets: self.config.rule_sets.len(),
            };
            self.record(0, "engine", &init)?;
        }
        self.clock.resume();
        for _ in 0..n {
            self.tick()?;
        }
        self.clock.pause();
        Ok(())
    }

    fn apply_command(
        &mut self,
        tick: Tick,
        command: &OperatorCommand,
    ) -> TowerResult<(&'static str, Vec<TowerEvent>)> {
        let (action, issue_id) = match command {
            OperatorCommand::TriageIssue { issue_id } => (FixAction::Triage, issue_id),
            OperatorCommand::ProposeFix { issue_id }  => (FixAction::ProposeFix, issue_id),
            OperatorCommand::ApplyFix { issue_id }    => (FixAction::ApplyFix, issue_id),
            OperatorCommand::VerifyFix { issue_id }   => (FixAction::VerifyFix, issue_id),
            OperatorCommand::RunScenario { params } => {
                return Ok(("lab", vec![self.run_scenario(tick, params)?]));
            }
        };
        Ok(("work_queue", vec![self.apply_fix_action(tick, action, issue_id)?]))
    }

    fn apply_fix_action(
        &mut self,
        tick: Tick,
        action: FixAction,
        issue_id: &str,
    ) -> TowerResult<TowerEvent> {
        let issue = match self.issues.iter_mut().find(|i| i.id == issue_id) {
            Some(issue) => issue,
            None => {
                let reason = format!("Unknown issue: {issue_id}");
                log::warn!("tick={tick} work_queue: {reason}");
                return Ok(TowerEvent::IssueTransitionRejected {
                    tick,
                    issue_id: issue_id.to_string(),
                    action,
                    reason,
                });
            }
        };

        let from = issue.status;
        match action.apply(from) {
            Ok(to) => {
                issue.status = to;
                self.store.upsert_issue_status(&self.run_id, issue_id, to, tick)?;
                log::info!(
                    "tick={tick} work_queue: issue {issue_id} {} -> {}",
                    from.as_str(),
                    to.as_str()
                );
                Ok(TowerEvent::IssueStatusChanged {
                    tick,
                    issue_id: issue_id.to_string(),
                    action,
                    from,
                    to,
                })
            }
            Err(reason) => {
                log::warn!("tick={tick} work_queue: issue {issue_id} rejected: {reason}");
                Ok(TowerEvent::IssueTransitionRejected {
                    tick,
                    issue_id: issue_id.to_string(),
                    action,
                    reason,
                })
            }
        }
    }

    fn run_scenario(&mut self, tick: Tick, requested: &ScenarioParams) -> TowerResult<TowerEvent> {
        let params = ScenarioParams::clamped(
            requested.discount_threshold as i64,
            requested.renewal_uplift,
            requested.dunning_start,
        );
        if params != *requested {
            log::debug!("tick={tick} lab: clamped {requested:?} to {params:?}");
        }
        let impact = self.simulate(&params);
        self.store.insert_scenario_run(&self.run_id, tick, &params, &impact)?;
        self.lab_params = params;
        log::info!(
            "tick={tick} lab: discount={} uplift={} dunning={} -> revenue {} ops {} risk {:?}",
            params.discount_threshold,
            params.renewal_uplift,
            params.dunning_start,
            impact.revenue_label(),
            impact.ops_load_label(),
            impact.risk_tier
        );
        Ok(TowerEvent::ScenarioEvaluated { tick, params, impact })
    }

    fn record(&self, tick: Tick, source: &str, event: &TowerEvent) -> TowerResult<()> {
        let entry = EventLogEntry {
            id:         None,
            run_id:     self.run_id.clone(),
            tick,
            source:     source.to_string(),
            event_type: event.type_name().to_string(),
            payload:    serde_json::to_string(event)?,
        };
        self.store.append_event(&entry)
    }

    /// Query events for a specific tick from the store.
    pub fn store_events_for_tick(&self, tick: Tick) -> TowerResult<Vec<EventLogEntry>> {
        self.store.events_for_tick(&self.run_id, tick)
    }

    pub fn store_scenario_runs(&self) -> TowerResult<Vec<ScenarioRunRecord>> {
        self.store.scenario_runs(&self.run_id)
    }

    /// The current frame for UI clients.
    pub fn dashboard(&self) -> DashboardSnapshot {
        let lab_impact = self.simulate(&self.lab_params);
        DashboardSnapshot {
            run_id:        self.run_id.clone(),
            tick:          self.clock.current_tick,
            heartbeat:     self.clock.beat(),
            stages:        self.config.stages.clone(),
            totals:        lifecycle::portfolio_totals(&self.config.stages),
            issues:        self.issues.clone(),
            agents:        self.config.agents.clone(),
            signals:       self.config.signals.clone(),
            kpi_metrics:   self.config.kpi_metrics.clone(),
            top_insights:  self.config.top_insights.clone(),
            control_plane: rule_catalog::control_plane_stats(&self.config),
            usage:         rule_catalog::usage_map(&self.config),
            lab:           LabPreview::new(self.lab_params, lab_impact),
        }
    }

    fn take_snapshot(&self, tick: Tick) -> TowerResult<()> {
        let json = serde_json::to_string(&self.dashboard())?;
        self.store.save_snapshot(&self.run_id, tick, &json)?;
        log::debug!("Snapshot saved at tick {tick}");
        Ok(())
    }
}
