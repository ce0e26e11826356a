//! tower-runner: headless runner for the revenue-lifecycle control tower.
//!
//! Usage:
//!   tower-runner summary
//!   tower-runner simulate --discount 30 --uplift 5 --dunning 3
//!   tower-runner queue --stage Billing --group
//!   tower-runner rules --area CPQ --filter TRENDING
//!   tower-runner --ipc-mode --db tower.db

use anyhow::{anyhow, Result};
use control_tower_core::{
    command::OperatorCommand,
    config::{Issue, IssueStatus},
    engine::TowerEngine,
    error::TowerError,
    lifecycle,
    rule_catalog::{self, RuleSetQuery, StatusFilter},
    scenario::{ScenarioParams, DISCOUNT_MAX, DISCOUNT_MIN},
    snapshot::{DashboardSnapshot, LabPreview},
    store::TowerStore,
    types::{new_run_id, StageFilter},
    work_queue::{self, IssueQuery},
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Tick {
        count: u64,
    },
    Simulate {
        params: ScenarioParams,
    },
    Command {
        command: OperatorCommand,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState {
    paused: bool,
    pending_commands: usize,
    #[serde(flatten)]
    dashboard: DashboardSnapshot,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let ticks = parse_arg(&args, "--ticks", 0u64);
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir");
    let run_id = flag_value(&args, "--run-id")
        .map(str::to_string)
        .unwrap_or_else(new_run_id);
    let subcommand = args
        .get(1)
        .filter(|a| !a.starts_with("--"))
        .map(String::as_str)
        .unwrap_or("summary");

    let store = TowerStore::open(db)?;
    store.migrate()?;
    let mut engine = TowerEngine::build(run_id.clone(), data_dir, store)?;
    log::info!("run {run_id} opened on {db}");

    if ticks > 0 {
        engine.run_ticks(ticks)?;
    }

    if ipc_mode {
        return run_ipc_loop(&mut engine);
    }

    match subcommand {
        "summary"  => print_summary(&engine),
        "simulate" => print_simulation(&engine, &args),
        "queue"    => print_queue(&engine, &args),
        "rules"    => print_rules(&engine, &args),
        other      => Err(anyhow!("Unknown subcommand: {other}")),
    }
}

fn run_ipc_loop(engine: &mut TowerEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Tick { count } => {
                engine.run_ticks(count)?;
                writeln!(stdout, "{}", serde_json::to_string(&build_ui_state(engine))?)?;
            }
            IpcCommand::GetState => {
                writeln!(stdout, "{}", serde_json::to_string(&build_ui_state(engine))?)?;
            }
            IpcCommand::Simulate { params } => {
                let params = ScenarioParams::clamped(
                    params.discount_threshold as i64,
                    params.renewal_uplift,
                    params.dunning_start,
                );
                let preview = LabPreview::new(params, engine.simulate(&params));
                writeln!(stdout, "{}", serde_json::to_string(&preview)?)?;
            }
            IpcCommand::Command { command } => {
                engine.submit_command(command)?;
                writeln!(stdout, "{}", serde_json::to_string(&build_ui_state(engine))?)?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn build_ui_state(engine: &TowerEngine) -> UiState {
    UiState {
        paused: engine.clock.paused,
        pending_commands: engine.pending_commands().len(),
        dashboard: engine.dashboard(),
    }
}

fn print_summary(engine: &TowerEngine) -> Result<()> {
    let config = engine.config();
    let totals = lifecycle::portfolio_totals(&config.stages);
    let plane = rule_catalog::control_plane_stats(config);

    println!("=== CONTROL TOWER ===");
    println!("  run_id:         {}", engine.run_id);
    println!("  tick:           {}", engine.clock.current_tick);
    println!("  heartbeat:      {}", engine.clock.beat());
    println!("  records:        {}", totals.records);
    println!("  at risk:        {}", totals.at_risk);
    println!("  pending:        {}", totals.pending);
    println!("  mean health:    {:.1}", totals.mean_health);
    println!("  open issues:    {}", open_issue_count(engine.issues()));
    println!("  critical:       {}", work_queue::critical_count(engine.issues()));

    println!();
    println!("=== LIFECYCLE ===");
    for stage in &config.stages {
        let flag = if lifecycle::on_track(stage.status) { "" } else { "  !" };
        println!(
            "  {:<10} health {:>3} | {:?} | total {:>6} | at risk {:>5} | pending {:>5}{flag}",
            stage.name.name(),
            stage.health,
            stage.status,
            stage.counts.total,
            stage.counts.at_risk,
            stage.counts.pending,
        );
    }

    println!();
    println!("=== LOGIC CONTROL PLANE ===");
    println!("  rules in prod:  {}", plane.rules_in_prod);
    println!("  tests passing:  {}", plane.tests_passing);
    println!("  approvals:      {}", plane.pending_approvals);
    println!("  drift alerts:   {}", plane.drift_alerts);

    println!();
    println!("=== KPIS ===");
    let kpis = &config.kpi_metrics;
    println!("  needs attention:  {}", kpis.items_needing_attention);
    println!("  revenue at risk:  {}", kpis.revenue_at_risk);
    println!("  cycle hotspots:   {}", kpis.cycle_time_hotspots);
    println!("  billing risk:     {}", kpis.billing_risk);
    println!("  net efficiency:   {}", kpis.net_revenue_efficiency);
    for insight in &config.top_insights {
        println!("  - {insight}");
    }
    Ok(())
}

/// Lab parameters from `--discount`, `--uplift` and `--dunning`. Missing flags
/// keep the slider defaults; unparsable or out-of-domain values are errors.
fn scenario_from_args(args: &[String]) -> Result<ScenarioParams> {
    let defaults = ScenarioParams::default();
    let discount = flag_value(args, "--discount")
        .map(|raw| raw.parse::<i64>().map_err(|e| anyhow!("--discount {raw}: {e}")))
        .transpose()?
        .unwrap_or(defaults.discount_threshold as i64);
    let discount_threshold = u32::try_from(discount).map_err(|_| TowerError::ParameterOutOfRange {
        parameter: "discount_threshold",
        value:     discount as f64,
        min:       DISCOUNT_MIN as f64,
        max:       DISCOUNT_MAX as f64,
    })?;
    let params = ScenarioParams {
        discount_threshold,
        renewal_uplift: flag_value(args, "--uplift")
            .map(|raw| raw.parse::<f64>().map_err(|e| anyhow!("--uplift {raw}: {e}")))
            .transpose()?
            .unwrap_or(defaults.renewal_uplift),
        dunning_start: flag_value(args, "--dunning")
            .map(|raw| raw.parse::<i32>().map_err(|e| anyhow!("--dunning {raw}: {e}")))
            .transpose()?
            .unwrap_or(defaults.dunning_start),
    };
    params.validate()?;
    Ok(params)
}

fn print_simulation(engine: &TowerEngine, args: &[String]) -> Result<()> {
    let params = scenario_from_args(args)?;
    let impact = engine.simulate(&params);

    println!("=== OPTIMIZATION LAB ===");
    println!("  discount:       {}%", params.discount_threshold);
    println!("  uplift:         {}%", params.renewal_uplift);
    println!("  dunning start:  day {}", params.dunning_start);
    println!();
    println!("  revenue:        {}", impact.revenue_label());
    println!("  ops load:       {}", impact.ops_load_label());
    println!("  affected:       {}", impact.affected_records);
    println!("  risk:           {:?}", impact.risk_tier);
    println!("  pass rate:      {:.0}%", impact.pass_rate);
    Ok(())
}

fn print_queue(engine: &TowerEngine, args: &[String]) -> Result<()> {
    let query = IssueQuery {
        stage:  flag_value(args, "--stage")
            .map(str::parse::<StageFilter>)
            .transpose()?
            .unwrap_or_default(),
        search: flag_value(args, "--search").unwrap_or_default().to_string(),
    };
    let matched = work_queue::filter_issues(engine.issues(), &query);

    println!("=== WORK QUEUE ({} issues) ===", matched.len());
    if args.iter().any(|a| a == "--group") {
        for group in work_queue::group_by_root_cause(&matched) {
            println!(
                "  {} | {} issues | ${:.0}",
                group.root_cause,
                group.issues.len(),
                group.impact_value
            );
            for issue in group.issues {
                println!("      {} {}", issue.id, issue.title);
            }
        }
    } else {
        for issue in work_queue::prioritized(&matched) {
            println!(
                "  [{:?}] {} {:<9} {} ({}) ${:.0}",
                issue.severity,
                issue.id,
                issue.stage.name(),
                issue.title,
                issue.status.as_str(),
                issue.impact_value
            );
        }
    }
    Ok(())
}

fn print_rules(engine: &TowerEngine, args: &[String]) -> Result<()> {
    let config = engine.config();
    let area = flag_value(args, "--area")
        .map(str::parse::<StageFilter>)
        .transpose()?
        .unwrap_or_default();
    let status = flag_value(args, "--filter")
        .map(str::parse::<StatusFilter>)
        .transpose()
        .map_err(|e| anyhow!(e))?
        .unwrap_or_default();
    let query = RuleSetQuery {
        area,
        status,
        search: flag_value(args, "--search").unwrap_or_default().to_string(),
    };
    let matched = rule_catalog::filter_rule_sets(config, &query);

    println!("=== RULE SETS ({}) ===", matched.len());
    for rs in matched {
        let trend = if rule_catalog::is_trending(rs, &config.control_plane) { "  ^" } else { "" };
        println!(
            "  {:<6} {:<40} {:<9} {:?} {} | violations {}{trend}",
            rs.id,
            rs.name,
            rs.area.name(),
            rs.status,
            rs.current_version,
            rs.violations_90d,
        );
    }
    Ok(())
}

/// Issues not yet verified.
fn open_issue_count(issues: &[Issue]) -> usize {
    issues.iter().filter(|i| i.status != IssueStatus::Verified).count()
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        std::iter::once("tower-runner")
            .chain(line.split_whitespace())
            .map(String::from)
            .collect()
    }

    #[test]
    fn simulate_flags_parse_into_params() {
        let params = scenario_from_args(&args("simulate --discount 30 --uplift 5 --dunning 3")).unwrap();
        assert_eq!(
            params,
            ScenarioParams { discount_threshold: 30, renewal_uplift: 5.0, dunning_start: 3 }
        );
        assert_eq!(scenario_from_args(&args("simulate")).unwrap(), ScenarioParams::default());
    }

    #[test]
    fn negative_discount_is_out_of_range() {
        let err = scenario_from_args(&args("simulate --discount -5")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TowerError>(),
            Some(TowerError::ParameterOutOfRange { parameter: "discount_threshold", .. })
        ));
        assert!(scenario_from_args(&args("simulate --discount 41")).is_err());
    }

    #[test]
    fn unparsable_values_are_rejected_not_defaulted() {
        let err = scenario_from_args(&args("simulate --uplift abc")).unwrap_err();
        assert!(err.to_string().contains("--uplift abc"), "{err}");
        assert!(scenario_from_args(&args("simulate --dunning soon")).is_err());
        assert!(scenario_from_args(&args("simulate --uplift 2.25")).is_err());
    }

    #[test]
    fn verified_issues_are_not_open() {
        let mut issues = control_tower_core::config::TowerConfig::builtin().unwrap().issues;
        assert_eq!(open_issue_count(&issues), 2);
        issues[0].status = IssueStatus::Verified;
        assert_eq!(open_issue_count(&issues), 1);
    }
}
