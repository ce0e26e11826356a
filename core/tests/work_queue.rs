use control_tower_core::{
    config::{IssueStatus, TowerConfig},
    types::{LifecycleStage, Severity, StageFilter},
    work_queue::{self, FixAction, IssueQuery},
};

fn fixture() -> TowerConfig {
    TowerConfig::builtin().expect("built-in fixture")
}

#[test]
fn empty_query_returns_every_issue() {
    let config = fixture();
    let all = work_queue::filter_issues(&config.issues, &IssueQuery::default());
    assert_eq!(all.len(), config.issues.len());
}

#[test]
fn stage_filter_narrows_queue() {
    let config = fixture();
    let query = IssueQuery {
        stage:  StageFilter::Only(LifecycleStage::Billing),
        search: String::new(),
    };
    let billing = work_queue::filter_issues(&config.issues, &query);
    assert_eq!(billing.len(), 1);
    assert_eq!(billing[0].title, "Usage Anomaly Detected");

    let query = IssueQuery {
        stage:  StageFilter::Only(LifecycleStage::Catalog),
        search: String::new(),
    };
    assert!(work_queue::filter_issues(&config.issues, &query).is_empty());
}

#[test]
fn search_is_case_insensitive_over_title_and_description() {
    let config = fixture();
    let by_title = IssueQuery { search: "payment TERM".into(), ..Default::default() };
    let hits = work_queue::filter_issues(&config.issues, &by_title);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "1");

    let by_description = IssueQuery { search: "net 60".into(), ..Default::default() };
    assert_eq!(work_queue::filter_issues(&config.issues, &by_description).len(), 1);

    let none = IssueQuery { search: "no such thing".into(), ..Default::default() };
    assert!(work_queue::filter_issues(&config.issues, &none).is_empty());
}

#[test]
fn grouping_sums_impact_per_root_cause() {
    let config = fixture();
    let all: Vec<_> = config.issues.iter().collect();
    let groups = work_queue::group_by_root_cause(&all);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].issues.len(), 1);
    assert_eq!(groups[0].impact_value, 120_000.0);
    assert!(groups[0].root_cause.starts_with("Pricing rule missing"));

    // A duplicated issue lands in the same group.
    let doubled = vec![&config.issues[1], &config.issues[1]];
    let groups = work_queue::group_by_root_cause(&doubled);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].impact_value, 28_400.0);
}

#[test]
fn prioritized_puts_critical_first() {
    let config = fixture();
    let all: Vec<_> = config.issues.iter().collect();
    let ordered = work_queue::prioritized(&all);
    assert_eq!(ordered[0].severity, Severity::Critical);
    assert_eq!(ordered[0].id, "2");
    assert_eq!(work_queue::critical_count(&config.issues), 1);
}

#[test]
fn stage_counts_cover_every_stage_in_pipeline_order() {
    let config = fixture();
    let counts = work_queue::count_by_stage(&config.issues);
    let stages: Vec<_> = counts.iter().map(|(s, _)| *s).collect();
    assert_eq!(stages, LifecycleStage::ALL);
    assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), config.issues.len());
}

#[test]
fn fix_lifecycle_rejects_skipped_steps() {
    assert_eq!(FixAction::ProposeFix.apply(IssueStatus::New), Ok(IssueStatus::FixProposed));
    assert!(FixAction::ApplyFix.apply(IssueStatus::New).is_err());
    assert!(FixAction::VerifyFix.apply(IssueStatus::FixProposed).is_err());
    assert!(FixAction::Triage.apply(IssueStatus::Verified).is_err());

    let reason = FixAction::ApplyFix.apply(IssueStatus::Triaged).unwrap_err();
    assert_eq!(reason, "cannot apply_fix an issue in status Triaged");
}
