use control_tower_core::{
    config::{StageStatus, TowerConfig},
    lifecycle,
    types::LifecycleStage,
};

#[test]
fn portfolio_totals_sum_stage_counts() {
    let config = TowerConfig::builtin().unwrap();
    let totals = lifecycle::portfolio_totals(&config.stages);
    assert_eq!(totals.records, 1671);
    assert_eq!(totals.at_risk, 73);
    assert_eq!(totals.pending, 94);
    // Contracts is Critical, Assets and Billing are Warning.
    assert_eq!(totals.stages_flagged, 3);
    assert!((totals.mean_health - 530.0 / 6.0).abs() < 1e-9);
}

#[test]
fn empty_portfolio_has_zero_health() {
    let totals = lifecycle::portfolio_totals(&[]);
    assert_eq!(totals.records, 0);
    assert_eq!(totals.mean_health, 0.0);
}

#[test]
fn stable_and_healthy_are_on_track() {
    assert!(lifecycle::on_track(StageStatus::Healthy));
    assert!(lifecycle::on_track(StageStatus::Stable));
    assert!(!lifecycle::on_track(StageStatus::Warning));
    assert!(!lifecycle::on_track(StageStatus::Critical));
}

#[test]
fn stage_dashboard_collects_issues_and_agent() {
    let config = TowerConfig::builtin().unwrap();
    let contracts =
        lifecycle::stage_dashboard(&config, &config.issues, LifecycleStage::Contracts).unwrap();
    assert_eq!(contracts.stage.health, 74);
    assert_eq!(contracts.stage.status, StageStatus::Critical);
    assert_eq!(contracts.issues.len(), 1);
    assert_eq!(contracts.issues[0].title, "Payment Term Mismatch");
    assert_eq!(contracts.agent.map(|a| a.specialty), Some(LifecycleStage::Contracts));

    let catalog =
        lifecycle::stage_dashboard(&config, &config.issues, LifecycleStage::Catalog).unwrap();
    assert!(catalog.issues.is_empty());
    assert!(!catalog.stage.metrics.is_empty());
}

#[test]
fn stages_are_served_in_pipeline_order() {
    let config = TowerConfig::builtin().unwrap();
    let names: Vec<_> = config.stages.iter().map(|s| s.name).collect();
    assert_eq!(names, LifecycleStage::ALL);
    assert_eq!(names[1].to_string(), "CPQ");
}
