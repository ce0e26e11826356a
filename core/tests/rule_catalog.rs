use control_tower_core::{
    config::{RuleStatus, TowerConfig},
    error::TowerError,
    rule_catalog::{self, RuleSetQuery, StatusFilter},
    types::{LifecycleStage, StageFilter},
};

fn fixture() -> TowerConfig {
    TowerConfig::builtin().expect("built-in fixture")
}

fn ids(sets: &[&control_tower_core::config::RuleSet]) -> Vec<String> {
    sets.iter().map(|rs| rs.id.clone()).collect()
}

#[test]
fn default_query_lists_whole_catalog() {
    let config = fixture();
    let all = rule_catalog::filter_rule_sets(&config, &RuleSetQuery::default());
    assert_eq!(all.len(), 31);
}

#[test]
fn status_filters_partition_the_catalog() {
    let config = fixture();
    let count = |status| {
        let query = RuleSetQuery { status: StatusFilter::Status(status), ..Default::default() };
        rule_catalog::filter_rule_sets(&config, &query).len()
    };
    assert_eq!(count(RuleStatus::Active), 26);
    assert_eq!(count(RuleStatus::Legacy), 3);
    assert_eq!(count(RuleStatus::Proposed), 2);
}

#[test]
fn trending_means_more_than_one_hundred_violations() {
    let config = fixture();
    let query = RuleSetQuery { status: StatusFilter::Trending, ..Default::default() };
    let trending = rule_catalog::filter_rule_sets(&config, &query);
    assert_eq!(
        ids(&trending),
        vec!["cat2", "cat4", "rs1", "rs2", "ord1", "ast2", "rs6"]
    );
    assert!(trending.iter().all(|rs| rs.violations_90d > 100));
}

#[test]
fn area_status_and_search_combine() {
    let config = fixture();
    let query = RuleSetQuery {
        area:   StageFilter::Only(LifecycleStage::Cpq),
        status: StatusFilter::Trending,
        search: "DISCOUNT".into(),
    };
    let hits = rule_catalog::filter_rule_sets(&config, &query);
    assert_eq!(ids(&hits), vec!["rs1"]);

    let query = RuleSetQuery {
        area: StageFilter::Only(LifecycleStage::Cpq),
        ..Default::default()
    };
    assert_eq!(rule_catalog::filter_rule_sets(&config, &query).len(), 6);
}

#[test]
fn usage_map_counts_per_stage() {
    let config = fixture();
    let usage = rule_catalog::usage_map(&config);
    let rows: Vec<_> = usage
        .iter()
        .map(|u| (u.stage, u.now, u.trending, u.legacy))
        .collect();
    assert_eq!(
        rows,
        vec![
            (LifecycleStage::Catalog,   4, 2, 1),
            (LifecycleStage::Cpq,       4, 2, 1),
            (LifecycleStage::Contracts, 4, 0, 1),
            (LifecycleStage::Orders,    4, 1, 0),
            (LifecycleStage::Assets,    5, 1, 0),
            (LifecycleStage::Billing,   5, 1, 0),
        ]
    );
}

#[test]
fn rules_in_prod_adds_fixture_actives_to_baseline() {
    let config = fixture();
    let stats = rule_catalog::control_plane_stats(&config);
    assert_eq!(stats.rules_in_prod, 26 + 119);
    assert_eq!(stats.tests_passing, "98.4%");
    assert_eq!(stats.pending_approvals, 3);
    assert_eq!(stats.drift_alerts, 7);
}

#[test]
fn detail_joins_rules_versions_and_replacement() {
    let config = fixture();
    let detail = rule_catalog::rule_set_detail(&config, "rs1").unwrap();
    assert_eq!(detail.rule_set.name, "Discount Approvals");
    assert_eq!(detail.rules.len(), 2);
    assert_eq!(detail.versions.len(), 2);
    assert!(detail.replacement.is_none());

    let legacy = rule_catalog::rule_set_detail(&config, "rs3").unwrap();
    assert_eq!(legacy.replacement.map(|r| r.id.as_str()), Some("rs2"));

    assert!(matches!(
        rule_catalog::rule_set_detail(&config, "nope"),
        Err(TowerError::UnknownRuleSet { .. })
    ));
}

#[test]
fn receipt_links_log_to_rule_and_issue() {
    let config = fixture();
    let receipt = rule_catalog::receipt_for_rule(&config, "r1").expect("receipt for r1");
    assert_eq!(receipt.log.record_ref, "Q-10492");
    assert_eq!(receipt.rule_set.id, "rs1");
    assert_eq!(receipt.rule.name, "EMEA Enterprise Discount Threshold");
    assert_eq!(receipt.log.issue_id.as_deref(), Some("1"));

    assert!(rule_catalog::receipt(&config, "log1").is_some());
    assert!(rule_catalog::receipt_for_rule(&config, "r2").is_none());
}

#[test]
fn legacy_sets_are_retirement_candidates() {
    let config = fixture();
    let candidates: Vec<_> = rule_catalog::retirement_candidates(&config)
        .into_iter()
        .map(|(legacy, replacement)| (legacy.id.as_str(), replacement.map(|r| r.id.as_str())))
        .collect();
    assert_eq!(
        candidates,
        vec![("cat5", None), ("rs3", Some("rs2")), ("rs4", Some("rs5"))]
    );
}
