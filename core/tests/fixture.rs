use control_tower_core::{config::TowerConfig, types::LifecycleStage};

const DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");

#[test]
fn data_directory_matches_builtin_fixture() {
    let loaded = TowerConfig::load(DATA_DIR).expect("load data dir");
    let builtin = TowerConfig::builtin().unwrap();
    assert_eq!(loaded.issues.len(), builtin.issues.len());
    assert_eq!(loaded.rule_sets.len(), builtin.rule_sets.len());
    assert_eq!(loaded.simulator, builtin.simulator);
}

#[test]
fn missing_data_directory_names_the_file() {
    let err = TowerConfig::load("/nonexistent/tower-data").unwrap_err();
    assert!(err.to_string().contains("stages.json"), "{err}");
}

#[test]
fn every_stage_has_a_specialist_agent() {
    let config = TowerConfig::builtin().unwrap();
    for stage in LifecycleStage::ALL {
        assert!(
            config.agents.iter().any(|a| a.specialty == stage),
            "no agent for {stage}"
        );
    }
}

#[test]
fn signal_timestamps_parse() {
    let config = TowerConfig::builtin().unwrap();
    assert_eq!(config.signals.len(), 4);
    assert!(config.signals.iter().all(|s| (0.0..=1.0).contains(&s.probability)));
    let receipt_time = config.evaluation_logs[0].timestamp;
    assert_eq!(receipt_time.format("%Y-%m-%d %H:%M").to_string(), "2025-12-21 18:00");
}
