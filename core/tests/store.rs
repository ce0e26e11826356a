use control_tower_core::{
    command::OperatorCommand,
    engine::TowerEngine,
    snapshot::{DashboardSnapshot, SNAPSHOT_INTERVAL},
    store::TowerStore,
};

#[test]
fn migrations_are_idempotent() {
    let store = TowerStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.migrate().unwrap();
    store.insert_run("idem", "test").unwrap();
    store.insert_run("idem", "test").unwrap();
    assert!(store.run_exists("idem").unwrap());
    assert!(!store.run_exists("other").unwrap());
}

#[test]
fn commands_round_trip_through_the_store() {
    let mut engine = TowerEngine::build_test("cmd-store-test".into()).unwrap();
    let cmd = OperatorCommand::ProposeFix { issue_id: "2".into() };
    let id = engine.submit_command(cmd.clone()).unwrap();

    let stored = engine.store().get_command("cmd-store-test", id).unwrap();
    assert_eq!(stored, Some(cmd));
    assert_eq!(engine.store().pending_commands("cmd-store-test").unwrap().len(), 1);

    engine.run_ticks(1).unwrap();
    assert!(engine.store().pending_commands("cmd-store-test").unwrap().is_empty());
    assert!(engine.store().get_command("other-run", id).unwrap().is_none());
}

#[test]
fn dashboard_snapshot_saved_every_interval() {
    let mut engine = TowerEngine::build_test("snapshot-test".into()).unwrap();
    engine.run_ticks(SNAPSHOT_INTERVAL - 1).unwrap();
    assert!(engine
        .store()
        .latest_snapshot_before("snapshot-test", SNAPSHOT_INTERVAL)
        .unwrap()
        .is_none());

    engine.run_ticks(1).unwrap();
    let (tick, json) = engine
        .store()
        .latest_snapshot_before("snapshot-test", SNAPSHOT_INTERVAL + 10)
        .unwrap()
        .expect("snapshot at interval");
    assert_eq!(tick, SNAPSHOT_INTERVAL);

    let snapshot: DashboardSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(snapshot.tick, SNAPSHOT_INTERVAL);
    assert_eq!(snapshot.issues.len(), 2);
}

#[test]
fn file_store_runs_in_wal_mode() {
    let path = std::env::temp_dir().join(format!("tower-wal-{}.db", std::process::id()));
    let path = path.to_string_lossy().to_string();
    let _ = std::fs::remove_file(&path);

    let store = TowerStore::open(&path).unwrap();
    assert_eq!(store.journal_mode().unwrap().to_lowercase(), "wal");
    drop(store);

    let memory = TowerStore::open(":memory:").unwrap();
    assert_eq!(memory.journal_mode().unwrap().to_lowercase(), "memory");

    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{path}{suffix}"));
    }
}
