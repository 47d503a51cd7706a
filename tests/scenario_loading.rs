use std::fs;

use civitas::{catalog::BuildingKind, scenario::ScenarioLoader, session::GoalError};
use tempfile::tempdir;

fn loader() -> ScenarioLoader {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn scenario_loader_reads_fixture() {
    let scenario = loader()
        .load("scenarios/forum_city.yaml")
        .expect("scenario parses");
    assert_eq!(scenario.name, "forum_city");
    assert_eq!(scenario.seed, 2024);
    assert_eq!(scenario.ticks(None), 90);
    assert_eq!(scenario.ticks(Some(5)), 5);
    assert_eq!(scenario.tuning.grid_size, 15);
    assert_eq!(scenario.tuning.actions.demolish_cost, 5);

    let city = scenario.build_city().unwrap();
    assert_eq!(city.stats().treasury, 800);
    assert_eq!(city.grid().count_of(BuildingKind::Road), 4);
    assert_eq!(city.grid().count_of(BuildingKind::Residential), 2);
    let school = city.grid().get(8, 7).unwrap();
    assert_eq!(school.kind, BuildingKind::School);
    assert_eq!(school.level, 2);
    assert_eq!(city.catalog().config(BuildingKind::Park).cost, 120);
    assert_eq!(city.catalog().config(BuildingKind::Park).name, "Garden");
    assert!(city.grid().is_consistent());
}

#[test]
fn minimal_scenario_uses_defaults() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("bare.yaml"), "name: bare\n").unwrap();
    let scenario = ScenarioLoader::new(dir.path()).load("bare.yaml").unwrap();
    assert_eq!(scenario.seed, 0);
    assert_eq!(scenario.ticks(None), 120);
    assert_eq!(scenario.tuning.tick_period_ms, 2_000);
    assert_eq!(scenario.tuning.content.quiz_base_reward, 200);
    let city = scenario.build_city().unwrap();
    assert_eq!(city.grid().occupied_count(), 0);
}

#[test]
fn invalid_tuning_is_rejected_at_load() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("bad.yaml"),
        "name: bad\ntuning:\n  disasters:\n    chance: 3.0\n",
    )
    .unwrap();
    let err = ScenarioLoader::new(dir.path())
        .load("bad.yaml")
        .unwrap_err();
    assert!(format!("{err:#}").contains("disasters.chance"));
}

#[test]
fn off_grid_layout_fails_to_build() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("off.yaml"),
        "name: off\ntuning:\n  grid_size: 4\nlayout:\n  - { x: 9, y: 0, kind: Road }\n",
    )
    .unwrap();
    let scenario = ScenarioLoader::new(dir.path()).load("off.yaml").unwrap();
    assert!(scenario.build_city().is_err());
}

#[test]
fn missing_file_reports_the_path() {
    let err = loader().load("scenarios/nope.yaml").unwrap_err();
    assert!(err.to_string().contains("nope.yaml"));
}

#[test]
fn scenario_goal_templates_start_pending() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("goals.yaml"),
        "name: goals\ngoals:\n  - description: Be rich\n    target: treasury\n    value: 1000000\n    reward: 500\n    completed: true\n",
    )
    .unwrap();
    let scenario = ScenarioLoader::new(dir.path()).load("goals.yaml").unwrap();
    let mut session = scenario.static_session().unwrap();
    session.start();
    session.tick();
    let goal = session.city().goal().expect("goal delivered");
    assert_eq!(goal.description, "Be rich");
    assert!(!goal.completed);
    assert_eq!(session.claim_goal(), Err(GoalError::NotCompleted));
}
