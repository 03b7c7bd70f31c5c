use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use hn_anomaly::Severity;
use hn_app::{
    CollectingSink, RunOptions, RunProgressEvent, RunRequest, RunStage, alerts_for_run,
    dispatch_alerts, ensure_run, ensure_run_with_progress, get_run_summary, list_runs,
    list_scenarios, load_project, load_run, run_batch,
};
use hn_results::RunStatus;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos/projects")
        .join(name)
}

/// Copy a demo into a fresh directory so the run store starts empty.
fn staged(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("hn_app_{}_{}", name.replace('.', "_"), nanos));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    let target = dir.join(name);
    fs::copy(demo(name), &target).expect("failed to stage demo");
    target
}

fn request<'a>(path: &'a Path, scenario_id: &'a str) -> RunRequest<'a> {
    RunRequest {
        project_path: path,
        scenario_id,
        options: RunOptions::default(),
    }
}

#[test]
fn second_run_comes_from_the_store() {
    let path = staged("lift_station.inp");

    let first = ensure_run(&request(&path, "base")).expect("first run failed");
    assert!(!first.loaded_from_cache);
    assert!(first.stored);
    assert_eq!(first.run.status, RunStatus::Completed);

    let second = ensure_run(&request(&path, "base")).expect("second run failed");
    assert!(second.loaded_from_cache);
    assert_eq!(second.run_id, first.run_id);
    assert_eq!(second.run, first.run);

    let runs = list_runs(&path, Some("base")).unwrap();
    assert_eq!(runs.len(), 1);
    let loaded = load_run(&path, &first.run_id).unwrap();
    assert_eq!(loaded.snapshots.len(), 1);
}

#[test]
fn uncached_rerun_keeps_the_stored_copy() {
    let path = staged("lift_station.inp");
    let first = ensure_run(&request(&path, "base")).unwrap();
    let mut again = request(&path, "base");
    again.options.use_cache = false;
    let second = ensure_run(&again).unwrap();
    assert!(!second.loaded_from_cache);
    assert_eq!(second.run_id, first.run_id);
    assert_eq!(list_runs(&path, None).unwrap().len(), 1);
}

#[test]
fn simulation_reports_every_period() {
    let path = staged("two_pump_station.yaml");
    let mut events: Vec<RunProgressEvent> = Vec::new();
    let response = ensure_run_with_progress(
        &request(&path, "day"),
        Some(&mut |event| events.push(event)),
    )
    .expect("day run failed");

    assert_eq!(response.run.snapshots.len(), 24);
    let periods: Vec<usize> = events
        .iter()
        .filter_map(|e| e.period.as_ref().map(|p| p.period))
        .collect();
    assert_eq!(periods, (0..24).collect::<Vec<_>>());
    assert!(events.iter().any(|e| e.stage == RunStage::Detecting));
    assert_eq!(events.last().map(|e| e.stage), Some(RunStage::Completed));

    let summary = get_run_summary(&response.run).unwrap();
    assert_eq!(summary.periods, 24);
    assert!(summary.min_pressure.2 <= summary.max_pressure.2);
}

#[test]
fn unknown_scenario_is_an_error() {
    let path = staged("lift_station.inp");
    assert!(ensure_run(&request(&path, "nope")).is_err());
}

#[test]
fn batch_runs_every_scenario_in_order() {
    let project = load_project(&demo("two_pump_station.yaml")).unwrap();
    let ids: Vec<String> = list_scenarios(&project).into_iter().map(|s| s.id).collect();
    let outcomes = run_batch(&project, &[], None).unwrap();
    assert_eq!(
        outcomes.iter().map(|o| o.scenario_id.clone()).collect::<Vec<_>>(),
        ids
    );
    for outcome in &outcomes {
        let run = outcome.result.as_ref().expect("scenario failed");
        assert_ne!(run.status, RunStatus::Cancelled);
    }
}

#[test]
fn alerts_flow_to_sinks() {
    let path = staged("lift_station.inp");
    let run = ensure_run(&request(&path, "base")).unwrap().run;
    let alerts = alerts_for_run(&run, Severity::Warning);
    assert_eq!(alerts.len(), run.anomalies.len());

    let sink = CollectingSink::new();
    dispatch_alerts(&alerts, &[&sink]).unwrap();
    assert_eq!(sink.alerts(), alerts);
}
