use std::io::Write;

use ticksched::*;

mod common;
use common::{run_checked, seq};

fn write_workload(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_and_run_workload_file() {
    common::setup_test();
    let file = write_workload(
        r#"{
            "nr_resources": 1,
            "processes": [
                { "pid": 10, "lifespan": 4, "prio": 1,
                  "acquire": [ { "resource": 0, "at": 0, "duration": 3 } ] },
                { "pid": 20, "start": 1, "lifespan": 2, "prio": 9,
                  "acquire": [ { "resource": 0, "at": 0, "duration": 1 } ] }
            ]
        }"#,
    );
    let scenario = load_workload(file.path()).unwrap();
    assert_eq!(scenario.nr_resources, 1);
    assert_eq!(scenario.processes.len(), 2);

    let trace = run_checked(PolicyKind::Pip, scenario);
    assert_eq!(trace.exit_kind(), ExitKind::Normal);
    assert_eq!(trace.block_count(Pid(20)), 1);
    // Pid 20 blocks at tick 1; pid 10 finishes its hold at the inherited
    // priority before pid 20 gets the resource.
    assert_eq!(trace.run_sequence(), seq(&[10, 10, 10, 20, 20, 10]));
}

#[test]
fn test_missing_file_is_an_io_error() {
    common::setup_test();
    let dir = tempfile::tempdir().unwrap();
    let err = load_workload(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, WorkloadError::Io(_)), "{err}");
}

#[test]
fn test_malformed_json_is_rejected() {
    common::setup_test();
    let file = write_workload(r#"{ "processes": [ { "pid": 1 "lifespan": 2 } ] }"#);
    let err = load_workload(file.path()).unwrap_err();
    assert!(matches!(err, WorkloadError::Json(_)), "{err}");
}

#[test]
fn test_invalid_scenario_is_rejected() {
    common::setup_test();
    let file = write_workload(
        r#"{ "processes": [ { "pid": 1, "lifespan": 2 }, { "pid": 1, "lifespan": 3 } ] }"#,
    );
    let err = load_workload(file.path()).unwrap_err();
    assert!(
        matches!(err, WorkloadError::Scenario(ScenarioError::DuplicatePid(Pid(1)))),
        "{err}"
    );
}
