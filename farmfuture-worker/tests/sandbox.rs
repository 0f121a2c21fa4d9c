//! End-to-end tests that launch the worker binary as a real sandbox

#[allow(dead_code)]
#[path = "../src/test_support.rs"]
mod test_support;

use farmfuture_client::FarmService;
use farmfuture_core::domain::{
    JobMetadata, PackedWorkPackage, ResultPackage, Status, WorkItem, WorkPackage,
};
use farmfuture_core::pack;
use farmfuture_worker::builtins;
use farmfuture_worker::protocol::run_sandbox;
use farmfuture_worker::{SandboxLauncher, Supervisor};
use serde_json::{Map, json};
use std::sync::Arc;
use std::time::Duration;
use test_support::ScriptedFarm;

fn launcher() -> SandboxLauncher {
    SandboxLauncher::new(env!("CARGO_BIN_EXE_farmfuture-worker"))
}

fn job() -> JobMetadata {
    JobMetadata {
        id: 42,
        name: Some("sandbox-test".to_string()),
        status: Status::Running,
        attributes: Map::new(),
    }
}

fn run(package: &PackedWorkPackage) -> ResultPackage {
    run_sandbox(&launcher(), &job(), package)
}

#[test]
fn test_echo_completes() {
    let package = WorkPackage::new(builtins::ECHO)
        .with_args(vec![json!(1), json!("two")])
        .with_kwarg("flag", json!(true))
        .pack()
        .unwrap();

    let result = run(&package);

    assert_eq!(result.status, Some(Status::Complete));
    assert_eq!(
        result.result,
        Some(json!({"args": [1, "two"], "kwargs": {"flag": true}}))
    );
    assert!(result.exception.is_none());
}

#[test]
fn test_null_result_is_complete() {
    let package = WorkPackage::new(builtins::ENV)
        .with_args(vec![json!("FARMFUTURE_TEST_SURELY_UNSET")])
        .pack()
        .unwrap();

    let result = run(&package);

    assert_eq!(result.status, Some(Status::Complete));
    assert_eq!(result.result, Some(serde_json::Value::Null));
}

#[test]
fn test_failure_carries_exception() {
    let package = WorkPackage::new(builtins::FAIL)
        .with_kwarg("message", json!("disk full"))
        .pack()
        .unwrap();

    let result = run(&package);

    assert_eq!(result.status, Some(Status::Failed));
    let exception = result.exception.unwrap();
    assert_eq!(exception.kind, "CallableError");
    assert_eq!(exception.message, "disk full");
}

#[test]
fn test_crash_reports_protocol_error() {
    let package = WorkPackage::new(builtins::CRASH).pack().unwrap();

    let result = run(&package);

    assert_eq!(result.status, Some(Status::Failed));
    assert_eq!(result.exception.unwrap().kind, "ProtocolError");
}

#[test]
fn test_unknown_callable() {
    let package = WorkPackage::new("nowhere.to_be_found").pack().unwrap();

    let result = run(&package);

    assert_eq!(result.status, Some(Status::Failed));
    let exception = result.exception.unwrap();
    assert_eq!(exception.kind, "ResolveError");
    assert!(exception.message.contains("nowhere.to_be_found"));
}

#[test]
fn test_preflight_applies_environment() {
    let package = WorkPackage::new(builtins::ENV)
        .with_args(vec![json!("FARMFUTURE_TEST_RENDER_LAYER")])
        .with_preflight(builtins::APPLY_ENVIRONMENT)
        .pack()
        .unwrap()
        .with_env("FARMFUTURE_TEST_RENDER_LAYER", "beauty");

    let result = run(&package);

    assert_eq!(result.status, Some(Status::Complete));
    assert_eq!(result.result, Some(json!("beauty")));
}

#[test]
fn test_corrupt_body_fails_unpack() {
    let mut package = WorkPackage::new(builtins::ECHO).pack().unwrap();
    package.body = "{not json".to_string();

    let result = run(&package);

    assert_eq!(result.status, Some(Status::Failed));
    assert_eq!(result.exception.unwrap().kind, "UnpackError");
}

#[test]
fn test_unknown_program_fails_to_spawn() {
    let package = WorkPackage::new(builtins::ECHO)
        .pack()
        .unwrap()
        .with_program("/nonexistent/sandbox-host");

    let result = run(&package);

    assert_eq!(result.status, Some(Status::Failed));
    assert_eq!(result.exception.unwrap().kind, "SpawnError");
}

#[tokio::test]
async fn test_supervisor_runs_agenda() {
    let echo = WorkPackage::new(builtins::ECHO)
        .with_args(vec![json!("frame-1")])
        .pack()
        .unwrap();
    let fail = WorkPackage::new(builtins::FAIL).pack().unwrap();

    let farm = Arc::new(ScriptedFarm::new(vec![
        WorkItem::new(0, Status::Running).with_package(echo),
        WorkItem::new(1, Status::Running).with_package(fail),
        WorkItem::new(0, Status::Complete),
    ]));
    let service: Arc<dyn FarmService> = farm.clone();

    let status = Supervisor::new(service, launcher(), Duration::from_millis(10))
        .run()
        .await
        .unwrap();

    assert_eq!(status, Status::Complete);
    assert_eq!(farm.job_reports(), vec![Status::Complete]);

    let reports = farm.work_reports();
    assert_eq!(reports.len(), 2);

    assert_eq!(reports[0].status, Status::Complete);
    let done: ResultPackage = pack::unpack(reports[0].result_package.as_deref().unwrap()).unwrap();
    assert_eq!(done.status, Some(Status::Complete));
    assert_eq!(done.result, Some(json!({"args": ["frame-1"], "kwargs": {}})));

    assert_eq!(reports[1].status, Status::Failed);
    let failed: ResultPackage =
        pack::unpack(reports[1].result_package.as_deref().unwrap()).unwrap();
    assert_eq!(failed.exception.unwrap().message, "failure requested");
}
