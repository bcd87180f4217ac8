//! Plan executor unit tests

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use cfdeploy::deploy::planner::plan;
use cfdeploy::deploy::{DeploymentRequest, OperationKind, Plan, PlanExecutor, RoleStatus};
use cfdeploy::platform::RecordingGateway;
use cfdeploy::topology::{ParamKey, RoleId, TopologyCatalog};

fn build_plan(shape: &str, tag: &str) -> Plan {
    let request = DeploymentRequest::new(shape, tag, "1.0.0.SNAP")
        .with_param(ParamKey::Domain, "apps.example.com")
        .with_param(ParamKey::PlatformApi, "api.example.com");
    let shape = TopologyCatalog::global().lookup(shape).unwrap();
    plan(&request, shape).unwrap()
}

#[tokio::test]
async fn test_failure_stops_only_its_group() {
    let plan = build_plan("registry/public", "t3");
    let gateway = Arc::new(
        RecordingGateway::new().fail_on(OperationKind::SetEnvironmentVariable, "t3-api"),
    );
    let executor = PlanExecutor::new(gateway.clone());

    let outcomes = executor.execute(&plan, &CancellationToken::new()).await;

    let api = &outcomes[0];
    assert_eq!(api.role, RoleId::Api);
    assert_eq!(api.completed, 1);
    match &api.status {
        RoleStatus::Failed {
            step, kind, input, ..
        } => {
            assert_eq!(*step, 1);
            assert_eq!(*kind, OperationKind::SetEnvironmentVariable);
            assert_eq!(input, "TRUST_CERTS=api.example.com");
        }
        other => panic!("unexpected status: {:?}", other),
    }

    // Steps after the failing one are never issued
    let api_calls = gateway.calls_for("t3-api").await;
    assert_eq!(api_calls.len(), 2);
    assert_eq!(api_calls[0].kind(), OperationKind::Deploy);

    let api_group = plan.group(RoleId::Api).unwrap();
    assert_eq!(api_calls.as_slice(), &api_group.operations[..2]);

    for role in [RoleId::WebUi, RoleId::Edge] {
        let group = plan.group(role).unwrap();
        let outcome = outcomes.iter().find(|o| o.role == role).unwrap();
        assert_eq!(outcome.status, RoleStatus::Succeeded);
        assert_eq!(outcome.completed, group.operations.len());
        assert_eq!(gateway.calls_for(&group.app).await, group.operations);
    }
}

#[tokio::test]
async fn test_groups_run_concurrently() {
    let plan = build_plan("simple/public", "t1");
    let gateway = Arc::new(RecordingGateway::new().delay("t1-api", Duration::from_millis(50)));
    let executor = PlanExecutor::new(gateway.clone());

    let outcomes = executor.execute(&plan, &CancellationToken::new()).await;
    assert!(outcomes.iter().all(|o| o.status == RoleStatus::Succeeded));

    let calls = gateway.calls().await;
    let position = |app: &str, kind: OperationKind| {
        calls
            .iter()
            .position(|op| op.app() == app && op.kind() == kind)
            .unwrap()
    };

    // A slow api does not hold back the other groups
    assert!(position("t1-web-ui", OperationKind::Start) < position("t1-api", OperationKind::Start));
    assert!(position("t1-edge", OperationKind::Start) < position("t1-api", OperationKind::Start));

    // Order within each group is preserved
    for group in &plan.groups {
        assert_eq!(gateway.calls_for(&group.app).await, group.operations);
    }
}

#[tokio::test]
async fn test_outcome_independent_of_timing() {
    let plan = build_plan("simple/private", "t2");

    let fast = PlanExecutor::new(Arc::new(RecordingGateway::new()))
        .execute(&plan, &CancellationToken::new())
        .await;
    let slow = PlanExecutor::new(Arc::new(
        RecordingGateway::new()
            .delay("t2-edge", Duration::from_millis(30))
            .delay("t2-web-ui", Duration::from_millis(10)),
    ))
    .execute(&plan, &CancellationToken::new())
    .await;

    assert_eq!(fast, slow);
}

#[tokio::test]
async fn test_cancel_mid_run() {
    let plan = build_plan("simple/public", "t7");
    let mut gateway = RecordingGateway::new();
    for group in &plan.groups {
        gateway = gateway.delay(group.app.clone(), Duration::from_secs(5));
    }
    let gateway = Arc::new(gateway);
    let executor = PlanExecutor::new(gateway.clone());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let outcomes = executor.execute(&plan, &cancel).await;

    assert_eq!(outcomes.len(), 3);
    for outcome in &outcomes {
        assert_eq!(outcome.completed, 0);
        assert_eq!(outcome.status.failed_kind(), Some(OperationKind::Deploy));
    }
    // Only the in-flight deploys were issued
    assert_eq!(gateway.calls().await.len(), 3);
}
