//! Orchestrator unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use cfdeploy::deploy::{
    DeploymentRequest, Orchestrator, OrchestratorOptions, OperationKind, RoleStatus, RunState,
    SkipReason,
};
use cfdeploy::errors::DeployerError;
use cfdeploy::platform::RecordingGateway;
use cfdeploy::topology::{ParamKey, RoleId};

fn request(shape: &str, tag: &str) -> DeploymentRequest {
    DeploymentRequest::new(shape, tag, "1.0.0.SNAP")
        .with_param(ParamKey::Domain, "apps.example.com")
        .with_param(ParamKey::PlatformApi, "api.example.com")
}

fn orchestrator(gateway: &Arc<RecordingGateway>) -> Orchestrator {
    Orchestrator::new(gateway.clone())
}

#[tokio::test]
async fn test_bind_failure_is_partial() {
    let gateway = Arc::new(RecordingGateway::new().fail_on(OperationKind::BindService, "t3-web-ui"));

    let outcome = orchestrator(&gateway)
        .deploy(request("registry/public", "t3"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, RunState::PartiallyFailed);
    assert_eq!(outcome.status(RoleId::Api), Some(&RoleStatus::Succeeded));
    assert_eq!(outcome.status(RoleId::Edge), Some(&RoleStatus::Succeeded));

    let web_ui = outcome.role(RoleId::WebUi).unwrap();
    match &web_ui.status {
        RoleStatus::Failed { step, kind, input, .. } => {
            assert_eq!(*step, 3);
            assert_eq!(*kind, OperationKind::BindService);
            assert_eq!(input, "todos-config");
        }
        other => panic!("unexpected status: {:?}", other),
    }
    assert_eq!(outcome.failed_roles(), vec![RoleId::WebUi]);

    // Neither the registry binding nor the start reached the web-ui
    let calls = gateway.calls_for("t3-web-ui").await;
    assert_eq!(calls.len(), 4);
    assert!(!calls.iter().any(|op| op.kind() == OperationKind::Start));
}

#[tokio::test]
async fn test_successful_run() {
    let gateway = Arc::new(RecordingGateway::new());

    let outcome = orchestrator(&gateway)
        .deploy(request("simple/private", "t2"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, RunState::Succeeded);
    assert!(outcome.is_success());
    assert_eq!(outcome.tag, "t2");
    assert_eq!(outcome.shape, "simple/private");
    assert!(outcome.finished_at >= outcome.started_at);
    assert_eq!(outcome.roles.len(), 3);
    assert_eq!(gateway.calls().await.len(), 4 + 4 + 4);
}

#[tokio::test]
async fn test_generated_tag_prefixes_every_app() {
    let gateway = Arc::new(RecordingGateway::new());

    let outcome = orchestrator(&gateway)
        .deploy(request("mysql", ""), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, RunState::Succeeded);
    assert_eq!(outcome.tag.len(), 8);
    let prefix = format!("{}-", outcome.tag);

    let calls = gateway.calls().await;
    assert!(!calls.is_empty());
    assert!(calls.iter().all(|op| op.app().starts_with(&prefix)));
    assert!(outcome.roles.iter().all(|role| role.app.starts_with(&prefix)));
}

#[tokio::test]
async fn test_generated_tag_without_collision_check() {
    let gateway = Arc::new(RecordingGateway::new());
    let orchestrator = Orchestrator::new(gateway.clone()).with_options(OrchestratorOptions {
        check_tag_collisions: false,
        ..OrchestratorOptions::default()
    });

    let outcome = orchestrator
        .deploy(request("simple/public", ""), &CancellationToken::new())
        .await
        .unwrap();
    assert!(!outcome.tag.is_empty());
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_supplied_tag_is_reused_as_is() {
    let gateway = Arc::new(
        RecordingGateway::new().with_applications(vec!["t1-api".to_string(), "t1-edge".to_string()]),
    );

    let outcome = orchestrator(&gateway)
        .deploy(request("simple/public", "t1"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.tag, "t1");
    assert_eq!(gateway.calls_for("t1-api").await.len(), 2);
}

#[tokio::test]
async fn test_planning_errors_issue_nothing() {
    let gateway = Arc::new(RecordingGateway::new());
    let orchestrator = orchestrator(&gateway);
    let cancel = CancellationToken::new();

    let err = orchestrator
        .deploy(request("kubernetes", "t1"), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployerError::ShapeNotFound(_)));

    let missing_domain = DeploymentRequest::new("simple/public", "t1", "1.0.0.SNAP");
    let err = orchestrator.deploy(missing_domain, &cancel).await.unwrap_err();
    assert!(matches!(err, DeployerError::UnresolvedParameter(ref p) if p == "domain"));

    let foreign_role = request("simple/public", "t1").with_roles(vec![RoleId::Mysql]);
    let err = orchestrator.deploy(foreign_role, &cancel).await.unwrap_err();
    assert!(matches!(err, DeployerError::InvalidShape(_)));

    let err = orchestrator
        .deploy(request("simple/public", "Bad_Tag"), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployerError::InvalidRequest(_)));

    assert!(gateway.calls().await.is_empty());
}

#[tokio::test]
async fn test_missing_artifact_fails_at_deploy() {
    let gateway = Arc::new(RecordingGateway::new().missing_artifact("todos-edge"));

    let outcome = orchestrator(&gateway)
        .deploy(request("simple/public", "t8"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, RunState::PartiallyFailed);
    let edge = outcome.role(RoleId::Edge).unwrap();
    assert_eq!(edge.completed, 0);
    match &edge.status {
        RoleStatus::Failed { step, kind, error, .. } => {
            assert_eq!(*step, 0);
            assert_eq!(*kind, OperationKind::Deploy);
            assert!(error.contains("todos-edge"), "{}", error);
        }
        other => panic!("unexpected status: {:?}", other),
    }
    assert!(gateway.calls_for("t8-edge").await.is_empty());
}

#[tokio::test]
async fn test_role_subset_rerun() {
    let gateway = Arc::new(RecordingGateway::new());
    let rerun = request("registry/public", "t3").with_roles(vec![RoleId::WebUi]);

    let outcome = orchestrator(&gateway)
        .deploy(rerun, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, RunState::Succeeded);
    assert_eq!(outcome.roles.len(), 3);
    assert_eq!(outcome.roles[0].role, RoleId::WebUi);
    for role in [RoleId::Api, RoleId::Edge] {
        assert_eq!(
            outcome.status(role),
            Some(&RoleStatus::NotAttempted {
                reason: SkipReason::Excluded
            })
        );
    }

    let calls = gateway.calls().await;
    assert!(calls.iter().all(|op| op.app() == "t3-web-ui"));
    assert_eq!(calls.len(), 6);
}

#[tokio::test]
async fn test_every_group_failing_is_failed() {
    let gateway = Arc::new(
        RecordingGateway::new()
            .fail_on(OperationKind::Deploy, "t9-redis")
            .fail_on(OperationKind::Deploy, "t9-web-ui")
            .fail_on(OperationKind::Start, "t9-edge"),
    );

    let outcome = orchestrator(&gateway)
        .deploy(request("redis", "t9"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, RunState::Failed);
    assert_eq!(outcome.tally(), (3, 3));
    assert!(!outcome.is_success());
}

#[tokio::test]
async fn test_cancelled_before_execution() {
    let gateway = Arc::new(RecordingGateway::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = orchestrator(&gateway)
        .deploy(request("simple/public", "t1"), &cancel)
        .await
        .unwrap();

    assert_eq!(outcome.state, RunState::Failed);
    assert!(outcome.roles.iter().all(|role| role.status
        == RoleStatus::NotAttempted {
            reason: SkipReason::Cancelled
        }));
    assert!(gateway.calls().await.is_empty());
}

#[tokio::test]
async fn test_preview_issues_nothing() {
    let gateway = Arc::new(RecordingGateway::new());
    let plan = orchestrator(&gateway)
        .preview(&request("push-scs-redis", "t5"))
        .unwrap();

    assert_eq!(plan.shape, "redis+registry");
    assert_eq!(plan.groups.len(), 3);
    assert!(gateway.calls().await.is_empty());
}

static SEQUENCE_DRAWS: AtomicUsize = AtomicUsize::new(0);

/// Yields "aaaa0001", "aaaa0002", ...
fn sequential_tag() -> String {
    let draw = SEQUENCE_DRAWS.fetch_add(1, Ordering::SeqCst) + 1;
    format!("aaaa{:04}", draw)
}

fn constant_tag() -> String {
    "bbbb0000".to_string()
}

#[tokio::test]
async fn test_colliding_generated_tag_is_redrawn() {
    let gateway = Arc::new(RecordingGateway::new().with_applications(vec![
        "aaaa0001-api".to_string(),
        "aaaa0001-edge".to_string(),
        "someone-else".to_string(),
    ]));
    let orchestrator = Orchestrator::new(gateway.clone()).with_options(OrchestratorOptions {
        tag_source: sequential_tag,
        ..OrchestratorOptions::default()
    });

    let outcome = orchestrator
        .deploy(request("simple/public", ""), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.tag, "aaaa0002");
    assert!(outcome.is_success());
    let calls = gateway.calls().await;
    assert!(calls.iter().all(|op| op.app().starts_with("aaaa0002-")));
}

#[tokio::test]
async fn test_exhausted_tag_draws_issue_nothing() {
    let gateway = Arc::new(
        RecordingGateway::new().with_applications(vec!["bbbb0000-web-ui".to_string()]),
    );
    let orchestrator = Orchestrator::new(gateway.clone()).with_options(OrchestratorOptions {
        max_tag_attempts: 3,
        tag_source: constant_tag,
        ..OrchestratorOptions::default()
    });

    let err = orchestrator
        .deploy(request("simple/public", ""), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DeployerError::InvalidRequest(ref msg) if msg.contains("4 attempts")));
    assert!(gateway.calls().await.is_empty());
}

#[tokio::test]
async fn test_supplied_tag_skips_tag_source() {
    let gateway = Arc::new(RecordingGateway::new());
    let orchestrator = Orchestrator::new(gateway.clone()).with_options(OrchestratorOptions {
        tag_source: constant_tag,
        ..OrchestratorOptions::default()
    });

    let outcome = orchestrator
        .deploy(request("simple/public", "t1"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.tag, "t1");
}

#[tokio::test]
async fn test_gateway_api_error_is_attributed() {
    let gateway = Arc::new(RecordingGateway::new().fail_on(OperationKind::BindService, "t3-web-ui"));

    let outcome = orchestrator(&gateway)
        .deploy(request("registry/public", "t3"), &CancellationToken::new())
        .await
        .unwrap();

    match outcome.status(RoleId::WebUi) {
        Some(RoleStatus::Failed { error, .. }) => {
            assert!(error.contains("bindService"), "{}", error);
            assert!(error.contains("t3-web-ui"), "{}", error);
        }
        other => panic!("unexpected status: {:?}", other),
    }
}
