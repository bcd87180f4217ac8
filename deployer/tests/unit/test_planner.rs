//! Planner unit tests

use cfdeploy::deploy::planner::plan;
use cfdeploy::deploy::{DeploymentRequest, Operation, OperationKind};
use cfdeploy::errors::DeployerError;
use cfdeploy::topology::{ParamKey, RoleId, TopologyCatalog};

fn request(shape: &str, tag: &str) -> DeploymentRequest {
    DeploymentRequest::new(shape, tag, "1.0.0.SNAP")
        .with_param(ParamKey::Domain, "apps.example.com")
        .with_param(ParamKey::PlatformApi, "api.example.com")
}

fn env_of(operations: &[Operation], wanted: &str) -> Option<String> {
    operations.iter().find_map(|op| match op {
        Operation::SetEnvironmentVariable { key, value, .. } if key == wanted => Some(value.clone()),
        _ => None,
    })
}

#[test]
fn test_every_shape_plans_one_group_per_role() {
    let catalog = TopologyCatalog::new();

    for shape in catalog.shapes() {
        let plan = plan(&request(shape.id, "t0"), shape).unwrap();

        let roles: Vec<RoleId> = plan.groups.iter().map(|group| group.role).collect();
        assert_eq!(roles, shape.role_ids(), "{}", shape.id);
        assert!(plan.excluded.is_empty());

        for group in &plan.groups {
            let kinds = group.kinds();
            assert_eq!(kinds.first(), Some(&OperationKind::Deploy), "{}", group.app);
            assert_eq!(kinds.last(), Some(&OperationKind::Start), "{}", group.app);
            assert!(group.app.starts_with("t0-"));
            assert!(group.operations.iter().all(|op| op.app() == group.app));
        }
    }
}

#[test]
fn test_simple_public_edge_wiring() {
    let catalog = TopologyCatalog::new();
    let shape = catalog.lookup("simple/public").unwrap();
    let plan = plan(&request("simple/public", "t1"), shape).unwrap();

    let api = plan.group(RoleId::Api).unwrap();
    assert_eq!(api.kinds(), vec![OperationKind::Deploy, OperationKind::Start]);
    assert_eq!(
        api.operations[0],
        Operation::Deploy {
            artifact: cfdeploy::artifacts::ArtifactRef::new("todos-api", "1.0.0.SNAP"),
            app: "t1-api".to_string(),
            start_immediately: false,
        }
    );

    let edge = plan.group(RoleId::Edge).unwrap();
    assert_eq!(
        edge.kinds(),
        vec![
            OperationKind::Deploy,
            OperationKind::SetEnvironmentVariable,
            OperationKind::SetEnvironmentVariable,
            OperationKind::Start,
        ]
    );
    assert_eq!(
        env_of(&edge.operations, "TODOS_UI_ENDPOINT").as_deref(),
        Some("http://t1-web-ui.apps.example.com")
    );
    assert_eq!(
        env_of(&edge.operations, "TODOS_API_ENDPOINT").as_deref(),
        Some("http://t1-api.apps.example.com")
    );
}

#[test]
fn test_simple_private_routes_before_wiring() {
    let catalog = TopologyCatalog::new();
    let shape = catalog.lookup("simple/private").unwrap();
    let plan = plan(&request("simple/private", "t2"), shape).unwrap();

    for role in [RoleId::Api, RoleId::WebUi] {
        let group = plan.group(role).unwrap();
        assert_eq!(
            group.kinds(),
            vec![
                OperationKind::Deploy,
                OperationKind::MapRoute,
                OperationKind::UnmapRoute,
                OperationKind::Start,
            ]
        );
        assert_eq!(
            group.operations[1],
            Operation::MapRoute {
                app: group.app.clone(),
                domain: "apps.internal".to_string(),
                host: group.app.clone(),
            }
        );
        assert_eq!(
            group.operations[2],
            Operation::UnmapRoute {
                app: group.app.clone(),
                domain: "apps.example.com".to_string(),
                host: group.app.clone(),
            }
        );
    }

    let edge = plan.group(RoleId::Edge).unwrap();
    assert!(!edge.kinds().contains(&OperationKind::MapRoute));
    assert_eq!(
        env_of(&edge.operations, "TODOS_UI_ENDPOINT").as_deref(),
        Some("http://t2-web-ui.apps.internal:8080")
    );
    assert_eq!(
        env_of(&edge.operations, "TODOS_API_ENDPOINT").as_deref(),
        Some("http://t2-api.apps.internal:8080")
    );
}

#[test]
fn test_registry_private_wiring_follows_routes() {
    let catalog = TopologyCatalog::new();
    let shape = catalog.lookup("registry/private").unwrap();
    let plan = plan(&request("registry/private", "t4"), shape).unwrap();

    let api = plan.group(RoleId::Api).unwrap();
    assert_eq!(
        api.kinds(),
        vec![
            OperationKind::Deploy,
            OperationKind::MapRoute,
            OperationKind::UnmapRoute,
            OperationKind::SetEnvironmentVariable,
            OperationKind::SetEnvironmentVariable,
            OperationKind::BindService,
            OperationKind::BindService,
            OperationKind::Start,
        ]
    );
    assert_eq!(env_of(&api.operations, "TRUST_CERTS").as_deref(), Some("api.example.com"));
    assert_eq!(env_of(&api.operations, "SPRING_APPLICATION_NAME").as_deref(), Some("t4-api"));
    assert_eq!(
        api.operations[5],
        Operation::BindService {
            app: "t4-api".to_string(),
            instance: "todos-config".to_string(),
        }
    );
}

#[test]
fn test_backend_binding_uses_request_param() {
    let catalog = TopologyCatalog::new();
    let shape = catalog.lookup("mysql").unwrap();
    let request = request("mysql", "t5").with_param(ParamKey::DatabaseService, "orders-db");
    let plan = plan(&request, shape).unwrap();

    let mysql = plan.group(RoleId::Mysql).unwrap();
    assert_eq!(
        mysql.operations[1],
        Operation::BindService {
            app: "t5-mysql".to_string(),
            instance: "orders-db".to_string(),
        }
    );

    let edge = plan.group(RoleId::Edge).unwrap();
    assert_eq!(
        env_of(&edge.operations, "TODOS_API_ENDPOINT").as_deref(),
        Some("http://t5-mysql.apps.example.com")
    );
}

#[test]
fn test_role_subset_excludes_the_rest() {
    let catalog = TopologyCatalog::new();
    let shape = catalog.lookup("registry/public").unwrap();
    let request = request("registry/public", "t3").with_roles(vec![RoleId::WebUi]);
    let plan = plan(&request, shape).unwrap();

    assert_eq!(plan.groups.len(), 1);
    assert_eq!(plan.groups[0].app, "t3-web-ui");
    assert_eq!(plan.excluded, vec![RoleId::Api, RoleId::Edge]);
}

#[test]
fn test_role_outside_shape_is_invalid() {
    let catalog = TopologyCatalog::new();
    let shape = catalog.lookup("simple/public").unwrap();
    let request = request("simple/public", "t1").with_roles(vec![RoleId::Redis]);

    let err = plan(&request, shape).unwrap_err();
    assert!(matches!(err, DeployerError::InvalidShape(_)));
}

#[test]
fn test_missing_domain_is_unresolved() {
    let catalog = TopologyCatalog::new();
    let shape = catalog.lookup("simple/public").unwrap();
    let request = DeploymentRequest::new("simple/public", "t1", "1.0.0.SNAP");

    let err = plan(&request, shape).unwrap_err();
    assert!(matches!(err, DeployerError::UnresolvedParameter(ref p) if p == "domain"));
}

#[test]
fn test_planning_is_deterministic() {
    let catalog = TopologyCatalog::new();
    let shape = catalog.lookup("lookaside").unwrap();
    let request = request("lookaside", "t6");

    assert_eq!(plan(&request, shape).unwrap(), plan(&request, shape).unwrap());
}
