//! Topology catalog unit tests

use cfdeploy::errors::DeployerError;
use cfdeploy::topology::{Endpoint, EnvValue, Networking, ParamKey, RoleId, TopologyCatalog, Wiring};

#[test]
fn test_catalog_has_every_shape() {
    let catalog = TopologyCatalog::new();
    let ids: Vec<&str> = catalog.shapes().iter().map(|shape| shape.id).collect();

    assert_eq!(
        ids,
        vec![
            "simple/public",
            "simple/private",
            "registry/public",
            "registry/private",
            "mysql",
            "redis",
            "mysql+registry",
            "redis+registry",
            "lookaside",
        ]
    );
}

#[test]
fn test_lookup_by_alias() {
    let catalog = TopologyCatalog::new();

    assert_eq!(catalog.lookup("registry-integrated/public").unwrap().id, "registry/public");
    assert_eq!(catalog.lookup("push-scs-redis").unwrap().id, "redis+registry");
    assert_eq!(catalog.lookup("  Simple/Private ").unwrap().id, "simple/private");
}

#[test]
fn test_lookup_unknown_shape() {
    let catalog = TopologyCatalog::new();
    let err = catalog.lookup("kubernetes").unwrap_err();
    assert!(matches!(err, DeployerError::ShapeNotFound(ref id) if id == "kubernetes"));
    assert!(err.is_planning_error());
}

#[test]
fn test_private_shapes_route_backends_internally() {
    let catalog = TopologyCatalog::new();

    for shape in catalog.shapes() {
        assert!(shape.contains(RoleId::Edge), "{} has no edge", shape.id);
    }

    let private = catalog.lookup("simple/private").unwrap();
    assert_eq!(private.networking, Networking::Private);
    assert!(private.is_privately_routed(RoleId::Api));
    assert!(private.is_privately_routed(RoleId::WebUi));

    let public = catalog.lookup("simple/public").unwrap();
    assert!(!public.is_privately_routed(RoleId::Api));
}

#[test]
fn test_simple_edge_wiring_targets_endpoints() {
    let catalog = TopologyCatalog::new();
    let shape = catalog.lookup("simple/public").unwrap();
    let edge = shape.role(RoleId::Edge).unwrap();

    assert_eq!(
        edge.wiring,
        vec![
            Wiring::SetEnv {
                key: "TODOS_UI_ENDPOINT",
                value: EnvValue::AddressOf(Endpoint::Ui),
            },
            Wiring::SetEnv {
                key: "TODOS_API_ENDPOINT",
                value: EnvValue::AddressOf(Endpoint::Api),
            },
        ]
    );
    assert!(shape.role(RoleId::Api).unwrap().wiring.is_empty());
}

#[test]
fn test_registry_roles_bind_config_then_registry() {
    let catalog = TopologyCatalog::new();
    let shape = catalog.lookup("registry/public").unwrap();

    for spec in &shape.roles {
        assert_eq!(
            spec.wiring,
            vec![
                Wiring::SetEnv {
                    key: "TRUST_CERTS",
                    value: EnvValue::Param(ParamKey::PlatformApi),
                },
                Wiring::SetEnv {
                    key: "SPRING_APPLICATION_NAME",
                    value: EnvValue::OwnAppName,
                },
                Wiring::Bind(ParamKey::ConfigService),
                Wiring::Bind(ParamKey::RegistryService),
            ],
            "unexpected wiring for {}",
            spec.id()
        );
    }
}

#[test]
fn test_lookaside_roles() {
    let catalog = TopologyCatalog::new();
    let shape = catalog.lookup("lookaside").unwrap();

    assert_eq!(
        shape.role_ids(),
        vec![RoleId::App, RoleId::Mysql, RoleId::Redis, RoleId::WebUi, RoleId::Edge]
    );
    assert_eq!(shape.endpoint_provider(Endpoint::Api), Some(RoleId::App));
    assert_eq!(shape.endpoint_provider(Endpoint::Ui), Some(RoleId::WebUi));
}

#[test]
fn test_global_catalog_is_shared() {
    let a = TopologyCatalog::global() as *const TopologyCatalog;
    let b = TopologyCatalog::global() as *const TopologyCatalog;
    assert_eq!(a, b);
}
