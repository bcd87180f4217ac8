//! Topology catalog
//!
//! Every shape is composed from the same pieces: the core roles, an optional
//! backend that takes over the API endpoint, registry integration, and the
//! networking mode. The entries below only name the composition.

use std::sync::OnceLock;

use crate::errors::DeployerError;
use crate::topology::role::RoleId;
use crate::topology::shape::{
    Endpoint, EnvValue, Networking, ParamKey, RoleSpec, TopologyShape, Wiring,
};

/// Backend variant of a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// `mysql` replaces `api` and binds the database service
    Database,
    /// `redis` replaces `api` and binds the cache service
    Cache,
    /// `app` fronts `mysql` and `redis` and binds the messaging service
    LookAside,
}

/// The ingredients of a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Composition {
    pub backend: Option<Backend>,
    pub registry: bool,
    pub networking: Networking,
}

struct CatalogEntry {
    id: &'static str,
    aliases: &'static [&'static str],
    description: &'static str,
    composition: Composition,
}

const fn entry(
    id: &'static str,
    aliases: &'static [&'static str],
    description: &'static str,
    backend: Option<Backend>,
    registry: bool,
    networking: Networking,
) -> CatalogEntry {
    CatalogEntry {
        id,
        aliases,
        description,
        composition: Composition {
            backend,
            registry,
            networking,
        },
    }
}

const ENTRIES: &[CatalogEntry] = &[
    entry(
        "simple/public",
        &["simple", "push-app"],
        "api, web-ui and edge on public routes",
        None,
        false,
        Networking::Public,
    ),
    entry(
        "simple/private",
        &["push-internal"],
        "api and web-ui on internal routes behind a public edge",
        None,
        false,
        Networking::Private,
    ),
    entry(
        "registry/public",
        &["registry-integrated/public", "registry", "push-scs"],
        "api, web-ui and edge bound to config and registry services",
        None,
        true,
        Networking::Public,
    ),
    entry(
        "registry/private",
        &["registry-integrated/private", "push-scs-internal"],
        "registry-integrated roles on internal routes behind a public edge",
        None,
        true,
        Networking::Private,
    ),
    entry(
        "mysql",
        &["mysql/public", "push-mysql"],
        "mysql backend standing in for api",
        Some(Backend::Database),
        false,
        Networking::Public,
    ),
    entry(
        "redis",
        &["redis/public", "push-redis"],
        "redis backend standing in for api",
        Some(Backend::Cache),
        false,
        Networking::Public,
    ),
    entry(
        "mysql+registry",
        &["registry+mysql", "push-scs-mysql"],
        "registry-integrated roles with a mysql backend",
        Some(Backend::Database),
        true,
        Networking::Public,
    ),
    entry(
        "redis+registry",
        &["registry+redis", "push-scs-redis"],
        "registry-integrated roles with a redis backend",
        Some(Backend::Cache),
        true,
        Networking::Public,
    ),
    entry(
        "lookaside",
        &["look-aside", "push-lookaside"],
        "look-aside caching app over mysql and redis, registry-integrated",
        Some(Backend::LookAside),
        true,
        Networking::Public,
    ),
];

const UI_ENDPOINT_VAR: &str = "TODOS_UI_ENDPOINT";
const API_ENDPOINT_VAR: &str = "TODOS_API_ENDPOINT";
const TRUST_CERTS_VAR: &str = "TRUST_CERTS";
const APP_NAME_VAR: &str = "SPRING_APPLICATION_NAME";

/// Build a shape from its composition
pub fn compose(id: &'static str, description: &'static str, composition: Composition) -> TopologyShape {
    // (role, bindings before the registry wiring, bindings after it)
    let backends: Vec<(RoleId, Vec<ParamKey>, Vec<ParamKey>)> = match composition.backend {
        None => vec![(RoleId::Api, vec![], vec![])],
        Some(Backend::Database) => vec![(RoleId::Mysql, vec![ParamKey::DatabaseService], vec![])],
        Some(Backend::Cache) => vec![(RoleId::Redis, vec![ParamKey::CacheService], vec![])],
        Some(Backend::LookAside) => vec![
            (RoleId::App, vec![], vec![ParamKey::MessagingService]),
            (RoleId::Mysql, vec![ParamKey::DatabaseService], vec![]),
            (RoleId::Redis, vec![ParamKey::CacheService], vec![]),
        ],
    };
    let api_provider = backends[0].0;

    let mut roles: Vec<RoleSpec> = backends
        .into_iter()
        .map(|(id, before, after)| role_spec(id, composition.registry, before, after))
        .collect();
    roles.push(role_spec(RoleId::WebUi, composition.registry, vec![], vec![]));

    let mut edge = role_spec(RoleId::Edge, composition.registry, vec![], vec![]);
    // The edge is the ingress and always keeps its public route.
    edge.private_route = false;
    if !composition.registry {
        edge.wiring.push(Wiring::SetEnv {
            key: UI_ENDPOINT_VAR,
            value: EnvValue::AddressOf(Endpoint::Ui),
        });
        edge.wiring.push(Wiring::SetEnv {
            key: API_ENDPOINT_VAR,
            value: EnvValue::AddressOf(Endpoint::Api),
        });
    }
    roles.push(edge);

    TopologyShape {
        id,
        description,
        networking: composition.networking,
        roles,
        endpoints: vec![(Endpoint::Ui, RoleId::WebUi), (Endpoint::Api, api_provider)],
    }
}

fn role_spec(id: RoleId, registry: bool, before: Vec<ParamKey>, after: Vec<ParamKey>) -> RoleSpec {
    let mut spec = RoleSpec::new(id);
    spec.private_route = true;

    if registry {
        spec.wiring.push(Wiring::SetEnv {
            key: TRUST_CERTS_VAR,
            value: EnvValue::Param(ParamKey::PlatformApi),
        });
        spec.wiring.push(Wiring::SetEnv {
            key: APP_NAME_VAR,
            value: EnvValue::OwnAppName,
        });
    }
    spec.wiring.extend(before.into_iter().map(Wiring::Bind));
    if registry {
        spec.wiring.push(Wiring::Bind(ParamKey::ConfigService));
        spec.wiring.push(Wiring::Bind(ParamKey::RegistryService));
    }
    spec.wiring.extend(after.into_iter().map(Wiring::Bind));

    spec
}

/// Read-only catalog of supported shapes
#[derive(Debug, Clone)]
pub struct TopologyCatalog {
    shapes: Vec<TopologyShape>,
    aliases: Vec<(&'static str, usize)>,
}

impl TopologyCatalog {
    /// Build the catalog of every supported shape
    pub fn new() -> Self {
        let mut shapes = Vec::with_capacity(ENTRIES.len());
        let mut aliases = Vec::new();

        for (index, entry) in ENTRIES.iter().enumerate() {
            shapes.push(compose(entry.id, entry.description, entry.composition));
            aliases.extend(entry.aliases.iter().map(|alias| (*alias, index)));
        }

        Self { shapes, aliases }
    }

    /// The process-wide catalog
    pub fn global() -> &'static TopologyCatalog {
        static CATALOG: OnceLock<TopologyCatalog> = OnceLock::new();
        CATALOG.get_or_init(TopologyCatalog::new)
    }

    /// Look up a shape by id or alias
    pub fn lookup(&self, shape_id: &str) -> Result<&TopologyShape, DeployerError> {
        let needle = shape_id.trim().to_lowercase();

        if let Some(shape) = self.shapes.iter().find(|shape| shape.id == needle) {
            return Ok(shape);
        }

        self.aliases
            .iter()
            .find(|(alias, _)| *alias == needle)
            .map(|(_, index)| &self.shapes[*index])
            .ok_or_else(|| DeployerError::ShapeNotFound(shape_id.to_string()))
    }

    /// All shapes, in catalog order
    pub fn shapes(&self) -> &[TopologyShape] {
        &self.shapes
    }

    /// Aliases registered for `shape_id`
    pub fn aliases_of(&self, shape_id: &str) -> Vec<&'static str> {
        let Some(index) = self.shapes.iter().position(|shape| shape.id == shape_id) else {
            return Vec::new();
        };
        self.aliases
            .iter()
            .filter(|(_, i)| *i == index)
            .map(|(alias, _)| *alias)
            .collect()
    }
}

impl Default for TopologyCatalog {
    fn default() -> Self {
        Self::new()
    }
}
