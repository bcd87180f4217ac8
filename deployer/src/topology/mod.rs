//! Topology module

pub mod catalog;
pub mod role;
pub mod shape;

pub use catalog::{Backend, Composition, TopologyCatalog};
pub use role::{Role, RoleId, StartPolicy};
pub use shape::{Endpoint, EnvValue, Networking, ParamKey, RoleSpec, TopologyShape, Wiring};
