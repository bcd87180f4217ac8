//! Cloud Foundry v3 API models
//!
//! Request and response bodies for the subset of the Cloud Controller and UAA
//! APIs used by cfdeploy.

pub mod models;

pub use models::*;
