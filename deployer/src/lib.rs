//! cfdeploy library
//!
//! Topology catalog, step planner, plan executor and the orchestration
//! facade, plus the Cloud Foundry gateway they drive.

pub mod app;
pub mod artifacts;
pub mod authn;
pub mod cli;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod platform;
pub mod storage;
pub mod topology;
pub mod utils;
