//! Application module

pub mod output;
pub mod run;
