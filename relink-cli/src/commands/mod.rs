//! CLI command implementations.

pub mod clear;
pub mod plan;
pub mod purge;
pub mod resolve;
pub mod status;
