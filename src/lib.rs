//! Invok Cluster
//!
//! Density-based clustering of program invocations for sampling-based
//! performance analysis: repeated executions of a traced region are grouped
//! by memory-page footprint or by hardware counters, so a small set of
//! representatives can stand in for the whole population.
//!
//! This crate provides the core implementation for the `invok-cluster`
//! CLI tool.
//!
//! Pipeline: trace/CSV ingestion → pairwise distances → epsilon
//! estimation → density clustering → persisted result document.

pub mod cluster;
pub mod commands;
pub mod distance;
pub mod metrics;
pub mod result;
pub mod trace;
pub mod utils;
