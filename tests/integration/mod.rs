//! Integration test suite for pomr
//!
//! End-to-end tests of sessions and the command line over real files in temporary
//! directories.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **aggregation**: project builds, module discovery and the reactor
//! - **cache_behavior**: run-once stages and shared results
//! - **cli**: the `pomr` binary
//! - **cycles**: parent, import and module cycles
//! - **determinism**: project builds with different pool sizes
//! - **imports**: dependency-management imports
//! - **parents**: parent lookup order and version ranges
//! - **profiles**: profile activation and as-parent variant reuse

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod aggregation;
mod cache_behavior;
mod cli;
mod cycles;
mod determinism;
mod imports;
mod parents;
mod profiles;
