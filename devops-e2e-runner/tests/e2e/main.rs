//! E2E integration tests for devops-e2e-runner.
//!
//! These tests drive the full harness (setup, scenario, scoped cleanups,
//! teardown) against an in-memory cluster, storage backend and key provider.
//!
//! # Test Structure
//!
//! - `helpers/` -- Shared test utilities (fake world, config builder, assertions)
//! - `scenarios/` -- Test files organized by behavior
//!
//! # Running
//!
//! ```bash
//! cargo test -p devops-e2e-runner --test e2e
//! ```

mod helpers;
mod scenarios;
