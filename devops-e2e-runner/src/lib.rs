//! devops E2E runner library.
//!
//! Exposes the harness phases for integration testing with in-memory
//! collaborators. In production, `devops-e2e-runner` is used as a binary
//! (main.rs) wired to [`live::LiveConnector`].

pub mod bootstrap;
pub mod catalog;
pub mod cli;
pub mod context;
pub mod harness;
pub mod live;
pub mod logging;
pub mod metrics_export;
pub mod provision;
pub mod report;
pub mod scenario;
pub mod scope;
pub mod teardown;

pub use harness::Harness;
pub use report::{Outcome, ScenarioReport};
pub use scenario::{ClaimOutcome, ClaimVerifier, ScenarioState};
