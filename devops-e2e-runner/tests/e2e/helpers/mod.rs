//! Shared E2E test helpers.
//!
//! Provides an in-memory implementation of every collaborator, a config
//! builder over an in-memory environment, closure-backed verifiers and report
//! assertions.

pub mod assertions;
pub mod config;
pub mod fake_world;
pub mod verifier;
