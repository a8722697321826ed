//! vCenter storage backend for the devops E2E harness.
//!
//! Resolves storage policies, reports whether a policy encrypts, checks key
//! provider health and generates keys over the vCenter REST API.

pub mod backend;
pub mod model;

pub use backend::VsphereBackend;
