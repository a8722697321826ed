//! Kubernetes-backed collaborators for the devops E2E harness.
//!
//! - [`KubeClusterClient`]: nodes, storage classes, claims, events
//! - [`KubeCryptoClient`]: encryption classes, key generation, storage class capability
//! - [`KubeVmOperatorClient`]: VM image lookup across registered schema versions
//!
//! All clients share one `kube::Client` per identity, built by [`connect::client_for`].

pub mod cluster;
pub mod connect;
pub mod crypto;
pub mod error;
pub mod vmoperator;

pub use cluster::KubeClusterClient;
pub use crypto::KubeCryptoClient;
pub use vmoperator::KubeVmOperatorClient;
