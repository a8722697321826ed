//! Live collaborators: Kubernetes clusters and a vCenter storage backend.

use devops_e2e_core::client::Connector;
use devops_e2e_core::config::VcenterConfig;
use devops_e2e_core::error::{BackendError, ClusterError};
use devops_e2e_core::types::{ClusterTarget, SchemaSet};
use devops_e2e_kube::{KubeClusterClient, KubeCryptoClient, KubeVmOperatorClient};
use devops_e2e_vsphere::VsphereBackend;

/// Connects real clients.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveConnector;

impl Connector for LiveConnector {
    type Cluster = KubeClusterClient;
    type Backend = VsphereBackend;
    type Crypto = KubeCryptoClient<VsphereBackend>;
    type VmOperator = KubeVmOperatorClient;

    async fn connect_cluster(&self, target: &ClusterTarget) -> Result<Self::Cluster, ClusterError> {
        KubeClusterClient::connect(target).await
    }

    async fn connect_backend(&self, vcenter: &VcenterConfig) -> Result<Self::Backend, BackendError> {
        VsphereBackend::connect(vcenter).await
    }

    // The encryption client reuses the admin credentials.
    async fn connect_crypto(
        &self,
        cluster: &Self::Cluster,
        backend: &Self::Backend,
    ) -> Result<Self::Crypto, ClusterError> {
        Ok(KubeCryptoClient::new(
            cluster.kube_client().clone(),
            backend.clone(),
        ))
    }

    async fn connect_vm_operator(
        &self,
        cluster: &Self::Cluster,
        schemas: SchemaSet,
    ) -> Result<Self::VmOperator, ClusterError> {
        Ok(KubeVmOperatorClient::new(
            cluster.kube_client().clone(),
            schemas,
        ))
    }
}
