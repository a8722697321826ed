//! Cluster API client backed by `kube`.
//!
//! [`KubeClusterClient`] implements [`ClusterClient`] over the core/v1 and
//! storage.k8s.io/v1 APIs. Object construction and status interpretation live in
//! free functions ([`build_storage_class`], [`build_claim`], [`node_info`],
//! [`event_info`]) so they can be tested without an API server.

use std::collections::BTreeMap;
use std::time::SystemTime;

use devops_e2e_core::client::{ClusterClient, StorageClassParameters};
use devops_e2e_core::error::ClusterError;
use devops_e2e_core::types::{
    ClaimRef, ClaimRequest, ClusterEvent, ClusterTarget, ENCRYPTION_CLASS_ANNOTATION, NodeInfo,
    most_recent_events,
};
use k8s_openapi::api::core::v1::{
    Event, Node, PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Client;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use tracing::{debug, info};

use crate::connect::client_for;
use crate::error::{map_list_error, map_object_error};

/// Label marking objects created by the harness.
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
/// Value of [`MANAGED_BY_LABEL`].
pub const MANAGED_BY_VALUE: &str = "devops-e2e";

/// Cluster client bound to one identity and namespace.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
    namespace: String,
}

impl KubeClusterClient {
    /// Wraps an existing client.
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    /// Connects with the credentials of `target`.
    pub async fn connect(target: &ClusterTarget) -> Result<Self, ClusterError> {
        let client = client_for(target).await?;
        info!(cluster = %target, "cluster client connected");
        Ok(Self::new(client, &target.namespace))
    }

    /// The underlying `kube` client, shared with the crypto and VM clients.
    pub fn kube_client(&self) -> &Client {
        &self.client
    }
}

impl ClusterClient for KubeClusterClient {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn list_ready_schedulable_nodes(&self) -> Result<Vec<NodeInfo>, ClusterError> {
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = api
            .list(&ListParams::default())
            .await
            .map_err(|e| map_list_error(e, "nodes"))?;

        let total = nodes.items.len();
        let usable: Vec<NodeInfo> = nodes
            .items
            .iter()
            .map(node_info)
            .filter(NodeInfo::is_usable)
            .collect();
        debug!(total, usable = usable.len(), "listed nodes");
        Ok(usable)
    }

    async fn get_storage_class(
        &self,
        name: &str,
    ) -> Result<Option<StorageClassParameters>, ClusterError> {
        let api: Api<StorageClass> = Api::all(self.client.clone());
        match api.get(name).await {
            Ok(sc) => Ok(Some(sc.parameters.unwrap_or_default())),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(map_object_error(e, "StorageClass", name)),
        }
    }

    async fn create_storage_class(
        &self,
        name: &str,
        provisioner: &str,
        parameters: &StorageClassParameters,
    ) -> Result<(), ClusterError> {
        let api: Api<StorageClass> = Api::all(self.client.clone());
        let sc = build_storage_class(name, provisioner, parameters);
        api.create(&PostParams::default(), &sc)
            .await
            .map_err(|e| map_object_error(e, "StorageClass", name))?;
        Ok(())
    }

    async fn delete_storage_class(&self, name: &str) -> Result<(), ClusterError> {
        let api: Api<StorageClass> = Api::all(self.client.clone());
        api.delete(name, &immediate_delete())
            .await
            .map_err(|e| map_object_error(e, "StorageClass", name))?;
        Ok(())
    }

    async fn create_claim(&self, request: &ClaimRequest) -> Result<ClaimRef, ClusterError> {
        let api: Api<PersistentVolumeClaim> =
            Api::namespaced(self.client.clone(), &request.namespace);
        let pvc = build_claim(request);
        let created = api
            .create(&PostParams::default(), &pvc)
            .await
            .map_err(|e| map_object_error(e, "PersistentVolumeClaim", &request.name))?;

        Ok(ClaimRef {
            namespace: request.namespace.clone(),
            name: created.metadata.name.unwrap_or_else(|| request.name.clone()),
            storage_class: request.storage_class.clone(),
            encryption_class: request.encryption_class.clone(),
        })
    }

    async fn delete_claim(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default())
            .await
            .map_err(|e| map_object_error(e, "PersistentVolumeClaim", name))?;
        Ok(())
    }

    async fn recent_events(
        &self,
        namespace: &str,
        limit: usize,
    ) -> Result<Vec<ClusterEvent>, ClusterError> {
        let api: Api<Event> = Api::namespaced(self.client.clone(), namespace);
        let events = api
            .list(&ListParams::default())
            .await
            .map_err(|e| map_list_error(e, "events"))?;
        let events = events
            .items
            .iter()
            .map(|e| event_info(namespace, e))
            .collect();
        Ok(most_recent_events(events, limit))
    }
}

/// Delete options with a zero grace period.
pub fn immediate_delete() -> DeleteParams {
    DeleteParams {
        grace_period_seconds: Some(0),
        ..Default::default()
    }
}

/// Builds a storage class bound to a backend storage policy.
pub fn build_storage_class(
    name: &str,
    provisioner: &str,
    parameters: &StorageClassParameters,
) -> StorageClass {
    StorageClass {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            labels: Some(BTreeMap::from([(
                MANAGED_BY_LABEL.to_owned(),
                MANAGED_BY_VALUE.to_owned(),
            )])),
            ..Default::default()
        },
        provisioner: provisioner.to_owned(),
        parameters: Some(parameters.clone()),
        reclaim_policy: Some("Delete".to_owned()),
        volume_binding_mode: Some("Immediate".to_owned()),
        allow_volume_expansion: Some(true),
        ..Default::default()
    }
}

/// Builds a persistent volume claim; the encryption class travels as an annotation.
pub fn build_claim(request: &ClaimRequest) -> PersistentVolumeClaim {
    let annotations = request.encryption_class.as_ref().map(|class| {
        BTreeMap::from([(ENCRYPTION_CLASS_ANNOTATION.to_owned(), class.clone())])
    });

    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(request.name.clone()),
            namespace: Some(request.namespace.clone()),
            annotations,
            labels: Some(BTreeMap::from([(
                MANAGED_BY_LABEL.to_owned(),
                MANAGED_BY_VALUE.to_owned(),
            )])),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec![request.access_mode.clone()]),
            storage_class_name: Some(request.storage_class.clone()),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_owned(),
                    Quantity(request.size.clone()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Summarizes a node's readiness and schedulability.
///
/// Ready means a `Ready=True` condition. Schedulable means not cordoned and
/// no `NoSchedule`/`NoExecute` taint.
pub fn node_info(node: &Node) -> NodeInfo {
    let ready = node
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conds| {
            conds
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        });

    let spec = node.spec.as_ref();
    let cordoned = spec.and_then(|s| s.unschedulable).unwrap_or(false);
    let tainted = spec.and_then(|s| s.taints.as_ref()).is_some_and(|taints| {
        taints
            .iter()
            .any(|t| t.effect == "NoSchedule" || t.effect == "NoExecute")
    });

    NodeInfo {
        name: node.metadata.name.clone().unwrap_or_default(),
        ready,
        schedulable: !cordoned && !tainted,
    }
}

/// Converts a core/v1 event into a [`ClusterEvent`].
///
/// The timestamp prefers `lastTimestamp`, then `eventTime`, then the creation time.
pub fn event_info(namespace: &str, event: &Event) -> ClusterEvent {
    let timestamp = event
        .last_timestamp
        .as_ref()
        .map(|t| SystemTime::from(t.0))
        .or_else(|| event.event_time.as_ref().map(|t| SystemTime::from(t.0)))
        .or_else(|| {
            event
                .metadata
                .creation_timestamp
                .as_ref()
                .map(|t| SystemTime::from(t.0))
        });

    let obj = &event.involved_object;
    ClusterEvent {
        namespace: namespace.to_owned(),
        involved_object: format!(
            "{}/{}",
            obj.kind.as_deref().unwrap_or("Unknown"),
            obj.name.as_deref().unwrap_or("")
        ),
        reason: event.reason.clone().unwrap_or_default(),
        message: event.message.clone().unwrap_or_default(),
        event_type: event.type_.clone().unwrap_or_else(|| "Normal".to_owned()),
        timestamp,
    }
}
