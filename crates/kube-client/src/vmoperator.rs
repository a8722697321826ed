//! VM-orchestration client.
//!
//! Lists `VirtualMachineImage` objects for every registered schema version.
//! `v1alpha1` images are cluster-scoped and carry their display name in
//! `status.imageName`; later versions are namespaced and use `status.name`.

use devops_e2e_core::client::VmOperatorClient;
use devops_e2e_core::error::ClusterError;
use devops_e2e_core::types::{ApiSchema, SchemaSet, VmImageInfo};
use kube::Client;
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind, ListParams};
use tracing::debug;

use crate::error::map_list_error;

/// VM-orchestration client with an explicit schema set.
pub struct KubeVmOperatorClient {
    client: Client,
    schemas: SchemaSet,
}

impl KubeVmOperatorClient {
    pub fn new(client: Client, schemas: SchemaSet) -> Self {
        Self { client, schemas }
    }

    fn images_api(&self, schema: &ApiSchema, namespace: &str) -> Api<DynamicObject> {
        let ar = ApiResource::from_gvk(&GroupVersionKind::gvk(
            &schema.group,
            &schema.version,
            &schema.kind,
        ));
        if is_cluster_scoped(schema) {
            Api::all_with(self.client.clone(), &ar)
        } else {
            Api::namespaced_with(self.client.clone(), namespace, &ar)
        }
    }
}

impl VmOperatorClient for KubeVmOperatorClient {
    fn schemas(&self) -> &SchemaSet {
        &self.schemas
    }

    async fn list_images(&self, namespace: &str) -> Result<Vec<VmImageInfo>, ClusterError> {
        let mut images = Vec::new();

        for schema in self.schemas.iter() {
            let api = self.images_api(schema, namespace);
            let api_version = schema.api_version();
            match api.list(&ListParams::default()).await {
                Ok(list) => {
                    images.extend(
                        list.items
                            .iter()
                            .filter_map(|obj| image_from_object(obj, &api_version)),
                    );
                }
                // version not served by this cluster
                Err(kube::Error::Api(ae)) if ae.code == 404 => {
                    debug!(api_version = %api_version, "image api version not served, skipping");
                }
                Err(e) => return Err(map_list_error(e, "virtual machine images")),
            }
        }

        Ok(images)
    }
}

fn is_cluster_scoped(schema: &ApiSchema) -> bool {
    schema.version == "v1alpha1"
}

/// Extracts image identity from a `VirtualMachineImage` object.
///
/// Returns `None` when the object has no name or no display name yet.
pub fn image_from_object(obj: &DynamicObject, api_version: &str) -> Option<VmImageInfo> {
    let name = obj.metadata.name.clone().filter(|n| !n.is_empty())?;
    let status = obj.data.get("status")?;
    let display_name = status
        .get("name")
        .or_else(|| status.get("imageName"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())?;

    Some(VmImageInfo {
        name,
        display_name: display_name.to_owned(),
        api_version: api_version.to_owned(),
    })
}
