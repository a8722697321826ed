//! Client bootstrap.
//!
//! Connects, in order, the admin cluster client, the storage backend, the
//! encryption client and the VM orchestration client. The first failure
//! aborts the sequence; nothing is retried. A cluster without a single ready,
//! schedulable node fails bootstrap.

use devops_e2e_core::client::{ClusterClient, Connector, VmOperatorClient};
use devops_e2e_core::error::HarnessError;
use devops_e2e_core::types::SchemaSet;
use tracing::info;

use crate::context::TestContext;
use crate::scope::PhaseScope;

/// Runs every bootstrap step, storing each client in `ctx` as it is connected.
pub async fn bootstrap<C: Connector>(
    connector: &C,
    ctx: &mut TestContext<C>,
    scope: &PhaseScope,
) -> Result<(), HarnessError> {
    let target = ctx.config.admin_target();
    let cluster = scope
        .step("connect-cluster", async {
            connector
                .connect_cluster(&target)
                .await
                .map_err(|e| HarnessError::bootstrap("cluster-client", e))
        })
        .await?;
    info!(cluster = %target, "admin identity connected");
    ctx.cluster = Some(cluster);

    check_nodes(ctx, scope).await?;

    let vcenter = ctx.config.vcenter.clone();
    let backend = scope
        .step("connect-backend", async {
            connector
                .connect_backend(&vcenter)
                .await
                .map_err(|e| HarnessError::bootstrap("storage-backend", e))
        })
        .await?;
    ctx.backend = Some(backend);

    let crypto = scope
        .step("connect-crypto", async {
            connector
                .connect_crypto(ctx.cluster()?, ctx.backend()?)
                .await
                .map_err(|e| HarnessError::bootstrap("encryption-client", e))
        })
        .await?;
    ctx.crypto = Some(crypto);

    let required = SchemaSet::vm_operator();
    info!(schemas = required.len(), "registering vm operator schemas");
    let vm_operator = scope
        .step("connect-vm-operator", async {
            connector
                .connect_vm_operator(ctx.cluster()?, required.clone())
                .await
                .map_err(|e| HarnessError::bootstrap("vm-operator-client", e))
        })
        .await?;
    let registered = vm_operator.schemas();
    if let Some(missing) = required
        .iter()
        .find(|s| !registered.contains(&s.group, &s.version))
    {
        return Err(HarnessError::bootstrap(
            "vm-operator-client",
            format!("schema {} was not registered", missing.api_version()),
        ));
    }
    ctx.vm_operator = Some(vm_operator);

    info!("all clients bootstrapped");
    Ok(())
}

async fn check_nodes<C: Connector>(
    ctx: &TestContext<C>,
    scope: &PhaseScope,
) -> Result<(), HarnessError> {
    let cluster = ctx.cluster()?;
    let nodes = scope
        .step("check-nodes", async {
            cluster
                .list_ready_schedulable_nodes()
                .await
                .map_err(|e| HarnessError::bootstrap("node-readiness", e))
        })
        .await?;

    let usable = nodes.iter().filter(|n| n.is_usable()).count();
    if usable == 0 {
        return Err(HarnessError::bootstrap(
            "node-readiness",
            "no ready, schedulable compute node in the cluster",
        ));
    }
    info!(nodes = usable, "ready schedulable nodes found");
    Ok(())
}
