//! Teardown sequencer.
//!
//! Runs after every scenario, whatever its outcome:
//!
//! 1. `VANILLA` only: delete the standard, then the encrypted storage class.
//!    An already-absent class is fine; any other failure is recorded and the
//!    next step still runs.
//! 2. On a failed run: dump the most recent events of the service namespace.
//! 3. Close the storage backend session and drop every client.

use devops_e2e_core::client::{ClusterClient, Connector, StorageBackend};
use devops_e2e_core::error::HarnessError;
use devops_e2e_core::metrics as m;
use devops_e2e_core::types::{ClusterTarget, most_recent_events};
use tracing::{debug, error, info, warn};

use crate::context::TestContext;
use crate::scope::PhaseScope;

/// What teardown did.
#[derive(Debug, Default)]
pub struct TeardownReport {
    /// Storage classes removed (or found already absent).
    pub deleted: Vec<String>,
    /// Number of diagnostic events logged.
    pub events_dumped: usize,
    pub failures: Vec<HarnessError>,
}

impl TeardownReport {
    fn fail(&mut self, err: HarnessError) {
        error!(error = %err, "teardown step failed");
        metrics::counter!(m::HARNESS_TEARDOWN_FAILURES_TOTAL).increment(1);
        self.failures.push(err);
    }
}

/// Runs the teardown steps. Never stops early.
pub async fn teardown<C: Connector>(
    connector: &C,
    ctx: &mut TestContext<C>,
    scope: &PhaseScope,
    run_failed: bool,
) -> TeardownReport {
    let mut report = TeardownReport::default();

    if ctx.config.cluster.flavor.owns_storage_classes() {
        delete_storage_classes(ctx, scope, &mut report).await;
    } else {
        info!(
            flavor = %ctx.config.cluster.flavor,
            "storage classes are platform-managed; leaving them in place"
        );
    }

    let service = ctx.config.service_target();
    debug!(service = ?service.as_ref().map(ToString::to_string), "service cluster resolved");
    if run_failed {
        match service {
            Some(target) => {
                let limit = ctx.config.timeouts.event_dump_limit;
                dump_service_events(connector, &target, limit, scope, &mut report).await;
            }
            None => info!(
                flavor = %ctx.config.cluster.flavor,
                "no service namespace for this flavor; skipping event dump"
            ),
        }
    }

    if let Some(backend) = ctx.backend.take() {
        let closed = scope
            .step("close-backend", async {
                backend
                    .close()
                    .await
                    .map_err(|e| HarnessError::teardown("storage backend session", e))
            })
            .await;
        if let Err(e) = closed {
            report.fail(e);
        }
    }

    ctx.vm_operator = None;
    ctx.crypto = None;
    ctx.cluster = None;

    report
}

async fn delete_storage_classes<C: Connector>(
    ctx: &TestContext<C>,
    scope: &PhaseScope,
    report: &mut TeardownReport,
) {
    let Some(cluster) = ctx.cluster.as_ref() else {
        debug!("no cluster client; nothing to delete");
        return;
    };

    for class in ctx.fixtures.in_creation_order() {
        let name = class.name.as_str();
        let deleted = scope
            .step("delete-storage-class", async {
                match cluster.delete_storage_class(name).await {
                    Ok(()) => {
                        info!(storage_class = %name, "storage class deleted");
                        Ok(())
                    }
                    Err(e) if e.is_not_found() => {
                        info!(storage_class = %name, "storage class already absent");
                        Ok(())
                    }
                    Err(e) => Err(HarnessError::teardown(
                        &format!("storage class '{name}'"),
                        e,
                    )),
                }
            })
            .await;
        match deleted {
            Ok(()) => report.deleted.push(name.to_owned()),
            Err(e) => report.fail(e),
        }
    }
}

async fn dump_service_events<C: Connector>(
    connector: &C,
    target: &ClusterTarget,
    limit: usize,
    scope: &PhaseScope,
    report: &mut TeardownReport,
) {
    let resource = format!("events of namespace '{}'", target.namespace);
    let events = scope
        .step("dump-service-events", async {
            let client = connector
                .connect_cluster(target)
                .await
                .map_err(|e| HarnessError::teardown(&resource, e))?;
            client
                .recent_events(client.namespace(), limit)
                .await
                .map_err(|e| HarnessError::teardown(&resource, e))
        })
        .await;

    let events = match events {
        Ok(events) => most_recent_events(events, limit),
        Err(e) => {
            report.fail(e);
            return;
        }
    };

    warn!(
        namespace = %target.namespace,
        count = events.len(),
        "dumping service namespace events after failure"
    );
    for event in &events {
        warn!(
            namespace = %event.namespace,
            object = %event.involved_object,
            reason = %event.reason,
            event_type = %event.event_type,
            message = %event.message,
            "service event"
        );
    }
    metrics::counter!(m::HARNESS_EVENTS_DUMPED_TOTAL).increment(events.len() as u64);
    report.events_dumped = events.len();
}
