//! The provisioning iteration and its outer loop.
//!
//! ```text
//!   queue.idle_jobs ──► cluster_demand ─┐
//!   queue.worker_claims ─┐              ├─ fold_demand(catalog)
//!   platform.list_pods ──┴► cluster_supply
//!                                       │
//!                         per class: evaluate(idle, unclaimed)
//!                                       │
//!                         platform.submit(class, n)   (failures stay
//!                                                      in their class)
//! ```
//!
//! A query failure aborts the iteration before any submission; a submit
//! failure is logged and the remaining classes still run. The loop holds
//! no state between iterations, every pass measures the world from
//! scratch.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info};

use burstgrid_clustering::{
    DemandCluster, SupplyCluster, cluster_demand, cluster_supply, fold_demand,
};
use burstgrid_core::shape::ResourceShape;
use burstgrid_pool::PodPlatform;
use burstgrid_queue::QueueSource;

use crate::error::IterationError;
use crate::policy::{ScaleDecision, SizingPolicy};

pub struct Provisioner<Q, P> {
    queue: Q,
    platform: P,
    catalog: Vec<ResourceShape>,
    policy: SizingPolicy,
}

impl<Q: QueueSource, P: PodPlatform> Provisioner<Q, P> {
    pub fn new(queue: Q, platform: P, catalog: Vec<ResourceShape>, policy: SizingPolicy) -> Self {
        Self {
            queue,
            platform,
            catalog,
            policy,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Measure the world: demand clusters and supply clusters.
    async fn query_system(
        &self,
    ) -> Result<
        (
            HashMap<ResourceShape, DemandCluster>,
            HashMap<ResourceShape, SupplyCluster>,
        ),
        IterationError,
    > {
        let jobs = self.queue.idle_jobs().await?;
        let claims = self.queue.worker_claims().await?;
        let pods = self.platform.list_pods().await?;
        debug!(
            jobs = jobs.len(),
            claims = claims.len(),
            pods = pods.len(),
            "system measured"
        );
        Ok((cluster_demand(jobs), cluster_supply(pods, claims)))
    }

    /// One measure, decide, act pass. Returns the per-class decisions in
    /// catalog cost order.
    pub async fn one_iteration(
        &self,
    ) -> Result<Vec<(ResourceShape, ScaleDecision)>, IterationError> {
        let (demand, supply) = self.query_system().await?;
        let folded = fold_demand(&self.catalog, demand);

        let mut outcomes = Vec::with_capacity(folded.len());
        for (class, cluster) in folded {
            let idle = cluster.count_idle();
            let unclaimed = supply
                .get(&class)
                .map_or(0, SupplyCluster::count_unclaimed);
            let decision = self.policy.evaluate(idle, unclaimed);

            match decision {
                ScaleDecision::Submit(count) => {
                    info!(class = %class, idle, unclaimed, count, "provisioning");
                    match self.platform.submit(&class, count).await {
                        Ok(names) => {
                            info!(class = %class, launched = names.len(), "pods submitted");
                        }
                        Err(err) => {
                            error!(class = %class, count, %err, "submit failed");
                        }
                    }
                }
                ScaleDecision::NoChange => {
                    debug!(class = %class, idle, unclaimed, "no change");
                }
            }
            outcomes.push((class, decision));
        }
        Ok(outcomes)
    }

    /// Run iterations forever, `interval` apart, until `shutdown` flips.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = interval.as_secs(),
            classes = self.catalog.len(),
            "provision loop started"
        );

        loop {
            if let Err(err) = self.one_iteration().await {
                error!(error = %err, "iteration aborted");
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => {
                    info!("provision loop shutting down");
                    break;
                }
            }
        }
    }
}
