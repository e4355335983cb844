//! Demand folding: match measured demand to the provisionable catalog.
//!
//! The catalog rarely offers the exact shape a job asked for. Folding
//! assigns every demand cluster to the cheapest catalog entry at least as
//! costly as it, merging all clusters an entry serves into one:
//!
//! ```text
//!   demand  (by cost):  [4cpu x10] [8cpu x5] [32cpu x2] [1gpu x3]
//!   catalog (by cost):      [12cpu]     [48cpu]    [8gpu]
//!                              │           │          │
//!   folded:               [15 jobs]    [2 jobs]   [3 jobs]
//! ```
//!
//! Each demand cluster is consumed exactly once: demand is partitioned
//! across the catalog, never replicated. Demand costlier than every entry
//! cannot be served and is dropped with a log.

use std::collections::HashMap;

use tracing::debug;

use burstgrid_core::shape::ResourceShape;

use crate::demand::DemandCluster;

/// Fold `demand` into `catalog` classes.
///
/// Returns `(catalog shape, merged demand)` pairs in ascending cost order,
/// omitting entries that attracted no demand. Both sides are sorted by
/// `(cost, rendered key)` first, so equal-cost ties resolve the same way
/// on every run regardless of map iteration order.
pub fn fold_demand(
    catalog: &[ResourceShape],
    demand: HashMap<ResourceShape, DemandCluster>,
) -> Vec<(ResourceShape, DemandCluster)> {
    let mut entries: Vec<ResourceShape> = catalog.to_vec();
    entries.sort_by_cached_key(|shape| (shape.cost(), shape.to_string()));

    let mut remaining: Vec<DemandCluster> = demand.into_values().collect();
    remaining.sort_by_cached_key(|cluster| (cluster.shape().cost(), cluster.shape().to_string()));

    let mut folded = Vec::new();
    for entry in entries {
        let limit = entry.cost();
        let cut = remaining.partition_point(|cluster| cluster.shape().cost() <= limit);
        if cut == 0 {
            continue;
        }
        let mut served = remaining.drain(..cut);
        let Some(mut merged) = served.next() else {
            continue;
        };
        for cluster in served {
            merged.absorb(cluster);
        }
        folded.push((entry, merged));
    }

    if !remaining.is_empty() {
        let jobs: u32 = remaining.iter().map(DemandCluster::count_idle).sum();
        debug!(
            clusters = remaining.len(),
            jobs, "demand costlier than every catalog entry, dropped"
        );
    }

    folded
}
