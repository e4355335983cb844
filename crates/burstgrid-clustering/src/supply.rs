//! Supply-side clustering: worker pods grouped by shape, with their claim
//! state folded in.
//!
//! A pod is matched to its claims by job name before clustering, so every
//! slot carries enough to answer the one question sizing asks: is this pod
//! spoken for, or is it capacity a new job could still land on?

use std::collections::HashMap;

use burstgrid_core::records::{ClaimRecord, ClaimState, PodRecord, PodStatus};
use burstgrid_core::shape::ResourceShape;

/// One pod plus every claim the scheduler holds on it.
#[derive(Debug, Clone)]
pub struct PodSlot {
    pub pod: PodRecord,
    pub claims: Vec<ClaimRecord>,
}

/// Pod lifecycle tally for one supply cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateCounts {
    /// Pods a new job could still land on: running without a claim, or not
    /// yet running.
    pub unclaimed: u32,
    /// Running pods with at least one claimed slot.
    pub claimed: u32,
    /// Pods the platform reports as errored.
    pub failed: u32,
    /// Pods in a status this daemon does not recognize.
    pub unknown: u32,
}

/// All pods of one resource class.
#[derive(Debug, Clone)]
pub struct SupplyCluster {
    shape: ResourceShape,
    slots: Vec<PodSlot>,
}

impl SupplyCluster {
    pub fn new(shape: ResourceShape) -> Self {
        Self {
            shape,
            slots: Vec::new(),
        }
    }

    pub fn shape(&self) -> &ResourceShape {
        &self.shape
    }

    pub fn push(&mut self, slot: PodSlot) {
        self.slots.push(slot);
    }

    /// Classify every slot.
    ///
    /// Terminal pods (finished, delete pending) are not counted at all:
    /// they are neither capacity nor a problem.
    pub fn count_states(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for slot in &self.slots {
            match &slot.pod.status {
                PodStatus::Running => {
                    let claimed = slot
                        .claims
                        .iter()
                        .any(|claim| claim.state == ClaimState::Claimed);
                    if claimed {
                        counts.claimed += 1;
                    } else {
                        counts.unclaimed += 1;
                    }
                }
                PodStatus::Submitted | PodStatus::Queued | PodStatus::Created => {
                    counts.unclaimed += 1;
                }
                PodStatus::Finished | PodStatus::DeletePending => {}
                PodStatus::Error => counts.failed += 1,
                PodStatus::Other(_) => counts.unknown += 1,
            }
        }
        counts
    }

    /// Pods that can still absorb demand.
    pub fn count_unclaimed(&self) -> u32 {
        self.count_states().unclaimed
    }

    pub fn slots(&self) -> &[PodSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Group pods by shape, attaching each pod's claims by job name.
///
/// Claims whose pod is not in `pods` are dropped; the pod is gone and its
/// lingering slot ads say nothing about capacity.
pub fn cluster_supply(
    pods: Vec<PodRecord>,
    claims: Vec<ClaimRecord>,
) -> HashMap<ResourceShape, SupplyCluster> {
    let mut claims_by_pod: HashMap<String, Vec<ClaimRecord>> = HashMap::new();
    for claim in claims {
        claims_by_pod
            .entry(claim.pod_name.clone())
            .or_default()
            .push(claim);
    }

    let mut clusters: HashMap<ResourceShape, SupplyCluster> = HashMap::new();
    for pod in pods {
        let claims = claims_by_pod.remove(&pod.name).unwrap_or_default();
        let shape = pod.shape.clone();
        clusters
            .entry(shape.clone())
            .or_insert_with(|| SupplyCluster::new(shape))
            .push(PodSlot { pod, claims });
    }
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(cpus: u32) -> ResourceShape {
        ResourceShape {
            cpus,
            memory_mb: 4096 * u64::from(cpus),
            disk_kb: 8_000_000,
            ..ResourceShape::default()
        }
    }

    fn pod(name: &str, status: PodStatus, cpus: u32) -> PodRecord {
        PodRecord {
            id: format!("id-{name}"),
            name: name.to_string(),
            status,
            shape: shape(cpus),
        }
    }

    fn claim(pod_name: &str, state: ClaimState) -> ClaimRecord {
        ClaimRecord {
            pod_name: pod_name.to_string(),
            slot: format!("slot1@{pod_name}"),
            state,
        }
    }

    #[test]
    fn running_pod_with_a_claimed_claim_is_claimed() {
        let clusters = cluster_supply(
            vec![pod("a", PodStatus::Running, 8)],
            vec![
                claim("a", ClaimState::Unclaimed),
                claim("a", ClaimState::Claimed),
            ],
        );
        let counts = clusters[&shape(8)].count_states();
        assert_eq!(counts.claimed, 1);
        assert_eq!(counts.unclaimed, 0);
    }

    #[test]
    fn running_pod_without_claims_is_unclaimed() {
        let clusters = cluster_supply(vec![pod("a", PodStatus::Running, 8)], vec![]);
        assert_eq!(clusters[&shape(8)].count_unclaimed(), 1);
    }

    #[test]
    fn running_pod_with_only_unclaimed_claims_is_unclaimed() {
        let clusters = cluster_supply(
            vec![pod("a", PodStatus::Running, 8)],
            vec![claim("a", ClaimState::Unclaimed)],
        );
        assert_eq!(clusters[&shape(8)].count_unclaimed(), 1);
    }

    #[test]
    fn pending_pods_count_as_unclaimed() {
        let clusters = cluster_supply(
            vec![
                pod("a", PodStatus::Submitted, 8),
                pod("b", PodStatus::Queued, 8),
                pod("c", PodStatus::Created, 8),
            ],
            vec![],
        );
        assert_eq!(clusters[&shape(8)].count_unclaimed(), 3);
    }

    #[test]
    fn terminal_pods_are_ignored() {
        let clusters = cluster_supply(
            vec![
                pod("a", PodStatus::Finished, 8),
                pod("b", PodStatus::DeletePending, 8),
                pod("c", PodStatus::Running, 8),
            ],
            vec![],
        );
        let counts = clusters[&shape(8)].count_states();
        assert_eq!(counts.unclaimed, 1);
        assert_eq!(counts.claimed + counts.failed + counts.unknown, 0);
    }

    #[test]
    fn errored_pod_is_failed_even_with_claims() {
        let clusters = cluster_supply(
            vec![pod("a", PodStatus::Error, 8)],
            vec![claim("a", ClaimState::Claimed)],
        );
        let counts = clusters[&shape(8)].count_states();
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.claimed, 0);
    }

    #[test]
    fn unrecognized_status_is_unknown() {
        let clusters = cluster_supply(
            vec![pod("a", PodStatus::Other("hibernating".to_string()), 8)],
            vec![],
        );
        assert_eq!(clusters[&shape(8)].count_states().unknown, 1);
    }

    #[test]
    fn pods_cluster_by_shape() {
        let clusters = cluster_supply(
            vec![
                pod("a", PodStatus::Running, 8),
                pod("b", PodStatus::Running, 8),
                pod("c", PodStatus::Running, 48),
            ],
            vec![],
        );
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[&shape(8)].len(), 2);
        assert_eq!(clusters[&shape(48)].len(), 1);
    }

    #[test]
    fn claims_for_unknown_pods_are_dropped() {
        let clusters = cluster_supply(
            vec![pod("a", PodStatus::Running, 8)],
            vec![claim("long-gone", ClaimState::Claimed)],
        );
        assert_eq!(clusters[&shape(8)].count_unclaimed(), 1);
    }
}
