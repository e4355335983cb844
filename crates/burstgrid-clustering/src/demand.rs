//! Demand-side clustering: idle jobs grouped by request shape.

use std::collections::HashMap;

use burstgrid_core::records::{JOB_STATUS_IDLE, JobRecord};
use burstgrid_core::shape::ResourceShape;

/// All idle jobs of one resource class.
#[derive(Debug, Clone)]
pub struct DemandCluster {
    shape: ResourceShape,
    jobs: Vec<JobRecord>,
}

impl DemandCluster {
    pub fn new(shape: ResourceShape) -> Self {
        Self {
            shape,
            jobs: Vec::new(),
        }
    }

    /// Shape of the first job clustered here. After folding this is the
    /// cheapest constituent's shape; the catalog shape the cluster was
    /// folded into travels separately.
    pub fn shape(&self) -> &ResourceShape {
        &self.shape
    }

    pub fn push(&mut self, job: JobRecord) {
        self.jobs.push(job);
    }

    /// Take over another cluster's jobs. Shapes may differ; folding merges
    /// across classes on purpose.
    pub fn absorb(&mut self, other: DemandCluster) {
        self.jobs.extend(other.jobs);
    }

    /// Jobs still waiting for capacity.
    pub fn count_idle(&self) -> u32 {
        self.jobs
            .iter()
            .filter(|job| job.status == JOB_STATUS_IDLE)
            .count() as u32
    }

    pub fn jobs(&self) -> &[JobRecord] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Group jobs by their request shape.
pub fn cluster_demand(jobs: Vec<JobRecord>) -> HashMap<ResourceShape, DemandCluster> {
    let mut clusters: HashMap<ResourceShape, DemandCluster> = HashMap::new();
    for job in jobs {
        let shape = job.request.clone();
        clusters
            .entry(shape.clone())
            .or_insert_with(|| DemandCluster::new(shape))
            .push(job);
    }
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use burstgrid_core::records::RawAd;

    fn idle_job(cpus: u32, memory_mb: u64) -> JobRecord {
        JobRecord {
            endpoint: "submit.grid.example.org".to_string(),
            cluster_id: 100,
            proc_id: 0,
            status: JOB_STATUS_IDLE,
            request: ResourceShape {
                cpus,
                memory_mb,
                ..ResourceShape::default()
            },
        }
    }

    #[test]
    fn jobs_with_equal_requests_share_a_cluster() {
        let jobs = vec![idle_job(8, 16384), idle_job(8, 16384), idle_job(8, 32768)];
        let clusters = cluster_demand(jobs);
        assert_eq!(clusters.len(), 2);
        let key = ResourceShape {
            cpus: 8,
            memory_mb: 16384,
            ..ResourceShape::default()
        };
        assert_eq!(clusters[&key].len(), 2);
    }

    #[test]
    fn count_idle_skips_non_idle_statuses() {
        let mut held = idle_job(4, 8192);
        held.status = 5;
        let mut cluster = DemandCluster::new(held.request.clone());
        cluster.push(idle_job(4, 8192));
        cluster.push(held);
        assert_eq!(cluster.len(), 2);
        assert_eq!(cluster.count_idle(), 1);
    }

    #[test]
    fn absorb_moves_jobs_across_shapes() {
        let mut small = DemandCluster::new(idle_job(4, 8192).request.clone());
        small.push(idle_job(4, 8192));
        let mut other = DemandCluster::new(idle_job(8, 16384).request.clone());
        other.push(idle_job(8, 16384));
        other.push(idle_job(8, 16384));

        small.absorb(other);
        assert_eq!(small.count_idle(), 3);
        assert_eq!(small.shape().cpus, 4);
    }

    #[test]
    fn clustering_matches_ad_derived_shapes() {
        let ad = RawAd::from_pairs([
            ("ClusterId", "7"),
            ("JobStatus", "1"),
            ("RequestCPUs", "8"),
            ("RequestMemory", "16384"),
        ]);
        let from_ad = JobRecord::from_ad("submit.grid.example.org", &ad);
        let clusters = cluster_demand(vec![from_ad, idle_job(8, 16384)]);
        assert_eq!(clusters.len(), 1);
    }
}
