//! Resource shape keys.
//!
//! Every job request and every worker pod is reduced to a seven-field
//! [`ResourceShape`]. Jobs and pods with equal shapes belong to the same
//! resource class; the whole decision engine keys on this struct. The
//! demand side reads attributes under the `Request` prefix, the supply
//! side under the `Pod` prefix, and both expand into the same schema, so
//! a job and the pod launched to serve it always land on the same key.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::records::RawAd;

/// Attribute-name prefix used by demand-side (job) ads.
pub const REQUEST_PREFIX: &str = "Request";
/// Attribute-name prefix used by supply-side (pod) labels.
pub const POD_PREFIX: &str = "Pod";

/// One resource class: the seven attributes jobs and pods cluster on.
///
/// Field order is fixed; [`fmt::Display`] renders the fields `;`-joined in
/// this order, which is also the wire form used in pod labels and logs.
/// Missing or malformed external input converts to `0` / `""`, never to an
/// error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceShape {
    pub cpus: u32,
    pub memory_mb: u64,
    pub disk_kb: u64,
    pub disk_volumes: String,
    pub gpus: u32,
    pub gpu_type: String,
    pub labels: String,
}

impl ResourceShape {
    /// Read a shape out of an ad, looking up each field under `prefix`
    /// (`RequestCPUs`, `PodCPUs`, ...). Absent fields default per type.
    pub fn from_ad(prefix: &str, ad: &RawAd) -> Self {
        Self {
            cpus: ad.get_u32(&format!("{prefix}CPUs")),
            memory_mb: ad.get_u64(&format!("{prefix}Memory")),
            disk_kb: ad.get_u64(&format!("{prefix}Disk")),
            disk_volumes: ad.get_str(&format!("{prefix}DiskVolumes")),
            gpus: ad.get_u32(&format!("{prefix}GPUs")),
            gpu_type: ad.get_str(&format!("{prefix}GPUTypes")),
            labels: ad.get_str(&format!("{prefix}Labels")),
        }
    }

    /// Render all seven fields as `(attribute, value)` pairs under `prefix`,
    /// the inverse of [`ResourceShape::from_ad`]. Pods launched with these
    /// labels report back the exact shape they were sized for.
    pub fn to_ad_pairs(&self, prefix: &str) -> Vec<(String, String)> {
        vec![
            (format!("{prefix}CPUs"), self.cpus.to_string()),
            (format!("{prefix}Memory"), self.memory_mb.to_string()),
            (format!("{prefix}Disk"), self.disk_kb.to_string()),
            (format!("{prefix}DiskVolumes"), self.disk_volumes.clone()),
            (format!("{prefix}GPUs"), self.gpus.to_string()),
            (format!("{prefix}GPUTypes"), self.gpu_type.clone()),
            (format!("{prefix}Labels"), self.labels.clone()),
        ]
    }

    /// Scalar order of this shape for demand folding.
    ///
    /// GPUs dominate: one GPU outweighs any CPU count below 1000, so GPU
    /// demand can never be folded into a CPU-only class and CPU demand is
    /// never served by a GPU class while a cheaper CPU class exists.
    pub fn cost(&self) -> u64 {
        u64::from(self.gpus) * 1000 + u64::from(self.cpus)
    }

    /// `true` when this shape requests at least one GPU.
    pub fn is_gpu(&self) -> bool {
        self.gpus > 0
    }
}

impl fmt::Display for ResourceShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};{};{};{};{};{}",
            self.cpus,
            self.memory_mb,
            self.disk_kb,
            self.disk_volumes,
            self.gpus,
            self.gpu_type,
            self.labels
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu_shape(cpus: u32) -> ResourceShape {
        ResourceShape {
            cpus,
            memory_mb: 4096 * u64::from(cpus),
            disk_kb: 8_000_000,
            ..ResourceShape::default()
        }
    }

    #[test]
    fn same_fields_same_key() {
        let a = cpu_shape(16);
        let b = cpu_shape(16);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn any_field_difference_changes_key() {
        let base = cpu_shape(16);
        let mut other = base.clone();
        other.labels = "preemptible".to_string();
        assert_ne!(base, other);
        assert_ne!(base.to_string(), other.to_string());
    }

    #[test]
    fn ad_field_order_does_not_matter() {
        let forward = RawAd::from_pairs([
            ("RequestCPUs", "8"),
            ("RequestMemory", "32768"),
            ("RequestGPUs", "1"),
        ]);
        let backward = RawAd::from_pairs([
            ("RequestGPUs", "1"),
            ("RequestMemory", "32768"),
            ("RequestCPUs", "8"),
        ]);
        assert_eq!(
            ResourceShape::from_ad(REQUEST_PREFIX, &forward),
            ResourceShape::from_ad(REQUEST_PREFIX, &backward)
        );
    }

    #[test]
    fn missing_and_malformed_fields_default() {
        let ad = RawAd::from_pairs([("RequestCPUs", "twelve"), ("RequestMemory", "4096")]);
        let shape = ResourceShape::from_ad(REQUEST_PREFIX, &ad);
        assert_eq!(shape.cpus, 0);
        assert_eq!(shape.memory_mb, 4096);
        assert_eq!(shape.disk_kb, 0);
        assert_eq!(shape.gpu_type, "");
    }

    #[test]
    fn ad_pairs_round_trip() {
        let shape = ResourceShape {
            cpus: 48,
            memory_mb: 196_608,
            disk_kb: 8_000_000,
            disk_volumes: "scratch".to_string(),
            gpus: 4,
            gpu_type: "a100".to_string(),
            labels: "pool-a".to_string(),
        };
        let ad = RawAd::from_pairs(shape.to_ad_pairs(POD_PREFIX));
        assert_eq!(ResourceShape::from_ad(POD_PREFIX, &ad), shape);
    }

    #[test]
    fn display_joins_fields_in_order() {
        let shape = ResourceShape {
            cpus: 16,
            memory_mb: 65536,
            disk_kb: 8_000_000,
            gpus: 2,
            ..ResourceShape::default()
        };
        assert_eq!(shape.to_string(), "16;65536;8000000;;2;;");
    }

    #[test]
    fn gpu_always_outcosts_cpu_only() {
        let big_cpu = cpu_shape(999);
        let small_gpu = ResourceShape {
            cpus: 0,
            gpus: 1,
            ..ResourceShape::default()
        };
        assert!(small_gpu.cost() > big_cpu.cost());
    }

    #[test]
    fn cost_orders_within_a_band() {
        assert!(cpu_shape(12).cost() < cpu_shape(48).cost());
        let one_gpu = ResourceShape {
            cpus: 12,
            gpus: 1,
            ..ResourceShape::default()
        };
        let two_gpu = ResourceShape {
            cpus: 12,
            gpus: 2,
            ..ResourceShape::default()
        };
        assert!(one_gpu.cost() < two_gpu.cost());
    }
}
