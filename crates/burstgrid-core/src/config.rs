//! burstgrid.toml configuration parser.
//!
//! One file, read once at startup. Every knob has a default except the
//! things that cannot be guessed: the queue endpoint, who to trust, the
//! worker image, and the catalog of provisionable shapes. Unknown keys are
//! rejected so a typo fails the daemon at startup instead of silently
//! running with a default.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::shape::ResourceShape;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BurstConfig {
    #[serde(default)]
    pub daemon: DaemonConfig,
    pub queue: QueueConfig,
    pub pool: PoolConfig,
    /// Provisionable resource shapes, in operator order.
    #[serde(default)]
    pub catalog: Vec<ResourceShape>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    /// Name this provisioner instance signs its pods and claims with.
    pub app_name: String,
    /// Seconds between provisioning iterations.
    pub poll_interval_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            app_name: "burst-wn".to_string(),
            poll_interval_secs: 120,
        }
    }
}

impl DaemonConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Scheduler-side settings: which portal binary to drive and which queue
/// endpoints may feed us demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    #[serde(default = "default_queue_bin")]
    pub bin: String,
    /// Scheduler endpoint address handed to workers so they can register.
    pub endpoint: String,
    /// Identity pattern a worker-claim ad must fullmatch to be counted.
    #[serde(default = "default_claim_identity")]
    pub claim_identity: String,
    /// Extra constraint expression ANDed into every idle-job query.
    #[serde(default)]
    pub extra_constraint: String,
    /// Endpoint trust rules; an endpoint is queried when any rule matches.
    #[serde(default)]
    pub trusted: Vec<TrustRuleConfig>,
}

/// One endpoint trust rule. Both patterns must fullmatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrustRuleConfig {
    pub name: String,
    pub identity: String,
}

/// Lease-platform settings: the CLI to drive and how to dress up the pods
/// it launches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    #[serde(default = "default_pool_bin")]
    pub bin: String,
    /// Worker container image.
    pub image: String,
    #[serde(default = "default_startup_script")]
    pub startup_script: String,
    /// Hard ceiling on the pod target of any one class.
    #[serde(default = "default_max_pods")]
    pub max_pods_per_class: u32,
    /// Ceiling on pods launched for one class in one iteration.
    #[serde(default = "default_max_submit")]
    pub max_submit_per_class: u32,
    /// Lifetime handed to workers; they exit on their own past this.
    #[serde(default = "default_job_ttl")]
    pub job_ttl_secs: u64,
    /// Idle workers shut down after this long without a claim.
    #[serde(default = "default_noclaim_shutdown")]
    pub noclaim_shutdown_secs: u64,
    /// Registration token file mounted into every worker.
    #[serde(default = "default_token_file")]
    pub token_file: String,
    /// GPU model requested when a catalog shape does not name one.
    #[serde(default = "default_gpu_type")]
    pub default_gpu_type: String,
    /// Extra requirements expression exported to workers.
    #[serde(default)]
    pub additional_requirements: String,
    #[serde(default)]
    pub priority_class: Option<String>,
    #[serde(default)]
    pub priority_class_cpu: Option<String>,
    #[serde(default)]
    pub priority_class_gpu: Option<String>,
    /// Extra environment injected into every worker.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Extra labels stamped on every pod.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Extra volumes: mount name to input file.
    #[serde(default)]
    pub volumes: BTreeMap<String, String>,
}

fn default_queue_bin() -> String {
    "qgrid".to_string()
}

fn default_claim_identity() -> String {
    ".*".to_string()
}

fn default_pool_bin() -> String {
    "leasectl".to_string()
}

fn default_startup_script() -> String {
    "/usr/local/sbin/worker_startup.sh".to_string()
}

fn default_max_pods() -> u32 {
    20
}

fn default_max_submit() -> u32 {
    400
}

fn default_job_ttl() -> u64 {
    24 * 3600
}

fn default_noclaim_shutdown() -> u64 {
    1200
}

fn default_token_file() -> String {
    "burst-wn.token".to_string()
}

fn default_gpu_type() -> String {
    "k80".to_string()
}

impl BurstConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: BurstConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Startup sanity checks; a config failing these can never provision
    /// anything, so the daemon refuses to start on it.
    pub fn validate(&self) -> Result<()> {
        if self.catalog.is_empty() {
            bail!("no [[catalog]] entries: nothing can be provisioned");
        }
        if self.queue.trusted.is_empty() {
            bail!("no [[queue.trusted]] rules: no endpoint may be queried");
        }
        if self.daemon.poll_interval_secs == 0 {
            bail!("daemon.poll_interval_secs must be positive");
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a starter config: one trusted endpoint, one CPU class and
    /// one GPU class. Valid as written once the patterns and image are
    /// adjusted.
    pub fn scaffold() -> Self {
        BurstConfig {
            daemon: DaemonConfig::default(),
            queue: QueueConfig {
                bin: default_queue_bin(),
                endpoint: "cm.grid.example.org".to_string(),
                claim_identity: default_claim_identity(),
                extra_constraint: String::new(),
                trusted: vec![TrustRuleConfig {
                    name: "submit[.]grid[.]example[.]org".to_string(),
                    identity: "submituser@grid[.]example[.]org".to_string(),
                }],
            },
            pool: PoolConfig {
                bin: default_pool_bin(),
                image: "registry.example.org/burst/worker:latest".to_string(),
                startup_script: default_startup_script(),
                max_pods_per_class: default_max_pods(),
                max_submit_per_class: default_max_submit(),
                job_ttl_secs: default_job_ttl(),
                noclaim_shutdown_secs: default_noclaim_shutdown(),
                token_file: default_token_file(),
                default_gpu_type: default_gpu_type(),
                additional_requirements: String::new(),
                priority_class: None,
                priority_class_cpu: None,
                priority_class_gpu: None,
                env: BTreeMap::new(),
                labels: BTreeMap::new(),
                volumes: BTreeMap::new(),
            },
            catalog: vec![
                ResourceShape {
                    cpus: 16,
                    memory_mb: 32768,
                    disk_kb: 8_000_000,
                    ..ResourceShape::default()
                },
                ResourceShape {
                    cpus: 12,
                    memory_mb: 49152,
                    disk_kb: 8_000_000,
                    gpus: 1,
                    ..ResourceShape::default()
                },
            ],
        }
    }
}
