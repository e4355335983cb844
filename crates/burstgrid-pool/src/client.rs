//! Lease-platform client.
//!
//! The leasing platform is driven through its CLI (`leasectl` by default):
//! `job show -f csv` lists every job in the account, `job run` launches
//! one pod. We recognize our own pods by the label prefix stamped into the
//! job name at submission.

use std::ffi::OsStr;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::process::Command;
use tracing::debug;

use burstgrid_core::config::PoolConfig;
use burstgrid_core::records::{PodRecord, PodStatus, RawAd};
use burstgrid_core::shape::{POD_PREFIX, ResourceShape};

use crate::error::{PoolError, PoolResult};
use crate::submit;

/// Supply-side interface: what we already lease and how to lease more.
pub trait PodPlatform {
    /// Every pod of ours the platform currently tracks.
    fn list_pods(&self) -> impl Future<Output = PoolResult<Vec<PodRecord>>> + Send;

    /// Launch `count` pods of `shape`. Returns the generated job names;
    /// stops at the first failed launch.
    fn submit(
        &self,
        shape: &ResourceShape,
        count: u32,
    ) -> impl Future<Output = PoolResult<Vec<String>>> + Send;
}

/// [`PodPlatform`] backed by the lease CLI.
///
/// Name generation is per client: the start timestamp is captured at
/// construction and the sequence counter lives in the struct, so two
/// clients in one process never share a sequence.
pub struct LeaseClient {
    config: PoolConfig,
    app_name: String,
    queue_endpoint: String,
    start_time: u64,
    submitted: AtomicU64,
}

impl LeaseClient {
    pub fn new(config: PoolConfig, app_name: &str, queue_endpoint: &str) -> Self {
        Self {
            config,
            app_name: app_name.to_string(),
            queue_endpoint: queue_endpoint.to_string(),
            start_time: epoch_secs(),
            submitted: AtomicU64::new(0),
        }
    }

    async fn run_cli<I, S>(&self, args: I) -> PoolResult<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = Command::new(&self.config.bin)
            .args(args)
            .output()
            .await
            .map_err(|source| PoolError::Spawn {
                bin: self.config.bin.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(PoolError::Exit {
                bin: self.config.bin.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn next_name(&self) -> String {
        let seq = self.submitted.fetch_add(1, Ordering::Relaxed);
        submit::pod_name(&self.app_name, self.start_time, seq)
    }
}

impl PodPlatform for LeaseClient {
    async fn list_pods(&self) -> PoolResult<Vec<PodRecord>> {
        let listing = self.run_cli(["job", "show", "-f", "csv"]).await?;
        let pods = parse_pods(&listing, &self.app_name)?;
        debug!(pods = pods.len(), "pod inventory");
        Ok(pods)
    }

    async fn submit(&self, shape: &ResourceShape, count: u32) -> PoolResult<Vec<String>> {
        let mut names = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = self.next_name();
            let args = submit::launch_args(
                &self.config,
                &self.app_name,
                &name,
                &self.queue_endpoint,
                shape,
            );
            if let Err(source) = self.run_cli(&args).await {
                return Err(PoolError::Launch {
                    name,
                    source: Box::new(source),
                });
            }
            debug!(%name, class = %shape, "pod launched");
            names.push(name);
        }
        Ok(names)
    }
}

/// Parse the `job show -f csv` listing, keeping only pods that belong to
/// `app_name`. Column order comes from the header; malformed rows and rows
/// without our label prefix are skipped.
fn parse_pods(listing: &str, app_name: &str) -> PoolResult<Vec<PodRecord>> {
    let mut lines = listing.lines().filter(|line| !line.trim().is_empty());
    let Some(header) = lines.next() else {
        return Ok(Vec::new());
    };

    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let column = |wanted: &str| -> PoolResult<usize> {
        columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PoolError::Parse {
                detail: format!("listing header {header:?} has no {wanted} column"),
            })
    };
    let id_col = column("id")?;
    let name_col = column("name")?;
    let status_col = column("status")?;

    let own_prefix = format!(
        "{}:{} {}:",
        submit::APP_LABEL,
        app_name,
        submit::JOB_LABEL
    );

    let mut pods = Vec::new();
    for line in lines {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != columns.len() {
            debug!(line, "malformed listing row, skipped");
            continue;
        }
        let label_field = fields[name_col].trim();
        if !label_field.starts_with(&own_prefix) {
            continue;
        }

        let labels = RawAd::from_label_pairs(label_field);
        let name = labels.get_str(submit::JOB_LABEL);
        if name.is_empty() {
            debug!(line, "pod row without a job name, skipped");
            continue;
        }

        pods.push(PodRecord {
            id: fields[id_col].trim().to_string(),
            name,
            status: PodStatus::parse(fields[status_col]),
            shape: ResourceShape::from_ad(POD_PREFIX, &labels),
        });
    }
    Ok(pods)
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
