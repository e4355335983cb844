//! Scheduler-side queries.
//!
//! Demand is measured through the grid portal CLI (`qgrid` by default),
//! which fronts the batch scheduler and prints classads as JSON. Three
//! queries feed one iteration: the endpoint roster, the idle jobs on every
//! trusted endpoint, and the claim state of the worker slots we already
//! registered.

use std::future::Future;

use tokio::process::Command;
use tracing::{debug, warn};

use burstgrid_core::config::QueueConfig;
use burstgrid_core::records::{CLAIM_POD_NAME_ATTR, ClaimRecord, ClaimState, JobRecord, RawAd};
use regex::Regex;

use crate::error::{QueueError, QueueResult};
use crate::trust::{TrustRules, anchored};

/// Demand-side view of the system: idle jobs waiting for capacity, and the
/// claim state of the workers we already run.
pub trait QueueSource {
    /// Idle jobs on every trusted endpoint.
    fn idle_jobs(&self) -> impl Future<Output = QueueResult<Vec<JobRecord>>> + Send;

    /// Worker-slot claim ads tagged with our app name.
    fn worker_claims(&self) -> impl Future<Output = QueueResult<Vec<ClaimRecord>>> + Send;
}

/// Requests below these values are scheduler placeholders filled in when
/// the submitter left the field out; treat them as unset.
pub const MIN_REQUEST_MEMORY_MB: u64 = 4096;
pub const MIN_REQUEST_DISK_KB: u64 = 8_000_000;

/// [`QueueSource`] backed by the portal CLI.
pub struct PortalQueue {
    bin: String,
    app_name: String,
    extra_constraint: String,
    trust: TrustRules,
    claim_identity: Regex,
}

impl PortalQueue {
    pub fn new(config: &QueueConfig, app_name: &str) -> QueueResult<Self> {
        Ok(Self {
            bin: config.bin.clone(),
            app_name: app_name.to_string(),
            extra_constraint: config.extra_constraint.clone(),
            trust: TrustRules::compile(&config.trusted)?,
            claim_identity: anchored(&config.claim_identity)?,
        })
    }

    /// Run the portal CLI and parse its stdout as a JSON array of ads.
    /// Non-object elements are dropped with a log.
    async fn query_ads(&self, args: &[&str]) -> QueueResult<Vec<RawAd>> {
        let output = Command::new(&self.bin)
            .args(args)
            .output()
            .await
            .map_err(|source| QueueError::Spawn {
                bin: self.bin.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(QueueError::Exit {
                bin: self.bin.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let items: Vec<serde_json::Value> =
            serde_json::from_slice(&output.stdout).map_err(|source| QueueError::Parse {
                bin: self.bin.clone(),
                source,
            })?;

        let mut ads = Vec::with_capacity(items.len());
        for item in &items {
            match RawAd::from_json(item) {
                Some(ad) => ads.push(ad),
                None => debug!(args = ?args, "dropping non-object ad"),
            }
        }
        Ok(ads)
    }

    /// Names of the advertised endpoints the trust rules let through.
    fn filter_endpoints(&self, ads: &[RawAd]) -> Vec<String> {
        let mut names = Vec::new();
        for ad in ads {
            let (Some(name), Some(identity)) = (ad.get("Name"), ad.get("AuthenticatedIdentity"))
            else {
                debug!("endpoint ad missing Name or AuthenticatedIdentity, skipped");
                continue;
            };
            if self.trust.permits(name, identity) {
                names.push(name.to_string());
            }
        }
        names
    }

    /// Convert a job ad, flooring placeholder request values to unset.
    fn job_from_ad(endpoint: &str, ad: &RawAd) -> JobRecord {
        let mut job = JobRecord::from_ad(endpoint, ad);
        if job.request.memory_mb < MIN_REQUEST_MEMORY_MB {
            job.request.memory_mb = 0;
        }
        if job.request.disk_kb < MIN_REQUEST_DISK_KB {
            job.request.disk_kb = 0;
        }
        job
    }

    /// Convert claim ads, keeping only those from an identity we accept
    /// that name the pod they run on.
    fn claims_from_ads(&self, ads: Vec<RawAd>) -> Vec<ClaimRecord> {
        let mut claims = Vec::new();
        for ad in ads {
            let Some(identity) = ad.get("AuthenticatedIdentity") else {
                debug!("claim ad missing AuthenticatedIdentity, skipped");
                continue;
            };
            if !self.claim_identity.is_match(identity) {
                continue;
            }
            let pod_name = ad.get_str(CLAIM_POD_NAME_ATTR);
            if pod_name.is_empty() {
                debug!(slot = %ad.get_str("Name"), "claim ad without a pod name, skipped");
                continue;
            }
            claims.push(ClaimRecord {
                pod_name,
                slot: ad.get_str("Name"),
                state: ClaimState::from(ad.get_str("State").as_str()),
            });
        }
        claims
    }
}

impl QueueSource for PortalQueue {
    async fn idle_jobs(&self) -> QueueResult<Vec<JobRecord>> {
        let roster = self.query_ads(&["endpoints", "--json"]).await?;
        let trusted = self.filter_endpoints(&roster);
        if trusted.is_empty() {
            warn!(advertised = roster.len(), "no advertised endpoint is trusted");
        }

        let mut jobs = Vec::new();
        for endpoint in &trusted {
            let mut args = vec!["jobs", "--endpoint", endpoint, "--idle", "--json"];
            if !self.extra_constraint.is_empty() {
                args.push("--constraint");
                args.push(&self.extra_constraint);
            }
            let ads = self.query_ads(&args).await?;
            debug!(%endpoint, ads = ads.len(), "idle job query");
            jobs.extend(ads.iter().map(|ad| Self::job_from_ad(endpoint, ad)));
        }
        Ok(jobs)
    }

    async fn worker_claims(&self) -> QueueResult<Vec<ClaimRecord>> {
        let ads = self
            .query_ads(&["claims", "--app", &self.app_name, "--json"])
            .await?;
        let claims = self.claims_from_ads(ads);
        debug!(claims = claims.len(), "worker claim query");
        Ok(claims)
    }
}
