//! External record types.
//!
//! Everything the daemon learns about the outside world arrives as loosely
//! shaped key/value ads (scheduler classads, pod label lists). [`RawAd`] is
//! the single conversion boundary: string keys, string values, coercing
//! accessors that fail closed. The typed records here are built from raw ads
//! exactly once per iteration and are plain data from then on.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::shape::ResourceShape;

/// Scheduler status code for a job waiting to run.
pub const JOB_STATUS_IDLE: u32 = 1;

/// Claim-ad attribute carrying the pod job name the worker belongs to.
/// Workers advertise it from the `BURST_JOB_NAME` environment they were
/// launched with; it is the only correlation between claims and pods.
pub const CLAIM_POD_NAME_ATTR: &str = "BurstJobName";

/// A string-keyed, string-valued attribute map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAd(HashMap<String, String>);

impl RawAd {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a JSON object into an ad. Scalar values keep their decimal
    /// rendering; nested arrays/objects and nulls are dropped. Returns
    /// `None` when `value` is not an object.
    pub fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut ad = Self::new();
        for (key, value) in object {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            ad.insert(key, rendered);
        }
        Some(ad)
    }

    /// Parse a space-separated `key:value` label list. Values may be empty;
    /// tokens without a `:` are dropped.
    pub fn from_label_pairs(labels: &str) -> Self {
        let mut ad = Self::new();
        for token in labels.split_whitespace() {
            if let Some((key, value)) = token.split_once(':') {
                ad.insert(key, value);
            }
        }
        ad
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut ad = Self::new();
        for (key, value) in pairs {
            ad.insert(key, value);
        }
        ad
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// String value of `key`, or `""` when absent.
    pub fn get_str(&self, key: &str) -> String {
        self.0.get(key).cloned().unwrap_or_default()
    }

    /// Numeric value of `key`; absent or malformed coerces to 0.
    pub fn get_u64(&self, key: &str) -> u64 {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Numeric value of `key`; absent or malformed coerces to 0.
    pub fn get_u32(&self, key: &str) -> u32 {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One idle job pulled from a trusted queue endpoint.
#[derive(Debug, Clone)]
pub struct JobRecord {
    /// Queue endpoint the job was read from.
    pub endpoint: String,
    pub cluster_id: u64,
    pub proc_id: u64,
    /// Scheduler status code; queries only return [`JOB_STATUS_IDLE`] jobs.
    pub status: u32,
    /// Normalized resource request; this is the job's class key.
    pub request: ResourceShape,
}

impl JobRecord {
    /// Build a job from a scheduler ad. Never fails; malformed numerics
    /// coerce to 0 and missing request fields default.
    pub fn from_ad(endpoint: &str, ad: &RawAd) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            cluster_id: ad.get_u64("ClusterId"),
            proc_id: ad.get_u64("ProcId"),
            status: ad.get_u32("JobStatus"),
            request: ResourceShape::from_ad(crate::shape::REQUEST_PREFIX, ad),
        }
    }

    /// `cluster.proc` id the scheduler knows this job by.
    pub fn id(&self) -> String {
        format!("{}.{}", self.cluster_id, self.proc_id)
    }
}

/// Lifecycle status reported by the leasing platform for one pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodStatus {
    Submitted,
    Queued,
    Created,
    Running,
    Finished,
    DeletePending,
    Error,
    /// Anything the platform reports that we do not recognize.
    Other(String),
}

impl PodStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "submitted" => Self::Submitted,
            "queued" => Self::Queued,
            "created" => Self::Created,
            "running" => Self::Running,
            "finished" => Self::Finished,
            "delete pending" => Self::DeletePending,
            "error" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Submitted => "submitted",
            Self::Queued => "queued",
            Self::Created => "created",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::DeletePending => "delete pending",
            Self::Error => "error",
            Self::Other(other) => other,
        };
        f.write_str(label)
    }
}

/// One worker pod we own on the leasing platform.
#[derive(Debug, Clone)]
pub struct PodRecord {
    /// Platform-assigned id.
    pub id: String,
    /// Our generated job name; claims correlate on this.
    pub name: String,
    pub status: PodStatus,
    /// Shape recovered from the pod's `Pod*` labels; this is the pod's
    /// class key.
    pub shape: ResourceShape,
}

/// State of one scheduler claim on a worker slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimState {
    Claimed,
    Unclaimed,
    Other(String),
}

impl From<&str> for ClaimState {
    fn from(raw: &str) -> Self {
        match raw {
            "Claimed" => Self::Claimed,
            "Unclaimed" => Self::Unclaimed,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One worker-slot ad the scheduler holds for a pod of ours.
///
/// A pod maps to zero or more claims: none until the worker registers, and
/// several when the worker partitions its slot.
#[derive(Debug, Clone)]
pub struct ClaimRecord {
    /// Pod job name, from [`CLAIM_POD_NAME_ATTR`].
    pub pod_name: String,
    /// Slot name, for logs only.
    pub slot: String,
    pub state: ClaimState,
}
