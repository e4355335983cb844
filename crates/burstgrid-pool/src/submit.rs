//! Launch wire format.
//!
//! Everything a `job run` invocation carries is assembled here: the label
//! string that marks a pod as ours and records its shape, the environment
//! the worker needs to register with the scheduler, volumes, resource
//! requests, and the generated job name. The query side in
//! [`crate::client`] reads the same labels back, so the two halves of the
//! wire format live next to each other.

use burstgrid_core::config::PoolConfig;
use burstgrid_core::shape::{POD_PREFIX, ResourceShape};

/// Label marking which provisioner instance owns a pod.
pub const APP_LABEL: &str = "burst-app";
/// Label carrying the pod's generated job name.
pub const JOB_LABEL: &str = "burst-job";
/// Role marker label.
pub const ROLE_LABEL: &str = "burst-role";
/// Role value for worker-node pods.
pub const WORKER_ROLE: &str = "wn";

/// The `--name` value: ownership labels, operator labels, then the full
/// pod shape so the pod reports back the exact class it was sized for.
pub fn label_string(
    config: &PoolConfig,
    app_name: &str,
    pod_name: &str,
    shape: &ResourceShape,
) -> String {
    let mut pairs: Vec<(String, String)> = vec![
        (APP_LABEL.to_string(), app_name.to_string()),
        (JOB_LABEL.to_string(), pod_name.to_string()),
        (ROLE_LABEL.to_string(), WORKER_ROLE.to_string()),
    ];
    pairs.extend(
        config
            .labels
            .iter()
            .map(|(key, value)| (key.clone(), value.clone())),
    );
    pairs.extend(shape.to_ad_pairs(POD_PREFIX));
    pairs
        .iter()
        .map(|(key, value)| format!("{key}:{value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Worker environment. The launch API has no environment block, so the
/// caller appends these as space-joined `KEY VALUE` pairs after the
/// startup script.
pub fn worker_env(
    config: &PoolConfig,
    app_name: &str,
    pod_name: &str,
    queue_endpoint: &str,
    shape: &ResourceShape,
) -> Vec<(String, String)> {
    let mut env = vec![
        ("BURST_PROVISIONER_NAME".to_string(), app_name.to_string()),
        ("BURST_JOB_NAME".to_string(), pod_name.to_string()),
        ("QUEUE_ENDPOINT".to_string(), queue_endpoint.to_string()),
        (
            "NOCLAIM_SHUTDOWN_SECS".to_string(),
            config.noclaim_shutdown_secs.to_string(),
        ),
        ("JOB_TTL_SECS".to_string(), config.job_ttl_secs.to_string()),
        ("NUM_CPUS".to_string(), shape.cpus.to_string()),
        ("NUM_GPUS".to_string(), shape.gpus.to_string()),
        ("MEMORY_MB".to_string(), shape.memory_mb.to_string()),
        ("DISK_KB".to_string(), shape.disk_kb.to_string()),
    ];
    if !config.additional_requirements.is_empty() {
        env.push((
            "ADDITIONAL_REQUIREMENTS".to_string(),
            config.additional_requirements.clone(),
        ));
    }
    env.extend(
        config
            .env
            .iter()
            .map(|(key, value)| (key.clone(), value.clone())),
    );
    env
}

/// Input files to mount: configured volumes plus the registration token
/// every worker needs.
pub fn volume_files(config: &PoolConfig) -> Vec<String> {
    let mut files: Vec<String> = config.volumes.values().cloned().collect();
    files.push(config.token_file.clone());
    files
}

/// Memory request in GB, rounded up; the launch API has no finer unit.
pub fn memory_gb(memory_mb: u64) -> u64 {
    memory_mb.div_ceil(1024)
}

/// Priority class for a shape: the GPU or CPU specific one when set,
/// otherwise the general one, otherwise nothing.
pub fn priority_class<'a>(config: &'a PoolConfig, shape: &ResourceShape) -> Option<&'a str> {
    let specific = if shape.is_gpu() {
        config.priority_class_gpu.as_deref()
    } else {
        config.priority_class_cpu.as_deref()
    };
    specific.or(config.priority_class.as_deref())
}

/// Generated pod job name: app, client start time, per-client sequence.
pub fn pod_name(app_name: &str, start_time: u64, seq: u64) -> String {
    format!("{app_name}-{start_time:x}-{seq:06x}")
}

/// Full argv for one launch, minus the binary itself.
pub fn launch_args(
    config: &PoolConfig,
    app_name: &str,
    pod_name: &str,
    queue_endpoint: &str,
    shape: &ResourceShape,
) -> Vec<String> {
    let mut args = vec![
        "job".to_string(),
        "run".to_string(),
        "--name".to_string(),
        label_string(config, app_name, pod_name, shape),
    ];

    let mut command = config.startup_script.clone();
    for (key, value) in worker_env(config, app_name, pod_name, queue_endpoint, shape) {
        command.push(' ');
        command.push_str(&key);
        command.push(' ');
        command.push_str(&value);
    }
    args.push("--command".to_string());
    args.push(command);

    args.push("--image".to_string());
    args.push(config.image.clone());

    for file in volume_files(config) {
        args.push("--input-file".to_string());
        args.push(file);
    }

    args.push("--mem".to_string());
    args.push(memory_gb(shape.memory_mb).to_string());
    args.push("--cores".to_string());
    args.push(shape.cpus.to_string());

    if shape.is_gpu() {
        args.push("--gpu-count".to_string());
        args.push(shape.gpus.to_string());
        let gpu_type = if shape.gpu_type.is_empty() {
            config.default_gpu_type.clone()
        } else {
            shape.gpu_type.clone()
        };
        args.push("--gpu".to_string());
        args.push(gpu_type);
    }

    if let Some(priority) = priority_class(config, shape) {
        args.push("--priority".to_string());
        args.push(priority.to_string());
    }

    args
}
