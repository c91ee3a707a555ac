//! Process metrics sampling.
//!
//! On Linux memory figures come from `/proc/self/status`; elsewhere they are
//! reported as `None`. Reading never fails: a missing or unparsable line
//! simply leaves that metric empty.

use std::{env, fs, path::Path, time::Instant};

use log::debug;
use once_cell::sync::Lazy;

use crate::event::{HealthSnapshot, MemoryUsage};

const PROC_STATUS_PATH: &str = "/proc/self/status";
const KERNEL_HOSTNAME_PATH: &str = "/proc/sys/kernel/hostname";
const ETC_HOSTNAME_PATH: &str = "/etc/hostname";
const UNKNOWN_HOSTNAME: &str = "unknown";

static PROCESS_START: Lazy<Instant> = Lazy::new(Instant::now);

/// Pin the uptime origin. Called when the crate's long-lived components are
/// created so uptime is measured from startup rather than from the first
/// sample.
pub fn mark_process_start() {
    Lazy::force(&PROCESS_START);
}

/// Seconds since [`mark_process_start`] (or the first uptime query).
pub fn uptime_seconds() -> f64 {
    PROCESS_START.elapsed().as_secs_f64()
}

/// Version string reported as `runtimeVersion`.
pub fn runtime_version() -> String {
    format!("relaylog/{}", env!("CARGO_PKG_VERSION"))
}

/// Source of health snapshots for the reporter.
pub trait MetricsSampler: Send + 'static {
    fn sample(&mut self, environment: &str) -> HealthSnapshot;
}

/// Samples the current process.
#[derive(Debug)]
pub struct ProcessSampler {
    hostname: String,
}

impl Default for ProcessSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSampler {
    /// Resolves the hostname once; it is not re-read on every sample.
    pub fn new() -> Self {
        mark_process_start();
        Self {
            hostname: hostname(),
        }
    }
}

impl MetricsSampler for ProcessSampler {
    fn sample(&mut self, environment: &str) -> HealthSnapshot {
        HealthSnapshot {
            uptime: uptime_seconds(),
            memory: read_memory_usage(),
            hostname: self.hostname.clone(),
            process_id: std::process::id(),
            runtime_version: runtime_version(),
            environment: environment.to_owned(),
        }
    }
}

fn read_memory_usage() -> MemoryUsage {
    match fs::read_to_string(PROC_STATUS_PATH) {
        Ok(contents) => parse_proc_status(&contents),
        Err(err) => {
            debug!("Could not read memory usage from {PROC_STATUS_PATH}: {err}");
            MemoryUsage::default()
        }
    }
}

/// Extract memory figures from the text of `/proc/<pid>/status`.
pub fn parse_proc_status(contents: &str) -> MemoryUsage {
    let mut usage = MemoryUsage::default();
    for line in contents.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let slot = match key {
            "VmRSS" => &mut usage.rss,
            "VmData" => &mut usage.heap_total,
            "RssAnon" => &mut usage.heap_used,
            "RssFile" => &mut usage.external,
            "RssShmem" => &mut usage.array_buffers,
            _ => continue,
        };
        *slot = parse_kib(value);
    }
    usage
}

/// Parse a `"  1234 kB"` value into bytes.
fn parse_kib(value: &str) -> Option<u64> {
    let mut parts = value.split_whitespace();
    let amount = parts.next()?.parse::<u64>().ok()?;
    match parts.next() {
        Some("kB") | None => amount.checked_mul(1024),
        Some(_) => None,
    }
}

/// Hostname of this machine, falling back to `"unknown"`.
pub fn hostname() -> String {
    resolve_hostname(
        env::var("HOSTNAME").ok(),
        &[Path::new(KERNEL_HOSTNAME_PATH), Path::new(ETC_HOSTNAME_PATH)],
    )
}

/// First non-empty value among `from_env` and the contents of `files`.
pub fn resolve_hostname(from_env: Option<String>, files: &[&Path]) -> String {
    if let Some(name) = from_env.map(|name| name.trim().to_owned())
        && !name.is_empty()
    {
        return name;
    }
    for path in files {
        if let Ok(contents) = fs::read_to_string(path) {
            let name = contents.trim();
            if !name.is_empty() {
                return name.to_owned();
            }
        }
    }
    debug!("Could not determine hostname, using '{UNKNOWN_HOSTNAME}'");
    UNKNOWN_HOSTNAME.to_owned()
}
