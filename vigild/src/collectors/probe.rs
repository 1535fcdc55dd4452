//! Fail-soft OS introspection.
//!
//! Every function here performs a fresh read of ambient OS state: procfs for
//! kernel counters, external tools (`df`, `ps`, `ss`, `systemctl`) for the
//! rest. Failures never reach the caller. A read that cannot run or parse
//! degrades to the type's zero value and leaves a warn-level log line, so a
//! broken tool costs one field, not the whole snapshot.

use log::warn;
use tokio::process::Command;

use crate::types::{NetworkConnection, ProcessInfo, ServiceKind, ServiceStatus};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const SECS_PER_DAY: f64 = 86_400.0;

/// Aggregate CPU counters from one read of /proc/stat.
///
/// `total` is user + nice + system + idle. Usage is only meaningful as the
/// delta between two samples taken some interval apart.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuSample {
    pub total: u64,
    pub idle: u64,
}

pub fn sample_cpu() -> CpuSample {
    match procfs::KernelStats::new() {
        Ok(stats) => {
            let cpu = stats.total;
            CpuSample {
                total: cpu.user + cpu.nice + cpu.system + cpu.idle,
                idle: cpu.idle,
            }
        }
        Err(err) => {
            warn!("[probe] failed to read /proc/stat: {err}");
            CpuSample::default()
        }
    }
}

/// Percentage of non-idle time between two counter samples, clamped to
/// [0, 100]. A non-positive total delta (counter reset, identical samples)
/// yields 0.
pub fn cpu_usage_between(prev: &CpuSample, next: &CpuSample) -> f64 {
    let total_delta = next.total as f64 - prev.total as f64;
    let idle_delta = next.idle as f64 - prev.idle as f64;
    if total_delta <= 0.0 {
        return 0.0;
    }
    ((total_delta - idle_delta) / total_delta * 100.0).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryReading {
    pub total_gb: f64,
    pub used_gb: f64,
    pub usage_percent: f64,
}

pub fn read_memory() -> MemoryReading {
    let info = match procfs::Meminfo::new() {
        Ok(info) => info,
        Err(err) => {
            warn!("[probe] failed to read /proc/meminfo: {err}");
            return MemoryReading::default();
        }
    };
    let total = info.mem_total as f64;
    if total <= 0.0 {
        return MemoryReading::default();
    }
    // MemAvailable is the kernel's estimate of allocatable memory; cache only
    // counts as used when it is genuinely unavailable. Old kernels lack the
    // field, MemFree is the conservative stand-in.
    let available = info.mem_available.unwrap_or(info.mem_free) as f64;
    let used = total - available;
    MemoryReading {
        total_gb: total / GIB,
        used_gb: used / GIB,
        usage_percent: used / total * 100.0,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiskReading {
    pub total_gb: f64,
    pub used_gb: f64,
    pub usage_percent: f64,
}

/// Root filesystem usage via `df / --block-size=1G`.
pub async fn read_root_disk() -> DiskReading {
    match command_stdout("df", &["/", "--block-size=1G"]).await {
        Some(output) => parse_df(&output),
        None => DiskReading::default(),
    }
}

/// Pick the row mounted on `/` and read total, used and the Use% column.
/// The percentage df reports is trusted as-is.
pub fn parse_df(output: &str) -> DiskReading {
    for line in output.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 6 || parts.last() != Some(&"/") {
            continue;
        }
        return DiskReading {
            total_gb: parts[1].parse().unwrap_or(0.0),
            used_gb: parts[2].parse().unwrap_or(0.0),
            usage_percent: parts[4].trim_end_matches('%').parse().unwrap_or(0.0),
        };
    }
    DiskReading::default()
}

pub fn read_uptime_days() -> f64 {
    match procfs::Uptime::new() {
        Ok(uptime) => uptime.uptime / SECS_PER_DAY,
        Err(err) => {
            warn!("[probe] failed to read /proc/uptime: {err}");
            0.0
        }
    }
}

/// Live process count from /proc.
pub fn count_processes() -> u64 {
    match procfs::process::all_processes() {
        Ok(procs) => procs.filter(|p| p.is_ok()).count() as u64,
        Err(err) => {
            warn!("[probe] failed to enumerate /proc: {err}");
            0
        }
    }
}

/// Top processes by CPU via `ps aux --sort=-%cpu`.
pub async fn top_processes(count: usize) -> Vec<ProcessInfo> {
    if count == 0 {
        return Vec::new();
    }
    match command_stdout("ps", &["aux", "--sort=-%cpu"]).await {
        Some(output) => parse_ps(&output, count),
        None => Vec::new(),
    }
}

/// Parse `ps aux` output: skip the header, keep rows with the full column
/// set, rejoin the command tail. Rows are re-sorted by CPU descending (ties
/// keep ps order) and truncated to `count`.
pub fn parse_ps(output: &str, count: usize) -> Vec<ProcessInfo> {
    if count == 0 {
        return Vec::new();
    }
    let mut rows = Vec::new();
    for line in output.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 11 {
            continue;
        }
        rows.push(ProcessInfo {
            user: parts[0].to_string(),
            pid: parts[1].parse().unwrap_or(0),
            cpu_usage: parts[2].parse().unwrap_or(0.0),
            memory_usage: parts[3].parse().unwrap_or(0.0),
            command: parts[10..].join(" "),
        });
    }
    rows.sort_by(|a, b| {
        b.cpu_usage
            .partial_cmp(&a.cpu_usage)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows.truncate(count);
    rows
}

/// Listening sockets via `ss -tulnp`.
pub async fn listening_sockets() -> Vec<NetworkConnection> {
    match command_stdout("ss", &["-tulnp"]).await {
        Some(output) => parse_ss(&output),
        None => Vec::new(),
    }
}

/// Parse `ss -tulnp` output: skip the header, require the fixed leading
/// columns, rejoin whatever trails the peer address as the process column.
pub fn parse_ss(output: &str) -> Vec<NetworkConnection> {
    let mut connections = Vec::new();
    for line in output.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 6 {
            continue;
        }
        let local = parts[4].to_string();
        connections.push(NetworkConnection {
            protocol: parts[0].to_string(),
            state: parts[1].to_string(),
            service: ServiceKind::from_local_address(&local),
            local_address: local,
            remote_address: parts[5].to_string(),
            process: parts[6..].join(" "),
        });
    }
    connections
}

/// Activation state of one systemd unit.
///
/// `systemctl is-active` prints the state even when it exits non-zero, so
/// the exit status is ignored; only a failure to run the tool at all maps to
/// the "unknown" status.
pub async fn service_active(name: &str) -> ServiceStatus {
    match Command::new("systemctl")
        .args(["is-active", name])
        .output()
        .await
    {
        Ok(out) => {
            let raw = String::from_utf8_lossy(&out.stdout).trim().to_string();
            ServiceStatus {
                name: name.to_string(),
                is_active: raw == "active",
                status: raw,
            }
        }
        Err(err) => {
            warn!("[probe] systemctl is-active {name} failed: {err}");
            ServiceStatus {
                name: name.to_string(),
                status: "unknown".to_string(),
                is_active: false,
            }
        }
    }
}

/// Established-connection count for one local port via `ss -tn src :<port>`.
pub async fn port_connection_count(port: u16) -> u64 {
    let filter = format!(":{port}");
    match command_stdout("ss", &["-tn", "src", &filter]).await {
        Some(output) => count_established(&output),
        None => 0,
    }
}

/// Non-empty lines after the header row.
pub fn count_established(output: &str) -> u64 {
    output
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .count() as u64
}

async fn command_stdout(program: &str, args: &[&str]) -> Option<String> {
    match Command::new(program).args(args).output().await {
        Ok(out) => Some(String::from_utf8_lossy(&out.stdout).into_owned()),
        Err(err) => {
            warn!("[probe] {program} {} failed: {err}", args.join(" "));
            None
        }
    }
}
