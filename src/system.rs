//! Point-in-time system context probes.
//!
//! Every probe is independently fault tolerant: a missing binary, permission
//! error or timeout degrades that one value to its default and is logged at
//! debug level. Nothing here returns an error to the caller, so one broken
//! subsystem never blocks diagnosis of another.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use sysinfo::Disks;
use tokio::process::Command;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const PING_TIMEOUT: Duration = Duration::from_secs(3);

/// Tools probed by default when building a context snapshot.
pub const DEFAULT_TOOLS: &[&str] = &[
    "git", "docker", "node", "python3", "vim", "curl", "wget", "nginx", "mysql", "redis",
];

/// Services probed by default when building a context snapshot.
pub const DEFAULT_SERVICES: &[&str] = &["nginx", "apache2", "mysql", "redis", "docker", "ssh"];

/// Best-effort host utilization snapshot. Unavailable fields stay zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_total_gb: f64,
    pub memory_available_gb: f64,
    pub disk_percent: f64,
    pub disk_total_gb: f64,
    pub disk_free_gb: f64,
    pub process_count: usize,
}

/// Coarse classification of a working directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Python,
    Node,
    Web,
    Docker,
    Git,
    Config,
    #[default]
    Unknown,
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProjectType::Python => "python",
            ProjectType::Node => "node",
            ProjectType::Web => "web",
            ProjectType::Docker => "docker",
            ProjectType::Git => "git",
            ProjectType::Config => "config",
            ProjectType::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// Ordered indicator table; the first entry with any file present in the
/// directory decides the project type.
pub const PROJECT_INDICATORS: &[(ProjectType, &[&str])] = &[
    (
        ProjectType::Python,
        &["requirements.txt", "setup.py", "pyproject.toml", "main.py"],
    ),
    (ProjectType::Node, &["package.json", "node_modules"]),
    (ProjectType::Web, &["index.html", "index.php"]),
    (ProjectType::Docker, &["Dockerfile", "docker-compose.yml"]),
    (ProjectType::Git, &[".git"]),
    (ProjectType::Config, &["nginx.conf", "apache.conf", ".env"]),
];

/// What the working directory looks like, derived fresh per query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryProfile {
    pub file_count: usize,
    pub has_hidden_files: bool,
    pub file_type_counts: BTreeMap<String, usize>,
    pub project_type: ProjectType,
    pub key_files: Vec<String>,
}

/// Version-control state of the working directory. `in_repo == false`
/// leaves every other field at its default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoStatus {
    pub in_repo: bool,
    pub branch: Option<String>,
    pub has_changes: bool,
    pub changed_file_count: usize,
    pub recent_commits: Vec<String>,
}

/// Run a probe command with a bounded timeout, returning its success flag
/// and stdout. `None` means the probe itself failed or timed out.
async fn probe(program: &str, args: &[&str], limit: Duration) -> Option<(bool, String)> {
    probe_in(program, args, None, limit).await
}

async fn probe_in(
    program: &str,
    args: &[&str],
    dir: Option<&Path>,
    limit: Duration,
) -> Option<(bool, String)> {
    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = dir {
        command.current_dir(dir);
    }

    match tokio::time::timeout(limit, command.output()).await {
        Ok(Ok(output)) => Some((
            output.status.success(),
            String::from_utf8_lossy(&output.stdout).into_owned(),
        )),
        Ok(Err(err)) => {
            log::debug!("probe `{program}` failed: {err}");
            None
        }
        Err(_) => {
            log::debug!("probe `{program}` timed out after {limit:?}");
            None
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

const GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Parse MemTotal/MemAvailable (in kB) out of /proc/meminfo.
fn parse_meminfo(raw: &str) -> Option<(u64, u64)> {
    let field = |name: &str| -> Option<u64> {
        raw.lines()
            .find(|line| line.starts_with(name))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|value| value.parse().ok())
    };
    let total = field("MemTotal:")?;
    let available = field("MemAvailable:")?;
    Some((total, available))
}

/// Parse idle percentage out of a `top -bn1` header and return utilization
/// as `100 - idle`.
fn parse_cpu_percent(top_output: &str) -> Option<f64> {
    let line = top_output.lines().find(|line| line.contains("Cpu(s)"))?;
    for segment in line.split(',') {
        let segment = segment.trim();
        if let Some(value) = segment.strip_suffix("id") {
            let idle: f64 = value.trim().parse().ok()?;
            return Some(round1(100.0 - idle));
        }
    }
    None
}

/// One-shot utilization snapshot: memory from /proc/meminfo, disk from the
/// mounted filesystems, CPU from a single `top` sample, process count from
/// `ps aux`.
pub async fn resource_status() -> ResourceStatus {
    let mut status = ResourceStatus::default();

    match tokio::fs::read_to_string("/proc/meminfo").await {
        Ok(raw) => {
            if let Some((total_kb, available_kb)) = parse_meminfo(&raw) {
                if total_kb > 0 {
                    let total = total_kb as f64 * 1024.0;
                    let available = available_kb as f64 * 1024.0;
                    status.memory_percent = round1((total - available) / total * 100.0);
                    status.memory_total_gb = round1(total / GB);
                    status.memory_available_gb = round1(available / GB);
                }
            }
        }
        Err(err) => log::debug!("could not read /proc/meminfo: {err}"),
    }

    let disks = Disks::new_with_refreshed_list();
    let root = disks
        .list()
        .iter()
        .find(|d| d.mount_point() == Path::new("/"))
        .or_else(|| disks.list().first());
    if let Some(disk) = root {
        let total = disk.total_space() as f64;
        let free = disk.available_space() as f64;
        if total > 0.0 {
            status.disk_percent = round1((total - free) / total * 100.0);
            status.disk_total_gb = round1(total / GB);
            status.disk_free_gb = round1(free / GB);
        }
    }

    if let Some((true, output)) = probe("top", &["-bn1"], PROBE_TIMEOUT).await {
        if let Some(cpu) = parse_cpu_percent(&output) {
            status.cpu_percent = cpu;
        }
    }

    if let Some((true, output)) = probe("ps", &["aux"], PROBE_TIMEOUT).await {
        status.process_count = output.lines().count().saturating_sub(1);
    }

    status
}

/// Classify a directory by its contents. Unreadable directories produce the
/// default (empty, unknown) profile.
pub fn directory_profile(path: &Path) -> DirectoryProfile {
    let entries = match std::fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) => {
            log::debug!("could not read directory {}: {err}", path.display());
            return DirectoryProfile::default();
        }
    };

    let mut profile = DirectoryProfile::default();
    let mut names: Vec<String> = Vec::new();

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            profile.has_hidden_files = true;
        }
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            if let Some(ext) = Path::new(&name).extension() {
                let ext = ext.to_string_lossy().to_lowercase();
                *profile.file_type_counts.entry(ext).or_insert(0) += 1;
            }
        }
        names.push(name);
    }
    profile.file_count = names.len();

    for (project_type, indicators) in PROJECT_INDICATORS {
        let present: Vec<String> = indicators
            .iter()
            .filter(|i| names.iter().any(|n| n == *i))
            .map(|i| i.to_string())
            .collect();
        if !present.is_empty() {
            profile.project_type = *project_type;
            profile.key_files = present;
            break;
        }
    }

    profile
}

/// Git state for a directory. Any git failure (not installed, not a repo,
/// timeout) yields `in_repo == false`.
pub async fn repo_status(path: &Path) -> RepoStatus {
    let mut status = RepoStatus::default();

    match probe_in("git", &["rev-parse", "--git-dir"], Some(path), PROBE_TIMEOUT).await {
        Some((true, _)) => {}
        _ => return status,
    }
    status.in_repo = true;

    if let Some((true, output)) =
        probe_in("git", &["branch", "--show-current"], Some(path), PROBE_TIMEOUT).await
    {
        let branch = output.trim();
        if !branch.is_empty() {
            status.branch = Some(branch.to_string());
        }
    }

    if let Some((true, output)) =
        probe_in("git", &["status", "--porcelain"], Some(path), PROBE_TIMEOUT).await
    {
        let changed = output.lines().filter(|l| !l.trim().is_empty()).count();
        status.has_changes = changed > 0;
        status.changed_file_count = changed;
    }

    if let Some((true, output)) =
        probe_in("git", &["log", "--oneline", "-5"], Some(path), PROBE_TIMEOUT).await
    {
        status.recent_commits = output
            .lines()
            .take(3)
            .map(|l| l.trim().to_string())
            .collect();
    }

    status
}

/// Which of `names` resolve on the search path.
pub async fn installed_tools(names: &[&str]) -> BTreeMap<String, bool> {
    let mut tools = BTreeMap::new();
    for name in names.iter().copied() {
        let found = matches!(probe("which", &[name], PROBE_TIMEOUT).await, Some((true, _)));
        tools.insert(name.to_string(), found);
    }
    tools
}

/// Which of `names` are active systemd units.
pub async fn running_services(names: &[&str]) -> BTreeMap<String, bool> {
    let mut services = BTreeMap::new();
    for name in names.iter().copied() {
        let active = match probe("systemctl", &["is-active", name], PROBE_TIMEOUT).await {
            Some((_, output)) => output.trim() == "active",
            None => false,
        };
        services.insert(name.to_string(), active);
    }
    services
}

/// Single-ping reachability check.
pub async fn network_reachable() -> bool {
    matches!(
        probe("ping", &["-c", "1", "-W", "2", "8.8.8.8"], PING_TIMEOUT).await,
        Some((true, _))
    )
}

/// Kernel and host identification via `uname -a`.
pub async fn os_info() -> String {
    match probe("uname", &["-a"], PROBE_TIMEOUT).await {
        Some((true, output)) => output.trim().to_string(),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meminfo() {
        let raw = "MemTotal:       16384256 kB\n\
                   MemFree:         1024000 kB\n\
                   MemAvailable:    8192128 kB\n\
                   Buffers:          512000 kB\n";
        let (total, available) = parse_meminfo(raw).unwrap();
        assert_eq!(total, 16_384_256);
        assert_eq!(available, 8_192_128);
    }

    #[test]
    fn test_parse_meminfo_missing_field() {
        assert!(parse_meminfo("MemTotal: 1024 kB\n").is_none());
        assert!(parse_meminfo("").is_none());
    }

    #[test]
    fn test_parse_cpu_percent() {
        let output = "top - 12:00:00 up 1 day\n\
                      %Cpu(s):  1.2 us,  0.6 sy,  0.0 ni, 98.1 id,  0.0 wa,  0.0 hi,  0.1 si\n";
        assert_eq!(parse_cpu_percent(output), Some(1.9));
    }

    #[test]
    fn test_parse_cpu_percent_no_header() {
        assert_eq!(parse_cpu_percent("no cpu line here"), None);
    }

    #[test]
    fn test_directory_profile_node() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        std::fs::write(dir.path().join("index.js"), "").unwrap();

        let profile = directory_profile(dir.path());
        assert_eq!(profile.project_type, ProjectType::Node);
        assert_eq!(profile.key_files, vec!["package.json"]);
        assert_eq!(profile.file_count, 2);
        assert_eq!(profile.file_type_counts.get("js"), Some(&1));
    }

    #[test]
    fn test_directory_profile_python_beats_node() {
        // Priority is pinned by the indicator table order: python first.
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "").unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();

        let profile = directory_profile(dir.path());
        assert_eq!(profile.project_type, ProjectType::Python);
        assert_eq!(profile.key_files, vec!["requirements.txt"]);
    }

    #[test]
    fn test_directory_profile_hidden_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "KEY=1").unwrap();

        let profile = directory_profile(dir.path());
        assert!(profile.has_hidden_files);
        assert_eq!(profile.project_type, ProjectType::Config);
    }

    #[test]
    fn test_directory_profile_unreadable_path() {
        let profile = directory_profile(Path::new("/nonexistent/path"));
        assert_eq!(profile.project_type, ProjectType::Unknown);
        assert_eq!(profile.file_count, 0);
    }

    #[test]
    fn test_repo_status_default_is_terminal() {
        let status = RepoStatus::default();
        assert!(!status.in_repo);
        assert!(status.branch.is_none());
        assert!(!status.has_changes);
        assert!(status.recent_commits.is_empty());
    }

    #[test]
    fn test_project_type_display() {
        assert_eq!(ProjectType::Python.to_string(), "python");
        assert_eq!(ProjectType::Unknown.to_string(), "unknown");
    }
}
