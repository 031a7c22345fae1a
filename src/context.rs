//! Aggregated session context.
//!
//! One invocation builds one snapshot: host facts, directory analysis, git
//! state and recent command activity, composed into a structure the prompt
//! builder and the `context` command both render from.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::history::HistoryTracker;
use crate::patterns::{self, WorkPattern};
use crate::system::{
    self, DirectoryProfile, ProjectType, RepoStatus, ResourceStatus, DEFAULT_SERVICES,
    DEFAULT_TOOLS,
};

/// How many recent commands a snapshot carries.
const RECENT_COMMAND_LIMIT: usize = 20;

/// Point-in-time view of the session and its surroundings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FullContext {
    pub cwd: String,
    pub user: String,
    pub os_info: String,
    pub resources: ResourceStatus,
    pub directory: DirectoryProfile,
    pub repo: RepoStatus,
    pub tools: BTreeMap<String, bool>,
    pub services: BTreeMap<String, bool>,
    pub network_up: bool,
    pub recent_commands: Vec<String>,
    pub activity_counts: Vec<(&'static str, usize)>,
    pub pattern: WorkPattern,
    pub intent: &'static str,
}

impl FullContext {
    /// Single-line, pipe-separated summary: working directory, project type
    /// when known, repo branch with a dirty marker when inside one.
    pub fn summary(&self) -> String {
        let mut parts = vec![self.cwd.clone()];

        if self.directory.project_type != ProjectType::Unknown {
            parts.push(format!("project: {}", self.directory.project_type));
        }

        if self.repo.in_repo {
            let branch = self.repo.branch.as_deref().unwrap_or("unknown");
            let mut repo = format!("git:{branch}");
            if self.repo.has_changes {
                repo.push_str(" [dirty]");
            }
            parts.push(repo);
        }

        parts.join(" | ")
    }

    /// Multi-section report used verbatim inside prompts and by the
    /// `context` command.
    pub fn narrative(&self) -> String {
        let mut out = String::new();

        writeln!(out, "Environment:").ok();
        writeln!(out, "  working directory: {}", self.cwd).ok();
        writeln!(out, "  user: {}", self.user).ok();
        writeln!(out, "  system: {}", self.os_info).ok();
        writeln!(
            out,
            "  network: {}",
            if self.network_up { "online" } else { "offline" }
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "Directory:").ok();
        writeln!(out, "  files: {}", self.directory.file_count).ok();
        writeln!(out, "  project type: {}", self.directory.project_type).ok();
        if !self.directory.key_files.is_empty() {
            writeln!(out, "  key files: {}", self.directory.key_files.join(", ")).ok();
        }

        writeln!(out).ok();
        writeln!(out, "Git:").ok();
        if self.repo.in_repo {
            writeln!(
                out,
                "  branch: {}",
                self.repo.branch.as_deref().unwrap_or("unknown")
            )
            .ok();
            if self.repo.has_changes {
                writeln!(out, "  changes: {} files modified", self.repo.changed_file_count).ok();
            } else {
                writeln!(out, "  changes: none").ok();
            }
            if let Some(commit) = self.repo.recent_commits.first() {
                writeln!(out, "  last commit: {commit}").ok();
            }
        } else {
            writeln!(out, "  not inside a repository").ok();
        }

        writeln!(out).ok();
        writeln!(out, "Resources:").ok();
        writeln!(out, "  cpu: {:.1}%", self.resources.cpu_percent).ok();
        writeln!(
            out,
            "  memory: {:.1}% used ({:.1} GB free of {:.1} GB)",
            self.resources.memory_percent,
            self.resources.memory_available_gb,
            self.resources.memory_total_gb
        )
        .ok();
        writeln!(
            out,
            "  disk: {:.1}% used ({:.1} GB free of {:.1} GB)",
            self.resources.disk_percent, self.resources.disk_free_gb, self.resources.disk_total_gb
        )
        .ok();
        writeln!(out, "  processes: {}", self.resources.process_count).ok();

        out
    }
}

/// Builds `FullContext` snapshots from the collectors and a history tracker.
pub struct ContextAggregator {
    tracker: HistoryTracker,
}

impl ContextAggregator {
    pub fn new(tracker: HistoryTracker) -> Self {
        Self { tracker }
    }

    /// Gather everything in one pass. Individual probe failures degrade to
    /// defaults inside the collectors; this function itself cannot fail.
    pub async fn snapshot(&self) -> FullContext {
        let cwd = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());

        let recent_commands = self.tracker.recent(RECENT_COMMAND_LIMIT);
        let activity_counts = patterns::classify_activity(&recent_commands);
        let pattern = patterns::work_pattern(&recent_commands);
        let intent = patterns::infer_intent(&recent_commands);

        let path = Path::new(&cwd);
        FullContext {
            os_info: system::os_info().await,
            resources: system::resource_status().await,
            directory: system::directory_profile(path),
            repo: system::repo_status(path).await,
            tools: system::installed_tools(DEFAULT_TOOLS).await,
            services: system::running_services(DEFAULT_SERVICES).await,
            network_up: system::network_reachable().await,
            cwd,
            user,
            recent_commands,
            activity_counts,
            pattern,
            intent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::DEFAULT_INTENT;

    fn sample_context() -> FullContext {
        FullContext {
            cwd: "/home/user/project".to_string(),
            user: "user".to_string(),
            os_info: "Linux host 6.1.0".to_string(),
            resources: ResourceStatus {
                cpu_percent: 12.5,
                memory_percent: 40.0,
                memory_total_gb: 16.0,
                memory_available_gb: 9.6,
                disk_percent: 70.0,
                disk_total_gb: 234.0,
                disk_free_gb: 70.2,
                process_count: 312,
            },
            directory: DirectoryProfile {
                file_count: 14,
                has_hidden_files: true,
                file_type_counts: BTreeMap::new(),
                project_type: ProjectType::Node,
                key_files: vec!["package.json".to_string()],
            },
            repo: RepoStatus {
                in_repo: true,
                branch: Some("main".to_string()),
                has_changes: true,
                changed_file_count: 3,
                recent_commits: vec!["abc123 fix build".to_string()],
            },
            tools: BTreeMap::new(),
            services: BTreeMap::new(),
            network_up: true,
            recent_commands: vec!["npm install".to_string(), "npm run build".to_string()],
            activity_counts: vec![("development tools", 2)],
            pattern: WorkPattern::default(),
            intent: DEFAULT_INTENT,
        }
    }

    #[test]
    fn test_summary_with_repo_and_project() {
        let context = sample_context();
        assert_eq!(
            context.summary(),
            "/home/user/project | project: node | git:main [dirty]"
        );
    }

    #[test]
    fn test_summary_clean_repo_has_no_dirty_marker() {
        let mut context = sample_context();
        context.repo.has_changes = false;
        assert!(!context.summary().contains("[dirty]"));
    }

    #[test]
    fn test_summary_omits_unknown_project_and_missing_repo() {
        let mut context = sample_context();
        context.directory.project_type = ProjectType::Unknown;
        context.repo = RepoStatus::default();
        assert_eq!(context.summary(), "/home/user/project");
    }

    #[test]
    fn test_narrative_sections() {
        let narrative = sample_context().narrative();
        assert!(narrative.contains("Environment:"));
        assert!(narrative.contains("working directory: /home/user/project"));
        assert!(narrative.contains("project type: node"));
        assert!(narrative.contains("branch: main"));
        assert!(narrative.contains("changes: 3 files modified"));
        assert!(narrative.contains("cpu: 12.5%"));
        assert!(narrative.contains("processes: 312"));
    }

    #[test]
    fn test_narrative_outside_repo() {
        let mut context = sample_context();
        context.repo = RepoStatus::default();
        assert!(context.narrative().contains("not inside a repository"));
    }

    #[test]
    fn test_narrative_is_deterministic() {
        let context = sample_context();
        assert_eq!(context.narrative(), context.narrative());
    }
}
