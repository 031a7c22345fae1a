//! Activity classification and intent inference over recent commands.
//!
//! Pure functions over command lists; ordering within the tables decides
//! ties, so classification is deterministic for a given input.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Ordered category table. The first word of each command is matched by
/// prefix against these program names; the first matching category wins.
pub const ACTIVITY_TABLE: &[(&str, &[&str])] = &[
    (
        "file operations",
        &["ls", "cd", "pwd", "mkdir", "rmdir", "cp", "mv", "rm", "find", "locate"],
    ),
    (
        "text processing",
        &["cat", "less", "more", "head", "tail", "grep", "sed", "awk", "sort", "uniq"],
    ),
    (
        "system management",
        &["ps", "top", "htop", "kill", "systemctl", "service", "mount", "umount"],
    ),
    (
        "network operations",
        &["ping", "curl", "wget", "ssh", "scp", "rsync", "netstat", "ss"],
    ),
    (
        "permission management",
        &["chmod", "chown", "sudo", "su", "whoami", "groups"],
    ),
    (
        "development tools",
        &["git", "npm", "pip", "python", "node", "make", "gcc", "vim", "nano"],
    ),
    (
        "container tools",
        &["docker", "docker-compose", "kubectl", "podman"],
    ),
    ("archive tools", &["tar", "zip", "unzip", "gzip", "gunzip"]),
    ("package management", &["apt", "yum", "dnf", "brew", "snap"]),
    (
        "process monitoring",
        &["ps", "pgrep", "pkill", "jobs", "nohup", "screen", "tmux"],
    ),
];

/// Ordered intent table, matched as substrings against the last commands.
const INTENT_TABLE: &[(&str, &[&str])] = &[
    ("project setup", &["git clone", "cd", "npm install", "pip install"]),
    (
        "development and debugging",
        &["python", "node", "npm run", "git add", "git commit"],
    ),
    ("system configuration", &["sudo", "systemctl", "chmod", "chown"]),
    ("file management", &["mkdir", "cp", "mv", "rm", "ls"]),
    ("network debugging", &["curl", "wget", "ping", "netstat"]),
    ("container operations", &["docker", "docker-compose"]),
];

/// Fallback intent when nothing in the table matches.
pub const DEFAULT_INTENT: &str = "routine operation";

/// Keyword sets used to derive the overall work pattern.
const PATTERN_TABLE: &[(&str, &[&str])] = &[
    ("development", &["git", "npm", "pip", "python", "node", "make", "gcc"]),
    (
        "system_admin",
        &["systemctl", "service", "chmod", "chown", "mount", "sudo"],
    ),
    ("web_server", &["nginx", "apache", "curl", "wget", "netstat"]),
    ("database", &["mysql", "redis", "mongo", "psql"]),
    ("docker", &["docker", "docker-compose"]),
    ("file_management", &["ls", "cd", "cp", "mv", "rm", "find", "grep"]),
];

/// Coarse working mode, priority-ordered at derivation time:
/// development > system_admin > container_ops > general.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkMode {
    Development,
    SystemAdmin,
    ContainerOps,
    #[default]
    General,
}

impl fmt::Display for WorkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkMode::Development => write!(f, "development"),
            WorkMode::SystemAdmin => write!(f, "system administration"),
            WorkMode::ContainerOps => write!(f, "container operations"),
            WorkMode::General => write!(f, "general"),
        }
    }
}

/// Derived view of what the user has been doing recently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkPattern {
    pub mode: WorkMode,
    pub activities: BTreeSet<String>,
}

/// Count commands per activity category. The result keeps table order and
/// only includes categories that matched at least once.
pub fn classify_activity(commands: &[String]) -> Vec<(&'static str, usize)> {
    let mut counts = vec![0usize; ACTIVITY_TABLE.len()];

    for command in commands {
        let Some(program) = command.split_whitespace().next() else {
            continue;
        };
        for (idx, (_, programs)) in ACTIVITY_TABLE.iter().enumerate() {
            if programs.iter().any(|p| program.starts_with(p)) {
                counts[idx] += 1;
                break;
            }
        }
    }

    ACTIVITY_TABLE
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|((name, _), count)| (*name, count))
        .collect()
}

/// The `n` busiest categories, count-descending. Ties keep table order.
pub fn top_activities(counts: &[(&'static str, usize)], n: usize) -> Vec<(&'static str, usize)> {
    let mut sorted = counts.to_vec();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));
    sorted.truncate(n);
    sorted
}

/// Infer a short intent label from the last three commands. Needs at least
/// two commands to say anything beyond the default.
pub fn infer_intent(commands: &[String]) -> &'static str {
    if commands.len() < 2 {
        return DEFAULT_INTENT;
    }

    let window = &commands[commands.len().saturating_sub(3)..];
    for (label, keywords) in INTENT_TABLE {
        if window
            .iter()
            .any(|cmd| keywords.iter().any(|kw| cmd.contains(kw)))
        {
            return label;
        }
    }
    DEFAULT_INTENT
}

/// Derive the overall work pattern from recent commands.
pub fn work_pattern(commands: &[String]) -> WorkPattern {
    let mut activities = BTreeSet::new();
    for (name, keywords) in PATTERN_TABLE {
        if commands
            .iter()
            .any(|cmd| keywords.iter().any(|kw| cmd.contains(kw)))
        {
            activities.insert((*name).to_string());
        }
    }

    let mode = if activities.contains("development") {
        WorkMode::Development
    } else if activities.contains("system_admin") {
        WorkMode::SystemAdmin
    } else if activities.contains("docker") {
        WorkMode::ContainerOps
    } else {
        WorkMode::General
    };

    WorkPattern { mode, activities }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands(cmds: &[&str]) -> Vec<String> {
        cmds.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_classify_groups_dev_commands() {
        let counts = classify_activity(&commands(&[
            "git add .",
            "git commit -m x",
            "npm install",
        ]));
        let dev = counts
            .iter()
            .find(|(name, _)| *name == "development tools")
            .expect("development tools bucket");
        assert!(dev.1 >= 2);
    }

    #[test]
    fn test_classify_first_category_wins() {
        // "ps" appears under both system management and process monitoring;
        // the earlier table entry takes it.
        let counts = classify_activity(&commands(&["ps aux"]));
        assert_eq!(counts, vec![("system management", 1)]);
    }

    #[test]
    fn test_classify_each_command_counted_once() {
        let counts = classify_activity(&commands(&["ls -la", "cat foo", "ls"]));
        assert_eq!(
            counts,
            vec![("file operations", 2), ("text processing", 1)]
        );
    }

    #[test]
    fn test_classify_empty_input() {
        assert!(classify_activity(&[]).is_empty());
        assert!(classify_activity(&commands(&[""])).is_empty());
    }

    #[test]
    fn test_top_activities_sorted_with_stable_ties() {
        let counts = vec![
            ("file operations", 2),
            ("text processing", 2),
            ("development tools", 5),
        ];
        let top = top_activities(&counts, 2);
        assert_eq!(top, vec![("development tools", 5), ("file operations", 2)]);
    }

    #[test]
    fn test_infer_intent_matches_table_order() {
        assert_eq!(
            infer_intent(&commands(&["git clone x", "npm install"])),
            "project setup"
        );
        assert_eq!(
            infer_intent(&commands(&["vim main.py", "git commit -m fix"])),
            "development and debugging"
        );
        assert_eq!(
            infer_intent(&commands(&["docker ps", "docker logs app"])),
            "container operations"
        );
    }

    #[test]
    fn test_infer_intent_only_looks_at_last_three() {
        let cmds = commands(&["docker ps", "echo a", "echo b", "echo c"]);
        assert_eq!(infer_intent(&cmds), DEFAULT_INTENT);
    }

    #[test]
    fn test_infer_intent_default_for_short_input() {
        assert_eq!(infer_intent(&commands(&["git clone x"])), DEFAULT_INTENT);
        assert_eq!(infer_intent(&[]), DEFAULT_INTENT);
    }

    #[test]
    fn test_work_pattern_mode_priority() {
        let pattern = work_pattern(&commands(&["docker build .", "sudo systemctl restart app"]));
        assert_eq!(pattern.mode, WorkMode::SystemAdmin);
        assert!(pattern.activities.contains("docker"));

        let pattern = work_pattern(&commands(&["docker build .", "git push"]));
        assert_eq!(pattern.mode, WorkMode::Development);

        let pattern = work_pattern(&commands(&["docker ps"]));
        assert_eq!(pattern.mode, WorkMode::ContainerOps);

        let pattern = work_pattern(&commands(&["echo hi"]));
        assert_eq!(pattern.mode, WorkMode::General);
        assert!(pattern.activities.is_empty());
    }
}
