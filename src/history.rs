//! Command history tracking across short-lived invocations.
//!
//! Each analysis runs in a fresh process, so the in-memory log alone would
//! only ever hold the one command that triggered it. Two mechanisms fill the
//! gap: a persisted JSON-lines log under the state directory, and a fallback
//! merge with the shell's own history file.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Hard cap on tracked events. On overflow the log is truncated to the most
/// recent half rather than evicting one entry per append.
pub const HISTORY_CAP: usize = 100;

/// Current time as fractional seconds since the Unix epoch.
pub fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// A completed shell command. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEvent {
    pub command: String,
    pub exit_code: i32,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub stdout: String,
    pub timestamp: f64,
    pub cwd: String,
}

impl CommandEvent {
    /// Create an event stamped with the current time and working directory.
    pub fn new(command: impl Into<String>, exit_code: i32, stderr: impl Into<String>) -> Self {
        let cwd = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            command: command.into(),
            exit_code,
            stderr: stderr.into(),
            stdout: String::new(),
            timestamp: unix_timestamp(),
            cwd,
        }
    }
}

/// Ordered, size-bounded log of observed commands.
#[derive(Debug, Default)]
pub struct HistoryTracker {
    events: Vec<CommandEvent>,
    cap: usize,
}

impl HistoryTracker {
    pub fn new() -> Self {
        Self::with_cap(HISTORY_CAP)
    }

    pub fn with_cap(cap: usize) -> Self {
        Self {
            events: Vec::new(),
            cap: cap.max(2),
        }
    }

    /// Load the persisted log, ignoring unreadable files and bad lines.
    pub fn load(path: Option<&Path>) -> Self {
        let mut tracker = Self::new();
        let Some(path) = path else {
            return tracker;
        };
        let Ok(contents) = std::fs::read_to_string(path) else {
            return tracker;
        };
        for line in contents.lines() {
            if let Ok(event) = serde_json::from_str::<CommandEvent>(line) {
                tracker.append(event);
            }
        }
        tracker
    }

    /// Append an event, truncating to the most recent half when the cap is
    /// exceeded.
    pub fn append(&mut self, event: CommandEvent) {
        self.events.push(event);
        if self.events.len() > self.cap {
            let keep = self.cap / 2;
            self.events.drain(..self.events.len() - keep);
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[CommandEvent] {
        &self.events
    }

    /// The most recent `limit` command strings, oldest first. When the
    /// in-process log is shorter than `limit`, shell history is merged in
    /// (shell history first, then unseen tracked commands, relative order
    /// preserved).
    pub fn recent(&self, limit: usize) -> Vec<String> {
        let internal: Vec<String> = self.events.iter().map(|e| e.command.clone()).collect();
        if internal.len() >= limit {
            return internal[internal.len() - limit..].to_vec();
        }

        let mut merged = read_shell_history(limit);
        let mut seen: HashSet<String> = merged.iter().cloned().collect();
        for command in internal {
            if seen.insert(command.clone()) {
                merged.push(command);
            }
        }
        if merged.len() > limit {
            merged.drain(..merged.len() - limit);
        }
        merged
    }

    /// Write the log as JSON lines via a temp file and atomic rename.
    pub fn persist(&self, path: &Path) -> anyhow::Result<()> {
        use anyhow::Context;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }

        let mut contents = String::new();
        for event in &self.events {
            contents.push_str(&serde_json::to_string(event)?);
            contents.push('\n');
        }

        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, contents)
            .with_context(|| format!("failed to write history: {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace history: {}", path.display()))?;
        Ok(())
    }
}

/// Default location of the persisted log.
pub fn history_path() -> Option<PathBuf> {
    crate::config::state_dir().map(|d| d.join("history.jsonl"))
}

/// Recent commands from the shell's own history file: `$HISTFILE` when set,
/// otherwise `~/.bash_history` then `~/.zsh_history`.
pub fn read_shell_history(limit: usize) -> Vec<String> {
    let candidates: Vec<PathBuf> = std::env::var("HISTFILE")
        .ok()
        .map(PathBuf::from)
        .into_iter()
        .chain(dirs::home_dir().map(|h| h.join(".bash_history")))
        .chain(dirs::home_dir().map(|h| h.join(".zsh_history")))
        .collect();

    for path in candidates {
        if path.exists() {
            return read_history_file(&path, limit);
        }
    }
    Vec::new()
}

/// Parse a shell history file. Handles zsh extended format
/// (`: <ts>:<dur>;cmd`), skips bash timestamp comments and anything
/// mentioning `history` itself.
fn read_history_file(path: &Path, limit: usize) -> Vec<String> {
    let Ok(contents) = std::fs::read_to_string(path) else {
        log::debug!("could not read shell history: {}", path.display());
        return Vec::new();
    };

    let mut commands: Vec<String> = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let command = match line.strip_prefix(": ") {
            Some(rest) => match rest.split_once(';') {
                Some((_, cmd)) => cmd.trim(),
                None => continue,
            },
            None => line,
        };
        if command.is_empty() || command.contains("history") {
            continue;
        }
        commands.push(command.to_string());
    }

    if commands.len() > limit {
        commands.drain(..commands.len() - limit);
    }
    commands
}
