//! Duplicate failure suppression.
//!
//! A failure is keyed by `command_exitcode`; the same key within a short
//! window is analyzed once. Because every analysis runs in a fresh process,
//! the window only works across invocations when backed by the state file —
//! the store is pluggable so the in-memory variant stays available for
//! embedding and tests.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Seconds during which a repeated identical failure is suppressed.
pub const DEDUP_WINDOW_SECS: f64 = 5.0;

/// Exit code produced by Ctrl-C; treated as an explicit skip.
pub const INTERRUPT_EXIT_CODE: i32 = 130;

const BIN_NAME: &str = env!("CARGO_PKG_NAME");

/// Shell builtins that fail constantly inside scripts and never want
/// analysis.
const BUILTIN_PREFIXES: &[&str] = &["return", "local", "set", "export"];

/// True for commands the pipeline must never analyze: shell builtins, our
/// own monitor invocations and anything touching `history`. The generated
/// hook script applies the same filter; keep the two lists in sync.
pub fn is_internal_command(command: &str) -> bool {
    let trimmed = command.trim();
    if BUILTIN_PREFIXES
        .iter()
        .any(|p| trimmed == *p || trimmed.starts_with(&format!("{p} ")))
    {
        return true;
    }
    if trimmed.contains("history") {
        return true;
    }
    if trimmed.contains(BIN_NAME) && trimmed.contains("monitor") {
        return true;
    }
    trimmed.contains("__sidekick_")
}

/// Last accepted analysis key and when it was accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DedupState {
    pub last_key: Option<String>,
    pub last_timestamp: f64,
}

/// Storage for the dedup window. `MemoryStore` lives and dies with the
/// process; `FileStore` survives per-command process spawns.
pub trait DedupStore {
    fn load(&self) -> DedupState;
    fn save(&mut self, state: &DedupState);
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: DedupState,
}

impl DedupStore for MemoryStore {
    fn load(&self) -> DedupState {
        self.state.clone()
    }

    fn save(&mut self, state: &DedupState) {
        self.state = state.clone();
    }
}

/// State-file store using temp-file + atomic rename. Failures degrade to an
/// empty state: worst case a duplicate gets re-analyzed.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl DedupStore for FileStore {
    fn load(&self) -> DedupState {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default()
    }

    fn save(&mut self, state: &DedupState) {
        let write = || -> anyhow::Result<()> {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let tmp = self.path.with_extension("tmp");
            std::fs::write(&tmp, serde_json::to_string(state)?)?;
            std::fs::rename(&tmp, &self.path)?;
            Ok(())
        };
        if let Err(err) = write() {
            log::debug!("failed to save dedup state: {err}");
        }
    }
}

/// Default location of the dedup state file.
pub fn dedup_state_path() -> Option<PathBuf> {
    crate::config::state_dir().map(|d| d.join("dedup.json"))
}

/// Gate deciding whether a failure should reach the AI backend.
pub struct Deduplicator {
    store: Box<dyn DedupStore>,
}

impl Deduplicator {
    /// Process-local deduplicator.
    pub fn new() -> Self {
        Self::with_store(Box::new(MemoryStore::default()))
    }

    /// Deduplicator backed by an explicit store (the monitor pipeline passes
    /// a `FileStore` here so the window spans invocations).
    pub fn with_store(store: Box<dyn DedupStore>) -> Self {
        Self { store }
    }

    /// Backed by the default state file, falling back to memory when no
    /// state directory is available.
    pub fn persistent() -> Self {
        match dedup_state_path() {
            Some(path) => Self::with_store(Box::new(FileStore::new(path))),
            None => Self::new(),
        }
    }

    /// Decide whether `(command, exit_code)` at time `now` warrants a fresh
    /// analysis. Accepting updates the stored key and timestamp before
    /// returning.
    pub fn should_analyze(&mut self, command: &str, exit_code: i32, now: f64) -> bool {
        if exit_code == INTERRUPT_EXIT_CODE {
            return false;
        }
        if is_internal_command(command) {
            return false;
        }

        let key = format!("{command}_{exit_code}");
        let state = self.store.load();
        if state.last_key.as_deref() == Some(key.as_str())
            && now - state.last_timestamp < DEDUP_WINDOW_SECS
        {
            return false;
        }

        self.store.save(&DedupState {
            last_key: Some(key),
            last_timestamp: now,
        });
        true
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new()
    }
}
