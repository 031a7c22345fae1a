//! Shell hook integration: capture failing commands and hand them to the
//! analyzer.
//!
//! The generated script runs inside the interactive shell and implements a
//! two-state loop: idle until a foreground command completes, reporting when
//! the exit status is nonzero and not Ctrl-C. Reporting recovers whatever
//! stderr the tee redirect caught (falling back to a command-not-found
//! heuristic), base64-encodes it so it survives the argv boundary, invokes
//! `sidekick monitor`, and returns to idle no matter what the analysis did.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use clap_complete::Shell;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Path to the hook enabled state file
fn hook_state_path() -> Option<PathBuf> {
    crate::config::state_dir().map(|d| d.join("hook_enabled"))
}

/// Check if hooks are enabled
pub fn is_hook_enabled() -> bool {
    // Environment variable takes precedence
    if std::env::var("SIDEKICK_HOOK_DISABLE")
        .map(|v| v == "1")
        .unwrap_or(false)
    {
        return false;
    }

    // Check state file (default: enabled)
    if let Some(state_path) = hook_state_path() {
        if state_path.exists() {
            return std::fs::read_to_string(state_path)
                .map(|s| s.trim() != "0")
                .unwrap_or(true);
        }
    }

    true
}

fn write_hook_state(value: &str) -> Result<()> {
    let state_dir = crate::config::state_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine state directory"))?;

    std::fs::create_dir_all(&state_dir)
        .with_context(|| format!("Failed to create state directory: {}", state_dir.display()))?;

    let state_path = state_dir.join("hook_enabled");
    std::fs::write(&state_path, value)
        .with_context(|| format!("Failed to write state file: {}", state_path.display()))?;
    Ok(())
}

/// Enable hook functionality
pub fn enable_hook() -> Result<()> {
    write_hook_state("1\n")?;
    println!("{} Shell hook enabled", "✓".green());
    println!();
    println!("  Failing commands will be analyzed automatically.");
    println!(
        "  To disable temporarily: {}",
        "export SIDEKICK_HOOK_DISABLE=1".cyan()
    );
    println!();
    Ok(())
}

/// Disable hook functionality
pub fn disable_hook() -> Result<()> {
    write_hook_state("0\n")?;
    println!("{} Shell hook disabled", "✓".green());
    println!();
    println!("  To re-enable: {}", "sidekick hook enable".cyan());
    println!();
    Ok(())
}

/// Marker comments for detecting existing hook installations
pub const HOOK_MARKER_START: &str = "# >>> sidekick shell hook >>>";
pub const HOOK_MARKER_END: &str = "# <<< sidekick shell hook <<<";

/// Get the shell config file path for a given shell
pub fn get_shell_config_path(shell: Shell) -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    match shell {
        Shell::Bash => Some(home.join(".bashrc")),
        Shell::Zsh => Some(home.join(".zshrc")),
        Shell::Fish => {
            dirs::config_dir().map(|p| p.join("fish").join("conf.d").join("sidekick.fish"))
        }
        _ => None,
    }
}

/// Generate the hook script for a given shell
pub fn generate_hook_script(shell: Shell) -> &'static str {
    match shell {
        Shell::Bash => {
            r#"# sidekick shell hook - reports failing commands for AI diagnosis
__sidekick_stderr_file="/tmp/sidekick_stderr_$$"
__sidekick_last_cmd=""

# Capture stderr while still displaying it
exec 2> >(tee -a "$__sidekick_stderr_file" >&2)

__sidekick_preexec() {
    __sidekick_last_cmd="$1"
    # Clear stderr capture file before each command
    : > "$__sidekick_stderr_file" 2>/dev/null
}

__sidekick_report() {
    local exit_code=$?
    if [[ $exit_code -ne 0 && $exit_code -ne 130 && -n "$__sidekick_last_cmd" ]]; then
        # Same filter list the analyzer applies: own invocations and history
        case "$__sidekick_last_cmd" in
            *__sidekick_*|*"sidekick monitor"*|*history*)
                __sidekick_last_cmd=""
                return
                ;;
        esac
        local output=""
        if [[ -f "$__sidekick_stderr_file" && -s "$__sidekick_stderr_file" ]]; then
            output=$(tail -100 "$__sidekick_stderr_file" 2>/dev/null)
        fi
        if [[ -z "$output" ]]; then
            local prog="${__sidekick_last_cmd%% *}"
            if ! command -v "$prog" >/dev/null 2>&1; then
                output="$prog: command not found"
            fi
        fi
        local encoded=""
        if [[ -n "$output" ]]; then
            encoded=$(printf '%s' "$output" | base64 -w 0 2>/dev/null || printf '%s' "$output")
        fi
        sidekick monitor "$__sidekick_last_cmd" "$exit_code" "$encoded" 2>/dev/null
    fi
    __sidekick_last_cmd=""
}

trap '__sidekick_preexec "$BASH_COMMAND"' DEBUG
PROMPT_COMMAND="__sidekick_report${PROMPT_COMMAND:+;$PROMPT_COMMAND}"

# Cleanup on exit
trap 'rm -f "$__sidekick_stderr_file" 2>/dev/null' EXIT
"#
        }
        Shell::Zsh => {
            r#"# sidekick shell hook - reports failing commands for AI diagnosis
__sidekick_stderr_file="/tmp/sidekick_stderr_$$"
__sidekick_last_cmd=""

# Capture stderr while still displaying it
exec 2> >(tee -a "$__sidekick_stderr_file" >&2)

__sidekick_preexec() {
    __sidekick_last_cmd="$1"
    # Clear stderr capture file before each command
    : > "$__sidekick_stderr_file" 2>/dev/null
}

__sidekick_precmd() {
    local exit_code=$?
    if [[ $exit_code -ne 0 && $exit_code -ne 130 && -n "$__sidekick_last_cmd" ]]; then
        # Same filter list the analyzer applies: own invocations and history
        case "$__sidekick_last_cmd" in
            *__sidekick_*|*"sidekick monitor"*|*history*)
                __sidekick_last_cmd=""
                return
                ;;
        esac
        local output=""
        if [[ -f "$__sidekick_stderr_file" && -s "$__sidekick_stderr_file" ]]; then
            output=$(tail -100 "$__sidekick_stderr_file" 2>/dev/null)
        fi
        if [[ -z "$output" ]]; then
            local prog="${__sidekick_last_cmd%% *}"
            if ! command -v "$prog" >/dev/null 2>&1; then
                output="$prog: command not found"
            fi
        fi
        local encoded=""
        if [[ -n "$output" ]]; then
            encoded=$(printf '%s' "$output" | base64 -w 0 2>/dev/null || printf '%s' "$output")
        fi
        sidekick monitor "$__sidekick_last_cmd" "$exit_code" "$encoded" 2>/dev/null
    fi
    __sidekick_last_cmd=""
}

autoload -Uz add-zsh-hook
add-zsh-hook preexec __sidekick_preexec
add-zsh-hook precmd __sidekick_precmd

# Cleanup on exit
trap 'rm -f "$__sidekick_stderr_file" 2>/dev/null' EXIT
"#
        }
        Shell::Fish => {
            r#"# sidekick shell hook - reports failing commands for AI diagnosis
set -g __sidekick_stderr_file "/tmp/sidekick_stderr_"(echo %self)

function __sidekick_preexec --on-event fish_preexec
    # Clear stderr capture file before each command
    echo -n > $__sidekick_stderr_file 2>/dev/null
end

function __sidekick_postexec --on-event fish_postexec
    set -l exit_code $status
    if test $exit_code -ne 0 -a $exit_code -ne 130
        switch "$argv"
            case '*__sidekick_*' '*sidekick monitor*' '*history*'
                return
        end
        set -l output ""
        if test -f $__sidekick_stderr_file -a -s $__sidekick_stderr_file
            set output (tail -100 $__sidekick_stderr_file 2>/dev/null | string collect)
        end
        if test -z "$output"
            set -l prog (string split ' ' -- "$argv")[1]
            if not command -v $prog >/dev/null 2>&1
                set output "$prog: command not found"
            end
        end
        set -l encoded ""
        if test -n "$output"
            set encoded (printf '%s' "$output" | base64 -w 0 2>/dev/null; or printf '%s' "$output")
        end
        sidekick monitor "$argv" $exit_code "$encoded" 2>/dev/null
    end
end

# Cleanup on exit
function __sidekick_cleanup --on-event fish_exit
    rm -f $__sidekick_stderr_file 2>/dev/null
end
"#
        }
        _ => "",
    }
}

/// Generate the hook code wrapped with markers
pub fn generate_hook_with_markers(shell: Shell) -> String {
    let mut output = String::new();
    output.push_str(HOOK_MARKER_START);
    output.push('\n');
    output.push_str(generate_hook_script(shell));
    output.push_str(HOOK_MARKER_END);
    output.push('\n');
    output
}

/// Check if hooks are already installed in a config file
pub fn hooks_already_installed(config_path: &Path) -> bool {
    if let Ok(contents) = std::fs::read_to_string(config_path) {
        contents.contains(HOOK_MARKER_START)
    } else {
        false
    }
}

/// Append the marker-delimited hook block to a config file. Returns false
/// when a matching block is already present (nothing written).
pub fn install_into(config_path: &Path, shell: Shell) -> Result<bool> {
    if hooks_already_installed(config_path) {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut content = std::fs::read_to_string(config_path).unwrap_or_default();

    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push('\n');
    content.push_str(&generate_hook_with_markers(shell));

    std::fs::write(config_path, content)
        .with_context(|| format!("Failed to write to: {}", config_path.display()))?;
    Ok(true)
}

/// Remove the marker-delimited hook block from a config file. Returns false
/// when no block was found.
pub fn uninstall_from(config_path: &Path) -> Result<bool> {
    if !config_path.exists() || !hooks_already_installed(config_path) {
        return Ok(false);
    }

    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read: {}", config_path.display()))?;

    let mut new_content = String::new();
    let mut in_hook_block = false;

    for line in content.lines() {
        if line.trim() == HOOK_MARKER_START {
            in_hook_block = true;
            continue;
        }
        if line.trim() == HOOK_MARKER_END {
            in_hook_block = false;
            continue;
        }
        if !in_hook_block {
            new_content.push_str(line);
            new_content.push('\n');
        }
    }

    while new_content.ends_with("\n\n\n") {
        new_content.pop();
    }

    std::fs::write(config_path, new_content)
        .with_context(|| format!("Failed to write to: {}", config_path.display()))?;
    Ok(true)
}

/// Install hook integration into the user's shell config file
pub fn install_hook(shell: Shell) -> Result<()> {
    let config_path = get_shell_config_path(shell)
        .ok_or_else(|| anyhow::anyhow!("Could not determine config path for {}", shell))?;

    if !install_into(&config_path, shell)? {
        println!(
            "{} Sidekick hook is already installed in {}",
            "✓".green(),
            config_path.display()
        );
        return Ok(());
    }

    println!(
        "{} {}",
        "✓".green(),
        "Sidekick shell hook installed".green().bold()
    );
    println!();
    println!(
        "  {} {}",
        "Config file:".blue().bold(),
        config_path.display()
    );
    println!();
    println!("  {} To activate, run:", "Next steps:".yellow().bold());
    match shell {
        Shell::Bash => println!("    source ~/.bashrc"),
        Shell::Zsh => println!("    source ~/.zshrc"),
        Shell::Fish => println!("    source {}", config_path.display()),
        _ => {}
    }
    println!();
    println!("  Or open a new terminal session.");
    println!();

    Ok(())
}

/// Uninstall hook integration from the user's shell config file
pub fn uninstall_hook(shell: Shell) -> Result<()> {
    let config_path = get_shell_config_path(shell)
        .ok_or_else(|| anyhow::anyhow!("Could not determine config path for {}", shell))?;

    if !uninstall_from(&config_path)? {
        println!(
            "{} Sidekick hook is not installed in {}",
            "?".yellow(),
            config_path.display()
        );
        return Ok(());
    }

    println!(
        "{} {}",
        "✓".green(),
        "Sidekick shell hook uninstalled".green().bold()
    );
    println!();
    println!("  Restart your terminal or source the config file to apply changes.");
    println!();
    Ok(())
}

/// Print hook status
pub fn print_hook_status() {
    let enabled = is_hook_enabled();
    let env_disabled = std::env::var("SIDEKICK_HOOK_DISABLE")
        .map(|v| v == "1")
        .unwrap_or(false);

    println!("{}", "Shell Hook Status".bold());
    println!();

    if enabled {
        println!("  {} {}", "Status:".blue().bold(), "Enabled".green().bold());
    } else {
        println!("  {} {}", "Status:".blue().bold(), "Disabled".red().bold());
    }

    if env_disabled {
        println!(
            "  {} {} (SIDEKICK_HOOK_DISABLE=1)",
            "Env override:".blue().bold(),
            "Disabled".red()
        );
    }

    println!();
    println!("{}", "Installation Status".bold());
    println!();

    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
        if let Some(config_path) = get_shell_config_path(shell) {
            let installed = hooks_already_installed(&config_path);
            let status = if installed {
                "Installed".green().to_string()
            } else {
                "Not installed".dimmed().to_string()
            };
            println!(
                "  {:<12} {} ({})",
                format!("{:?}:", shell),
                status,
                config_path.display()
            );
        }
    }
    println!();
}

/// Print the hook script to stdout
pub fn print_hook_script(shell: Shell) {
    print!("{}", generate_hook_with_markers(shell));
}

/// Encode captured stderr so it survives being passed as a single process
/// argument across the shell boundary.
pub fn encode_stderr(text: &str) -> String {
    BASE64_STANDARD.encode(text.as_bytes())
}

/// Decode the stderr argument of the monitor entry point. Anything that does
/// not decode as base64 UTF-8 is treated as already-decoded text.
pub fn decode_stderr(arg: &str) -> String {
    if arg.is_empty() {
        return String::new();
    }
    match BASE64_STANDARD.decode(arg.trim()) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => arg.to_string(),
        },
        Err(_) => arg.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        let samples = [
            "simple error",
            "multi\nline\nerror",
            "quotes \"double\" and 'single'",
            "null byte \0 embedded",
            "bash: foo: command not found\n",
            "unicode: ファイルが見つかりません",
        ];
        for sample in samples {
            let encoded = encode_stderr(sample);
            assert!(!encoded.contains('\n'));
            assert_eq!(decode_stderr(&encoded), sample);
        }
    }

    #[test]
    fn test_decode_raw_text_fallback() {
        // Not valid base64: treated as already-decoded text.
        let raw = "bash: foo: command not found";
        assert_eq!(decode_stderr(raw), raw);
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(decode_stderr(""), "");
    }

    #[test]
    fn test_decode_tolerates_trailing_newline() {
        let encoded = format!("{}\n", encode_stderr("error text"));
        assert_eq!(decode_stderr(&encoded), "error text");
    }

    #[test]
    fn test_hook_scripts_skip_interrupt_and_filter_self() {
        for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
            let script = generate_hook_script(shell);
            assert!(script.contains("130"), "{shell:?} must skip Ctrl-C");
            assert!(script.contains("sidekick monitor"));
            assert!(script.contains("history"));
            assert!(script.contains("base64 -w 0"));
            assert!(script.contains("command not found"));
        }
    }

    #[test]
    fn test_install_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join(".bashrc");
        std::fs::write(&rc, "export PATH=$PATH:/opt/bin\n").unwrap();

        assert!(install_into(&rc, Shell::Bash).unwrap());
        assert!(hooks_already_installed(&rc));
        // Second install is a no-op.
        assert!(!install_into(&rc, Shell::Bash).unwrap());

        let contents = std::fs::read_to_string(&rc).unwrap();
        assert_eq!(contents.matches(HOOK_MARKER_START).count(), 1);
        assert!(contents.starts_with("export PATH"));
    }

    #[test]
    fn test_uninstall_removes_block_and_keeps_rest() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join(".zshrc");
        std::fs::write(&rc, "alias ll='ls -la'\n").unwrap();

        install_into(&rc, Shell::Zsh).unwrap();
        assert!(uninstall_from(&rc).unwrap());

        let contents = std::fs::read_to_string(&rc).unwrap();
        assert!(!contents.contains(HOOK_MARKER_START));
        assert!(!contents.contains("__sidekick_precmd"));
        assert!(contents.contains("alias ll='ls -la'"));

        // Nothing left to remove.
        assert!(!uninstall_from(&rc).unwrap());
    }

    #[test]
    fn test_install_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join("conf.d").join("sidekick.fish");

        assert!(install_into(&rc, Shell::Fish).unwrap());
        assert!(hooks_already_installed(&rc));
    }
}
