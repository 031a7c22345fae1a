//! Command-line interface definitions for the `sidekick` tool.

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Terminal AI companion that diagnoses failed shell commands
#[derive(Parser, Debug)]
#[command(name = "sidekick", version, about, long_about = None)]
#[command(
    after_help = "EXAMPLES:\n    sidekick ask \"how do I free disk space?\"\n    sidekick context\n    sidekick hook install zsh"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a completed command (invoked by the shell hook)
    #[command(hide = true)]
    Monitor {
        /// The command that ran
        #[arg(allow_hyphen_values = true)]
        command: String,

        /// Its exit code
        #[arg(allow_hyphen_values = true)]
        exit_code: i32,

        /// Captured stderr, base64-encoded (raw text tolerated)
        #[arg(default_value = "", allow_hyphen_values = true)]
        stderr: String,
    },

    /// Ask a question using the current session context
    Ask {
        /// The question, in as many words as needed
        #[arg(required = true)]
        question: Vec<String>,
    },

    /// Show the full context snapshot
    Context,

    /// Test the connection to the active AI service
    Test,

    /// Inspect and edit AI service configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },

    /// Manage the shell hook
    Hook {
        #[command(subcommand)]
        action: HookCommand,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the current configuration
    Show,

    /// Add or update a named AI service
    Set {
        /// Service name
        name: String,

        /// Service type (openai, ollama, anthropic, custom)
        #[arg(long = "type")]
        service_type: String,

        /// Endpoint URL
        #[arg(long)]
        url: String,

        /// Model identifier
        #[arg(long)]
        model: String,

        /// API key, when the service needs one
        #[arg(long)]
        key: Option<String>,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },

    /// Switch the active AI service
    Use {
        /// Name of a configured service
        name: String,
    },

    /// List configured services
    List,

    /// List supported service types
    Types,
}

#[derive(Subcommand, Debug)]
pub enum HookCommand {
    /// Install the hook into the shell startup file
    Install {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Remove the hook from the shell startup file
    Uninstall {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print the hook script to stdout
    Print {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show hook and installation status
    Status,

    /// Turn automatic analysis back on
    Enable,

    /// Turn automatic analysis off without uninstalling
    Disable,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parses_monitor_positionals() {
        let cli = Cli::parse_from(["sidekick", "monitor", "npm start", "1", "ZXJyb3I="]);
        match cli.command {
            Commands::Monitor {
                command,
                exit_code,
                stderr,
            } => {
                assert_eq!(command, "npm start");
                assert_eq!(exit_code, 1);
                assert_eq!(stderr, "ZXJyb3I=");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_monitor_stderr_defaults_empty() {
        let cli = Cli::parse_from(["sidekick", "monitor", "ls /missing", "2"]);
        match cli.command {
            Commands::Monitor { stderr, .. } => assert_eq!(stderr, ""),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_multiline_monitor_command() {
        let cli = Cli::parse_from(["sidekick", "monitor", "echo 'a\nb'", "1"]);
        match cli.command {
            Commands::Monitor { command, .. } => assert!(command.contains('\n')),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_ask_words() {
        let cli = Cli::parse_from(["sidekick", "ask", "how", "do", "I", "exit", "vim"]);
        match cli.command {
            Commands::Ask { question } => {
                assert_eq!(question.join(" "), "how do I exit vim");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_ask_requires_a_question() {
        assert!(Cli::try_parse_from(["sidekick", "ask"]).is_err());
    }

    #[test]
    fn test_cli_parses_config_set() {
        let cli = Cli::parse_from([
            "sidekick", "config", "set", "work", "--type", "anthropic", "--url",
            "https://api.anthropic.com/v1/messages", "--model", "claude-sonnet-4-20250514",
            "--key", "sk-test", "--timeout", "60",
        ]);
        match cli.command {
            Commands::Config {
                action:
                    ConfigCommand::Set {
                        name,
                        service_type,
                        url,
                        model,
                        key,
                        timeout,
                    },
            } => {
                assert_eq!(name, "work");
                assert_eq!(service_type, "anthropic");
                assert!(url.contains("anthropic.com"));
                assert_eq!(model, "claude-sonnet-4-20250514");
                assert_eq!(key.as_deref(), Some("sk-test"));
                assert_eq!(timeout, 60);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_hook_install_zsh() {
        let cli = Cli::parse_from(["sidekick", "hook", "install", "zsh"]);
        match cli.command {
            Commands::Hook {
                action: HookCommand::Install { shell },
            } => assert_eq!(shell, Shell::Zsh),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_completions() {
        let cli = Cli::parse_from(["sidekick", "completions", "bash"]);
        match cli.command {
            Commands::Completions { shell } => assert_eq!(shell, Shell::Bash),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
