use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use std::io;

use sidekick::cli::{Cli, Commands, ConfigCommand, HookCommand};
use sidekick::config::{AiServiceConfig, Config, SERVICE_TYPES};
use sidekick::context::ContextAggregator;
use sidekick::dedup::Deduplicator;
use sidekick::history::{self, CommandEvent, HistoryTracker};
use sidekick::providers::Dispatcher;
use sidekick::{hooks, output, prompt};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Monitor {
            command,
            exit_code,
            stderr,
        } => monitor(&command, exit_code, &stderr).await,
        Commands::Ask { question } => ask(&question.join(" ")).await,
        Commands::Context => show_context().await,
        Commands::Test => test_connection().await,
        Commands::Config { action } => handle_config(action),
        Commands::Hook { action } => handle_hook(action),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "sidekick", &mut io::stdout());
            Ok(())
        }
    }
}

/// Build a dispatcher for the active service, surfacing configuration
/// problems to the caller.
fn active_dispatcher(config: &Config) -> Result<Dispatcher> {
    let service = config.active_service()?;
    service.validate()?;
    Ok(Dispatcher::from_config(service)?)
}

/// Load whatever history previous invocations persisted.
fn load_tracker() -> HistoryTracker {
    HistoryTracker::load(history::history_path().as_deref())
}

/// The shell hook entry point: record the event, gate it, analyze it.
async fn monitor(command: &str, exit_code: i32, stderr_arg: &str) -> Result<()> {
    let stderr = hooks::decode_stderr(stderr_arg);
    let event = CommandEvent::new(command, exit_code, stderr);

    let mut tracker = load_tracker();
    tracker.append(event.clone());
    if let Some(path) = history::history_path() {
        if let Err(err) = tracker.persist(&path) {
            log::debug!("failed to persist history: {err}");
        }
    }

    let config = Config::load();
    if exit_code == 0 || !config.features.auto_error_analysis || !hooks::is_hook_enabled() {
        return Ok(());
    }

    let mut dedup = Deduplicator::persistent();
    if !dedup.should_analyze(command, exit_code, history::unix_timestamp()) {
        log::debug!("suppressed duplicate analysis for: {command}");
        return Ok(());
    }

    let dispatcher = active_dispatcher(&config)?;

    println!("{}", "Analyzing the failure…".dimmed());
    let context = ContextAggregator::new(tracker).snapshot().await;
    let suggestion = dispatcher.suggest(&prompt::failure_prompt(&event, &context)).await;
    output::display_suggestion(command, &suggestion);
    Ok(())
}

/// Free-form question over the current context, bypassing the failure
/// pipeline entirely.
async fn ask(question: &str) -> Result<()> {
    let config = Config::load();
    let dispatcher = active_dispatcher(&config)?;

    let context = ContextAggregator::new(load_tracker()).snapshot().await;
    let answer = dispatcher.suggest(&prompt::question_prompt(question, &context)).await;
    output::display_answer(&answer);
    Ok(())
}

async fn show_context() -> Result<()> {
    let context = ContextAggregator::new(load_tracker()).snapshot().await;
    output::display_context(&context);
    Ok(())
}

async fn test_connection() -> Result<()> {
    let config = Config::load();
    let dispatcher = active_dispatcher(&config)?;

    println!(
        "Testing {} ({})…",
        dispatcher.provider().name(),
        dispatcher.provider().model()
    );
    let response = dispatcher
        .suggest("Reply with exactly: connection ok")
        .await;

    if response.to_lowercase().contains("connection ok") {
        println!("{} Connection test passed", "✓".green());
    } else {
        println!("{} Unexpected response: {response}", "?".yellow());
    }
    Ok(())
}

fn handle_config(action: ConfigCommand) -> Result<()> {
    match action {
        ConfigCommand::Show => {
            output::display_config(&Config::load());
        }
        ConfigCommand::Set {
            name,
            service_type,
            url,
            model,
            key,
            timeout,
        } => {
            let service = AiServiceConfig {
                service_type,
                base_url: url,
                model,
                api_key: key,
                timeout_seconds: timeout,
            };
            service.validate()?;

            let mut config = Config::load();
            config.set_service(&name, service);
            config.save()?;
            println!("{} Service `{name}` saved", "✓".green());
        }
        ConfigCommand::Use { name } => {
            let mut config = Config::load();
            config.switch_service(&name)?;
            config.save()?;
            println!("{} Active service switched to `{name}`", "✓".green());
        }
        ConfigCommand::List => {
            output::display_service_list(&Config::load());
        }
        ConfigCommand::Types => {
            println!("{}", "Supported service types".cyan().bold());
            println!();
            for (name, description) in SERVICE_TYPES {
                println!("  {:<10} {description}", name.bold());
            }
            println!();
        }
    }
    Ok(())
}

fn handle_hook(action: HookCommand) -> Result<()> {
    match action {
        HookCommand::Install { shell } => hooks::install_hook(shell),
        HookCommand::Uninstall { shell } => hooks::uninstall_hook(shell),
        HookCommand::Print { shell } => {
            hooks::print_hook_script(shell);
            Ok(())
        }
        HookCommand::Status => {
            hooks::print_hook_status();
            Ok(())
        }
        HookCommand::Enable => hooks::enable_hook(),
        HookCommand::Disable => hooks::disable_hook(),
    }
}
