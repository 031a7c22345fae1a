//! Terminal output formatting.

use colored::Colorize;

use crate::config::Config;
use crate::context::FullContext;

/// How a suggestion line should be rendered.
#[derive(Debug, PartialEq, Eq)]
enum LineKind {
    /// Code fence delimiter, dropped from output
    Fence,
    /// A line holding a single backtick-quoted command
    Command,
    /// A `**Section:**` heading
    Heading,
    /// Ordinary prose
    Text,
}

fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim();
    if trimmed.starts_with("```") {
        LineKind::Fence
    } else if trimmed.len() > 2 && trimmed.starts_with('`') && trimmed.ends_with('`') {
        LineKind::Command
    } else if trimmed.starts_with("**") {
        LineKind::Heading
    } else {
        LineKind::Text
    }
}

/// Render an AI suggestion for a failed command.
pub fn display_suggestion(command: &str, suggestion: &str) {
    println!(
        "{} {}",
        "Sidekick".cyan().bold(),
        format!("(command: {})", command.yellow())
    );

    let width = textwrap::termwidth().min(100);
    let mut in_code_block = false;

    for line in suggestion.trim().lines() {
        let trimmed = line.trim();
        match classify_line(line) {
            LineKind::Fence => in_code_block = !in_code_block,
            LineKind::Command => {
                let code = trimmed.trim_matches('`');
                println!("   {}", code.green().bold());
            }
            LineKind::Heading => println!("{}", trimmed.blue().bold()),
            LineKind::Text => {
                if trimmed.is_empty() {
                    println!();
                } else if in_code_block {
                    println!("   {}", trimmed.cyan());
                } else {
                    for wrapped in textwrap::wrap(trimmed, width.saturating_sub(3)) {
                        println!("   {wrapped}");
                    }
                }
            }
        }
    }

    println!(
        "{}",
        "Ask a follow-up with: sidekick ask \"...\"".dimmed()
    );
}

/// Render an answer to a free-form question.
pub fn display_answer(answer: &str) {
    println!("{}", "Sidekick".cyan().bold());

    let width = textwrap::termwidth().min(100);
    let mut in_code_block = false;

    for line in answer.trim().lines() {
        let trimmed = line.trim();
        match classify_line(line) {
            LineKind::Fence => in_code_block = !in_code_block,
            LineKind::Command => println!("   {}", trimmed.trim_matches('`').green().bold()),
            LineKind::Heading => println!("{}", trimmed.blue().bold()),
            LineKind::Text => {
                if in_code_block {
                    println!("   {}", trimmed.cyan());
                } else {
                    for wrapped in textwrap::wrap(line, width) {
                        println!("{wrapped}");
                    }
                }
            }
        }
    }
}

/// Render the context report with colored section headers.
pub fn display_context(context: &FullContext) {
    println!("{}", "Context Snapshot".cyan().bold());
    println!();
    for line in context.narrative().lines() {
        if line.ends_with(':') && !line.starts_with(' ') {
            println!("{}", line.blue().bold());
        } else {
            println!("{line}");
        }
    }

    let installed: Vec<&str> = context
        .tools
        .iter()
        .filter(|(_, present)| **present)
        .map(|(name, _)| name.as_str())
        .collect();
    if !installed.is_empty() {
        println!("{}", "Tools:".blue().bold());
        println!("  installed: {}", installed.join(", "));
    }

    let active: Vec<&str> = context
        .services
        .iter()
        .filter(|(_, running)| **running)
        .map(|(name, _)| name.as_str())
        .collect();
    if !active.is_empty() {
        println!("{}", "Services:".blue().bold());
        println!("  active: {}", active.join(", "));
    }
}

/// Render the current configuration, masking API keys.
pub fn display_config(config: &Config) {
    println!("{}", "Configuration".cyan().bold());
    println!();
    println!(
        "  {} {}",
        "Active service:".blue().bold(),
        config.active_ai_service
    );

    match config.active_service() {
        Ok(service) => {
            println!("  {} {}", "Type:".blue().bold(), service.service_type);
            println!("  {} {}", "Endpoint:".blue().bold(), service.base_url);
            println!("  {} {}", "Model:".blue().bold(), service.model);
            println!(
                "  {} {}",
                "API key:".blue().bold(),
                mask_key(service.api_key.as_deref())
            );
            println!(
                "  {} {}s",
                "Timeout:".blue().bold(),
                service.timeout_seconds
            );
        }
        Err(err) => println!("  {} {}", "Warning:".yellow().bold(), err),
    }

    println!(
        "  {} {}",
        "Auto analysis:".blue().bold(),
        config.features.auto_error_analysis
    );
}

/// Render the service list with an active marker.
pub fn display_service_list(config: &Config) {
    println!("{}", "AI Services".cyan().bold());
    println!();
    for (name, service) in &config.ai_services {
        let marker = if *name == config.active_ai_service {
            "*".green().bold().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "  {marker} {:<16} {} ({})",
            name, service.service_type, service.model
        );
    }
    println!();
}

fn mask_key(key: Option<&str>) -> String {
    match key {
        None => "(not set)".to_string(),
        Some(key) if key.len() <= 8 => "****".to_string(),
        Some(key) => {
            let prefix: String = key.chars().take(8).collect();
            format!("{prefix}…")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_line() {
        assert_eq!(classify_line("```bash"), LineKind::Fence);
        assert_eq!(classify_line("`npm install express`"), LineKind::Command);
        assert_eq!(classify_line("**Cause:** missing module"), LineKind::Heading);
        assert_eq!(classify_line("plain explanation text"), LineKind::Text);
        assert_eq!(classify_line(""), LineKind::Text);
        // A lone backtick pair is too short to be a command.
        assert_eq!(classify_line("``"), LineKind::Text);
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key(None), "(not set)");
        assert_eq!(mask_key(Some("short")), "****");
        assert_eq!(mask_key(Some("sk-1234567890abcdef")), "sk-12345…");
    }
}
