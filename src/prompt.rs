//! Prompt construction for the AI backend.
//!
//! Pure templating over a snapshot plus either a failure record or a
//! free-form question. Identical input yields a byte-identical prompt.

use std::fmt::Write as _;

use crate::context::FullContext;
use crate::history::CommandEvent;
use crate::patterns::top_activities;

/// How many trailing commands the prompt shows as a sequence.
const SEQUENCE_LIMIT: usize = 5;

/// How many activity categories the prompt lists.
const ACTIVITY_LIMIT: usize = 3;

fn activity_block(context: &FullContext) -> String {
    let mut block = String::new();

    let recent = &context.recent_commands;
    if !recent.is_empty() {
        let start = recent.len().saturating_sub(SEQUENCE_LIMIT);
        writeln!(
            block,
            "Recent command sequence: {}",
            recent[start..].join(" → ")
        )
        .ok();
    }

    let top = top_activities(&context.activity_counts, ACTIVITY_LIMIT);
    if !top.is_empty() {
        let formatted: Vec<String> = top
            .iter()
            .map(|(name, count)| format!("{name}({count})"))
            .collect();
        writeln!(block, "Recent activity: {}", formatted.join(", ")).ok();
    }

    writeln!(block, "Current intent: {}", context.intent).ok();
    block
}

/// Render the diagnosis prompt for a failed command.
pub fn failure_prompt(event: &CommandEvent, context: &FullContext) -> String {
    let stderr = if event.stderr.trim().is_empty() {
        "(none)"
    } else {
        event.stderr.trim()
    };

    format!(
        "You are a terminal assistant that diagnoses failed shell commands. \
Answer concisely and practically.\n\
\n\
{narrative}\n\
{activity}\n\
The last command failed:\n\
Command: {command}\n\
Exit code: {exit_code}\n\
Stderr: {stderr}\n\
\n\
Respond in this format:\n\
\n\
**Cause:** [why the command failed, given the environment and recent activity]\n\
\n\
**Fix:**\n\
[one or two concrete commands that fix the problem]\n\
\n\
**Next steps:** [what the user is likely to need next, given their workflow]\n",
        narrative = context.narrative(),
        activity = activity_block(context),
        command = event.command,
        exit_code = event.exit_code,
        stderr = stderr,
    )
}

/// Render the free-form question prompt.
pub fn question_prompt(question: &str, context: &FullContext) -> String {
    format!(
        "You are a terminal assistant. Answer concisely and practically.\n\
\n\
Context: {summary}\n\
{activity}\n\
Question: {question}\n\
\n\
Ground your answer in the current environment and recent activity when \
relevant, and prefer concrete commands over prose.\n",
        summary = context.summary(),
        activity = activity_block(context),
        question = question.trim(),
    )
}
