//! Interactive chat command.
//!
//! Each session gets its own conversation id, so turns build on each other
//! exactly as they would through the HTTP API.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Run the interactive chat command.
pub async fn run_chat(settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    let conversation = uuid::Uuid::new_v4().to_string();
    debug!("Chat session {}", conversation);

    println!("\n{}", style("Opina Chat").bold().cyan());
    println!(
        "{}\n",
        style("Ask about your reviews, or 'exit' to quit. Use 'clear' to reset the conversation and 'history' to review it.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            orchestrator.clear_history(&conversation).await;
            Output::info("Conversation history cleared.");
            continue;
        }

        if input.eq_ignore_ascii_case("history") {
            let history = orchestrator.history(&conversation).await;
            if history.is_empty() {
                Output::info("No messages yet.");
            }
            for message in &history {
                Output::history_message(&message.role.to_string(), &message.content);
            }
            continue;
        }

        match orchestrator.ask(&conversation, input).await {
            Ok(answer) => {
                println!("\n{} {}\n", style("Opina:").cyan().bold(), answer.answer);
                if !answer.is_empty() {
                    let ids: Vec<&str> = answer
                        .sources
                        .iter()
                        .map(|s| s.document_id.as_str())
                        .collect();
                    println!("{}\n", style(format!("sources: {}", ids.join(", "))).dim());
                }
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
