//! Ask command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::conversation::DEFAULT_CONVERSATION;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ask command. Each invocation is a fresh process, so there is no
/// earlier history to continue.
pub async fn run_ask(question: &str, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching reviews...");

    match orchestrator.ask(DEFAULT_CONVERSATION, question).await {
        Ok(answer) => {
            spinner.finish_and_clear();

            println!("\n{}\n", answer.answer);

            if !answer.is_empty() {
                Output::header("Sources");
                for source in &answer.sources {
                    Output::search_result(
                        &source.document_id,
                        source.similarity_score,
                        &source.content_snippet,
                    );
                }
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
