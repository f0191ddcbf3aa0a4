//! Search command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching...");
    let outcome = orchestrator.search(query).await;
    spinner.finish_and_clear();

    match outcome {
        Ok(outcome) => {
            if outcome.results.is_empty() {
                Output::warning("No reviews found matching your query.");
            } else {
                Output::success(&format!("Found {} results", outcome.total_results));

                for result in &outcome.results {
                    Output::search_result(
                        &result.document_id,
                        result.similarity_score,
                        &result.content_snippet,
                    );
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
