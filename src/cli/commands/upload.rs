//! Upload command: chunk a review file and store it in the collection.

use crate::chunking::flatten_line_breaks;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::{bail, Context, Result};
use std::path::Path;

/// Run the upload command.
pub async fn run_upload(file: &str, flatten: bool, settings: Settings) -> Result<()> {
    let path = Path::new(file);
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let text = if flatten { flatten_line_breaks(&raw) } else { raw };
    if text.trim().is_empty() {
        bail!("{} contains no reviews", path.display());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let chunks = orchestrator.chunker().split(&text);

    Output::info(&format!(
        "Uploading {} chunks into '{}'",
        chunks.len(),
        orchestrator.vector_store().collection()
    ));

    let pb = Output::progress_bar(chunks.len() as u64, "chunks stored");
    let result = orchestrator
        .ingest_chunks_with_progress(&chunks, |stored| pb.set_position(stored as u64))
        .await;

    match result {
        Ok(report) => {
            pb.finish_and_clear();
            Output::success(&format!(
                "Stored {} chunks in {} batches",
                report.documents_processed, report.batches
            ));
            Ok(())
        }
        Err(e) => {
            pb.abandon();
            Output::error(&format!("Upload stopped: {}", e));
            Output::warning("Batches stored before the failure were kept.");
            Err(e.into())
        }
    }
}
