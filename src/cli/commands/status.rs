//! Status command implementation.

use crate::cli::{format_timestamp, Output};
use crate::config::Settings;
use crate::jobs::SnippetState;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the status command.
pub async fn run_status(url: &str, json: bool, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    let Some(job) = orchestrator.job(url).await? else {
        Output::info("No job for this URL. Use 'chapsplit process <url>' to start one.");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&job)?);
        return Ok(());
    }

    Output::header(job.title.as_deref().unwrap_or(job.identity.as_str()));
    println!();
    Output::kv("Identity", job.identity.as_str());
    Output::kv("Source", &job.source_url);
    Output::kv("Status", &Output::status_style(job.status).to_string());
    Output::kv("Directory", &job.output_dir.display().to_string());
    if let Some(failure) = &job.failure {
        Output::kv("Failure", &format!("{}: {}", failure.kind, failure.message));
    }

    if !job.snippets.is_empty() {
        println!();
        for snippet in &job.snippets {
            let state = match &snippet.state {
                SnippetState::Ready => "ready".to_string(),
                SnippetState::Pending => "pending".to_string(),
                SnippetState::Failed { kind, .. } => format!("failed ({})", kind),
            };
            Output::list_item(&format!(
                "{} {} [{}] {}",
                snippet.file_name,
                format_timestamp(snippet.chapter.start_seconds),
                format_timestamp(snippet.chapter.duration()),
                state
            ));
        }
    }

    Ok(())
}
