//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(url: Option<&str>, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    match url {
        Some(url) => list_snippets(&orchestrator, url).await,
        None => list_jobs(&orchestrator).await,
    }
}

async fn list_snippets(orchestrator: &Orchestrator, url: &str) -> Result<()> {
    let entries = orchestrator.snippets(url).await?;
    if entries.is_empty() {
        Output::info("No clips ready for this URL.");
        return Ok(());
    }

    Output::header(&format!("Clips ({})", entries.len()));
    println!();
    for entry in &entries {
        Output::snippet_info(
            entry.index + 1,
            &entry.title,
            entry.start_seconds,
            entry.end_seconds,
            &entry.locator,
        );
    }

    Ok(())
}

async fn list_jobs(orchestrator: &Orchestrator) -> Result<()> {
    let jobs = orchestrator.list_jobs().await?;
    if jobs.is_empty() {
        Output::info("No jobs yet. Use 'chapsplit process <url>' to add one.");
        return Ok(());
    }

    Output::header(&format!("Jobs ({})", jobs.len()));
    println!();
    for job in &jobs {
        Output::job_info(
            job.title.as_deref().unwrap_or("(untitled)"),
            job.identity.as_str(),
            job.status,
            job.ready_count(),
            job.chapters.len(),
        );
    }

    let total_clips: usize = jobs.iter().map(|j| j.ready_count()).sum();
    println!();
    Output::kv("Total jobs", &jobs.len().to_string());
    Output::kv("Total clips", &total_clips.to_string());

    Ok(())
}
