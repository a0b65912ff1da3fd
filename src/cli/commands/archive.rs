//! Archive command implementation.

use crate::cli::{format_size, Output};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::source;
use anyhow::Result;
use std::path::PathBuf;

/// Run the archive command.
pub async fn run_archive(url: &str, output: Option<String>, settings: Settings) -> Result<()> {
    let identity = source::resolve(url)?.identity;
    let orchestrator = Orchestrator::new(settings)?;

    let count = orchestrator.snippets(url).await?.len();
    if count == 0 {
        Output::warning("No clips ready for this URL; the archive will be empty.");
    }

    let bytes = orchestrator.archive(url).await?;
    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("{}.zip", identity)));
    tokio::fs::write(&path, &bytes).await?;

    Output::success(&format!(
        "Wrote {} clips to {} ({})",
        count,
        path.display(),
        format_size(bytes.len() as u64)
    ));
    Ok(())
}
