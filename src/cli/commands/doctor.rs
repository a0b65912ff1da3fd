//! Doctor command - verify system requirements and configuration.

use crate::cli::preflight::{required_tools, tool_version};
use crate::cli::{format_size, Output};
use crate::config::Settings;
use console::style;
use std::path::Path;

#[derive(Debug, PartialEq)]
enum Level {
    Ok,
    Warning,
    Error,
}

/// Outcome of one check.
#[derive(Debug)]
struct Check {
    name: String,
    level: Level,
    message: String,
    hint: Option<&'static str>,
}

impl Check {
    fn new(level: Level, name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            level,
            message: message.into(),
            hint: None,
        }
    }

    fn hint(mut self, hint: &'static str) -> Self {
        self.hint = Some(hint);
        self
    }

    fn print(&self) {
        let icon = match self.level {
            Level::Ok => style("✓").green(),
            Level::Warning => style("!").yellow(),
            Level::Error => style("✗").red(),
        };
        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);
        if let Some(hint) = self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("chapsplit doctor");
    println!();

    let [fetcher, encoder, prober] = required_tools(settings);
    let sections = [
        (
            "External Tools",
            vec![
                check_tool(fetcher, install_hint_ytdlp()),
                check_tool(encoder, install_hint_ffmpeg()),
                check_tool(prober, install_hint_ffmpeg()),
            ],
        ),
        ("Directories", check_directories(settings)),
        ("Configuration", vec![check_config_file(), check_settings(settings)]),
    ];

    let mut errors = 0;
    let mut warnings = 0;
    for (title, checks) in &sections {
        println!("{}", style(title).bold());
        for check in checks {
            check.print();
            match check.level {
                Level::Error => errors += 1,
                Level::Warning => warnings += 1,
                Level::Ok => {}
            }
        }
        println!();
    }

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before processing videos.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! chapsplit is ready to use.");
    }

    Ok(())
}

fn check_tool(name: &str, hint: &'static str) -> Check {
    match tool_version(name) {
        Ok(version) => {
            let version: String = version.chars().take(50).collect();
            Check::new(Level::Ok, name, version)
        }
        Err(e) => Check::new(Level::Error, name, e.to_string()).hint(hint),
    }
}

/// Check data and job directories.
fn check_directories(settings: &Settings) -> Vec<Check> {
    let mut results = vec![check_dir("Data directory", &settings.data_dir())];

    let job_root = settings.job_root();
    let mut job_check = check_dir("Job root", &job_root);
    if job_check.level == Level::Ok {
        let (jobs, bytes) = job_root_usage(&job_root);
        job_check.message = format!("{} ({} jobs, {})", job_root.display(), jobs, format_size(bytes));
    }
    results.push(job_check);

    results
}

fn check_dir(name: &str, path: &Path) -> Check {
    if path.is_dir() {
        Check::new(Level::Ok, name, path.display().to_string())
    } else if path.exists() {
        Check::new(Level::Error, name, format!("{} is not a directory", path.display()))
            .hint("Point the setting at a directory")
    } else {
        Check::new(Level::Warning, name, format!("{} (will be created)", path.display()))
    }
}

/// Number of job directories and the bytes stored under them.
fn job_root_usage(root: &Path) -> (usize, u64) {
    fn dir_size(path: &Path) -> u64 {
        std::fs::read_dir(path)
            .map(|entries| {
                entries
                    .flatten()
                    .map(|e| match e.metadata() {
                        Ok(m) if m.is_dir() => dir_size(&e.path()),
                        Ok(m) => m.len(),
                        Err(_) => 0,
                    })
                    .sum()
            })
            .unwrap_or(0)
    }

    let jobs = std::fs::read_dir(root)
        .map(|entries| entries.flatten().filter(|e| e.path().is_dir()).count())
        .unwrap_or(0);
    (jobs, dir_size(root))
}

fn check_config_file() -> Check {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        Check::new(Level::Ok, "Config file", config_path.display().to_string())
    } else {
        Check::new(Level::Warning, "Config file", "using defaults")
            .hint("Create with: chapsplit config init")
    }
}

fn check_settings(settings: &Settings) -> Check {
    match settings.validate() {
        Ok(()) => Check::new(
            Level::Ok,
            "Limits",
            format!(
                "{} jobs, {} splits per job, {} processes",
                settings.pipeline.max_concurrent_jobs,
                settings.pipeline.max_concurrent_splits,
                settings.pipeline.process_limit()
            ),
        ),
        Err(e) => Check::new(Level::Error, "Limits", e.to_string()).hint("Fix the [pipeline] section"),
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_is_error() {
        let check = check_tool("chapsplit-no-such-tool", "install it");
        assert_eq!(check.level, Level::Error);
        assert_eq!(check.hint, Some("install it"));
    }

    #[test]
    fn test_missing_dir_is_warning() {
        let dir = tempfile::tempdir().unwrap();
        let result = check_dir("Job root", &dir.path().join("jobs"));
        assert_eq!(result.level, Level::Warning);
        assert_eq!(check_dir("Job root", dir.path()).level, Level::Ok);
    }

    #[test]
    fn test_job_root_usage() {
        let dir = tempfile::tempdir().unwrap();
        let job = dir.path().join("xETEYG-az9E").join("snippets");
        std::fs::create_dir_all(&job).unwrap();
        std::fs::write(job.join("01-intro.mp3"), [0u8; 100]).unwrap();
        std::fs::write(dir.path().join("xETEYG-az9E").join("job.json"), [0u8; 20]).unwrap();

        assert_eq!(job_root_usage(dir.path()), (1, 120));
    }

    #[test]
    fn test_invalid_limits_are_errors() {
        let mut settings = Settings::default();
        settings.pipeline.max_concurrent_jobs = 0;
        assert_eq!(check_settings(&settings).level, Level::Error);
    }
}
