//! Pre-flight checks before expensive operations.
//!
//! Validates that the configured tools are available before starting work
//! that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{ChapsplitError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Processing needs the downloader and the encoder.
    Process,
    /// Serving accepts submissions, so it needs the same tools.
    Serve,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Process | Operation::Serve => {
            for tool in required_tools(settings) {
                check_tool(tool)?;
            }
        }
    }
    Ok(())
}

/// Executables the pipeline shells out to.
pub fn required_tools(settings: &Settings) -> [&str; 3] {
    [
        settings.fetch.program.as_str(),
        settings.encode.program.as_str(),
        settings.encode.probe_program.as_str(),
    ]
}

/// ffmpeg-family tools take `-version`, everything else `--version`.
pub fn version_arg(tool: &str) -> &'static str {
    let name = std::path::Path::new(tool)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(tool);
    match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    }
}

/// First line of a tool's version output.
pub fn tool_version(name: &str) -> Result<String> {
    match Command::new(name).arg(version_arg(name)).output() {
        Ok(output) if output.status.success() => Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("installed")
            .trim()
            .to_string()),
        Ok(_) => Err(ChapsplitError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ChapsplitError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(ChapsplitError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

fn check_tool(name: &str) -> Result<()> {
    tool_version(name).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_is_reported() {
        let mut settings = Settings::default();
        settings.fetch.program = "definitely-not-installed-downloader".into();
        let err = check(Operation::Process, &settings).unwrap_err();
        assert!(matches!(err, ChapsplitError::ToolNotFound(_)));
    }

    #[test]
    fn test_version_arg() {
        assert_eq!(version_arg("ffmpeg"), "-version");
        assert_eq!(version_arg("/usr/local/bin/ffprobe"), "-version");
        assert_eq!(version_arg("yt-dlp"), "--version");
    }
}
