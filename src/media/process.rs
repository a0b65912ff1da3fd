//! External process execution with a bounded timeout.

use crate::error::ChapsplitError;
use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Longest stderr excerpt carried into an error message.
const STDERR_EXCERPT: usize = 2000;

/// Why an external tool did not produce a successful result.
#[derive(Error, Debug)]
pub enum ProcessFailure {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{tool} could not be started: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} timed out after {}s", .timeout.as_secs())]
    TimedOut { tool: String, timeout: Duration },

    #[error("{tool} exited with {status}: {stderr}")]
    Exited {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },
}

impl ProcessFailure {
    /// Map into the stage error, keeping a missing tool distinguishable.
    pub fn into_error(self, stage: fn(String) -> ChapsplitError) -> ChapsplitError {
        match self {
            ProcessFailure::NotFound(tool) => ChapsplitError::ToolNotFound(tool),
            other => stage(other.to_string()),
        }
    }
}

/// Run a command to completion, killing it if it outlives `timeout`.
///
/// The child is spawned with `kill_on_drop`, so dropping the future on
/// timeout also terminates the process.
pub async fn run(mut command: Command, tool: &str, timeout: Duration) -> Result<Output, ProcessFailure> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Running {} (timeout {}s)", tool, timeout.as_secs());

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Err(_) => {
            return Err(ProcessFailure::TimedOut {
                tool: tool.to_string(),
                timeout,
            })
        }
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ProcessFailure::NotFound(tool.to_string()));
        }
        Ok(Err(e)) => {
            return Err(ProcessFailure::Spawn {
                tool: tool.to_string(),
                source: e,
            })
        }
        Ok(Ok(output)) => output,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProcessFailure::Exited {
            tool: tool.to_string(),
            status: output.status,
            stderr: tail(stderr.trim(), STDERR_EXCERPT).to_string(),
        });
    }

    Ok(output)
}

/// Last `max` bytes of `text`, cut on a char boundary.
fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_respects_char_boundaries() {
        assert_eq!(tail("short", 10), "short");
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("ééé", 3), "é");
    }

    #[test]
    fn test_missing_tool_maps_to_tool_not_found() {
        let err = ProcessFailure::NotFound("yt-dlp".into()).into_error(ChapsplitError::Fetch);
        assert!(matches!(err, ChapsplitError::ToolNotFound(t) if t == "yt-dlp"));

        let err = ProcessFailure::TimedOut {
            tool: "ffmpeg".into(),
            timeout: Duration::from_secs(5),
        }
        .into_error(ChapsplitError::Encode);
        assert!(matches!(err, ChapsplitError::Encode(msg) if msg.contains("timed out")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo broken >&2; exit 3");

        let err = run(cmd, "sh", Duration::from_secs(10)).await.unwrap_err();
        match err {
            ProcessFailure::Exited { stderr, status, .. } => {
                assert_eq!(stderr, "broken");
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");

        let err = run(cmd, "sleep", Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, ProcessFailure::TimedOut { .. }));
    }

    #[tokio::test]
    async fn test_unknown_binary_is_not_found() {
        let cmd = Command::new("chapsplit-no-such-tool");
        let err = run(cmd, "chapsplit-no-such-tool", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessFailure::NotFound(_)));
    }
}
