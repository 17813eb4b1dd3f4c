use std::{
    path::Path,
    process::{ExitStatus, Stdio},
    time::Duration,
};

use tokio::{process::Command, time::timeout};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ProcessError;

/// Captured result of a finished tool run.
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Runs `program` to completion, bounded by `limit` and `cancel`.
///
/// The child is killed when either bound trips.
pub async fn run_tool(
    program: &Path,
    args: &[String],
    limit: Duration,
    cancel: &CancellationToken,
) -> Result<ToolOutput, ProcessError> {
    let name = program.display().to_string();
    debug!("running {name} {args:?}");

    let command_future = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            return Err(ProcessError::Cancelled { program: name });
        }
        result = timeout(limit, command_future) => result,
    };

    let output = output
        .map_err(|_| ProcessError::TimedOut {
            program: name.clone(),
            limit,
        })?
        .map_err(|source| ProcessError::Spawn {
            program: name,
            source,
        })?;

    Ok(ToolOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Last non-empty line of `text`, trimmed.
pub fn last_non_empty_line(text: &str) -> Option<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .next_back()
}
