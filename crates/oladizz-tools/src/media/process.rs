//! Running external programs.

use std::ffi::OsStr;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::{ToolError, ToolResult};

/// Longest stderr excerpt kept in an error.
const STDERR_LIMIT: usize = 2000;

/// Runs `program` to completion and returns its stdout.
///
/// The child is killed if the returned future is dropped, so a timed-out
/// background task does not leave processes behind.
pub async fn run<I, S>(program: &str, args: I, stdin: Option<&[u8]>) -> ToolResult<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(program, "Spawning external tool");
    let mut child = cmd.spawn().map_err(|e| ToolError::Process {
        program: program.to_string(),
        code: None,
        stderr: format!("failed to spawn: {e}"),
    })?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(input).await?;
        pipe.shutdown().await?;
    }

    let output = child.wait_with_output().await?;
    trace!(
        program,
        status = ?output.status.code(),
        stdout = output.stdout.len(),
        "External tool exited"
    );

    if output.status.success() {
        Ok(output.stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(ToolError::Process {
            program: program.to_string(),
            code: output.status.code(),
            stderr: stderr.chars().take(STDERR_LIMIT).collect(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stdout_and_stdin() {
        let out = run("cat", ["-"], Some(b"hello".as_slice())).await.unwrap();
        assert_eq!(out, b"hello");
    }

    #[tokio::test]
    async fn test_failure_carries_status_and_stderr() {
        let err = run("sh", ["-c", "echo boom >&2; exit 3"], None)
            .await
            .unwrap_err();
        match err {
            ToolError::Process { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr.trim(), "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = run("definitely-not-a-real-tool", ["x"], None).await.unwrap_err();
        assert!(matches!(err, ToolError::Process { code: None, .. }));
    }
}
