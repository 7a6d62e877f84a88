//! Child process execution with captured output and a timeout.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

/// Captured result of a finished child process.
#[derive(Debug, Clone)]
pub(crate) struct CommandOutput {
    /// Exit code (-1 when terminated by a signal).
    pub exit_code: i32,
    pub success: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration_ms: u64,
}

impl CommandOutput {
    /// stdout followed by stderr.
    pub fn combined(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.stdout.len() + self.stderr.len());
        out.extend_from_slice(&self.stdout);
        out.extend_from_slice(&self.stderr);
        out
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

#[derive(Debug)]
pub(crate) enum ExecError {
    NotFound,
    Spawn(std::io::Error),
    TimedOut,
}

/// Run `program args..` in `cwd`, waiting at most `timeout_secs` (0 = no limit).
///
/// The child is killed if the timeout elapses.
pub(crate) async fn run(
    program: &str,
    args: &[String],
    cwd: &Path,
    timeout_secs: u64,
) -> Result<CommandOutput, ExecError> {
    let start = Instant::now();

    let child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => ExecError::NotFound,
            _ => ExecError::Spawn(e),
        })?;

    let output = if timeout_secs > 0 {
        tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
            .await
            .map_err(|_| ExecError::TimedOut)?
    } else {
        child.wait_with_output().await
    }
    .map_err(ExecError::Spawn)?;

    Ok(CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        success: output.status.success(),
        stdout: output.stdout,
        stderr: output.stderr,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captures_both_streams() {
        let out = run(
            "sh",
            &["-c".to_string(), "echo out; echo err >&2".to_string()],
            Path::new("."),
            60,
        )
        .await
        .expect("run failed");
        assert!(out.success);
        assert_eq!(out.stdout_text(), "out");
        assert_eq!(out.stderr_text(), "err");
        assert_eq!(out.combined(), b"out\nerr\n".to_vec());
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let err = run("/nonexistent-binary-that-does-not-exist", &[], Path::new("."), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::NotFound));
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let err = run("sleep", &["5".to_string()], Path::new("."), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::TimedOut));
    }
}
