//! Bounded execution of external tools.
//!
//! Every subprocess the service starts goes through [`run`], so none of them
//! can block a handler or the verifier longer than its budget.

use crate::{Error, Result};
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs `program` with `args`, capturing stdout and stderr.
///
/// A missing binary maps to [`Error::ToolNotFound`] and an exceeded budget to
/// [`Error::Timeout`]; the child is killed when the budget runs out.
pub async fn run<I, S>(program: &str, args: I, timeout: Duration) -> Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::ToolNotFound(program.to_string()),
            _ => Error::Io(e),
        })?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| Error::Timeout {
            tool: program.to_string(),
            after: timeout,
        })??;

    Ok(CommandOutput {
        status: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_exit_code_and_streams() {
        let out = run(
            "sh",
            ["-c", "echo out; echo err >&2; exit 3"],
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(out.status, Some(3));
        assert!(!out.success());
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn missing_binary_is_tool_not_found() {
        let err = run(
            "definitely-not-a-real-binary-7f3a",
            Vec::<&str>::new(),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(ref t) if t == "definitely-not-a-real-binary-7f3a"));
    }

    #[tokio::test]
    async fn exceeded_budget_is_timeout() {
        let err = run("sleep", ["5"], Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { ref tool, .. } if tool == "sleep"));
    }
}
