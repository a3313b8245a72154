// External command execution
//
// Every collaborator this hook drives outside the database (git, pip, the
// application's Python config, systemctl) goes through run_cmd_with_timeout.
//
// IMPORTANT:
// - Never log secrets (passwords, hashes). Pass them through `envs`, which are never logged.
// - Commands are not retried; callers decide whether a failure is fatal.

pub mod service;

use anyhow::{Context, Result};
use log::{debug, warn};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u128,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Short failure summary for error messages (last stderr line, else exit code).
    pub fn failure_summary(&self) -> String {
        let last = self
            .stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty());
        match (last, self.exit_code) {
            (Some(line), Some(code)) => format!("exit code {}: {}", code, line),
            (Some(line), None) => format!("terminated by signal: {}", line),
            (None, Some(code)) => format!("exit code {}", code),
            (None, None) => "terminated by signal".to_string(),
        }
    }
}

fn mask_arg_for_log(arg: &str) -> String {
    let lower = arg.to_ascii_lowercase();
    if lower.contains("password")
        || lower.contains("passwd")
        || lower.contains("secret")
        || lower.contains("token")
        || lower.starts_with("$pbkdf2")
    {
        return "***".to_string();
    }
    arg.to_string()
}

/// Run an external command with a timeout.
///
/// Returns captured stdout/stderr even when exit code is non-zero (caller decides success).
/// A spawn failure (program missing) or timeout is an `Err`.
pub async fn run_cmd_with_timeout(
    program: &str,
    args: &[String],
    envs: &[(&str, &str)],
    timeout_dur: Duration,
    operation: &str,
) -> Result<CommandOutput> {
    let started = Instant::now();

    debug!(
        "[PHASE: command] [STEP: {}] run_cmd_with_timeout entered (program={}, args=[{}], env_keys=[{}], timeout_ms={})",
        operation,
        program,
        args.iter().map(|a| mask_arg_for_log(a)).collect::<Vec<_>>().join(", "),
        envs.iter().map(|(k, _)| *k).collect::<Vec<_>>().join(", "),
        timeout_dur.as_millis()
    );

    let mut cmd = Command::new(program);
    cmd.args(args)
        .envs(envs.iter().copied())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().with_context(|| {
        format!(
            "Failed to spawn command '{}' (operation={})",
            program, operation
        )
    })?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("Failed to capture stdout (operation={})", operation))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow::anyhow!("Failed to capture stderr (operation={})", operation))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf).await?;
        Ok::<String, std::io::Error>(String::from_utf8_lossy(&buf).to_string())
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr.read_to_end(&mut buf).await?;
        Ok::<String, std::io::Error>(String::from_utf8_lossy(&buf).to_string())
    });

    let status = match timeout(timeout_dur, child.wait()).await {
        Ok(Ok(s)) => s,
        Ok(Err(e)) => {
            return Err(anyhow::Error::new(e)).with_context(|| {
                format!(
                    "Command wait failed (operation={}, program={})",
                    operation, program
                )
            });
        }
        Err(_) => {
            warn!(
                "[PHASE: command] [STEP: {}] Timeout reached (program={}, timeout_ms={}); killing process",
                operation,
                program,
                timeout_dur.as_millis()
            );

            if let Err(e) = child.kill().await {
                warn!(
                    "[PHASE: command] [STEP: {}] Failed to kill timed-out process (program={}): {}",
                    operation, program, e
                );
            }

            return Err(anyhow::anyhow!(
                "Command timed out after {}ms (operation={}, program={})",
                timeout_dur.as_millis(),
                operation,
                program
            ));
        }
    };

    let stdout_str = stdout_task
        .await
        .context("stdout join failed")?
        .context("stdout read failed")?;
    let stderr_str = stderr_task
        .await
        .context("stderr join failed")?
        .context("stderr read failed")?;

    let out = CommandOutput {
        exit_code: status.code(),
        stdout: stdout_str,
        stderr: stderr_str,
        duration_ms: started.elapsed().as_millis(),
    };

    debug!(
        "[PHASE: command] [STEP: {}] run_cmd_with_timeout exit (program={}, exit_code={:?}, duration_ms={}, stdout_len={}, stderr_len={})",
        operation,
        program,
        out.exit_code,
        out.duration_ms,
        out.stdout.len(),
        out.stderr.len()
    );

    Ok(out)
}

/// Run a command and turn a non-zero exit into an error.
pub async fn run_checked(
    program: &str,
    args: &[String],
    envs: &[(&str, &str)],
    timeout_dur: Duration,
    operation: &str,
) -> Result<CommandOutput> {
    let out = run_cmd_with_timeout(program, args, envs, timeout_dur, operation).await?;
    if !out.success() {
        return Err(anyhow::anyhow!(
            "{} failed ({})",
            operation,
            out.failure_summary()
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_arg_for_log_redacts_credential_values() {
        assert_eq!(mask_arg_for_log("--password=hunter2"), "***");
        assert_eq!(mask_arg_for_log("$pbkdf2-sha512$25000$salt$sum"), "***");
        assert_eq!(mask_arg_for_log("clone"), "clone");
    }

    #[test]
    fn failure_summary_prefers_last_stderr_line() {
        let out = CommandOutput {
            exit_code: Some(128),
            stdout: String::new(),
            stderr: "Cloning into 'x'...\nfatal: repository not found\n\n".to_string(),
            duration_ms: 1,
        };
        assert_eq!(out.failure_summary(), "exit code 128: fatal: repository not found");
    }

    #[tokio::test]
    async fn run_cmd_with_timeout_basic_smoke() {
        let args = vec!["-c".to_string(), "echo \"hello $GREETING\"".to_string()];
        let out = run_cmd_with_timeout(
            "sh",
            &args,
            &[("GREETING", "world")],
            Duration::from_secs(5),
            "test_echo",
        )
        .await
        .expect("command should run");
        assert!(out.success());
        assert!(out.stdout.contains("hello world"));
    }

    #[tokio::test]
    async fn run_checked_reports_non_zero_exit() {
        let args = vec!["-c".to_string(), "echo boom >&2; exit 3".to_string()];
        let err = run_checked("sh", &args, &[], Duration::from_secs(5), "test_fail")
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("exit code 3"), "{}", msg);
        assert!(msg.contains("boom"), "{}", msg);
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let res = run_cmd_with_timeout(
            "definitely-not-a-real-program-xyz",
            &[],
            &[],
            Duration::from_secs(5),
            "test_missing",
        )
        .await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn timeout_kills_long_running_command() {
        let args = vec!["-c".to_string(), "sleep 5".to_string()];
        let res = run_cmd_with_timeout("sh", &args, &[], Duration::from_millis(200), "test_sleep").await;
        let err = res.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
