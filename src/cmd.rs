use std::process::{Command, Output, Stdio};

use tracing::{debug, warn};

use crate::error::{DeployError, DeployResult};

/// Run a command and capture its output. Fails if the command
/// returns a non-zero exit code.
pub fn run(program: &str, args: &[&str]) -> DeployResult<String> {
    run_with_env(program, args, &[])
}

/// Run a command with extra environment variables. Values are
/// passed through the environment only and never show up in the
/// formatted command line or the log.
pub fn run_with_env(
    program: &str,
    args: &[&str],
    envs: &[(&str, &str)],
) -> DeployResult<String> {
    let mut command = Command::new(program);
    command
        .args(args)
        .envs(envs.iter().copied())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = command.output().map_err(|e| spawn_error(program, e))?;
    finish(program, args, &output)
}

/// Run a command that pipes its stdin from a byte slice.
pub fn run_with_stdin(program: &str, args: &[&str], stdin_data: &[u8]) -> DeployResult<String> {
    use std::io::Write;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    if let Some(stdin) = &mut child.stdin {
        stdin.write_all(stdin_data)?;
    }
    drop(child.stdin.take());

    let output = child.wait_with_output()?;
    finish(program, args, &output)
}

/// Check if a command exists on PATH.
#[must_use]
pub fn command_exists(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

fn finish(program: &str, args: &[&str], output: &Output) -> DeployResult<String> {
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if output.status.success() {
        for line in stdout.lines().chain(stderr.lines()) {
            debug!(target: "dockhand::cmd", "{line}");
        }
        Ok(stdout)
    } else {
        for line in stdout.lines().chain(stderr.lines()) {
            warn!(target: "dockhand::cmd", "{line}");
        }
        Err(DeployError::CommandFailed {
            command: format_command(program, args),
            status: output.status,
        })
    }
}

fn spawn_error(program: &str, e: std::io::Error) -> DeployError {
    if e.kind() == std::io::ErrorKind::NotFound {
        DeployError::CommandNotFound(program.to_string())
    } else {
        DeployError::Io(e)
    }
}

/// Render a command for error messages. Long remote scripts are
/// cut down to their first line.
#[must_use]
pub fn format_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| (*a).to_string()));
    let joined = parts.join(" ");
    match joined.split_once('\n') {
        Some((first, _)) => format!("{first} ..."),
        None => joined,
    }
}
