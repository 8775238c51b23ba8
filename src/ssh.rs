use std::path::Path;

use tracing::{debug, info};

use crate::cmd;
use crate::config::SshTarget;
use crate::error::{DeployError, DeployResult};
use crate::remote::{Remote, quote};

/// Seconds the connectivity probe waits before giving up.
pub const CONNECT_TIMEOUT_SECS: u32 = 10;

/// SSH session wrapper for executing commands and transferring
/// files to a remote host.
pub struct SshSession {
    target: SshTarget,
}

impl SshSession {
    #[must_use]
    pub const fn new(target: SshTarget) -> Self {
        Self { target }
    }

    #[must_use]
    pub const fn target(&self) -> &SshTarget {
        &self.target
    }

    fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = self.ssh_base_args();
        args.push(self.target.destination());
        args.push(command.to_string());
        args
    }

    /// Options shared by every ssh invocation. `BatchMode` turns
    /// a missing key or unknown password into an immediate failure.
    fn ssh_base_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={CONNECT_TIMEOUT_SECS}"),
            "-p".to_string(),
            self.target.port.to_string(),
        ];
        if let Some(key) = &self.target.key {
            args.push("-i".to_string());
            args.push(key.display().to_string());
        }
        args
    }

    /// The remote shell rsync should use, as a single `-e` value.
    fn rsync_shell(&self) -> String {
        let mut parts = vec!["ssh".to_string()];
        parts.extend(self.ssh_base_args().iter().map(|a| quote(a)));
        parts.join(" ")
    }

    /// Full rsync argument list for a directory sync.
    #[must_use]
    pub fn rsync_args(
        &self,
        local_dir: &Path,
        remote_dir: &str,
        excludes: &[&str],
        delete: bool,
    ) -> Vec<String> {
        let mut args = vec!["-az".to_string()];
        if delete {
            args.push("--delete".to_string());
        }
        for exclude in excludes {
            args.push(format!("--exclude={exclude}"));
        }
        args.push("-e".to_string());
        args.push(self.rsync_shell());

        // Trailing slash: copy the directory's contents, not the
        // directory itself.
        let mut source = local_dir.display().to_string();
        if !source.ends_with('/') {
            source.push('/');
        }
        args.push(source);
        args.push(format!(
            "{}:{}/",
            self.target.destination(),
            remote_dir.trim_end_matches('/')
        ));
        args
    }
}

impl Remote for SshSession {
    fn describe(&self) -> String {
        self.target.destination()
    }

    fn sudo(&self) -> &'static str {
        self.target.sudo()
    }

    fn check_connection(&self) -> DeployResult<()> {
        info!(
            "Checking SSH connectivity to {} (timeout {CONNECT_TIMEOUT_SECS}s)",
            self.describe()
        );
        match self.exec("echo connected") {
            Ok(out) if out.trim() == "connected" => {
                info!("SSH connection established");
                Ok(())
            }
            Ok(out) => Err(DeployError::SshFailed(format!(
                "unexpected probe answer from {}: {out}",
                self.describe()
            ))),
            Err(e) => Err(DeployError::SshFailed(format!(
                "{} unreachable: {e}",
                self.describe()
            ))),
        }
    }

    fn exec(&self, command: &str) -> DeployResult<String> {
        debug!("ssh {}: {}", self.describe(), first_line(command));
        let args = self.build_ssh_args(command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run("ssh", &refs)
    }

    fn write_file(&self, content: &str, remote_path: &str, privileged: bool) -> DeployResult<()> {
        let sudo = if privileged { self.sudo() } else { "" };
        let command = format!("{sudo}tee {} >/dev/null", quote(remote_path));
        let args = self.build_ssh_args(&command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run_with_stdin("ssh", &refs, content.as_bytes())?;
        Ok(())
    }

    fn sync_dir(
        &self,
        local_dir: &Path,
        remote_dir: &str,
        excludes: &[&str],
        delete: bool,
    ) -> DeployResult<()> {
        if !cmd::command_exists("rsync") {
            return Err(DeployError::PrerequisiteMissing(
                "rsync is not installed locally".into(),
            ));
        }
        let args = self.rsync_args(local_dir, remote_dir, excludes, delete);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run("rsync", &refs)?;
        Ok(())
    }
}

fn first_line(command: &str) -> &str {
    command.lines().next().unwrap_or_default()
}
