use std::path::Path;

use crate::error::DeployResult;

/// A host the deployment steps act on.
///
/// Every component talks to the target through this trait so the
/// orchestration can be exercised against a scripted fake.
pub trait Remote {
    /// `user@host`, for log lines.
    fn describe(&self) -> String;

    /// Prefix for privileged commands on this host.
    fn sudo(&self) -> &'static str;

    /// Round-trip a trivial command to prove the host is reachable
    /// and accepts our credentials.
    fn check_connection(&self) -> DeployResult<()>;

    /// Run a shell command on the host and capture its output.
    fn exec(&self, command: &str) -> DeployResult<String>;

    /// Write `content` to `remote_path`, as root when `privileged`.
    fn write_file(&self, content: &str, remote_path: &str, privileged: bool) -> DeployResult<()>;

    /// Copy the contents of `local_dir` into `remote_dir` with a
    /// delta transfer, skipping the named paths.
    fn sync_dir(
        &self,
        local_dir: &Path,
        remote_dir: &str,
        excludes: &[&str],
        delete: bool,
    ) -> DeployResult<()>;
}

/// Quote a value for a POSIX shell.
#[must_use]
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}
