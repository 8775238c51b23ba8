use tracing::info;

use crate::deploy::Deployer;
use crate::error::DeployResult;
use crate::remote::{Remote, quote};
use crate::state::RemoteState;

/// Bring a compose stack down and back up with a forced rebuild.
pub struct ComposeStack {
    remote_dir: String,
    file: String,
}

impl ComposeStack {
    #[must_use]
    pub fn new(remote_dir: &str, file: &str) -> Self {
        Self {
            remote_dir: remote_dir.to_string(),
            file: file.to_string(),
        }
    }

    fn compose(&self, sudo: &str, args: &str) -> String {
        format!(
            "cd {} && {sudo}docker compose -f {} {args}",
            quote(&self.remote_dir),
            quote(&self.file)
        )
    }
}

impl Deployer for ComposeStack {
    fn kind(&self) -> &'static str {
        "compose stack"
    }

    fn container(&self) -> Option<&str> {
        None
    }

    fn deploy(&self, remote: &dyn Remote, _state: &RemoteState) -> DeployResult<()> {
        let sudo = remote.sudo();

        info!("Stopping existing stack...");
        remote.exec(&format!(
            "{} 2>/dev/null || true",
            self.compose(sudo, "down --remove-orphans")
        ))?;

        info!("Building and starting stack from {}...", self.file);
        remote.exec(&self.compose(sudo, "up -d --build"))?;

        let ps = remote.exec(&self.compose(sudo, "ps"))?;
        for line in ps.lines() {
            info!("  {line}");
        }
        Ok(())
    }
}
