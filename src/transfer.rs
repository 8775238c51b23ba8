use std::path::Path;

use tracing::info;

use crate::error::DeployResult;
use crate::remote::{Remote, quote};

/// Paths never shipped to the host.
pub const EXCLUDES: [&str; 1] = [".git"];

/// Mirror the working copy into `remote_dir` on the host.
///
/// Files deleted locally stay on the host unless `delete` is set.
pub fn transfer(
    remote: &dyn Remote,
    local_path: &Path,
    remote_dir: &str,
    delete: bool,
) -> DeployResult<()> {
    remote.exec(&format!("mkdir -p {}", quote(remote_dir)))?;

    info!(
        "Syncing {} to {}:{remote_dir}",
        local_path.display(),
        remote.describe()
    );
    remote.sync_dir(local_path, remote_dir, &EXCLUDES, delete)?;
    info!("Transfer complete");
    Ok(())
}
