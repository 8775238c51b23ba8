use tracing::info;

use crate::error::{DeployError, DeployResult};
use crate::remote::Remote;
use crate::state::RemoteState;

/// Install Docker, the Compose plugin and Nginx on the remote host
/// when missing, and enable their services now and on boot.
///
/// Only packages absent from the state snapshot are installed, so a
/// second run is a no-op apart from `systemctl enable`. A package
/// manager is required only when something is missing.
pub fn bootstrap(remote: &dyn Remote, remote_dir: &str) -> DeployResult<()> {
    let state = RemoteState::probe(remote, None, remote_dir)?;
    let sudo = remote.sudo();

    info!("Bootstrapping {}", remote.describe());

    if state.is_provisioned() {
        info!("Docker, Compose and Nginx already installed");
    } else {
        let pm = state.package_manager.ok_or_else(|| {
            DeployError::PrerequisiteMissing(format!(
                "no supported package manager (apt-get, dnf, yum) on {}",
                remote.describe()
            ))
        })?;
        let packages = pm.packages();
        let mut missing = Vec::new();
        if !state.docker {
            missing.push(packages.docker);
        }
        if !state.compose {
            missing.push(packages.compose);
        }
        if !state.nginx {
            missing.push(packages.nginx);
        }
        info!("Installing {} with {pm}...", missing.join(", "));
        remote.exec(&pm.install_command(sudo, &missing))?;
    }

    remote.exec(&format!("{sudo}systemctl enable --now docker nginx"))?;

    if !sudo.is_empty() {
        // Lets the SSH user run docker without sudo on later logins.
        remote.exec(&format!(
            "id -nG | grep -qw docker || {sudo}usermod -aG docker \"$(id -un)\""
        ))?;
    }

    let version = remote.exec("docker --version && docker compose version && nginx -v 2>&1")?;
    for line in version.lines() {
        info!("  {line}");
    }
    Ok(())
}
