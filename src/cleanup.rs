use tracing::{info, warn};

use crate::config::{PROXY_CONFIG_PATH, check_remote_dir};
use crate::error::DeployResult;
use crate::remote::{Remote, quote};
use crate::state::RemoteState;

/// Tear the deployment down: containers, dangling networks, the
/// deployment directory and the proxy configuration.
///
/// Safe on a host with nothing deployed; every step skips or
/// tolerates "nothing to do". A failing step does not stop the
/// ones after it; the first failure is returned once all have run.
pub fn cleanup(remote: &dyn Remote, remote_dir: &str) -> DeployResult<()> {
    check_remote_dir(remote_dir)?;
    let sudo = remote.sudo();
    let state = RemoteState::probe(remote, None, remote_dir)?;
    info!("Cleaning up {}", remote.describe());

    let mut first_err = None;
    let mut step = |command: String| {
        if let Err(e) = remote.exec(&command) {
            warn!("Cleanup step failed, continuing: {e}");
            first_err.get_or_insert(e);
        }
    };

    if state.docker {
        if state.running_containers > 0 {
            info!("Stopping {} running container(s)", state.running_containers);
        }
        step(format!(
            "{sudo}docker ps -q | xargs -r {sudo}docker stop || true"
        ));
        step(format!("{sudo}docker container prune -f || true"));
        step(format!("{sudo}docker network prune -f || true"));
    } else {
        info!("Docker not installed, no containers to stop");
    }

    if state.deploy_dir {
        info!("Removing {remote_dir}");
    }
    step(format!("rm -rf {}", quote(remote_dir)));

    if state.proxy_config {
        info!("Removing {PROXY_CONFIG_PATH}");
    }
    step(format!("{sudo}rm -f {PROXY_CONFIG_PATH}"));

    if state.nginx {
        step(format!(
            "{sudo}nginx -t >/dev/null 2>&1 && {sudo}systemctl reload nginx || true"
        ));
    }

    match first_err {
        Some(e) => Err(e),
        None => {
            info!("Cleanup complete");
            Ok(())
        }
    }
}
