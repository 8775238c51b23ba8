use tracing::{error, info, warn};

use crate::cleanup;
use crate::compose::Descriptor;
use crate::config::{DeploymentConfig, PROXY_CONFIG_PATH, check_remote_dir};
use crate::deploy;
use crate::error::{DeployError, DeployResult};
use crate::interrupt;
use crate::nginx;
use crate::provision;
use crate::proxy::Proxy;
use crate::remote::Remote;
use crate::ssh::SshSession;
use crate::stage::{self, StagedRepo};
use crate::state::RemoteState;
use crate::transfer;
use crate::validate::{self, ValidationReport};

/// Deployment pipeline: stage locally, gate on connectivity, then
/// bootstrap, transfer, deploy, proxy and validate.
///
/// Any failure after the connectivity gate runs cleanup before the
/// error is returned, leaving the host in a known state. Failures
/// that are [preconditions](DeployError::is_precondition) return
/// without touching the host.
pub struct Pipeline {
    config: DeploymentConfig,
    proxy: Proxy,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: DeploymentConfig) -> Self {
        let proxy = Proxy::new(config.app_port);
        Self { config, proxy }
    }

    #[must_use]
    pub fn proxy(mut self, proxy: Proxy) -> Self {
        self.proxy = proxy;
        self
    }

    /// Run the full deployment against the configured host over
    /// SSH.
    pub fn run(&self) -> DeployResult<ValidationReport> {
        interrupt::check()?;
        check_remote_dir(&self.config.remote_dir)?;
        let staged = stage::stage(&self.config)?;
        let ssh = SshSession::new(self.config.target.clone());
        self.deploy_to(&staged, &ssh)
    }

    /// Remote half of [`run`](Self::run), for an already staged
    /// working copy.
    pub fn deploy_to(
        &self,
        staged: &StagedRepo,
        remote: &dyn Remote,
    ) -> DeployResult<ValidationReport> {
        check_remote_dir(&self.config.remote_dir)?;
        let name = self.config.container_name()?;
        remote.check_connection()?;

        match self.apply(staged, &name, remote) {
            Ok(report) => {
                info!("Deployment complete!");
                info!("Application available at: http://{}/", self.config.target.host);
                if !report.app_ok() {
                    warn!("The app did not answer cleanly through the proxy; check its logs");
                }
                Ok(report)
            }
            Err(e) => {
                error!("Deployment failed: {e}");
                let e = if interrupt::requested() {
                    DeployError::Interrupted
                } else {
                    e
                };
                if e.is_precondition() {
                    return Err(e);
                }
                warn!("Rolling back remote changes...");
                if let Err(cleanup_err) = cleanup::cleanup(remote, &self.config.remote_dir) {
                    error!("Cleanup failed as well: {cleanup_err}");
                }
                Err(e)
            }
        }
    }

    fn apply(
        &self,
        staged: &StagedRepo,
        name: &str,
        remote: &dyn Remote,
    ) -> DeployResult<ValidationReport> {
        let dir = self.config.remote_dir.as_str();

        provision::bootstrap(remote, dir)?;
        interrupt::check()?;

        transfer::transfer(remote, &staged.path, dir, self.config.mirror_deletions)?;
        interrupt::check()?;

        let deployer =
            deploy::for_descriptor(&staged.descriptor, name, self.config.app_port, dir);
        let state = RemoteState::probe(remote, deployer.container(), dir)?;
        info!("Deploying {} as a {}", staged.name, deployer.kind());
        deployer.deploy(remote, &state)?;
        interrupt::check()?;

        nginx::configure(remote, &self.proxy)?;
        interrupt::check()?;

        validate::validate(remote, deployer.container(), dir, self.proxy.listen)
    }

    /// Print the proxy configuration and the planned actions.
    /// Nothing local or remote is modified.
    pub fn dry_run(&self) -> DeployResult<()> {
        let dir = &self.config.remote_dir;
        let dest = self.config.target.destination();
        let path = self.config.local_path()?;
        let name = self.config.container_name()?;

        info!("=== Dry run: no changes will be made ===");
        info!("--- {PROXY_CONFIG_PATH} ---");
        println!("{}", nginx::render(&self.proxy));

        let strategy = if path.is_dir() {
            match Descriptor::detect(&path) {
                Ok(Descriptor::Compose(file)) => format!("docker compose up -d --build ({file})"),
                Ok(Descriptor::Dockerfile) => format!(
                    "docker build -t {name}:latest, run {name} on 127.0.0.1:{0}:{0}",
                    self.config.app_port
                ),
                Err(e) => format!("none yet: {e}"),
            }
        } else {
            "decided after cloning (compose file or Dockerfile)".to_string()
        };

        info!("--- Actions that would be performed ---");
        info!(
            "1. Clone or update {} (branch {}) in {}",
            self.config.repo_url,
            self.config.branch,
            path.display()
        );
        info!("2. Check SSH connectivity to {dest}");
        info!("3. Install missing Docker, Compose and Nginx packages");
        info!("4. Sync working copy to {dest}:{dir}");
        info!("5. Deploy: {strategy}");
        info!(
            "6. Write {PROXY_CONFIG_PATH} forwarding :{} to {}",
            self.proxy.listen,
            self.proxy.upstream()
        );
        info!("7. Check Docker and Nginx, probe the app through the proxy");
        Ok(())
    }
}

/// Standalone teardown.
pub fn run_cleanup(remote: &dyn Remote, remote_dir: &str) -> DeployResult<()> {
    remote.check_connection()?;
    cleanup::cleanup(remote, remote_dir)
}

/// Print what is installed and running on the host.
pub fn run_status(remote: &dyn Remote, remote_dir: &str) -> DeployResult<RemoteState> {
    remote.check_connection()?;
    let state = RemoteState::probe(remote, None, remote_dir)?;

    let yes_no = |b: bool| if b { "yes" } else { "no" };
    info!(
        "Package manager: {}",
        state
            .package_manager
            .map_or_else(|| "unknown".to_string(), |pm| pm.to_string())
    );
    info!("Docker installed: {} (active: {})", yes_no(state.docker), yes_no(state.docker_active));
    info!("Compose plugin: {}", yes_no(state.compose));
    info!("Nginx installed: {} (active: {})", yes_no(state.nginx), yes_no(state.nginx_active));
    info!("Proxy config present: {}", yes_no(state.proxy_config));
    info!("Deployment directory present: {}", yes_no(state.deploy_dir));
    info!("Running containers: {}", state.running_containers);

    if state.docker {
        let ps = remote.exec(&format!(
            "{}docker ps --format 'table {{{{.Names}}}}\\t{{{{.Image}}}}\\t{{{{.Status}}}}\\t{{{{.Ports}}}}'",
            remote.sudo()
        ))?;
        println!("{ps}");
    }
    Ok(state)
}
