use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{DeployError, DeployResult};
use crate::remote::{Remote, quote};
use crate::state::RemoteState;

/// Outcome of a post-deployment check. Infrastructure failures are
/// errors; everything recorded here is informational.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Nginx was found inactive and restarted once.
    pub nginx_restarted: bool,
    /// HTTP status answered through the proxy, `None` when nothing
    /// answered.
    pub app_status: Option<u16>,
    /// Whether the app container is running, for single-container
    /// deployments.
    pub container_running: Option<bool>,
}

impl ValidationReport {
    /// The app answered through the proxy with a non-server-error
    /// status.
    #[must_use]
    pub fn app_ok(&self) -> bool {
        self.app_status.is_some_and(|s| (200..500).contains(&s))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerState {
    status: String,
    running: bool,
}

/// Confirm Docker and Nginx are active, then probe the app through
/// the proxy from the host itself.
pub fn validate(
    remote: &dyn Remote,
    container: Option<&str>,
    remote_dir: &str,
    listen_port: u16,
) -> DeployResult<ValidationReport> {
    let sudo = remote.sudo();
    let state = RemoteState::probe(remote, container, remote_dir)?;
    let mut report = ValidationReport::default();

    if !state.docker_active {
        return Err(DeployError::ServiceInactive("docker".into()));
    }
    info!("Docker is active");

    if !state.nginx_active {
        warn!("Nginx is not active, restarting it once");
        remote.exec(&format!("{sudo}systemctl restart nginx"))?;
        report.nginx_restarted = true;
        if !is_active(remote, "nginx")? {
            return Err(DeployError::ServiceInactive("nginx".into()));
        }
    }
    info!("Nginx is active");

    if let Some(name) = container {
        report.container_running = Some(container_running(remote, name));
    }

    report.app_status = probe_http(remote, listen_port)?;
    match report.app_status {
        Some(status) if report.app_ok() => {
            info!("App answered through the proxy with HTTP {status}");
        }
        Some(status) => warn!("App answered through the proxy with HTTP {status}"),
        None => warn!("App did not answer through the proxy on port {listen_port}"),
    }

    Ok(report)
}

fn is_active(remote: &dyn Remote, service: &str) -> DeployResult<bool> {
    let out = remote.exec(&format!(
        "systemctl is-active --quiet {service} && echo active || echo inactive"
    ))?;
    Ok(out.trim() == "active")
}

fn container_running(remote: &dyn Remote, name: &str) -> bool {
    let inspect = remote.exec(&format!(
        "{}docker inspect --format '{{{{json .State}}}}' {}",
        remote.sudo(),
        quote(name)
    ));
    match inspect.map(|out| parse_container_state(&out)) {
        Ok(Ok(state)) if state.running => {
            info!("Container {name} is {}", state.status);
            true
        }
        Ok(Ok(state)) => {
            warn!("Container {name} is {}", state.status);
            false
        }
        Ok(Err(e)) => {
            warn!("Unreadable state for container {name}: {e}");
            false
        }
        Err(e) => {
            warn!("Container {name} not found: {e}");
            false
        }
    }
}

fn parse_container_state(json: &str) -> DeployResult<ContainerState> {
    Ok(serde_json::from_str(json.trim())?)
}

/// HEAD request against the proxy from the host. `000` from curl
/// (no answer) maps to `None`.
fn probe_http(remote: &dyn Remote, port: u16) -> DeployResult<Option<u16>> {
    let out = remote.exec(&format!(
        "if command -v curl >/dev/null 2>&1; then \
         curl -s -o /dev/null -I --max-time 10 -w '%{{http_code}}' \
         http://127.0.0.1:{port}/ || true; else echo 000; fi"
    ))?;
    Ok(parse_status(&out))
}

/// Parse curl's `%{http_code}` output.
#[must_use]
pub fn parse_status(output: &str) -> Option<u16> {
    output
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|&code| code != 0)
}
