use std::fmt;

use tracing::debug;

use crate::config::PROXY_CONFIG_PATH;
use crate::error::{DeployError, DeployResult};
use crate::remote::{Remote, quote};

/// Package manager family found on the remote host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Yum,
}

impl PackageManager {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "apt" => Some(Self::Apt),
            "dnf" => Some(Self::Dnf),
            "yum" => Some(Self::Yum),
            _ => None,
        }
    }

    /// Package providing each of Docker, the Compose plugin and
    /// Nginx.
    #[must_use]
    pub const fn packages(self) -> Packages {
        match self {
            Self::Apt => Packages {
                docker: "docker.io",
                compose: "docker-compose-v2",
                nginx: "nginx",
            },
            Self::Dnf | Self::Yum => Packages {
                docker: "docker",
                compose: "docker-compose-plugin",
                nginx: "nginx",
            },
        }
    }

    /// Non-interactive install command for `packages`.
    #[must_use]
    pub fn install_command(self, sudo: &str, packages: &[&str]) -> String {
        let list = packages.join(" ");
        match self {
            Self::Apt => format!(
                "{sudo}apt-get update -y && \
                 {sudo}env DEBIAN_FRONTEND=noninteractive \
                 apt-get install -y {list}"
            ),
            Self::Dnf => format!("{sudo}dnf install -y {list}"),
            Self::Yum => format!("{sudo}yum install -y {list}"),
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Apt => "apt",
            Self::Dnf => "dnf",
            Self::Yum => "yum",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packages {
    pub docker: &'static str,
    pub compose: &'static str,
    pub nginx: &'static str,
}

/// What the remote host looks like right now.
///
/// Taken in one SSH round-trip at the start of each step so the
/// step decides from a single consistent view instead of probing
/// ad hoc.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteState {
    pub package_manager: Option<PackageManager>,
    pub docker: bool,
    pub compose: bool,
    pub nginx: bool,
    pub docker_active: bool,
    pub nginx_active: bool,
    pub container_exists: bool,
    pub running_containers: u32,
    pub proxy_config: bool,
    pub deploy_dir: bool,
}

impl RemoteState {
    /// Take a snapshot. `container` is the fixed container name to
    /// look for, if the caller knows one.
    pub fn probe(
        remote: &dyn Remote,
        container: Option<&str>,
        remote_dir: &str,
    ) -> DeployResult<Self> {
        let script = probe_script(remote.sudo(), container, remote_dir);
        let output = remote.exec(&script)?;
        let state = Self::parse(&output)?;
        debug!("remote state on {}: {state:?}", remote.describe());
        Ok(state)
    }

    /// Parse the `key=value` lines printed by [`probe_script`].
    /// Unknown keys are ignored; the `pkg` key must be present so a
    /// truncated answer is not mistaken for an empty host.
    pub fn parse(output: &str) -> DeployResult<Self> {
        let mut state = Self::default();
        let mut seen_pkg = false;

        for line in output.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            let value = value.trim();
            let flag = value == "1";
            match key {
                "pkg" => {
                    seen_pkg = true;
                    state.package_manager = PackageManager::parse(value);
                }
                "docker" => state.docker = flag,
                "compose" => state.compose = flag,
                "nginx" => state.nginx = flag,
                "docker_active" => state.docker_active = flag,
                "nginx_active" => state.nginx_active = flag,
                "container" => state.container_exists = flag,
                "running" => state.running_containers = value.parse().unwrap_or(0),
                "proxy_conf" => state.proxy_config = flag,
                "deploy_dir" => state.deploy_dir = flag,
                _ => {}
            }
        }

        if !seen_pkg {
            return Err(DeployError::Other(format!(
                "unreadable remote state probe output: {output}"
            )));
        }
        Ok(state)
    }

    /// Docker, Compose and Nginx all present.
    #[must_use]
    pub const fn is_provisioned(&self) -> bool {
        self.docker && self.compose && self.nginx
    }
}

/// Shell script printing one `key=value` line per fact.
#[must_use]
pub fn probe_script(sudo: &str, container: Option<&str>, remote_dir: &str) -> String {
    let container_check = container.map_or_else(
        || "echo container=0".to_string(),
        |name| {
            format!(
                "if has docker && {sudo}docker ps -a --format '{{{{.Names}}}}' \
                 | grep -qx {}; then echo container=1; else echo container=0; fi",
                quote(name)
            )
        },
    );

    format!(
        "has() {{ command -v \"$1\" >/dev/null 2>&1; }}\n\
         flag() {{ if \"$@\" >/dev/null 2>&1; then echo 1; else echo 0; fi; }}\n\
         if has apt-get; then echo pkg=apt; \
         elif has dnf; then echo pkg=dnf; \
         elif has yum; then echo pkg=yum; \
         else echo pkg=none; fi\n\
         echo docker=$(flag has docker)\n\
         echo compose=$(flag {sudo}docker compose version)\n\
         echo nginx=$(flag has nginx)\n\
         echo docker_active=$(flag systemctl is-active --quiet docker)\n\
         echo nginx_active=$(flag systemctl is-active --quiet nginx)\n\
         {container_check}\n\
         if has docker; then echo running=$({sudo}docker ps -q 2>/dev/null | wc -l); \
         else echo running=0; fi\n\
         echo proxy_conf=$(flag test -f {PROXY_CONFIG_PATH})\n\
         echo deploy_dir=$(flag test -d {})\n",
        quote(remote_dir)
    )
}
