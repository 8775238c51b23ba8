use tracing::info;

use crate::deploy::Deployer;
use crate::error::DeployResult;
use crate::remote::{Remote, quote};
use crate::state::RemoteState;

/// Build one image from the synchronized `Dockerfile` and run it as
/// a fixed-name container bound to loopback only.
///
/// External exposure is left to the reverse proxy.
///
/// # Example
///
/// ```
/// use dockhand::deploy::SingleContainer;
///
/// let deployer = SingleContainer::new("hello-node", 3000, "app_deploy");
///
/// assert_eq!(deployer.image_tag(), "hello-node:latest");
/// assert_eq!(deployer.publish(), "127.0.0.1:3000:3000");
/// ```
pub struct SingleContainer {
    name: String,
    port: u16,
    remote_dir: String,
}

impl SingleContainer {
    #[must_use]
    pub fn new(name: &str, port: u16, remote_dir: &str) -> Self {
        Self {
            name: name.to_lowercase(),
            port,
            remote_dir: remote_dir.to_string(),
        }
    }

    #[must_use]
    pub fn image_tag(&self) -> String {
        format!("{}:latest", self.name)
    }

    /// `-p` value: the internal port on loopback, same port inside.
    #[must_use]
    pub fn publish(&self) -> String {
        format!("127.0.0.1:{0}:{0}", self.port)
    }
}

impl Deployer for SingleContainer {
    fn kind(&self) -> &'static str {
        "single container"
    }

    fn container(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn deploy(&self, remote: &dyn Remote, state: &RemoteState) -> DeployResult<()> {
        let sudo = remote.sudo();
        let tag = self.image_tag();
        let name = quote(&self.name);

        // The tag moves to the new image once built.
        info!("Stopping containers running {tag}...");
        remote.exec(&format!(
            "{sudo}docker ps -q --filter ancestor={} | xargs -r {sudo}docker stop",
            quote(&tag)
        ))?;

        info!("Building image {tag}...");
        remote.exec(&format!(
            "{sudo}docker build -t {} {}",
            quote(&tag),
            quote(&self.remote_dir)
        ))?;

        if state.container_exists {
            info!("Removing previous container {}", self.name);
            remote.exec(&format!("{sudo}docker rm -f {name}"))?;
        }

        info!(
            "Starting container {} on {}",
            self.name,
            self.publish()
        );
        remote.exec(&format!(
            "{sudo}docker run -d --name {name} --restart unless-stopped -p {} {}",
            self.publish(),
            quote(&tag)
        ))?;
        Ok(())
    }
}
