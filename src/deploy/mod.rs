pub mod compose;
pub mod container;

use crate::compose::Descriptor;
use crate::error::DeployResult;
use crate::remote::Remote;
use crate::state::RemoteState;

pub use compose::ComposeStack;
pub use container::SingleContainer;

/// A deployer builds and (re)starts the application on a host that
/// already holds the synchronized working copy.
pub trait Deployer {
    /// Short label for log lines.
    fn kind(&self) -> &'static str;

    /// Container name to look for in the state snapshot, if the
    /// strategy owns one.
    fn container(&self) -> Option<&str>;

    /// Build and start the application. Must be idempotent: running
    /// it twice leaves one copy of the application running.
    fn deploy(&self, remote: &dyn Remote, state: &RemoteState) -> DeployResult<()>;
}

/// Pick the strategy matching the staged descriptor.
#[must_use]
pub fn for_descriptor(
    descriptor: &Descriptor,
    container_name: &str,
    app_port: u16,
    remote_dir: &str,
) -> Box<dyn Deployer> {
    match descriptor {
        Descriptor::Compose(file) => Box::new(ComposeStack::new(remote_dir, file)),
        Descriptor::Dockerfile => {
            Box::new(SingleContainer::new(container_name, app_port, remote_dir))
        }
    }
}
