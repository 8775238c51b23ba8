//! Deploy a Dockerized Git repository to a remote host behind an
//! Nginx reverse proxy, over plain SSH.
//!
//! dockhand stages a repository locally, makes sure the target host
//! has Docker, Docker Compose and Nginx, ships the working copy with
//! `rsync`, builds and starts the container(s), and puts Nginx on
//! port 80 in front of the application. A cleanup mode removes all
//! of it again.
//!
//! # Overview
//!
//! A deployment is a [`Pipeline`] built from a
//! [`DeploymentConfig`]. The steps run strictly in order:
//!
//! 1. **Stage** - clone or update the repository and check it has a
//!    `Dockerfile` or a compose file ([`stage`])
//! 2. **Connect** - one SSH round-trip; failing here aborts before
//!    anything on the host changes
//! 3. **Bootstrap** - install whatever is missing of Docker, the
//!    Compose plugin and Nginx ([`provision`])
//! 4. **Transfer** - `rsync` the working copy ([`transfer`])
//! 5. **Deploy** - compose stack or single loopback-bound container
//!    ([`deploy`])
//! 6. **Proxy** - one Nginx server block forwarding port 80 to the
//!    app ([`nginx`])
//! 7. **Validate** - services active, app answering through the
//!    proxy ([`validate`])
//!
//! Any failure from step 3 on runs [`cleanup`] before the error is
//! returned.
//!
//! Each step reads a [`RemoteState`](state::RemoteState) snapshot
//! and talks to the host through the [`Remote`](remote::Remote)
//! trait, implemented over SSH by [`SshSession`].
//!
//! # Example
//!
//! ```rust,no_run
//! use dockhand::{DeploymentConfig, Pipeline, Proxy, SshTarget};
//!
//! fn main() -> anyhow::Result<()> {
//!     let target = SshTarget::new("ubuntu", "203.0.113.7")
//!         .key("~/.ssh/id_ed25519");
//!
//!     let config = DeploymentConfig::new(
//!         "https://github.com/example/hello-node.git",
//!         target,
//!         3000,
//!     )
//!     .branch("main");
//!
//!     let report = Pipeline::new(config)
//!         .proxy(Proxy::new(3000).client_max_body_size("10m"))
//!         .run()?;
//!
//!     assert!(report.app_ok());
//!     Ok(())
//! }
//! ```
//!
//! From the command line:
//!
//! ```sh
//! # Interactive deployment
//! dockhand
//!
//! # Scripted deployment, token from the environment
//! DOCKHAND_TOKEN=ghp_... dockhand --non-interactive \
//!     --repo https://github.com/example/hello-node.git \
//!     --user ubuntu --host 203.0.113.7 --port 3000
//!
//! # Tear everything down again
//! dockhand --cleanup
//! ```

#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cleanup;
pub mod cli;
pub mod cmd;
pub mod compose;
pub mod config;
pub mod deploy;
pub mod error;
pub mod interrupt;
pub mod logging;
pub mod nginx;
pub mod pipeline;
pub mod prompt;
pub mod provision;
pub mod proxy;
pub mod remote;
pub mod ssh;
pub mod stage;
pub mod state;
pub mod transfer;
pub mod validate;

pub use config::{DeploymentConfig, SshTarget};
pub use pipeline::Pipeline;
pub use proxy::Proxy;
pub use ssh::SshSession;
