use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::config::DEFAULT_REMOTE_DIR;

/// Environment variable holding the repository access token. Never
/// accepted as a flag.
pub const TOKEN_ENV: &str = "DOCKHAND_TOKEN";

/// Command line. Every value left out is asked for interactively,
/// unless `--non-interactive` is given.
#[derive(Parser, Debug)]
#[command(name = "dockhand", version)]
#[command(about = "Deploy a Dockerized Git repository behind Nginx on a remote host")]
#[command(group(ArgGroup::new("mode").args(["cleanup", "status", "dry_run"])))]
pub struct Cli {
    /// Tear down containers, deployment directory and proxy config
    #[arg(long)]
    pub cleanup: bool,

    /// Show what is installed and running on the host
    #[arg(long)]
    pub status: bool,

    /// Print the proxy config and planned actions without touching
    /// anything
    #[arg(long)]
    pub dry_run: bool,

    /// Git repository URL
    #[arg(long, env = "DOCKHAND_REPO")]
    pub repo: Option<String>,

    /// Branch to deploy [default: main]
    #[arg(long, env = "DOCKHAND_BRANCH")]
    pub branch: Option<String>,

    /// SSH user on the target host
    #[arg(long, env = "DOCKHAND_USER")]
    pub user: Option<String>,

    /// Target host name or IP address
    #[arg(long, env = "DOCKHAND_HOST")]
    pub host: Option<String>,

    /// SSH private key
    #[arg(long, env = "DOCKHAND_KEY")]
    pub key: Option<PathBuf>,

    /// SSH port
    #[arg(
        long,
        env = "DOCKHAND_SSH_PORT",
        default_value_t = 22,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub ssh_port: u16,

    /// Port the application listens on inside its container
    #[arg(long, env = "DOCKHAND_PORT", value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Deployment directory on the host, relative to the SSH user's
    /// home
    #[arg(long, env = "DOCKHAND_REMOTE_DIR", default_value = DEFAULT_REMOTE_DIR)]
    pub remote_dir: String,

    /// Local directory holding the working copy
    #[arg(long, env = "DOCKHAND_WORKSPACE", default_value = ".")]
    pub workspace: PathBuf,

    /// Directory for the run transcript
    #[arg(long, env = "DOCKHAND_LOG_DIR", default_value = ".")]
    pub log_dir: PathBuf,

    /// Also delete files on the host that were removed locally
    #[arg(long)]
    pub mirror_deletions: bool,

    /// Fail instead of prompting for missing values
    #[arg(long)]
    pub non_interactive: bool,

    /// Debug output on the console
    #[arg(short, long)]
    pub verbose: bool,
}

/// What a run does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Deploy,
    Cleanup,
    Status,
    DryRun,
}

impl Cli {
    #[must_use]
    pub const fn mode(&self) -> Mode {
        if self.cleanup {
            Mode::Cleanup
        } else if self.status {
            Mode::Status
        } else if self.dry_run {
            Mode::DryRun
        } else {
            Mode::Deploy
        }
    }
}
