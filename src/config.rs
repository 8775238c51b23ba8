use std::path::{Path, PathBuf};

use secrecy::SecretString;

use crate::error::{DeployError, DeployResult};

/// Branch deployed when none is given.
pub const DEFAULT_BRANCH: &str = "main";

/// Deployment directory on the remote host, relative to the SSH
/// user's home directory.
pub const DEFAULT_REMOTE_DIR: &str = "app_deploy";

/// The one Nginx server block owned by dockhand.
pub const PROXY_CONFIG_PATH: &str = "/etc/nginx/conf.d/dockhand_app.conf";

/// Where an SSH session lands: user, host, optional identity file
/// and port.
///
/// # Example
///
/// ```
/// use dockhand::SshTarget;
///
/// let target = SshTarget::new("deploy", "203.0.113.7").key("~/.ssh/id_ed25519");
///
/// assert_eq!(target.destination(), "deploy@203.0.113.7");
/// assert_eq!(target.sudo(), "sudo -n ");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub user: String,
    pub host: String,
    pub key: Option<PathBuf>,
    pub port: u16,
}

impl SshTarget {
    #[must_use]
    pub fn new(user: &str, host: &str) -> Self {
        Self {
            user: user.to_string(),
            host: host.to_string(),
            key: None,
            port: 22,
        }
    }

    #[must_use]
    pub fn key(mut self, path: impl AsRef<Path>) -> Self {
        self.key = Some(expand_home(path.as_ref()));
        self
    }

    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Prefix for privileged remote commands. Non-interactive so a
    /// missing sudoers entry fails instead of hanging on a password
    /// prompt.
    #[must_use]
    pub fn sudo(&self) -> &'static str {
        if self.user == "root" { "" } else { "sudo -n " }
    }
}

/// Everything one deployment run needs. Built once by the input
/// collector and never modified afterwards.
#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    pub repo_url: String,
    pub access_token: Option<SecretString>,
    pub branch: String,
    pub target: SshTarget,
    pub app_port: u16,
    pub remote_dir: String,
    pub workspace: PathBuf,
    pub mirror_deletions: bool,
}

impl DeploymentConfig {
    #[must_use]
    pub fn new(repo_url: &str, target: SshTarget, app_port: u16) -> Self {
        Self {
            repo_url: repo_url.trim().to_string(),
            access_token: None,
            branch: DEFAULT_BRANCH.to_string(),
            target,
            app_port,
            remote_dir: DEFAULT_REMOTE_DIR.to_string(),
            workspace: PathBuf::from("."),
            mirror_deletions: false,
        }
    }

    /// Set the access token. A blank token means anonymous access.
    #[must_use]
    pub fn access_token(mut self, token: SecretString) -> Self {
        use secrecy::ExposeSecret;

        self.access_token = if token.expose_secret().trim().is_empty() {
            None
        } else {
            Some(token)
        };
        self
    }

    /// Set the branch. Blank falls back to [`DEFAULT_BRANCH`].
    #[must_use]
    pub fn branch(mut self, branch: &str) -> Self {
        let branch = branch.trim();
        self.branch = if branch.is_empty() {
            DEFAULT_BRANCH.to_string()
        } else {
            branch.to_string()
        };
        self
    }

    #[must_use]
    pub fn remote_dir(mut self, dir: &str) -> Self {
        self.remote_dir = dir.to_string();
        self
    }

    #[must_use]
    pub fn workspace(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workspace = dir.into();
        self
    }

    #[must_use]
    pub const fn mirror_deletions(mut self, enabled: bool) -> Self {
        self.mirror_deletions = enabled;
        self
    }

    /// Repository name as written in the URL.
    pub fn repo_name(&self) -> DeployResult<String> {
        repo_name(&self.repo_url)
    }

    /// Image tag and container name: the lower-cased repository
    /// name.
    pub fn container_name(&self) -> DeployResult<String> {
        Ok(self.repo_name()?.to_lowercase())
    }

    /// Local working copy location.
    pub fn local_path(&self) -> DeployResult<PathBuf> {
        Ok(self.workspace.join(self.repo_name()?))
    }
}

/// Derive the repository name from a clone URL.
///
/// Works for `https://host/org/name(.git)`, `git@host:org/name.git`
/// and trailing slashes.
pub fn repo_name(url: &str) -> DeployResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default();
    let name = last.strip_suffix(".git").unwrap_or(last);

    if name.is_empty() || name.contains('@') || trimmed == name {
        return Err(DeployError::Config(format!(
            "cannot derive a repository name from '{url}'"
        )));
    }
    Ok(name.to_string())
}

/// Reject remote directories that would make cleanup's `rm -rf`
/// reach outside the deployment.
pub fn check_remote_dir(dir: &str) -> DeployResult<()> {
    let trimmed = dir.trim().trim_end_matches('/');
    let forbidden = ["", ".", "..", "~", "$HOME"];
    if forbidden.contains(&trimmed) || trimmed.split('/').any(|part| part == "..") {
        return Err(DeployError::Config(format!(
            "refusing to use '{dir}' as the remote deployment directory"
        )));
    }
    Ok(())
}

/// Expand a leading `~/` against `$HOME`.
#[must_use]
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}
