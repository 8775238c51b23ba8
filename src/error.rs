use std::process::ExitStatus;

pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("command failed: {command}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("SSH connection failed: {0}")]
    SshFailed(String),

    #[error("prerequisite missing: {0}")]
    PrerequisiteMissing(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(
        "no Dockerfile or compose descriptor found in {0}"
    )]
    DescriptorMissing(String),

    #[error("git error: {0}")]
    Git(String),

    #[error("proxy configuration rejected by nginx: {0}")]
    ProxyConfigInvalid(String),

    #[error("service '{0}' is not active on the remote host")]
    ServiceInactive(String),

    #[error("interrupted")]
    Interrupted,

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DeployError {
    /// Whether the failure happened on the local side before the
    /// remote host was touched. Such failures leave nothing to
    /// clean up.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::DescriptorMissing(_)
                | Self::Git(_)
                | Self::SshFailed(_)
        )
    }
}
