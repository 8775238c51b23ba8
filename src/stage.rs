use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::cmd;
use crate::compose::{self, Descriptor};
use crate::config::DeploymentConfig;
use crate::error::{DeployError, DeployResult};
use crate::logging;

/// A local working copy ready to ship.
#[derive(Debug, Clone)]
pub struct StagedRepo {
    /// Repository name as written in the URL.
    pub name: String,
    pub path: PathBuf,
    pub descriptor: Descriptor,
}

/// Clone the repository, or bring an existing clone to the head of
/// the configured branch, then check it can be containerized.
///
/// Runs entirely on the local machine; a failure here means the
/// remote host was never contacted.
pub fn stage(config: &DeploymentConfig) -> DeployResult<StagedRepo> {
    let name = config.repo_name()?;
    let path = config.local_path()?;
    let auth = auth_env(config.access_token.as_ref());
    let env: Vec<(&str, &str)> = auth.iter().map(|(k, v)| (*k, v.as_str())).collect();

    if path.join(".git").is_dir() {
        info!(
            "Updating existing clone at {} (branch {})",
            path.display(),
            config.branch
        );
        update(&path, &config.branch, &env)?;
    } else {
        info!(
            "Cloning {} (branch {}) into {}",
            config.repo_url,
            config.branch,
            path.display()
        );
        clone(&config.repo_url, &config.branch, &path, &env)?;
    }

    let descriptor = Descriptor::detect(&path)?;
    describe(&path, &descriptor);

    Ok(StagedRepo {
        name,
        path,
        descriptor,
    })
}

fn clone(url: &str, branch: &str, path: &Path, env: &[(&str, &str)]) -> DeployResult<()> {
    let target = path.display().to_string();
    git(&["clone", "--branch", branch, url, &target], env)
}

fn update(path: &Path, branch: &str, env: &[(&str, &str)]) -> DeployResult<()> {
    let dir = path.display().to_string();
    git(&["-C", &dir, "fetch", "origin", branch], env)?;
    git(
        &["-C", &dir, "checkout", "--force", "-B", branch, "FETCH_HEAD"],
        env,
    )
}

fn git(args: &[&str], env: &[(&str, &str)]) -> DeployResult<()> {
    cmd::run_with_env("git", args, env).map_err(|e| match e {
        DeployError::CommandFailed { command, status } => {
            DeployError::Git(format!("{command} ({status})"))
        }
        other => other,
    })?;
    Ok(())
}

/// Environment handing the token to git as an HTTP header, so it
/// never lands in argv or in `.git/config`.
///
/// The encoded header is registered with the log redactor.
#[must_use]
pub fn auth_env(token: Option<&SecretString>) -> Vec<(&'static str, String)> {
    let mut env = vec![("GIT_TERMINAL_PROMPT", "0".to_string())];

    if let Some(token) = token {
        let encoded = STANDARD.encode(format!("x-access-token:{}", token.expose_secret()));
        logging::secrets().register(token.expose_secret());
        logging::secrets().register(&encoded);

        env.push(("GIT_CONFIG_COUNT", "1".to_string()));
        env.push(("GIT_CONFIG_KEY_0", "http.extraHeader".to_string()));
        env.push((
            "GIT_CONFIG_VALUE_0",
            format!("Authorization: Basic {encoded}"),
        ));
    }
    env
}

fn describe(path: &Path, descriptor: &Descriptor) {
    match compose::compose_path(path, descriptor) {
        None => info!("Found Dockerfile: single-container deployment"),
        Some(file) => {
            info!("Found {}: compose deployment", file.display());
            match compose::services(&file) {
                Ok(services) => {
                    for svc in services {
                        let source = if svc.builds {
                            "build".to_string()
                        } else {
                            svc.image.unwrap_or_else(|| "?".to_string())
                        };
                        info!("  service {} ({source}) ports {:?}", svc.name, svc.ports);
                    }
                }
                Err(e) => warn!("Could not read compose services: {e}"),
            }
        }
    }
}
