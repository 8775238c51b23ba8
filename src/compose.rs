use std::path::{Path, PathBuf};

use docker_compose_types::{Compose, Ports};

use crate::error::{DeployError, DeployResult};

/// File names recognised as a multi-service descriptor, in lookup
/// order.
pub const COMPOSE_FILES: [&str; 4] = [
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// How the staged repository wants to be run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    /// A compose file at the repository root.
    Compose(String),
    /// A single `Dockerfile` at the repository root.
    Dockerfile,
}

impl Descriptor {
    /// Look for a descriptor at the root of `dir`. A compose file
    /// wins over a Dockerfile when both exist.
    pub fn detect(dir: &Path) -> DeployResult<Self> {
        if let Some(file) = COMPOSE_FILES.iter().find(|f| dir.join(f).is_file()) {
            return Ok(Self::Compose((*file).to_string()));
        }
        if dir.join("Dockerfile").is_file() {
            return Ok(Self::Dockerfile);
        }
        Err(DeployError::DescriptorMissing(dir.display().to_string()))
    }

    #[must_use]
    pub const fn is_compose(&self) -> bool {
        matches!(self, Self::Compose(_))
    }
}

/// One service from a compose file, reduced to what the log shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeService {
    pub name: String,
    pub image: Option<String>,
    pub builds: bool,
    pub ports: Vec<String>,
}

/// Parse a compose file and list its services in file order.
pub fn services(path: &Path) -> DeployResult<Vec<ComposeService>> {
    let content = std::fs::read_to_string(path)?;
    parse_services(&content)
}

/// Parse compose YAML and list its services in file order.
pub fn parse_services(content: &str) -> DeployResult<Vec<ComposeService>> {
    let compose: Compose = serde_yaml::from_str(content)
        .map_err(|e| DeployError::Other(format!("invalid compose file: {e}")))?;

    Ok(compose
        .services
        .0
        .iter()
        .map(|(name, service)| {
            let service = service.clone().unwrap_or_default();
            let ports = match &service.ports {
                Ports::Short(list) => list.clone(),
                _ => Vec::new(),
            };
            ComposeService {
                name: name.clone(),
                image: service.image,
                builds: service.build_.is_some(),
                ports,
            }
        })
        .collect())
}

/// Path of the compose file inside `dir`, if the descriptor names
/// one.
#[must_use]
pub fn compose_path(dir: &Path, descriptor: &Descriptor) -> Option<PathBuf> {
    match descriptor {
        Descriptor::Compose(file) => Some(dir.join(file)),
        Descriptor::Dockerfile => None,
    }
}
