//! Projects and the services they publish.

use crate::error::ConfigError;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// One service of a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Selects the build recipe `env/docker/Dockerfile.<key>`
    pub key: String,
    /// Base name of the published image (`imagemonkey-<image_name>`)
    pub image_name: String,
}

impl ServiceDescriptor {
    /// Create a descriptor
    pub fn new(key: impl Into<String>, image_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            image_name: image_name.into(),
        }
    }
}

/// Services of the main ImageMonkey repository, in build order
pub const CORE_SERVICES: &[(&str, &str)] = &[
    ("api", "api"),
    ("web", "web"),
    ("statworker", "statworker"),
    ("blogsubscriptionworker", "blogsubscriptionworker"),
    ("trendinglabelsworker", "trendinglabelsworker"),
    ("dataprocessor", "dataprocessor"),
    ("postgres", "db"),
    ("testing", "testing"),
    ("pgbouncer", "pgbouncer"),
];

/// Services of the playground repository, in build order
pub const PLAYGROUND_SERVICES: &[(&str, &str)] = &[
    ("api", "playground-api"),
    ("web", "playground-web"),
];

/// Independently versioned groups of services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectKind {
    /// Main ImageMonkey services
    Core,
    /// Playground services
    Playground,
}

impl ProjectKind {
    /// Project name as used on the command line
    pub fn name(&self) -> &'static str {
        match self {
            ProjectKind::Core => "core",
            ProjectKind::Playground => "playground",
        }
    }

    /// Built-in ordered service set
    pub fn services(&self) -> Vec<ServiceDescriptor> {
        let table = match self {
            ProjectKind::Core => CORE_SERVICES,
            ProjectKind::Playground => PLAYGROUND_SERVICES,
        };
        table
            .iter()
            .map(|(key, image)| ServiceDescriptor::new(*key, *image))
            .collect()
    }

    /// Checkout directory name below the work dir
    pub fn source_dir_name(&self) -> &'static str {
        match self {
            ProjectKind::Core => "source",
            ProjectKind::Playground => "playground-source",
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProjectKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "core" => Ok(ProjectKind::Core),
            "playground" => Ok(ProjectKind::Playground),
            other => Err(ConfigError::UnknownProject(other.to_string())),
        }
    }
}

/// Fully resolved parameters of one project release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Project name, used in logs and errors
    pub name: String,
    /// Version being released
    pub version: String,
    /// Checkout location, read-only for the pipeline
    pub source_dir: PathBuf,
    /// GitHub repository name the release is created in
    pub repository: String,
    /// Clone URL
    pub repository_url: String,
    services: Vec<ServiceDescriptor>,
}

impl Project {
    /// Create a project, rejecting empty or colliding image names
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        source_dir: impl Into<PathBuf>,
        repository: impl Into<String>,
        repository_url: impl Into<String>,
        services: Vec<ServiceDescriptor>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let mut seen = HashSet::new();

        for service in &services {
            if service.key.is_empty() {
                return Err(ConfigError::InvalidService {
                    project: name,
                    service: service.image_name.clone(),
                    reason: "empty build key".to_string(),
                });
            }
            if service.image_name.is_empty() {
                return Err(ConfigError::InvalidService {
                    project: name,
                    service: service.key.clone(),
                    reason: "empty image name".to_string(),
                });
            }
            if !seen.insert(service.image_name.as_str()) {
                return Err(ConfigError::DuplicateImage {
                    project: name,
                    image_name: service.image_name.clone(),
                });
            }
        }

        Ok(Self {
            name,
            version: version.into(),
            source_dir: source_dir.into(),
            repository: repository.into(),
            repository_url: repository_url.into(),
            services,
        })
    }

    /// Services in build and release-notes order
    pub fn services(&self) -> &[ServiceDescriptor] {
        &self.services
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(services: Vec<ServiceDescriptor>) -> Result<Project, ConfigError> {
        Project::new("core", "1.0.0", "/tmp/source", "imagemonkey-core", "url", services)
    }

    #[test]
    fn test_builtin_sets_are_valid() {
        for kind in [ProjectKind::Core, ProjectKind::Playground] {
            assert!(project(kind.services()).is_ok(), "{kind} services must validate");
        }
    }

    #[test]
    fn test_core_order_is_stable() {
        let keys: Vec<_> = ProjectKind::Core
            .services()
            .into_iter()
            .map(|s| s.key)
            .collect();
        assert_eq!(keys.first().map(String::as_str), Some("api"));
        assert_eq!(keys.last().map(String::as_str), Some("pgbouncer"));
    }

    #[test]
    fn test_duplicate_image_name_rejected() {
        let err = project(vec![
            ServiceDescriptor::new("postgres", "db"),
            ServiceDescriptor::new("mysql", "db"),
        ])
        .expect_err("db is published twice");

        assert_eq!(
            err,
            ConfigError::DuplicateImage {
                project: "core".to_string(),
                image_name: "db".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_image_name_rejected() {
        let err = project(vec![ServiceDescriptor::new("api", "")]).expect_err("empty name");
        assert!(matches!(err, ConfigError::InvalidService { .. }));
    }

    #[test]
    fn test_project_kind_parsing() {
        assert_eq!("core".parse::<ProjectKind>(), Ok(ProjectKind::Core));
        assert_eq!("playground".parse::<ProjectKind>(), Ok(ProjectKind::Playground));
        assert!("website".parse::<ProjectKind>().is_err());
    }
}
