//! Command line argument parsing and configuration resolution.
//!
//! Every option falls back to an environment variable so the releaser can run
//! unattended in a container with nothing but its environment configured.

use crate::error::ConfigError;
use crate::github::DEFAULT_API_URL;
use crate::pipeline::StagePolicies;
use crate::process::Secret;
use crate::project::{Project, ProjectKind};
use crate::retry::RetryPolicy;
use crate::ReleaserConfig;
use clap::Parser;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Build, tag and push ImageMonkey docker images, then create the GitHub release
#[derive(Parser, Clone)]
#[command(
    name = "imagemonkey_releaser",
    about = "Build, tag and push ImageMonkey docker images, then create the GitHub release",
    long_about = "Build, tag and push ImageMonkey docker images, then create the GitHub release.

For every selected project the sources are cloned (or an existing checkout reused),
each service image is built and pushed as <user>/imagemonkey-<name>:latest and
<user>/imagemonkey-<name>:<version>, and a release v<version> is created.

Usage:
  imagemonkey_releaser --version 1.4.0 --playground-version 0.3.1
  imagemonkey_releaser --project core --version 1.4.0"
)]
pub struct Args {
    /// Version of the core project
    #[arg(long = "version", env = "IMAGEMONKEY_VERSION", value_name = "VERSION")]
    pub core_version: Option<String>,

    /// Version of the playground project
    #[arg(long, env = "IMAGEMONKEY_PLAYGROUND_VERSION", value_name = "VERSION")]
    pub playground_version: Option<String>,

    /// Docker Hub user owning the images
    #[arg(long, env = "DOCKER_USER")]
    pub docker_user: Option<String>,

    /// Docker Hub password or access token
    #[arg(long, env = "DOCKER_PASSWORD", hide_env_values = true)]
    pub docker_password: Option<String>,

    /// GitHub token used to create releases
    #[arg(long, env = "GITHUB_ACCESS_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub owner of the repositories
    #[arg(long, env = "GITHUB_PROJECT_OWNER")]
    pub github_owner: Option<String>,

    /// GitHub repository of the core project
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    /// Clone URL of the core project
    #[arg(long, env = "GITHUB_REPOSITORY_URL")]
    pub repository_url: Option<String>,

    /// GitHub repository of the playground project
    #[arg(long, env = "GITHUB_PLAYGROUND_REPOSITORY")]
    pub playground_repository: Option<String>,

    /// Clone URL of the playground project
    #[arg(long, env = "GITHUB_PLAYGROUND_REPOSITORY_URL")]
    pub playground_repository_url: Option<String>,

    /// Projects to release (core, playground)
    #[arg(
        long = "project",
        value_name = "PROJECT",
        value_delimiter = ',',
        default_values = ["core", "playground"]
    )]
    pub projects: Vec<ProjectKind>,

    /// Directory the project sources are checked out into
    #[arg(long, env = "IMAGEMONKEY_WORK_DIR", default_value = "/tmp")]
    pub work_dir: PathBuf,

    /// Let docker reuse cached layers
    #[arg(long)]
    pub use_cache: bool,

    /// Attempts for creating a GitHub release
    #[arg(long, default_value_t = 1)]
    pub release_attempts: u32,

    /// Seconds between release attempts
    #[arg(long, default_value_t = 5)]
    pub release_delay_secs: u64,

    /// Kill any external command running longer than this
    #[arg(long, value_name = "SECONDS")]
    pub process_timeout_secs: Option<u64>,

    /// GitHub REST endpoint
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub github_api_url: String,

    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");

        f.debug_struct("Args")
            .field("core_version", &self.core_version)
            .field("playground_version", &self.playground_version)
            .field("docker_user", &self.docker_user)
            .field("docker_password", &redacted(&self.docker_password))
            .field("github_token", &redacted(&self.github_token))
            .field("github_owner", &self.github_owner)
            .field("repository", &self.repository)
            .field("repository_url", &self.repository_url)
            .field("playground_repository", &self.playground_repository)
            .field("playground_repository_url", &self.playground_repository_url)
            .field("projects", &self.projects)
            .field("work_dir", &self.work_dir)
            .field("use_cache", &self.use_cache)
            .field("release_attempts", &self.release_attempts)
            .field("release_delay_secs", &self.release_delay_secs)
            .field("process_timeout_secs", &self.process_timeout_secs)
            .field("github_api_url", &self.github_api_url)
            .field("quiet", &self.quiet)
            .finish()
    }
}

/// Name, flag and environment variable of one required value
struct Setting {
    name: &'static str,
    flag: &'static str,
    env: &'static str,
}

const CORE_VERSION: Setting = Setting { name: "core version", flag: "version", env: "IMAGEMONKEY_VERSION" };
const PLAYGROUND_VERSION: Setting = Setting {
    name: "playground version",
    flag: "playground-version",
    env: "IMAGEMONKEY_PLAYGROUND_VERSION",
};
const DOCKER_USER: Setting = Setting { name: "docker user", flag: "docker-user", env: "DOCKER_USER" };
const DOCKER_PASSWORD: Setting = Setting { name: "docker password", flag: "docker-password", env: "DOCKER_PASSWORD" };
const GITHUB_TOKEN: Setting = Setting { name: "github token", flag: "github-token", env: "GITHUB_ACCESS_TOKEN" };
const GITHUB_OWNER: Setting = Setting { name: "github owner", flag: "github-owner", env: "GITHUB_PROJECT_OWNER" };
const CORE_REPOSITORY: Setting = Setting { name: "core repository", flag: "repository", env: "GITHUB_REPOSITORY" };
const CORE_REPOSITORY_URL: Setting = Setting {
    name: "core repository url",
    flag: "repository-url",
    env: "GITHUB_REPOSITORY_URL",
};
const PLAYGROUND_REPOSITORY: Setting = Setting {
    name: "playground repository",
    flag: "playground-repository",
    env: "GITHUB_PLAYGROUND_REPOSITORY",
};
const PLAYGROUND_REPOSITORY_URL: Setting = Setting {
    name: "playground repository url",
    flag: "playground-repository-url",
    env: "GITHUB_PLAYGROUND_REPOSITORY_URL",
};

/// Empty strings count as missing
fn required(value: &Option<String>, setting: Setting) -> Result<String, ConfigError> {
    required_secret(value, setting).map(|v| v.trim().to_string())
}

/// Like [`required`], but the value is kept exactly as given
fn required_secret(value: &Option<String>, setting: Setting) -> Result<String, ConfigError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::Missing {
            name: setting.name,
            flag: setting.flag,
            env: setting.env,
        })
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Resolve everything the release needs, failing on the first missing value
    pub fn resolve(&self) -> Result<ReleaserConfig, ConfigError> {
        if self.projects.is_empty() {
            return Err(ConfigError::NoProjects);
        }

        let mut config = ReleaserConfig::new(
            required(&self.docker_user, DOCKER_USER)?,
            Secret::new(required_secret(&self.docker_password, DOCKER_PASSWORD)?),
            required(&self.github_owner, GITHUB_OWNER)?,
            Secret::new(required_secret(&self.github_token, GITHUB_TOKEN)?),
        );

        // core always goes first, whatever order was given
        for kind in [ProjectKind::Core, ProjectKind::Playground] {
            if self.projects.contains(&kind) {
                config.projects.push(self.resolve_project(kind)?);
            }
        }

        config.github_api_url = self.github_api_url.clone();
        config.stage_policies = StagePolicies::default();
        config.release_policy = RetryPolicy::new(
            self.release_attempts,
            Duration::from_secs(self.release_delay_secs),
        );
        config.use_cache = self.use_cache;
        config.process_timeout = self.process_timeout_secs.map(Duration::from_secs);

        Ok(config)
    }

    fn resolve_project(&self, kind: ProjectKind) -> Result<Project, ConfigError> {
        let (version, repository, repository_url) = match kind {
            ProjectKind::Core => (
                required(&self.core_version, CORE_VERSION)?,
                required(&self.repository, CORE_REPOSITORY)?,
                required(&self.repository_url, CORE_REPOSITORY_URL)?,
            ),
            ProjectKind::Playground => (
                required(&self.playground_version, PLAYGROUND_VERSION)?,
                required(&self.playground_repository, PLAYGROUND_REPOSITORY)?,
                required(&self.playground_repository_url, PLAYGROUND_REPOSITORY_URL)?,
            ),
        };

        Project::new(
            kind.name(),
            version,
            self.work_dir.join(kind.source_dir_name()),
            repository,
            repository_url,
            kind.services(),
        )
    }
}
