//! # ImageMonkey Releaser
//!
//! Release automation for ImageMonkey's docker images.
//!
//! For every configured project (core, playground) the releaser checks out the
//! sources, builds one docker image per service, tags it `latest` and
//! `<version>`, pushes both tags to Docker Hub and finally creates a GitHub
//! release `v<version>` whose notes link every published image.
//!
//! ## Features
//!
//! - **Ordered services**: build order and release notes are reproducible
//! - **Per-stage retries**: builds, tags and pushes each have their own policy
//! - **All-or-nothing**: a release is only created after every image of the project was pushed
//! - **No credential leaks**: the registry password travels through stdin only
//!
//! ## Usage
//!
//! ```bash
//! imagemonkey_releaser --version 1.4.0 --playground-version 0.3.1
//! imagemonkey_releaser --project core --version 1.4.0 --use-cache
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Core modules
pub mod cli;
pub mod docker;
pub mod error;
pub mod github;
pub mod pipeline;
pub mod process;
pub mod project;
pub mod releaser;
pub mod retry;
pub mod source;

// Re-export main types for public API
pub use cli::Args;
pub use error::{ConfigError, ReleaseError, Result};
pub use github::{GitHubPublisher, ReleasePublisher, ReleaseTarget, render_release_notes};
pub use pipeline::{ImagePipeline, ServiceOrchestrator, Stage, StagePolicies};
pub use process::{CommandSpec, ProcessRunner, Secret, SystemRunner};
pub use project::{Project, ProjectKind, ServiceDescriptor};
pub use releaser::Releaser;
pub use retry::{RetryPolicy, retry};

use std::time::Duration;

/// Configuration for a release run, resolved once at startup
#[derive(Debug, Clone)]
pub struct ReleaserConfig {
    /// Docker Hub user that owns the images
    pub docker_user: String,
    /// Docker Hub password or access token
    pub docker_password: Secret,
    /// GitHub owner of every project repository
    pub github_owner: String,
    /// GitHub token allowed to create releases
    pub github_token: Secret,
    /// GitHub REST endpoint
    pub github_api_url: String,
    /// Projects, released in this order
    pub projects: Vec<Project>,
    /// Retry policy of every image stage
    pub stage_policies: StagePolicies,
    /// Retry policy of `docker login`
    pub login_policy: RetryPolicy,
    /// Retry policy of the release-creation call
    pub release_policy: RetryPolicy,
    /// Let `docker build` use its layer cache
    pub use_cache: bool,
    /// Deadline for every external command (none by default)
    pub process_timeout: Option<Duration>,
}

impl ReleaserConfig {
    /// Configuration with the default policies and no projects
    pub fn new(
        docker_user: impl Into<String>,
        docker_password: Secret,
        github_owner: impl Into<String>,
        github_token: Secret,
    ) -> Self {
        Self {
            docker_user: docker_user.into(),
            docker_password,
            github_owner: github_owner.into(),
            github_token,
            github_api_url: github::DEFAULT_API_URL.to_string(),
            projects: Vec::new(),
            stage_policies: StagePolicies::default(),
            login_policy: RetryPolicy::once(),
            release_policy: RetryPolicy::once(),
            use_cache: false,
            process_timeout: None,
        }
    }
}

/// Result of one project's release
#[derive(Debug, Clone)]
pub struct ProjectReport {
    /// Project name
    pub project: String,
    /// Released version
    pub version: String,
    /// Published image references, floating and pinned
    pub images: Vec<String>,
    /// URL of the created release
    pub release_url: String,
}
