//! Top-level release flow.
//!
//! Login once, then for every project in order: checkout, publish all images,
//! render notes, create the release. Any error ends the run.

use crate::cli::OutputManager;
use crate::docker::{DockerCli, ImageRefs};
use crate::error::{ReleaseError, Result};
use crate::github::{ReleasePublisher, ReleaseTarget, render_release_notes};
use crate::pipeline::ServiceOrchestrator;
use crate::process::ProcessRunner;
use crate::project::Project;
use crate::retry::retry;
use crate::source::{SourceStatus, ensure_source};
use crate::{ProjectReport, ReleaserConfig};

/// Runs complete releases against a process runner and a release host
pub struct Releaser<'a, R, P> {
    config: &'a ReleaserConfig,
    docker: DockerCli<R>,
    publisher: P,
    output: OutputManager,
}

impl<'a, R, P> Releaser<'a, R, P>
where
    R: ProcessRunner,
    P: ReleasePublisher,
{
    /// Create a releaser for `config`
    pub fn new(config: &'a ReleaserConfig, runner: R, publisher: P, output: OutputManager) -> Self {
        Self {
            config,
            docker: DockerCli::new(runner),
            publisher,
            output,
        }
    }

    /// Release every configured project, strictly one after another
    pub async fn run(&self) -> Result<Vec<ProjectReport>> {
        self.output.progress("Connecting to DockerHub...");
        retry(self.config.login_policy, "docker login", || {
            self.docker
                .login(&self.config.docker_user, &self.config.docker_password)
        })
        .await
        .map_err(ReleaseError::Login)?;
        self.output
            .success(&format!("Logged in as {}", self.config.docker_user));

        let mut reports = Vec::with_capacity(self.config.projects.len());
        for project in &self.config.projects {
            reports.push(self.release_project(project).await?);
        }
        Ok(reports)
    }

    /// Publish all images of `project` and create its release
    pub async fn release_project(&self, project: &Project) -> Result<ProjectReport> {
        self.output
            .section(&format!("{} v{}", project.name, project.version));

        let status = ensure_source(self.docker.runner(), &project.repository_url, &project.source_dir)
            .await
            .map_err(|source| ReleaseError::Clone {
                url: project.repository_url.clone(),
                source,
            })?;
        if status == SourceStatus::Cloned {
            self.output
                .indent(&format!("Cloned into {}", project.source_dir.display()));
        }

        let orchestrator = ServiceOrchestrator::new(
            &self.docker,
            self.config.stage_policies,
            &self.config.docker_user,
            self.config.use_cache,
        );
        let services = orchestrator.run(project).await?;

        let images: Vec<String> = services
            .iter()
            .flat_map(|service| {
                let refs = ImageRefs::new(&self.config.docker_user, &service.image_name, &project.version);
                [refs.floating, refs.pinned]
            })
            .collect();
        self.output
            .success(&format!("Pushed {} images", images.len()));

        self.output.progress("Connecting with Github...");
        let target = ReleaseTarget::new(
            &self.config.github_owner,
            &project.repository,
            self.config.github_token.clone(),
            &project.version,
            render_release_notes(&self.config.docker_user, services),
        );

        let release = retry(self.config.release_policy, "create github release", || {
            self.publisher.create_release(&target)
        })
        .await
        .map_err(|source| ReleaseError::Release {
            project: project.name.clone(),
            source,
        })?;

        self.output
            .success(&format!("Released {}: {}", target.tag_name, release.html_url));

        Ok(ProjectReport {
            project: project.name.clone(),
            version: project.version.clone(),
            images,
            release_url: release.html_url,
        })
    }
}
