//! Drives the image pipeline over every service of a project.

use super::{ImagePipeline, StagePolicies};
use crate::docker::DockerCli;
use crate::error::StageError;
use crate::process::ProcessRunner;
use crate::project::{Project, ServiceDescriptor};

/// Runs services one after another, aborting on the first failure
pub struct ServiceOrchestrator<'a, R> {
    pipeline: ImagePipeline<'a, R>,
}

impl<'a, R: ProcessRunner> ServiceOrchestrator<'a, R> {
    /// Create an orchestrator publishing images under `registry_user`
    pub fn new(
        docker: &'a DockerCli<R>,
        policies: StagePolicies,
        registry_user: &'a str,
        use_cache: bool,
    ) -> Self {
        Self {
            pipeline: ImagePipeline::new(docker, policies, registry_user, use_cache),
        }
    }

    /// Publish every service of `project` in order.
    ///
    /// Returns the project's descriptors once all of them completed every stage.
    /// The first failed stage ends the run; remaining services are not attempted.
    pub async fn run<'p>(&self, project: &'p Project) -> Result<&'p [ServiceDescriptor], StageError> {
        let services = project.services();
        let total = services.len();

        for (index, service) in services.iter().enumerate() {
            log::info!(
                "[{}/{}] Building {} docker image ({})",
                index + 1,
                total,
                service.key,
                project.name
            );
            self.pipeline.run(project, service).await?;
        }

        Ok(services)
    }
}
