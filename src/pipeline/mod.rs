//! Per-service build → tag → push pipeline.
//!
//! Stages run strictly in order. A stage that runs out of attempts moves the
//! service to [`ServiceState::Failed`] and nothing after it runs.

mod orchestrator;

pub use orchestrator::ServiceOrchestrator;

use crate::docker::{DockerCli, ImageRefs};
use crate::error::StageError;
use crate::process::ProcessRunner;
use crate::project::{Project, ServiceDescriptor};
use crate::retry::{RetryPolicy, retry};
use std::fmt;
use std::time::Duration;

/// One step of a service pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// `docker build` with the floating tag
    Build,
    /// Add the version-pinned tag
    Tag,
    /// Push the floating tag
    PushFloating,
    /// Push the version-pinned tag
    PushVersion,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Stage; 4] = [Stage::Build, Stage::Tag, Stage::PushFloating, Stage::PushVersion];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Build => "build",
            Stage::Tag => "tag",
            Stage::PushFloating => "push floating tag of",
            Stage::PushVersion => "push version tag of",
        })
    }
}

/// Lifecycle of one service within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Nothing started
    Pending,
    /// Building the image
    Building,
    /// Creating the pinned tag
    Tagging,
    /// Pushing the floating tag
    PushingFloating,
    /// Pushing the pinned tag
    PushingVersion,
    /// All stages succeeded
    Done,
    /// A stage exhausted its retries
    Failed(Stage),
}

impl ServiceState {
    /// State entered when `stage` starts
    fn running(stage: Stage) -> Self {
        match stage {
            Stage::Build => ServiceState::Building,
            Stage::Tag => ServiceState::Tagging,
            Stage::PushFloating => ServiceState::PushingFloating,
            Stage::PushVersion => ServiceState::PushingVersion,
        }
    }
}

/// Retry policy of every stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePolicies {
    /// Slowest and most transient-failure-prone stage
    pub build: RetryPolicy,
    /// Local and cheap
    pub tag: RetryPolicy,
    /// Network-bound and large
    pub push_floating: RetryPolicy,
    /// Registry connection already proven by the floating push
    pub push_version: RetryPolicy,
}

impl Default for StagePolicies {
    fn default() -> Self {
        Self {
            build: RetryPolicy::new(5, Duration::from_secs(10)),
            tag: RetryPolicy::new(2, Duration::from_secs(2)),
            push_floating: RetryPolicy::new(10, Duration::from_secs(2)),
            push_version: RetryPolicy::new(2, Duration::from_secs(2)),
        }
    }
}

impl StagePolicies {
    /// Policy for `stage`
    pub fn for_stage(&self, stage: Stage) -> RetryPolicy {
        match stage {
            Stage::Build => self.build,
            Stage::Tag => self.tag,
            Stage::PushFloating => self.push_floating,
            Stage::PushVersion => self.push_version,
        }
    }
}

/// Runs the four stages for services of one project
pub struct ImagePipeline<'a, R> {
    docker: &'a DockerCli<R>,
    policies: StagePolicies,
    registry_user: &'a str,
    use_cache: bool,
}

impl<'a, R: ProcessRunner> ImagePipeline<'a, R> {
    /// Create a pipeline publishing under `registry_user`
    pub fn new(
        docker: &'a DockerCli<R>,
        policies: StagePolicies,
        registry_user: &'a str,
        use_cache: bool,
    ) -> Self {
        Self {
            docker,
            policies,
            registry_user,
            use_cache,
        }
    }

    /// Run every stage for `service`, stopping at the first exhausted stage
    pub async fn run(&self, project: &Project, service: &ServiceDescriptor) -> Result<(), StageError> {
        let refs = ImageRefs::new(self.registry_user, &service.image_name, &project.version);
        let mut state = ServiceState::Pending;
        log::debug!("{}/{}: {:?}", project.name, service.key, state);

        for stage in Stage::ALL {
            state = ServiceState::running(stage);
            log::debug!("{}/{}: {:?}", project.name, service.key, state);

            let outcome = retry(
                self.policies.for_stage(stage),
                &format!("{} {}", stage, service.key),
                || self.execute(stage, project, service, &refs),
            )
            .await;

            if let Err(err) = outcome {
                state = ServiceState::Failed(stage);
                log::debug!("{}/{}: {:?}", project.name, service.key, state);
                return Err(StageError {
                    project: project.name.clone(),
                    service: service.key.clone(),
                    stage,
                    attempts: err.attempts,
                    cause: err.last,
                });
            }
        }

        state = ServiceState::Done;
        log::debug!("{}/{}: {:?}", project.name, service.key, state);
        Ok(())
    }

    async fn execute(
        &self,
        stage: Stage,
        project: &Project,
        service: &ServiceDescriptor,
        refs: &ImageRefs,
    ) -> Result<(), crate::error::ProcessError> {
        match stage {
            Stage::Build => {
                self.docker
                    .build(&refs.floating, &service.key, &project.source_dir, self.use_cache)
                    .await
            }
            Stage::Tag => self.docker.tag(&refs.floating, &refs.pinned).await,
            Stage::PushFloating => self.docker.push(&refs.floating).await,
            Stage::PushVersion => self.docker.push(&refs.pinned).await,
        }
    }
}
