//! Docker CLI invocations used by the image pipeline.
//!
//! Each method maps to exactly one `docker` command run through a [`ProcessRunner`].

use crate::error::ProcessError;
use crate::process::{CommandSpec, ProcessRunner, Secret};
use std::path::Path;

/// Prefix of every published image name
pub const IMAGE_PREFIX: &str = "imagemonkey-";

/// Tag that is moved to the newest build on every release
pub const FLOATING_TAG: &str = "latest";

/// Directory (relative to the source root) holding the `Dockerfile.<key>` recipes
pub const DOCKERFILE_DIR: &str = "env/docker";

/// Floating and version-pinned references of one service image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRefs {
    /// `<user>/imagemonkey-<name>:latest`
    pub floating: String,
    /// `<user>/imagemonkey-<name>:<version>`
    pub pinned: String,
}

impl ImageRefs {
    /// Build both references for `image_name` owned by registry `user`
    pub fn new(user: &str, image_name: &str, version: &str) -> Self {
        let repository = format!("{user}/{IMAGE_PREFIX}{image_name}");
        Self {
            floating: format!("{repository}:{FLOATING_TAG}"),
            pinned: format!("{repository}:{version}"),
        }
    }
}

/// Thin wrapper turning container operations into `docker` commands
#[derive(Debug, Clone)]
pub struct DockerCli<R> {
    runner: R,
}

impl<R: ProcessRunner> DockerCli<R> {
    /// Wrap a process runner
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Underlying process runner
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// `docker build -t <tag> [--no-cache] -f env/docker/Dockerfile.<suffix> .` in `context_dir`
    pub async fn build(
        &self,
        tag: &str,
        dockerfile_suffix: &str,
        context_dir: &Path,
        use_cache: bool,
    ) -> Result<(), ProcessError> {
        let mut command = CommandSpec::new("docker").args(["build", "-t", tag]);
        if !use_cache {
            command = command.arg("--no-cache");
        }
        let command = command
            .args([
                "-f".to_string(),
                format!("{DOCKERFILE_DIR}/Dockerfile.{dockerfile_suffix}"),
                ".".to_string(),
            ])
            .current_dir(context_dir);

        self.runner.run(&command).await
    }

    /// `docker tag <old> <new>`
    pub async fn tag(&self, old_ref: &str, new_ref: &str) -> Result<(), ProcessError> {
        self.runner
            .run(&CommandSpec::new("docker").args(["tag", old_ref, new_ref]))
            .await
    }

    /// `docker push <reference>`
    pub async fn push(&self, reference: &str) -> Result<(), ProcessError> {
        self.runner
            .run(&CommandSpec::new("docker").args(["push", reference]))
            .await
    }

    /// `docker login --username <user> --password-stdin`, password written to stdin
    pub async fn login(&self, user: &str, password: &Secret) -> Result<(), ProcessError> {
        let command = CommandSpec::new("docker")
            .args(["login", "--username", user, "--password-stdin"])
            .stdin_secret(password.clone());

        self.runner.run(&command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_refs() {
        let refs = ImageRefs::new("acme", "db", "1.4.0");
        assert_eq!(refs.floating, "acme/imagemonkey-db:latest");
        assert_eq!(refs.pinned, "acme/imagemonkey-db:1.4.0");
    }
}
