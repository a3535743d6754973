//! Project checkout.
//!
//! Sources are cloned with the system `git`. An existing checkout is reused as-is,
//! which keeps repeated runs on the same host cheap.

use crate::error::ProcessError;
use crate::process::{CommandSpec, ProcessRunner};
use std::path::Path;

/// Outcome of [`ensure_source`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    /// Repository was cloned now
    Cloned,
    /// Target directory existed and was reused
    Reused,
}

/// Clone `url` into `target` unless `target` already exists.
///
/// A failed clone removes whatever was written to `target` so the next run
/// does not mistake a half-written checkout for a complete one.
pub async fn ensure_source<R: ProcessRunner>(
    runner: &R,
    url: &str,
    target: &Path,
) -> Result<SourceStatus, ProcessError> {
    if target.exists() {
        log::info!("Repository already exists at {}, reusing it", target.display());
        return Ok(SourceStatus::Reused);
    }

    log::info!("Checking out {} to {}...", url, target.display());

    let command = CommandSpec::new("git")
        .arg("clone")
        .arg(url)
        .arg(target.to_string_lossy())
        .env("GIT_TERMINAL_PROMPT", "0");

    if let Err(err) = runner.run(&command).await {
        if target.exists() {
            tokio::fs::remove_dir_all(target)
                .await
                .map_err(|source| ProcessError::Io {
                    path: target.to_path_buf(),
                    source,
                })?;
        }
        return Err(err);
    }

    Ok(SourceStatus::Cloned)
}
