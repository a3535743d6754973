//! Command line interface for imagemonkey_releaser.
//!
//! Parses arguments, resolves the configuration and hands it to the
//! [`Releaser`](crate::Releaser) with the real process runner and GitHub client.

mod args;
mod output;

pub use args::Args;
pub use output::OutputManager;

use crate::error::{ReleaseError, Result};
use crate::github::GitHubPublisher;
use crate::process::SystemRunner;
use crate::releaser::Releaser;

/// Main CLI entry point
pub async fn run() -> Result<()> {
    let args = Args::parse_args();
    execute(&args).await
}

/// Run a release for already parsed arguments
pub async fn execute(args: &Args) -> Result<()> {
    let output = OutputManager::new(args.quiet);
    let config = args.resolve()?;

    output.info("ImageMonkey-Releaser started");
    if config.use_cache {
        output.warn("Docker layer cache enabled, images may contain stale layers");
    }

    let runner = SystemRunner::with_timeout(config.process_timeout);
    let publisher =
        GitHubPublisher::new(config.github_api_url.clone()).map_err(ReleaseError::GitHubClient)?;

    let reports = Releaser::new(&config, runner, publisher, output.clone())
        .run()
        .await?;

    output.section("Summary");
    for report in &reports {
        output.success(&format!(
            "{} v{}: {} images, {}",
            report.project,
            report.version,
            report.images.len(),
            report.release_url
        ));
    }

    Ok(())
}
