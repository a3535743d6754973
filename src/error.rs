//! Error types for imagemonkey_releaser operations.
//!
//! Components only ever return these values. Turning one into a diagnostic and a
//! non-zero exit code happens exactly once, in `main`.

use crate::pipeline::Stage;
use crate::retry::RetryError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for imagemonkey_releaser operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all imagemonkey_releaser operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Required configuration missing or invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Fetching the project sources failed
    #[error("Couldn't clone repository {url}: {source}")]
    Clone {
        /// Repository URL
        url: String,
        /// Underlying failure
        #[source]
        source: ProcessError,
    },

    /// Registry authentication failed
    #[error("Couldn't connect to DockerHub: {0}")]
    Login(#[source] RetryError<ProcessError>),

    /// A build/tag/push stage exhausted its retries
    #[error(transparent)]
    Stage(#[from] StageError),

    /// HTTP client for the release host could not be set up
    #[error("Couldn't initialise GitHub client: {0}")]
    GitHubClient(#[source] ApiError),

    /// Release host API call failed
    #[error("Couldn't create github release for project '{project}': {source}")]
    Release {
        /// Project whose release failed
        project: String,
        /// Underlying failure
        #[source]
        source: RetryError<ApiError>,
    },
}

/// Configuration errors, raised while resolving options at startup
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required value was not provided
    #[error("Missing required value '{name}' (flag --{flag} or env {env})")]
    Missing {
        /// Logical name of the value
        name: &'static str,
        /// Command line flag
        flag: &'static str,
        /// Environment variable
        env: &'static str,
    },

    /// A service descriptor is unusable
    #[error("Invalid service '{service}' in project '{project}': {reason}")]
    InvalidService {
        /// Project name
        project: String,
        /// Service key
        service: String,
        /// Reason for the error
        reason: String,
    },

    /// Two services would publish to the same image
    #[error("Duplicate image name '{image_name}' in project '{project}'")]
    DuplicateImage {
        /// Project name
        project: String,
        /// Image name used more than once
        image_name: String,
    },

    /// Unknown project requested
    #[error("Unknown project '{0}' (expected 'core' or 'playground')")]
    UnknownProject(String),

    /// No project selected
    #[error("No project selected")]
    NoProjects,
}

/// Failure of a single external process invocation
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Program could not be located on PATH
    #[error("'{program}' not found on PATH: {source}")]
    NotFound {
        /// Program name
        program: String,
        /// Lookup failure
        #[source]
        source: which::Error,
    },

    /// Program could not be started
    #[error("Failed to start '{command}': {source}")]
    Spawn {
        /// Rendered command line
        command: String,
        /// IO error
        #[source]
        source: std::io::Error,
    },

    /// Writing the secret to the child's stdin failed
    #[error("Failed to write stdin of '{command}': {source}")]
    Stdin {
        /// Rendered command line
        command: String,
        /// IO error
        #[source]
        source: std::io::Error,
    },

    /// Waiting for the child failed
    #[error("Failed to wait for '{command}': {source}")]
    Wait {
        /// Rendered command line
        command: String,
        /// IO error
        #[source]
        source: std::io::Error,
    },

    /// Program exited with a non-zero status
    #[error("'{command}' exited with {}", describe_exit(.code))]
    Failed {
        /// Rendered command line
        command: String,
        /// Exit code, `None` when terminated by a signal
        code: Option<i32>,
    },

    /// Program ran past its deadline and was killed
    #[error("'{command}' timed out after {}s", .timeout.as_secs())]
    TimedOut {
        /// Rendered command line
        command: String,
        /// Configured timeout
        timeout: Duration,
    },

    /// Filesystem work around a command failed
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        /// Path involved
        path: PathBuf,
        /// IO error
        #[source]
        source: std::io::Error,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (killed by signal)".to_string(),
    }
}

/// A build/tag/push stage that exhausted its retries
#[derive(Error, Debug)]
#[error("Couldn't {stage} '{service}' in project '{project}' after {attempts} attempts: {cause}")]
pub struct StageError {
    /// Project name
    pub project: String,
    /// Service key
    pub service: String,
    /// Failed stage
    pub stage: Stage,
    /// Attempts made
    pub attempts: u32,
    /// Error of the last attempt
    #[source]
    pub cause: ProcessError,
}

/// Release host API errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request could not be sent or the response not read
    #[error("Request to {url} failed: {source}")]
    Request {
        /// Request URL
        url: String,
        /// HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// Release host answered with a non-success status
    #[error("Release host returned {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },
}

impl ReleaseError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Config(ConfigError::Missing { flag, env, .. }) => vec![
                format!("Export {env} or pass --{flag}"),
                "Run with --help to list every recognized option".to_string(),
            ],
            ReleaseError::Login(_) => vec![
                "Verify DOCKER_USER and DOCKER_PASSWORD".to_string(),
                "Check that the docker daemon is running: docker info".to_string(),
            ],
            ReleaseError::Clone { .. } => vec![
                "Verify the repository URL is reachable: git ls-remote <url>".to_string(),
            ],
            ReleaseError::Stage(err) if matches!(err.cause, ProcessError::NotFound { .. }) => {
                vec!["Install docker and make sure it is on PATH".to_string()]
            }
            ReleaseError::Release { source, .. } => match &source.last {
                ApiError::Status { status: 401, .. } | ApiError::Status { status: 403, .. } => {
                    vec!["Check that GITHUB_ACCESS_TOKEN is valid and can create releases".to_string()]
                }
                ApiError::Status { status: 422, .. } => vec![
                    "A release with this tag probably exists already; bump the version".to_string(),
                ],
                _ => vec!["Retry with --release-attempts to tolerate API flakiness".to_string()],
            },
            _ => vec![],
        }
    }
}
