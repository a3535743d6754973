//! External process execution.
//!
//! Everything the releaser does to the outside world (docker, git) goes through
//! [`ProcessRunner`]. Success is decided by the exit status alone; output is never
//! parsed and streams straight to the caller's terminal.

use crate::error::ProcessError;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Secret value that is piped to a child's stdin and never printed
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the raw value
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// One external command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to run, looked up on PATH
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory, inherited when `None`
    pub working_dir: Option<PathBuf>,
    /// Variables added on top of the inherited environment
    pub env: Vec<(String, String)>,
    /// Written to stdin, then stdin is closed
    pub stdin: Option<Secret>,
}

impl CommandSpec {
    /// New command with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
            stdin: None,
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run inside `dir`
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Feed `secret` through stdin
    pub fn stdin_secret(mut self, secret: Secret) -> Self {
        self.stdin = Some(secret);
        self
    }

    /// Command line for logs and errors. Stdin content is never included.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs external commands to completion.
#[allow(async_fn_in_trait)]
pub trait ProcessRunner {
    /// Start `command`, wait for it and fail unless it exits with status 0
    async fn run(&self, command: &CommandSpec) -> Result<(), ProcessError>;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    async fn run(&self, command: &CommandSpec) -> Result<(), ProcessError> {
        (**self).run(command).await
    }
}

/// [`ProcessRunner`] backed by real child processes
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    /// Runner without any deadline; a hanging command blocks forever
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill and fail commands that run longer than `timeout`
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl ProcessRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<(), ProcessError> {
        let rendered = spec.display();

        let program = which::which(&spec.program).map_err(|source| ProcessError::NotFound {
            program: spec.program.clone(),
            source,
        })?;

        log::debug!("Running: {}", rendered);

        let mut command = Command::new(program);
        command
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::inherit()
            })
            .kill_on_drop(true);

        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            command: rendered.clone(),
            source,
        })?;

        if let Some(secret) = &spec.stdin
            && let Some(mut stdin) = child.stdin.take()
        {
            stdin
                .write_all(secret.expose().as_bytes())
                .await
                .map_err(|source| ProcessError::Stdin {
                    command: rendered.clone(),
                    source,
                })?;
            // dropping stdin sends EOF
            drop(stdin);
        }

        let status = match self.timeout {
            None => child.wait().await,
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(waited) => waited,
                Err(_) => {
                    if let Err(e) = child.kill().await {
                        log::warn!("Failed to kill timed out '{}': {}", rendered, e);
                    }
                    return Err(ProcessError::TimedOut {
                        command: rendered,
                        timeout: limit,
                    });
                }
            },
        }
        .map_err(|source| ProcessError::Wait {
            command: rendered.clone(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(ProcessError::Failed {
                command: rendered,
                code: status.code(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_omits_stdin_secret() {
        let spec = CommandSpec::new("docker")
            .args(["login", "--username", "acme", "--password-stdin"])
            .stdin_secret(Secret::new("hunter2"));

        assert_eq!(spec.display(), "docker login --username acme --password-stdin");
        assert!(!format!("{:?}", spec).contains("hunter2"));
    }

    #[tokio::test]
    async fn test_missing_program_is_not_found() {
        let runner = SystemRunner::new();
        let spec = CommandSpec::new("imagemonkey-definitely-not-installed");

        let err = runner.run(&spec).await.expect_err("program does not exist");
        assert!(matches!(err, ProcessError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_decides_success() {
        let runner = SystemRunner::new();

        assert!(runner.run(&CommandSpec::new("true")).await.is_ok());

        let err = runner
            .run(&CommandSpec::new("false"))
            .await
            .expect_err("false exits non-zero");
        assert!(matches!(err, ProcessError::Failed { code: Some(1), .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_secret_reaches_stdin() {
        let runner = SystemRunner::new();
        let spec = CommandSpec::new("grep")
            .args(["-q", "hunter2"])
            .stdin_secret(Secret::new("hunter2\n"));

        assert!(runner.run(&spec).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_hanging_command() {
        let runner = SystemRunner::with_timeout(Some(Duration::from_millis(100)));
        let spec = CommandSpec::new("sleep").arg("30");

        let err = runner.run(&spec).await.expect_err("sleep outlives the timeout");
        assert!(matches!(err, ProcessError::TimedOut { .. }));
    }
}
