//! Asynchronous external-command runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use super::tokenize::{quote, split_command};
use crate::errors::CommandError;

/// How much command output is echoed to the terminal while it runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Never echo.
    Quiet,
    /// Echo commands flagged [`Echo::Live`].
    #[default]
    Normal,
    /// Echo every command.
    Debug,
}

/// Per-call hint for whether output is interesting to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    Live,
    Captured,
}

/// Result of one external invocation: status plus everything it printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub program: String,
    pub args: Vec<String>,
    /// Interleaved stdout and stderr, in arrival order.
    pub output: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Resolve with the captured output on success, reject with it otherwise.
    pub fn into_result(self) -> Result<String, CommandError> {
        if self.success() {
            Ok(self.output)
        } else {
            Err(CommandError::Failed {
                program: self.program,
                exit_code: self.exit_code,
                output: self.output,
            })
        }
    }

    /// The invocation rendered as a re-tokenizable command line.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Spawns external processes one at a time and captures their output.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    workdir: Option<PathBuf>,
    verbosity: Verbosity,
    envs: Vec<(String, String)>,
}

impl CommandRunner {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            workdir: None,
            verbosity,
            envs: Vec::new(),
        }
    }

    /// Run every command from `dir` instead of the process working directory.
    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    /// Set an environment variable for every spawned command.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    /// Execute `program` with an explicit argument list.
    ///
    /// Only spawn and I/O problems are errors; a non-zero exit is reported
    /// through [`CommandOutcome::exit_code`].
    pub async fn run<S: AsRef<str>>(
        &self,
        program: &str,
        args: &[S],
        echo: Echo,
    ) -> Result<CommandOutcome, CommandError> {
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        let live = self.streams(echo);

        let mut cmd = Command::new(program);
        cmd.args(&args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }

        debug!(cmd = %format!("{} {}", program, args.join(" ")), "running command");
        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CommandError::BinaryNotFound(program.to_string())
            } else {
                CommandError::IoError(e)
            }
        })?;

        let mut stdout = child
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| std::io::Error::other("child stdout was not piped"))?;
        let mut stderr = child
            .stderr
            .take()
            .map(BufReader::new)
            .ok_or_else(|| std::io::Error::other("child stderr was not piped"))?;

        let mut output = String::new();
        let (mut out_buf, mut err_buf) = (Vec::new(), Vec::new());
        let (mut out_done, mut err_done) = (false, false);

        // Partial reads stay in the buffers across iterations, so losing a
        // select race never drops bytes.
        while !(out_done && err_done) {
            tokio::select! {
                read = stdout.read_until(b'\n', &mut out_buf), if !out_done => {
                    if read? == 0 {
                        out_done = true;
                    } else {
                        capture(&mut output, &out_buf, live);
                        out_buf.clear();
                    }
                }
                read = stderr.read_until(b'\n', &mut err_buf), if !err_done => {
                    if read? == 0 {
                        err_done = true;
                    } else {
                        capture(&mut output, &err_buf, live);
                        err_buf.clear();
                    }
                }
            }
        }

        let status = child.wait().await?;
        let outcome = CommandOutcome {
            program: program.to_string(),
            args,
            output,
            exit_code: status.code(),
        };
        if outcome.success() {
            debug!(program, "command succeeded");
        } else {
            debug!(program, exit_code = ?outcome.exit_code, output = %outcome.output.trim(), "command failed");
        }
        Ok(outcome)
    }

    /// Tokenize `line` and execute it.
    pub async fn run_line(&self, line: &str, echo: Echo) -> Result<CommandOutcome, CommandError> {
        let (program, args) = split_command(line)?;
        self.run(&program, &args, echo).await
    }

    /// Execute and reject on non-zero exit, returning the captured output.
    pub async fn check<S: AsRef<str>>(
        &self,
        program: &str,
        args: &[S],
        echo: Echo,
    ) -> Result<String, CommandError> {
        self.run(program, args, echo).await?.into_result()
    }

    /// Tokenize `line`, execute it, and reject on non-zero exit.
    pub async fn check_line(&self, line: &str, echo: Echo) -> Result<String, CommandError> {
        self.run_line(line, echo).await?.into_result()
    }

    /// Execute and report only whether the command succeeded.
    pub async fn succeeded<S: AsRef<str>>(&self, program: &str, args: &[S]) -> bool {
        match self.run(program, args, Echo::Captured).await {
            Ok(outcome) => outcome.success(),
            Err(e) => {
                warn!(program, error = %e, "command could not be run");
                false
            }
        }
    }

    fn streams(&self, echo: Echo) -> bool {
        match self.verbosity {
            Verbosity::Quiet => false,
            Verbosity::Normal => echo == Echo::Live,
            Verbosity::Debug => true,
        }
    }
}

fn capture(output: &mut String, chunk: &[u8], live: bool) {
    let text = String::from_utf8_lossy(chunk);
    if live {
        eprint!("{text}");
    }
    output.push_str(&text);
}
