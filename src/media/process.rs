use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

// @module: External process execution with captured output

/// A fully described external invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    // @field: Program to launch
    pub program: String,
    // @field: Arguments, passed without a shell
    pub args: Vec<String>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

/// Everything captured from a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub program: String,
    pub args: Vec<String>,
    // @field: Exit code, None when killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ProcessOutput {
    /// Exit status zero is the only success criterion
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Human readable command line for logs
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(' ') {
                line.push('"');
                line.push_str(arg);
                line.push('"');
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

/// Why a process produced no output at all
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The program could not be started
    #[error("failed to launch {program}: {message}")]
    Launch { program: String, message: String },

    /// The run was cancelled and the child killed
    #[error("{program} was cancelled")]
    Cancelled { program: String },
}

/// Launches external programs and waits for them
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion, or until `cancel` fires
    async fn run(&self, spec: &ProcessSpec, cancel: &CancellationToken) -> Result<ProcessOutput, ProcessError>;
}

/// Runner backed by `tokio::process`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, spec: &ProcessSpec, cancel: &CancellationToken) -> Result<ProcessOutput, ProcessError> {
        let started = Instant::now();

        let child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProcessError::Launch {
                program: spec.program.clone(),
                message: e.to_string(),
            })?;

        // Dropping the wait future drops the child, which kills it
        let output = tokio::select! {
            result = child.wait_with_output() => {
                result.map_err(|e| ProcessError::Launch {
                    program: spec.program.clone(),
                    message: e.to_string(),
                })?
            },
            _ = cancel.cancelled() => {
                return Err(ProcessError::Cancelled { program: spec.program.clone() });
            }
        };

        Ok(ProcessOutput {
            program: spec.program.clone(),
            args: spec.args.clone(),
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            elapsed: started.elapsed(),
        })
    }
}
