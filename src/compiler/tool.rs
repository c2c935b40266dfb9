//! External tool invocation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

/// Exit status and diagnostics of one tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalToolResult {
    /// Process exit code; `-1` when terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExternalToolResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Diagnostic text for a failed run.
    ///
    /// Standard error when the tool wrote any, otherwise standard output,
    /// otherwise the bare exit code.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("exited with code {}", self.exit_code)
    }
}

/// A fully resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ToolInvocation {
    /// Command line for log output.
    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// The executable that performs the transformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: PathBuf,
    leading_args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Arguments placed before the compile arguments (e.g. a script path
    /// when the program is `node`).
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Invocation compiling `input` (a file or a directory) into `output_dir`
    /// with a source map.
    pub fn compile(&self, output_dir: &Path, input: &Path) -> ToolInvocation {
        let mut args = self.leading_args.clone();
        args.extend([
            OsString::from("--compile"),
            OsString::from("--map"),
            OsString::from("--output"),
            output_dir.as_os_str().to_owned(),
            input.as_os_str().to_owned(),
        ]);

        ToolInvocation {
            program: self.program.clone(),
            args,
        }
    }
}

/// Runs tool invocations to completion.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the invocation and wait for it to exit.
    ///
    /// `Err` means the process could not be started at all.
    async fn run(&self, invocation: &ToolInvocation) -> std::io::Result<ExternalToolResult>;
}

/// Runs invocations as child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    working_dir: Option<PathBuf>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run child processes from `dir` instead of the current directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &ToolInvocation) -> std::io::Result<ExternalToolResult> {
        crate::debug_event!("tool", "exec", "{}", invocation.display());

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let output = command.output().await?;
        let result = ExternalToolResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.stdout.trim().is_empty() {
            tracing::debug!("[tool] {}", result.stdout.trim());
        }

        Ok(result)
    }
}
