//! Running external tools (`python -m pip`, `pipenv`) to completion.
//!
//! Commands are described by a [`ToolCommand`] value and executed through the
//! [`ToolRunner`] trait, which returns the exit status and captured output
//! instead of failing on a non-zero exit. [`run_checked`] is the one place
//! that turns an unsuccessful run into [`BuildpackError::ToolInvocation`].

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, trace};

use crate::error::BuildpackError;

/// A fully described subprocess invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    current_dir: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Value of an environment variable set on this command, if any.
    pub fn get_env(&self, key: &str) -> Option<&OsStr> {
        self.envs
            .iter()
            .rev()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_os_str())
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let program = self
            .program
            .file_name()
            .unwrap_or(self.program.as_os_str());
        write!(f, "{}", program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// What a finished subprocess reported.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    fn describe_status(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exited with status {code}"),
            None => "was terminated by a signal".to_owned(),
        }
    }
}

/// Executes [`ToolCommand`]s.
///
/// Only spawn failures are errors; a non-zero exit is reported through
/// [`ToolOutput::exit_code`].
pub trait ToolRunner {
    fn run(&self, command: &ToolCommand) -> io::Result<ToolOutput>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> io::Result<ToolOutput> {
        let mut process = Command::new(&command.program);
        process.args(&command.args);
        for (key, value) in &command.envs {
            process.env(key, value);
        }
        if let Some(ref dir) = command.current_dir {
            process.current_dir(dir);
        }

        debug!(command = %command, "running");
        let output = process.output()?;
        let result = ToolOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        trace!(
            command = %command,
            exit_code = ?result.exit_code,
            stdout = %result.stdout,
            stderr = %result.stderr,
            "finished"
        );
        Ok(result)
    }
}

/// Run `command` and require a zero exit status.
pub fn run_checked(
    runner: &dyn ToolRunner,
    command: &ToolCommand,
) -> Result<ToolOutput, BuildpackError> {
    let output = runner
        .run(command)
        .map_err(|err| BuildpackError::ToolInvocation {
            command: command.to_string(),
            status: format!("could not be started ({err})"),
            stderr: String::new(),
        })?;

    if output.success() {
        Ok(output)
    } else {
        Err(BuildpackError::ToolInvocation {
            command: command.to_string(),
            status: output.describe_status(),
            stderr: output.stderr,
        })
    }
}
