//! External tool execution.

use crate::{GisError, Result};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Counter of external processes started, labelled by `program`.
pub const TOOL_INVOCATIONS_METRIC: &str = "basinprep.gis.tool_invocations";

/// A single command-line tool call.
///
/// `output` is the file the call is expected to produce; runners use it to
/// detect tools that exit cleanly without writing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Program name or path (e.g. `gdalwarp`).
    pub program: String,
    /// Arguments, one element per argv entry (no shell quoting).
    pub args: Vec<String>,
    /// File the program is expected to create.
    pub output: PathBuf,
}

impl ToolInvocation {
    /// Create an invocation with no arguments.
    pub fn new<S: Into<String>, P: Into<PathBuf>>(program: S, output: P) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            output: output.into(),
        }
    }

    /// Append one argument.
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a path argument.
    pub fn path_arg<P: AsRef<Path>>(self, path: P) -> Self {
        let arg = path.as_ref().to_string_lossy().into_owned();
        self.arg(arg)
    }

    /// Value following `flag`, if the flag is present.
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Executes tool invocations.
pub trait ToolRunner {
    /// Run the invocation to completion.
    fn run(&self, invocation: &ToolInvocation) -> Result<()>;
}

/// Runs invocations as child processes and checks their outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    /// Create a new system runner.
    pub fn new() -> Self {
        Self
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<()> {
        info!("Running {}", invocation);

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => GisError::ToolNotFound(invocation.program.clone()),
                _ => GisError::Io(e),
            })?;

        metrics::counter!(TOOL_INVOCATIONS_METRIC, "program" => invocation.program.clone())
            .increment(1);

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!("{} stdout: {}", invocation.program, stdout.trim());
        }

        if !output.status.success() {
            return Err(GisError::ToolFailed {
                program: invocation.program.clone(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if !invocation.output.exists() {
            return Err(GisError::MissingOutput {
                program: invocation.program.clone(),
                path: invocation.output.clone(),
            });
        }

        Ok(())
    }
}
