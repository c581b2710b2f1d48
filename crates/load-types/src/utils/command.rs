//! Subprocess runner for the external tools.
//!
//! Every external collaborator (key management, quoting, signing) is a
//! command-line program. This module runs one invocation to completion and
//! captures stdout and stderr separately so callers can classify failures.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;

/// Errors that prevent a tool from producing any output.
#[derive(Debug, Error)]
pub enum ToolError {
	/// The program could not be started.
	#[error("Failed to spawn '{program}': {source}")]
	Spawn {
		program: String,
		#[source]
		source: std::io::Error,
	},
	/// Waiting for the program failed.
	#[error("Failed to wait for '{program}': {source}")]
	Wait {
		program: String,
		#[source]
		source: std::io::Error,
	},
}

/// A fully specified tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
	program: String,
	args: Vec<OsString>,
	envs: Vec<(OsString, OsString)>,
	current_dir: Option<PathBuf>,
}

impl ToolCommand {
	/// Creates an invocation of `program` with no arguments.
	pub fn new(program: impl Into<String>) -> Self {
		Self {
			program: program.into(),
			args: Vec::new(),
			envs: Vec::new(),
			current_dir: None,
		}
	}

	/// Appends one argument.
	pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
		self.args.push(arg.into());
		self
	}

	/// Appends several arguments.
	pub fn args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<OsString>,
	{
		self.args.extend(args.into_iter().map(Into::into));
		self
	}

	/// Sets an environment variable for the child.
	pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
		self.envs.push((key.into(), value.into()));
		self
	}

	/// Runs the child in `dir`.
	pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.current_dir = Some(dir.into());
		self
	}

	/// Program name.
	pub fn program(&self) -> &str {
		&self.program
	}

	/// Arguments, in order.
	pub fn get_args(&self) -> impl Iterator<Item = &OsString> {
		self.args.iter()
	}
}

impl fmt::Display for ToolCommand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.program)?;
		for arg in &self.args {
			write!(f, " {}", arg.to_string_lossy())?;
		}
		Ok(())
	}
}

/// Captured result of a finished tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
	/// Exit code, if the process exited normally.
	pub code: Option<i32>,
	/// Whether the process exited with status 0.
	pub success: bool,
	/// Standard output, lossily decoded.
	pub stdout: String,
	/// Standard error, lossily decoded.
	pub stderr: String,
	/// Wall time of the invocation.
	pub duration: Duration,
}

/// Runs `command` to completion.
///
/// A non-zero exit is not an error at this level: the output is returned so
/// the caller can inspect stderr. The child is killed if the returned future
/// is dropped, so cancelling a caller also stops the tool.
pub async fn run_tool(command: &ToolCommand) -> Result<ToolOutput, ToolError> {
	let mut cmd = Command::new(&command.program);
	cmd.args(&command.args)
		.envs(command.envs.iter().map(|(k, v)| (k, v)))
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.kill_on_drop(true);
	if let Some(dir) = &command.current_dir {
		cmd.current_dir(dir);
	}

	let started = Instant::now();
	let child = cmd.spawn().map_err(|source| ToolError::Spawn {
		program: command.program.clone(),
		source,
	})?;
	let output = child
		.wait_with_output()
		.await
		.map_err(|source| ToolError::Wait {
			program: command.program.clone(),
			source,
		})?;
	let duration = started.elapsed();

	tracing::trace!(
		program = %command.program,
		code = ?output.status.code(),
		duration_ms = duration.as_millis() as u64,
		"Tool finished"
	);

	Ok(ToolOutput {
		code: output.status.code(),
		success: output.status.success(),
		stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
		stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
		duration,
	})
}
