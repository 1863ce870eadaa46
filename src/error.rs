use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShellError>;

#[derive(Error, Debug)]
pub enum ShellError {
	#[error("empty expression")]
	EmptyExpression,

	#[error("invalid arguments: {0}")]
	InvalidArguments(String),

	#[error("cd: {path}: {source}")]
	DirectoryChangeError {
		path: PathBuf,
		#[source]
		source: Errno,
	},

	#[error("Command not found: {0}")]
	CommandNotFound(String),

	#[error("{target}: {source}")]
	RedirectionError {
		target: String,
		#[source]
		source: Errno,
	},

	#[error("{program}: cannot execute: {source}")]
	ExecFailed {
		program: String,
		#[source]
		source: Errno,
	},

	#[error("{op} failed: {source}")]
	SpawnInfrastructureError {
		op: &'static str,
		#[source]
		source: Errno,
	},
}

impl ShellError {
	pub fn infrastructure(op: &'static str) -> impl FnOnce(Errno) -> ShellError {
		move |source| ShellError::SpawnInfrastructureError { op, source }
	}

	/// Infrastructure failures mean the interpreter itself is out of resources.
	pub fn is_fatal(&self) -> bool {
		matches!(*self, ShellError::SpawnInfrastructureError { .. })
	}
}
