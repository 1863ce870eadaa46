use std::path::PathBuf;

use crate::error::{Result, ShellError};

/// One pipeline stage: the program name followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command {
	pub parts: Vec<String>,
}

impl Command {
	pub fn new<I, S>(parts: I) -> Command
	where I: IntoIterator<Item = S>, S: Into<String> {
		Command { parts: parts.into_iter().map(Into::into).collect() }
	}

	pub fn name(&self) -> Option<&str> {
		self.parts.first().map(String::as_str)
	}

	pub fn arguments(&self) -> &[String] {
		self.parts.get(1..).unwrap_or(&[])
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Expression {
	pub commands: Vec<Command>,
	/// Applies to the first command only.
	pub input_from_file: Option<PathBuf>,
	/// Applies to the last command only.
	pub output_to_file: Option<PathBuf>,
	pub background: bool,
}

impl Expression {
	/// Rejects expressions that cannot be executed at all.
	pub fn validate(&self) -> Result<()> {
		if self.commands.is_empty() {
			return Err(ShellError::EmptyExpression);
		}
		if let Some(i) = self.commands.iter().position(|c| c.parts.is_empty()) {
			return Err(ShellError::InvalidArguments(format!("stage {} of the pipeline is empty", i + 1)));
		}
		Ok(())
	}
}
