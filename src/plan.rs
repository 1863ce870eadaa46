//! Descriptor wiring for a pipeline of N stages joined by N-1 pipes.
//!
//! Pipe `i` carries bytes from stage `i` to stage `i + 1`. A stage duplicates
//! at most one read end onto stdin and one write end onto stdout, then closes
//! every pipe end it inherited. The orchestrator closes all ends once every
//! stage has been spawned.

use std::path::PathBuf;

use crate::types::Expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side { Read, Write }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipeEnd {
	pub pipe: usize,
	pub side: Side,
}

impl PipeEnd {
	pub fn read(pipe: usize) -> PipeEnd {
		PipeEnd { pipe, side: Side::Read }
	}

	pub fn write(pipe: usize) -> PipeEnd {
		PipeEnd { pipe, side: Side::Write }
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
	Inherit,
	Pipe(PipeEnd),
	File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
	Inherit,
	Pipe(PipeEnd),
	File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
	pub index: usize,
	pub stdin: Input,
	pub stdout: Output,
	/// Pipe ends to close after duplication. Always every end of every pipe.
	pub close: Vec<PipeEnd>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
	pub pipes: usize,
	pub stages: Vec<StagePlan>,
}

fn all_ends(pipes: usize) -> Vec<PipeEnd> {
	(0 .. pipes).flat_map(|i| [PipeEnd::read(i), PipeEnd::write(i)]).collect()
}

impl Plan {
	pub fn new(expr: &Expression) -> Plan {
		let n = expr.commands.len();
		let pipes = n.saturating_sub(1);
		let stages = (0 .. n).map(|i| {
			let is_first = i == 0;
			let is_last = i + 1 == n;
			let stdin = match expr.input_from_file {
				Some(ref path) if is_first => Input::File(path.clone()),
				_ if is_first => Input::Inherit,
				_ => Input::Pipe(PipeEnd::read(i - 1)),
			};
			let stdout = match expr.output_to_file {
				Some(ref path) if is_last => Output::File(path.clone()),
				_ if is_last => Output::Inherit,
				_ => Output::Pipe(PipeEnd::write(i)),
			};
			StagePlan { index: i, stdin, stdout, close: all_ends(pipes) }
		}).collect();
		Plan { pipes, stages }
	}

	/// Ends the orchestrator still holds once every stage is running.
	pub fn parent_closes(&self) -> Vec<PipeEnd> {
		all_ends(self.pipes)
	}
}
