use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use log::{debug, info};

use crate::builtin::{self, Flow};
use crate::error::{Result, ShellError};
use crate::global;
use crate::job::{Job, JobBuilder};
use crate::plan::{Input, Output, PipeEnd, Plan, Side, StagePlan};
use crate::spawn::{ExecImage, ForkSpawner, Launch, Spawner, Stdio};
use crate::types::{Command, Expression};

#[derive(Debug)]
pub enum Outcome {
	/// A builtin ran in the interpreter process.
	Builtin,
	/// `exit` was requested.
	Exit,
	/// Every spawned stage has been reaped.
	Completed(Job),
	/// The stages were left running and will not be reaped.
	Background(Job),
}

/// The N-1 pipes of one pipeline. Dropping the set closes the orchestrator's
/// copy of every end.
struct PipeSet {
	ends: Vec<(OwnedFd, OwnedFd)>,
}

impl PipeSet {
	fn open<S: Spawner>(spawner: &mut S, count: usize) -> Result<PipeSet> {
		let mut ends = Vec::with_capacity(count);
		for _ in 0 .. count {
			ends.push(spawner.pipe()?);
		}
		Ok(PipeSet { ends })
	}

	fn raw(&self, end: PipeEnd) -> RawFd {
		let (ref read, ref write) = self.ends[end.pipe];
		match end.side {
			Side::Read => read.as_raw_fd(),
			Side::Write => write.as_raw_fd(),
		}
	}

	fn launch<'a>(&self, stage: &StagePlan, image: &'a ExecImage) -> Result<Launch<'a>> {
		let stdin = match stage.stdin {
			Input::Inherit => Stdio::Inherit,
			Input::Pipe(end) => Stdio::Fd(self.raw(end)),
			Input::File(ref path) => Stdio::file(path)?,
		};
		let stdout = match stage.stdout {
			Output::Inherit => Stdio::Inherit,
			Output::Pipe(end) => Stdio::Fd(self.raw(end)),
			Output::File(ref path) => Stdio::file(path)?,
		};
		let close = stage.close.iter().map(|&end| self.raw(end)).collect();
		Ok(Launch { stage: stage.index, image, stdin, stdout, close })
	}
}

/// Prints the diagnostic for a stage that did not run.
fn report_stage(stage: usize, error: &ShellError) {
	debug!("stage {} aborted: {}", stage, error);
	eprintln!("{}", error);
}

pub struct Executor<S: Spawner = ForkSpawner> {
	state: global::State,
	spawner: S,
}

impl Executor<ForkSpawner> {
	pub fn new() -> Executor<ForkSpawner> {
		Executor::with_spawner(ForkSpawner)
	}
}

impl Default for Executor<ForkSpawner> {
	fn default() -> Executor<ForkSpawner> {
		Executor::new()
	}
}

impl<S: Spawner> Executor<S> {
	pub fn with_spawner(spawner: S) -> Executor<S> {
		Executor { state: global::State::new(), spawner }
	}

	fn resolve(&mut self, command: &Command) -> Result<ExecImage> {
		let name = command.name().unwrap_or_default();
		match self.state.search_cache.lookup(name) {
			Some(path) => ExecImage::new(&path, &command.parts),
			None => Err(ShellError::CommandNotFound(name.to_string())),
		}
	}

	/// Starts every stage of `expr`. Stage-level failures are recorded in the
	/// returned job; only pipe and fork failures are returned as errors.
	fn spawn_pipeline(&mut self, expr: &Expression) -> Result<Job> {
		let plan = Plan::new(expr);
		debug!("{} stage(s), {} pipe(s)", plan.stages.len(), plan.pipes);

		let images: Vec<Result<ExecImage>> = expr.commands.iter().map(|c| self.resolve(c)).collect();
		let pipes = PipeSet::open(&mut self.spawner, plan.pipes)?;

		let mut job_builder = JobBuilder::new(plan.stages.len(), expr.background);
		for ((stage, command), image) in plan.stages.iter().zip(&expr.commands).zip(images) {
			let name = command.name().unwrap_or_default();
			let image = match image {
				Ok(image) => image,
				Err(e) => {
					report_stage(stage.index, &e);
					job_builder.push_aborted(stage.index, name, None, e);
					continue;
				},
			};
			let launch = match pipes.launch(stage, &image) {
				Ok(launch) => launch,
				Err(e) => {
					report_stage(stage.index, &e);
					job_builder.push_aborted(stage.index, name, None, e);
					continue;
				},
			};
			let spawned = self.spawner.spawn(&launch)?;
			match spawned.failure {
				Some(e) => {
					report_stage(stage.index, &e);
					job_builder.push_aborted(stage.index, name, Some(spawned.pid), e);
				},
				None => job_builder.push_running(stage.index, name, spawned.pid),
			}
		}
		drop(pipes);
		debug!("closed {} pipe end(s) in the orchestrator", plan.parent_closes().len());
		Ok(job_builder.build())
	}

	pub fn eval(&mut self, expr: &Expression) -> Result<Outcome> {
		expr.validate()?;
		let first = &expr.commands[0];
		if let Some(func) = first.name().and_then(builtin::match_builtin) {
			if expr.commands.len() > 1 {
				return Err(ShellError::InvalidArguments(format!("{} cannot be part of a pipeline", first.parts[0])));
			}
			return match func(&mut self.state, first.arguments())? {
				Flow::Continue => Ok(Outcome::Builtin),
				Flow::Exit => Ok(Outcome::Exit),
			};
		}

		let mut job = self.spawn_pipeline(expr)?;
		if expr.background {
			info!("detached {} process(es)", job.pids().len());
			Ok(Outcome::Background(job))
		} else {
			job.wait(&mut self.spawner);
			Ok(Outcome::Completed(job))
		}
	}
}
