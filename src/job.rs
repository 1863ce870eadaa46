use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

use crate::error::ShellError;
use crate::spawn::Spawner;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum State { Active, Terminated }

pub trait WaitStatusExt {
	fn state(self) -> State;
	fn code(self) -> Option<i32>;
}

impl WaitStatusExt for WaitStatus {
	/// Stages are waited for without `WUNTRACED`, so a reaped stage has
	/// either exited or been killed.
	fn state(self) -> State {
		match self {
			WaitStatus::Exited(..) | WaitStatus::Signaled(..) => State::Terminated,
			_ => State::Active,
		}
	}

	/// Shell-style status: the exit code, or 128 plus the signal number.
	fn code(self) -> Option<i32> {
		match self {
			WaitStatus::Exited(_, code) => Some(code),
			WaitStatus::Signaled(_, sig, _) => Some(128 + sig as i32),
			_ => None,
		}
	}
}

/// One stage of a job.
#[derive(Debug)]
pub struct Process {
	pub stage: usize,
	pub name: String,
	/// `None` when the stage was never spawned.
	pub pid: Option<Pid>,
	pub status: WaitStatus,
	/// Why the stage never reached its program.
	pub error: Option<ShellError>,
	/// Why the stage could not be reaped.
	pub lost: Option<Errno>,
}

impl Process {
	pub fn is_aborted(&self) -> bool {
		self.error.is_some()
	}

	pub fn state(&self) -> State {
		match self.pid {
			None => State::Terminated,
			Some(_) if self.lost.is_some() => State::Terminated,
			Some(_) => self.status.state(),
		}
	}

	pub fn code(&self) -> Option<i32> {
		self.status.code()
	}
}

#[derive(Debug)]
pub struct Job {
	pub processes: Vec<Process>,
	pub background: bool,
}

impl Job {
	pub fn state(&self) -> State {
		self.processes.iter().map(Process::state).min().unwrap_or(State::Terminated)
	}

	pub fn pids(&self) -> Vec<Pid> {
		self.processes.iter().filter_map(|p| p.pid).collect()
	}

	pub fn aborted(&self) -> impl Iterator<Item = &Process> {
		self.processes.iter().filter(|p| p.is_aborted())
	}

	/// Reaps every spawned stage in spawn order, whatever its outcome.
	pub fn wait<S: Spawner>(&mut self, spawner: &mut S) {
		for pr in self.processes.iter_mut() {
			let pid = match pr.pid {
				Some(pid) if pr.lost.is_none() && pr.status.state() != State::Terminated => pid,
				_ => continue,
			};
			match spawner.wait(pid) {
				Ok(status) => {
					debug!("stage {} ({}) reaped: {:?}", pr.stage, pr.name, status);
					pr.status = status;
				},
				Err(e) => {
					warn!("cannot wait for {} ({}): {}", pid, pr.name, e);
					pr.lost = Some(e);
				},
			}
		}
	}
}

#[derive(Debug)]
pub struct JobBuilder {
	imp: Job,
}

impl JobBuilder {
	pub fn new(size_hint: usize, background: bool) -> JobBuilder {
		JobBuilder {
			imp: Job { processes: Vec::with_capacity(size_hint), background }
		}
	}

	pub fn push_running(&mut self, stage: usize, name: &str, pid: Pid) {
		self.imp.processes.push(Process {
			stage, name: name.to_string(), pid: Some(pid), status: WaitStatus::StillAlive, error: None, lost: None,
		});
	}

	/// Records a stage that failed before running its program. `pid` is set
	/// when a child was forked and still has to be reaped.
	pub fn push_aborted(&mut self, stage: usize, name: &str, pid: Option<Pid>, error: ShellError) {
		self.imp.processes.push(Process {
			stage, name: name.to_string(), pid, status: WaitStatus::StillAlive, error: Some(error), lost: None,
		});
	}

	pub fn build(self) -> Job {
		self.imp
	}
}
