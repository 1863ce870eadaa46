//! Process creation.
//!
//! Everything a child needs is allocated before `fork`: the argument vector,
//! the redirection paths and the descriptor lists. After `fork` the child only
//! opens, duplicates and closes descriptors and calls `execv`. If any of that
//! fails it writes `(kind, errno)` to a close-on-exec status pipe and leaves
//! with `_exit`; a clean `exec` closes the pipe with nothing written.

use std::ffi::{CStr, CString};
use std::fs::File;
use std::io::Read;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::ptr;

use libc::c_char;
use log::debug;
use nix::errno::Errno;
use nix::fcntl::{self, FcntlArg, FdFlag, OFlag};
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};

use crate::error::{Result, ShellError};

/// Exit status of a child whose redirection could not be set up.
pub const EXIT_REDIRECT: i32 = 1;
/// Exit status of a child whose program exists but could not be executed.
pub const EXIT_EXEC: i32 = 126;
/// Exit status of a child whose program vanished between lookup and exec.
pub const EXIT_NOT_FOUND: i32 = 127;

const OUTPUT_MODE: u32 = 0o644;
/// Interpreter for executables the kernel does not recognise.
const SCRIPT_SHELL: &str = "/bin/sh";

/// Owned argument buffer for one `execv` call.
///
/// `argv_ptrs` points into the heap buffers of `argv` and is terminated by a
/// null pointer. Moving the struct does not move those buffers. `script_ptrs`
/// is the argument vector for running the file with `/bin/sh` instead, in
/// case the kernel rejects it with `ENOEXEC`.
#[derive(Debug)]
pub struct ExecImage {
	name: String,
	path: CString,
	argv: Vec<CString>,
	argv_ptrs: Vec<*const c_char>,
	shell: CString,
	script_ptrs: Vec<*const c_char>,
}

fn nul_error(what: &str) -> ShellError {
	ShellError::InvalidArguments(format!("{} contains a NUL byte", what))
}

impl ExecImage {
	pub fn new(path: &Path, parts: &[String]) -> Result<ExecImage> {
		let name = match parts.first() {
			Some(name) => name.clone(),
			None => return Err(ShellError::InvalidArguments("empty command".to_string())),
		};
		let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| nul_error("program path"))?;
		let argv = parts.iter()
			.map(|p| CString::new(p.as_bytes()))
			.collect::<std::result::Result<Vec<CString>, _>>()
			.map_err(|_| nul_error("argument"))?;
		let mut argv_ptrs: Vec<*const c_char> = argv.iter().map(|a| a.as_ptr()).collect();
		argv_ptrs.push(ptr::null());
		let shell = CString::new(SCRIPT_SHELL).map_err(|_| nul_error("shell path"))?;
		let mut script_ptrs = vec![shell.as_ptr(), c_path.as_ptr()];
		script_ptrs.extend(argv.iter().skip(1).map(|a| a.as_ptr()));
		script_ptrs.push(ptr::null());
		Ok(ExecImage { name, path: c_path, argv, argv_ptrs, shell, script_ptrs })
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn path(&self) -> &CStr {
		&self.path
	}

	pub fn argv(&self) -> &[CString] {
		&self.argv
	}

	/// Replaces the process image. Only returns on failure.
	fn exec(&self) -> Errno {
		unsafe { libc::execv(self.path.as_ptr(), self.argv_ptrs.as_ptr()) };
		let errno = Errno::last();
		if errno != Errno::ENOEXEC {
			return errno;
		}
		// no binary format matched, treat the file as a shell script
		unsafe { libc::execv(self.shell.as_ptr(), self.script_ptrs.as_ptr()) };
		Errno::last()
	}
}

/// Where a child's standard stream comes from or goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stdio {
	Inherit,
	Fd(RawFd),
	File(CString),
}

impl Stdio {
	pub fn file(path: &Path) -> Result<Stdio> {
		CString::new(path.as_os_str().as_bytes())
			.map(Stdio::File)
			.map_err(|_| nul_error("redirection path"))
	}
}

/// Everything needed to start one stage.
#[derive(Debug)]
pub struct Launch<'a> {
	pub stage: usize,
	pub image: &'a ExecImage,
	pub stdin: Stdio,
	pub stdout: Stdio,
	/// Pipe descriptors the child closes once its standard streams are in place.
	pub close: Vec<RawFd>,
}

#[derive(Debug)]
pub struct Spawned {
	pub pid: Pid,
	/// Set when the child never reached the target program.
	pub failure: Option<ShellError>,
}

/// The process capability used by the executor.
pub trait Spawner {
	fn pipe(&mut self) -> Result<(OwnedFd, OwnedFd)>;
	fn spawn(&mut self, launch: &Launch<'_>) -> Result<Spawned>;
	fn wait(&mut self, pid: Pid) -> nix::Result<WaitStatus>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
	OpenInput = 1,
	OpenOutput = 2,
	DupStdin = 3,
	DupStdout = 4,
	Exec = 5,
}

impl Failure {
	fn from_raw(n: i32) -> Option<Failure> {
		match n {
			1 => Some(Failure::OpenInput),
			2 => Some(Failure::OpenOutput),
			3 => Some(Failure::DupStdin),
			4 => Some(Failure::DupStdout),
			5 => Some(Failure::Exec),
			_ => None,
		}
	}

	fn into_error(self, errno: Errno, launch: &Launch<'_>) -> ShellError {
		let file_target = |stdio: &Stdio, fallback: &str| match *stdio {
			Stdio::File(ref p) => p.to_string_lossy().into_owned(),
			_ => fallback.to_string(),
		};
		match self {
			Failure::OpenInput => ShellError::RedirectionError { target: file_target(&launch.stdin, "standard input"), source: errno },
			Failure::OpenOutput => ShellError::RedirectionError { target: file_target(&launch.stdout, "standard output"), source: errno },
			Failure::DupStdin => ShellError::RedirectionError { target: "standard input".to_string(), source: errno },
			Failure::DupStdout => ShellError::RedirectionError { target: "standard output".to_string(), source: errno },
			Failure::Exec if errno == Errno::ENOENT => ShellError::CommandNotFound(launch.image.name().to_string()),
			Failure::Exec => ShellError::ExecFailed { program: launch.image.name().to_string(), source: errno },
		}
	}
}

/// Makes `fd` the descriptor `target`, leaving `target` open across `exec`.
fn install(fd: RawFd, target: RawFd) -> nix::Result<()> {
	if fd == target {
		fcntl::fcntl(fd, FcntlArg::F_SETFD(FdFlag::empty())).map(drop)
	} else {
		unistd::dup2(fd, target).map(drop)
	}
}

fn redirect(stdio: &Stdio, target: RawFd, flags: OFlag, open_failure: Failure, dup_failure: Failure) -> std::result::Result<(), (Failure, Errno)> {
	match *stdio {
		Stdio::Inherit => Ok(()),
		Stdio::Fd(fd) => install(fd, target).map_err(|e| (dup_failure, e)),
		Stdio::File(ref path) => {
			let mode = Mode::from_bits_truncate(OUTPUT_MODE as libc::mode_t);
			let fd = fcntl::open(path.as_c_str(), flags | OFlag::O_CLOEXEC, mode).map_err(|e| (open_failure, e))?;
			let r = install(fd, target);
			if fd != target {
				let _ = unistd::close(fd);
			}
			r.map_err(|e| (dup_failure, e))
		},
	}
}

fn setup_child(launch: &Launch<'_>) -> std::result::Result<(), (Failure, Errno)> {
	// the Rust runtime ignores SIGPIPE and exec would keep it ignored
	let _ = unsafe { signal::signal(Signal::SIGPIPE, SigHandler::SigDfl) };
	redirect(&launch.stdin, libc::STDIN_FILENO, OFlag::O_RDONLY, Failure::OpenInput, Failure::DupStdin)?;
	redirect(&launch.stdout, libc::STDOUT_FILENO,
	         OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC, Failure::OpenOutput, Failure::DupStdout)?;
	let installed_stdin = launch.stdin != Stdio::Inherit;
	let installed_stdout = launch.stdout != Stdio::Inherit;
	for &fd in &launch.close {
		if (fd == libc::STDIN_FILENO && installed_stdin) || (fd == libc::STDOUT_FILENO && installed_stdout) {
			continue;
		}
		let _ = unistd::close(fd);
	}
	Ok(())
}

fn send_failure(report: RawFd, failure: Failure, errno: Errno) {
	let mut buf = [0u8; 8];
	buf[.. 4].copy_from_slice(&(failure as i32).to_ne_bytes());
	buf[4 ..].copy_from_slice(&(errno as i32).to_ne_bytes());
	unsafe { libc::write(report, buf.as_ptr() as *const libc::c_void, buf.len()) };
}

fn exec_child(launch: &Launch<'_>, report: RawFd) -> ! {
	let code = match setup_child(launch) {
		Err((failure, errno)) => {
			send_failure(report, failure, errno);
			EXIT_REDIRECT
		},
		Ok(()) => {
			let errno = launch.image.exec();
			send_failure(report, Failure::Exec, errno);
			if errno == Errno::ENOENT { EXIT_NOT_FOUND } else { EXIT_EXEC }
		},
	};
	unsafe { libc::_exit(code) }
}

fn read_failure(status: OwnedFd, launch: &Launch<'_>) -> Result<Option<ShellError>> {
	let mut buf = Vec::with_capacity(8);
	File::from(status).read_to_end(&mut buf).map_err(|e| {
		let errno = e.raw_os_error().map(Errno::from_raw).unwrap_or(Errno::EIO);
		ShellError::infrastructure("read status pipe")(errno)
	})?;
	if buf.len() != 8 {
		return Ok(None);
	}
	let kind = i32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]);
	let errno = Errno::from_raw(i32::from_ne_bytes([buf[4], buf[5], buf[6], buf[7]]));
	Ok(Failure::from_raw(kind).map(|f| f.into_error(errno, launch)))
}

/// Opens `/dev/null` onto whichever of descriptors 0 to 2 are closed.
///
/// Pipe ends must never be allocated at those numbers, or installing one
/// stage's streams could overwrite a descriptor it still has to install.
pub fn reserve_standard_fds() -> Result<()> {
	for fd in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
		if fcntl::fcntl(fd, FcntlArg::F_GETFD) != Err(Errno::EBADF) {
			continue;
		}
		let flags = if fd == libc::STDIN_FILENO { OFlag::O_RDONLY } else { OFlag::O_WRONLY };
		let null = fcntl::open("/dev/null", flags, Mode::empty()).map_err(ShellError::infrastructure("open /dev/null"))?;
		if null != fd {
			let r = unistd::dup2(null, fd);
			let _ = unistd::close(null);
			r.map_err(ShellError::infrastructure("dup2"))?;
		}
		debug!("descriptor {} was closed, now /dev/null", fd);
	}
	Ok(())
}

/// Real processes via `fork` and `execv`.
#[derive(Debug, Default)]
pub struct ForkSpawner;

impl Spawner for ForkSpawner {
	fn pipe(&mut self) -> Result<(OwnedFd, OwnedFd)> {
		unistd::pipe2(OFlag::O_CLOEXEC).map_err(ShellError::infrastructure("pipe"))
	}

	fn spawn(&mut self, launch: &Launch<'_>) -> Result<Spawned> {
		let (status_read, status_write) = unistd::pipe2(OFlag::O_CLOEXEC).map_err(ShellError::infrastructure("pipe"))?;
		match unsafe { unistd::fork() }.map_err(ShellError::infrastructure("fork"))? {
			ForkResult::Child => {
				drop(status_read);
				exec_child(launch, status_write.as_raw_fd())
			},
			ForkResult::Parent { child } => {
				drop(status_write);
				debug!("stage {} ({}) forked as {}", launch.stage, launch.image.name(), child);
				let failure = read_failure(status_read, launch)?;
				Ok(Spawned { pid: child, failure })
			},
		}
	}

	fn wait(&mut self, pid: Pid) -> nix::Result<WaitStatus> {
		loop {
			match waitpid(pid, None) {
				Err(Errno::EINTR) => continue,
				r => return r,
			}
		}
	}
}
