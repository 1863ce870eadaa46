use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Output, Stdio};

fn pipesh(dir: &Path) -> Command {
	let mut cmd = Command::new(env!("CARGO_BIN_EXE_pipesh"));
	cmd.current_dir(dir).env_remove("RUST_LOG");
	cmd
}

/// Feeds `script` to the interpreter without a prompt and collects everything
/// it printed.
fn feed(mut cmd: Command, script: &str) -> Output {
	let mut child = cmd.arg("-n")
		.stdin(Stdio::piped())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.spawn()
		.unwrap();
	child.stdin.take().unwrap().write_all(script.as_bytes()).unwrap();
	child.wait_with_output().unwrap()
}

fn stdout(out: &Output) -> &str {
	std::str::from_utf8(&out.stdout).unwrap()
}

fn stderr(out: &Output) -> &str {
	std::str::from_utf8(&out.stderr).unwrap()
}

#[test]
fn output_reaches_the_terminal() {
	let dir = tempfile::tempdir().unwrap();
	let out = feed(pipesh(dir.path()), "echo hello\n");
	assert!(out.status.success());
	assert_eq!(stdout(&out), "hello\n");
	assert_eq!(stderr(&out), "");
}

#[test]
fn unknown_command_is_reported_and_the_loop_goes_on() {
	let dir = tempfile::tempdir().unwrap();
	let out = feed(pipesh(dir.path()), "not_a_real_cmd\necho after\n");
	assert!(out.status.success());
	assert_eq!(stderr(&out).lines().collect::<Vec<_>>(), ["Command not found: not_a_real_cmd"]);
	assert_eq!(stdout(&out), "after\n");
}

#[test]
fn background_job_is_announced() {
	let dir = tempfile::tempdir().unwrap();
	let out = feed(pipesh(dir.path()), "true &\n");
	assert!(out.status.success());
	assert_eq!(stdout(&out), "Running in background\n");
}

#[test]
fn redirected_output_stays_off_the_terminal() {
	let dir = tempfile::tempdir().unwrap();
	let out = feed(pipesh(dir.path()), "echo test > out.txt\n");
	assert!(out.status.success());
	assert_eq!(stdout(&out), "");
	assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "test\n");
}

#[test]
fn exit_says_goodbye_and_succeeds() {
	let dir = tempfile::tempdir().unwrap();
	let out = feed(pipesh(dir.path()), "exit\necho unreachable\n");
	assert_eq!(out.status.code(), Some(0));
	assert_eq!(stdout(&out), "Exiting the shell\n");
}

#[test]
fn single_line_mode_runs_one_line() {
	let dir = tempfile::tempdir().unwrap();
	let out = pipesh(dir.path()).args(["-c", "echo one | tr a-z A-Z"]).output().unwrap();
	assert!(out.status.success());
	assert_eq!(stdout(&out), "ONE\n");
}

#[test]
fn programs_resolve_without_path() {
	let dir = tempfile::tempdir().unwrap();
	let out = pipesh(dir.path()).env_remove("PATH").args(["-c", "ls /"]).output().unwrap();
	assert!(out.status.success());
	assert_eq!(stderr(&out), "");
	assert!(!out.stdout.is_empty());
}

#[test]
fn executable_without_interpreter_line_runs_under_sh() {
	let dir = tempfile::tempdir().unwrap();
	let script = dir.path().join("noshebang");
	fs::write(&script, "echo hi\n").unwrap();
	fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
	let out = pipesh(dir.path()).args(["-c", "./noshebang"]).output().unwrap();
	assert!(out.status.success());
	assert_eq!(stdout(&out), "hi\n");
	assert_eq!(stderr(&out), "");
}

#[test]
fn fatal_error_is_printed_once_and_ends_the_loop() {
	let dir = tempfile::tempdir().unwrap();
	let mut cmd = pipesh(dir.path());
	// room for the dynamic loader, none for a pipe
	unsafe {
		cmd.pre_exec(|| {
			let limit = libc::rlimit { rlim_cur: 4, rlim_max: 4 };
			if libc::setrlimit(libc::RLIMIT_NOFILE, &limit) != 0 {
				return Err(std::io::Error::last_os_error());
			}
			Ok(())
		});
	}
	let out = feed(cmd, "true\necho unreachable\n");
	assert_eq!(out.status.code(), Some(1));
	assert_eq!(stdout(&out), "");
	let lines: Vec<&str> = stderr(&out).lines().collect();
	assert_eq!(lines.len(), 1, "{:?}", lines);
	assert!(lines[0].starts_with("pipe failed: "), "{:?}", lines);
}
