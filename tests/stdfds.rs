use std::fs;
use std::os::fd::AsRawFd;

use nix::fcntl::OFlag;
use nix::unistd;

use pipesh::spawn::reserve_standard_fds;
use pipesh::{parse, Executor, Outcome};

// Only test in this binary: it closes the process's stdin.
#[test]
fn closed_standard_descriptors_are_reserved() {
	assert_eq!(unsafe { libc::close(libc::STDIN_FILENO) }, 0);
	reserve_standard_fds().unwrap();
	assert_eq!(fs::read_link("/proc/self/fd/0").unwrap(), std::path::Path::new("/dev/null"));

	let (r, w) = unistd::pipe2(OFlag::O_CLOEXEC).unwrap();
	assert!(r.as_raw_fd() > 2 && w.as_raw_fd() > 2);
	drop((r, w));

	// nothing left to do the second time
	reserve_standard_fds().unwrap();

	let dir = tempfile::tempdir().unwrap();
	let out = dir.path().join("out.txt");
	let mut executor = Executor::new();
	match executor.eval(&parse(&format!("echo hello | tr a-z A-Z > {}", out.display()))).unwrap() {
		Outcome::Completed(job) => assert_eq!(job.aborted().count(), 0),
		other => panic!("unexpected {:?}", other),
	}
	assert_eq!(fs::read_to_string(&out).unwrap(), "HELLO\n");
}
