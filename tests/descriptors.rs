use std::fs;

use pipesh::{parse, Executor, Outcome};

fn open_descriptors() -> usize {
	fs::read_dir("/proc/self/fd").unwrap().count()
}

// Only test in this binary, so no other test opens descriptors meanwhile.
#[test]
fn pipelines_do_not_leak_descriptors() {
	let mut executor = Executor::new();
	let expr = parse("true | true");
	// warm up anything that is opened lazily
	executor.eval(&expr).unwrap();
	let baseline = open_descriptors();

	for _ in 0 .. 1000 {
		match executor.eval(&expr).unwrap() {
			Outcome::Completed(job) => assert_eq!(job.aborted().count(), 0),
			other => panic!("unexpected {:?}", other),
		}
	}
	assert_eq!(open_descriptors(), baseline);

	executor.eval(&parse("not_a_real_cmd | true | not_a_real_cmd")).unwrap();
	assert_eq!(open_descriptors(), baseline);
}
