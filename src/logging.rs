use env_logger::{Builder, Env};
use std::io::Write;

/// Logs go to stderr. `RUST_LOG` wins over `verbose`.
pub fn init_logger(verbose: bool) {
	let env = Env::default().filter_or("RUST_LOG", if verbose { "debug" } else { "warn" });

	let _ = Builder::from_env(env)
		.format(|buf, record| writeln!(buf, "pipesh: {} {}", record.level(), record.args()))
		.try_init();
}
