use std::io;
use std::process;

use clap::Parser;
use log::error;

use pipesh::config::Config;
use pipesh::{logging, shell, spawn};

fn main() {
	let config = Config::parse();
	logging::init_logger(config.verbose);
	if let Err(e) = spawn::reserve_standard_fds() {
		error!("{}", e);
		process::exit(1);
	}

	let stdin = io::stdin();
	let code = shell::run(&config, stdin.lock());
	process::exit(code)
}
