use std::env;
use std::io::{self, BufRead, Write};

use log::error;

use crate::config::Config;
use crate::eval::{Executor, Outcome};
use crate::parser;
use crate::spawn::Spawner;

/// What the loop does after one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
	Continue,
	Exit(i32),
}

fn display_prompt() {
	let mut stdout = io::stdout();
	if let Ok(dir) = env::current_dir() {
		let _ = write!(stdout, "\x1b[32m{}\x1b[39m", dir.display());
	}
	let _ = stdout.write_all(b"$ ");
	let _ = stdout.flush();
}

/// Parses and executes one line, printing whatever the user should see.
pub fn run_line<S: Spawner>(executor: &mut Executor<S>, line: &str) -> Step {
	let expression = parser::parse(line);
	match executor.eval(&expression) {
		Ok(Outcome::Exit) => {
			println!("Exiting the shell");
			Step::Exit(0)
		},
		Ok(Outcome::Background(_)) => {
			println!("Running in background");
			Step::Continue
		},
		Ok(Outcome::Builtin) | Ok(Outcome::Completed(_)) => Step::Continue,
		Err(e) if e.is_fatal() => {
			eprintln!("{}", e);
			Step::Exit(1)
		},
		Err(e) => {
			eprintln!("{}", e);
			Step::Continue
		},
	}
}

/// The read-eval loop. Returns the process exit status.
pub fn run<R: BufRead>(config: &Config, mut input: R) -> i32 {
	let mut executor = Executor::new();
	if let Some(ref line) = config.command {
		return match run_line(&mut executor, line) {
			Step::Exit(code) => code,
			Step::Continue => 0,
		};
	}

	let show_prompt = config.show_prompt();
	let mut line = String::new();
	loop {
		if show_prompt {
			display_prompt();
		}
		line.clear();
		match input.read_line(&mut line) {
			Ok(0) => return 0,
			Ok(_) => {},
			Err(e) => {
				error!("cannot read input: {}", e);
				return 1;
			},
		}
		if line.trim().is_empty() {
			continue;
		}
		if let Step::Exit(code) = run_line(&mut executor, &line) {
			return code;
		}
	}
}
