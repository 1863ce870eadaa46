use std::path::PathBuf;

use log::debug;
use nix::unistd;

use crate::error::{Result, ShellError};
use crate::global;

/// What the read loop does after a builtin ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow { Continue, Exit }

pub type Builtin = fn(&mut global::State, &[String]) -> Result<Flow>;

pub fn builtin_cd(state: &mut global::State, args: &[String]) -> Result<Flow> {
	let path = match args {
		[path] => PathBuf::from(path),
		[] => return Err(ShellError::InvalidArguments("cd: missing directory".to_string())),
		_ => return Err(ShellError::InvalidArguments(format!("cd: expected 1 argument, got {}", args.len()))),
	};
	unistd::chdir(path.as_path()).map_err(|source| ShellError::DirectoryChangeError { path: path.clone(), source })?;
	debug!("working directory is now {}", path.display());
	// relative PATH entries now point elsewhere
	state.search_cache.rehash();
	Ok(Flow::Continue)
}

pub fn builtin_exit(_: &mut global::State, args: &[String]) -> Result<Flow> {
	if !args.is_empty() {
		return Err(ShellError::InvalidArguments("exit: takes no arguments".to_string()));
	}
	Ok(Flow::Exit)
}

pub fn match_builtin(name: &str) -> Option<Builtin> {
	match name {
		"cd" => Some(builtin_cd),
		"exit" => Some(builtin_exit),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use nix::errno::Errno;

	fn args(a: &[&str]) -> Vec<String> {
		a.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn recognizes_builtins_by_name() {
		assert!(match_builtin("cd").is_some());
		assert!(match_builtin("exit").is_some());
		assert!(match_builtin("ls").is_none());
		assert!(match_builtin("CD").is_none());
	}

	#[test]
	fn exit_stops_the_loop() {
		let mut state = global::State::new();
		assert_eq!(builtin_exit(&mut state, &[]).unwrap(), Flow::Exit);
		assert!(matches!(builtin_exit(&mut state, &args(&["1"])), Err(ShellError::InvalidArguments(_))));
	}

	#[test]
	fn cd_arity() {
		let mut state = global::State::new();
		assert!(matches!(builtin_cd(&mut state, &[]), Err(ShellError::InvalidArguments(_))));
		assert!(matches!(builtin_cd(&mut state, &args(&["/", "/tmp"])), Err(ShellError::InvalidArguments(_))));
	}

	#[test]
	fn cd_to_missing_directory_fails() {
		let dir = tempfile::tempdir().unwrap();
		let missing = dir.path().join("nope");
		let before = std::env::current_dir().unwrap();
		let mut state = global::State::new();
		match builtin_cd(&mut state, &args(&[missing.to_str().unwrap()])) {
			Err(ShellError::DirectoryChangeError { path, source }) => {
				assert_eq!(path, missing);
				assert_eq!(source, Errno::ENOENT);
			},
			other => panic!("unexpected {:?}", other),
		}
		assert_eq!(std::env::current_dir().unwrap(), before);
	}
}
