use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::debug;
use nix::unistd::{access, AccessFlags};

const PATH_KEY: &str = "PATH";
/// Searched when `PATH` is unset, as `execvp` does.
const DEFAULT_PATH: &str = "/bin:/usr/bin";

/// Maps program names to executables found on `PATH`.
///
/// Entries are dropped whenever `PATH` changes, and a cached entry is checked
/// again before it is handed out.
pub struct SearchCache {
	imp: HashMap<String, PathBuf>,
	path: Option<OsString>,
}

fn is_executable(path: &Path) -> bool {
	path.is_file() && access(path, AccessFlags::X_OK).is_ok()
}

impl SearchCache {
	pub fn new() -> SearchCache {
		SearchCache { imp: HashMap::new(), path: env::var_os(PATH_KEY) }
	}

	pub fn rehash(&mut self) {
		self.imp.clear();
		self.path = env::var_os(PATH_KEY);
	}

	fn search(&self, name: &str) -> Option<PathBuf> {
		let path = self.path.clone().unwrap_or_else(|| OsString::from(DEFAULT_PATH));
		env::split_paths(&path)
			.map(|dir| if dir.as_os_str().is_empty() { PathBuf::from(".") } else { dir })
			.map(|dir| dir.join(name))
			.find(|candidate| is_executable(candidate))
	}

	/// Resolves `name` the way `execvp` would, without spawning anything.
	pub fn lookup(&mut self, name: &str) -> Option<PathBuf> {
		if name.is_empty() {
			return None;
		}
		if name.contains('/') {
			let path = PathBuf::from(name);
			return if is_executable(&path) { Some(path) } else { None };
		}
		if env::var_os(PATH_KEY) != self.path {
			debug!("PATH changed, dropping {} cached entries", self.imp.len());
			self.rehash();
		}
		if let Some(hit) = self.imp.get(name) {
			if is_executable(hit) {
				return Some(hit.clone());
			}
		}
		let found = self.search(name);
		match found {
			Some(ref path) => {
				debug!("resolved {} to {}", name, path.display());
				self.imp.insert(name.to_string(), path.clone());
			},
			None => {
				self.imp.remove(name);
			},
		}
		found
	}
}

impl Default for SearchCache {
	fn default() -> SearchCache {
		SearchCache::new()
	}
}
