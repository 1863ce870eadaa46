use crate::search;

/// Interpreter state that outlives a single line.
pub struct State {
	pub search_cache: search::SearchCache,
}

impl State {
	pub fn new() -> State {
		State { search_cache: search::SearchCache::new() }
	}
}

impl Default for State {
	fn default() -> State {
		State::new()
	}
}
