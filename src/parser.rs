use std::path::PathBuf;

use crate::types::*;

struct Parser<'a> {
	stages: Vec<Vec<&'a str>>,
}

impl<'a> Parser<'a> {
	fn new(line: &'a str) -> Parser<'a> {
		let line = line.trim_end_matches(['\n', '\r']);
		if line.trim().is_empty() {
			return Parser { stages: vec![] };
		}
		let stages = line.split('|').map(|stage| stage.split_whitespace().collect()).collect();
		Parser { stages }
	}

	fn strip_background(&mut self) -> bool {
		match self.stages.last_mut() {
			Some(last) if last.len() > 1 && last.last() == Some(&"&") => {
				last.pop();
				true
			},
			_ => false,
		}
	}

	/// Removes a trailing `<op> <path>` pair from the chosen stage.
	fn strip_redirect(stage: Option<&mut Vec<&'a str>>, op: &str) -> Option<PathBuf> {
		let stage = stage?;
		let len = stage.len();
		if len > 2 && stage[len - 2] == op {
			let target = PathBuf::from(stage[len - 1]);
			stage.truncate(len - 2);
			Some(target)
		} else {
			None
		}
	}

	fn parse_expression(mut self) -> Expression {
		let background = self.strip_background();
		let output_to_file = Parser::strip_redirect(self.stages.last_mut(), ">");
		let input_from_file = Parser::strip_redirect(self.stages.first_mut(), "<");
		let commands = self.stages.into_iter().map(Command::new).collect();
		Expression { commands, input_from_file, output_to_file, background }
	}
}

pub fn parse(line: &str) -> Expression {
	Parser::new(line).parse_expression()
}
