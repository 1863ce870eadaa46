use std::io::{self, IsTerminal};

use clap::Parser;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "pipesh")]
#[command(version, about = "A small shell that runs pipelines of external commands", long_about = None)]
#[command(after_help = "EXAMPLES:
    pipesh
    pipesh -c 'ls -l | sort -k 5 -n > sizes.txt'
    printf 'date | tail -c 5\\n' | pipesh --no-prompt
")]
pub struct Config {
	/// Execute LINE and exit
	#[arg(short = 'c', value_name = "LINE")]
	pub command: Option<String>,

	/// Never print a prompt
	#[arg(short = 'n', long)]
	pub no_prompt: bool,

	/// Show debug logging
	#[arg(short, long)]
	pub verbose: bool,
}

impl Config {
	/// The prompt is only shown to a terminal.
	pub fn show_prompt(&self) -> bool {
		!self.no_prompt && io::stdin().is_terminal()
	}
}
