#![allow(dead_code)]

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

mod bytecode;
mod driver;
mod vm;

use std::path::PathBuf;
use std::process::exit;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(about = "Assembler and virtual machine for a miniature 48-bit instruction set")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Assemble mnemonic source into a binary program and a trace file.
  Asm {
    /// Assembly source file
    source: PathBuf,
    /// Binary program output file
    output: PathBuf,
    /// JSON trace output file
    trace: PathBuf,
  },
  /// Execute a binary program and snapshot a range of memory.
  Run {
    /// Binary program file
    binary: PathBuf,
    /// JSON memory snapshot output file
    output: PathBuf,
    /// Memory range to dump, inclusive, as start-end
    #[arg(short = 'm', long)]
    memory_range: String,
  },
}

fn main() {
  let cli = Cli::parse();

  let result = match cli.command {

    Command::Asm { source, output, trace } => {
      driver::assemble(&source, &output, &trace)
    }

    Command::Run { binary, output, memory_range } => {
      match parse_range(&memory_range) {
        Some((start, end)) => driver::execute(&binary, &output, start, end),
        None => {
          eprintln!("memory range must have the form start-end");
          exit(2);
        }
      }
    }

  };

  if let Err(error) = result {
    eprintln!("{}", error);
    exit(1);
  }
}

fn parse_range(text: &str) -> Option<(usize, usize)> {
  let (start, end) = text.split_once('-')?;
  Some((start.trim().parse().ok()?, end.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
  use super::parse_range;

  #[test]
  fn range_parsing() {
    assert_eq!(parse_range("0-15"), Some((0, 15)));
    assert_eq!(parse_range(" 3 - 4 "), Some((3, 4)));
    assert_eq!(parse_range("15"), None);
    assert_eq!(parse_range("a-b"), None);
  }
}
