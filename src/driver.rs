//! File-level entry points wiring paths to the assembler and the virtual
//! machine: the command surface the CLI drives. Output files are written
//! only after the whole operation succeeded, so a failure never leaves a
//! partial binary, trace, or snapshot behind.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::bytecode::{Assembler, AssemblyError, MalformedInstruction};
use crate::vm::{ExecutionError, VirtualMachine};

#[derive(Debug, Error)]
pub enum DriverError {
  #[error(transparent)]
  Assembly(#[from] AssemblyError),
  #[error(transparent)]
  Malformed(#[from] MalformedInstruction),
  #[error(transparent)]
  Execution(#[from] ExecutionError),
  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),
  #[error("serialization error: {0}")]
  Serialize(#[from] serde_json::Error),
}

/// Assembles `source_path` into a binary program at `binary_path` and a
/// JSON trace at `trace_path`.
pub fn assemble(
  source_path: &Path,
  binary_path: &Path,
  trace_path: &Path
) -> Result<(), DriverError>
{
  let source = fs::read_to_string(source_path)?;

  let mut assembler = Assembler::new();
  assembler.assemble(&source)?;

  fs::write(binary_path, assembler.binary())?;
  fs::write(trace_path, serde_json::to_string_pretty(assembler.trace())?)?;
  Ok(())
}

/// Executes the binary program at `binary_path` and writes a JSON snapshot
/// of the closed memory range `[start, end]` to `snapshot_path`.
pub fn execute(
  binary_path: &Path,
  snapshot_path: &Path,
  start: usize,
  end: usize
) -> Result<(), DriverError>
{
  let binary = fs::read(binary_path)?;

  let mut vm = VirtualMachine::new();
  vm.load(&binary)?;
  vm.run()?;

  let snapshot = vm.dump(start, end)?;
  fs::write(snapshot_path, serde_json::to_string_pretty(&snapshot)?)?;
  Ok(())
}
