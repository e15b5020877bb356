//! The virtual machine: a fixed-size memory array and a straight-line
//! program decoded from a binary blob. The ISA defines no branch, call, or
//! halt opcode, so a run executes every instruction exactly once in
//! program order and then halts.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};
use serde::Serialize;
use thiserror::Error;

use crate::bytecode::{bitreverse, try_decode_instruction, Instruction,
                      MalformedInstruction, INSTRUCTION_SIZE};

pub type CellValue = u32;

pub const DEFAULT_MEMORY_SIZE: usize = 4096;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MachineState {
  Loaded,
  Running,
  Halted,
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ExecutionError {
  #[error(transparent)]
  Malformed(#[from] MalformedInstruction),
  #[error("address {address} is outside memory of {memory_size} cells")]
  MemoryFault { address: usize, memory_size: usize },
  #[error("bad dump range {start}..={end} for memory of {memory_size} cells")]
  BadRange { start: usize, end: usize, memory_size: usize },
}

/// The serialized view of an inclusive address range of memory after a run.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct MemorySnapshot {
  pub memory_range :  MemoryRange,
  pub values       :  BTreeMap<usize, CellValue>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct MemoryRange {
  pub start :  usize,
  pub end   :  usize,
}

pub struct VirtualMachine {

  // Memory Store //
  memory :  Vec<CellValue>, // Flat word array, never resized

  // Program //
  program :  Vec<Instruction>, // Immutable after `load`
  pc      :  usize,            // Program counter, a cursor
  state   :  MachineState,

}

impl VirtualMachine {

  pub fn new() -> VirtualMachine {
    VirtualMachine::with_memory_size(DEFAULT_MEMORY_SIZE)
  }

  pub fn with_memory_size(memory_size: usize) -> VirtualMachine {
    VirtualMachine {
      memory  :  vec![0; memory_size],
      program :  vec![],
      pc      :  0,
      state   :  MachineState::Halted,
    }
  }

  pub fn memory(&self) -> &[CellValue] {
    &self.memory
  }

  pub fn program(&self) -> &[Instruction] {
    &self.program
  }

  pub fn state(&self) -> MachineState {
    self.state
  }

  /// Decodes `binary` into a program and resets the program counter. A
  /// trailing partial record is discarded rather than rejected; a record
  /// that fails to decode is fatal.
  pub fn load(&mut self, binary: &[u8]) -> Result<(), MalformedInstruction> {
    let mut program = Vec::with_capacity(binary.len() / INSTRUCTION_SIZE);
    for chunk in binary.chunks_exact(INSTRUCTION_SIZE) {
      program.push(try_decode_instruction(chunk)?);
    }
    self.program = program;
    self.pc      = 0;
    self.state   = MachineState::Loaded;
    Ok(())
  }

  /// Loads an already decoded program, as `load` does a binary blob.
  pub fn load_program(&mut self, program: Vec<Instruction>) {
    self.program = program;
    self.pc      = 0;
    self.state   = MachineState::Loaded;
  }

  /// Executes the program strictly in order, one instruction per step,
  /// and halts when the program counter reaches the program length. On a
  /// memory fault the run aborts with the machine left mid-program.
  pub fn run(&mut self) -> Result<(), ExecutionError> {
    self.state = MachineState::Running;

    while self.pc < self.program.len() {
      let instruction = self.program[self.pc];
      self.execute_instruction(&instruction)?;

      #[cfg(feature = "trace_execution")]
      println!("{:>4}  {}\n{}", self.pc, instruction, self);

      self.pc += 1;
    }

    self.state = MachineState::Halted;
    Ok(())
  }

  fn execute_instruction(&mut self, instruction: &Instruction)
    -> Result<(), ExecutionError>
  {
    match *instruction {

      Instruction::LoadConst { dest, constant } => {
        *self.cell_mut(dest as usize)? = constant;
      }

      Instruction::ReadMemory { dest, src, offset } => {
        // Indirect: `src` names the cell holding the base address.
        let base  = self.cell(src as usize)? as usize;
        let value = self.cell(base + offset as usize)?;
        *self.cell_mut(dest as usize)? = value;
      }

      Instruction::WriteMemory { src, dest } => {
        let value = self.cell(src as usize)?;
        *self.cell_mut(dest as usize)? = value;
      }

      Instruction::Bitreverse { dest, src } => {
        let value = self.cell(src as usize)?;
        *self.cell_mut(dest as usize)? = bitreverse(value);
      }

    }
    Ok(())
  }

  fn cell(&self, address: usize) -> Result<CellValue, ExecutionError> {
    self.memory.get(address).copied().ok_or(ExecutionError::MemoryFault {
      address,
      memory_size: self.memory.len(),
    })
  }

  fn cell_mut(&mut self, address: usize) -> Result<&mut CellValue, ExecutionError> {
    let memory_size = self.memory.len();
    self.memory.get_mut(address).ok_or(ExecutionError::MemoryFault {
      address,
      memory_size,
    })
  }

  /// Produces a snapshot of the closed range `[start, end]` of memory.
  pub fn dump(&self, start: usize, end: usize)
    -> Result<MemorySnapshot, ExecutionError>
  {
    if start > end || end >= self.memory.len() {
      return Err(ExecutionError::BadRange {
        start,
        end,
        memory_size: self.memory.len(),
      });
    }

    let values = (start..=end).map(|address| (address, self.memory[address]))
                              .collect();

    Ok(MemorySnapshot {
      memory_range: MemoryRange { start, end },
      values,
    })
  }

  fn make_memory_table(&self) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    // Only nonzero cells are listed; 4096 rows of zeros help nobody.
    for (address, value) in self.memory.iter().enumerate() {
      if *value != 0 {
        table.add_row(
          row![r->format!("M[{}] =", address), format!("{:#010X}", value)]
        );
      }
    }
    table
  }

}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl Display for VirtualMachine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "pc: {}\t{}\n{}",
      self.pc,
      self.state,
      self.make_memory_table()
    )
  }
}

impl Display for MachineState {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      MachineState::Loaded  => write!(f, "Loaded"),
      MachineState::Running => write!(f, "Running"),
      MachineState::Halted  => write!(f, "Halted"),
    }
  }
}
