/*!
  The human readable textual form of bytecode is called assembly. This
  module translates assembly source into the binary form in a single
  forward pass over lines, producing the encoded program, a label table,
  and one trace record per emitted instruction.

  Per-line grammar, in precedence order:

    1. Text from the first `;` to the end of the line is a comment and is
       stripped; a line that is blank after stripping emits nothing.
    2. A line containing `:` binds the text before the colon as a label at
       the current instruction count. The remainder after the colon is
       processed as a (possibly empty) instruction.
    3. Otherwise the first whitespace delimited token is the mnemonic,
       normalized to upper case, and the rest of the line is a comma
       separated operand list.

  Assembly is all-or-nothing: the first error aborts the pass, and every
  error carries the 1-based source line it arose on.
*/
use std::collections::HashMap;
use std::str::FromStr;

use nom::{
  bytes::complete::{take_till, take_till1},
  character::complete::{char as one_char, space0},
  combinator::opt,
  sequence::{preceded, terminated},
  IResult,
};
use serde::Serialize;
use string_cache::DefaultAtom;
use thiserror::Error;

use super::binary::encode_instruction;
use super::instruction::{Instruction, Opcode};

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum AssemblyError {
  #[error("Error on line {line}: {mnemonic} is not an operation.")]
  UnknownMnemonic { line: usize, mnemonic: String },
  #[error(
    "Error on line {line}: {opcode} requires {expected} operands but was given {found}."
  )]
  WrongOperandCount {
    line     : usize,
    opcode   : Opcode,
    expected : &'static str,
    found    : usize,
  },
  #[error("Error on line {line}: {text:?} is not an unsigned integer.")]
  BadOperand { line: usize, text: String },
}

impl AssemblyError {
  /// The 1-based source line the error arose on.
  pub fn line(&self) -> usize {
    match self {
      | AssemblyError::UnknownMnemonic   { line, .. }
      | AssemblyError::WrongOperandCount { line, .. }
      | AssemblyError::BadOperand        { line, .. } => *line,
    }
  }
}

/// One record per emitted instruction: the source line, the normalized
/// mnemonic, the operand texts as written, and the encoded bytes as hex
/// pairs. Diagnostic only; the virtual machine never reads it back.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TraceRecord {
  pub line     : usize,
  pub command  : &'static str,
  pub operands : Vec<String>,
  pub bytes    : Vec<String>,
}

pub struct Assembler {
  instructions :  Vec<Instruction>,
  binary       :  Vec<u8>,
  trace        :  Vec<TraceRecord>,
  // Labels are bound to instruction indices, but the ISA defines no
  // control transfer, so nothing dereferences them. The table is kept for
  // external tooling. Several labels may bind to the same index.
  labels       :  HashMap<DefaultAtom, usize>,
}

impl Assembler {

  pub fn new() -> Assembler {
    Assembler {
      instructions :  vec![],
      binary       :  vec![],
      trace        :  vec![],
      labels       :  HashMap::new(),
    }
  }

  /// Translates `source` in one forward pass. On the first error the pass
  /// aborts with nothing further emitted.
  pub fn assemble(&mut self, source: &str) -> Result<(), AssemblyError> {
    for (index, line) in source.lines().enumerate() {
      self.process_line(index + 1, line)?;
    }
    Ok(())
  }

  pub fn binary(&self) -> &[u8] {
    &self.binary
  }

  pub fn instructions(&self) -> &[Instruction] {
    &self.instructions
  }

  pub fn trace(&self) -> &[TraceRecord] {
    &self.trace
  }

  /// The instruction index a label was bound to, if it was bound.
  pub fn label(&self, name: &str) -> Option<usize> {
    self.labels.get(&DefaultAtom::from(name)).copied()
  }

  pub fn labels(&self) -> &HashMap<DefaultAtom, usize> {
    &self.labels
  }

  fn process_line(&mut self, line: usize, raw: &str) -> Result<(), AssemblyError> {
    let code = raw.split(';').next().unwrap_or("");

    let (rest, label) = opt(label_prefix)(code).unwrap_or((code, None));
    if let Some(label) = label {
      self.labels.insert(
        DefaultAtom::from(label.trim()),
        self.instructions.len()
      );
    }

    let (operand_text, token) = match mnemonic_token(rest) {
      Ok(parsed) => parsed,
      Err(_)     => return Ok(()), // Nothing on the line but whitespace.
    };

    let normalized = token.to_uppercase();
    let opcode = Opcode::from_str(&normalized).map_err(|_| {
      AssemblyError::UnknownMnemonic { line, mnemonic: token.to_string() }
    })?;

    let operands: Vec<&str> = operand_text.split(',')
                                          .map(str::trim)
                                          .filter(|text| !text.is_empty())
                                          .collect();

    let instruction = build_instruction(line, opcode, &operands)?;
    let encoded     = encode_instruction(&instruction);

    self.instructions.push(instruction);
    self.binary.extend_from_slice(&encoded);
    self.trace.push(TraceRecord {
      line,
      command  : opcode.into(),
      operands : operands.iter().map(|text| text.to_string()).collect(),
      bytes    : encoded.iter().map(|byte| format!("0x{:02X}", byte)).collect(),
    });

    Ok(())
  }

}

/// A label prefix: the text before the first `:` on a line.
fn label_prefix(input: &str) -> IResult<&str, &str> {
  terminated(take_till(|c| c == ':'), one_char(':'))(input)
}

/// The first whitespace delimited token, the candidate mnemonic.
fn mnemonic_token(input: &str) -> IResult<&str, &str> {
  preceded(space0, take_till1(char::is_whitespace))(input)
}

/// Operands are unsigned integers, decimal or `0x`-prefixed hexadecimal.
fn parse_operand(text: &str) -> Option<u32> {
  match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
    Some(hex) => u32::from_str_radix(hex, 16).ok(),
    None      => text.parse::<u32>().ok(),
  }
}

fn build_instruction(
  line: usize,
  opcode: Opcode,
  operands: &[&str]
) -> Result<Instruction, AssemblyError>
{
  let parse = |text: &str| {
    parse_operand(text).ok_or_else(|| {
      AssemblyError::BadOperand { line, text: text.to_string() }
    })
  };

  match opcode {

    Opcode::LoadConst => {
      check_arity(line, opcode, operands.len(), 2, 2, "2")?;
      Ok(Instruction::LoadConst {
        dest     : parse(operands[0])?,
        constant : parse(operands[1])?,
      })
    }

    Opcode::ReadMemory => {
      // The offset is optional and defaults to 0.
      check_arity(line, opcode, operands.len(), 2, 3, "2 or 3")?;
      let offset = match operands.get(2) {
        Some(text) => parse(text)?,
        None       => 0,
      };
      Ok(Instruction::ReadMemory {
        dest : parse(operands[0])?,
        src  : parse(operands[1])?,
        offset,
      })
    }

    Opcode::WriteMemory => {
      check_arity(line, opcode, operands.len(), 2, 2, "2")?;
      Ok(Instruction::WriteMemory {
        src  : parse(operands[0])?,
        dest : parse(operands[1])?,
      })
    }

    Opcode::Bitreverse => {
      check_arity(line, opcode, operands.len(), 2, 2, "2")?;
      Ok(Instruction::Bitreverse {
        dest : parse(operands[0])?,
        src  : parse(operands[1])?,
      })
    }

  }
}

fn check_arity(
  line: usize,
  opcode: Opcode,
  found: usize,
  min: usize,
  max: usize,
  expected: &'static str
) -> Result<(), AssemblyError>
{
  match found >= min && found <= max {
    true  => Ok(()),
    false => Err(AssemblyError::WrongOperandCount { line, opcode, expected, found }),
  }
}
