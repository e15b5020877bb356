
use std::fmt::{Display, Formatter};

use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};
use num_enum::{TryFromPrimitive, IntoPrimitive};

/**
  Opcodes of the virtual machine.

  The discriminant of each variant is its 6 bit wire code, and the `strum`
  serialization is its assembly mnemonic. Both mappings are closed: the ISA
  defines exactly these four operations and no extension point.

  Each opcode fixes the complete layout of its instruction word, so the
  shift of the opcode field and the operand arity are functions of the
  variant. Layout-dependencies:
      ```
      Opcode::shift()
      binary::encode_instruction()
      binary::try_decode_instruction()
      ```
*/
#[derive(
StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq, PartialEq,  Debug,            Hash
)]
#[repr(u8)]
pub enum Opcode {
  #[strum(serialize = "LOAD")]
  LoadConst   = 60,  // load_const( dest, const )
  #[strum(serialize = "READ")]
  ReadMemory  = 39,  // read_memory( dest, src, offset )
  #[strum(serialize = "WRITE")]
  WriteMemory = 53,  // write_memory( src, dest )
  #[strum(serialize = "BITREV")]
  Bitreverse  = 28,  // bitreverse( dest, src )
}

impl Opcode {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  /// The shift of the opcode field within the 48 bit instruction word.
  /// Layouts of different total width place it at different positions.
  pub fn shift(&self) -> u32 {
    match self {
      Opcode::LoadConst                       => 42,
      Opcode::ReadMemory                      => 29,
      Opcode::WriteMemory | Opcode::Bitreverse => 24,
    }
  }

  pub fn arity(&self) -> usize {
    match self {
      Opcode::ReadMemory => 3,
      _                  => 2,
    }
  }
}

/// Holds the unencoded operands of an instruction, one variant per opcode.
/// Operand values wider than their wire field are masked when encoded; see
/// `binary::encode_instruction`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Instruction {
  /// [Opcode:6][dest:12][const:25][Zero:5]
  LoadConst {
    dest     :  u32,
    constant :  u32
  },
  /// [Zero:13][Opcode:6][dest:12][src:12][offset:5]
  ReadMemory {
    dest   :  u32,
    src    :  u32,
    offset :  u32
  },
  /// [Zero:18][Opcode:6][src:12][dest:12]
  WriteMemory {
    src  :  u32,
    dest :  u32
  },
  /// [Zero:18][Opcode:6][dest:12][src:12]
  Bitreverse {
    dest :  u32,
    src  :  u32
  },
}

impl Instruction {
  pub fn opcode(&self) -> Opcode {
    match self {
      Instruction::LoadConst   {..} => Opcode::LoadConst,
      Instruction::ReadMemory  {..} => Opcode::ReadMemory,
      Instruction::WriteMemory {..} => Opcode::WriteMemory,
      Instruction::Bitreverse  {..} => Opcode::Bitreverse,
    }
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Instruction::LoadConst { dest, constant } => {
        write!(f, "{}({}, {})", self.opcode(), dest, constant)
      }

      Instruction::ReadMemory { dest, src, offset } => {
        write!(f, "{}({}, {}, {})", self.opcode(), dest, src, offset)
      }

      Instruction::WriteMemory { src, dest } => {
        write!(f, "{}({}, {})", self.opcode(), src, dest)
      }

      Instruction::Bitreverse { dest, src } => {
        write!(f, "{}({}, {})", self.opcode(), dest, src)
      }

    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::convert::TryFrom;
  use std::str::FromStr;

  #[test]
  fn opcode_wire_codes() {
    assert_eq!(Opcode::LoadConst.code(),   60);
    assert_eq!(Opcode::ReadMemory.code(),  39);
    assert_eq!(Opcode::WriteMemory.code(), 53);
    assert_eq!(Opcode::Bitreverse.code(),  28);
  }

  #[test]
  fn opcode_from_code() {
    assert_eq!(Opcode::try_from(60u8), Ok(Opcode::LoadConst));
    assert_eq!(Opcode::try_from(39u8), Ok(Opcode::ReadMemory));
    assert!(Opcode::try_from(0u8).is_err());
    assert!(Opcode::try_from(63u8).is_err());
  }

  #[test]
  fn opcode_arity() {
    assert_eq!(Opcode::LoadConst.arity(),   2);
    assert_eq!(Opcode::ReadMemory.arity(),  3);
    assert_eq!(Opcode::WriteMemory.arity(), 2);
    assert_eq!(Opcode::Bitreverse.arity(),  2);
  }

  #[test]
  fn opcode_from_mnemonic() {
    assert_eq!(Opcode::from_str("LOAD"),   Ok(Opcode::LoadConst));
    assert_eq!(Opcode::from_str("BITREV"), Ok(Opcode::Bitreverse));
    assert!(Opcode::from_str("JUMP").is_err());
  }

  #[test]
  fn instruction_display_uses_mnemonic() {
    let instruction = Instruction::LoadConst { dest: 3, constant: 42 };
    assert_eq!(instruction.to_string(), "LOAD(3, 42)");
  }
}
