/*!
  This module is responsible for the encoding and decoding of binary
  instructions.

  An encoded instruction is a 48 bit big-endian word. The opcode field sits
  at a layout-specific shift (see `Opcode::shift`), so decoding probes an
  ordered list of shifts from the widest layout to the narrowest and accepts
  a candidate opcode only when its own layout places the opcode field at the
  probed shift. The shift is never inferred from the opcode value alone.

  Operand values are masked to their field width on encode. The truncation
  is silent by contract; callers are responsible for supplying in-range
  operands.
*/
use std::convert::TryFrom;

use thiserror::Error;

use super::{Instruction, Opcode};

// If you change these you must also change `encode_instruction` and
// `try_decode_instruction`.
pub type DoubleWord = u64;
pub const INSTRUCTION_SIZE: usize = 6;
pub type EncodedInstruction = [u8; INSTRUCTION_SIZE];

const OPCODE_MASK   : DoubleWord = 0x3F;        //  6 bits
const ADDRESS_MASK  : DoubleWord = 0xFFF;       // 12 bits
const CONSTANT_MASK : DoubleWord = 0x1FF_FFFF;  // 25 bits
const OFFSET_MASK   : DoubleWord = 0x1F;        //  5 bits

/// Opcode field shifts probed during decoding, widest layout first. A
/// shorter layout zeroes every bit outside its fields, so its word can
/// never show a valid opcode at a wider shift.
const CHECKED_SHIFTS: [u32; 3] = [42, 29, 24];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Error)]
pub enum MalformedInstruction {
  #[error("instruction record is {found} bytes, expected {}", INSTRUCTION_SIZE)]
  WrongLength { found: usize },
  #[error("no opcode recognized in instruction word {word:#014x}")]
  UnknownOpcode { word: DoubleWord },
}

/// Reverses the 32 bit pattern of `value` end to end: bit 0 trades places
/// with bit 31, bit 1 with bit 30, and so on. An involution.
pub fn bitreverse(value: u32) -> u32 {
  value.reverse_bits()
}

/// Encodes the instruction into its 6 byte wire form. Operands are masked
/// to their field width first, so out-of-range values are truncated rather
/// than rejected.
pub fn encode_instruction(instruction: &Instruction) -> EncodedInstruction {
  let opcode = (instruction.opcode().code() as DoubleWord)
               << instruction.opcode().shift();

  let word: DoubleWord = match *instruction {

    Instruction::LoadConst { dest, constant } => {
      // [Opcode:6][dest:12][const:25][Zero:5]
      opcode
      | ((dest     as DoubleWord & ADDRESS_MASK ) << 30)
      | ((constant as DoubleWord & CONSTANT_MASK) <<  5)
    }

    Instruction::ReadMemory { dest, src, offset } => {
      // [Zero:13][Opcode:6][dest:12][src:12][offset:5]
      opcode
      | ((dest   as DoubleWord & ADDRESS_MASK) << 17)
      | ((src    as DoubleWord & ADDRESS_MASK) <<  5)
      |  (offset as DoubleWord & OFFSET_MASK )
    }

    Instruction::WriteMemory { src, dest } => {
      // [Zero:18][Opcode:6][src:12][dest:12]
      opcode
      | ((src  as DoubleWord & ADDRESS_MASK) << 12)
      |  (dest as DoubleWord & ADDRESS_MASK)
    }

    Instruction::Bitreverse { dest, src } => {
      // [Zero:18][Opcode:6][dest:12][src:12]
      opcode
      | ((dest as DoubleWord & ADDRESS_MASK) << 12)
      |  (src  as DoubleWord & ADDRESS_MASK)
    }

  };

  let bytes = word.to_be_bytes();
  let mut encoded = [0u8; INSTRUCTION_SIZE];
  encoded.copy_from_slice(&bytes[2..8]);
  encoded
}

/// Decodes one 6 byte record into an instruction. Fails if the record is
/// not exactly 6 bytes or if no checked shift yields a recognized opcode.
pub fn try_decode_instruction(data: &[u8]) -> Result<Instruction, MalformedInstruction> {
  if data.len() != INSTRUCTION_SIZE {
    return Err(MalformedInstruction::WrongLength { found: data.len() });
  }

  let mut bytes = [0u8; 8];
  bytes[2..8].copy_from_slice(data);
  let word = DoubleWord::from_be_bytes(bytes);

  for &shift in CHECKED_SHIFTS.iter() {
    let field = ((word >> shift) & OPCODE_MASK) as u8;
    let opcode = match Opcode::try_from(field) {
      Ok(opcode) => opcode,
      Err(_)     => continue,
    };
    // An opcode value only counts at the shift its own layout puts it at.
    if opcode.shift() != shift {
      continue;
    }
    return Ok(decode_fields(opcode, word));
  }

  Err(MalformedInstruction::UnknownOpcode { word })
}

fn decode_fields(opcode: Opcode, word: DoubleWord) -> Instruction {
  match opcode {

    Opcode::LoadConst => Instruction::LoadConst {
      dest     : ((word >> 30) & ADDRESS_MASK ) as u32,
      constant : ((word >>  5) & CONSTANT_MASK) as u32,
    },

    Opcode::ReadMemory => Instruction::ReadMemory {
      dest   : ((word >> 17) & ADDRESS_MASK) as u32,
      src    : ((word >>  5) & ADDRESS_MASK) as u32,
      offset : ( word        & OFFSET_MASK ) as u32,
    },

    Opcode::WriteMemory => Instruction::WriteMemory {
      src  : ((word >> 12) & ADDRESS_MASK) as u32,
      dest : ( word        & ADDRESS_MASK) as u32,
    },

    Opcode::Bitreverse => Instruction::Bitreverse {
      dest : ((word >> 12) & ADDRESS_MASK) as u32,
      src  : ( word        & ADDRESS_MASK) as u32,
    },

  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn round_trip(instruction: Instruction) {
    let encoded = encode_instruction(&instruction);
    assert_eq!(try_decode_instruction(&encoded), Ok(instruction));
  }

  #[test]
  fn round_trip_load_const() {
    round_trip(Instruction::LoadConst { dest: 0, constant: 0 });
    round_trip(Instruction::LoadConst { dest: 0xFFF, constant: 0x1FF_FFFF });
    round_trip(Instruction::LoadConst { dest: 7, constant: 42 });
  }

  #[test]
  fn round_trip_read_memory() {
    round_trip(Instruction::ReadMemory { dest: 0, src: 0, offset: 0 });
    round_trip(Instruction::ReadMemory { dest: 0xFFF, src: 0xFFF, offset: 0x1F });
    round_trip(Instruction::ReadMemory { dest: 2, src: 1, offset: 3 });
  }

  #[test]
  fn round_trip_write_memory() {
    round_trip(Instruction::WriteMemory { src: 0, dest: 0 });
    round_trip(Instruction::WriteMemory { src: 0xFFF, dest: 0xFFF });
    round_trip(Instruction::WriteMemory { src: 0, dest: 1 });
  }

  #[test]
  fn round_trip_bitreverse() {
    round_trip(Instruction::Bitreverse { dest: 0, src: 0 });
    round_trip(Instruction::Bitreverse { dest: 0xFFF, src: 0xFFF });
    round_trip(Instruction::Bitreverse { dest: 1, src: 0 });
  }

  #[test]
  fn load_const_wire_bytes() {
    // 60 << 42 puts 0xF0 in the first byte; 42 << 5 = 0x540.
    let encoded = encode_instruction(
      &Instruction::LoadConst { dest: 0, constant: 42 }
    );
    assert_eq!(encoded, [0xF0, 0x00, 0x00, 0x00, 0x05, 0x40]);
  }

  #[test]
  fn encode_truncates_wide_operands() {
    // A value wider than its field encodes the same as value mod 2^width.
    let wide   = encode_instruction(
      &Instruction::LoadConst { dest: 0xABCD, constant: 0x2000001 }
    );
    let masked = encode_instruction(
      &Instruction::LoadConst { dest: 0xBCD, constant: 0x0000001 }
    );
    assert_eq!(wide, masked);

    let wide   = encode_instruction(
      &Instruction::ReadMemory { dest: 0x1FFF, src: 0x1001, offset: 0x21 }
    );
    let masked = encode_instruction(
      &Instruction::ReadMemory { dest: 0xFFF, src: 0x001, offset: 0x01 }
    );
    assert_eq!(wide, masked);

    let wide   = encode_instruction(
      &Instruction::WriteMemory { src: 0x3ABC, dest: 0x1005 }
    );
    let masked = encode_instruction(
      &Instruction::WriteMemory { src: 0xABC, dest: 0x005 }
    );
    assert_eq!(wide, masked);

    let wide   = encode_instruction(
      &Instruction::Bitreverse { dest: 0xF00F, src: 0x1FFE }
    );
    let masked = encode_instruction(
      &Instruction::Bitreverse { dest: 0x00F, src: 0xFFE }
    );
    assert_eq!(wide, masked);
  }

  #[test]
  fn decode_rejects_wrong_length() {
    assert_eq!(
      try_decode_instruction(&[0xF0, 0x00, 0x00]),
      Err(MalformedInstruction::WrongLength { found: 3 })
    );
    assert_eq!(
      try_decode_instruction(&[0; 7]),
      Err(MalformedInstruction::WrongLength { found: 7 })
    );
  }

  #[test]
  fn decode_rejects_unknown_opcode() {
    assert!(matches!(
      try_decode_instruction(&[0u8; 6]),
      Err(MalformedInstruction::UnknownOpcode { .. })
    ));
    assert!(matches!(
      try_decode_instruction(&[0xFF; 6]),
      Err(MalformedInstruction::UnknownOpcode { .. })
    ));
  }

  #[test]
  fn decode_rejects_opcode_at_foreign_shift() {
    // LOAD_CONST's code at the 30 bit layouts' shift is not a LOAD_CONST.
    let word: DoubleWord = (60 as DoubleWord) << 24;
    let mut data = [0u8; INSTRUCTION_SIZE];
    data.copy_from_slice(&word.to_be_bytes()[2..8]);
    assert_eq!(
      try_decode_instruction(&data),
      Err(MalformedInstruction::UnknownOpcode { word })
    );
  }

  #[test]
  fn write_and_bitreverse_disambiguate_by_value() {
    let write  = encode_instruction(&Instruction::WriteMemory { src: 5, dest: 9 });
    let bitrev = encode_instruction(&Instruction::Bitreverse { dest: 5, src: 9 });
    assert_ne!(write, bitrev);
    assert_eq!(
      try_decode_instruction(&write),
      Ok(Instruction::WriteMemory { src: 5, dest: 9 })
    );
    assert_eq!(
      try_decode_instruction(&bitrev),
      Ok(Instruction::Bitreverse { dest: 5, src: 9 })
    );
  }

  #[test]
  fn bitreverse_involution() {
    for &value in &[0u32, 1, 2, 3, 0xDEAD_BEEF, 0x8000_0000, u32::MAX] {
      assert_eq!(bitreverse(bitreverse(value)), value);
    }
  }

  #[test]
  fn bitreverse_endpoints() {
    assert_eq!(bitreverse(0), 0);
    assert_eq!(bitreverse(1), 0x8000_0000);
    assert_eq!(bitreverse(0x8000_0000), 1);
    assert_eq!(bitreverse(u32::MAX), u32::MAX);
  }
}
