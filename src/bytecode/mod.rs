/*!

  The machine uses a fixed-width 48 bit big-endian instruction word; every
  instruction occupies exactly 6 bytes on the wire, with no header, footer,
  or padding between records. Fields are packed in the order
  (opcode, operand₁, operand₂, …), and every bit not assigned to a field is
  zero. Field sizes are as follows:

    Opcode:          6 bits
    Memory address: 12 bits
    Constant:       25 bits
    Offset:          5 bits

  Because each opcode packs a different total bit width into the same 48 bit
  container, the opcode field sits at a layout-specific shift: 42 for
  LOAD_CONST, 29 for READ_MEMORY, and 24 for the two 30 bit layouts
  (WRITE_MEMORY and BITREVERSE). A decoder probes the shifts from widest
  layout to narrowest; the zero bits outside a shorter layout guarantee that
  its word never shows a valid opcode at a wider shift. See `binary`.

  One design decision that needed to be made is whether to represent an
  instruction as an opcode tag plus a homogeneous operand list, as the wire
  format suggests, or as one enum variant per opcode with named operand
  fields. The variant form is used here: the operand count per opcode is
  fixed by the ISA, so a malformed arity becomes unrepresentable instead of
  an encode-time check, and execution can match on the variant directly.

*/

mod assembly;
mod binary;
mod instruction;

pub use assembly::{Assembler, AssemblyError, TraceRecord};
pub use binary::{bitreverse, encode_instruction, try_decode_instruction,
                 DoubleWord, EncodedInstruction, MalformedInstruction,
                 INSTRUCTION_SIZE};
pub use instruction::{Instruction, Opcode};
