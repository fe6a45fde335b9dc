//! Variable-length instruction decoding.
//!
//! The byte at the fetch offset selects the mnemonic. MV/MV32 pack their
//! destination (bits 3-5) and source (bits 0-2) register fields into the
//! opcode byte itself and carry no trailing operand bytes; MVI/MVI32 pack
//! only the destination field and carry an 8-bit or little-endian 32-bit
//! immediate. JEZ/JNZ carry a little-endian 32-bit absolute target.

use std::fmt;

use crate::memory::Memory;
use crate::registers::{Reg, MEMORY_FIELD};
use crate::{Result, VmError};

const FIELD_MASK: u8 = 0b0000_0111;
const DEST_SHIFT: u8 = 3;

/// One decoded instruction. Ephemeral: constructed per fetch, never cached,
/// so self-modifying programs always execute the live memory contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Halt,
    Out,
    Jez(u32),
    Jnz(u32),
    Cmp,
    Add,
    Sub,
    Xor,
    Aptr(u8),
    Mv { dst: u8, src: u8 },
    Mv32 { dst: u8, src: u8 },
    Mvi { dst: u8, imm: u8 },
    Mvi32 { dst: u8, imm: u32 },
}

impl Instruction {
    /// Total encoded length in bytes, including the opcode byte.
    pub fn length(&self) -> u8 {
        match self {
            Instruction::Jez(_) | Instruction::Jnz(_) | Instruction::Mvi32 { .. } => 5,
            Instruction::Aptr(_) | Instruction::Mvi { .. } => 2,
            _ => 1,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Halt => "HALT",
            Instruction::Out => "OUT",
            Instruction::Jez(_) => "JEZ",
            Instruction::Jnz(_) => "JNZ",
            Instruction::Cmp => "CMP",
            Instruction::Add => "ADD",
            Instruction::Sub => "SUB",
            Instruction::Xor => "XOR",
            Instruction::Aptr(_) => "APTR",
            Instruction::Mv { .. } => "MV",
            Instruction::Mv32 { .. } => "MV32",
            Instruction::Mvi { .. } => "MVI",
            Instruction::Mvi32 { .. } => "MVI32",
        }
    }
}

fn operand_name(field: u8, wide: bool) -> String {
    if field == MEMORY_FIELD {
        return "(ptr+c)".to_string();
    }
    match Reg::from_field(field, wide) {
        Ok(reg) => reg.to_string(),
        Err(_) => format!("r{field}"),
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::Halt => write!(f, "HALT"),
            Instruction::Out => write!(f, "OUT a"),
            Instruction::Cmp => write!(f, "CMP"),
            Instruction::Add => write!(f, "ADD a <- b"),
            Instruction::Sub => write!(f, "SUB a <- b"),
            Instruction::Xor => write!(f, "XOR a <- b"),
            Instruction::Aptr(imm) => write!(f, "APTR 0x{imm:02X}"),
            Instruction::Jez(target) => write!(f, "JEZ 0x{target:08X}"),
            Instruction::Jnz(target) => write!(f, "JNZ 0x{target:08X}"),
            Instruction::Mv { dst, src } => write!(
                f,
                "MV {} <- {}",
                operand_name(dst, false),
                operand_name(src, false)
            ),
            Instruction::Mv32 { dst, src } => write!(
                f,
                "MV32 {} <- {}",
                operand_name(dst, true),
                operand_name(src, true)
            ),
            Instruction::Mvi { dst, imm } => {
                write!(f, "MVI {} <- 0x{imm:02X}", operand_name(dst, false))
            }
            Instruction::Mvi32 { dst, imm } => {
                write!(f, "MVI32 {} <- 0x{imm:08X}", operand_name(dst, true))
            }
        }
    }
}

/// Decode the instruction starting at `offset`. Pure function of the bytes
/// currently in memory: an unknown opcode byte is a decode error, operand
/// bytes running past the end of memory are an address error.
pub fn decode(memory: &Memory, offset: u32) -> Result<Instruction> {
    let base = offset as u64;
    let opcode = memory.read_byte(base)?;
    let dst = (opcode >> DEST_SHIFT) & FIELD_MASK;
    let src = opcode & FIELD_MASK;
    let instr = match opcode {
        0x01 => Instruction::Halt,
        0x02 => Instruction::Out,
        0x21 => Instruction::Jez(memory.read_le(base + 1, 4)?),
        0x22 => Instruction::Jnz(memory.read_le(base + 1, 4)?),
        0xC1 => Instruction::Cmp,
        0xC2 => Instruction::Add,
        0xC3 => Instruction::Sub,
        0xC4 => Instruction::Xor,
        0xE1 => Instruction::Aptr(memory.read_byte(base + 1)?),
        // MVI occupies the multiples of eight inside the MV span (plus 0x48
        // below it), so it must match before the MV range.
        0x48 | 0x50 | 0x58 | 0x60 | 0x68 | 0x70 | 0x78 => Instruction::Mvi {
            dst,
            imm: memory.read_byte(base + 1)?,
        },
        0x49..=0x7E => Instruction::Mv { dst, src },
        0x88 | 0x90 | 0x98 | 0xA0 | 0xA8 | 0xB0 | 0xB8 => Instruction::Mvi32 {
            dst,
            imm: memory.read_le(base + 1, 4)?,
        },
        // MV32 never encodes a memory source; those byte values are absent
        // from the table entirely.
        0x89..=0xBE if src != MEMORY_FIELD => Instruction::Mv32 { dst, src },
        _ => return Err(VmError::Decode { opcode, offset }),
    };
    Ok(instr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Reference classification straight from the opcode table.
    fn expected(opcode: u8) -> Option<(&'static str, u8)> {
        match opcode {
            0x01 => Some(("HALT", 1)),
            0x02 => Some(("OUT", 1)),
            0x21 => Some(("JEZ", 5)),
            0x22 => Some(("JNZ", 5)),
            0xC1 => Some(("CMP", 1)),
            0xC2 => Some(("ADD", 1)),
            0xC3 => Some(("SUB", 1)),
            0xC4 => Some(("XOR", 1)),
            0xE1 => Some(("APTR", 2)),
            0x48..=0x7E if opcode % 8 == 0 => Some(("MVI", 2)),
            0x49..=0x7E => Some(("MV", 1)),
            0x88..=0xBE if opcode % 8 == 0 => Some(("MVI32", 5)),
            0x89..=0xBE if opcode & 0x07 != 0x07 => Some(("MV32", 1)),
            _ => None,
        }
    }

    #[test]
    fn exhaustive_opcode_classification() {
        for opcode in 0..=255u8 {
            let memory = Memory::new(vec![opcode, 0x11, 0x22, 0x33, 0x44]);
            match (decode(&memory, 0), expected(opcode)) {
                (Ok(instr), Some((mnemonic, length))) => {
                    assert_eq!(instr.mnemonic(), mnemonic, "opcode 0x{opcode:02X}");
                    assert_eq!(instr.length(), length, "opcode 0x{opcode:02X}");
                }
                (Err(VmError::Decode { opcode: bad, offset }), None) => {
                    assert_eq!(bad, opcode);
                    assert_eq!(offset, 0);
                }
                (got, want) => {
                    panic!("opcode 0x{opcode:02X}: decoded {got:?}, expected {want:?}")
                }
            }
        }
    }

    #[test]
    fn packed_register_fields() {
        let memory = Memory::new(vec![0x79]);
        // 0b01_111_001: destination is the memory operand, source is `a`.
        assert_eq!(
            decode(&memory, 0).unwrap(),
            Instruction::Mv { dst: 7, src: 1 }
        );

        let memory = Memory::new(vec![0x4F]);
        assert_eq!(
            decode(&memory, 0).unwrap(),
            Instruction::Mv { dst: 1, src: 7 }
        );

        let memory = Memory::new(vec![0xB9]);
        assert_eq!(
            decode(&memory, 0).unwrap(),
            Instruction::Mv32 { dst: 7, src: 1 }
        );
    }

    #[test]
    fn immediates_are_little_endian() {
        let memory = Memory::new(vec![0x21, 0x78, 0x56, 0x34, 0x12]);
        assert_eq!(decode(&memory, 0).unwrap(), Instruction::Jez(0x1234_5678));

        let memory = Memory::new(vec![0xB0, 0x0D, 0xF0, 0xAD, 0x0B]);
        assert_eq!(
            decode(&memory, 0).unwrap(),
            Instruction::Mvi32 {
                dst: 5,
                imm: 0x0BAD_F00D
            }
        );
    }

    #[test]
    fn memory_to_memory_encodings_are_absent_from_the_table() {
        for opcode in [0x7F, 0x8F, 0x97, 0xBF] {
            let memory = Memory::new(vec![opcode]);
            assert!(
                matches!(decode(&memory, 0), Err(VmError::Decode { .. })),
                "opcode 0x{opcode:02X} should not decode"
            );
        }
    }

    #[test]
    fn truncated_operand_is_an_address_error() {
        let memory = Memory::new(vec![0x22, 0x01, 0x02]);
        assert!(matches!(
            decode(&memory, 0),
            Err(VmError::Address { addr: 3, len: 3 })
        ));

        let memory = Memory::new(vec![0x48]);
        assert!(matches!(
            decode(&memory, 0),
            Err(VmError::Address { addr: 1, len: 1 })
        ));
    }

    #[test]
    fn fetch_past_end_is_an_address_error() {
        let memory = Memory::new(vec![0x01]);
        assert!(matches!(
            decode(&memory, 1),
            Err(VmError::Address { addr: 1, len: 1 })
        ));
    }

    #[test]
    fn disassembly_rendering() {
        let memory = Memory::new(vec![0x48, 0x41]);
        assert_eq!(decode(&memory, 0).unwrap().to_string(), "MVI a <- 0x41");

        let memory = Memory::new(vec![0xB1]);
        assert_eq!(decode(&memory, 0).unwrap().to_string(), "MV32 pc <- la");

        let memory = Memory::new(vec![0x79]);
        assert_eq!(decode(&memory, 0).unwrap().to_string(), "MV (ptr+c) <- a");
    }

    proptest! {
        #[test]
        fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 1..16)) {
            let memory = Memory::new(bytes.clone());
            match decode(&memory, 0) {
                Ok(instr) => {
                    prop_assert_eq!(
                        Some((instr.mnemonic(), instr.length())),
                        expected(bytes[0])
                    );
                }
                Err(VmError::Decode { opcode, .. }) => {
                    prop_assert_eq!(opcode, bytes[0]);
                    prop_assert!(expected(bytes[0]).is_none());
                }
                Err(VmError::Address { .. }) => {
                    // Only multi-byte instructions can overrun a short buffer.
                    let (_, length) = expected(bytes[0]).unwrap();
                    prop_assert!((length as usize) > bytes.len());
                }
                Err(err) => prop_assert!(false, "unexpected error: {}", err),
            }
        }
    }
}
