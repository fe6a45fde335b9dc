//! Register file: six 8-bit registers (`a`..`f`) and six 32-bit registers
//! (`la`, `lb`, `lc`, `ld`, `ptr`, `pc`), all zeroed at power-on.
//!
//! Instructions address registers through 3-bit fields packed into the opcode
//! byte. Field 7 selects the memory operand at `ptr + c` and never reaches
//! this module; field 0 does not address anything in this ISA.

use std::fmt;

use crate::{Result, VmError};

/// Field value that selects a memory operand instead of a register.
pub const MEMORY_FIELD: u8 = 7;

/// Architectural registers of the Tomtel Core i69.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Reg {
    // 8-bit
    A,
    B,
    C,
    D,
    E,
    F,
    // 32-bit
    LA,
    LB,
    LC,
    LD,
    PTR,
    PC,
}

impl Reg {
    pub fn width_bits(self) -> u8 {
        match self {
            Reg::A | Reg::B | Reg::C | Reg::D | Reg::E | Reg::F => 8,
            Reg::LA | Reg::LB | Reg::LC | Reg::LD | Reg::PTR | Reg::PC => 32,
        }
    }

    /// Resolve a 3-bit opcode register field in the requested width.
    ///
    /// Field 7 is the memory operand and must be routed by the caller before
    /// getting here; field 0 is not a register in this ISA. Both fail with a
    /// semantic error.
    pub fn from_field(field: u8, wide: bool) -> Result<Self> {
        let reg = match (field, wide) {
            (1, false) => Reg::A,
            (2, false) => Reg::B,
            (3, false) => Reg::C,
            (4, false) => Reg::D,
            (5, false) => Reg::E,
            (6, false) => Reg::F,
            (1, true) => Reg::LA,
            (2, true) => Reg::LB,
            (3, true) => Reg::LC,
            (4, true) => Reg::LD,
            (5, true) => Reg::PTR,
            (6, true) => Reg::PC,
            _ => {
                return Err(VmError::Semantic(format!(
                    "register field {field} does not address a register"
                )))
            }
        };
        Ok(reg)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reg::A => "a",
            Reg::B => "b",
            Reg::C => "c",
            Reg::D => "d",
            Reg::E => "e",
            Reg::F => "f",
            Reg::LA => "la",
            Reg::LB => "lb",
            Reg::LC => "lc",
            Reg::LD => "ld",
            Reg::PTR => "ptr",
            Reg::PC => "pc",
        };
        write!(f, "{name}")
    }
}

/// Mutable register file. Values are masked to the register width on write.
#[derive(Clone, Debug, Default)]
pub struct Registers {
    a: u8,
    b: u8,
    c: u8,
    d: u8,
    e: u8,
    f: u8,
    la: u32,
    lb: u32,
    lc: u32,
    ld: u32,
    ptr: u32,
    pc: u32,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a register value widened to `u32` (8-bit registers occupy the low
    /// byte).
    pub fn get(&self, reg: Reg) -> u32 {
        match reg {
            Reg::A => self.a as u32,
            Reg::B => self.b as u32,
            Reg::C => self.c as u32,
            Reg::D => self.d as u32,
            Reg::E => self.e as u32,
            Reg::F => self.f as u32,
            Reg::LA => self.la,
            Reg::LB => self.lb,
            Reg::LC => self.lc,
            Reg::LD => self.ld,
            Reg::PTR => self.ptr,
            Reg::PC => self.pc,
        }
    }

    /// Set a register value (masked to the register width).
    pub fn set(&mut self, reg: Reg, value: u32) {
        match reg {
            Reg::A => self.a = value as u8,
            Reg::B => self.b = value as u8,
            Reg::C => self.c = value as u8,
            Reg::D => self.d = value as u8,
            Reg::E => self.e = value as u8,
            Reg::F => self.f = value as u8,
            Reg::LA => self.la = value,
            Reg::LB => self.lb = value,
            Reg::LC => self.lc = value,
            Reg::LD => self.ld = value,
            Reg::PTR => self.ptr = value,
            Reg::PC => self.pc = value,
        }
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn set_pc(&mut self, value: u32) {
        self.pc = value;
    }

    /// Effective address of the memory operand (`ptr + c`), widened so the
    /// sum cannot wrap before the bounds check.
    pub fn cursor(&self) -> u64 {
        self.ptr as u64 + self.c as u64
    }
}
