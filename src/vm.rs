//! Fetch-decode-execute engine.
//!
//! One `Vm` owns the memory image, the register file, and the output stream
//! for the whole run. The loop decodes at `pc`, advances `pc` by the decoded
//! length before executing the body (jumps overwrite the advanced value), and
//! repeats until `HALT` or a fatal error.

use once_cell::sync::Lazy;

use crate::decode::{decode, Instruction};
use crate::memory::Memory;
use crate::registers::{Reg, Registers, MEMORY_FIELD};
use crate::snapshot::VmSnapshot;
use crate::{Result, VmError};

/// Set `TOMTEL_TRACE=1` to log every executed instruction to stderr.
static TRACE: Lazy<bool> = Lazy::new(|| {
    matches!(
        std::env::var("TOMTEL_TRACE").as_deref(),
        Ok("1") | Ok("true")
    )
});

pub struct Vm {
    registers: Registers,
    memory: Memory,
    output: Vec<u8>,
    halted: bool,
    executed: u64,
}

impl Vm {
    pub fn new(program: Vec<u8>) -> Self {
        Self::with_memory(Memory::new(program))
    }

    pub fn with_memory(memory: Memory) -> Self {
        Self {
            registers: Registers::new(),
            memory,
            output: Vec::new(),
            halted: false,
            executed: 0,
        }
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn into_output(self) -> Vec<u8> {
        self.output
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Count of instructions executed so far (HALT included).
    pub fn executed(&self) -> u64 {
        self.executed
    }

    pub fn snapshot(&self) -> VmSnapshot {
        VmSnapshot::capture(self)
    }

    /// Run until `HALT`. A decode/address/semantic error aborts the run; the
    /// output accumulated before the failure stays readable for diagnostics.
    pub fn run(&mut self) -> Result<()> {
        while !self.halted {
            self.step()?;
        }
        Ok(())
    }

    /// Execute one instruction. Does nothing once the engine has halted.
    pub fn step(&mut self) -> Result<()> {
        if self.halted {
            return Ok(());
        }
        let pc = self.registers.pc();
        let instr = decode(&self.memory, pc)?;
        if *TRACE {
            eprintln!("[vm-trace] pc=0x{pc:08X} {instr}");
        }
        self.registers
            .set_pc(pc.wrapping_add(instr.length() as u32));
        self.execute(instr)?;
        self.executed += 1;
        Ok(())
    }

    fn execute(&mut self, instr: Instruction) -> Result<()> {
        match instr {
            Instruction::Halt => self.halted = true,
            Instruction::Out => {
                let a = self.registers.get(Reg::A) as u8;
                self.output.push(a);
            }
            Instruction::Add => self.alu(u8::wrapping_add),
            Instruction::Sub => self.alu(u8::wrapping_sub),
            Instruction::Xor => self.alu(|a, b| a ^ b),
            Instruction::Cmp => {
                let ne = self.registers.get(Reg::A) != self.registers.get(Reg::B);
                self.registers.set(Reg::F, ne as u32);
            }
            Instruction::Aptr(imm) => {
                // Overflow wraps; the ISA leaves it undefined.
                let ptr = self.registers.get(Reg::PTR).wrapping_add(imm as u32);
                self.registers.set(Reg::PTR, ptr);
            }
            Instruction::Jez(target) => {
                if self.registers.get(Reg::F) == 0 {
                    self.registers.set_pc(target);
                }
            }
            Instruction::Jnz(target) => {
                if self.registers.get(Reg::F) != 0 {
                    self.registers.set_pc(target);
                }
            }
            Instruction::Mv { dst, src } => self.mv(dst, src, false)?,
            Instruction::Mv32 { dst, src } => self.mv(dst, src, true)?,
            Instruction::Mvi { dst, imm } => self.store_operand(dst, imm as u32, false)?,
            Instruction::Mvi32 { dst, imm } => self.store_operand(dst, imm, true)?,
        }
        Ok(())
    }

    fn alu(&mut self, op: impl Fn(u8, u8) -> u8) {
        let a = self.registers.get(Reg::A) as u8;
        let b = self.registers.get(Reg::B) as u8;
        self.registers.set(Reg::A, op(a, b) as u32);
    }

    fn mv(&mut self, dst: u8, src: u8, wide: bool) -> Result<()> {
        if dst == MEMORY_FIELD && src == MEMORY_FIELD {
            return Err(VmError::Semantic("memory-to-memory move".into()));
        }
        let value = self.load_operand(src, wide)?;
        self.store_operand(dst, value, wide)
    }

    fn load_operand(&self, field: u8, wide: bool) -> Result<u32> {
        if field == MEMORY_FIELD {
            let addr = self.registers.cursor();
            return self.memory.read_byte(addr).map(u32::from);
        }
        Ok(self.registers.get(Reg::from_field(field, wide)?))
    }

    /// Memory stores are always a single byte; a 32-bit source contributes
    /// only its low byte.
    fn store_operand(&mut self, field: u8, value: u32, wide: bool) -> Result<()> {
        if field == MEMORY_FIELD {
            let addr = self.registers.cursor();
            return self.memory.write_byte(addr, value as u8);
        }
        self.registers.set(Reg::from_field(field, wide)?, value);
        Ok(())
    }
}
