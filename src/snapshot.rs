//! JSON state dumps for diagnostics and the CLI runner.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::registers::Reg;
use crate::vm::Vm;
use crate::Result;

/// Final (or intermediate) engine state: every register, the halt flag, and
/// run counters. Memory is deliberately not captured; it is the program image
/// itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmSnapshot {
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub f: u8,
    pub la: u32,
    pub lb: u32,
    pub lc: u32,
    pub ld: u32,
    pub ptr: u32,
    pub pc: u32,
    pub halted: bool,
    pub executed: u64,
    pub output_len: usize,
}

impl VmSnapshot {
    pub(crate) fn capture(vm: &Vm) -> Self {
        let regs = vm.registers();
        Self {
            a: regs.get(Reg::A) as u8,
            b: regs.get(Reg::B) as u8,
            c: regs.get(Reg::C) as u8,
            d: regs.get(Reg::D) as u8,
            e: regs.get(Reg::E) as u8,
            f: regs.get(Reg::F) as u8,
            la: regs.get(Reg::LA),
            lb: regs.get(Reg::LB),
            lc: regs.get(Reg::LC),
            ld: regs.get(Reg::LD),
            ptr: regs.get(Reg::PTR),
            pc: regs.get(Reg::PC),
            halted: vm.is_halted(),
            executed: vm.executed(),
            output_len: vm.output().len(),
        }
    }
}

pub fn save_snapshot(path: &Path, snapshot: &VmSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load_snapshot(path: &Path) -> Result<VmSnapshot> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
