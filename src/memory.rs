//! Program/data memory for the VM.
//!
//! A single owned, fixed-length byte buffer holds both code and data.
//! Programs may overwrite bytes they have not executed yet, so the engine
//! always fetches from the live buffer instead of caching decoded
//! instructions.

use crate::{Result, VmError};

#[derive(Debug, Clone)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    /// Take ownership of a program image. The buffer length is fixed for the
    /// whole run; there is no growth.
    pub fn new(image: Vec<u8>) -> Self {
        Self { bytes: image }
    }

    /// Parse a commented hex listing: hex byte pairs separated by whitespace,
    /// `#` starts a comment, blank lines are ignored.
    pub fn from_hex_listing(listing: &str) -> Result<Self> {
        let mut bytes = Vec::new();
        for (lineno, line) in listing.lines().enumerate() {
            let code = line.split('#').next().unwrap_or("");
            for token in code.split_whitespace() {
                let value = u8::from_str_radix(token, 16).map_err(|_| {
                    VmError::Listing(format!(
                        "line {}: '{token}' is not a hex byte",
                        lineno + 1
                    ))
                })?;
                bytes.push(value);
            }
        }
        if bytes.is_empty() {
            return Err(VmError::Listing("listing contains no bytes".into()));
        }
        Ok(Self::new(bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    fn index(&self, addr: u64) -> Result<usize> {
        if addr < self.bytes.len() as u64 {
            Ok(addr as usize)
        } else {
            Err(VmError::Address {
                addr,
                len: self.bytes.len(),
            })
        }
    }

    pub fn read_byte(&self, addr: u64) -> Result<u8> {
        self.index(addr).map(|idx| self.bytes[idx])
    }

    pub fn write_byte(&mut self, addr: u64, value: u8) -> Result<()> {
        let idx = self.index(addr)?;
        self.bytes[idx] = value;
        Ok(())
    }

    /// Little-endian unsigned read of `count` bytes (operand fetch).
    pub fn read_le(&self, addr: u64, count: usize) -> Result<u32> {
        let mut value = 0u32;
        for offset in 0..count {
            value |= (self.read_byte(addr + offset as u64)? as u32) << (8 * offset);
        }
        Ok(value)
    }
}
