//! Pure-Rust core for the Tomtel Core i69 virtual machine.
//!
//! The VM executes an owned byte buffer as machine code: the buffer is both
//! the program image and the only addressable data space (self-modifying code
//! is legal), twelve registers come in two widths, and execution appends to
//! an output stream until `HALT`. The surrounding decoding pipeline hands the
//! VM a ready buffer and collects the output stream when the engine halts.

use thiserror::Error;

pub mod decode;
pub mod memory;
pub mod registers;
pub mod snapshot;
pub mod vm;

pub use decode::{decode, Instruction};
pub use memory::Memory;
pub use registers::{Reg, Registers, MEMORY_FIELD};
pub use snapshot::{load_snapshot, save_snapshot, VmSnapshot};
pub use vm::Vm;

pub type Result<T> = std::result::Result<T, VmError>;

/// Fatal run errors. None of these are recoverable: the engine aborts and
/// whatever bytes were already emitted are diagnostic only.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("unknown opcode 0x{opcode:02X} at offset 0x{offset:08X}")]
    Decode { opcode: u8, offset: u32 },
    #[error("address 0x{addr:08X} out of bounds (memory is {len} bytes)")]
    Address { addr: u64, len: usize },
    #[error("semantic error: {0}")]
    Semantic(String),
    #[error("listing error: {0}")]
    Listing(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize error: {0}")]
    Json(#[from] serde_json::Error),
}
