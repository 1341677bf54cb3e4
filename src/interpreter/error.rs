use std::io;
use std::path::PathBuf;

/// Everything that can go wrong while loading or running a program.
#[derive(Debug, thiserror::Error)]
pub enum Chip8Error {
    #[error("could not read ROM {}: {source}", .path.display())]
    RomRead { path: PathBuf, source: io::Error },

    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    RomTooLarge { size: usize, max_size: usize },

    #[error("program counter out of bounds at {address:#06X}")]
    ProgramCounterOutOfBounds { address: u16 },

    #[error("memory access out of bounds at address {address:#06X}")]
    MemoryOutOfBounds { address: usize },

    #[error("stack overflow: subroutine calls nested deeper than {depth}")]
    StackOverflow { depth: usize },

    #[error("stack underflow: return with an empty call stack")]
    StackUnderflow,

    #[error("unknown opcode: {opcode:#06X}")]
    UnknownOpcode { opcode: u16 },
}

impl Chip8Error {
    /// Unknown opcodes are skipped; everything else stops the machine.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Chip8Error::UnknownOpcode { .. })
    }
}
