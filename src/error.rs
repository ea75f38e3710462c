use std::io;

use thiserror::Error;

/// Conditions that halt the interpreter. There is no recovery other than
/// resetting the machine.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    #[error("program counter out of bounds at {pc:#06x}")]
    ProgramCounterOutOfBounds { pc: u16 },

    #[error("memory access out of bounds: {len} byte(s) at {addr:#06x}")]
    MemoryOutOfBounds { addr: u16, len: usize },

    #[error("call stack overflow at {pc:#06x}")]
    StackOverflow { pc: u16 },

    #[error("return with empty call stack at {pc:#06x}")]
    StackUnderflow { pc: u16 },
}

impl Fault {
    /// address the fault is reported against
    pub fn addr(&self) -> u16 {
        match *self {
            Fault::ProgramCounterOutOfBounds { pc }
            | Fault::StackOverflow { pc }
            | Fault::StackUnderflow { pc } => pc,
            Fault::MemoryOutOfBounds { addr, .. } => addr,
        }
    }
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("program is {len} bytes but only {capacity} fit in memory")]
    TooLarge { len: usize, capacity: usize },

    #[error("could not read program ({0})")]
    Io(#[from] io::Error),
}

/// Anything that stops the main loop.
#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error(transparent)]
    Fault(#[from] Fault),

    #[error("terminal i/o failed ({0})")]
    Io(#[from] io::Error),
}
