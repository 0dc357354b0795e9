//! Result and errors.
use std::fmt::{self, Display, Formatter};

pub type Chp8Result<T> = std::result::Result<T, Chp8Error>;

#[derive(Debug)]
pub enum Chp8Error {
    /// The running program hit a fault and the machine has halted.
    Fault(Fault),
    /// Backing memory for the machine could not be allocated.
    Construction { capacity: usize },
    /// Configuration values that the machine cannot run with.
    Config(&'static str),
    /// Attempt to load a bytecode program that can't fit in memory.
    LargeProgram,
    Fmt(fmt::Error),
}

impl Display for Chp8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fault(fault) => write!(f, "machine halted: {}", fault),
            Self::Construction { capacity } => {
                write!(f, "failed to allocate {} bytes of VM memory", capacity)
            }
            Self::Config(msg) => write!(f, "invalid configuration: {}", msg),
            Self::LargeProgram => write!(f, "program too large for VM memory"),
            Self::Fmt(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Chp8Error {}

impl From<fmt::Error> for Chp8Error {
    fn from(err: fmt::Error) -> Self {
        Chp8Error::Fmt(err)
    }
}

impl From<Fault> for Chp8Error {
    fn from(fault: Fault) -> Self {
        Chp8Error::Fault(fault)
    }
}

/// Unrecoverable condition of the running program.
///
/// Once latched by the CPU, execution stops until the machine is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Call with all 16 stack levels in use.
    StackOverflow,
    /// Return with an empty call stack.
    StackUnderflow,
    /// Instruction word that does not decode to any operation.
    UnknownOpcode(u16),
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackOverflow => write!(f, "stack overflow"),
            Self::StackUnderflow => write!(f, "stack underflow"),
            Self::UnknownOpcode(word) => write!(f, "unknown opcode 0x{:04X}", word),
        }
    }
}

impl std::error::Error for Fault {}

/// Access outside of memory or the display grid.
///
/// These are reported and the access becomes a no-op. They do not halt the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutOfBounds {
    Memory {
        index: usize,
        len: usize,
    },
    Pixel {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
}

impl Display for OutOfBounds {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory { index, len } => write!(
                f,
                "memory access at 0x{:04X} out of bounds (size = 0x{:04X})",
                index, len
            ),
            Self::Pixel {
                x,
                y,
                width,
                height,
            } => write!(
                f,
                "pixel access at ({}, {}) out of bounds (mode = {}x{})",
                x, y, width, height
            ),
        }
    }
}

impl std::error::Error for OutOfBounds {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fault_message() {
        let err = Chp8Error::from(Fault::UnknownOpcode(0x5AB1));
        assert_eq!(err.to_string(), "machine halted: unknown opcode 0x5AB1");
        assert_eq!(Fault::StackUnderflow.to_string(), "stack underflow");
    }
}
