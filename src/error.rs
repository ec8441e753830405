//! Error types shared by the loader and the execution loop.

use std::io;

use thiserror::Error;

/// Raised by the loader. The machine is left exactly as it was.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("program size ({size} bytes) exceeds the memory size ({capacity} bytes)")]
    ProgramTooLarge { size: usize, capacity: usize },
}

/// A terminal execution fault. Raising one halts the machine until it is
/// reset and reloaded.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Register operand outside the register file.
    #[error("invalid register {0}")]
    InvalidRegister(u8),
    /// JMP/JZ target outside the memory image.
    #[error("invalid address {0:#06x}")]
    AddressOutOfBounds(u16),
    /// DIV with a zero divisor register.
    #[error("can not divide when register {register} is 0")]
    DivisionByZero { register: u8 },
    /// PUSH with no free slot left below the stack pointer.
    #[error("stack underflow: no free slot below sp {sp}")]
    StackUnderflow { sp: u16 },
    /// POP on an empty stack.
    #[error("stack overflow: pop past the empty marker at sp {sp}")]
    StackOverflow { sp: u16 },
    /// The byte at `at` is not an instruction.
    #[error("illegal opcode {opcode:#04x} at {at:#06x}")]
    IllegalOpcode { opcode: u8, at: u16 },
    /// Fetch ran past the end of the memory image.
    #[error("program counter {0:#06x} is outside memory")]
    PcOutOfBounds(u16),
    /// The diagnostic sink refused a PRINT.
    #[error("diagnostic output failed: {0}")]
    Output(io::ErrorKind),
}
