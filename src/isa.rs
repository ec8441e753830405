//! Octet instruction set.
//!
//! Every instruction is a one-byte opcode followed by a fixed number of
//! operand bytes. Register operands are raw indices; they are only checked
//! against the register file when the instruction executes. Jump targets are
//! two bytes, high byte first.

use std::fmt;

/// One-byte operation codes. The numbering is part of the bytecode format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Halt = 0x00,
    Load = 0x01,
    Add = 0x02,
    Sub = 0x03,
    Mul = 0x04,
    Div = 0x05,
    Jmp = 0x06,
    Jz = 0x07,
    Push = 0x08,
    Pop = 0x09,
    Print = 0x0A,
}

impl Opcode {
    pub const ALL: [Opcode; 11] = [
        Opcode::Halt,
        Opcode::Load,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Jmp,
        Opcode::Jz,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Print,
    ];

    /// Number of operand bytes following the opcode.
    pub const fn operand_count(self) -> usize {
        match self {
            Opcode::Halt => 0,
            Opcode::Push | Opcode::Pop | Opcode::Print => 1,
            Opcode::Load | Opcode::Jmp => 2,
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Jz => 3,
        }
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Halt => "HALT",
            Opcode::Load => "LOAD",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Jmp => "JMP",
            Opcode::Jz => "JZ",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Print => "PRINT",
        }
    }

    /// Case-insensitive mnemonic lookup.
    pub fn from_mnemonic(name: &str) -> Option<Opcode> {
        Self::ALL
            .into_iter()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(name))
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(byte as usize)
            .copied()
            .ok_or(byte)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A decoded instruction with its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Halt,
    Load { reg: u8, value: u8 },
    Add { a: u8, b: u8, dst: u8 },
    Sub { a: u8, b: u8, dst: u8 },
    Mul { a: u8, b: u8, dst: u8 },
    Div { a: u8, b: u8, dst: u8 },
    Jmp { addr: u16 },
    Jz { reg: u8, addr: u16 },
    Push { reg: u8 },
    Pop { reg: u8 },
    Print { reg: u8 },
}

impl Instruction {
    /// Decode the operands of `opcode`, pulling one byte at a time from
    /// `next`. Errors from `next` are passed through unchanged.
    pub fn read<E>(opcode: Opcode, mut next: impl FnMut() -> Result<u8, E>) -> Result<Self, E> {
        let inst = match opcode {
            Opcode::Halt => Instruction::Halt,
            Opcode::Load => {
                let reg = next()?;
                let value = next()?;
                Instruction::Load { reg, value }
            }
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div => {
                let a = next()?;
                let b = next()?;
                let dst = next()?;
                match opcode {
                    Opcode::Add => Instruction::Add { a, b, dst },
                    Opcode::Sub => Instruction::Sub { a, b, dst },
                    Opcode::Mul => Instruction::Mul { a, b, dst },
                    _ => Instruction::Div { a, b, dst },
                }
            }
            Opcode::Jmp => {
                let hi = next()?;
                let lo = next()?;
                Instruction::Jmp {
                    addr: u16::from_be_bytes([hi, lo]),
                }
            }
            Opcode::Jz => {
                let reg = next()?;
                let hi = next()?;
                let lo = next()?;
                Instruction::Jz {
                    reg,
                    addr: u16::from_be_bytes([hi, lo]),
                }
            }
            Opcode::Push => Instruction::Push { reg: next()? },
            Opcode::Pop => Instruction::Pop { reg: next()? },
            Opcode::Print => Instruction::Print { reg: next()? },
        };
        Ok(inst)
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Halt => Opcode::Halt,
            Instruction::Load { .. } => Opcode::Load,
            Instruction::Add { .. } => Opcode::Add,
            Instruction::Sub { .. } => Opcode::Sub,
            Instruction::Mul { .. } => Opcode::Mul,
            Instruction::Div { .. } => Opcode::Div,
            Instruction::Jmp { .. } => Opcode::Jmp,
            Instruction::Jz { .. } => Opcode::Jz,
            Instruction::Push { .. } => Opcode::Push,
            Instruction::Pop { .. } => Opcode::Pop,
            Instruction::Print { .. } => Opcode::Print,
        }
    }

    /// Encoded length in bytes, opcode included.
    pub fn len(&self) -> usize {
        1 + self.opcode().operand_count()
    }

    /// Append the wire encoding to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.opcode() as u8);
        match *self {
            Instruction::Halt => {}
            Instruction::Load { reg, value } => out.extend_from_slice(&[reg, value]),
            Instruction::Add { a, b, dst }
            | Instruction::Sub { a, b, dst }
            | Instruction::Mul { a, b, dst }
            | Instruction::Div { a, b, dst } => out.extend_from_slice(&[a, b, dst]),
            Instruction::Jmp { addr } => out.extend_from_slice(&addr.to_be_bytes()),
            Instruction::Jz { reg, addr } => {
                out.push(reg);
                out.extend_from_slice(&addr.to_be_bytes());
            }
            Instruction::Push { reg } | Instruction::Pop { reg } | Instruction::Print { reg } => {
                out.push(reg)
            }
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.opcode();
        match *self {
            Instruction::Halt => write!(f, "{op}"),
            Instruction::Load { reg, value } => write!(f, "{op} r{reg}, {value}"),
            Instruction::Add { a, b, dst }
            | Instruction::Sub { a, b, dst }
            | Instruction::Mul { a, b, dst }
            | Instruction::Div { a, b, dst } => write!(f, "{op} r{a}, r{b}, r{dst}"),
            Instruction::Jmp { addr } => write!(f, "{op} 0x{addr:04X}"),
            Instruction::Jz { reg, addr } => write!(f, "{op} r{reg}, 0x{addr:04X}"),
            Instruction::Push { reg } | Instruction::Pop { reg } | Instruction::Print { reg } => {
                write!(f, "{op} r{reg}")
            }
        }
    }
}
