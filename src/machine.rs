//! Octet virtual machine
//!
//! A single-threaded fetch/decode/execute loop over:
//! - a 256-byte memory image holding the program
//! - eight 8-bit general-purpose registers
//! - a 256-byte operand stack growing down from slot 255
//!
//! Each instruction fetches all of its operand bytes, validates them, and only
//! then mutates registers or the stack. Any fault halts the machine until it is
//! reset and reloaded.

use std::io::Write;

use log::{debug, error, info, trace};

use crate::core::{MemoryImage, NUM_REGISTERS, OperandStack, RegisterFile};
use crate::error::{Fault, LoadError};
use crate::isa::{Instruction, Opcode};

/// Machine state after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Halted,
}

/// The whole machine. Owns every buffer; there is no shared or static state.
pub struct VirtualMachine {
    memory: MemoryImage,
    registers: RegisterFile,
    stack: OperandStack,
    pc: u16,
    running: bool,

    // Instructions retired since the last reset
    steps: u64,
    last_fault: Option<Fault>,
}

impl VirtualMachine {
    pub fn new() -> Self {
        Self {
            memory: MemoryImage::new(),
            registers: RegisterFile::new(),
            stack: OperandStack::new(),
            pc: 0,
            running: false,
            steps: 0,
            last_fault: None,
        }
    }

    /// Copy a program into memory and arm the machine.
    ///
    /// Oversized programs are rejected without touching any state.
    pub fn load(&mut self, program: &[u8]) -> Result<(), LoadError> {
        self.memory.load(program)?;
        self.running = true;
        self.last_fault = None;
        info!("loaded {} byte program", program.len());
        Ok(())
    }

    /// Zero every buffer and return to the freshly constructed state.
    pub fn reset(&mut self) {
        self.memory.clear();
        self.registers.clear();
        self.stack.clear();
        self.pc = 0;
        self.running = false;
        self.steps = 0;
        self.last_fault = None;
        info!("machine reset");
    }

    /// Run until HALT or the first fault.
    pub fn execute<W: Write>(&mut self, out: &mut W) -> Result<(), Fault> {
        while self.running {
            self.step(out)?;
        }
        Ok(())
    }

    /// Execute a single instruction.
    ///
    /// A stopped machine does nothing and reports [`Status::Halted`]. A fault
    /// stops the machine, is written to `out` as a `fault:` line and returned.
    pub fn step<W: Write>(&mut self, out: &mut W) -> Result<Status, Fault> {
        if !self.running {
            return Ok(Status::Halted);
        }

        match self.fetch_and_execute(out) {
            Ok(status) => {
                self.steps += 1;
                if status == Status::Halted {
                    self.running = false;
                    info!("halted at {:#06x} after {} steps", self.pc, self.steps);
                }
                Ok(status)
            }
            Err(fault) => {
                self.running = false;
                self.last_fault = Some(fault);
                error!("fault at pc {:#06x}: {}", self.pc, fault);
                // The original fault is returned even if the sink rejects this line
                let _ = writeln!(out, "fault: {fault}");
                Err(fault)
            }
        }
    }

    fn fetch_and_execute<W: Write>(&mut self, out: &mut W) -> Result<Status, Fault> {
        let at = self.pc;
        let opcode = self.fetch_byte()?;
        let opcode =
            Opcode::try_from(opcode).map_err(|opcode| Fault::IllegalOpcode { opcode, at })?;
        let inst = Instruction::read(opcode, || self.fetch_byte())?;
        trace!("{at:#06x}: {inst}");
        self.execute_instruction(inst, out)
    }

    /// Read the byte at `pc` and advance past it.
    fn fetch_byte(&mut self) -> Result<u8, Fault> {
        let byte = self
            .memory
            .read(self.pc)
            .ok_or(Fault::PcOutOfBounds(self.pc))?;
        self.pc += 1;
        Ok(byte)
    }

    fn execute_instruction<W: Write>(
        &mut self,
        inst: Instruction,
        out: &mut W,
    ) -> Result<Status, Fault> {
        match inst {
            Instruction::Halt => return Ok(Status::Halted),

            Instruction::Load { reg, value } => {
                self.registers.write(reg, value)?;
            }

            Instruction::Add { a, b, dst } => self.arithmetic(a, b, dst, u8::wrapping_add)?,
            Instruction::Sub { a, b, dst } => self.arithmetic(a, b, dst, u8::wrapping_sub)?,
            Instruction::Mul { a, b, dst } => self.arithmetic(a, b, dst, u8::wrapping_mul)?,

            Instruction::Div { a, b, dst } => {
                let lhs = self.registers.read(a)?;
                let rhs = self.registers.read(b)?;
                self.registers.check(dst)?;
                if rhs == 0 {
                    return Err(Fault::DivisionByZero { register: b });
                }
                self.registers.write(dst, lhs / rhs)?;
            }

            Instruction::Jmp { addr } => {
                self.pc = Self::jump_target(addr)?;
            }

            // Target is validated even when the branch is not taken
            Instruction::Jz { reg, addr } => {
                let value = self.registers.read(reg)?;
                let target = Self::jump_target(addr)?;
                if value == 0 {
                    self.pc = target;
                }
            }

            Instruction::Push { reg } => {
                let value = self.registers.read(reg)?;
                self.stack.push(value)?;
            }

            Instruction::Pop { reg } => {
                self.registers.check(reg)?;
                let value = self.stack.pop()?;
                self.registers.write(reg, value)?;
            }

            Instruction::Print { reg } => {
                let value = self.registers.read(reg)?;
                debug!("PRINT r{reg} = {value}");
                writeln!(out, "{value}").map_err(|e| Fault::Output(e.kind()))?;
            }
        }
        Ok(Status::Running)
    }

    fn arithmetic(&mut self, a: u8, b: u8, dst: u8, op: fn(u8, u8) -> u8) -> Result<(), Fault> {
        let lhs = self.registers.read(a)?;
        let rhs = self.registers.read(b)?;
        self.registers.write(dst, op(lhs, rhs))
    }

    fn jump_target(addr: u16) -> Result<u16, Fault> {
        if (addr as usize) < crate::core::MEMORY_SIZE {
            Ok(addr)
        } else {
            Err(Fault::AddressOutOfBounds(addr))
        }
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn sp(&self) -> u16 {
        self.stack.sp()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn registers(&self) -> &[u8; NUM_REGISTERS] {
        self.registers.as_array()
    }

    pub fn register(&self, index: usize) -> Option<u8> {
        self.registers.as_array().get(index).copied()
    }

    pub fn memory(&self) -> &[u8] {
        self.memory.as_slice()
    }

    pub fn stack(&self) -> &[u8] {
        self.stack.as_slice()
    }

    /// Instructions completed since construction or the last reset.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// The fault that stopped the last run, if any.
    pub fn last_fault(&self) -> Option<Fault> {
        self.last_fault
    }
}

impl Default for VirtualMachine {
    fn default() -> Self {
        Self::new()
    }
}
