// Copyright (C) 2025 Dayton Fishell
// Octet 8-bit Virtual Machine
// This file is part of Octet.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Octet 8-bit bytecode virtual machine
//!
//! This library provides a small register/stack interpreter over a fixed
//! 256-byte memory image, an assembler for its instruction set, and a host
//! driver used by the `octet` binary.

pub mod asm;
pub mod core;
pub mod demo;
pub mod error;
pub mod host;
pub mod isa;
pub mod machine;

// Re-export commonly used types
pub use asm::{AsmError, AssembledProgram, assemble, disassemble};
pub use crate::core::{MEMORY_SIZE, NUM_REGISTERS, STACK_EMPTY, STACK_SIZE};
pub use error::{Fault, LoadError};
pub use host::{Host, Outcome, RunConfig, RunReport, run_program};
pub use isa::{Instruction, Opcode};
pub use machine::{Status, VirtualMachine};
