// Copyright (C) 2025 Dayton Fishell
// Octet 8-bit Virtual Machine
// This file is part of Octet.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Fixed-capacity storage owned by the machine: program memory, the
//! register file and the operand stack.

pub mod memory;
pub mod registers;
pub mod stack;

// Re-export commonly used core types here
pub use memory::{MEMORY_SIZE, MemoryImage};
pub use registers::{NUM_REGISTERS, RegisterFile};
pub use stack::{OperandStack, STACK_EMPTY, STACK_SIZE};
