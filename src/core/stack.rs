//! Byte-wide operand stack growing down from the top slot.
//!
//! `sp` names the next free slot. A push writes at `sp` and then moves it
//! down; a pop moves it up and then reads. Slot 0 is never written, so the
//! stack holds at most `STACK_SIZE - 1` values.

use crate::error::Fault;

/// Number of cells backing the stack (same as the memory image).
pub const STACK_SIZE: usize = 256;

/// Stack pointer value of an empty stack.
pub const STACK_EMPTY: u16 = (STACK_SIZE - 1) as u16;

pub struct OperandStack {
    cells: [u8; STACK_SIZE],
    sp: u16,
}

impl OperandStack {
    pub fn new() -> Self {
        Self {
            cells: [0; STACK_SIZE],
            sp: STACK_EMPTY,
        }
    }

    pub fn push(&mut self, value: u8) -> Result<(), Fault> {
        if self.sp == 0 {
            return Err(Fault::StackUnderflow { sp: self.sp });
        }
        self.cells[self.sp as usize] = value;
        self.sp -= 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u8, Fault> {
        if self.sp >= STACK_EMPTY {
            return Err(Fault::StackOverflow { sp: self.sp });
        }
        self.sp += 1;
        Ok(self.cells[self.sp as usize])
    }

    pub fn sp(&self) -> u16 {
        self.sp
    }

    /// Number of values currently on the stack.
    pub fn depth(&self) -> usize {
        (STACK_EMPTY - self.sp) as usize
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }

    /// Zero every cell and return to the empty position.
    pub fn clear(&mut self) {
        self.cells = [0; STACK_SIZE];
        self.sp = STACK_EMPTY;
    }
}

impl Default for OperandStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_is_lifo() {
        let mut stack = OperandStack::new();
        stack.push(1).unwrap();
        stack.push(2).unwrap();
        stack.push(3).unwrap();
        assert_eq!(stack.depth(), 3);
        assert_eq!(stack.pop(), Ok(3));
        assert_eq!(stack.pop(), Ok(2));
        assert_eq!(stack.pop(), Ok(1));
        assert_eq!(stack.sp(), STACK_EMPTY);
    }

    #[test]
    fn first_push_lands_in_top_slot() {
        let mut stack = OperandStack::new();
        stack.push(0x5A).unwrap();
        assert_eq!(stack.as_slice()[STACK_SIZE - 1], 0x5A);
        assert_eq!(stack.sp(), STACK_EMPTY - 1);
    }

    #[test]
    fn pop_on_empty_stack_overflows() {
        let mut stack = OperandStack::new();
        assert_eq!(stack.pop(), Err(Fault::StackOverflow { sp: STACK_EMPTY }));
        assert_eq!(stack.sp(), STACK_EMPTY);
    }

    #[test]
    fn full_stack_rejects_push_without_writing() {
        let mut stack = OperandStack::new();
        for i in 0..STACK_SIZE - 1 {
            stack.push(i as u8).unwrap();
        }
        assert_eq!(stack.sp(), 0);
        assert_eq!(stack.depth(), STACK_SIZE - 1);

        assert_eq!(stack.push(0xEE), Err(Fault::StackUnderflow { sp: 0 }));
        assert_eq!(stack.as_slice()[0], 0);
        assert_eq!(stack.sp(), 0);
    }

    #[test]
    fn clear_restores_empty_marker() {
        let mut stack = OperandStack::new();
        stack.push(9).unwrap();
        stack.clear();
        assert_eq!(stack.sp(), STACK_EMPTY);
        assert_eq!(stack.depth(), 0);
        assert!(stack.as_slice().iter().all(|&b| b == 0));
    }
}
