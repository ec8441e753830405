use crate::error::Fault;

/// Number of general-purpose registers.
pub const NUM_REGISTERS: usize = 8;

/// General-purpose registers `r0`..`r7`, each holding a raw byte.
pub struct RegisterFile {
    cells: [u8; NUM_REGISTERS],
}

impl RegisterFile {
    pub fn new() -> Self {
        Self {
            cells: [0; NUM_REGISTERS],
        }
    }

    /// Validate a register index without touching the file.
    pub fn check(&self, index: u8) -> Result<(), Fault> {
        if (index as usize) < NUM_REGISTERS {
            Ok(())
        } else {
            Err(Fault::InvalidRegister(index))
        }
    }

    pub fn read(&self, index: u8) -> Result<u8, Fault> {
        self.cells
            .get(index as usize)
            .copied()
            .ok_or(Fault::InvalidRegister(index))
    }

    pub fn write(&mut self, index: u8, value: u8) -> Result<(), Fault> {
        let slot = self
            .cells
            .get_mut(index as usize)
            .ok_or(Fault::InvalidRegister(index))?;
        *slot = value;
        Ok(())
    }

    pub fn as_array(&self) -> &[u8; NUM_REGISTERS] {
        &self.cells
    }

    pub fn clear(&mut self) {
        self.cells = [0; NUM_REGISTERS];
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let mut regs = RegisterFile::new();
        regs.write(7, 0x42).unwrap();
        assert_eq!(regs.read(7), Ok(0x42));
        assert_eq!(regs.read(0), Ok(0));
    }

    #[test]
    fn out_of_range_index_is_a_fault() {
        let mut regs = RegisterFile::new();
        assert_eq!(regs.read(8), Err(Fault::InvalidRegister(8)));
        assert_eq!(regs.write(200, 1), Err(Fault::InvalidRegister(200)));
        assert_eq!(regs.check(8), Err(Fault::InvalidRegister(8)));
        assert_eq!(regs.check(3), Ok(()));
        assert_eq!(regs.as_array(), &[0; NUM_REGISTERS]);
    }
}
