use crate::error::LoadError;

/// Number of addressable cells in the memory image.
pub const MEMORY_SIZE: usize = 256;

/// Byte-addressed program memory holding instructions and their operands.
pub struct MemoryImage {
    cells: [u8; MEMORY_SIZE],
}

impl MemoryImage {
    pub fn new() -> Self {
        Self {
            cells: [0; MEMORY_SIZE],
        }
    }

    /// Copy `program` into memory starting at address 0.
    ///
    /// Programs larger than the image are rejected as a whole; nothing is
    /// copied. Cells past the end of `program` keep their old contents.
    pub fn load(&mut self, program: &[u8]) -> Result<(), LoadError> {
        if program.len() > MEMORY_SIZE {
            return Err(LoadError::ProgramTooLarge {
                size: program.len(),
                capacity: MEMORY_SIZE,
            });
        }
        self.cells[..program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Read a byte, or `None` when `addr` lies outside the image.
    pub fn read(&self, addr: u16) -> Option<u8> {
        self.cells.get(addr as usize).copied()
    }

    pub fn clear(&mut self) {
        self.cells = [0; MEMORY_SIZE];
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }
}

impl Default for MemoryImage {
    fn default() -> Self {
        Self::new()
    }
}
