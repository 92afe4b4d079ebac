use crate::{Chip8Error, MEMORY_SIZE};

/// Byte addressable RAM with bounds checked access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Reads a byte, returning 0 for addresses past the end.
    pub fn read(&self, address: usize) -> u8 {
        match self.data.get(address) {
            Some(byte) => *byte,
            None => {
                log::error!("{}", self.out_of_bounds(address));
                0
            }
        }
    }

    /// Writes a byte. Writes past the end are dropped.
    pub fn write(&mut self, address: usize, value: u8) {
        let capacity = self.capacity();
        match self.data.get_mut(address) {
            Some(byte) => *byte = value,
            None => log::error!(
                "{} (dropped write of {value:#04X})",
                Chip8Error::MemoryOutOfBounds { address, capacity }
            ),
        }
    }

    /// Copies `bytes` in starting at `start`, discarding whatever does not fit.
    ///
    /// Returns the number of bytes actually written.
    pub fn load(&mut self, start: usize, bytes: &[u8]) -> usize {
        let capacity = self.capacity();
        let Some(dest) = self.data.get_mut(start..) else {
            log::error!(
                "{}",
                Chip8Error::MemoryOutOfBounds {
                    address: start,
                    capacity,
                }
            );
            return 0;
        };

        let count = dest.len().min(bytes.len());
        dest[..count].copy_from_slice(&bytes[..count]);
        count
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    fn out_of_bounds(&self, address: usize) -> Chip8Error {
        Chip8Error::MemoryOutOfBounds {
            address,
            capacity: self.capacity(),
        }
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(MEMORY_SIZE)
    }
}
