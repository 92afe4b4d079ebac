use crate::{Chip8Error, REGISTER_COUNT};

/// General purpose registers V0-VF.
///
/// VF doubles as the carry, borrow and collision flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarRegs {
    regs: [u8; REGISTER_COUNT],
}

impl VarRegs {
    pub const FLAG: usize = 0xF;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, index: impl Into<usize>) -> u8 {
        let index = index.into();
        match self.regs.get(index) {
            Some(value) => *value,
            None => {
                log::error!("{}", Chip8Error::RegisterOutOfBounds { index });
                0
            }
        }
    }

    pub fn write(&mut self, index: impl Into<usize>, value: u8) {
        let index = index.into();
        match self.regs.get_mut(index) {
            Some(reg) => *reg = value,
            None => log::error!("{}", Chip8Error::RegisterOutOfBounds { index }),
        }
    }

    pub fn set_flag(&mut self, set: bool) {
        self.regs[Self::FLAG] = u8::from(set);
    }

    pub fn clear(&mut self) {
        self.regs.fill(0);
    }

    pub fn as_array(&self) -> &[u8; REGISTER_COUNT] {
        &self.regs
    }

    pub(crate) fn restore(&mut self, regs: [u8; REGISTER_COUNT]) {
        self.regs = regs;
    }
}
