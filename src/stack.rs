use crate::Chip8Error;

/// Call stack of return addresses.
///
/// Grows without the historical 16 level limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    frames: Vec<u16>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, address: u16) {
        self.frames.push(address);
    }

    /// Pops the most recent return address.
    ///
    /// An empty stack means the program returned without a matching call.
    /// That is logged and 0 is returned so the machine keeps running.
    pub fn pop(&mut self) -> u16 {
        self.frames.pop().unwrap_or_else(|| {
            log::error!("{}", Chip8Error::StackUnderflow);
            0
        })
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Frames from the bottom of the stack to the top.
    pub fn as_slice(&self) -> &[u16] {
        &self.frames
    }

    pub(crate) fn restore(&mut self, frames: &[u16]) {
        self.frames.clear();
        self.frames.extend_from_slice(frames);
    }
}
