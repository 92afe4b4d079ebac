use crate::{Behaviour, DISPLAY_X, DISPLAY_Y, MEMORY_SIZE, ROM_START_ADDRESS};

/// Smallest memory that still holds the font and one instruction of program.
pub const MIN_MEMORY_SIZE: usize = ROM_START_ADDRESS + 2;

/// Options fixed when the machine is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chip8Config {
    /// Quirk set. Can still be changed later with `Chip8::set_behaviour`.
    pub behaviour: Behaviour,
    /// Memory capacity in bytes.
    pub memory_size: usize,
    pub display_width: usize,
    pub display_height: usize,
}

impl Chip8Config {
    pub fn with_behaviour(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            ..Self::default()
        }
    }

    /// Raises values the machine cannot work with to usable minimums.
    pub(crate) fn sanitized(mut self) -> Self {
        if self.memory_size < MIN_MEMORY_SIZE {
            log::warn!(
                "memory size {} is too small, using {MIN_MEMORY_SIZE}",
                self.memory_size
            );
            self.memory_size = MIN_MEMORY_SIZE;
        }
        if self.display_width == 0 || self.display_height == 0 {
            log::warn!(
                "display size {}x{} is empty, using {DISPLAY_X}x{DISPLAY_Y}",
                self.display_width,
                self.display_height
            );
            self.display_width = DISPLAY_X;
            self.display_height = DISPLAY_Y;
        }
        self
    }
}

impl Default for Chip8Config {
    fn default() -> Self {
        Self {
            behaviour: Behaviour::Legacy,
            memory_size: MEMORY_SIZE,
            display_width: DISPLAY_X,
            display_height: DISPLAY_Y,
        }
    }
}
