use crate::{Display, REGISTER_COUNT};

/// Deep copy of the machine taken with `Chip8::save_state`.
///
/// Covers memory, display, PC, I, stack and registers. Timers and keypad
/// state are not part of a snapshot and keep running across a restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveState {
    pub memory: Vec<u8>,
    pub display: Display,
    pub pc: u16,
    pub i: u16,
    pub stack: Vec<u16>,
    pub registers: [u8; REGISTER_COUNT],
}
