use std::fmt;
use std::ops::{Index, IndexMut};

use crate::Chip8Error;

/// A 4-bit unsigned integer (nibble).
///
/// Used for register operands and keypad keys, which both span 0x0-0xF.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(non_camel_case_types)]
pub struct u4(u8);

impl u4 {
    /// Creates a new `u4` from the low nibble of a `u8`.
    pub const fn from_low(value: u8) -> Self {
        Self(value & 0x0F)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// All sixteen values in ascending order.
    pub fn all() -> impl Iterator<Item = u4> {
        (0..16).map(u4)
    }
}

impl TryFrom<u8> for u4 {
    type Error = Chip8Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value <= 0x0F {
            Ok(Self(value))
        } else {
            Err(Chip8Error::KeyOutOfRange { key: value })
        }
    }
}

impl From<u4> for usize {
    fn from(v: u4) -> usize {
        v.0 as usize
    }
}

impl From<u4> for u8 {
    fn from(v: u4) -> u8 {
        v.0
    }
}

impl fmt::Display for u4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

/// Registers and the keypad both have 16 entries, so every nibble is in range.
impl<T> Index<u4> for [T; 16] {
    type Output = T;

    fn index(&self, slot: u4) -> &T {
        &self[usize::from(slot)]
    }
}

impl<T> IndexMut<u4> for [T; 16] {
    fn index_mut(&mut self, slot: u4) -> &mut T {
        &mut self[usize::from(slot)]
    }
}
