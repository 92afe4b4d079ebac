//! ROM listing.
use std::fmt;

use crate::{Behaviour, Instruction, Opcode};

/// One decoded instruction of a ROM listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisasmLine {
    pub address: u16,
    pub instruction: Instruction,
    pub opcode: Opcode,
    pub behaviour: Behaviour,
}

impl fmt::Display for DisasmLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:03X}: {}  {}",
            self.address,
            self.instruction,
            self.opcode.mnemonic(self.behaviour)
        )
    }
}

/// Decodes `rom` two bytes at a time as if it were loaded at `origin`,
/// writing mnemonics the way `behaviour` interprets them.
///
/// Data mixed into the program shows up as whatever it happens to decode to.
/// A trailing odd byte is padded with zero.
pub fn disassemble(
    rom: &[u8],
    origin: u16,
    behaviour: Behaviour,
) -> impl Iterator<Item = DisasmLine> + '_ {
    rom.chunks(2).enumerate().map(move |(index, pair)| {
        let instruction = Instruction::from_bytes(pair[0], pair.get(1).copied().unwrap_or(0));
        DisasmLine {
            address: origin.wrapping_add((index * 2) as u16),
            instruction,
            opcode: Opcode::decode(instruction),
            behaviour,
        }
    })
}
