//! CHIP-8 virtual machine.
//!
//! [`Chip8`] owns the whole machine and is driven one instruction at a time
//! with [`Chip8::step`]. The caller decides how fast to step, either by hand
//! or through [`Chip8Runner`], and polls the display, sound flag and debug
//! state between frames.
mod chip8;
mod config;
pub mod disasm;
mod display;
mod execute;
mod font;
mod instruction;
mod memory;
mod nibble;
mod opcode;
mod registers;
mod runner;
mod stack;
mod state;
mod timer;
mod types;

pub use chip8::*;
pub use config::*;
pub use display::*;
pub use font::*;
pub use instruction::*;
pub use memory::*;
pub use nibble::u4;
pub use opcode::*;
pub use registers::*;
pub use runner::*;
pub use stack::*;
pub use state::*;
pub use timer::*;
pub use types::*;
