use std::path::PathBuf;

// Standard CHIP-8 machine dimensions
pub const DISPLAY_X: usize = 64;
pub const DISPLAY_Y: usize = 32;
pub const MEMORY_SIZE: usize = 4096;
pub const ROM_START_ADDRESS: usize = 0x200;
pub const REGISTER_COUNT: usize = 16;
pub const KEY_COUNT: usize = 16;

/// Result type for CHIP-8 CPU cycle execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chip8Result {
    /// Continue executing instructions in the current frame.
    Continue,
    /// Wait for the next frame before continuing
    /// (e.g., after a draw instruction to limit the display update rate to the frame rate).
    WaitForNextFrame,
}

/// State of a single keypad key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyState {
    #[default]
    Up,
    Down,
    /// Released since the last input poll. Decays to `Up` once observed.
    JustReleased,
}

/// Interpreter quirk set.
///
/// Affects 8XY6/8XYE, BNNN and FX55/FX65.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Behaviour {
    /// Original COSMAC VIP CHIP-8.
    #[default]
    Legacy,
    /// SUPER-CHIP style interpreters.
    Modern,
}

/// Error types that can occur during CHIP-8 emulation.
///
/// Only ROM loading hands these back to the caller. Every other variant
/// describes a fault the engine recovers from; those are logged and the
/// offending access degrades to a no-op.
#[derive(Debug, thiserror::Error)]
pub enum Chip8Error {
    #[error("Failed to read ROM file {path:?}")]
    RomRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Memory access out of bounds at address {address:#06X} (capacity {capacity:#06X})")]
    MemoryOutOfBounds { address: usize, capacity: usize },

    #[error("Register index out of bounds: V{index:X}")]
    RegisterOutOfBounds { index: usize },

    #[error("Display access out of bounds at ({x}, {y}), display is {width}x{height}")]
    PixelOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    #[error("Key out of range: {key:#04X}")]
    KeyOutOfRange { key: u8 },

    #[error("Stack underflow: attempted to return from a subroutine with empty call stack")]
    StackUnderflow,

    #[error("Unknown opcode: {opcode:#06X}")]
    UnknownOpcode { opcode: u16 },

    #[error("{register} {address:#06X} is outside memory, clamped to {clamped:#06X}")]
    AddressClamped {
        register: &'static str,
        address: u16,
        clamped: u16,
    },
}
