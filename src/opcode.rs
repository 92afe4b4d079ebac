use std::fmt;

use crate::{Behaviour, Instruction, u4};

/// CHIP-8 instruction opcodes.
///
/// The fields (x, y, n, nn, nnn) correspond to the operands encoded in the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// 1nnn - Jump to location nnn.
    Jump { nnn: u16 },
    /// Bnnn - Jump to location nnn + V0 (legacy), or xnn + Vx (modern).
    JumpWithOffset { x: u4, nnn: u16 },

    /// 2nnn - Call subroutine at nnn.
    Call { nnn: u16 },
    /// 00EE - Return from a subroutine.
    Return,

    /// 3xnn - Skip next instruction if Vx == nn.
    SkipRegEqualImm { x: u4, nn: u8 },
    /// 4xnn - Skip next instruction if Vx != nn.
    SkipRegNotEqualImm { x: u4, nn: u8 },
    /// 5xy0 - Skip next instruction if Vx == Vy.
    SkipRegEqualReg { x: u4, y: u4 },
    /// 9xy0 - Skip next instruction if Vx != Vy.
    SkipRegNotEqualReg { x: u4, y: u4 },

    /// 6xnn - Set Vx = nn.
    SetRegImm { x: u4, nn: u8 },
    /// 7xnn - Set Vx = Vx + nn.
    AddRegImm { x: u4, nn: u8 },
    /// Annn - Set I = nnn.
    SetIndexImm { nnn: u16 },
    /// Fx1E - Set I = I + Vx.
    AddIndexReg { x: u4 },

    /// 8xyN - ALU operations
    ALU { x: u4, y: u4, op: OpcodeALU },
    /// Cxnn - Set Vx = random byte AND nn.
    Random { x: u4, nn: u8 },

    /// 00E0 - Clear the display.
    ClearDisplay,
    /// Dxyn - Display n-byte sprite starting at memory location I at (Vx, Vy).
    Draw { x: u4, y: u4, n: u4 },

    /// Ex9E - Skip next instruction if key with the value of Vx is pressed.
    SkipIfPressed { x: u4 },
    /// ExA1 - Skip next instruction if key with the value of Vx is not pressed.
    SkipIfNotPressed { x: u4 },
    /// Fx0A - Wait for a key press and release, store the key in Vx.
    WaitForKey { x: u4 },

    /// Fx07 - Set Vx = delay timer.
    ReadDelayTimer { x: u4 },
    /// Fx15 - Set delay timer = Vx.
    SetDelayTimer { x: u4 },
    /// Fx18 - Set sound timer = Vx.
    SetSoundTimer { x: u4 },

    /// Fx29 - Set I = location of the font glyph for digit Vx.
    FontChar { x: u4 },
    /// Fx33 - Store BCD representation of Vx in memory locations I, I+1, and I+2.
    BCD { x: u4 },

    /// Fx55 - Store registers V0 through Vx in memory starting at location I.
    StoreRegs { x: u4 },
    /// Fx65 - Read registers V0 through Vx from memory starting at location I.
    LoadRegs { x: u4 },

    /// Anything else, including the unused 8xy8-8xyD slots.
    Unknown(u16),
}

/// Operations of the 8xyN family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeALU {
    /// 8xy0 - Vx = Vy
    Set,
    /// 8xy1 - Vx |= Vy
    Or,
    /// 8xy2 - Vx &= Vy
    And,
    /// 8xy3 - Vx ^= Vy
    Xor,
    /// 8xy4 - Vx += Vy, VF = carry
    Add,
    /// 8xy5 - Vx -= Vy, VF = not borrow
    Sub,
    /// 8xy6 - Vx >>= 1, VF = shifted out bit
    ShiftRight,
    /// 8xy7 - Vx = Vy - Vx, VF = not borrow
    SubReverse,
    /// 8xyE - Vx <<= 1, VF = shifted out bit
    ShiftLeft,
}

impl Opcode {
    /// Decodes one instruction word.
    ///
    /// Pure function of the word, shared by the interpreter and the disassembler.
    pub fn decode(instruction: Instruction) -> Self {
        let x = instruction.x();
        let y = instruction.y();
        let n = instruction.n();
        let nn = instruction.nn();
        let nnn = instruction.nnn();
        let unknown = Opcode::Unknown(instruction.raw());

        match instruction.family() {
            0x0 => match instruction.raw() {
                0x00E0 => Opcode::ClearDisplay,
                0x00EE => Opcode::Return,
                _ => unknown,
            },
            0x1 => Opcode::Jump { nnn },
            0x2 => Opcode::Call { nnn },
            0x3 => Opcode::SkipRegEqualImm { x, nn },
            0x4 => Opcode::SkipRegNotEqualImm { x, nn },
            0x5 if n.get() == 0 => Opcode::SkipRegEqualReg { x, y },
            0x6 => Opcode::SetRegImm { x, nn },
            0x7 => Opcode::AddRegImm { x, nn },
            0x8 => match OpcodeALU::from_selector(n) {
                Some(op) => Opcode::ALU { x, y, op },
                None => unknown,
            },
            0x9 if n.get() == 0 => Opcode::SkipRegNotEqualReg { x, y },
            0xA => Opcode::SetIndexImm { nnn },
            0xB => Opcode::JumpWithOffset { x, nnn },
            0xC => Opcode::Random { x, nn },
            0xD => Opcode::Draw { x, y, n },
            0xE => match nn {
                0x9E => Opcode::SkipIfPressed { x },
                0xA1 => Opcode::SkipIfNotPressed { x },
                _ => unknown,
            },
            0xF => match nn {
                0x07 => Opcode::ReadDelayTimer { x },
                0x0A => Opcode::WaitForKey { x },
                0x15 => Opcode::SetDelayTimer { x },
                0x18 => Opcode::SetSoundTimer { x },
                0x1E => Opcode::AddIndexReg { x },
                0x29 => Opcode::FontChar { x },
                0x33 => Opcode::BCD { x },
                0x55 => Opcode::StoreRegs { x },
                0x65 => Opcode::LoadRegs { x },
                _ => unknown,
            },
            _ => unknown,
        }
    }

    /// Mnemonic as it reads under `behaviour`.
    ///
    /// Only BNNN differs: modern machines jump relative to VX instead of V0.
    pub fn mnemonic(self, behaviour: Behaviour) -> Mnemonic {
        Mnemonic {
            opcode: self,
            behaviour,
        }
    }
}

impl OpcodeALU {
    /// Maps the low nibble of an 8XYN word to its operation.
    fn from_selector(selector: u4) -> Option<Self> {
        let op = match selector.get() {
            0x0 => OpcodeALU::Set,
            0x1 => OpcodeALU::Or,
            0x2 => OpcodeALU::And,
            0x3 => OpcodeALU::Xor,
            0x4 => OpcodeALU::Add,
            0x5 => OpcodeALU::Sub,
            0x6 => OpcodeALU::ShiftRight,
            0x7 => OpcodeALU::SubReverse,
            0xE => OpcodeALU::ShiftLeft,
            _ => return None,
        };
        Some(op)
    }
}

/// An `Opcode` formatted for a particular quirk set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mnemonic {
    opcode: Opcode,
    behaviour: Behaviour,
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.opcode, self.behaviour) {
            (Opcode::JumpWithOffset { x, nnn }, Behaviour::Modern) => {
                write!(f, "JP V{x}, {nnn:#05X}")
            }
            (opcode, _) => fmt::Display::fmt(&opcode, f),
        }
    }
}

impl fmt::Display for Opcode {
    /// Assembler style mnemonic in original CHIP-8 notation, e.g. `LD V3, 0x2A`.
    /// Use `Opcode::mnemonic` for modern notation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Opcode::ClearDisplay => write!(f, "CLS"),
            Opcode::Return => write!(f, "RET"),
            Opcode::Jump { nnn } => write!(f, "JP {nnn:#05X}"),
            Opcode::JumpWithOffset { nnn, .. } => write!(f, "JP V0, {nnn:#05X}"),
            Opcode::Call { nnn } => write!(f, "CALL {nnn:#05X}"),
            Opcode::SkipRegEqualImm { x, nn } => write!(f, "SE V{x}, {nn:#04X}"),
            Opcode::SkipRegNotEqualImm { x, nn } => write!(f, "SNE V{x}, {nn:#04X}"),
            Opcode::SkipRegEqualReg { x, y } => write!(f, "SE V{x}, V{y}"),
            Opcode::SkipRegNotEqualReg { x, y } => write!(f, "SNE V{x}, V{y}"),
            Opcode::SetRegImm { x, nn } => write!(f, "LD V{x}, {nn:#04X}"),
            Opcode::AddRegImm { x, nn } => write!(f, "ADD V{x}, {nn:#04X}"),
            Opcode::SetIndexImm { nnn } => write!(f, "LD I, {nnn:#05X}"),
            Opcode::AddIndexReg { x } => write!(f, "ADD I, V{x}"),
            Opcode::ALU { x, y, op } => {
                let mnemonic = match op {
                    OpcodeALU::Set => "LD",
                    OpcodeALU::Or => "OR",
                    OpcodeALU::And => "AND",
                    OpcodeALU::Xor => "XOR",
                    OpcodeALU::Add => "ADD",
                    OpcodeALU::Sub => "SUB",
                    OpcodeALU::ShiftRight => "SHR",
                    OpcodeALU::SubReverse => "SUBN",
                    OpcodeALU::ShiftLeft => "SHL",
                };
                write!(f, "{mnemonic} V{x}, V{y}")
            }
            Opcode::Random { x, nn } => write!(f, "RND V{x}, {nn:#04X}"),
            Opcode::Draw { x, y, n } => write!(f, "DRW V{x}, V{y}, {}", n.get()),
            Opcode::SkipIfPressed { x } => write!(f, "SKP V{x}"),
            Opcode::SkipIfNotPressed { x } => write!(f, "SKNP V{x}"),
            Opcode::WaitForKey { x } => write!(f, "LD V{x}, K"),
            Opcode::ReadDelayTimer { x } => write!(f, "LD V{x}, DT"),
            Opcode::SetDelayTimer { x } => write!(f, "LD DT, V{x}"),
            Opcode::SetSoundTimer { x } => write!(f, "LD ST, V{x}"),
            Opcode::FontChar { x } => write!(f, "LD F, V{x}"),
            Opcode::BCD { x } => write!(f, "LD B, V{x}"),
            Opcode::StoreRegs { x } => write!(f, "LD [I], V{x}"),
            Opcode::LoadRegs { x } => write!(f, "LD V{x}, [I]"),
            Opcode::Unknown(raw) => write!(f, "DW {raw:#06X}"),
        }
    }
}
