use rand::Rng;

use crate::{
    Behaviour, Chip8, Chip8Error, Chip8Result, KeyState, Opcode, OpcodeALU, VarRegs, glyph_address,
    u4,
};

impl Chip8 {
    /// Applies a decoded opcode. The program counter already points past it.
    pub(crate) fn execute(&mut self, opcode: Opcode) -> Chip8Result {
        match opcode {
            Opcode::ClearDisplay => {
                self.display.set_all(false);
            }
            Opcode::Jump { nnn } => {
                self.pc = nnn;
            }
            Opcode::JumpWithOffset { x, nnn } => {
                let offset = match self.behaviour {
                    Behaviour::Legacy => self.v.read(0usize),
                    Behaviour::Modern => self.v.read(x),
                };
                self.pc = nnn.wrapping_add(offset.into());
            }
            Opcode::Call { nnn } => {
                self.stack.push(self.pc);
                self.pc = nnn;
            }
            Opcode::Return => {
                self.pc = self.stack.pop();
            }
            Opcode::SkipRegEqualImm { x, nn } => {
                self.skip_if(self.v.read(x) == nn);
            }
            Opcode::SkipRegNotEqualImm { x, nn } => {
                self.skip_if(self.v.read(x) != nn);
            }
            Opcode::SkipRegEqualReg { x, y } => {
                self.skip_if(self.v.read(x) == self.v.read(y));
            }
            Opcode::SkipRegNotEqualReg { x, y } => {
                self.skip_if(self.v.read(x) != self.v.read(y));
            }
            Opcode::SetRegImm { x, nn } => {
                self.v.write(x, nn);
            }
            Opcode::AddRegImm { x, nn } => {
                self.v.write(x, self.v.read(x).wrapping_add(nn));
            }
            Opcode::ALU { x, y, op } => {
                self.execute_alu(x, y, op);
            }
            Opcode::Random { x, nn } => {
                let rand_byte: u8 = self.rng.random();
                self.v.write(x, rand_byte & nn);
            }
            Opcode::SetIndexImm { nnn } => {
                self.i = nnn;
            }
            Opcode::AddIndexReg { x } => {
                self.i = self.i.wrapping_add(self.v.read(x).into());
            }
            Opcode::Draw { x, y, n } => {
                return self.execute_draw(x, y, n);
            }
            Opcode::SkipIfPressed { x } => {
                if let Some(key) = self.key_in(x) {
                    self.skip_if(self.keypad[key] == KeyState::Down);
                }
            }
            Opcode::SkipIfNotPressed { x } => {
                if let Some(key) = self.key_in(x) {
                    self.skip_if(self.keypad[key] != KeyState::Down);
                }
            }
            Opcode::WaitForKey { x } => {
                return self.execute_wait_for_key(x);
            }
            Opcode::ReadDelayTimer { x } => {
                self.v.write(x, self.delay_timer.get());
            }
            Opcode::SetDelayTimer { x } => {
                self.delay_timer.set(self.v.read(x));
            }
            Opcode::SetSoundTimer { x } => {
                self.sound_timer.set(self.v.read(x));
            }
            Opcode::FontChar { x } => {
                self.i = glyph_address(self.v.read(x));
            }
            Opcode::BCD { x } => {
                let value = self.v.read(x);
                let i = usize::from(self.i);
                self.memory.write(i, value / 100);
                self.memory.write(i + 1, (value / 10) % 10);
                self.memory.write(i + 2, value % 10);
            }
            Opcode::StoreRegs { x } => {
                let i = usize::from(self.i);
                for reg_index in 0..=usize::from(x) {
                    self.memory.write(i + reg_index, self.v.read(reg_index));
                }
                self.advance_index_after_transfer(x);
            }
            Opcode::LoadRegs { x } => {
                let i = usize::from(self.i);
                for reg_index in 0..=usize::from(x) {
                    self.v.write(reg_index, self.memory.read(i + reg_index));
                }
                self.advance_index_after_transfer(x);
            }
            Opcode::Unknown(opcode) => {
                log::warn!(
                    "{} at {:03X}, skipped",
                    Chip8Error::UnknownOpcode { opcode },
                    self.pc.wrapping_sub(2)
                );
            }
        };

        Chip8Result::Continue
    }

    fn execute_alu(&mut self, x: u4, y: u4, op: OpcodeALU) {
        let vx = self.v.read(x);
        let vy = self.v.read(y);

        // The flag is written after the result, so VF as a destination holds the flag.
        match op {
            OpcodeALU::Set => self.v.write(x, vy),
            OpcodeALU::Or => {
                self.v.write(x, vx | vy);
                self.reset_flag_on_legacy();
            }
            OpcodeALU::And => {
                self.v.write(x, vx & vy);
                self.reset_flag_on_legacy();
            }
            OpcodeALU::Xor => {
                self.v.write(x, vx ^ vy);
                self.reset_flag_on_legacy();
            }
            OpcodeALU::Add => {
                let (res, overflow) = vx.overflowing_add(vy);
                self.v.write(x, res);
                self.v.set_flag(overflow);
            }
            OpcodeALU::Sub => {
                self.v.write(x, vx.wrapping_sub(vy));
                self.v.set_flag(vx >= vy);
            }
            OpcodeALU::SubReverse => {
                self.v.write(x, vy.wrapping_sub(vx));
                self.v.set_flag(vy >= vx);
            }
            OpcodeALU::ShiftRight => {
                let source = self.shift_source(vx, vy);
                self.v.write(x, source >> 1);
                self.v.set_flag(source & 0x01 != 0);
            }
            OpcodeALU::ShiftLeft => {
                let source = self.shift_source(vx, vy);
                self.v.write(x, source << 1);
                self.v.set_flag(source & 0x80 != 0);
            }
        }
    }

    fn execute_draw(&mut self, x: u4, y: u4, n: u4) -> Chip8Result {
        let width = self.display.width();
        let height = self.display.height();

        let x_pos = usize::from(self.v.read(x)) % width;
        let y_pos = usize::from(self.v.read(y)) % height;

        // Sprites are clipped at the edges, not wrapped
        let row_count = usize::from(n).min(height - y_pos);
        let col_count = std::cmp::min(8, width - x_pos);

        let mut any_erased = false;
        for row in 0..row_count {
            let sprite_byte = self.memory.read(usize::from(self.i) + row);

            for col in 0..col_count {
                // If current sprite bit is non-zero
                if (sprite_byte & (0x80 >> col)) != 0 {
                    let lit = self.display.flip_pixel(x_pos + col, y_pos + row);

                    if !lit {
                        any_erased = true;
                    }
                }
            }
        }

        self.v.set_flag(any_erased);
        Chip8Result::WaitForNextFrame
    }

    /// Completes once a key has been pressed and released.
    fn execute_wait_for_key(&mut self, x: u4) -> Chip8Result {
        if let Some(key) = u4::all().find(|key| self.keypad[*key] == KeyState::JustReleased) {
            self.keypad[key] = KeyState::Up;
            self.v.write(x, key.get());
            return Chip8Result::Continue;
        }

        // Repeat this instruction until a key is released
        self.pc = self.pc.wrapping_sub(2);
        Chip8Result::WaitForNextFrame
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.pc = self.pc.wrapping_add(2);
        }
    }

    /// Key named by Vx, or None if Vx is not a valid key.
    fn key_in(&self, x: u4) -> Option<u4> {
        let value = self.v.read(x);
        match u4::try_from(value) {
            Ok(key) => Some(key),
            Err(err) => {
                log::error!("{err} in V{x}, instruction ignored");
                None
            }
        }
    }

    fn shift_source(&self, vx: u8, vy: u8) -> u8 {
        match self.behaviour {
            Behaviour::Legacy => vy,
            Behaviour::Modern => vx,
        }
    }

    fn reset_flag_on_legacy(&mut self) {
        if self.behaviour == Behaviour::Legacy {
            self.v.write(VarRegs::FLAG, 0);
        }
    }

    fn advance_index_after_transfer(&mut self, x: u4) {
        if self.behaviour == Behaviour::Legacy {
            self.i = self.i.wrapping_add(u16::from(x.get()) + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::RngCore;

    use super::*;
    use crate::{Chip8Config, FONT_GLYPH_SIZE};

    /// Random source that only ever produces `byte`.
    struct FixedRng(u8);

    impl RngCore for FixedRng {
        fn next_u32(&mut self) -> u32 {
            u32::from_ne_bytes([self.0; 4])
        }

        fn next_u64(&mut self) -> u64 {
            u64::from_ne_bytes([self.0; 8])
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            dst.fill(self.0);
        }
    }

    fn chip8_with(behaviour: Behaviour, rom: &[u8]) -> Chip8 {
        let mut chip8 = Chip8::with_rng(
            Chip8Config::with_behaviour(behaviour),
            Box::new(FixedRng(0xFF)),
        );
        chip8.load_rom(rom);
        chip8
    }

    fn run(chip8: &mut Chip8, steps: usize) {
        for _ in 0..steps {
            chip8.step();
        }
    }

    fn reg(chip8: &Chip8, index: usize) -> u8 {
        chip8.registers()[index]
    }

    #[test]
    fn test_add_carry_exhaustive() {
        for a in 0..=255u8 {
            for b in (0..=255u8).step_by(17) {
                let mut chip8 = chip8_with(Behaviour::Legacy, &[0x60, a, 0x61, b, 0x80, 0x14]);
                run(&mut chip8, 3);

                assert_eq!(reg(&chip8, 0), a.wrapping_add(b));
                assert_eq!(reg(&chip8, 0xF), u8::from(a as u16 + b as u16 > 255));
            }
        }
    }

    #[test]
    fn test_sub_flag_boundary() {
        // VX == VY: no borrow, VF = 1, result 0
        let mut chip8 = chip8_with(Behaviour::Legacy, &[0x60, 0x42, 0x61, 0x42, 0x80, 0x15]);
        run(&mut chip8, 3);
        assert_eq!(reg(&chip8, 0), 0);
        assert_eq!(reg(&chip8, 0xF), 1);

        let mut chip8 = chip8_with(Behaviour::Legacy, &[0x60, 0x01, 0x61, 0x02, 0x80, 0x15]);
        run(&mut chip8, 3);
        assert_eq!(reg(&chip8, 0), 0xFF);
        assert_eq!(reg(&chip8, 0xF), 0);
    }

    #[test]
    fn test_sub_reverse() {
        let mut chip8 = chip8_with(Behaviour::Legacy, &[0x60, 0x05, 0x61, 0x08, 0x80, 0x17]);
        run(&mut chip8, 3);
        assert_eq!(reg(&chip8, 0), 3);
        assert_eq!(reg(&chip8, 0xF), 1);

        let mut chip8 = chip8_with(Behaviour::Legacy, &[0x60, 0x08, 0x61, 0x05, 0x80, 0x17]);
        run(&mut chip8, 3);
        assert_eq!(reg(&chip8, 0), 0xFD);
        assert_eq!(reg(&chip8, 0xF), 0);
    }

    #[test]
    fn test_flag_register_as_destination() {
        // 8FE4 with VF = 0xFF, VE = 0x01: the carry overwrites the sum.
        let mut chip8 = chip8_with(Behaviour::Legacy, &[0x6F, 0xFF, 0x6E, 0x01, 0x8F, 0xE4]);
        run(&mut chip8, 3);
        assert_eq!(reg(&chip8, 0xF), 1);
    }

    #[test]
    fn test_logic_ops_reset_flag_on_legacy() {
        for (op, expected) in [(0x1, 0b1110), (0x2, 0b1000), (0x3, 0b0110)] {
            let rom = [0x6F, 0x07, 0x60, 0b1100, 0x61, 0b1010, 0x80, 0x10 | op];

            let mut chip8 = chip8_with(Behaviour::Legacy, &rom);
            run(&mut chip8, 4);
            assert_eq!(reg(&chip8, 0), expected);
            assert_eq!(reg(&chip8, 0xF), 0);

            let mut chip8 = chip8_with(Behaviour::Modern, &rom);
            run(&mut chip8, 4);
            assert_eq!(reg(&chip8, 0), expected);
            assert_eq!(reg(&chip8, 0xF), 0x07);
        }
    }

    #[test]
    fn test_shift_right_quirk() {
        // Legacy copies VY in before shifting
        let rom = [0x60, 0x00, 0x61, 0x03, 0x80, 0x16];
        let mut chip8 = chip8_with(Behaviour::Legacy, &rom);
        run(&mut chip8, 3);
        assert_eq!(reg(&chip8, 0), 0x01);
        assert_eq!(reg(&chip8, 0xF), 0x01);

        // Modern shifts VX in place
        let mut chip8 = chip8_with(Behaviour::Modern, &rom);
        run(&mut chip8, 3);
        assert_eq!(reg(&chip8, 0), 0x00);
        assert_eq!(reg(&chip8, 0xF), 0x00);
    }

    #[test]
    fn test_shift_left_quirk() {
        let rom = [0x60, 0x01, 0x61, 0x81, 0x80, 0x1E];
        let mut chip8 = chip8_with(Behaviour::Legacy, &rom);
        run(&mut chip8, 3);
        assert_eq!(reg(&chip8, 0), 0x02);
        assert_eq!(reg(&chip8, 0xF), 1);

        let mut chip8 = chip8_with(Behaviour::Modern, &rom);
        run(&mut chip8, 3);
        assert_eq!(reg(&chip8, 0), 0x02);
        assert_eq!(reg(&chip8, 0xF), 0);
    }

    #[test]
    fn test_add_immediate_wraps_without_flag() {
        let mut chip8 = chip8_with(Behaviour::Legacy, &[0x60, 0xFF, 0x70, 0x02]);
        run(&mut chip8, 2);
        assert_eq!(reg(&chip8, 0), 0x01);
        assert_eq!(reg(&chip8, 0xF), 0);
    }

    #[test]
    fn test_skips() {
        // 3XNN taken, 4XNN not taken, 5XY0 taken, 9XY0 not taken
        let rom = [
            0x60, 0x07, // 200: V0 = 7
            0x61, 0x07, // 202: V1 = 7
            0x30, 0x07, // 204: skip
            0x00, 0x00, // 206
            0x40, 0x07, // 208: no skip
            0x50, 0x10, // 20A: skip
            0x00, 0x00, // 20C
            0x90, 0x10, // 20E: no skip
        ];
        let mut chip8 = chip8_with(Behaviour::Legacy, &rom);

        run(&mut chip8, 3);
        assert_eq!(chip8.pc(), 0x208);
        chip8.step();
        assert_eq!(chip8.pc(), 0x20A);
        chip8.step();
        assert_eq!(chip8.pc(), 0x20E);
        chip8.step();
        assert_eq!(chip8.pc(), 0x210);
    }

    #[test]
    fn test_call_and_return() {
        let rom = [
            0x23, 0x00, // 200: call 300
        ];
        let mut chip8 = chip8_with(Behaviour::Legacy, &rom);
        chip8.memory.write(0x300, 0x00);
        chip8.memory.write(0x301, 0xEE);

        chip8.step();
        assert_eq!(chip8.pc(), 0x300);
        assert_eq!(chip8.stack(), &[0x202]);

        chip8.step();
        assert_eq!(chip8.pc(), 0x202);
        assert!(chip8.stack().is_empty());
    }

    #[test]
    fn test_return_on_empty_stack() {
        let mut chip8 = chip8_with(Behaviour::Legacy, &[0x00, 0xEE]);
        chip8.step();
        assert_eq!(chip8.pc(), 0);
    }

    #[test]
    fn test_jump_with_offset_quirk() {
        // V0 = 0x10, V2 = 0x20, B234
        let rom = [0x60, 0x10, 0x62, 0x20, 0xB2, 0x34];

        let mut chip8 = chip8_with(Behaviour::Legacy, &rom);
        run(&mut chip8, 3);
        assert_eq!(chip8.pc(), 0x244);

        let mut chip8 = chip8_with(Behaviour::Modern, &rom);
        run(&mut chip8, 3);
        assert_eq!(chip8.pc(), 0x254);
    }

    #[test]
    fn test_random_is_masked() {
        let mut chip8 = chip8_with(Behaviour::Legacy, &[0xC3, 0x5A]);
        chip8.step();
        assert_eq!(reg(&chip8, 3), 0x5A);

        let mut chip8 = Chip8::with_rng(Chip8Config::default(), Box::new(FixedRng(0)));
        chip8.load_rom(&[0xC3, 0xFF]);
        chip8.step();
        assert_eq!(reg(&chip8, 3), 0);
    }

    #[test]
    fn test_index_ops() {
        // I = 0x123, V0 = 0x10, I += V0, then font char for V1 = 0x1A
        let rom = [0xA1, 0x23, 0x60, 0x10, 0xF0, 0x1E, 0x61, 0x1A, 0xF1, 0x29];
        let mut chip8 = chip8_with(Behaviour::Legacy, &rom);

        run(&mut chip8, 3);
        assert_eq!(chip8.index(), 0x133);

        run(&mut chip8, 2);
        assert_eq!(chip8.index(), (0xA * FONT_GLYPH_SIZE) as u16);
    }

    #[test]
    fn test_bcd() {
        let rom = [0x65, 156, 0xA3, 0x00, 0xF5, 0x33];
        let mut chip8 = chip8_with(Behaviour::Legacy, &rom);
        run(&mut chip8, 3);

        assert_eq!(&chip8.memory()[0x300..0x303], &[1, 5, 6]);
        assert_eq!(chip8.index(), 0x300);
    }

    #[test]
    fn test_store_and_load_regs() {
        let rom = [
            0x60, 0x11, 0x61, 0x22, 0x62, 0x33, // V0-V2
            0xA3, 0x00, 0xF2, 0x55, // store V0-V2 at 0x300
            0xA3, 0x00, 0xF1, 0x65, // load V0-V1 from 0x300
        ];

        let mut chip8 = chip8_with(Behaviour::Legacy, &rom);
        run(&mut chip8, 5);
        assert_eq!(&chip8.memory()[0x300..0x303], &[0x11, 0x22, 0x33]);
        assert_eq!(chip8.index(), 0x303);

        chip8.v.clear();
        run(&mut chip8, 2);
        assert_eq!(&chip8.registers()[0..3], &[0x11, 0x22, 0]);
        assert_eq!(chip8.index(), 0x302);

        let mut chip8 = chip8_with(Behaviour::Modern, &rom);
        run(&mut chip8, 5);
        assert_eq!(chip8.index(), 0x300);
        run(&mut chip8, 2);
        assert_eq!(chip8.index(), 0x300);
    }

    #[test]
    fn test_store_regs_near_end_of_memory() {
        // I = 0xFF8, store V0-VF: only 8 bytes fit
        let mut chip8 = chip8_with(Behaviour::Modern, &[0xAF, 0xF8, 0xFF, 0x55]);
        for reg in 0..16u8 {
            chip8.v.write(usize::from(reg), reg + 1);
        }
        run(&mut chip8, 2);

        assert_eq!(chip8.memory().len(), 4096);
        assert_eq!(&chip8.memory()[0xFF8..], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_draw_and_collision() {
        // Sprite with one set bit at 0x300, drawn twice at (5, 7)
        let rom = [
            0x60, 0x05, 0x61, 0x07, 0xA3, 0x00, // V0 = 5, V1 = 7, I = 0x300
            0xD0, 0x11, 0xD0, 0x11,
        ];
        let mut chip8 = chip8_with(Behaviour::Legacy, &rom);
        chip8.memory.write(0x300, 0x80);
        run(&mut chip8, 3);

        assert_eq!(chip8.step(), Chip8Result::WaitForNextFrame);
        assert!(chip8.get_pixel(5, 7));
        assert_eq!(reg(&chip8, 0xF), 0);

        chip8.step();
        assert!(!chip8.get_pixel(5, 7));
        assert_eq!(reg(&chip8, 0xF), 1);
    }

    #[test]
    fn test_draw_clips_at_edges() {
        // 0xFF at x = 63: only column 63 is drawn, nothing wraps to column 0
        let rom = [0x60, 63, 0x61, 31, 0xA3, 0x00, 0xD0, 0x12];
        let mut chip8 = chip8_with(Behaviour::Legacy, &rom);
        chip8.memory.write(0x300, 0xFF);
        chip8.memory.write(0x301, 0xFF);
        run(&mut chip8, 4);

        assert!(chip8.get_pixel(63, 31));
        let lit = chip8.display().rows().flatten().filter(|p| **p).count();
        assert_eq!(lit, 1);
    }

    #[test]
    fn test_draw_coordinates_wrap() {
        // (64 + 2, 32 + 1) starts at (2, 1)
        let rom = [0x60, 66, 0x61, 33, 0xA3, 0x00, 0xD0, 0x11];
        let mut chip8 = chip8_with(Behaviour::Legacy, &rom);
        chip8.memory.write(0x300, 0x80);
        run(&mut chip8, 4);

        assert!(chip8.get_pixel(2, 1));
    }

    #[test]
    fn test_clear_display() {
        let mut chip8 = chip8_with(Behaviour::Legacy, &[0x00, 0xE0]);
        chip8.display.set_all(true);
        chip8.step();
        assert!(chip8.display().rows().flatten().all(|p| !*p));
    }

    #[test]
    fn test_key_skips() {
        let rom = [0x60, 0x04, 0xE0, 0x9E, 0x00, 0x00, 0xE0, 0xA1];
        let key = u4::from_low(4);

        let mut chip8 = chip8_with(Behaviour::Legacy, &rom);
        chip8.set_key_state(key, KeyState::Down);
        run(&mut chip8, 2);
        assert_eq!(chip8.pc(), 0x206);
        chip8.step();
        assert_eq!(chip8.pc(), 0x208);

        for state in [KeyState::Up, KeyState::JustReleased] {
            let mut chip8 = chip8_with(Behaviour::Legacy, &rom);
            chip8.set_key_state(key, state);
            run(&mut chip8, 2);
            assert_eq!(chip8.pc(), 0x204);
        }
    }

    #[test]
    fn test_key_skip_with_invalid_key() {
        let mut chip8 = chip8_with(Behaviour::Legacy, &[0x60, 0x20, 0xE0, 0xA1]);
        run(&mut chip8, 2);
        assert_eq!(chip8.pc(), 0x204);
    }

    #[test]
    fn test_wait_for_key_release() {
        let mut chip8 = chip8_with(Behaviour::Legacy, &[0xF5, 0x0A]);
        let key = u4::from_low(0xB);

        assert_eq!(chip8.step(), Chip8Result::WaitForNextFrame);
        assert_eq!(chip8.pc(), 0x200);

        // Holding the key down is not enough
        chip8.set_key_state(key, KeyState::Down);
        chip8.step();
        assert_eq!(chip8.pc(), 0x200);

        chip8.set_key_state(key, KeyState::JustReleased);
        assert_eq!(chip8.step(), Chip8Result::Continue);
        assert_eq!(chip8.pc(), 0x202);
        assert_eq!(reg(&chip8, 5), 0xB);
        assert_eq!(chip8.key_state(key), KeyState::Up);
    }

    #[test]
    fn test_timers() {
        let rom = [0x60, 0x3C, 0xF0, 0x15, 0xF0, 0x18, 0xF1, 0x07];
        let mut chip8 = chip8_with(Behaviour::Legacy, &rom);
        run(&mut chip8, 4);

        // A few milliseconds may pass between set and get
        assert!((58..=60).contains(&reg(&chip8, 1)));
        assert!(chip8.should_beep());
        assert!(chip8.sound_timer() > 0);
    }

    #[test]
    fn test_unknown_opcode_is_skipped() {
        let mut chip8 = chip8_with(Behaviour::Legacy, &[0xFF, 0xFF, 0x60, 0x01]);
        assert_eq!(chip8.step(), Chip8Result::Continue);
        assert_eq!(chip8.pc(), 0x202);
        chip8.step();
        assert_eq!(reg(&chip8, 0), 1);
    }
}
