use std::path::Path;

use rand::{RngCore, SeedableRng, rngs::StdRng};

use crate::{
    Behaviour, Chip8Config, Chip8Error, Chip8Result, Display, FONT, FONT_START_ADDRESS,
    Instruction, KEY_COUNT, KeyState, MIN_MEMORY_SIZE, Memory, Opcode, ROM_START_ADDRESS, SaveState, Stack, Timer,
    VarRegs, u4,
};

/// CHIP-8 virtual machine state
pub struct Chip8 {
    /// Main memory, font glyphs at the bottom and the program from 0x200
    pub(crate) memory: Memory,
    /// Monochrome frame buffer
    pub(crate) display: Display,

    /// Program counter: address of the next instruction to execute
    pub(crate) pc: u16,
    /// Index register: used for memory operations
    pub(crate) i: u16,
    /// General-purpose registers V0-VF (VF is used as a flag register)
    pub(crate) v: VarRegs,
    /// Call stack for subroutine returns
    pub(crate) stack: Stack,

    /// Delay timer: counts down at 60Hz until it reaches 0
    pub(crate) delay_timer: Timer,
    /// Sound timer: counts down at 60Hz, beeps while non-zero
    pub(crate) sound_timer: Timer,

    /// Keypad state for keys 0x0-0xF
    pub(crate) keypad: [KeyState; KEY_COUNT],

    pub(crate) behaviour: Behaviour,
    /// Source of CXNN random bytes
    pub(crate) rng: Box<dyn RngCore + Send>,
}

impl Chip8 {
    pub fn new() -> Self {
        Self::with_config(Chip8Config::default())
    }

    pub fn with_config(config: Chip8Config) -> Self {
        Self::with_rng(config, Box::new(StdRng::from_os_rng()))
    }

    /// Builds a machine drawing its random bytes from `rng`.
    pub fn with_rng(config: Chip8Config, rng: Box<dyn RngCore + Send>) -> Self {
        let config = config.sanitized();

        let mut chip8 = Chip8 {
            memory: Memory::new(config.memory_size),
            display: Display::new(config.display_width, config.display_height),
            pc: ROM_START_ADDRESS as u16,
            i: 0,
            v: VarRegs::new(),
            stack: Stack::new(),
            delay_timer: Timer::new(),
            sound_timer: Timer::new(),
            keypad: [KeyState::Up; KEY_COUNT],
            behaviour: config.behaviour,
            rng,
        };
        chip8.load_font();
        chip8
    }

    /// Returns the machine to its power-on state.
    ///
    /// Memory is wiped (the font is reloaded), the display, registers, stack
    /// and timers are cleared and every key is released. The behaviour mode
    /// is kept.
    pub fn reset(&mut self) {
        self.memory.clear();
        self.load_font();
        self.display.set_all(false);
        self.pc = ROM_START_ADDRESS as u16;
        self.i = 0;
        self.v.clear();
        self.stack.clear();
        self.delay_timer.set(0);
        self.sound_timer.set(0);
        self.keypad = [KeyState::Up; KEY_COUNT];

        log::debug!("machine reset");
    }

    /// Reads a ROM file into memory at 0x200.
    ///
    /// Memory is left untouched if the file cannot be read.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), Chip8Error> {
        let path = path.as_ref();
        let rom = std::fs::read(path).map_err(|source| Chip8Error::RomRead {
            path: path.to_path_buf(),
            source,
        })?;

        log::debug!("loading {} byte ROM from {}", rom.len(), path.display());
        self.load_rom(&rom);
        Ok(())
    }

    /// Copies a ROM image into memory at 0x200 and points the program counter at it.
    ///
    /// Bytes beyond the end of memory are discarded. Returns the number of
    /// bytes loaded.
    pub fn load_rom(&mut self, rom: &[u8]) -> usize {
        let loaded = self.memory.load(ROM_START_ADDRESS, rom);
        if loaded < rom.len() {
            log::warn!(
                "ROM is {} bytes, only {loaded} fit in memory; the rest was discarded",
                rom.len()
            );
        }

        self.pc = ROM_START_ADDRESS as u16;
        loaded
    }

    /// Executes a single CPU cycle (fetch, decode, execute).
    pub fn step(&mut self) -> Chip8Result {
        self.clamp_registers();

        let address = self.pc;
        let instruction = self.fetch();
        let opcode = Opcode::decode(instruction);
        log::trace!("{address:03X}: {instruction}  {opcode}");

        self.execute(opcode)
    }

    /// Instruction at the program counter, without executing it.
    pub fn current_instruction(&self) -> Instruction {
        self.instruction_at(self.pc)
    }

    pub fn instruction_at(&self, address: u16) -> Instruction {
        let address = usize::from(address);
        Instruction::from_bytes(
            self.memory.read(address),
            self.memory.read(address + 1),
        )
    }

    pub fn behaviour(&self) -> Behaviour {
        self.behaviour
    }

    /// Switches the quirk set. Takes effect from the next instruction.
    pub fn set_behaviour(&mut self, behaviour: Behaviour) {
        self.behaviour = behaviour;
    }

    /// Returns true if the sound timer is greater than zero, indicating a beep should be played.
    pub fn should_beep(&self) -> bool {
        self.sound_timer.is_active()
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer.get()
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer.get()
    }

    /// Set the state of a key on the keypad.
    pub fn set_key_state(&mut self, key: u4, state: KeyState) {
        self.keypad[key] = state;
    }

    pub fn key_state(&self, key: u4) -> KeyState {
        self.keypad[key]
    }

    pub fn keypad(&self) -> &[KeyState; KEY_COUNT] {
        &self.keypad
    }

    /// Lets every `JustReleased` key settle to `Up`.
    ///
    /// Call once per input poll, before applying that poll's events.
    pub fn settle_keys(&mut self) {
        for state in self.keypad.iter_mut() {
            if *state == KeyState::JustReleased {
                *state = KeyState::Up;
            }
        }
    }

    /// Get the state of a pixel on the display (true = on, false = off).
    pub fn get_pixel(&self, x: usize, y: usize) -> bool {
        self.display.get_pixel(x, y)
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn index(&self) -> u16 {
        self.i
    }

    pub fn registers(&self) -> &[u8; 16] {
        self.v.as_array()
    }

    /// Return addresses from the bottom of the stack to the top.
    pub fn stack(&self) -> &[u16] {
        self.stack.as_slice()
    }

    pub fn read_memory(&self, address: usize) -> u8 {
        self.memory.read(address)
    }

    pub fn memory(&self) -> &[u8] {
        self.memory.as_slice()
    }

    /// Takes a deep copy of memory, display, PC, I, stack and registers.
    pub fn save_state(&self) -> SaveState {
        log::debug!("saving state at PC {:03X}", self.pc);

        SaveState {
            memory: self.memory.as_slice().to_vec(),
            display: self.display.clone(),
            pc: self.pc,
            i: self.i,
            stack: self.stack.as_slice().to_vec(),
            registers: *self.v.as_array(),
        }
    }

    /// Restores a snapshot taken with `save_state`. Timers and keys are untouched.
    pub fn load_save_state(&mut self, state: &SaveState) {
        log::debug!("restoring state at PC {:03X}", state.pc);

        if state.memory.len() < MIN_MEMORY_SIZE {
            log::warn!(
                "snapshot memory of {} bytes is too small, padding to {MIN_MEMORY_SIZE}",
                state.memory.len()
            );
        }
        self.memory = Memory::new(state.memory.len().max(MIN_MEMORY_SIZE));
        self.memory.load(0, &state.memory);

        if state.display.width() == 0 || state.display.height() == 0 {
            log::warn!(
                "snapshot display {}x{} is empty, clearing the current one instead",
                state.display.width(),
                state.display.height()
            );
            self.display.set_all(false);
        } else {
            self.display = state.display.clone();
        }
        self.pc = state.pc;
        self.i = state.i;
        self.stack.restore(&state.stack);
        self.v.restore(state.registers);
    }

    /// Fetches the next 16-bit instruction from memory and advances the program counter.
    fn fetch(&mut self) -> Instruction {
        let instruction = self.instruction_at(self.pc);
        self.pc = self.pc.wrapping_add(2);
        instruction
    }

    /// Pulls PC and I back inside memory before they are used.
    fn clamp_registers(&mut self) {
        self.pc = self.clamp_address("PC", self.pc);
        self.i = self.clamp_address("I", self.i);
    }

    fn clamp_address(&self, register: &'static str, address: u16) -> u16 {
        let last = self.memory.capacity().saturating_sub(2);
        if usize::from(address) <= last {
            return address;
        }

        let clamped = u16::try_from(last).unwrap_or(u16::MAX);
        log::warn!(
            "{}",
            Chip8Error::AddressClamped {
                register,
                address,
                clamped,
            }
        );
        clamped
    }

    fn load_font(&mut self) {
        self.memory.load(FONT_START_ADDRESS, &FONT);
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FONT_END_ADDRESS;

    #[test]
    fn test_power_on_state() {
        let chip8 = Chip8::new();

        assert_eq!(chip8.pc(), 0x200);
        assert_eq!(chip8.index(), 0);
        assert_eq!(chip8.registers(), &[0; 16]);
        assert!(chip8.stack().is_empty());
        assert_eq!(&chip8.memory()[FONT_START_ADDRESS..FONT_END_ADDRESS], &FONT);
        assert_eq!(chip8.behaviour(), Behaviour::Legacy);
        assert!(!chip8.should_beep());
        assert!(chip8.keypad().iter().all(|k| *k == KeyState::Up));
    }

    #[test]
    fn test_load_rom() {
        let mut chip8 = Chip8::new();
        assert_eq!(chip8.load_rom(&[0x12, 0x34, 0x56]), 3);

        assert_eq!(chip8.read_memory(0x200), 0x12);
        assert_eq!(chip8.read_memory(0x202), 0x56);
        assert_eq!(chip8.current_instruction().raw(), 0x1234);
    }

    #[test]
    fn test_load_rom_truncates() {
        let mut chip8 = Chip8::new();
        let rom = vec![0xAA; 4096];

        assert_eq!(chip8.load_rom(&rom), 4096 - 0x200);
        assert_eq!(chip8.read_memory(0xFFF), 0xAA);
        assert_eq!(chip8.read_memory(0x1FF), 0);
    }

    #[test]
    fn test_load_missing_file() {
        let mut chip8 = Chip8::new();
        let before = chip8.memory().to_vec();

        let result = chip8.load("/definitely/not/a/rom.ch8");
        assert!(matches!(result, Err(Chip8Error::RomRead { .. })));
        assert_eq!(chip8.memory(), before.as_slice());
    }

    #[test]
    fn test_reset() {
        let mut chip8 = Chip8::new();
        chip8.load_rom(&[0x60, 0x05, 0x22, 0x00]);
        chip8.step();
        chip8.step();
        chip8.set_key_state(u4::from_low(3), KeyState::Down);
        chip8.set_behaviour(Behaviour::Modern);
        chip8.reset();

        assert_eq!(chip8.pc(), 0x200);
        assert_eq!(chip8.registers(), &[0; 16]);
        assert!(chip8.stack().is_empty());
        assert_eq!(chip8.read_memory(0x200), 0);
        assert_eq!(chip8.read_memory(0), FONT[0]);
        assert_eq!(chip8.key_state(u4::from_low(3)), KeyState::Up);
        assert_eq!(chip8.behaviour(), Behaviour::Modern);
    }

    #[test]
    fn test_settle_keys() {
        let mut chip8 = Chip8::new();
        chip8.set_key_state(u4::from_low(1), KeyState::JustReleased);
        chip8.set_key_state(u4::from_low(2), KeyState::Down);
        chip8.settle_keys();

        assert_eq!(chip8.key_state(u4::from_low(1)), KeyState::Up);
        assert_eq!(chip8.key_state(u4::from_low(2)), KeyState::Down);
    }

    #[test]
    fn test_pc_clamped_before_fetch() {
        let mut chip8 = Chip8::new();
        chip8.pc = 0xFFFF;
        chip8.i = 0x2000;
        chip8.step();

        assert_eq!(chip8.index(), 0xFFE);
        // 0x0000 at 0xFFE is unknown, so the PC just moved past it.
        assert_eq!(chip8.pc(), 0x1000);
    }

    #[test]
    fn test_small_memory_config() {
        let chip8 = Chip8::with_config(Chip8Config {
            memory_size: 0,
            ..Chip8Config::default()
        });
        assert_eq!(chip8.memory().len(), MIN_MEMORY_SIZE);
    }

    #[test]
    fn test_restore_undersized_memory() {
        let mut chip8 = Chip8::new();
        let mut state = chip8.save_state();
        state.memory = vec![0x60];
        state.pc = 0;
        chip8.load_save_state(&state);

        assert_eq!(chip8.memory().len(), MIN_MEMORY_SIZE);
        assert_eq!(chip8.read_memory(0), 0x60);

        // 6000: V0 := 0
        chip8.step();
        assert_eq!(chip8.pc(), 2);
    }

    #[test]
    fn test_restore_empty_display() {
        let mut chip8 = Chip8::new();
        chip8.load_rom(&[0xD0, 0x11]);
        chip8.display.set_pixel(3, 3, true);

        let mut state = chip8.save_state();
        state.display = Display::new(0, 0);
        chip8.load_save_state(&state);

        assert_eq!(chip8.display().width(), 64);
        assert_eq!(chip8.display().height(), 32);
        assert!(!chip8.get_pixel(3, 3));

        // Font glyph 0 at I = 0 has its top row set
        assert_eq!(chip8.step(), Chip8Result::WaitForNextFrame);
        assert!(chip8.get_pixel(0, 0));
    }
}
