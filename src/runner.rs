use std::collections::HashSet;

use crate::{Chip8, Chip8Result, KeyState, u4};

/// Default interpreter speed, in instructions per second.
pub const DEFAULT_IPS: f32 = 700.0;

/// Fastest supported speed. Keeps the time step large enough to drain the accumulator.
pub const MAX_IPS: f32 = 1_000_000.0;

/// High-level emulator runner that paces instruction execution.
///
/// Timers keep their own time, so only the CPU needs pacing here.
pub struct Chip8Runner {
    chip8: Chip8,
    time_step: f32,
    dt_accumulator: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chip8RunnerResult {
    HitBreakpoint,
    Ok,
}

impl Chip8Runner {
    pub fn new(chip8: Chip8) -> Self {
        Self::with_speed(chip8, DEFAULT_IPS)
    }

    /// Runner executing `instructions_per_second` instructions for every second of `dt`.
    pub fn with_speed(chip8: Chip8, instructions_per_second: f32) -> Self {
        let ips = if !instructions_per_second.is_finite() || instructions_per_second <= 0.0 {
            log::warn!("invalid speed {instructions_per_second} IPS, using {DEFAULT_IPS}");
            DEFAULT_IPS
        } else if instructions_per_second > MAX_IPS {
            log::warn!("speed {instructions_per_second} IPS is too fast, using {MAX_IPS}");
            MAX_IPS
        } else {
            instructions_per_second
        };

        Self {
            chip8,
            time_step: 1.0 / ips,
            dt_accumulator: 0.0,
        }
    }

    /// Update emulator by delta time.
    ///
    /// Runs as many CPU cycles as fit in the elapsed time `dt`.
    /// Returns early if a frame has to be rendered before the next CPU cycle.
    pub fn update(&mut self, dt: f32) -> Chip8RunnerResult {
        self.update_with_breakpoints(dt, None)
    }

    /// Like `update` but stops when the program counter lands on a breakpoint.
    pub fn update_with_breakpoints(
        &mut self,
        dt: f32,
        breakpoints: Option<&HashSet<u16>>,
    ) -> Chip8RunnerResult {
        self.dt_accumulator += dt;

        while self.dt_accumulator >= self.time_step {
            self.dt_accumulator -= self.time_step;

            let cpu_result = self.chip8.step();

            if let Some(breakpoints) = &breakpoints
                && breakpoints.contains(&self.chip8.pc())
            {
                self.dt_accumulator = 0.0;
                log::debug!("hit breakpoint at {:03X}", self.chip8.pc());
                return Chip8RunnerResult::HitBreakpoint;
            }

            match cpu_result {
                Chip8Result::WaitForNextFrame => {
                    // If we need to wait for the next frame we stop executing cycles.
                    // We clear the accumulator to avoid "catching up" in the next frame.
                    self.dt_accumulator = 0.0;
                    break;
                }
                Chip8Result::Continue => {}
            }
        }

        Chip8RunnerResult::Ok
    }

    /// Returns true if the sound timer is active, indicating a beep should be played.
    pub fn should_beep(&self) -> bool {
        self.chip8.should_beep()
    }

    /// Set the state of a key on the keypad.
    pub fn set_key_state(&mut self, key: u4, state: KeyState) {
        self.chip8.set_key_state(key, state)
    }

    /// Get the state of a pixel on the display (true = on, false = off).
    pub fn get_pixel(&self, x: usize, y: usize) -> bool {
        self.chip8.get_pixel(x, y)
    }

    pub fn chip8_ref(&self) -> &Chip8 {
        &self.chip8
    }

    pub fn chip8_mut(&mut self) -> &mut Chip8 {
        &mut self.chip8
    }

    pub fn into_inner(self) -> Chip8 {
        self.chip8
    }
}
