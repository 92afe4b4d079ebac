use std::{
    collections::HashSet,
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use clap_num::maybe_hex;
use log::LevelFilter;
use simple_logger::SimpleLogger;

use chip8_vm::{
    Behaviour, Chip8, Chip8Config, Chip8Runner, Chip8RunnerResult, DEFAULT_IPS,
    ROM_START_ADDRESS, disasm,
};

const FRAME_TIME: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// Headless CHIP-8 interpreter.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Increase log output (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a ROM and print the final screen and registers
    Run {
        /// Path to the CHIP-8 ROM file
        rom_path: PathBuf,

        /// Quirk set to interpret the ROM with
        #[arg(short, long, value_enum, default_value_t = Mode::Legacy)]
        mode: Mode,

        /// Execute exactly this many instructions, as fast as possible
        #[arg(short, long, conflicts_with_all = ["frames", "ips"])]
        steps: Option<u64>,

        /// Number of 60Hz frames to run in real time
        #[arg(short, long, default_value_t = 120)]
        frames: u32,

        /// Instructions per second while running frames
        #[arg(long, default_value_t = DEFAULT_IPS)]
        ips: f32,

        /// Stop when the program counter reaches this address
        #[arg(short, long, value_parser = maybe_hex::<u16>)]
        break_at: Vec<u16>,
    },

    /// Print a disassembly listing of a ROM
    Disasm {
        /// Path to the CHIP-8 ROM file
        rom_path: PathBuf,

        /// Address the first byte is listed at
        #[arg(short, long, default_value_t = ROM_START_ADDRESS as u16, value_parser = maybe_hex::<u16>)]
        origin: u16,

        /// Quirk set used to name BNNN operands
        #[arg(short, long, value_enum, default_value_t = Mode::Legacy)]
        mode: Mode,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Original CHIP-8 behaviour
    Legacy,
    /// SUPER-CHIP behaviour
    Modern,
}

impl From<Mode> for Behaviour {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Legacy => Behaviour::Legacy,
            Mode::Modern => Behaviour::Modern,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    SimpleLogger::new()
        .with_level(level)
        .env()
        .init()
        .context("Failed to initialize logger")?;

    match args.command {
        Command::Run {
            rom_path,
            mode,
            steps,
            frames,
            ips,
            break_at,
        } => {
            let mut chip8 = Chip8::with_config(Chip8Config::with_behaviour(mode.into()));
            chip8
                .load(&rom_path)
                .context("Failed to load ROM into CHIP-8 memory")?;
            log::info!("running {} in {mode:?} mode", rom_path.display());

            let breakpoints: HashSet<u16> = break_at.into_iter().collect();
            let chip8 = match steps {
                Some(steps) => run_steps(chip8, steps, &breakpoints),
                None => run_frames(Chip8Runner::with_speed(chip8, ips), frames, &breakpoints),
            };

            print_screen(&chip8);
            print_registers(&chip8);
        }
        Command::Disasm {
            rom_path,
            origin,
            mode,
        } => {
            let rom = std::fs::read(&rom_path).context("Failed to read ROM file")?;
            for line in disasm::disassemble(&rom, origin, mode.into()) {
                println!("{line}");
            }
        }
    }

    Ok(())
}

fn run_steps(mut chip8: Chip8, steps: u64, breakpoints: &HashSet<u16>) -> Chip8 {
    for _ in 0..steps {
        chip8.step();
        if breakpoints.contains(&chip8.pc()) {
            log::info!("hit breakpoint at {:03X}", chip8.pc());
            break;
        }
    }
    chip8
}

fn run_frames(mut runner: Chip8Runner, frames: u32, breakpoints: &HashSet<u16>) -> Chip8 {
    let mut last_frame_instant = Instant::now();

    for _ in 0..frames {
        let now = Instant::now();
        let dt = (now - last_frame_instant).as_secs_f32();
        last_frame_instant = now;

        if runner.update_with_breakpoints(dt, Some(breakpoints)) == Chip8RunnerResult::HitBreakpoint
        {
            log::info!("hit breakpoint at {:03X}", runner.chip8_ref().pc());
            break;
        }

        if runner.should_beep() {
            log::debug!("beep");
        }

        thread::sleep(FRAME_TIME.saturating_sub(now.elapsed()));
    }

    runner.into_inner()
}

fn print_screen(chip8: &Chip8) {
    let width = chip8.display().width();
    let border = "-".repeat(width);

    println!("+{border}+");
    for row in chip8.display().rows() {
        let line: String = row.iter().map(|lit| if *lit { '█' } else { ' ' }).collect();
        println!("|{line}|");
    }
    println!("+{border}+");
}

fn print_registers(chip8: &Chip8) {
    println!(
        "PC: {:03X}  I: {:03X}  DT: {:02X}  ST: {:02X}",
        chip8.pc(),
        chip8.index(),
        chip8.delay_timer(),
        chip8.sound_timer()
    );

    let v = chip8.registers();
    for idx in 0..8usize {
        println!(
            "V{:X}: {:02X}   V{:X}: {:02X}",
            idx,
            v[idx],
            idx + 8,
            v[idx + 8]
        );
    }

    let stack: Vec<String> = chip8.stack().iter().map(|a| format!("{a:03X}")).collect();
    println!("Stack: [{}]", stack.join(", "));
}
