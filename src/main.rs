//! NES emulator entry point.
//!
//! Loads a cartridge and runs it in a window, or headless for a fixed number of frames.
//! Usage: emund [OPTIONS] <ROM>

use std::path::PathBuf;
use std::process::ExitCode;

use ansi_term::{
    Colour::{Green, Red, Yellow},
    Style,
};
use clap::{Parser, ValueEnum};
use emund::{
    cartridge::{Cartridge, LoadError},
    controller::Buttons,
    cpu::CpuError,
    machine::Machine,
    ppu::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH},
};
use log::{Level, LevelFilter, Metadata, Record};
use minifb::{Key, Scale, Window, WindowOptions};
use thiserror::Error;

/// nestest's automated mode starts here instead of at the reset vector.
const NESTEST_ENTRY: u16 = 0xC000;

/// Keyboard layout for joystick 1.
const KEYMAP: [(Key, Buttons); 8] = [
    (Key::Z, Buttons::A),
    (Key::X, Buttons::B),
    (Key::RightShift, Buttons::SELECT),
    (Key::Enter, Buttons::START),
    (Key::Up, Buttons::UP),
    (Key::Down, Buttons::DOWN),
    (Key::Left, Buttons::LEFT),
    (Key::Right, Buttons::RIGHT),
];

/// NES emulator
#[derive(Parser, Debug)]
#[command(name = "emund", version, about, long_about = None)]
struct Args {
    /// Path to the iNES ROM file
    rom: PathBuf,

    /// Run headless for this many frames and print a frame checksum
    #[arg(short, long)]
    frames: Option<u64>,

    /// Start at $C000 after reset (nestest automated mode)
    #[arg(long)]
    nestest: bool,

    /// Log every executed instruction
    #[arg(short, long)]
    trace: bool,

    /// Log filter: off, error, warn, info, debug, trace
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Window scale
    #[arg(short, long, value_enum, default_value = "2")]
    scale: WindowScale,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum WindowScale {
    #[value(name = "1")]
    X1,
    #[value(name = "2")]
    X2,
    #[value(name = "4")]
    X4,
    #[value(name = "8")]
    X8,
}

impl From<WindowScale> for Scale {
    fn from(scale: WindowScale) -> Self {
        match scale {
            WindowScale::X1 => Scale::X1,
            WindowScale::X2 => Scale::X2,
            WindowScale::X4 => Scale::X4,
            WindowScale::X8 => Scale::X8,
        }
    }
}

#[derive(Error, Debug)]
enum RunError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("emulation stopped: {0}")]
    Cpu(#[from] CpuError),
    #[error("window error: {0}")]
    Window(#[from] minifb::Error),
}

/// stderr logger with coloured level tags.
struct ColorLogger {
    level: LevelFilter,
}

impl ColorLogger {
    fn install(level: LevelFilter) -> Result<(), log::SetLoggerError> {
        log::set_boxed_logger(Box::new(ColorLogger { level }))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl log::Log for ColorLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => Red.bold().paint("ERROR"),
            Level::Warn => Yellow.paint("WARN "),
            Level::Info => Green.bold().paint("INFO "),
            Level::Debug => Style::new().dimmed().paint("DEBUG"),
            Level::Trace => Style::new().dimmed().paint("TRACE"),
        };
        eprintln!("{tag} {}", record.args());
    }

    fn flush(&self) {}
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.trace {
        LevelFilter::Trace
    } else {
        args.log_level
    };
    if let Err(err) = ColorLogger::install(level) {
        eprintln!("logger: {err}");
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), RunError> {
    let cart = Cartridge::load(&args.rom)?;
    let mut machine = Machine::new();
    machine.load(cart)?;
    if args.nestest {
        machine.cpu_mut().pc = NESTEST_ENTRY;
    }

    match args.frames {
        Some(frames) => run_headless(&mut machine, frames),
        None => run_window(&mut machine, args.scale),
    }
}

fn run_headless(machine: &mut Machine, frames: u64) -> Result<(), RunError> {
    for _ in 0..frames {
        machine.tick_frame()?;
    }
    println!(
        "{} frames, {} CPU cycles, frame checksum {:016X}",
        machine.frame_count(),
        machine.cpu().cycles,
        checksum(machine.frame_buffer())
    );
    Ok(())
}

fn run_window(machine: &mut Machine, scale: WindowScale) -> Result<(), RunError> {
    let mut window = Window::new(
        "emund",
        SCREEN_WIDTH,
        SCREEN_HEIGHT,
        WindowOptions {
            scale: scale.into(),
            ..WindowOptions::default()
        },
    )?;
    // NES runs at ~60.0988 Hz (NTSC).
    window.set_target_fps(60);

    while window.is_open() && !window.is_key_down(Key::Escape) {
        let buttons = KEYMAP
            .iter()
            .filter(|(key, _)| window.is_key_down(*key))
            .fold(Buttons::empty(), |held, &(_, button)| held | button);
        machine.set_buttons(0, buttons);

        machine.tick_frame()?;
        window.update_with_buffer(machine.frame_buffer(), SCREEN_WIDTH, SCREEN_HEIGHT)?;
    }
    Ok(())
}

/// FNV-1a over the framebuffer pixels.
fn checksum(pixels: &[u32]) -> u64 {
    pixels
        .iter()
        .flat_map(|p| p.to_le_bytes())
        .fold(0xCBF2_9CE4_8422_2325, |hash, byte| {
            (hash ^ byte as u64).wrapping_mul(0x0000_0100_0000_01B3)
        })
}
