//! Runs nestest.nes in automated mode and compares every instruction with nestest.log.
//!
//! Both files go in `tests/roms/`; they are not distributed with the crate, so the test is ignored
//! by default. Run it with `cargo test --test nestest -- --ignored` once they are in place.

use std::fs;
use std::path::PathBuf;

use emund::{cartridge::Cartridge, machine::Machine};

struct LogEntry {
    /// "C000  4C F5 C5  " including the unofficial marker column.
    prefix: String,
    pc: u16,
    a: u8,
    x: u8,
    y: u8,
    p: u8,
    sp: u8,
    cycles: u64,
}

// Format: C000  4C F5 C5  JMP $C5F5                       A:00 X:00 Y:00 P:24 SP:FD PPU:  0, 21 CYC:7
fn parse_log_line(line: &str) -> Option<LogEntry> {
    let registers = line.get(line.find("A:")?..)?;
    let cycles = registers.get(registers.find("CYC:")? + 4..)?.trim();

    Some(LogEntry {
        prefix: line.get(..16)?.to_string(),
        pc: u16::from_str_radix(line.get(0..4)?, 16).ok()?,
        a: parse_hex(registers, "A:")?,
        x: parse_hex(registers, "X:")?,
        y: parse_hex(registers, "Y:")?,
        p: parse_hex(registers, "P:")?,
        sp: parse_hex(registers, "SP:")?,
        cycles: cycles.parse().ok()?,
    })
}

fn parse_hex(s: &str, prefix: &str) -> Option<u8> {
    let start = s.find(prefix)? + prefix.len();
    u8::from_str_radix(s.get(start..start + 2)?, 16).ok()
}

fn rom_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/roms")
        .join(name)
}

#[test]
#[ignore = "needs tests/roms/nestest.nes and tests/roms/nestest.log"]
fn nestest_matches_reference_log() {
    let (rom, log) = (rom_path("nestest.nes"), rom_path("nestest.log"));
    let log = fs::read_to_string(&log)
        .unwrap_or_else(|err| panic!("{}: {err}", log.display()));
    let entries: Vec<LogEntry> = log
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| parse_log_line(line).unwrap_or_else(|| panic!("bad log line: {line}")))
        .collect();

    let mut machine = Machine::new();
    machine.load(Cartridge::load(&rom).unwrap()).unwrap();
    machine.cpu_mut().pc = 0xC000;

    for (n, expected) in entries.iter().enumerate() {
        let trace = machine.trace_line();
        let cpu = machine.cpu();
        let actual = (cpu.pc, cpu.a, cpu.x, cpu.y, cpu.status.bits(), cpu.sp, cpu.cycles);
        let wanted = (
            expected.pc,
            expected.a,
            expected.x,
            expected.y,
            expected.p,
            expected.sp,
            expected.cycles,
        );
        assert_eq!(actual, wanted, "line {}: got\n{trace}", n + 1);
        assert_eq!(&trace[..16], expected.prefix, "line {}", n + 1);

        machine.step_instruction().unwrap();
    }

    // nestest leaves its result codes in $02/$03; zero means every test passed.
    assert_eq!((machine.peek(0x0002), machine.peek(0x0003)), (0, 0));
}
