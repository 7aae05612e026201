use crate::{
    bus::Bus,
    cpu::{
        cpu::{Cpu, CpuError, RESET_CYCLES},
        flags::Status,
    },
};

struct TestBus {
    mem: [u8; 65536],
}

impl TestBus {
    fn new() -> Self {
        Self { mem: [0; 65536] }
    }
}

impl Bus for TestBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.mem[addr as usize] = data;
    }

    fn peek(&self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }
}

/// Load `program` at $8000, point the reset vector at it and reset.
fn boot(program: &[u8]) -> (Cpu, TestBus) {
    let mut bus = TestBus::new();
    bus.mem[0x8000..0x8000 + program.len()].copy_from_slice(program);
    bus.mem[0xFFFC] = 0x00;
    bus.mem[0xFFFD] = 0x80;

    let mut cpu = Cpu::new();
    cpu.raise_reset(&mut bus);
    (cpu, bus)
}

#[test]
fn reset_loads_vector_and_power_on_state() {
    let (cpu, _) = boot(&[]);

    assert_eq!(cpu.pc, 0x8000);
    assert_eq!(cpu.sp, 0xFD);
    assert_eq!(cpu.status.bits(), 0x24);
    assert_eq!(cpu.cycles, RESET_CYCLES);
}

#[test]
fn lda_immediate_loads_value() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0x42]); // LDA #$42

    assert_eq!(cpu.step(&mut bus), 2);
    assert_eq!(cpu.a, 0x42);
}

#[test]
fn lda_sets_zero_flag() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0x00]); // LDA #$00
    cpu.status.insert(Status::NEGATIVE);

    cpu.step(&mut bus);

    assert!(cpu.status.contains(Status::ZERO));
    assert!(!cpu.status.contains(Status::NEGATIVE));
}

#[test]
fn lda_sets_negative_flag() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0x80]); // LDA #$80

    cpu.step(&mut bus);

    assert!(cpu.status.contains(Status::NEGATIVE));
    assert!(!cpu.status.contains(Status::ZERO));
}

#[test]
fn sec_then_clc_clears_carry() {
    let (mut cpu, mut bus) = boot(&[0x38, 0x18]); // SEC; CLC

    cpu.step(&mut bus);
    assert!(cpu.status.contains(Status::CARRY));
    cpu.step(&mut bus);
    assert!(!cpu.status.contains(Status::CARRY));
}

#[test]
fn tax_transfers_a_to_x() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0x10, 0xAA]); // LDA #$10; TAX

    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.x, 0x10);
}

#[test]
fn sta_writes_to_memory() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0x33, 0x8D, 0x00, 0x02]); // LDA #$33; STA $0200

    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 4);

    assert_eq!(bus.mem[0x0200], 0x33);
}

#[test]
fn adc_signed_overflow_into_negative() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0x50, 0x69, 0x50]); // LDA #$50; ADC #$50

    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.a, 0xA0);
    assert!(!cpu.status.contains(Status::CARRY));
    assert!(cpu.status.contains(Status::OVERFLOW));
    assert!(!cpu.status.contains(Status::ZERO));
    assert!(cpu.status.contains(Status::NEGATIVE));
}

#[test]
fn adc_carry_out_without_overflow() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0xFF, 0x38, 0x69, 0x01]); // LDA #$FF; SEC; ADC #$01

    for _ in 0..3 {
        cpu.step(&mut bus);
    }

    assert_eq!(cpu.a, 0x01);
    assert!(cpu.status.contains(Status::CARRY));
    assert!(!cpu.status.contains(Status::OVERFLOW));
}

#[test]
fn sbc_borrows_and_overflows() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0x50, 0x38, 0xE9, 0xB0]); // LDA #$50; SEC; SBC #$B0

    for _ in 0..3 {
        cpu.step(&mut bus);
    }

    assert_eq!(cpu.a, 0xA0);
    assert!(!cpu.status.contains(Status::CARRY));
    assert!(cpu.status.contains(Status::OVERFLOW));
}

#[test]
fn decimal_flag_does_not_change_adc() {
    let (mut cpu, mut bus) = boot(&[0xF8, 0xA9, 0x09, 0x69, 0x01]); // SED; LDA #$09; ADC #$01

    for _ in 0..3 {
        cpu.step(&mut bus);
    }

    assert_eq!(cpu.a, 0x0A);
}

#[test]
fn cmp_sets_carry_zero_negative() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0x40, 0xC9, 0x40, 0xC9, 0x41]); // LDA #$40; CMP #$40; CMP #$41

    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert!(cpu.status.contains(Status::CARRY | Status::ZERO));

    cpu.step(&mut bus);
    assert!(!cpu.status.contains(Status::CARRY));
    assert!(!cpu.status.contains(Status::ZERO));
    assert!(cpu.status.contains(Status::NEGATIVE));
}

#[test]
fn bit_copies_high_bits_of_operand() {
    let (mut cpu, mut bus) = boot(&[0xA9, 0x01, 0x24, 0x10]); // LDA #$01; BIT $10
    bus.mem[0x0010] = 0xC0;

    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert!(cpu.status.contains(Status::ZERO));
    assert!(cpu.status.contains(Status::OVERFLOW));
    assert!(cpu.status.contains(Status::NEGATIVE));
}

#[test]
fn rotate_through_carry() {
    // SEC; LDA #$80; ROL A; ROR A
    let (mut cpu, mut bus) = boot(&[0x38, 0xA9, 0x80, 0x2A, 0x6A]);

    cpu.step(&mut bus);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x01);
    assert!(cpu.status.contains(Status::CARRY));

    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x80);
    assert!(cpu.status.contains(Status::CARRY));
}

#[test]
fn inc_memory_sets_flags() {
    let (mut cpu, mut bus) = boot(&[0xEE, 0x00, 0x03]); // INC $0300
    bus.mem[0x0300] = 0xFF;

    assert_eq!(cpu.step(&mut bus), 6);

    assert_eq!(bus.mem[0x0300], 0x00);
    assert!(cpu.status.contains(Status::ZERO));
}

#[test]
fn dex_sets_zero_flag() {
    let (mut cpu, mut bus) = boot(&[0xA2, 0x01, 0xCA]); // LDX #$01; DEX

    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert!(cpu.status.contains(Status::ZERO));
}

#[test]
fn bne_loops_until_zero() {
    // LDX #$03; loop: DEX; BNE loop
    let (mut cpu, mut bus) = boot(&[0xA2, 0x03, 0xCA, 0xD0, 0xFD]);

    cpu.step(&mut bus);
    for _ in 0..3 {
        cpu.step(&mut bus); // DEX
        cpu.step(&mut bus); // BNE
    }

    assert_eq!(cpu.x, 0);
    assert_eq!(cpu.pc, 0x8005);
}

#[test]
fn branch_not_taken_costs_base_cycles() {
    let (mut cpu, mut bus) = boot(&[0xF0, 0x10]); // BEQ +16, Z clear

    assert_eq!(cpu.step(&mut bus), 2);
    assert_eq!(cpu.pc, 0x8002);
}

#[test]
fn branch_taken_same_page_costs_one_more() {
    let (mut cpu, mut bus) = boot(&[0xD0, 0x10]); // BNE +16

    assert_eq!(cpu.step(&mut bus), 3);
    assert_eq!(cpu.pc, 0x8012);
}

#[test]
fn branch_taken_across_page_costs_two_more() {
    let (mut cpu, mut bus) = boot(&[0xD0, 0x80]); // BNE -128

    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.pc, 0x7F82);
}

#[test]
fn absolute_x_page_cross_costs_extra_cycle() {
    // LDX #$01; LDA $80FF,X; LDA $8000,X
    let (mut cpu, mut bus) = boot(&[0xA2, 0x01, 0xBD, 0xFF, 0x80, 0xBD, 0x00, 0x80]);

    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 5);
    assert_eq!(cpu.step(&mut bus), 4);
}

#[test]
fn store_absolute_x_never_pays_penalty() {
    // LDX #$01; STA $02FF,X
    let (mut cpu, mut bus) = boot(&[0xA2, 0x01, 0x9D, 0xFF, 0x02]);

    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 5);
    assert_eq!(bus.mem[0x0300], 0x00);
}

#[test]
fn indirect_y_crosses_page() {
    // LDY #$10; LDA ($20),Y with ($20) = $02F8
    let (mut cpu, mut bus) = boot(&[0xA0, 0x10, 0xB1, 0x20]);
    bus.mem[0x0020] = 0xF8;
    bus.mem[0x0021] = 0x02;
    bus.mem[0x0308] = 0x77;

    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 6);
    assert_eq!(cpu.a, 0x77);
}

#[test]
fn indirect_x_wraps_in_zero_page() {
    // LDX #$01; LDA ($FE,X) reads pointer from $FF and $00
    let (mut cpu, mut bus) = boot(&[0xA2, 0x01, 0xA1, 0xFE]);
    bus.mem[0x00FF] = 0x34;
    bus.mem[0x0000] = 0x12;
    bus.mem[0x1234] = 0x99;

    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.a, 0x99);
}

#[test]
fn jmp_indirect_wraps_within_page() {
    let (mut cpu, mut bus) = boot(&[0x6C, 0xFF, 0x02]); // JMP ($02FF)
    bus.mem[0x02FF] = 0x00;
    bus.mem[0x0200] = 0x90;
    bus.mem[0x0300] = 0xA0;

    cpu.step(&mut bus);

    assert_eq!(cpu.pc, 0x9000);
}

#[test]
fn jsr_and_rts_work() {
    let (mut cpu, mut bus) = boot(&[0x20, 0x00, 0x90, 0xEA]); // JSR $9000; NOP
    bus.mem[0x9000] = 0x60; // RTS

    assert_eq!(cpu.step(&mut bus), 6);
    assert_eq!(cpu.pc, 0x9000);
    assert_eq!(bus.mem[0x01FD], 0x80);
    assert_eq!(bus.mem[0x01FC], 0x02);

    assert_eq!(cpu.step(&mut bus), 6);
    assert_eq!(cpu.pc, 0x8003);
    assert_eq!(cpu.sp, 0xFD);
}

#[test]
fn stack_pointer_wraps() {
    let (mut cpu, mut bus) = boot(&[0xA2, 0x00, 0x9A, 0xA9, 0x5A, 0x48]); // LDX #0; TXS; LDA #$5A; PHA

    for _ in 0..4 {
        cpu.step(&mut bus);
    }

    assert_eq!(bus.mem[0x0100], 0x5A);
    assert_eq!(cpu.sp, 0xFF);
}

#[test]
fn php_pushes_break_bits_and_plp_masks_them() {
    let (mut cpu, mut bus) = boot(&[0x08, 0x68, 0xA9, 0xDF, 0x48, 0x28]); // PHP; PLA; LDA #$DF; PHA; PLP

    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x34);

    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.status.bits(), 0xEF);
}

#[test]
fn unofficial_lax_and_sax() {
    // LAX $10; LDA #$F0; SAX $11
    let (mut cpu, mut bus) = boot(&[0xA7, 0x10, 0xA9, 0xF0, 0x87, 0x11]);
    bus.mem[0x0010] = 0x3C;

    cpu.step(&mut bus);
    assert_eq!((cpu.a, cpu.x), (0x3C, 0x3C));

    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(bus.mem[0x0011], 0x30);
}

#[test]
fn unofficial_dcp_and_isb() {
    // LDA #$05; DCP $10; ISB $11
    let (mut cpu, mut bus) = boot(&[0xA9, 0x05, 0xC7, 0x10, 0xE7, 0x11]);
    bus.mem[0x0010] = 0x06;
    bus.mem[0x0011] = 0x01;

    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 5);
    assert_eq!(bus.mem[0x0010], 0x05);
    assert!(cpu.status.contains(Status::ZERO | Status::CARRY));

    cpu.step(&mut bus);
    assert_eq!(bus.mem[0x0011], 0x02);
    assert_eq!(cpu.a, 0x03);
}

#[test]
fn unofficial_nop_absolute_x_reads_and_pays_penalty() {
    // LDX #$FF; NOP $8001,X
    let (mut cpu, mut bus) = boot(&[0xA2, 0xFF, 0x1C, 0x01, 0x80]);

    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 5);
    assert_eq!(cpu.pc, 0x8005);
}

#[test]
fn unknown_opcode_latches_error() {
    let (mut cpu, mut bus) = boot(&[0xEA, 0x02, 0xEA]); // NOP; JAM; NOP

    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 0);
    assert_eq!(
        cpu.error(),
        Some(CpuError::UnknownInstruction {
            opcode: 0x02,
            pc: 0x8001
        })
    );

    let cycles = cpu.cycles;
    assert_eq!(cpu.step(&mut bus), 0);
    assert_eq!(cpu.cycles, cycles);
    assert!(cpu.has_error());
}

#[test]
fn brk_is_a_distinct_halt() {
    let (mut cpu, mut bus) = boot(&[0x00]);

    cpu.step(&mut bus);

    assert_eq!(cpu.error(), Some(CpuError::Break { pc: 0x8000 }));
    assert_eq!(cpu.error().map(|e| e.opcode()), Some(0x00));
}

#[test]
fn irq_is_masked_by_interrupt_disable() {
    let (mut cpu, mut bus) = boot(&[]);
    bus.mem[0xFFFE] = 0x00;
    bus.mem[0xFFFF] = 0x90;

    assert!(!cpu.raise_irq(&mut bus));
    assert_eq!(cpu.pc, 0x8000);

    cpu.status.remove(Status::INTERRUPT_DISABLE);
    let cycles = cpu.cycles;
    assert!(cpu.raise_irq(&mut bus));
    assert_eq!(cpu.pc, 0x9000);
    assert_eq!(cpu.cycles - cycles, 7);
    assert!(cpu.status.contains(Status::INTERRUPT_DISABLE));
}

#[test]
fn nmi_pushes_pc_and_status_then_rti_returns() {
    let (mut cpu, mut bus) = boot(&[0xEA]);
    bus.mem[0xFFFA] = 0x00;
    bus.mem[0xFFFB] = 0x90;
    bus.mem[0x9000] = 0x40; // RTI

    cpu.raise_nmi(&mut bus);
    assert_eq!(cpu.pc, 0x9000);
    assert_eq!(bus.mem[0x01FD], 0x80);
    assert_eq!(bus.mem[0x01FC], 0x00);
    assert_eq!(bus.mem[0x01FB], 0x34);

    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x8000);
    assert_eq!(cpu.status.bits(), 0x24);
}

#[test]
fn copy_oam_costs_513_or_514_cycles() {
    let (mut cpu, mut bus) = boot(&[]);
    for i in 0..256 {
        bus.mem[0x0200 + i] = i as u8;
    }
    let mut oam = [0u8; 256];

    cpu.cycles = 10;
    cpu.copy_oam(&mut bus, 0x02, &mut oam);
    assert_eq!(cpu.cycles, 523);
    assert_eq!(oam[0x7F], 0x7F);

    cpu.copy_oam(&mut bus, 0x02, &mut oam);
    assert_eq!(cpu.cycles, 523 + 514);
}

#[test]
fn trace_line_matches_nestest_layout() {
    let mut bus = TestBus::new();
    bus.mem[0xC000..0xC003].copy_from_slice(&[0x4C, 0xF5, 0xC5]);
    let mut cpu = Cpu::new();
    cpu.pc = 0xC000;
    cpu.cycles = 7;

    assert_eq!(
        cpu.trace_line(&bus),
        "C000  4C F5 C5  JMP $C5F5                       A:00 X:00 Y:00 P:24 SP:FD CYC:7"
    );

    bus.mem[0xC000..0xC002].copy_from_slice(&[0x04, 0xA9]);
    assert!(cpu.trace_line(&bus).starts_with("C000  04 A9    *NOP $A9"));
}

/// Every unofficial opcode nestest runs: base cycle count and the trace text it logs.
#[test]
fn unofficial_opcodes_match_nestest_timing_and_trace() {
    let mut rows: Vec<(Vec<u8>, u64, String)> = vec![
        (vec![0xA7, 0x10], 3, "*LAX $10".into()),
        (vec![0xB7, 0x10], 4, "*LAX $10,Y".into()),
        (vec![0xAF, 0x00, 0x03], 4, "*LAX $0300".into()),
        (vec![0xBF, 0x00, 0x03], 4, "*LAX $0300,Y".into()),
        (vec![0xA3, 0x10], 6, "*LAX ($10,X)".into()),
        (vec![0xB3, 0x10], 5, "*LAX ($10),Y".into()),
        (vec![0x87, 0x10], 3, "*SAX $10".into()),
        (vec![0x97, 0x10], 4, "*SAX $10,Y".into()),
        (vec![0x8F, 0x00, 0x03], 4, "*SAX $0300".into()),
        (vec![0x83, 0x10], 6, "*SAX ($10,X)".into()),
        (vec![0xEB, 0x10], 2, "*SBC #$10".into()),
        (vec![0x1A], 2, "*NOP".into()),
        (vec![0x80, 0x10], 2, "*NOP #$10".into()),
        (vec![0x04, 0x10], 3, "*NOP $10".into()),
        (vec![0x14, 0x10], 4, "*NOP $10,X".into()),
        (vec![0x0C, 0x00, 0x03], 4, "*NOP $0300".into()),
        (vec![0x1C, 0x00, 0x03], 4, "*NOP $0300,X".into()),
    ];
    for (column, name) in [
        (0x00u8, "SLO"),
        (0x20, "RLA"),
        (0x40, "SRE"),
        (0x60, "RRA"),
        (0xC0, "DCP"),
        (0xE0, "ISB"),
    ] {
        rows.extend([
            (vec![column | 0x07, 0x10], 5, format!("*{name} $10")),
            (vec![column | 0x17, 0x10], 6, format!("*{name} $10,X")),
            (vec![column | 0x0F, 0x00, 0x03], 6, format!("*{name} $0300")),
            (vec![column | 0x1F, 0x00, 0x03], 7, format!("*{name} $0300,X")),
            (vec![column | 0x1B, 0x00, 0x03], 7, format!("*{name} $0300,Y")),
            (vec![column | 0x03, 0x10], 8, format!("*{name} ($10,X)")),
            (vec![column | 0x13, 0x10], 8, format!("*{name} ($10),Y")),
        ]);
    }

    for (program, cycles, text) in rows {
        let (mut cpu, mut bus) = boot(&program);
        bus.mem[0x0010] = 0x00;
        bus.mem[0x0011] = 0x03;

        let hex: String = program.iter().map(|b| format!("{b:02X} ")).collect();
        let trace = cpu.trace_line(&bus);
        assert!(trace.starts_with(&format!("8000  {hex:<9}{text}")), "{trace}");
        assert_eq!(cpu.step(&mut bus), cycles, "{text}");
        assert!(!cpu.has_error(), "{text}");
        assert_eq!(cpu.pc, 0x8000 + program.len() as u16, "{text}");
    }
}

#[test]
fn unofficial_reads_pay_page_cross_and_read_modify_writes_do_not() {
    let rows: [(&[u8], u8, u8, u64); 6] = [
        (&[0xBF, 0xFF, 0x02], 0, 1, 5), // LAX $02FF,Y
        (&[0xB3, 0x20], 0, 1, 6),       // LAX ($20),Y
        (&[0x1C, 0xFF, 0x02], 1, 0, 5), // NOP $02FF,X
        (&[0xDF, 0xFF, 0x02], 1, 0, 7), // DCP $02FF,X
        (&[0xFB, 0xFF, 0x02], 0, 1, 7), // ISB $02FF,Y
        (&[0x13, 0x20], 0, 1, 8),       // SLO ($20),Y
    ];
    for (program, x, y, cycles) in rows {
        let (mut cpu, mut bus) = boot(program);
        bus.mem[0x0020] = 0xFF;
        bus.mem[0x0021] = 0x02;
        cpu.x = x;
        cpu.y = y;
        assert_eq!(cpu.step(&mut bus), cycles, "opcode {:02X}", program[0]);
    }
}
