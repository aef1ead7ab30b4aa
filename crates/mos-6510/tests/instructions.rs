//! Unit tests for 6510 instruction behavior and cycle counts.

use breadbin_core::{Bus, Cpu, SimpleBus};
use mos_6510::{flags, Mos6510};

/// Run one complete instruction and return the cycles it consumed.
fn run_instruction(cpu: &mut Mos6510, bus: &mut SimpleBus) -> u32 {
    cpu.tick(bus);
    let mut cycles = 1;
    for _ in 0..20 {
        if cpu.is_instruction_complete() {
            return cycles;
        }
        cpu.tick(bus);
        cycles += 1;
    }
    panic!("Instruction did not complete within 20 cycles");
}

/// Load a program at $0200 and point PC there.
fn setup_program(bus: &mut SimpleBus, cpu: &mut Mos6510, program: &[u8]) {
    bus.load(0x0200, program);
    cpu.regs.pc = 0x0200;
}

#[test]
fn documented_cycle_counts_per_addressing_mode() {
    // (program, x, y, expected cycles, description)
    let cases: &[(&[u8], u8, u8, u32, &str)] = &[
        (&[0xA9, 0x01], 0, 0, 2, "LDA imm"),
        (&[0xA5, 0x10], 0, 0, 3, "LDA zp"),
        (&[0xB5, 0x10], 5, 0, 4, "LDA zp,X"),
        (&[0xAD, 0x00, 0x30], 0, 0, 4, "LDA abs"),
        (&[0xBD, 0x00, 0x30], 5, 0, 4, "LDA abs,X same page"),
        (&[0xBD, 0xFF, 0x30], 5, 0, 5, "LDA abs,X page cross"),
        (&[0xB9, 0xFF, 0x30], 0, 5, 5, "LDA abs,Y page cross"),
        (&[0xA1, 0x10], 5, 0, 6, "LDA (zp,X)"),
        (&[0xB1, 0x10], 0, 5, 5, "LDA (zp),Y same page"),
        (&[0x85, 0x10], 0, 0, 3, "STA zp"),
        (&[0x8D, 0x00, 0x30], 0, 0, 4, "STA abs"),
        (&[0x9D, 0x00, 0x30], 5, 0, 5, "STA abs,X never short"),
        (&[0x99, 0x00, 0x30], 0, 5, 5, "STA abs,Y never short"),
        (&[0x91, 0x10], 0, 5, 6, "STA (zp),Y never short"),
        (&[0x06, 0x10], 0, 0, 5, "ASL zp"),
        (&[0x16, 0x10], 5, 0, 6, "ASL zp,X"),
        (&[0xEE, 0x00, 0x30], 0, 0, 6, "INC abs"),
        (&[0xDE, 0x00, 0x30], 5, 0, 7, "DEC abs,X"),
        (&[0xEA], 0, 0, 2, "NOP"),
        (&[0x4C, 0x00, 0x03], 0, 0, 3, "JMP abs"),
        (&[0x6C, 0x00, 0x03], 0, 0, 5, "JMP (ind)"),
        (&[0x48], 0, 0, 3, "PHA"),
        (&[0x68], 0, 0, 4, "PLA"),
    ];

    for &(program, x, y, expected, what) in cases {
        let mut bus = SimpleBus::new();
        let mut cpu = Mos6510::new();
        setup_program(&mut bus, &mut cpu, program);
        cpu.regs.x = x;
        cpu.regs.y = y;
        cpu.regs.s = 0xFF;
        let cycles = run_instruction(&mut cpu, &mut bus);
        assert_eq!(cycles, expected, "{what}");
    }
}

#[test]
fn branch_cycle_counts() {
    // Not taken: 2 cycles
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    setup_program(&mut bus, &mut cpu, &[0xD0, 0x10]); // BNE +16
    cpu.regs.p.set(flags::Z); // Not taken
    assert_eq!(run_instruction(&mut cpu, &mut bus), 2);

    // Taken, same page: 3 cycles
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    setup_program(&mut bus, &mut cpu, &[0xD0, 0x10]);
    cpu.regs.p.clear(flags::Z);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 3);
    assert_eq!(cpu.regs.pc, 0x0212);

    // Taken across a page: 4 cycles
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    bus.load(0x02F0, &[0xD0, 0x20]); // BNE +32 → $0312
    cpu.regs.pc = 0x02F0;
    cpu.regs.p.clear(flags::Z);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.regs.pc, 0x0312);
}

#[test]
fn jsr_rts_roundtrip() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    cpu.regs.s = 0xFF;

    bus.load(0x0200, &[0x20, 0x00, 0x03]); // JSR $0300
    bus.load(0x0300, &[0x60]); // RTS
    cpu.regs.pc = 0x0200;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 6, "JSR");
    assert_eq!(cpu.regs.pc, 0x0300);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 6, "RTS");
    assert_eq!(cpu.regs.pc, 0x0203);
    assert_eq!(cpu.regs.s, 0xFF);
}

#[test]
fn brk_takes_seven_cycles_and_pushes_break_set() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    cpu.regs.s = 0xFF;
    cpu.regs.p.clear(flags::I);

    bus.write(0xFFFE, 0x00);
    bus.write(0xFFFF, 0x03);
    bus.load(0x0200, &[0x00, 0xEA]); // BRK + padding
    cpu.regs.pc = 0x0200;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 7);
    assert_eq!(cpu.pc(), 0x0300);
    assert!(cpu.regs.p.is_set(flags::I));

    // Pushed: PCH, PCL (= $0202, past the padding byte), P with B set
    assert_eq!(bus.peek(0x01FF), 0x02);
    assert_eq!(bus.peek(0x01FE), 0x02);
    assert_ne!(bus.peek(0x01FD) & flags::B, 0);
}

#[test]
fn rti_restores_status_and_pc() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();

    // Hand-build an interrupt frame: PC=$0456, P=carry set
    cpu.regs.s = 0xFC;
    bus.write(0x01FF, 0x04); // PCH
    bus.write(0x01FE, 0x56); // PCL
    bus.write(0x01FD, flags::C | flags::U);
    bus.load(0x0200, &[0x40]); // RTI
    cpu.regs.pc = 0x0200;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 6);
    assert_eq!(cpu.regs.pc, 0x0456);
    assert!(cpu.regs.p.is_set(flags::C));
    assert_eq!(cpu.regs.s, 0xFF);
}

#[test]
fn adc_binary_overflow_and_carry() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    setup_program(&mut bus, &mut cpu, &[0x69, 0x50]); // ADC #$50
    cpu.regs.a = 0x50;

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.a, 0xA0);
    assert!(cpu.regs.p.is_set(flags::V), "positive overflow");
    assert!(!cpu.regs.p.is_set(flags::C));
    assert!(cpu.regs.p.is_set(flags::N));
}

#[test]
fn adc_decimal_mode_produces_bcd() {
    // 0x09 + 0x01 = 0x10 in BCD
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    setup_program(&mut bus, &mut cpu, &[0x69, 0x01]);
    cpu.regs.a = 0x09;
    cpu.regs.p.set(flags::D);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.a, 0x10);
    assert!(!cpu.regs.p.is_set(flags::C));

    // 0x99 + 0x01 = 0x00 with carry out
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    setup_program(&mut bus, &mut cpu, &[0x69, 0x01]);
    cpu.regs.a = 0x99;
    cpu.regs.p.set(flags::D);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.a, 0x00);
    assert!(cpu.regs.p.is_set(flags::C));
}

#[test]
fn sbc_decimal_mode_produces_bcd() {
    // 0x10 - 0x01 = 0x09 in BCD (carry set = no borrow)
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    setup_program(&mut bus, &mut cpu, &[0xE9, 0x01]);
    cpu.regs.a = 0x10;
    cpu.regs.p.set(flags::D);
    cpu.regs.p.set(flags::C);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.a, 0x09);
    assert!(cpu.regs.p.is_set(flags::C));

    // 0x00 - 0x01 borrows to 0x99
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    setup_program(&mut bus, &mut cpu, &[0xE9, 0x01]);
    cpu.regs.a = 0x00;
    cpu.regs.p.set(flags::D);
    cpu.regs.p.set(flags::C);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.a, 0x99);
    assert!(!cpu.regs.p.is_set(flags::C));
}

#[test]
fn decimal_flag_does_not_change_cycle_count() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    setup_program(&mut bus, &mut cpu, &[0x69, 0x01]);
    cpu.regs.p.set(flags::D);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 2);
}

#[test]
fn stack_pha_pla_roundtrip() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    let program = [
        0xA9, 0x42, // LDA #$42
        0xA2, 0xFF, // LDX #$FF
        0x9A, // TXS
        0x48, // PHA
        0xA9, 0x00, // LDA #$00
        0x68, // PLA
    ];
    setup_program(&mut bus, &mut cpu, &program);

    for _ in 0..6 {
        run_instruction(&mut cpu, &mut bus);
    }
    assert_eq!(cpu.regs.a, 0x42);
    assert_eq!(cpu.regs.s, 0xFF);
}

#[test]
fn php_always_pushes_break_and_unused() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    cpu.regs.s = 0xFF;
    setup_program(&mut bus, &mut cpu, &[0x08]); // PHP

    run_instruction(&mut cpu, &mut bus);
    let pushed = bus.peek(0x01FF);
    assert_ne!(pushed & flags::B, 0);
    assert_ne!(pushed & flags::U, 0);
}

#[test]
fn cmp_sets_carry_when_a_not_less() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    setup_program(&mut bus, &mut cpu, &[0xC9, 0x30]); // CMP #$30
    cpu.regs.a = 0x40;
    run_instruction(&mut cpu, &mut bus);
    assert!(cpu.regs.p.is_set(flags::C));
    assert!(!cpu.regs.p.is_set(flags::Z));
}

#[test]
fn bit_copies_memory_bits_to_nv() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    bus.write(0x0010, 0xC0);
    setup_program(&mut bus, &mut cpu, &[0x24, 0x10]); // BIT $10
    cpu.regs.a = 0x01;
    run_instruction(&mut cpu, &mut bus);
    assert!(cpu.regs.p.is_set(flags::N));
    assert!(cpu.regs.p.is_set(flags::V));
    assert!(cpu.regs.p.is_set(flags::Z));
}

#[test]
fn rmw_writes_original_value_before_result() {
    // ASL $10 performs a dummy write of the unmodified value. Observe
    // through a bus that records writes.
    struct RecordingBus {
        inner: SimpleBus,
        writes: Vec<(u16, u8)>,
    }
    impl Bus for RecordingBus {
        fn read(&mut self, addr: u16) -> u8 {
            self.inner.read(addr)
        }
        fn write(&mut self, addr: u16, value: u8) {
            self.writes.push((addr, value));
            self.inner.write(addr, value);
        }
    }

    let mut bus = RecordingBus {
        inner: SimpleBus::new(),
        writes: Vec::new(),
    };
    bus.inner.write(0x0010, 0x41);
    bus.inner.load(0x0200, &[0x06, 0x10]); // ASL $10

    let mut cpu = Mos6510::new();
    cpu.regs.pc = 0x0200;
    for _ in 0..5 {
        cpu.tick(&mut bus);
    }

    assert_eq!(bus.writes, vec![(0x0010, 0x41), (0x0010, 0x82)]);
}

// ---------------------------------------------------------------------------
// Undocumented opcodes
// ---------------------------------------------------------------------------

#[test]
fn slo_shifts_memory_and_ors_accumulator() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    bus.write(0x0010, 0x81);
    setup_program(&mut bus, &mut cpu, &[0x07, 0x10]); // SLO $10
    cpu.regs.a = 0x01;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 5);
    assert_eq!(bus.peek(0x0010), 0x02);
    assert_eq!(cpu.regs.a, 0x03);
    assert!(cpu.regs.p.is_set(flags::C), "carry from the shift");
}

#[test]
fn sre_shifts_memory_and_eors_accumulator() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    bus.write(0x0010, 0x03);
    setup_program(&mut bus, &mut cpu, &[0x47, 0x10]); // SRE $10
    cpu.regs.a = 0xFF;

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(bus.peek(0x0010), 0x01);
    assert_eq!(cpu.regs.a, 0xFE);
    assert!(cpu.regs.p.is_set(flags::C));
}

#[test]
fn rra_rotates_then_adds() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    bus.write(0x0010, 0x02);
    setup_program(&mut bus, &mut cpu, &[0x67, 0x10]); // RRA $10
    cpu.regs.a = 0x10;

    run_instruction(&mut cpu, &mut bus);
    // 0x02 ROR → 0x01 (carry out 0), then A = 0x10 + 0x01
    assert_eq!(bus.peek(0x0010), 0x01);
    assert_eq!(cpu.regs.a, 0x11);
}

#[test]
fn isc_increments_then_subtracts() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    bus.write(0x0010, 0x0F);
    setup_program(&mut bus, &mut cpu, &[0xE7, 0x10]); // ISC $10
    cpu.regs.a = 0x20;
    cpu.regs.p.set(flags::C);

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(bus.peek(0x0010), 0x10);
    assert_eq!(cpu.regs.a, 0x10);
}

#[test]
fn sax_stores_a_and_x_without_flags() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    setup_program(&mut bus, &mut cpu, &[0x87, 0x10]); // SAX $10
    cpu.regs.a = 0xF0;
    cpu.regs.x = 0x3C;
    let p_before = cpu.regs.p;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 3);
    assert_eq!(bus.peek(0x0010), 0x30);
    assert_eq!(cpu.regs.p, p_before, "SAX leaves flags alone");
}

#[test]
fn lax_absolute_y_timing_matches_lda() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    bus.write(0x30FF, 0x00);
    bus.write(0x3104, 0x5A);
    setup_program(&mut bus, &mut cpu, &[0xBF, 0xFF, 0x30]); // LAX $30FF,Y
    cpu.regs.y = 5;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 5, "page cross penalty");
    assert_eq!(cpu.regs.a, 0x5A);
    assert_eq!(cpu.regs.x, 0x5A);
}

#[test]
fn anc_copies_n_into_carry() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    setup_program(&mut bus, &mut cpu, &[0x0B, 0xF0]); // ANC #$F0
    cpu.regs.a = 0x80;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 2);
    assert_eq!(cpu.regs.a, 0x80);
    assert!(cpu.regs.p.is_set(flags::N));
    assert!(cpu.regs.p.is_set(flags::C));
}

#[test]
fn alr_ands_then_shifts_right() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    setup_program(&mut bus, &mut cpu, &[0x4B, 0x0F]); // ALR #$0F
    cpu.regs.a = 0x07;

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.a, 0x03);
    assert!(cpu.regs.p.is_set(flags::C), "bit shifted out");
}

#[test]
fn arr_sets_carry_from_bit_6() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    setup_program(&mut bus, &mut cpu, &[0x6B, 0xFF]); // ARR #$FF
    cpu.regs.a = 0xFF;
    cpu.regs.p.set(flags::C);

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.a, 0xFF);
    assert!(cpu.regs.p.is_set(flags::C), "result bit 6");
    assert!(!cpu.regs.p.is_set(flags::V), "bits 6 and 5 agree");
}

#[test]
fn sbx_subtracts_from_a_and_x() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    setup_program(&mut bus, &mut cpu, &[0xCB, 0x02]); // SBX #$02
    cpu.regs.a = 0x0F;
    cpu.regs.x = 0x07;

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.x, 0x05); // (A & X) - 2
    assert!(cpu.regs.p.is_set(flags::C));
}

#[test]
fn usbc_mirrors_sbc_immediate() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    setup_program(&mut bus, &mut cpu, &[0xEB, 0x01]); // USBC #$01
    cpu.regs.a = 0x10;
    cpu.regs.p.set(flags::C);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 2);
    assert_eq!(cpu.regs.a, 0x0F);
}

#[test]
fn undocumented_nops_consume_documented_cycles() {
    let cases: &[(&[u8], u8, u32, &str)] = &[
        (&[0x1A], 0, 2, "NOP implied"),
        (&[0x80, 0x00], 0, 2, "NOP imm"),
        (&[0x04, 0x10], 0, 3, "NOP zp"),
        (&[0x14, 0x10], 5, 4, "NOP zp,X"),
        (&[0x0C, 0x00, 0x30], 0, 4, "NOP abs"),
        (&[0x1C, 0x00, 0x30], 5, 4, "NOP abs,X same page"),
        (&[0x1C, 0xFF, 0x30], 5, 5, "NOP abs,X page cross"),
    ];

    for &(program, x, expected, what) in cases {
        let mut bus = SimpleBus::new();
        let mut cpu = Mos6510::new();
        setup_program(&mut bus, &mut cpu, program);
        cpu.regs.x = x;
        let a = cpu.regs.a;
        assert_eq!(run_instruction(&mut cpu, &mut bus), expected, "{what}");
        assert_eq!(cpu.regs.a, a, "{what} must not touch registers");
    }
}

#[test]
fn shy_stores_y_masked_by_address_high() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    setup_program(&mut bus, &mut cpu, &[0x9C, 0x00, 0x30]); // SHY $3000,X
    cpu.regs.x = 0x02;
    cpu.regs.y = 0xFF;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 5);
    assert_eq!(bus.peek(0x3002), 0xFF & 0x31);
}

#[test]
fn slo_izy_takes_eight_cycles() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6510::new();
    bus.write(0x0010, 0x00);
    bus.write(0x0011, 0x30);
    setup_program(&mut bus, &mut cpu, &[0x13, 0x10]); // SLO ($10),Y
    cpu.regs.y = 5;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 8);
}
