//! 6510 execution engine.
//!
//! Cycle-accurate emulation where each `tick()` performs exactly one bus
//! access. Instructions are broken down into their component cycles, so
//! the machine can interleave video DMA and timer activity between any
//! two CPU cycles.
//!
//! Interrupt timing: the maskable line is sampled once per instruction,
//! at the boundary before the next opcode fetch, and honoured only with
//! the I flag clear. The non-maskable line is edge-latched and wins over
//! a simultaneous IRQ. Both sequences take exactly 7 cycles (two internal
//! cycles, three pushes, two vector fetches).

use breadbin_core::{Bus, Cpu, Observable, Value};

use crate::flags::{C, D, I, N, V, Z};
use crate::{Registers, Status};

/// NMI vector address.
const NMI_VECTOR: u16 = 0xFFFA;

/// IRQ/BRK vector address.
const IRQ_VECTOR: u16 = 0xFFFE;

/// Internal state tracking instruction execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// At an instruction boundary, about to fetch an opcode.
    FetchOpcode,
    /// Executing the cycles of the current instruction.
    Execute,
    /// Executing a hardware IRQ/NMI sequence.
    Interrupt,
    /// Locked up by a JAM opcode. Only reset recovers.
    Jammed,
}

/// The MOS 6510 CPU core.
///
/// Each `tick()` advances exactly one cycle. The internal micro-step
/// counter (`cycle`) tracks progress through the current instruction's
/// documented cycle sequence.
#[derive(Debug)]
pub struct Mos6510 {
    /// CPU registers.
    pub regs: Registers,

    /// Current execution state.
    state: State,

    /// Opcode being executed.
    opcode: u8,

    /// Micro-step within the instruction (0 = opcode fetch).
    cycle: u8,

    /// Scratch address register for addressing modes.
    addr: u16,

    /// Scratch data register.
    data: u8,

    /// Zero-page pointer for indirect addressing.
    pointer: u8,

    /// Vector for the in-flight hardware interrupt sequence.
    int_vector: u16,

    /// Level of the maskable interrupt line, as set by the machine.
    irq_line: bool,

    /// Level of the non-maskable interrupt line (for edge detection).
    nmi_line: bool,

    /// Latched NMI edge awaiting service.
    nmi_pending: bool,

    /// Total cycles executed (for debugging).
    total_cycles: u64,
}

impl Default for Mos6510 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mos6510 {
    /// Create a new 6510 in power-on state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            state: State::FetchOpcode,
            opcode: 0,
            cycle: 0,
            addr: 0,
            data: 0,
            pointer: 0,
            int_vector: 0,
            irq_line: false,
            nmi_line: false,
            nmi_pending: false,
            total_cycles: 0,
        }
    }

    /// True when the CPU sits at an instruction boundary.
    #[must_use]
    pub fn is_instruction_complete(&self) -> bool {
        self.state == State::FetchOpcode
    }

    /// Force the program counter (reset vector load, test setup).
    pub fn force_pc(&mut self, pc: u16) {
        self.regs.pc = pc;
        self.state = State::FetchOpcode;
        self.cycle = 0;
    }

    /// Total cycles executed since power-on.
    #[must_use]
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Execute one CPU cycle.
    fn execute_cycle<B: Bus>(&mut self, bus: &mut B) {
        self.total_cycles += 1;

        match self.state {
            State::FetchOpcode => {
                // Interrupts are sampled here, and only here. NMI wins
                // over a simultaneous IRQ.
                if self.nmi_pending {
                    self.nmi_pending = false;
                    let _ = bus.read(self.regs.pc);
                    self.int_vector = NMI_VECTOR;
                    self.cycle = 1;
                    self.state = State::Interrupt;
                    return;
                }
                if self.irq_line && !self.regs.p.is_set(I) {
                    let _ = bus.read(self.regs.pc);
                    self.int_vector = IRQ_VECTOR;
                    self.cycle = 1;
                    self.state = State::Interrupt;
                    return;
                }

                self.opcode = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 1;
                self.state = State::Execute;
            }
            State::Execute => {
                self.execute_instruction(bus);
            }
            State::Interrupt => {
                self.interrupt_cycle(bus);
            }
            State::Jammed => {
                // Locked up: the address bus keeps showing PC.
                let _ = bus.read(self.regs.pc);
            }
        }
    }

    /// One cycle of the 7-cycle hardware interrupt sequence.
    ///
    /// Cycle 1 (the dummy read at PC) already ran at the fetch boundary;
    /// cycles 2-7 run here. The pushed status has B clear, which is how
    /// handlers distinguish a hardware interrupt from BRK.
    fn interrupt_cycle<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                // Second internal cycle
                let _ = bus.read(self.regs.pc);
                self.cycle = 2;
            }
            2 => {
                let addr = self.regs.push();
                bus.write(addr, (self.regs.pc >> 8) as u8);
                self.cycle = 3;
            }
            3 => {
                let addr = self.regs.push();
                bus.write(addr, self.regs.pc as u8);
                self.cycle = 4;
            }
            4 => {
                let addr = self.regs.push();
                bus.write(addr, self.regs.p.to_byte_irq());
                self.cycle = 5;
            }
            5 => {
                self.addr = u16::from(bus.read(self.int_vector));
                self.cycle = 6;
            }
            6 => {
                self.addr |= u16::from(bus.read(self.int_vector.wrapping_add(1))) << 8;
                self.regs.pc = self.addr;
                self.regs.p.set(I);
                self.finish();
            }
            _ => unreachable!("interrupt sequence has no cycle {}", self.cycle),
        }
    }

    /// Execute one cycle of the current instruction.
    ///
    /// Every opcode — documented, undocumented or JAM — has exactly one
    /// arm here. An opcode/cycle combination falling through any helper's
    /// match is a core defect and panics via `unreachable!`.
    fn execute_instruction<B: Bus>(&mut self, bus: &mut B) {
        match self.opcode {
            // BRK - 7 cycles
            0x00 => self.op_brk(bus),

            // ORA (zp,X) - 6 cycles
            0x01 => self.addr_izx(bus, Self::do_ora),

            // SLO (zp,X) - 8 cycles
            0x03 => self.addr_izx_rmw(bus, Self::do_slo),

            // ORA zp - 3 cycles
            0x05 => self.addr_zp(bus, Self::do_ora),

            // ASL zp - 5 cycles
            0x06 => self.addr_zp_rmw(bus, Self::do_asl),

            // SLO zp - 5 cycles
            0x07 => self.addr_zp_rmw(bus, Self::do_slo),

            // PHP - 3 cycles
            0x08 => self.op_php(bus),

            // ORA imm - 2 cycles
            0x09 => self.addr_imm(bus, Self::do_ora),

            // ASL A - 2 cycles
            0x0A => self.op_asl_a(bus),

            // ANC imm - 2 cycles
            0x0B | 0x2B => self.addr_imm(bus, Self::do_anc),

            // ORA abs - 4 cycles
            0x0D => self.addr_abs(bus, Self::do_ora),

            // ASL abs - 6 cycles
            0x0E => self.addr_abs_rmw(bus, Self::do_asl),

            // SLO abs - 6 cycles
            0x0F => self.addr_abs_rmw(bus, Self::do_slo),

            // BPL rel - 2/3/4 cycles
            0x10 => self.op_branch(bus, !self.regs.p.is_set(N)),

            // ORA (zp),Y - 5/6 cycles
            0x11 => self.addr_izy(bus, Self::do_ora),

            // SLO (zp),Y - 8 cycles
            0x13 => self.addr_izy_rmw(bus, Self::do_slo),

            // ORA zp,X - 4 cycles
            0x15 => self.addr_zpx(bus, Self::do_ora),

            // ASL zp,X - 6 cycles
            0x16 => self.addr_zpx_rmw(bus, Self::do_asl),

            // SLO zp,X - 6 cycles
            0x17 => self.addr_zpx_rmw(bus, Self::do_slo),

            // CLC - 2 cycles
            0x18 => self.op_flag(bus, C, false),

            // ORA abs,Y - 4/5 cycles
            0x19 => self.addr_aby(bus, Self::do_ora),

            // SLO abs,Y - 7 cycles
            0x1B => self.addr_aby_rmw(bus, Self::do_slo),

            // ORA abs,X - 4/5 cycles
            0x1D => self.addr_abx(bus, Self::do_ora),

            // ASL abs,X - 7 cycles
            0x1E => self.addr_abx_rmw(bus, Self::do_asl),

            // SLO abs,X - 7 cycles
            0x1F => self.addr_abx_rmw(bus, Self::do_slo),

            // JSR abs - 6 cycles
            0x20 => self.op_jsr(bus),

            // AND (zp,X) - 6 cycles
            0x21 => self.addr_izx(bus, Self::do_and),

            // RLA (zp,X) - 8 cycles
            0x23 => self.addr_izx_rmw(bus, Self::do_rla),

            // BIT zp - 3 cycles
            0x24 => self.addr_zp(bus, Self::do_bit),

            // AND zp - 3 cycles
            0x25 => self.addr_zp(bus, Self::do_and),

            // ROL zp - 5 cycles
            0x26 => self.addr_zp_rmw(bus, Self::do_rol),

            // RLA zp - 5 cycles
            0x27 => self.addr_zp_rmw(bus, Self::do_rla),

            // PLP - 4 cycles
            0x28 => self.op_plp(bus),

            // AND imm - 2 cycles
            0x29 => self.addr_imm(bus, Self::do_and),

            // ROL A - 2 cycles
            0x2A => self.op_rol_a(bus),

            // BIT abs - 4 cycles
            0x2C => self.addr_abs(bus, Self::do_bit),

            // AND abs - 4 cycles
            0x2D => self.addr_abs(bus, Self::do_and),

            // ROL abs - 6 cycles
            0x2E => self.addr_abs_rmw(bus, Self::do_rol),

            // RLA abs - 6 cycles
            0x2F => self.addr_abs_rmw(bus, Self::do_rla),

            // BMI rel - 2/3/4 cycles
            0x30 => self.op_branch(bus, self.regs.p.is_set(N)),

            // AND (zp),Y - 5/6 cycles
            0x31 => self.addr_izy(bus, Self::do_and),

            // RLA (zp),Y - 8 cycles
            0x33 => self.addr_izy_rmw(bus, Self::do_rla),

            // AND zp,X - 4 cycles
            0x35 => self.addr_zpx(bus, Self::do_and),

            // ROL zp,X - 6 cycles
            0x36 => self.addr_zpx_rmw(bus, Self::do_rol),

            // RLA zp,X - 6 cycles
            0x37 => self.addr_zpx_rmw(bus, Self::do_rla),

            // SEC - 2 cycles
            0x38 => self.op_flag(bus, C, true),

            // AND abs,Y - 4/5 cycles
            0x39 => self.addr_aby(bus, Self::do_and),

            // RLA abs,Y - 7 cycles
            0x3B => self.addr_aby_rmw(bus, Self::do_rla),

            // AND abs,X - 4/5 cycles
            0x3D => self.addr_abx(bus, Self::do_and),

            // ROL abs,X - 7 cycles
            0x3E => self.addr_abx_rmw(bus, Self::do_rol),

            // RLA abs,X - 7 cycles
            0x3F => self.addr_abx_rmw(bus, Self::do_rla),

            // RTI - 6 cycles
            0x40 => self.op_rti(bus),

            // EOR (zp,X) - 6 cycles
            0x41 => self.addr_izx(bus, Self::do_eor),

            // SRE (zp,X) - 8 cycles
            0x43 => self.addr_izx_rmw(bus, Self::do_sre),

            // EOR zp - 3 cycles
            0x45 => self.addr_zp(bus, Self::do_eor),

            // LSR zp - 5 cycles
            0x46 => self.addr_zp_rmw(bus, Self::do_lsr),

            // SRE zp - 5 cycles
            0x47 => self.addr_zp_rmw(bus, Self::do_sre),

            // PHA - 3 cycles
            0x48 => self.op_pha(bus),

            // EOR imm - 2 cycles
            0x49 => self.addr_imm(bus, Self::do_eor),

            // LSR A - 2 cycles
            0x4A => self.op_lsr_a(bus),

            // ALR imm - 2 cycles
            0x4B => self.addr_imm(bus, Self::do_alr),

            // JMP abs - 3 cycles
            0x4C => self.op_jmp_abs(bus),

            // EOR abs - 4 cycles
            0x4D => self.addr_abs(bus, Self::do_eor),

            // LSR abs - 6 cycles
            0x4E => self.addr_abs_rmw(bus, Self::do_lsr),

            // SRE abs - 6 cycles
            0x4F => self.addr_abs_rmw(bus, Self::do_sre),

            // BVC rel - 2/3/4 cycles
            0x50 => self.op_branch(bus, !self.regs.p.is_set(V)),

            // EOR (zp),Y - 5/6 cycles
            0x51 => self.addr_izy(bus, Self::do_eor),

            // SRE (zp),Y - 8 cycles
            0x53 => self.addr_izy_rmw(bus, Self::do_sre),

            // EOR zp,X - 4 cycles
            0x55 => self.addr_zpx(bus, Self::do_eor),

            // LSR zp,X - 6 cycles
            0x56 => self.addr_zpx_rmw(bus, Self::do_lsr),

            // SRE zp,X - 6 cycles
            0x57 => self.addr_zpx_rmw(bus, Self::do_sre),

            // CLI - 2 cycles
            0x58 => self.op_flag(bus, I, false),

            // EOR abs,Y - 4/5 cycles
            0x59 => self.addr_aby(bus, Self::do_eor),

            // SRE abs,Y - 7 cycles
            0x5B => self.addr_aby_rmw(bus, Self::do_sre),

            // EOR abs,X - 4/5 cycles
            0x5D => self.addr_abx(bus, Self::do_eor),

            // LSR abs,X - 7 cycles
            0x5E => self.addr_abx_rmw(bus, Self::do_lsr),

            // SRE abs,X - 7 cycles
            0x5F => self.addr_abx_rmw(bus, Self::do_sre),

            // RTS - 6 cycles
            0x60 => self.op_rts(bus),

            // ADC (zp,X) - 6 cycles
            0x61 => self.addr_izx(bus, Self::do_adc),

            // RRA (zp,X) - 8 cycles
            0x63 => self.addr_izx_rmw(bus, Self::do_rra),

            // ADC zp - 3 cycles
            0x65 => self.addr_zp(bus, Self::do_adc),

            // ROR zp - 5 cycles
            0x66 => self.addr_zp_rmw(bus, Self::do_ror),

            // RRA zp - 5 cycles
            0x67 => self.addr_zp_rmw(bus, Self::do_rra),

            // PLA - 4 cycles
            0x68 => self.op_pla(bus),

            // ADC imm - 2 cycles
            0x69 => self.addr_imm(bus, Self::do_adc),

            // ROR A - 2 cycles
            0x6A => self.op_ror_a(bus),

            // ARR imm - 2 cycles
            0x6B => self.addr_imm(bus, Self::do_arr),

            // JMP (ind) - 5 cycles
            0x6C => self.op_jmp_ind(bus),

            // ADC abs - 4 cycles
            0x6D => self.addr_abs(bus, Self::do_adc),

            // ROR abs - 6 cycles
            0x6E => self.addr_abs_rmw(bus, Self::do_ror),

            // RRA abs - 6 cycles
            0x6F => self.addr_abs_rmw(bus, Self::do_rra),

            // BVS rel - 2/3/4 cycles
            0x70 => self.op_branch(bus, self.regs.p.is_set(V)),

            // ADC (zp),Y - 5/6 cycles
            0x71 => self.addr_izy(bus, Self::do_adc),

            // RRA (zp),Y - 8 cycles
            0x73 => self.addr_izy_rmw(bus, Self::do_rra),

            // ADC zp,X - 4 cycles
            0x75 => self.addr_zpx(bus, Self::do_adc),

            // ROR zp,X - 6 cycles
            0x76 => self.addr_zpx_rmw(bus, Self::do_ror),

            // RRA zp,X - 6 cycles
            0x77 => self.addr_zpx_rmw(bus, Self::do_rra),

            // SEI - 2 cycles
            0x78 => self.op_flag(bus, I, true),

            // ADC abs,Y - 4/5 cycles
            0x79 => self.addr_aby(bus, Self::do_adc),

            // RRA abs,Y - 7 cycles
            0x7B => self.addr_aby_rmw(bus, Self::do_rra),

            // ADC abs,X - 4/5 cycles
            0x7D => self.addr_abx(bus, Self::do_adc),

            // ROR abs,X - 7 cycles
            0x7E => self.addr_abx_rmw(bus, Self::do_ror),

            // RRA abs,X - 7 cycles
            0x7F => self.addr_abx_rmw(bus, Self::do_rra),

            // STA (zp,X) - 6 cycles
            0x81 => self.addr_izx_w(bus, |cpu| cpu.regs.a),

            // SAX (zp,X) - 6 cycles
            0x83 => self.addr_izx_w(bus, |cpu| cpu.regs.a & cpu.regs.x),

            // STY zp - 3 cycles
            0x84 => self.addr_zp_w(bus, |cpu| cpu.regs.y),

            // STA zp - 3 cycles
            0x85 => self.addr_zp_w(bus, |cpu| cpu.regs.a),

            // STX zp - 3 cycles
            0x86 => self.addr_zp_w(bus, |cpu| cpu.regs.x),

            // SAX zp - 3 cycles
            0x87 => self.addr_zp_w(bus, |cpu| cpu.regs.a & cpu.regs.x),

            // DEY - 2 cycles
            0x88 => self.op_dey(bus),

            // TXA - 2 cycles
            0x8A => self.op_txa(bus),

            // XAA imm - 2 cycles (unstable; deterministic approximation)
            0x8B => self.addr_imm(bus, Self::do_xaa),

            // STY abs - 4 cycles
            0x8C => self.addr_abs_w(bus, |cpu| cpu.regs.y),

            // STA abs - 4 cycles
            0x8D => self.addr_abs_w(bus, |cpu| cpu.regs.a),

            // STX abs - 4 cycles
            0x8E => self.addr_abs_w(bus, |cpu| cpu.regs.x),

            // SAX abs - 4 cycles
            0x8F => self.addr_abs_w(bus, |cpu| cpu.regs.a & cpu.regs.x),

            // BCC rel - 2/3/4 cycles
            0x90 => self.op_branch(bus, !self.regs.p.is_set(C)),

            // STA (zp),Y - 6 cycles
            0x91 => self.addr_izy_w(bus, |cpu| cpu.regs.a),

            // SHA (zp),Y - 6 cycles (unstable; value anded with addr hi + 1)
            0x93 => self.addr_izy_w(bus, |cpu| {
                cpu.regs.a & cpu.regs.x & ((cpu.addr >> 8) as u8).wrapping_add(1)
            }),

            // STY zp,X - 4 cycles
            0x94 => self.addr_zpx_w(bus, |cpu| cpu.regs.y),

            // STA zp,X - 4 cycles
            0x95 => self.addr_zpx_w(bus, |cpu| cpu.regs.a),

            // STX zp,Y - 4 cycles
            0x96 => self.addr_zpy_w(bus, |cpu| cpu.regs.x),

            // SAX zp,Y - 4 cycles
            0x97 => self.addr_zpy_w(bus, |cpu| cpu.regs.a & cpu.regs.x),

            // TYA - 2 cycles
            0x98 => self.op_tya(bus),

            // STA abs,Y - 5 cycles
            0x99 => self.addr_aby_w(bus, |cpu| cpu.regs.a),

            // TXS - 2 cycles
            0x9A => self.op_txs(bus),

            // TAS abs,Y - 5 cycles (unstable; S = A & X, then masked store)
            0x9B => self.op_tas(bus),

            // SHY abs,X - 5 cycles (unstable; masked store)
            0x9C => self.addr_abx_w(bus, |cpu| {
                cpu.regs.y & ((cpu.addr >> 8) as u8).wrapping_add(1)
            }),

            // STA abs,X - 5 cycles
            0x9D => self.addr_abx_w(bus, |cpu| cpu.regs.a),

            // SHX abs,Y - 5 cycles (unstable; masked store)
            0x9E => self.addr_aby_w(bus, |cpu| {
                cpu.regs.x & ((cpu.addr >> 8) as u8).wrapping_add(1)
            }),

            // SHA abs,Y - 5 cycles (unstable; masked store)
            0x9F => self.addr_aby_w(bus, |cpu| {
                cpu.regs.a & cpu.regs.x & ((cpu.addr >> 8) as u8).wrapping_add(1)
            }),

            // LDY imm - 2 cycles
            0xA0 => self.addr_imm(bus, Self::do_ldy),

            // LDA (zp,X) - 6 cycles
            0xA1 => self.addr_izx(bus, Self::do_lda),

            // LDX imm - 2 cycles
            0xA2 => self.addr_imm(bus, Self::do_ldx),

            // LAX (zp,X) - 6 cycles
            0xA3 => self.addr_izx(bus, Self::do_lax),

            // LDY zp - 3 cycles
            0xA4 => self.addr_zp(bus, Self::do_ldy),

            // LDA zp - 3 cycles
            0xA5 => self.addr_zp(bus, Self::do_lda),

            // LDX zp - 3 cycles
            0xA6 => self.addr_zp(bus, Self::do_ldx),

            // LAX zp - 3 cycles
            0xA7 => self.addr_zp(bus, Self::do_lax),

            // TAY - 2 cycles
            0xA8 => self.op_tay(bus),

            // LDA imm - 2 cycles
            0xA9 => self.addr_imm(bus, Self::do_lda),

            // TAX - 2 cycles
            0xAA => self.op_tax(bus),

            // LXA imm - 2 cycles (unstable; deterministic approximation)
            0xAB => self.addr_imm(bus, Self::do_lxa),

            // LDY abs - 4 cycles
            0xAC => self.addr_abs(bus, Self::do_ldy),

            // LDA abs - 4 cycles
            0xAD => self.addr_abs(bus, Self::do_lda),

            // LDX abs - 4 cycles
            0xAE => self.addr_abs(bus, Self::do_ldx),

            // LAX abs - 4 cycles
            0xAF => self.addr_abs(bus, Self::do_lax),

            // BCS rel - 2/3/4 cycles
            0xB0 => self.op_branch(bus, self.regs.p.is_set(C)),

            // LDA (zp),Y - 5/6 cycles
            0xB1 => self.addr_izy(bus, Self::do_lda),

            // LAX (zp),Y - 5/6 cycles
            0xB3 => self.addr_izy(bus, Self::do_lax),

            // LDY zp,X - 4 cycles
            0xB4 => self.addr_zpx(bus, Self::do_ldy),

            // LDA zp,X - 4 cycles
            0xB5 => self.addr_zpx(bus, Self::do_lda),

            // LDX zp,Y - 4 cycles
            0xB6 => self.addr_zpy(bus, Self::do_ldx),

            // LAX zp,Y - 4 cycles
            0xB7 => self.addr_zpy(bus, Self::do_lax),

            // CLV - 2 cycles
            0xB8 => self.op_flag(bus, V, false),

            // LDA abs,Y - 4/5 cycles
            0xB9 => self.addr_aby(bus, Self::do_lda),

            // TSX - 2 cycles
            0xBA => self.op_tsx(bus),

            // LAS abs,Y - 4/5 cycles
            0xBB => self.addr_aby(bus, Self::do_las),

            // LDY abs,X - 4/5 cycles
            0xBC => self.addr_abx(bus, Self::do_ldy),

            // LDA abs,X - 4/5 cycles
            0xBD => self.addr_abx(bus, Self::do_lda),

            // LDX abs,Y - 4/5 cycles
            0xBE => self.addr_aby(bus, Self::do_ldx),

            // LAX abs,Y - 4/5 cycles
            0xBF => self.addr_aby(bus, Self::do_lax),

            // CPY imm - 2 cycles
            0xC0 => self.addr_imm(bus, Self::do_cpy),

            // CMP (zp,X) - 6 cycles
            0xC1 => self.addr_izx(bus, Self::do_cmp),

            // DCP (zp,X) - 8 cycles
            0xC3 => self.addr_izx_rmw(bus, Self::do_dcp),

            // CPY zp - 3 cycles
            0xC4 => self.addr_zp(bus, Self::do_cpy),

            // CMP zp - 3 cycles
            0xC5 => self.addr_zp(bus, Self::do_cmp),

            // DEC zp - 5 cycles
            0xC6 => self.addr_zp_rmw(bus, Self::do_dec),

            // DCP zp - 5 cycles
            0xC7 => self.addr_zp_rmw(bus, Self::do_dcp),

            // INY - 2 cycles
            0xC8 => self.op_iny(bus),

            // CMP imm - 2 cycles
            0xC9 => self.addr_imm(bus, Self::do_cmp),

            // DEX - 2 cycles
            0xCA => self.op_dex(bus),

            // SBX imm - 2 cycles
            0xCB => self.addr_imm(bus, Self::do_sbx),

            // CPY abs - 4 cycles
            0xCC => self.addr_abs(bus, Self::do_cpy),

            // CMP abs - 4 cycles
            0xCD => self.addr_abs(bus, Self::do_cmp),

            // DEC abs - 6 cycles
            0xCE => self.addr_abs_rmw(bus, Self::do_dec),

            // DCP abs - 6 cycles
            0xCF => self.addr_abs_rmw(bus, Self::do_dcp),

            // BNE rel - 2/3/4 cycles
            0xD0 => self.op_branch(bus, !self.regs.p.is_set(Z)),

            // CMP (zp),Y - 5/6 cycles
            0xD1 => self.addr_izy(bus, Self::do_cmp),

            // DCP (zp),Y - 8 cycles
            0xD3 => self.addr_izy_rmw(bus, Self::do_dcp),

            // CMP zp,X - 4 cycles
            0xD5 => self.addr_zpx(bus, Self::do_cmp),

            // DEC zp,X - 6 cycles
            0xD6 => self.addr_zpx_rmw(bus, Self::do_dec),

            // DCP zp,X - 6 cycles
            0xD7 => self.addr_zpx_rmw(bus, Self::do_dcp),

            // CLD - 2 cycles
            0xD8 => self.op_flag(bus, D, false),

            // CMP abs,Y - 4/5 cycles
            0xD9 => self.addr_aby(bus, Self::do_cmp),

            // DCP abs,Y - 7 cycles
            0xDB => self.addr_aby_rmw(bus, Self::do_dcp),

            // CMP abs,X - 4/5 cycles
            0xDD => self.addr_abx(bus, Self::do_cmp),

            // DEC abs,X - 7 cycles
            0xDE => self.addr_abx_rmw(bus, Self::do_dec),

            // DCP abs,X - 7 cycles
            0xDF => self.addr_abx_rmw(bus, Self::do_dcp),

            // CPX imm - 2 cycles
            0xE0 => self.addr_imm(bus, Self::do_cpx),

            // SBC (zp,X) - 6 cycles
            0xE1 => self.addr_izx(bus, Self::do_sbc),

            // ISC (zp,X) - 8 cycles
            0xE3 => self.addr_izx_rmw(bus, Self::do_isc),

            // CPX zp - 3 cycles
            0xE4 => self.addr_zp(bus, Self::do_cpx),

            // SBC zp - 3 cycles
            0xE5 => self.addr_zp(bus, Self::do_sbc),

            // INC zp - 5 cycles
            0xE6 => self.addr_zp_rmw(bus, Self::do_inc),

            // ISC zp - 5 cycles
            0xE7 => self.addr_zp_rmw(bus, Self::do_isc),

            // INX - 2 cycles
            0xE8 => self.op_inx(bus),

            // SBC imm - 2 cycles (0xEB is the undocumented mirror)
            0xE9 | 0xEB => self.addr_imm(bus, Self::do_sbc),

            // NOP - 2 cycles
            0xEA => self.op_nop(bus),

            // CPX abs - 4 cycles
            0xEC => self.addr_abs(bus, Self::do_cpx),

            // SBC abs - 4 cycles
            0xED => self.addr_abs(bus, Self::do_sbc),

            // INC abs - 6 cycles
            0xEE => self.addr_abs_rmw(bus, Self::do_inc),

            // ISC abs - 6 cycles
            0xEF => self.addr_abs_rmw(bus, Self::do_isc),

            // BEQ rel - 2/3/4 cycles
            0xF0 => self.op_branch(bus, self.regs.p.is_set(Z)),

            // SBC (zp),Y - 5/6 cycles
            0xF1 => self.addr_izy(bus, Self::do_sbc),

            // ISC (zp),Y - 8 cycles
            0xF3 => self.addr_izy_rmw(bus, Self::do_isc),

            // SBC zp,X - 4 cycles
            0xF5 => self.addr_zpx(bus, Self::do_sbc),

            // INC zp,X - 6 cycles
            0xF6 => self.addr_zpx_rmw(bus, Self::do_inc),

            // ISC zp,X - 6 cycles
            0xF7 => self.addr_zpx_rmw(bus, Self::do_isc),

            // SED - 2 cycles
            0xF8 => self.op_flag(bus, D, true),

            // SBC abs,Y - 4/5 cycles
            0xF9 => self.addr_aby(bus, Self::do_sbc),

            // ISC abs,Y - 7 cycles
            0xFB => self.addr_aby_rmw(bus, Self::do_isc),

            // SBC abs,X - 4/5 cycles
            0xFD => self.addr_abx(bus, Self::do_sbc),

            // INC abs,X - 7 cycles
            0xFE => self.addr_abx_rmw(bus, Self::do_inc),

            // ISC abs,X - 7 cycles
            0xFF => self.addr_abx_rmw(bus, Self::do_isc),

            // Undocumented single-byte NOPs - 2 cycles
            0x1A | 0x3A | 0x5A | 0x7A | 0xDA | 0xFA => self.op_nop(bus),

            // Undocumented NOP imm - 2 cycles
            0x80 | 0x82 | 0x89 | 0xC2 | 0xE2 => self.addr_imm(bus, Self::do_nop_read),

            // Undocumented NOP zp - 3 cycles
            0x04 | 0x44 | 0x64 => self.addr_zp(bus, Self::do_nop_read),

            // Undocumented NOP zp,X - 4 cycles
            0x14 | 0x34 | 0x54 | 0x74 | 0xD4 | 0xF4 => self.addr_zpx(bus, Self::do_nop_read),

            // Undocumented NOP abs - 4 cycles
            0x0C => self.addr_abs(bus, Self::do_nop_read),

            // Undocumented NOP abs,X - 4/5 cycles
            0x1C | 0x3C | 0x5C | 0x7C | 0xDC | 0xFC => self.addr_abx(bus, Self::do_nop_read),

            // JAM - CPU locks up until reset
            0x02 | 0x12 | 0x22 | 0x32 | 0x42 | 0x52 | 0x62 | 0x72 | 0x92 | 0xB2 | 0xD2
            | 0xF2 => self.op_jam(bus),
        }
    }

    /// Finish the current instruction and return to the fetch boundary.
    fn finish(&mut self) {
        self.state = State::FetchOpcode;
        self.cycle = 0;
    }

    // ========================================================================
    // Addressing mode helpers - read operations
    // ========================================================================

    /// Immediate: operand is the next byte.
    fn addr_imm<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8)) {
        // Cycle 1: read operand
        if self.cycle == 1 {
            self.data = bus.read(self.regs.pc);
            self.regs.pc = self.regs.pc.wrapping_add(1);
            op(self, self.data);
            self.finish();
        }
    }

    /// Zero page: operand lives at a zero page address.
    fn addr_zp<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8)) {
        match self.cycle {
            1 => {
                self.addr = u16::from(bus.read(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.data = bus.read(self.addr);
                op(self, self.data);
                self.finish();
            }
            _ => unreachable!("zp read has no cycle {}", self.cycle),
        }
    }

    /// Zero page,X: index wraps within the zero page.
    fn addr_zpx<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8)) {
        match self.cycle {
            1 => {
                self.pointer = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                // Dummy read while the index is added
                let _ = bus.read(u16::from(self.pointer));
                self.addr = u16::from(self.pointer.wrapping_add(self.regs.x));
                self.cycle = 3;
            }
            3 => {
                self.data = bus.read(self.addr);
                op(self, self.data);
                self.finish();
            }
            _ => unreachable!("zp,X read has no cycle {}", self.cycle),
        }
    }

    /// Zero page,Y.
    fn addr_zpy<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8)) {
        match self.cycle {
            1 => {
                self.pointer = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let _ = bus.read(u16::from(self.pointer));
                self.addr = u16::from(self.pointer.wrapping_add(self.regs.y));
                self.cycle = 3;
            }
            3 => {
                self.data = bus.read(self.addr);
                op(self, self.data);
                self.finish();
            }
            _ => unreachable!("zp,Y read has no cycle {}", self.cycle),
        }
    }

    /// Absolute: operand lives at a 16-bit address.
    fn addr_abs<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8)) {
        match self.cycle {
            1 => {
                self.addr = u16::from(bus.read(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.addr |= u16::from(bus.read(self.regs.pc)) << 8;
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 3;
            }
            3 => {
                self.data = bus.read(self.addr);
                op(self, self.data);
                self.finish();
            }
            _ => unreachable!("abs read has no cycle {}", self.cycle),
        }
    }

    /// Absolute,X with the page-crossing penalty cycle.
    fn addr_abx<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8)) {
        match self.cycle {
            1 => {
                self.addr = u16::from(bus.read(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let hi = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                let lo = (self.addr as u8).wrapping_add(self.regs.x);
                self.addr = u16::from(lo) | (u16::from(hi) << 8);
                // Carry out of the low byte means the page was crossed
                self.data = u8::from(lo < self.regs.x);
                self.cycle = 3;
            }
            3 => {
                if self.data != 0 {
                    // Page crossed: dummy read from the unfixed address
                    let _ = bus.read(self.addr);
                    self.addr = self.addr.wrapping_add(0x100);
                    self.cycle = 4;
                } else {
                    self.data = bus.read(self.addr);
                    op(self, self.data);
                    self.finish();
                }
            }
            4 => {
                self.data = bus.read(self.addr);
                op(self, self.data);
                self.finish();
            }
            _ => unreachable!("abs,X read has no cycle {}", self.cycle),
        }
    }

    /// Absolute,Y with the page-crossing penalty cycle.
    fn addr_aby<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8)) {
        match self.cycle {
            1 => {
                self.addr = u16::from(bus.read(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let hi = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                let lo = (self.addr as u8).wrapping_add(self.regs.y);
                self.addr = u16::from(lo) | (u16::from(hi) << 8);
                self.data = u8::from(lo < self.regs.y);
                self.cycle = 3;
            }
            3 => {
                if self.data != 0 {
                    let _ = bus.read(self.addr);
                    self.addr = self.addr.wrapping_add(0x100);
                    self.cycle = 4;
                } else {
                    self.data = bus.read(self.addr);
                    op(self, self.data);
                    self.finish();
                }
            }
            4 => {
                self.data = bus.read(self.addr);
                op(self, self.data);
                self.finish();
            }
            _ => unreachable!("abs,Y read has no cycle {}", self.cycle),
        }
    }

    /// Indexed indirect (zp,X).
    fn addr_izx<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8)) {
        match self.cycle {
            1 => {
                self.pointer = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let _ = bus.read(u16::from(self.pointer));
                self.pointer = self.pointer.wrapping_add(self.regs.x);
                self.cycle = 3;
            }
            3 => {
                self.addr = u16::from(bus.read(u16::from(self.pointer)));
                self.cycle = 4;
            }
            4 => {
                // High byte wraps within the zero page
                self.addr |= u16::from(bus.read(u16::from(self.pointer.wrapping_add(1)))) << 8;
                self.cycle = 5;
            }
            5 => {
                self.data = bus.read(self.addr);
                op(self, self.data);
                self.finish();
            }
            _ => unreachable!("(zp,X) read has no cycle {}", self.cycle),
        }
    }

    /// Indirect indexed (zp),Y with the page-crossing penalty cycle.
    fn addr_izy<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8)) {
        match self.cycle {
            1 => {
                self.pointer = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.addr = u16::from(bus.read(u16::from(self.pointer)));
                self.cycle = 3;
            }
            3 => {
                let hi = bus.read(u16::from(self.pointer.wrapping_add(1)));
                let lo = (self.addr as u8).wrapping_add(self.regs.y);
                self.addr = u16::from(lo) | (u16::from(hi) << 8);
                self.data = u8::from(lo < self.regs.y);
                self.cycle = 4;
            }
            4 => {
                if self.data != 0 {
                    let _ = bus.read(self.addr);
                    self.addr = self.addr.wrapping_add(0x100);
                    self.cycle = 5;
                } else {
                    self.data = bus.read(self.addr);
                    op(self, self.data);
                    self.finish();
                }
            }
            5 => {
                self.data = bus.read(self.addr);
                op(self, self.data);
                self.finish();
            }
            _ => unreachable!("(zp),Y read has no cycle {}", self.cycle),
        }
    }

    // ========================================================================
    // Addressing mode helpers - write operations
    // ========================================================================

    /// Zero page write.
    fn addr_zp_w<B: Bus>(&mut self, bus: &mut B, val: fn(&Self) -> u8) {
        match self.cycle {
            1 => {
                self.addr = u16::from(bus.read(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                bus.write(self.addr, val(self));
                self.finish();
            }
            _ => unreachable!("zp write has no cycle {}", self.cycle),
        }
    }

    /// Zero page,X write.
    fn addr_zpx_w<B: Bus>(&mut self, bus: &mut B, val: fn(&Self) -> u8) {
        match self.cycle {
            1 => {
                self.pointer = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let _ = bus.read(u16::from(self.pointer));
                self.addr = u16::from(self.pointer.wrapping_add(self.regs.x));
                self.cycle = 3;
            }
            3 => {
                bus.write(self.addr, val(self));
                self.finish();
            }
            _ => unreachable!("zp,X write has no cycle {}", self.cycle),
        }
    }

    /// Zero page,Y write.
    fn addr_zpy_w<B: Bus>(&mut self, bus: &mut B, val: fn(&Self) -> u8) {
        match self.cycle {
            1 => {
                self.pointer = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let _ = bus.read(u16::from(self.pointer));
                self.addr = u16::from(self.pointer.wrapping_add(self.regs.y));
                self.cycle = 3;
            }
            3 => {
                bus.write(self.addr, val(self));
                self.finish();
            }
            _ => unreachable!("zp,Y write has no cycle {}", self.cycle),
        }
    }

    /// Absolute write.
    fn addr_abs_w<B: Bus>(&mut self, bus: &mut B, val: fn(&Self) -> u8) {
        match self.cycle {
            1 => {
                self.addr = u16::from(bus.read(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.addr |= u16::from(bus.read(self.regs.pc)) << 8;
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 3;
            }
            3 => {
                bus.write(self.addr, val(self));
                self.finish();
            }
            _ => unreachable!("abs write has no cycle {}", self.cycle),
        }
    }

    /// Absolute,X write — always 5 cycles, dummy read regardless of page
    /// crossing.
    fn addr_abx_w<B: Bus>(&mut self, bus: &mut B, val: fn(&Self) -> u8) {
        match self.cycle {
            1 => {
                self.addr = u16::from(bus.read(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let hi = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                let lo = (self.addr as u8).wrapping_add(self.regs.x);
                self.addr = u16::from(lo) | (u16::from(hi) << 8);
                self.data = u8::from(lo < self.regs.x);
                self.cycle = 3;
            }
            3 => {
                let _ = bus.read(self.addr);
                if self.data != 0 {
                    self.addr = self.addr.wrapping_add(0x100);
                }
                self.cycle = 4;
            }
            4 => {
                bus.write(self.addr, val(self));
                self.finish();
            }
            _ => unreachable!("abs,X write has no cycle {}", self.cycle),
        }
    }

    /// Absolute,Y write — always 5 cycles.
    fn addr_aby_w<B: Bus>(&mut self, bus: &mut B, val: fn(&Self) -> u8) {
        match self.cycle {
            1 => {
                self.addr = u16::from(bus.read(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let hi = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                let lo = (self.addr as u8).wrapping_add(self.regs.y);
                self.addr = u16::from(lo) | (u16::from(hi) << 8);
                self.data = u8::from(lo < self.regs.y);
                self.cycle = 3;
            }
            3 => {
                let _ = bus.read(self.addr);
                if self.data != 0 {
                    self.addr = self.addr.wrapping_add(0x100);
                }
                self.cycle = 4;
            }
            4 => {
                bus.write(self.addr, val(self));
                self.finish();
            }
            _ => unreachable!("abs,Y write has no cycle {}", self.cycle),
        }
    }

    /// Indexed indirect (zp,X) write.
    fn addr_izx_w<B: Bus>(&mut self, bus: &mut B, val: fn(&Self) -> u8) {
        match self.cycle {
            1 => {
                self.pointer = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let _ = bus.read(u16::from(self.pointer));
                self.pointer = self.pointer.wrapping_add(self.regs.x);
                self.cycle = 3;
            }
            3 => {
                self.addr = u16::from(bus.read(u16::from(self.pointer)));
                self.cycle = 4;
            }
            4 => {
                self.addr |= u16::from(bus.read(u16::from(self.pointer.wrapping_add(1)))) << 8;
                self.cycle = 5;
            }
            5 => {
                bus.write(self.addr, val(self));
                self.finish();
            }
            _ => unreachable!("(zp,X) write has no cycle {}", self.cycle),
        }
    }

    /// Indirect indexed (zp),Y write — always 6 cycles.
    fn addr_izy_w<B: Bus>(&mut self, bus: &mut B, val: fn(&Self) -> u8) {
        match self.cycle {
            1 => {
                self.pointer = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.addr = u16::from(bus.read(u16::from(self.pointer)));
                self.cycle = 3;
            }
            3 => {
                let hi = bus.read(u16::from(self.pointer.wrapping_add(1)));
                let lo = (self.addr as u8).wrapping_add(self.regs.y);
                self.addr = u16::from(lo) | (u16::from(hi) << 8);
                self.data = u8::from(lo < self.regs.y);
                self.cycle = 4;
            }
            4 => {
                let _ = bus.read(self.addr);
                if self.data != 0 {
                    self.addr = self.addr.wrapping_add(0x100);
                }
                self.cycle = 5;
            }
            5 => {
                bus.write(self.addr, val(self));
                self.finish();
            }
            _ => unreachable!("(zp),Y write has no cycle {}", self.cycle),
        }
    }

    // ========================================================================
    // Addressing mode helpers - read-modify-write operations
    // ========================================================================

    /// Zero page RMW: read, dummy write-back, write result.
    fn addr_zp_rmw<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8) -> u8) {
        match self.cycle {
            1 => {
                self.addr = u16::from(bus.read(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.data = bus.read(self.addr);
                self.cycle = 3;
            }
            3 => {
                // The 6502 writes the unmodified value back first
                bus.write(self.addr, self.data);
                self.data = op(self, self.data);
                self.cycle = 4;
            }
            4 => {
                bus.write(self.addr, self.data);
                self.finish();
            }
            _ => unreachable!("zp RMW has no cycle {}", self.cycle),
        }
    }

    /// Zero page,X RMW.
    fn addr_zpx_rmw<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8) -> u8) {
        match self.cycle {
            1 => {
                self.pointer = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let _ = bus.read(u16::from(self.pointer));
                self.addr = u16::from(self.pointer.wrapping_add(self.regs.x));
                self.cycle = 3;
            }
            3 => {
                self.data = bus.read(self.addr);
                self.cycle = 4;
            }
            4 => {
                bus.write(self.addr, self.data);
                self.data = op(self, self.data);
                self.cycle = 5;
            }
            5 => {
                bus.write(self.addr, self.data);
                self.finish();
            }
            _ => unreachable!("zp,X RMW has no cycle {}", self.cycle),
        }
    }

    /// Absolute RMW.
    fn addr_abs_rmw<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8) -> u8) {
        match self.cycle {
            1 => {
                self.addr = u16::from(bus.read(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.addr |= u16::from(bus.read(self.regs.pc)) << 8;
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 3;
            }
            3 => {
                self.data = bus.read(self.addr);
                self.cycle = 4;
            }
            4 => {
                bus.write(self.addr, self.data);
                self.data = op(self, self.data);
                self.cycle = 5;
            }
            5 => {
                bus.write(self.addr, self.data);
                self.finish();
            }
            _ => unreachable!("abs RMW has no cycle {}", self.cycle),
        }
    }

    /// Absolute,X RMW — always 7 cycles.
    fn addr_abx_rmw<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8) -> u8) {
        match self.cycle {
            1 => {
                self.addr = u16::from(bus.read(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let hi = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                let lo = (self.addr as u8).wrapping_add(self.regs.x);
                self.addr = u16::from(lo) | (u16::from(hi) << 8);
                self.data = u8::from(lo < self.regs.x);
                self.cycle = 3;
            }
            3 => {
                let _ = bus.read(self.addr);
                if self.data != 0 {
                    self.addr = self.addr.wrapping_add(0x100);
                }
                self.cycle = 4;
            }
            4 => {
                self.data = bus.read(self.addr);
                self.cycle = 5;
            }
            5 => {
                bus.write(self.addr, self.data);
                self.data = op(self, self.data);
                self.cycle = 6;
            }
            6 => {
                bus.write(self.addr, self.data);
                self.finish();
            }
            _ => unreachable!("abs,X RMW has no cycle {}", self.cycle),
        }
    }

    /// Absolute,Y RMW — always 7 cycles (undocumented opcodes only).
    fn addr_aby_rmw<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8) -> u8) {
        match self.cycle {
            1 => {
                self.addr = u16::from(bus.read(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let hi = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                let lo = (self.addr as u8).wrapping_add(self.regs.y);
                self.addr = u16::from(lo) | (u16::from(hi) << 8);
                self.data = u8::from(lo < self.regs.y);
                self.cycle = 3;
            }
            3 => {
                let _ = bus.read(self.addr);
                if self.data != 0 {
                    self.addr = self.addr.wrapping_add(0x100);
                }
                self.cycle = 4;
            }
            4 => {
                self.data = bus.read(self.addr);
                self.cycle = 5;
            }
            5 => {
                bus.write(self.addr, self.data);
                self.data = op(self, self.data);
                self.cycle = 6;
            }
            6 => {
                bus.write(self.addr, self.data);
                self.finish();
            }
            _ => unreachable!("abs,Y RMW has no cycle {}", self.cycle),
        }
    }

    /// Indexed indirect (zp,X) RMW — 8 cycles (undocumented opcodes only).
    fn addr_izx_rmw<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8) -> u8) {
        match self.cycle {
            1 => {
                self.pointer = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let _ = bus.read(u16::from(self.pointer));
                self.pointer = self.pointer.wrapping_add(self.regs.x);
                self.cycle = 3;
            }
            3 => {
                self.addr = u16::from(bus.read(u16::from(self.pointer)));
                self.cycle = 4;
            }
            4 => {
                self.addr |= u16::from(bus.read(u16::from(self.pointer.wrapping_add(1)))) << 8;
                self.cycle = 5;
            }
            5 => {
                self.data = bus.read(self.addr);
                self.cycle = 6;
            }
            6 => {
                bus.write(self.addr, self.data);
                self.data = op(self, self.data);
                self.cycle = 7;
            }
            7 => {
                bus.write(self.addr, self.data);
                self.finish();
            }
            _ => unreachable!("(zp,X) RMW has no cycle {}", self.cycle),
        }
    }

    /// Indirect indexed (zp),Y RMW — 8 cycles (undocumented opcodes only).
    fn addr_izy_rmw<B: Bus>(&mut self, bus: &mut B, op: fn(&mut Self, u8) -> u8) {
        match self.cycle {
            1 => {
                self.pointer = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.addr = u16::from(bus.read(u16::from(self.pointer)));
                self.cycle = 3;
            }
            3 => {
                let hi = bus.read(u16::from(self.pointer.wrapping_add(1)));
                let lo = (self.addr as u8).wrapping_add(self.regs.y);
                self.addr = u16::from(lo) | (u16::from(hi) << 8);
                self.data = u8::from(lo < self.regs.y);
                self.cycle = 4;
            }
            4 => {
                let _ = bus.read(self.addr);
                if self.data != 0 {
                    self.addr = self.addr.wrapping_add(0x100);
                }
                self.cycle = 5;
            }
            5 => {
                self.data = bus.read(self.addr);
                self.cycle = 6;
            }
            6 => {
                bus.write(self.addr, self.data);
                self.data = op(self, self.data);
                self.cycle = 7;
            }
            7 => {
                bus.write(self.addr, self.data);
                self.finish();
            }
            _ => unreachable!("(zp),Y RMW has no cycle {}", self.cycle),
        }
    }

    // ========================================================================
    // ALU operations — documented
    // ========================================================================

    fn do_lda(&mut self, val: u8) {
        self.regs.a = val;
        self.regs.p.update_nz(val);
    }

    fn do_ldx(&mut self, val: u8) {
        self.regs.x = val;
        self.regs.p.update_nz(val);
    }

    fn do_ldy(&mut self, val: u8) {
        self.regs.y = val;
        self.regs.p.update_nz(val);
    }

    fn do_ora(&mut self, val: u8) {
        self.regs.a |= val;
        self.regs.p.update_nz(self.regs.a);
    }

    fn do_and(&mut self, val: u8) {
        self.regs.a &= val;
        self.regs.p.update_nz(self.regs.a);
    }

    fn do_eor(&mut self, val: u8) {
        self.regs.a ^= val;
        self.regs.p.update_nz(self.regs.a);
    }

    fn do_adc(&mut self, val: u8) {
        if self.regs.p.is_set(D) {
            self.do_adc_decimal(val);
        } else {
            self.do_adc_binary(val);
        }
    }

    fn do_adc_binary(&mut self, val: u8) {
        let a = self.regs.a;
        let carry = u16::from(self.regs.p.is_set(C));
        let sum = u16::from(a) + u16::from(val) + carry;
        let result = sum as u8;

        self.regs.p.set_if(C, sum > 0xFF);
        self.regs
            .p
            .set_if(V, (a ^ result) & (val ^ result) & 0x80 != 0);
        self.regs.a = result;
        self.regs.p.update_nz(result);
    }

    /// BCD addition. On the NMOS 6502, Z reflects the binary result while
    /// N and V come from the intermediate high nibble — software that
    /// tests flags after decimal ADC depends on exactly this.
    fn do_adc_decimal(&mut self, val: u8) {
        let a = self.regs.a;
        let carry = u8::from(self.regs.p.is_set(C));

        let mut lo = (a & 0x0F) + (val & 0x0F) + carry;
        if lo > 9 {
            lo += 6;
        }

        let mut hi = (a >> 4) + (val >> 4) + u8::from(lo > 0x0F);

        let bin_sum = u16::from(a) + u16::from(val) + u16::from(carry);
        let bin_result = bin_sum as u8;
        self.regs.p.set_if(Z, bin_result == 0);
        self.regs.p.set_if(N, hi & 0x08 != 0);
        self.regs
            .p
            .set_if(V, (a ^ bin_result) & (val ^ bin_result) & 0x80 != 0);

        if hi > 9 {
            hi += 6;
        }

        self.regs.p.set_if(C, hi > 0x0F);
        self.regs.a = (hi << 4) | (lo & 0x0F);
    }

    fn do_sbc(&mut self, val: u8) {
        if self.regs.p.is_set(D) {
            self.do_sbc_decimal(val);
        } else {
            // SBC is ADC with the operand inverted
            self.do_adc_binary(!val);
        }
    }

    /// BCD subtraction. All flags come from the binary result on NMOS.
    fn do_sbc_decimal(&mut self, val: u8) {
        let a = self.regs.a;
        let borrow = i16::from(!self.regs.p.is_set(C));

        let bin_result = i16::from(a) - i16::from(val) - borrow;
        self.regs.p.set_if(C, bin_result >= 0);
        self.regs.p.set_if(Z, (bin_result as u8) == 0);
        self.regs.p.set_if(N, bin_result & 0x80 != 0);
        self.regs.p.set_if(
            V,
            (i16::from(a) ^ bin_result) & (i16::from(a) ^ i16::from(val)) & 0x80 != 0,
        );

        let mut lo = i16::from(a & 0x0F) - i16::from(val & 0x0F) - borrow;
        let mut hi = i16::from(a >> 4) - i16::from(val >> 4);

        if lo < 0 {
            lo -= 6;
            hi -= 1;
        }
        if hi < 0 {
            hi -= 6;
        }

        self.regs.a = ((hi << 4) as u8) | ((lo & 0x0F) as u8);
    }

    fn do_cmp(&mut self, val: u8) {
        let result = self.regs.a.wrapping_sub(val);
        self.regs.p.set_if(C, self.regs.a >= val);
        self.regs.p.update_nz(result);
    }

    fn do_cpx(&mut self, val: u8) {
        let result = self.regs.x.wrapping_sub(val);
        self.regs.p.set_if(C, self.regs.x >= val);
        self.regs.p.update_nz(result);
    }

    fn do_cpy(&mut self, val: u8) {
        let result = self.regs.y.wrapping_sub(val);
        self.regs.p.set_if(C, self.regs.y >= val);
        self.regs.p.update_nz(result);
    }

    fn do_bit(&mut self, val: u8) {
        self.regs.p.set_if(Z, self.regs.a & val == 0);
        self.regs.p.set_if(N, val & 0x80 != 0);
        self.regs.p.set_if(V, val & 0x40 != 0);
    }

    fn do_asl(&mut self, val: u8) -> u8 {
        self.regs.p.set_if(C, val & 0x80 != 0);
        let result = val << 1;
        self.regs.p.update_nz(result);
        result
    }

    fn do_lsr(&mut self, val: u8) -> u8 {
        self.regs.p.set_if(C, val & 0x01 != 0);
        let result = val >> 1;
        self.regs.p.update_nz(result);
        result
    }

    fn do_rol(&mut self, val: u8) -> u8 {
        let carry = u8::from(self.regs.p.is_set(C));
        self.regs.p.set_if(C, val & 0x80 != 0);
        let result = (val << 1) | carry;
        self.regs.p.update_nz(result);
        result
    }

    fn do_ror(&mut self, val: u8) -> u8 {
        let carry = if self.regs.p.is_set(C) { 0x80 } else { 0 };
        self.regs.p.set_if(C, val & 0x01 != 0);
        let result = (val >> 1) | carry;
        self.regs.p.update_nz(result);
        result
    }

    fn do_inc(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        self.regs.p.update_nz(result);
        result
    }

    fn do_dec(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        self.regs.p.update_nz(result);
        result
    }

    /// Operand consumed but discarded (undocumented NOPs).
    fn do_nop_read(&mut self, _val: u8) {}

    // ========================================================================
    // ALU operations — undocumented combination family
    // ========================================================================

    /// SLO: ASL memory, then ORA the result into A.
    fn do_slo(&mut self, val: u8) -> u8 {
        self.regs.p.set_if(C, val & 0x80 != 0);
        let result = val << 1;
        self.regs.a |= result;
        self.regs.p.update_nz(self.regs.a);
        result
    }

    /// RLA: ROL memory, then AND the result into A.
    fn do_rla(&mut self, val: u8) -> u8 {
        let carry = u8::from(self.regs.p.is_set(C));
        self.regs.p.set_if(C, val & 0x80 != 0);
        let result = (val << 1) | carry;
        self.regs.a &= result;
        self.regs.p.update_nz(self.regs.a);
        result
    }

    /// SRE: LSR memory, then EOR the result into A.
    fn do_sre(&mut self, val: u8) -> u8 {
        self.regs.p.set_if(C, val & 0x01 != 0);
        let result = val >> 1;
        self.regs.a ^= result;
        self.regs.p.update_nz(self.regs.a);
        result
    }

    /// RRA: ROR memory, then ADC the result (with the carry from the ROR).
    fn do_rra(&mut self, val: u8) -> u8 {
        let carry_in = if self.regs.p.is_set(C) { 0x80 } else { 0 };
        self.regs.p.set_if(C, val & 0x01 != 0);
        let result = (val >> 1) | carry_in;
        self.do_adc(result);
        result
    }

    /// DCP: DEC memory, then CMP against A.
    fn do_dcp(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        let diff = self.regs.a.wrapping_sub(result);
        self.regs.p.set_if(C, self.regs.a >= result);
        self.regs.p.update_nz(diff);
        result
    }

    /// ISC: INC memory, then SBC the result.
    fn do_isc(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        self.do_sbc(result);
        result
    }

    /// LAX: load A and X together.
    fn do_lax(&mut self, val: u8) {
        self.regs.a = val;
        self.regs.x = val;
        self.regs.p.update_nz(val);
    }

    /// ANC: AND, with C mirroring N.
    fn do_anc(&mut self, val: u8) {
        self.regs.a &= val;
        self.regs.p.update_nz(self.regs.a);
        self.regs.p.set_if(C, self.regs.a & 0x80 != 0);
    }

    /// ALR: AND, then LSR A.
    fn do_alr(&mut self, val: u8) {
        let anded = self.regs.a & val;
        self.regs.p.set_if(C, anded & 0x01 != 0);
        self.regs.a = anded >> 1;
        self.regs.p.update_nz(self.regs.a);
    }

    /// ARR: AND, then ROR A, with C and V from the rotated result's bits
    /// 6 and 5 (binary-mode behavior is used regardless of D).
    fn do_arr(&mut self, val: u8) {
        let anded = self.regs.a & val;
        let carry_in = if self.regs.p.is_set(C) { 0x80 } else { 0 };
        self.regs.a = (anded >> 1) | carry_in;
        self.regs.p.update_nz(self.regs.a);
        self.regs.p.set_if(C, self.regs.a & 0x40 != 0);
        self.regs
            .p
            .set_if(V, ((self.regs.a >> 6) ^ (self.regs.a >> 5)) & 1 != 0);
    }

    /// SBX: X = (A & X) - operand, CMP-style flags.
    fn do_sbx(&mut self, val: u8) {
        let anded = self.regs.a & self.regs.x;
        self.regs.x = anded.wrapping_sub(val);
        self.regs.p.set_if(C, anded >= val);
        self.regs.p.update_nz(self.regs.x);
    }

    /// LAS: A = X = S = S & operand.
    fn do_las(&mut self, val: u8) {
        let result = self.regs.s & val;
        self.regs.a = result;
        self.regs.x = result;
        self.regs.s = result;
        self.regs.p.update_nz(result);
    }

    /// XAA: unstable on silicon; the conventional deterministic model.
    fn do_xaa(&mut self, val: u8) {
        self.regs.a = (self.regs.a | 0xEE) & self.regs.x & val;
        self.regs.p.update_nz(self.regs.a);
    }

    /// LXA: unstable on silicon; the conventional deterministic model.
    fn do_lxa(&mut self, val: u8) {
        let result = (self.regs.a | 0xEE) & val;
        self.regs.a = result;
        self.regs.x = result;
        self.regs.p.update_nz(result);
    }

    // ========================================================================
    // Individual instruction implementations
    // ========================================================================

    /// BRK: 7 cycles, pushes with B set, always vectors through $FFFE.
    fn op_brk<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                // Padding byte: read and skipped
                let _ = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let addr = self.regs.push();
                bus.write(addr, (self.regs.pc >> 8) as u8);
                self.cycle = 3;
            }
            3 => {
                let addr = self.regs.push();
                bus.write(addr, self.regs.pc as u8);
                self.cycle = 4;
            }
            4 => {
                let addr = self.regs.push();
                bus.write(addr, self.regs.p.to_byte_brk());
                self.cycle = 5;
            }
            5 => {
                self.addr = u16::from(bus.read(IRQ_VECTOR));
                self.cycle = 6;
            }
            6 => {
                self.addr |= u16::from(bus.read(IRQ_VECTOR + 1)) << 8;
                self.regs.pc = self.addr;
                self.regs.p.set(I);
                self.finish();
            }
            _ => unreachable!("BRK has no cycle {}", self.cycle),
        }
    }

    fn op_rti<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let _ = bus.read(self.regs.pc);
                self.cycle = 2;
            }
            2 => {
                let _ = bus.read(self.regs.stack_addr());
                self.cycle = 3;
            }
            3 => {
                let addr = self.regs.pop();
                self.regs.p = Status::from_byte(bus.read(addr));
                self.cycle = 4;
            }
            4 => {
                let addr = self.regs.pop();
                self.addr = u16::from(bus.read(addr));
                self.cycle = 5;
            }
            5 => {
                let addr = self.regs.pop();
                self.addr |= u16::from(bus.read(addr)) << 8;
                self.regs.pc = self.addr;
                self.finish();
            }
            _ => unreachable!("RTI has no cycle {}", self.cycle),
        }
    }

    fn op_rts<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let _ = bus.read(self.regs.pc);
                self.cycle = 2;
            }
            2 => {
                let _ = bus.read(self.regs.stack_addr());
                self.cycle = 3;
            }
            3 => {
                let addr = self.regs.pop();
                self.addr = u16::from(bus.read(addr));
                self.cycle = 4;
            }
            4 => {
                let addr = self.regs.pop();
                self.addr |= u16::from(bus.read(addr)) << 8;
                self.cycle = 5;
            }
            5 => {
                // RTS returns to the popped address + 1
                let _ = bus.read(self.addr);
                self.regs.pc = self.addr.wrapping_add(1);
                self.finish();
            }
            _ => unreachable!("RTS has no cycle {}", self.cycle),
        }
    }

    fn op_jsr<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                self.addr = u16::from(bus.read(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                // Internal operation (stack read)
                let _ = bus.read(self.regs.stack_addr());
                self.cycle = 3;
            }
            3 => {
                // JSR pushes the address of its own last byte
                let addr = self.regs.push();
                bus.write(addr, (self.regs.pc >> 8) as u8);
                self.cycle = 4;
            }
            4 => {
                let addr = self.regs.push();
                bus.write(addr, self.regs.pc as u8);
                self.cycle = 5;
            }
            5 => {
                self.addr |= u16::from(bus.read(self.regs.pc)) << 8;
                self.regs.pc = self.addr;
                self.finish();
            }
            _ => unreachable!("JSR has no cycle {}", self.cycle),
        }
    }

    fn op_jmp_abs<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                self.addr = u16::from(bus.read(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.addr |= u16::from(bus.read(self.regs.pc)) << 8;
                self.regs.pc = self.addr;
                self.finish();
            }
            _ => unreachable!("JMP abs has no cycle {}", self.cycle),
        }
    }

    fn op_jmp_ind<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                self.addr = u16::from(bus.read(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                self.addr |= u16::from(bus.read(self.regs.pc)) << 8;
                self.cycle = 3;
            }
            3 => {
                self.data = bus.read(self.addr);
                self.cycle = 4;
            }
            4 => {
                // NMOS bug: the pointer's high byte wraps within the page
                let hi_addr = (self.addr & 0xFF00) | (self.addr.wrapping_add(1) & 0x00FF);
                let hi = bus.read(hi_addr);
                self.regs.pc = u16::from(self.data) | (u16::from(hi) << 8);
                self.finish();
            }
            _ => unreachable!("JMP ind has no cycle {}", self.cycle),
        }
    }

    fn op_branch<B: Bus>(&mut self, bus: &mut B, taken: bool) {
        match self.cycle {
            1 => {
                self.data = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                if taken {
                    self.cycle = 2;
                } else {
                    self.finish();
                }
            }
            2 => {
                let _ = bus.read(self.regs.pc);
                let offset = i16::from(self.data as i8);
                let new_pc = (self.regs.pc as i16).wrapping_add(offset) as u16;
                if (new_pc ^ self.regs.pc) & 0xFF00 != 0 {
                    // Page crossed: one more cycle to fix the high byte
                    self.addr = new_pc;
                    self.cycle = 3;
                } else {
                    self.regs.pc = new_pc;
                    self.finish();
                }
            }
            3 => {
                let _ = bus.read((self.regs.pc & 0xFF00) | (self.addr & 0x00FF));
                self.regs.pc = self.addr;
                self.finish();
            }
            _ => unreachable!("branch has no cycle {}", self.cycle),
        }
    }

    fn op_php<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let _ = bus.read(self.regs.pc);
                self.cycle = 2;
            }
            2 => {
                let addr = self.regs.push();
                bus.write(addr, self.regs.p.to_byte_brk());
                self.finish();
            }
            _ => unreachable!("PHP has no cycle {}", self.cycle),
        }
    }

    fn op_plp<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let _ = bus.read(self.regs.pc);
                self.cycle = 2;
            }
            2 => {
                let _ = bus.read(self.regs.stack_addr());
                self.cycle = 3;
            }
            3 => {
                let addr = self.regs.pop();
                self.regs.p = Status::from_byte(bus.read(addr));
                self.finish();
            }
            _ => unreachable!("PLP has no cycle {}", self.cycle),
        }
    }

    fn op_pha<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let _ = bus.read(self.regs.pc);
                self.cycle = 2;
            }
            2 => {
                let addr = self.regs.push();
                bus.write(addr, self.regs.a);
                self.finish();
            }
            _ => unreachable!("PHA has no cycle {}", self.cycle),
        }
    }

    fn op_pla<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                let _ = bus.read(self.regs.pc);
                self.cycle = 2;
            }
            2 => {
                let _ = bus.read(self.regs.stack_addr());
                self.cycle = 3;
            }
            3 => {
                let addr = self.regs.pop();
                self.regs.a = bus.read(addr);
                self.regs.p.update_nz(self.regs.a);
                self.finish();
            }
            _ => unreachable!("PLA has no cycle {}", self.cycle),
        }
    }

    fn op_flag<B: Bus>(&mut self, bus: &mut B, flag: u8, set: bool) {
        if self.cycle == 1 {
            let _ = bus.read(self.regs.pc);
            self.regs.p.set_if(flag, set);
            self.finish();
        }
    }

    fn op_nop<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = bus.read(self.regs.pc);
            self.finish();
        }
    }

    /// JAM: lock up. Only reset recovers; the machine surfaces this.
    fn op_jam<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = bus.read(self.regs.pc);
            self.state = State::Jammed;
        }
    }

    /// TAS: S = A & X, then the SHA-style masked store (abs,Y, 5 cycles).
    fn op_tas<B: Bus>(&mut self, bus: &mut B) {
        match self.cycle {
            1 => {
                self.addr = u16::from(bus.read(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.cycle = 2;
            }
            2 => {
                let hi = bus.read(self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                let lo = (self.addr as u8).wrapping_add(self.regs.y);
                self.addr = u16::from(lo) | (u16::from(hi) << 8);
                self.data = u8::from(lo < self.regs.y);
                self.cycle = 3;
            }
            3 => {
                let _ = bus.read(self.addr);
                if self.data != 0 {
                    self.addr = self.addr.wrapping_add(0x100);
                }
                self.cycle = 4;
            }
            4 => {
                self.regs.s = self.regs.a & self.regs.x;
                let value = self.regs.s & ((self.addr >> 8) as u8).wrapping_add(1);
                bus.write(self.addr, value);
                self.finish();
            }
            _ => unreachable!("TAS has no cycle {}", self.cycle),
        }
    }

    // Transfer instructions
    fn op_tax<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = bus.read(self.regs.pc);
            self.regs.x = self.regs.a;
            self.regs.p.update_nz(self.regs.x);
            self.finish();
        }
    }

    fn op_tay<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = bus.read(self.regs.pc);
            self.regs.y = self.regs.a;
            self.regs.p.update_nz(self.regs.y);
            self.finish();
        }
    }

    fn op_txa<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = bus.read(self.regs.pc);
            self.regs.a = self.regs.x;
            self.regs.p.update_nz(self.regs.a);
            self.finish();
        }
    }

    fn op_tya<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = bus.read(self.regs.pc);
            self.regs.a = self.regs.y;
            self.regs.p.update_nz(self.regs.a);
            self.finish();
        }
    }

    fn op_tsx<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = bus.read(self.regs.pc);
            self.regs.x = self.regs.s;
            self.regs.p.update_nz(self.regs.x);
            self.finish();
        }
    }

    fn op_txs<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = bus.read(self.regs.pc);
            // TXS does not affect flags
            self.regs.s = self.regs.x;
            self.finish();
        }
    }

    // Register increment/decrement
    fn op_inx<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = bus.read(self.regs.pc);
            self.regs.x = self.regs.x.wrapping_add(1);
            self.regs.p.update_nz(self.regs.x);
            self.finish();
        }
    }

    fn op_iny<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = bus.read(self.regs.pc);
            self.regs.y = self.regs.y.wrapping_add(1);
            self.regs.p.update_nz(self.regs.y);
            self.finish();
        }
    }

    fn op_dex<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = bus.read(self.regs.pc);
            self.regs.x = self.regs.x.wrapping_sub(1);
            self.regs.p.update_nz(self.regs.x);
            self.finish();
        }
    }

    fn op_dey<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = bus.read(self.regs.pc);
            self.regs.y = self.regs.y.wrapping_sub(1);
            self.regs.p.update_nz(self.regs.y);
            self.finish();
        }
    }

    // Accumulator shift/rotate
    fn op_asl_a<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = bus.read(self.regs.pc);
            self.regs.a = self.do_asl(self.regs.a);
            self.finish();
        }
    }

    fn op_lsr_a<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = bus.read(self.regs.pc);
            self.regs.a = self.do_lsr(self.regs.a);
            self.finish();
        }
    }

    fn op_rol_a<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = bus.read(self.regs.pc);
            self.regs.a = self.do_rol(self.regs.a);
            self.finish();
        }
    }

    fn op_ror_a<B: Bus>(&mut self, bus: &mut B) {
        if self.cycle == 1 {
            let _ = bus.read(self.regs.pc);
            self.regs.a = self.do_ror(self.regs.a);
            self.finish();
        }
    }
}

// ============================================================================
// Trait implementations
// ============================================================================

impl Cpu for Mos6510 {
    type Registers = Registers;

    fn tick<B: Bus>(&mut self, bus: &mut B) {
        self.execute_cycle(bus);
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }

    fn registers(&self) -> Self::Registers {
        self.regs
    }

    fn is_jammed(&self) -> bool {
        self.state == State::Jammed
    }

    fn set_irq_line(&mut self, asserted: bool) {
        self.irq_line = asserted;
    }

    fn set_nmi_line(&mut self, asserted: bool) {
        if asserted && !self.nmi_line {
            self.nmi_pending = true;
        }
        self.nmi_line = asserted;
    }

    fn reset(&mut self) {
        self.regs = Registers::new();
        self.state = State::FetchOpcode;
        self.opcode = 0;
        self.cycle = 0;
        self.addr = 0;
        self.data = 0;
        self.pointer = 0;
        self.int_vector = 0;
        self.irq_line = false;
        self.nmi_line = false;
        self.nmi_pending = false;
        // The caller loads PC from the reset vector at $FFFC/$FFFD
    }
}

impl Observable for Mos6510 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "pc" => Some(self.regs.pc.into()),
            "a" => Some(self.regs.a.into()),
            "x" => Some(self.regs.x.into()),
            "y" => Some(self.regs.y.into()),
            "s" | "sp" => Some(self.regs.s.into()),
            "p" | "status" => Some(self.regs.p.0.into()),
            "flags.c" | "c" => Some(self.regs.p.is_set(C).into()),
            "flags.z" | "z" => Some(self.regs.p.is_set(Z).into()),
            "flags.i" | "i" => Some(self.regs.p.is_set(I).into()),
            "flags.d" | "d" => Some(self.regs.p.is_set(D).into()),
            "flags.b" | "b" => Some(self.regs.p.is_set(crate::flags::B).into()),
            "flags.v" | "v" => Some(self.regs.p.is_set(V).into()),
            "flags.n" | "n" => Some(self.regs.p.is_set(N).into()),
            "cycle" => Some(Value::U64(self.total_cycles)),
            "jammed" => Some(self.is_jammed().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc", "a", "x", "y", "s", "p", "flags.c", "flags.z", "flags.i", "flags.d", "flags.v",
            "flags.n", "cycle", "jammed",
        ]
    }
}
