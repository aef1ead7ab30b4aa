//! Top-level C64 machine.
//!
//! The master clock ticks at CPU cycle rate (985,248 Hz PAL). One frame
//! is 312 lines x 63 cycles = 19,656 cycles (263 x 65 NTSC). Each tick
//! advances the whole machine exactly one cycle, in a fixed order:
//!
//! 1. VIC-II: render 8 pixels, advance the beam, decide bus ownership
//! 2. CIA1 and CIA2: count timers, tick TOD
//! 3. Interrupt lines: recomputed from live chip state, never cached
//! 4. CPU: one cycle, unless the VIC stole the bus
//!
//! The video chip's steal decision for a cycle is therefore always
//! resolved before the CPU's access in that same cycle, and the CPU
//! samples interrupt lines that are at most one tick old — i.e. the
//! state the chips drove during this very cycle.

use breadbin_core::{Cpu, Observable, Tickable, Value};
use mos_6510::Mos6510;

use crate::bus::C64Bus;
use crate::config::{C64Config, ConfigError};
use crate::keyboard::JoystickState;
use crate::memory::C64Memory;

/// Which control port a joystick is plugged into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoystickPort {
    /// Control port 1 (shares CIA1 port B with the keyboard rows).
    Port1,
    /// Control port 2 (shares CIA1 port A with the column selects).
    Port2,
}

/// A complete C64: CPU, bus, and master clock.
#[derive(Debug)]
pub struct C64 {
    cpu: Mos6510,
    bus: C64Bus,
    /// Master clock, in CPU cycles since construction.
    master_clock: u64,
    /// Completed frame count.
    frame_count: u64,
    /// A JAM is logged once, not every cycle.
    jam_reported: bool,
}

impl C64 {
    /// Build a machine from the given configuration.
    ///
    /// ROM images are validated here, before the first cycle; the CPU
    /// starts at the Kernal reset vector. Construction is
    /// initialization — a `C64` that exists can be stepped.
    pub fn new(config: &C64Config) -> Result<Self, ConfigError> {
        let memory = C64Memory::new(config)?;
        let mut bus = C64Bus::new(memory, config.model);

        // CIA1 comes up scanning the keyboard: port A drives columns,
        // port B senses rows (the Kernal programs the same state).
        bus.cia1.write(0x02, 0xFF);
        bus.cia1.write(0x03, 0x00);
        bus.cia1.write(0x00, 0xFF);

        // CIA2 port A bits 0-1 select VIC bank 0 (%11 inverted).
        bus.cia2.write(0x02, 0x03);
        bus.cia2.write(0x00, 0x03);
        bus.update_vic_bank();

        let mut cpu = Mos6510::new();
        let pc = Self::reset_vector(&bus.memory);
        cpu.force_pc(pc);
        log::debug!("c64: power-on, reset vector ${pc:04X}");

        Ok(Self {
            cpu,
            bus,
            master_clock: 0,
            frame_count: 0,
            jam_reported: false,
        })
    }

    fn reset_vector(memory: &C64Memory) -> u16 {
        let lo = memory.cpu_read(0xFFFC);
        let hi = memory.cpu_read(0xFFFD);
        u16::from(lo) | (u16::from(hi) << 8)
    }

    /// Hardware reset: CPU registers to documented power-on values, the
    /// bank latch to its default, chips to their register-clear state,
    /// PC reloaded from the reset vector. RAM is preserved, as on the
    /// real machine. Idempotent — two resets leave identical state.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.bus.memory.reset_port();
        self.bus.vic.reset();
        self.bus.cia1.reset();
        self.bus.cia2.reset();
        self.bus.sid.reset();
        self.bus.update_vic_bank();
        self.jam_reported = false;

        let pc = Self::reset_vector(&self.bus.memory);
        self.cpu.force_pc(pc);
        log::debug!("c64: reset, vector ${pc:04X}");
    }

    /// Run the machine for `cycles` master clock cycles.
    pub fn run(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.tick();
        }
    }

    /// Run until the VIC signals frame completion. Returns the number
    /// of cycles consumed.
    pub fn run_frame(&mut self) -> u64 {
        self.frame_count += 1;
        let start = self.master_clock;
        loop {
            self.tick();
            if self.bus.vic.take_frame_complete() {
                break;
            }
        }
        self.master_clock - start
    }

    /// Level of the maskable interrupt line (VIC or CIA1).
    #[must_use]
    pub fn irq_line(&self) -> bool {
        self.bus.vic.irq_active() || self.bus.cia1.irq_active()
    }

    /// Level of the non-maskable interrupt line (CIA2).
    #[must_use]
    pub fn nmi_line(&self) -> bool {
        self.bus.cia2.irq_active()
    }

    /// Whether the last tick produced display-visible pixels.
    #[must_use]
    pub fn cycle_was_visible(&self) -> bool {
        self.bus.vic.last_cycle_visible()
    }

    /// The colour-index frame buffer.
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        self.bus.vic.framebuffer()
    }

    /// Frame buffer width in pixels.
    #[must_use]
    pub fn framebuffer_width(&self) -> u32 {
        self.bus.vic.framebuffer_width()
    }

    /// Frame buffer height in pixels.
    #[must_use]
    pub fn framebuffer_height(&self) -> u32 {
        self.bus.vic.framebuffer_height()
    }

    /// Reference to the CPU.
    #[must_use]
    pub fn cpu(&self) -> &Mos6510 {
        &self.cpu
    }

    /// Mutable reference to the CPU.
    pub fn cpu_mut(&mut self) -> &mut Mos6510 {
        &mut self.cpu
    }

    /// Reference to the bus.
    #[must_use]
    pub fn bus(&self) -> &C64Bus {
        &self.bus
    }

    /// Mutable reference to the bus.
    pub fn bus_mut(&mut self) -> &mut C64Bus {
        &mut self.bus
    }

    /// Master clock tick count.
    #[must_use]
    pub fn master_clock(&self) -> u64 {
        self.master_clock
    }

    /// Completed frame count.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Press the key at a matrix position.
    pub fn press_key(&mut self, col: u8, row: u8) {
        self.bus.keyboard.set_key(col, row, true);
    }

    /// Release the key at a matrix position.
    pub fn release_key(&mut self, col: u8, row: u8) {
        self.bus.keyboard.set_key(col, row, false);
    }

    /// Release every key.
    pub fn release_all_keys(&mut self) {
        self.bus.keyboard.release_all();
    }

    /// Update a joystick. Port 2 pulls CIA1 port A lines, port 1 pulls
    /// CIA1 port B lines, both active low.
    pub fn set_joystick(&mut self, port: JoystickPort, state: JoystickState) {
        match port {
            JoystickPort::Port1 => self.bus.cia1.external_b = state.port_lines(),
            JoystickPort::Port2 => self.bus.cia1.external_a = state.port_lines(),
        }
    }
}

impl Tickable for C64 {
    fn tick(&mut self) {
        self.master_clock += 1;

        // 1. Video first: the bus-steal decision for this cycle
        let stalled = self.bus.vic.tick(&self.bus.memory);

        // 2. Timers
        self.bus.cia1.tick();
        self.bus.cia2.tick();

        // 3. Interrupt lines, recomputed from live chip state
        self.cpu
            .set_irq_line(self.bus.vic.irq_active() || self.bus.cia1.irq_active());
        self.cpu.set_nmi_line(self.bus.cia2.irq_active());

        // 4. CPU, unless the VIC owns the bus this cycle
        if !stalled {
            self.cpu.tick(&mut self.bus);
            if self.cpu.is_jammed() && !self.jam_reported {
                self.jam_reported = true;
                log::warn!("c64: CPU jammed at ${:04X}", self.cpu.pc());
            }
        }
    }
}

impl Observable for C64 {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("cpu.") {
            self.cpu.query(rest)
        } else if let Some(rest) = path.strip_prefix("vic.") {
            match rest {
                "line" => Some(self.bus.vic.raster_line().into()),
                "cycle" => Some(u16::from(self.bus.vic.raster_cycle()).into()),
                "badline" => Some(self.bus.vic.is_badline().into()),
                "bank" => Some(self.bus.vic.bank().into()),
                "irq" => Some(self.bus.vic.irq_active().into()),
                _ => rest
                    .strip_prefix("reg.")
                    .and_then(|r| r.parse::<u8>().ok())
                    .map(|r| self.bus.vic.peek(r).into()),
            }
        } else if let Some(rest) = path.strip_prefix("cia1.") {
            Self::query_cia(&self.bus.cia1, rest)
        } else if let Some(rest) = path.strip_prefix("cia2.") {
            Self::query_cia(&self.bus.cia2, rest)
        } else if let Some(rest) = path.strip_prefix("memory.") {
            let addr = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix('$'))
            {
                u16::from_str_radix(hex, 16).ok()
            } else {
                rest.parse().ok()
            };
            addr.map(|a| self.bus.peek(a).into())
        } else {
            match path {
                "master_clock" => Some(self.master_clock.into()),
                "frame_count" => Some(self.frame_count.into()),
                "irq_line" => Some(self.irq_line().into()),
                "nmi_line" => Some(self.nmi_line().into()),
                _ => self.cpu.query(path),
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "cpu.<register or flag>",
            "vic.line",
            "vic.cycle",
            "vic.badline",
            "vic.bank",
            "vic.irq",
            "vic.reg.<n>",
            "cia{1,2}.timer_a",
            "cia{1,2}.timer_b",
            "cia{1,2}.icr_status",
            "cia{1,2}.icr_mask",
            "cia{1,2}.cra",
            "cia{1,2}.crb",
            "memory.<address>",
            "master_clock",
            "frame_count",
            "irq_line",
            "nmi_line",
        ]
    }
}

impl C64 {
    fn query_cia(cia: &crate::cia::Cia, path: &str) -> Option<Value> {
        match path {
            "timer_a" => Some(cia.timer_a().into()),
            "timer_b" => Some(cia.timer_b().into()),
            "icr_status" => Some(cia.icr_status().into()),
            "icr_mask" => Some(cia.icr_mask().into()),
            "cra" => Some(cia.cra().into()),
            "crb" => Some(cia.crb().into()),
            _ => None,
        }
    }
}
