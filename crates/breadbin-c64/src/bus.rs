//! C64 system bus: address decoding and I/O routing.
//!
//! Implements `breadbin_core::Bus` over the banking logic in
//! [`C64Memory`] and the chip register blocks. The C64 is fully
//! memory-mapped; all 65,536 addresses resolve to something in every
//! bank configuration.
//!
//! Registers with read side effects (CIA ICR at $xD, CIA TOD latching
//! at $x8/$xB, VIC collision latches at $D01E/$D01F) go through the
//! chips' `read` paths; `peek` bypasses them for monitors.

use breadbin_core::Bus;

use crate::cia::Cia;
use crate::config::C64Model;
use crate::keyboard::KeyboardMatrix;
use crate::memory::C64Memory;
use crate::sid::Sid;
use crate::vic::Vic;

/// The C64 bus. Owns every chip; the CPU reaches them only through the
/// `Bus` trait.
#[derive(Debug)]
pub struct C64Bus {
    pub memory: C64Memory,
    pub vic: Vic,
    pub sid: Sid,
    pub cia1: Cia,
    pub cia2: Cia,
    pub keyboard: KeyboardMatrix,
}

impl C64Bus {
    #[must_use]
    pub fn new(memory: C64Memory, model: C64Model) -> Self {
        let tod_divider = model.tod_divider();
        Self {
            memory,
            vic: Vic::new(model),
            sid: Sid::new(),
            cia1: Cia::new(tod_divider),
            cia2: Cia::new(tod_divider),
            keyboard: KeyboardMatrix::new(),
        }
    }

    /// Propagate CIA2 port A bits 0-1 (inverted) into the VIC bank.
    pub fn update_vic_bank(&mut self) {
        let pa = self.cia2.port_a_output();
        self.vic.set_bank(!pa & 0x03);
    }

    /// Banking-aware read with no side effects, for debuggers and
    /// snapshot builders.
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        if (0xD000..=0xDFFF).contains(&addr) && self.memory.is_io_visible() {
            return match addr {
                0xD000..=0xD3FF => self.vic.peek((addr & 0x3F) as u8),
                0xD400..=0xD7FF => self.sid.peek((addr & 0x1F) as u8),
                0xD800..=0xDBFF => self.memory.colour_ram_read(addr - 0xD800),
                0xDC00..=0xDCFF => self.cia1.peek((addr & 0x0F) as u8),
                0xDD00..=0xDDFF => self.cia2.peek((addr & 0x0F) as u8),
                _ => 0xFF,
            };
        }
        self.memory.peek(addr)
    }
}

impl Bus for C64Bus {
    fn read(&mut self, addr: u16) -> u8 {
        if (0xD000..=0xDFFF).contains(&addr) && self.memory.is_io_visible() {
            return match addr {
                0xD000..=0xD3FF => self.vic.read((addr & 0x3F) as u8),
                0xD400..=0xD7FF => self.sid.read((addr & 0x1F) as u8),
                0xD800..=0xDBFF => self.memory.colour_ram_read(addr - 0xD800),
                0xDC00..=0xDCFF => {
                    self.cia1
                        .read_with_keyboard((addr & 0x0F) as u8, &self.keyboard)
                }
                0xDD00..=0xDDFF => self.cia2.read((addr & 0x0F) as u8),
                // Expansion port I/O: nothing connected, open bus
                _ => 0xFF,
            };
        }
        self.memory.cpu_read(addr)
    }

    fn write(&mut self, addr: u16, value: u8) {
        if (0xD000..=0xDFFF).contains(&addr) && self.memory.is_io_visible() {
            match addr {
                0xD000..=0xD3FF => self.vic.write((addr & 0x3F) as u8, value),
                0xD400..=0xD7FF => self.sid.write((addr & 0x1F) as u8, value),
                0xD800..=0xDBFF => self.memory.colour_ram_write(addr - 0xD800, value),
                0xDC00..=0xDCFF => self.cia1.write((addr & 0x0F) as u8, value),
                0xDD00..=0xDDFF => {
                    let reg = (addr & 0x0F) as u8;
                    self.cia2.write(reg, value);
                    // Port A or its DDR moves the VIC bank
                    if reg == 0x00 || reg == 0x02 {
                        self.update_vic_bank();
                    }
                }
                // Expansion port I/O: discarded
                _ => {}
            }
            return;
        }
        self.memory.cpu_write(addr, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::C64Config;

    fn make_bus() -> C64Bus {
        let config = C64Config {
            model: C64Model::C64Pal,
            kernal_rom: vec![0xEE; 8192],
            basic_rom: vec![0xBB; 8192],
            char_rom: vec![0xCC; 4096],
        };
        let memory = C64Memory::new(&config).expect("valid ROMs");
        C64Bus::new(memory, C64Model::C64Pal)
    }

    #[test]
    fn ram_read_write() {
        let mut bus = make_bus();
        bus.write(0x8000, 0xAB);
        assert_eq!(bus.read(0x8000), 0xAB);
    }

    #[test]
    fn roms_visible_in_default_banking() {
        let mut bus = make_bus();
        assert_eq!(bus.read(0xA000), 0xBB);
        assert_eq!(bus.read(0xE000), 0xEE);
    }

    #[test]
    fn rom_write_does_not_change_readback() {
        let mut bus = make_bus();
        bus.write(0xE123, 0x42);
        assert_eq!(bus.read(0xE123), 0xEE, "Kernal ROM still answers");
    }

    #[test]
    fn vic_register_roundtrip() {
        let mut bus = make_bus();
        bus.write(0xD020, 0x06);
        assert_eq!(bus.read(0xD020) & 0x0F, 0x06);
    }

    #[test]
    fn vic_registers_mirror_every_64_bytes() {
        let mut bus = make_bus();
        bus.write(0xD040, 0x07); // Mirror of $D000 (sprite 0 X)
        assert_eq!(bus.read(0xD000), 0x07);
    }

    #[test]
    fn colour_ram_access() {
        let mut bus = make_bus();
        bus.write(0xD800, 0x05);
        assert_eq!(bus.read(0xD800), 0x05);
    }

    #[test]
    fn cia1_register_access() {
        let mut bus = make_bus();
        bus.write(0xDC02, 0xFF);
        assert_eq!(bus.read(0xDC02), 0xFF);
    }

    #[test]
    fn cia2_port_a_selects_vic_bank() {
        let mut bus = make_bus();
        bus.write(0xDD02, 0x03); // DDR: bits 0-1 output
        bus.write(0xDD00, 0x01); // %01 inverted → bank 2
        assert_eq!(bus.vic.bank(), 2);
    }

    #[test]
    fn io_hidden_when_banked_out() {
        let mut bus = make_bus();
        bus.write(0xD020, 0x06);
        bus.write(0x8000, 0x00); // RAM scribble, unrelated

        // All-RAM configuration: $D000 area is plain RAM now
        bus.write(0x0001, 0x30);
        bus.write(0xD020, 0x55);
        assert_eq!(bus.read(0xD020), 0x55, "plain RAM when I/O banked out");

        // Back to I/O: the register still holds its value, the RAM
        // write did not leak into the VIC
        bus.write(0x0001, 0x37);
        assert_eq!(bus.read(0xD020) & 0x0F, 0x06);
    }

    #[test]
    fn expansion_io_reads_open_bus() {
        let mut bus = make_bus();
        assert_eq!(bus.read(0xDE00), 0xFF);
        assert_eq!(bus.read(0xDF80), 0xFF);
        bus.write(0xDE00, 0x12); // Discarded
        assert_eq!(bus.read(0xDE00), 0xFF);
    }

    #[test]
    fn peek_does_not_clear_cia_icr() {
        let mut bus = make_bus();
        // Run a tiny timer to underflow
        bus.write(0xDC04, 2);
        bus.write(0xDC05, 0);
        bus.write(0xDC0E, 0x01);
        bus.cia1.tick();
        bus.cia1.tick();

        assert_ne!(bus.peek(0xDC0D) & 0x01, 0);
        assert_ne!(bus.peek(0xDC0D) & 0x01, 0, "peek preserves status");
        assert_ne!(bus.read(0xDC0D) & 0x01, 0);
        assert_eq!(bus.read(0xDC0D) & 0x1F, 0, "read cleared status");
    }
}
