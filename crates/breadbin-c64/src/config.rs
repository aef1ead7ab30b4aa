//! C64 configuration: model selection, ROM images, load-time validation.

use std::error::Error;
use std::fmt;

/// Kernal ROM size in bytes.
pub const KERNAL_ROM_SIZE: usize = 8192;

/// BASIC ROM size in bytes.
pub const BASIC_ROM_SIZE: usize = 8192;

/// Character generator ROM size in bytes.
pub const CHAR_ROM_SIZE: usize = 4096;

/// C64 model variant. Selects CPU frequency and raster geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C64Model {
    /// PAL C64 (6569 VIC-II): 985,248 Hz, 312 lines x 63 cycles.
    C64Pal,
    /// NTSC C64 (6567 VIC-II): 1,022,727 Hz, 263 lines x 65 cycles.
    C64Ntsc,
}

impl C64Model {
    /// CPU clock frequency in Hz.
    #[must_use]
    pub const fn cpu_frequency(self) -> u64 {
        match self {
            Self::C64Pal => 985_248,
            Self::C64Ntsc => 1_022_727,
        }
    }

    /// Raster lines per frame.
    #[must_use]
    pub const fn lines_per_frame(self) -> u16 {
        match self {
            Self::C64Pal => 312,
            Self::C64Ntsc => 263,
        }
    }

    /// CPU cycles per raster line.
    #[must_use]
    pub const fn cycles_per_line(self) -> u8 {
        match self {
            Self::C64Pal => 63,
            Self::C64Ntsc => 65,
        }
    }

    /// CPU cycles per TOD tenth-of-a-second tick.
    #[must_use]
    pub const fn tod_divider(self) -> u32 {
        match self {
            Self::C64Pal => 98_525,
            Self::C64Ntsc => 102_273,
        }
    }
}

/// Configuration for constructing a C64 instance.
///
/// The three ROM images must be supplied before the first cycle; sizes
/// are validated at construction and wrong-sized images are rejected
/// rather than padded or truncated.
pub struct C64Config {
    /// Model variant.
    pub model: C64Model,
    /// Kernal ROM (8,192 bytes, mapped at $E000-$FFFF).
    pub kernal_rom: Vec<u8>,
    /// BASIC ROM (8,192 bytes, mapped at $A000-$BFFF).
    pub basic_rom: Vec<u8>,
    /// Character ROM (4,096 bytes, CPU-visible at $D000-$DFFF).
    pub char_rom: Vec<u8>,
}

/// A configuration problem detected before the first cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A ROM image has the wrong size.
    RomSize {
        /// Which ROM ("kernal", "basic", "chargen").
        rom: &'static str,
        /// Required size in bytes.
        expected: usize,
        /// Size of the supplied image.
        actual: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RomSize {
                rom,
                expected,
                actual,
            } => write!(f, "{rom} ROM must be {expected} bytes, got {actual}"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pal_geometry() {
        let m = C64Model::C64Pal;
        assert_eq!(m.cpu_frequency(), 985_248);
        assert_eq!(u32::from(m.lines_per_frame()) * u32::from(m.cycles_per_line()), 19_656);
    }

    #[test]
    fn ntsc_geometry() {
        let m = C64Model::C64Ntsc;
        assert_eq!(m.lines_per_frame(), 263);
        assert_eq!(m.cycles_per_line(), 65);
    }

    #[test]
    fn error_names_rom_and_sizes() {
        let err = ConfigError::RomSize {
            rom: "kernal",
            expected: 8192,
            actual: 100,
        };
        assert_eq!(err.to_string(), "kernal ROM must be 8192 bytes, got 100");
    }
}
