//! Cycle-accurate Commodore 64 core.
//!
//! An embeddable execution core: CPU, bus with memory banking, VIC-II
//! raster engine and two CIA timer chips, stepped in lockstep by a
//! single master clock at CPU cycle rate. Frontends feed it ROM images
//! and input events and consume the colour-index frame buffer; nothing
//! here touches files, windows or wall-clock time.

mod bus;
mod c64;
mod cia;
pub mod config;
mod keyboard;
mod memory;
pub mod palette;
mod sid;
mod vic;

pub use bus::C64Bus;
pub use c64::{C64, JoystickPort};
pub use cia::Cia;
pub use config::{C64Config, C64Model, ConfigError};
pub use keyboard::{JoystickState, KeyboardMatrix};
pub use memory::C64Memory;
pub use sid::Sid;
pub use vic::Vic;
