//! Neo Geo (AES/MVS) system core: memory map, video raster, YM2610 sound
//! model, and the frame orchestrator tying them to a host-supplied pair of
//! 68000/Z80 decoders.

pub mod bios;
pub mod bus;
pub mod cart;
pub mod clock;
pub mod error;
pub mod io;
pub mod orchestrator;
pub mod ram;
pub mod rom_loader;
pub mod rtc;
pub mod sound;
pub mod system;
pub mod timer;
pub mod video;

pub use bus::{BusFault, MainBus};
pub use error::CoreError;
pub use io::BoardType;
pub use orchestrator::NeoGeoSystem;
pub use rom_loader::{RomLoadError, RomSet};
