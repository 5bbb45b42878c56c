//! Error taxonomy for ROM loading, cartridge validation, and bus faults.
//!
//! Matches the reference engine's style: a single hand-rolled enum with
//! `Display`/`Error` impls, no `thiserror`/`anyhow` dependency.

use std::fmt;

/// Errors the core can return. Runtime CPU faults (bus errors) are delivered
/// as emulated 68k exceptions through the bus interrupt machinery, not as
/// `Result`s — only load-time and construction-time failures appear here.
#[derive(Debug)]
pub enum CoreError {
    /// A required BIOS file (system ROM, SFIX, Y-zoom table) could not be
    /// loaded; `init` returns this without mutating any state.
    BiosMissing(String),

    /// The cartridge ROM set is missing a required file, failed the
    /// `"NEO-GEO"` header marker check, or has mismatched C-ROM pair sizes.
    InvalidCart(String),

    /// The `cart::from_zip_archive` convenience's own wrapped `zip` crate
    /// error. Kept distinct from `InvalidCart` so callers can tell a
    /// malformed archive from a well-formed but incomplete one.
    ZipArchive(String),

    /// Underlying I/O failure reading ROM files from disk.
    Io(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BiosMissing(msg) => write!(f, "BIOS missing: {msg}"),
            Self::InvalidCart(msg) => write!(f, "invalid cartridge: {msg}"),
            Self::ZipArchive(msg) => write!(f, "zip archive error: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<crate::rom_loader::RomLoadError> for CoreError {
    fn from(e: crate::rom_loader::RomLoadError) -> Self {
        Self::InvalidCart(e.to_string())
    }
}
