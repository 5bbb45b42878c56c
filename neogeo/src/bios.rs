//! BIOS asset bundle: system ROM (alternative vector table + OS), SFIX ROM
//! (BIOS fix-tile source), and the Y-zoom ROM (vertical-shrink lookup
//! table). Loaded once at `init()` time and held for the session; ROM
//! archive extraction itself is a host concern (see [`crate::cart`] for the
//! matching cartridge-side convenience), so this module only assembles a
//! [`BiosSet`] from an already-open [`RomSet`].

use crate::error::CoreError;
use crate::rom_loader::RomSet;

/// Size of the Y-zoom ROM: indexed by `zoomY*256 + scanline`.
pub const Y_ZOOM_ROM_SIZE: usize = 64 * 1024;

/// BIOS-supplied ROMs, held for the life of the session.
pub struct BiosSet {
    /// Alternative vector table + BIOS program, mapped at `0xC00000`.
    pub system_rom: Vec<u8>,
    /// BIOS fix-tile source, selected in place of the cartridge's S-ROM
    /// when `RomSource::Bios` is active.
    pub sfix_rom: Vec<u8>,
    /// 64 KiB vertical-shrink lookup table.
    pub y_zoom_rom: Vec<u8>,
    /// Board-type identification byte read from `system_rom[0x400]` at load
    /// time (0 = Asia/Japan MVS, other values used by region-locked BIOS
    /// variants). Surfaced read-only to the host; the core itself decides
    /// AES-vs-MVS behavior from the constructor's `BoardType` argument, not
    /// from this byte.
    pub board_type_byte: u8,
    /// Board-nationality identification byte read from `system_rom[0x401]`.
    pub nationality_byte: u8,
}

/// Find the first file whose stem (case-insensitive) starts with any of
/// `prefixes`, sorted so multi-file sets concatenate deterministically.
fn concat_by_prefixes(roms: &RomSet, prefixes: &[&str]) -> Option<Vec<u8>> {
    let mut names: Vec<&str> = roms
        .file_names()
        .into_iter()
        .filter(|n| {
            let stem = n.rsplit('/').next().unwrap_or(n).to_ascii_lowercase();
            prefixes.iter().any(|p| stem.starts_with(p))
        })
        .collect();
    if names.is_empty() {
        return None;
    }
    names.sort();
    let mut out = Vec::new();
    for name in names {
        out.extend_from_slice(roms.get(name).unwrap_or(&[]));
    }
    Some(out)
}

/// Assemble a [`BiosSet`] from a [`RomSet`] produced however the host likes
/// (a directory of loose files, or [`crate::cart::from_zip_archive`]
/// pointed at a BIOS archive rather than a cart).
///
/// Name matching follows the MAME "neogeo.zip" convention: the system ROM
/// is the `sp-*`/`sp1*` file, SFIX is `sfix*`, and the Y-zoom table is
/// `000-lo*` (both names the BIOS set ships under in practice).
pub fn load_bios(roms: &RomSet) -> Result<BiosSet, CoreError> {
    let system_rom = concat_by_prefixes(roms, &["sp-s", "sp1", "sp-", "system"])
        .ok_or_else(|| CoreError::BiosMissing("no system ROM (sp-s2.sp1) found".into()))?;
    let sfix_rom = concat_by_prefixes(roms, &["sfix", "sfix.sfix"])
        .ok_or_else(|| CoreError::BiosMissing("no SFIX ROM found".into()))?;
    let mut y_zoom_rom = concat_by_prefixes(roms, &["000-lo", "yzoom", "lo.lo"])
        .ok_or_else(|| CoreError::BiosMissing("no Y-zoom ROM (000-lo.lo) found".into()))?;
    y_zoom_rom.resize(Y_ZOOM_ROM_SIZE, 0);

    let board_type_byte = system_rom.get(0x400).copied().unwrap_or(0);
    let nationality_byte = system_rom.get(0x401).copied().unwrap_or(0);

    Ok(BiosSet {
        system_rom,
        sfix_rom,
        y_zoom_rom,
        board_type_byte,
        nationality_byte,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_bios_rejects_missing_system_rom() {
        let roms = RomSet::from_slices(&[("sfix.sfix", &[0u8; 16]), ("000-lo.lo", &[0u8; 16])]);
        let result = load_bios(&roms);
        assert!(matches!(result, Err(CoreError::BiosMissing(_))));
    }

    #[test]
    fn load_bios_assembles_all_three_roms() {
        let roms = RomSet::from_slices(&[
            ("sp-s2.sp1", &[0xAA; 128]),
            ("sfix.sfix", &[0xBB; 128]),
            ("000-lo.lo", &[0xCC; 128]),
        ]);
        let bios = load_bios(&roms).expect("should load");
        assert_eq!(bios.system_rom, vec![0xAA; 128]);
        assert_eq!(bios.sfix_rom, vec![0xBB; 128]);
        assert_eq!(bios.y_zoom_rom.len(), Y_ZOOM_ROM_SIZE);
        assert_eq!(bios.y_zoom_rom[0], 0xCC);
    }

    #[test]
    fn load_bios_reads_board_identification_bytes() {
        let mut sp = vec![0xAAu8; 1024];
        sp[0x400] = 0x00;
        sp[0x401] = 0x01;
        let roms = RomSet::from_slices(&[
            ("sp-s2.sp1", &sp),
            ("sfix.sfix", &[0xBB; 128]),
            ("000-lo.lo", &[0xCC; 128]),
        ]);
        let bios = load_bios(&roms).expect("should load");
        assert_eq!(bios.board_type_byte, 0x00);
        assert_eq!(bios.nationality_byte, 0x01);
    }
}
