//! Cartridge model: P/S/C/M1/V-ROM storage and the ZIP-to-[`RomSet`]
//! convenience helper.
//!
//! ROM archive extraction is out of the core's required surface (per the
//! design doc, collaborators normally hand the core an in-memory
//! [`RomSet`]), but `from_zip_archive` is kept as a thin, separately
//! testable convenience matching how most hosts will actually source a
//! cartridge.

use std::io::{Cursor, Read};

use crate::error::CoreError;
use crate::rom_loader::RomSet;

/// Size of one P-ROM bank (bank 1, and each bank-2 candidate).
pub const PROM_BANK_SIZE: usize = 1024 * 1024;
/// Maximum number of bank-2 candidates the bank-select register can address.
pub const MAX_BANK2_CANDIDATES: usize = 4;

/// Bytes per serialized sprite tile: 16 rows of 8 bytes (16 pixels, 4bpp).
/// The hot blit addresses this linearly as `tile_index * TILE_STRIDE +
/// (tile_line & 0xF) * 8 + (i / 2)` — see DESIGN.md for why the low nibble
/// of `tile_line` is the one that indexes storage.
pub const TILE_STRIDE: usize = 128;

/// A fully loaded and validated cartridge.
pub struct Cartridge {
    /// Permanently-mapped first megabyte of program ROM.
    pub p_rom_bank1: Vec<u8>,
    /// Up to four 1 MiB candidates selectable via the bank-2 register.
    pub p_rom_bank2_candidates: Vec<Vec<u8>>,
    /// Currently selected bank-2 candidate index.
    pub p_rom_bank2_selected: usize,
    /// Fix-tile (8x8 text layer) ROM, 32 bytes/tile column-interleaved.
    pub s_rom: Vec<u8>,
    /// Pre-serialized sprite tiles, linear 4bpp row-major, `TILE_STRIDE`
    /// bytes per tile (see module docs).
    pub c_rom: Vec<u8>,
    /// Sound-CPU (Z80) program ROM.
    pub m1_rom: Vec<u8>,
    /// ADPCM-A sample ROM.
    pub v1_rom: Vec<u8>,
    /// ADPCM-B (DELTA-T) sample ROM.
    pub v2_rom: Vec<u8>,
    /// Neo Geo House code, decoded from BCD at P-ROM offset 0x108.
    pub ngh: u16,
}

impl Cartridge {
    pub fn p_rom_bank2(&self) -> &[u8] {
        self.p_rom_bank2_candidates
            .get(self.p_rom_bank2_selected)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Apply a bank-2 swap: `n` in `0..4` selects candidate `n+1`'s data, per
    /// the hardware quirk that the bank-select register's low byte is one
    /// less than the candidate index it addresses into the concatenated
    /// P-ROM (candidate 0 of `p_rom_bank2_candidates` is itself "bank 2";
    /// writing `n` selects the `(n+1)`th chunk of the overflow P-ROM).
    pub fn select_bank2(&mut self, n: u8) {
        let idx = n as usize;
        if idx < self.p_rom_bank2_candidates.len() {
            self.p_rom_bank2_selected = idx;
        }
    }
}

/// Validate and assemble a [`Cartridge`] from a named blob set.
///
/// Required files: at least one `p*` entry, one `s*` entry, a pair of `c*`
/// entries (odd/even), and `m1`. `v1`/`v2` are optional (silent games exist).
pub fn load_cart(roms: &RomSet) -> Result<Cartridge, CoreError> {
    let p_rom = concat_sorted(roms, 'p')
        .ok_or_else(|| CoreError::InvalidCart("no P-ROM files found".into()))?;
    let s_rom = concat_sorted(roms, 's')
        .ok_or_else(|| CoreError::InvalidCart("no S-ROM files found".into()))?;
    let m1_rom = concat_sorted(roms, 'm')
        .ok_or_else(|| CoreError::InvalidCart("no M1-ROM file found".into()))?;
    let v2_rom = concat_sorted_prefix(roms, "v2").unwrap_or_default();
    let v1_rom = concat_sorted_prefix(roms, "v1").unwrap_or_default();

    let (c_odd, c_even) = collect_c_rom_pair(roms)
        .ok_or_else(|| CoreError::InvalidCart("no C-ROM pair found".into()))?;
    if c_odd.len() != c_even.len() {
        return Err(CoreError::InvalidCart(
            "C-ROM odd/even pair length mismatch".into(),
        ));
    }

    let p_rom = byte_swap_if_needed(p_rom);

    if p_rom.len() < 0x109 {
        return Err(CoreError::InvalidCart(
            "P-ROM too small to contain header".into(),
        ));
    }
    if &p_rom[0x100..0x107] != b"NEO-GEO" {
        return Err(CoreError::InvalidCart(
            "missing \"NEO-GEO\" header marker at P-ROM offset 0x100".into(),
        ));
    }
    let ngh = bcd_u16(p_rom[0x108], p_rom[0x109.min(p_rom.len() - 1)]);

    let (bank1, bank2_candidates) = split_p_rom(&p_rom);
    let c_rom = serialize_c_rom(&c_odd, &c_even);

    Ok(Cartridge {
        p_rom_bank1: bank1,
        p_rom_bank2_candidates: bank2_candidates,
        p_rom_bank2_selected: 0,
        s_rom,
        c_rom,
        m1_rom,
        v1_rom,
        v2_rom,
        ngh,
    })
}

/// Decode a 2-byte BCD game code (`0x12 0x34` -> `1234`).
fn bcd_u16(hi: u8, lo: u8) -> u16 {
    let digit = |b: u8| (((b >> 4) & 0xF) as u16) * 10 + (b & 0xF) as u16;
    digit(hi) * 100 + digit(lo)
}

/// P-ROMs are stored big-endian; the loader's byte-swap pass is a no-op when
/// the first word already reads `0x0010` (the M68k reset-SP MSW).
fn byte_swap_if_needed(mut data: Vec<u8>) -> Vec<u8> {
    if data.len() >= 2 && (data[0], data[1]) != (0x00, 0x10) {
        let mut i = 0;
        while i + 1 < data.len() {
            data.swap(i, i + 1);
            i += 2;
        }
    }
    data
}

/// Split concatenated P-ROM data into a fixed 1 MiB bank-1 and up to four
/// 1 MiB bank-2 candidates.
fn split_p_rom(data: &[u8]) -> (Vec<u8>, Vec<Vec<u8>>) {
    let mut bank1 = vec![0u8; PROM_BANK_SIZE];
    let n1 = data.len().min(PROM_BANK_SIZE);
    bank1[..n1].copy_from_slice(&data[..n1]);

    let mut candidates = Vec::new();
    let mut offset = PROM_BANK_SIZE;
    while offset < data.len() && candidates.len() < MAX_BANK2_CANDIDATES {
        let end = (offset + PROM_BANK_SIZE).min(data.len());
        let mut chunk = vec![0u8; PROM_BANK_SIZE];
        chunk[..end - offset].copy_from_slice(&data[offset..end]);
        candidates.push(chunk);
        offset += PROM_BANK_SIZE;
    }
    (bank1, candidates)
}

/// Re-serialize paired odd/even C-ROM data into a linear 4-bit-per-pixel,
/// row-major form, `TILE_STRIDE` bytes per tile, so the hot sprite blit is a
/// single table lookup instead of a bit-deinterleave.
///
/// Each source tile is 16x16 pixels across a 128-byte odd/even sub-block
/// pair (4 sub-blocks of 32 bytes each, MAME's "C ROM" packing). We unpack
/// each sub-block into 8 rows of 8 nibble-pairs, matching how the raster
/// path addresses `tile_index * TILE_STRIDE + (tile_line & 0xF) * 8 + i/2`.
fn serialize_c_rom(odd: &[u8], even: &[u8]) -> Vec<u8> {
    const SRC_TILE_BYTES: usize = 128;
    let tile_count = odd.len() / SRC_TILE_BYTES;
    let mut out = vec![0u8; tile_count * TILE_STRIDE];

    for tile in 0..tile_count {
        let src_off = tile * SRC_TILE_BYTES;
        let dst_off = tile * TILE_STRIDE;
        // Four 32-byte sub-blocks, each covering 8 pixel rows via interleaved
        // odd/even planes (bitplanes 0/1 from `even`, 2/3 from `odd`).
        for sub in 0..4 {
            for row in 0..8 {
                let tile_line = sub * 8 + row; // 0..31 collapses into 0..15 below
                let dst_row = (tile_line & 0x0F) * 8;
                for byte_in_row in 0..4 {
                    let src_idx = src_off + sub * 32 + row * 4 + byte_in_row;
                    let even_byte = even.get(src_idx).copied().unwrap_or(0);
                    let odd_byte = odd.get(src_idx).copied().unwrap_or(0);
                    // Two pixels per source byte pair: low/high nibble from
                    // each plane combine into a 4-bit color index.
                    let lo = (even_byte & 0x0F) | ((odd_byte & 0x0F) << 2);
                    let hi = ((even_byte >> 4) & 0x0F) | (((odd_byte >> 4) & 0x0F) << 2);
                    let dst_idx = dst_off + dst_row + byte_in_row * 2;
                    if dst_idx < out.len() {
                        out[dst_idx] = (lo & 0x0F) | ((hi & 0x0F) << 4);
                    }
                }
            }
        }
    }
    out
}

fn file_stem_lower(name: &str) -> String {
    let name = name.rsplit('/').next().unwrap_or(name);
    let stem = name.split('.').next().unwrap_or(name);
    stem.to_ascii_lowercase()
}

/// Concatenate every file whose stem starts with `prefix`, sorted by name,
/// into one contiguous buffer.
fn concat_sorted(roms: &RomSet, prefix: char) -> Option<Vec<u8>> {
    let mut names: Vec<&str> = roms
        .file_names()
        .into_iter()
        .filter(|n| {
            let stem = file_stem_lower(n);
            stem.starts_with(prefix) && stem[1..].chars().next().is_none_or(|c| c.is_ascii_digit())
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

/// Concatenate files whose stem starts with an exact prefix string (used to
/// separate `v2*` from the more general `v*` match used for ADPCM-A).
fn concat_sorted_prefix(roms: &RomSet, prefix: &str) -> Option<Vec<u8>> {
    let mut names: Vec<&str> = roms
        .file_names()
        .into_iter()
        .filter(|n| file_stem_lower(n).starts_with(prefix))
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

/// Split the `c*` files into odd/even halves by filename convention
/// (`c1`/`c2` -> odd/even of pair 1, `c3`/`c4` -> pair 2, ...), concatenating
/// each half in pair order.
fn collect_c_rom_pair(roms: &RomSet) -> Option<(Vec<u8>, Vec<u8>)> {
    let mut names: Vec<&str> = roms
        .file_names()
        .into_iter()
        .filter(|n| file_stem_lower(n).starts_with('c'))
        .collect();
    if names.is_empty() || names.len() % 2 != 0 {
        return None;
    }
    names.sort();
    let mut odd = Vec::new();
    let mut even = Vec::new();
    for pair in names.chunks(2) {
        odd.extend_from_slice(roms.get(pair[0]).unwrap_or(&[]));
        even.extend_from_slice(roms.get(pair[1]).unwrap_or(&[]));
    }
    Some((odd, even))
}

/// Open a ZIP archive and extract cartridge files matching the hardware's
/// case-insensitive naming convention into a [`RomSet`]. Not part of the
/// core's required surface — a separately testable host convenience.
pub fn from_zip_archive(bytes: &[u8]) -> Result<RomSet, CoreError> {
    let reader = Cursor::new(bytes);
    let mut archive =
        zip::ZipArchive::new(reader).map_err(|e| CoreError::ZipArchive(e.to_string()))?;

    let mut entries: Vec<(String, Vec<u8>)> = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| CoreError::ZipArchive(e.to_string()))?;
        if !file.is_file() {
            continue;
        }
        let name = file.name().to_string();
        if !is_cart_file_name(&name) {
            continue;
        }
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        entries.push((name, data));
    }
    if entries.is_empty() {
        return Err(CoreError::ZipArchive(
            "no recognized cartridge files in archive".into(),
        ));
    }
    let refs: Vec<(&str, &[u8])> = entries.iter().map(|(n, d)| (n.as_str(), d.as_slice())).collect();
    Ok(RomSet::from_slices(&refs))
}

fn is_cart_file_name(name: &str) -> bool {
    let stem = file_stem_lower(name);
    let Some(first) = stem.chars().next() else {
        return false;
    };
    match first {
        'p' | 's' | 'c' => stem[1..].chars().next().is_none_or(|c| c.is_ascii_digit()),
        'm' => stem.starts_with("m1"),
        'v' => stem.starts_with('v') && stem.len() > 1 && (stem.as_bytes()[1] == b'1' || stem.as_bytes()[1] == b'2'),
        _ => false,
    }
}
