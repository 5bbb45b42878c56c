//! End-to-end coverage across crate boundaries: cartridge loading, the
//! reset-vector overlay, and the full `NeoGeoSystem` frame loop driven
//! purely through its public Host ABI (plus the `Bus` trait a CPU decoder
//! would use), the way a frontend actually exercises this crate.
//!
//! These complement the per-module unit tests colocated in `src/`, which
//! poke `NeoGeoSystem`'s own fields directly; everything here goes through
//! `neogeo_core`'s public surface only.

use phosphor_core::core::bus::InterruptState;
use phosphor_core::core::{Bus, BusMaster};
use phosphor_core::cpu::{Cpu68k, CpuZ80};

use neogeo_core::bios::{BiosSet, Y_ZOOM_ROM_SIZE};
use neogeo_core::cart::{self, Cartridge};
use neogeo_core::system::io_offset;
use neogeo_core::video::{FRAME_HEIGHT, FRAME_WIDTH};
use neogeo_core::{system, BoardType, MainBus, NeoGeoSystem, RomSet};

fn blank_cart() -> Cartridge {
    Cartridge {
        p_rom_bank1: vec![0u8; cart::PROM_BANK_SIZE],
        p_rom_bank2_candidates: vec![],
        p_rom_bank2_selected: 0,
        s_rom: vec![],
        c_rom: vec![],
        m1_rom: vec![0u8; 0x8000],
        v1_rom: vec![],
        v2_rom: vec![],
        ngh: 0,
    }
}

fn bios_rom_set(system_rom: Vec<u8>) -> RomSet {
    let sfix = vec![0u8; 0x10000];
    let yzoom = vec![0u8; Y_ZOOM_ROM_SIZE];
    RomSet::from_slices(&[
        ("sp-s2.sp1", &system_rom),
        ("sfix.sfix", &sfix),
        ("000-lo.lo", &yzoom),
    ])
}

/// Scenario: cart load parses the "NEO-GEO" header and the BCD house code,
/// and serializes the C-ROM pair into the raster path's linear format.
#[test]
fn cart_load_parses_header_and_ngh_code() {
    let mut p_rom = vec![0u8; 0x200];
    p_rom[0] = 0x00;
    p_rom[1] = 0x10; // already big-endian, no byte-swap pass needed
    p_rom[0x100..0x107].copy_from_slice(b"NEO-GEO");
    p_rom[0x108] = 0x02; // BCD: game 0253
    p_rom[0x109] = 0x53;

    let s_rom = vec![0u8; 64];
    let m1_rom = vec![0u8; 0x1000];
    let c1 = vec![0xFFu8; 128];
    let c2 = vec![0xFFu8; 128];

    let roms = RomSet::from_slices(&[
        ("p1.p1", &p_rom),
        ("s1.s1", &s_rom),
        ("c1.c1", &c1),
        ("c2.c2", &c2),
        ("m1.m1", &m1_rom),
    ]);

    let cart = cart::load_cart(&roms).expect("valid cart should load");
    assert_eq!(cart.ngh, 253);
    assert_eq!(cart.p_rom_bank1.len(), cart::PROM_BANK_SIZE);
    assert!(cart.p_rom_bank2_candidates.is_empty());
    // One 128-byte source tile serializes to one TILE_STRIDE-byte tile.
    assert_eq!(cart.c_rom.len(), cart::TILE_STRIDE);
    assert!(cart.c_rom.iter().all(|&b| b == 0xFF));
}

/// Scenario: the 68000 reset vector (SP, then PC) is fetched through the
/// system-ROM overlay at the bottom of bank 1, not from cartridge P-ROM.
/// Values match the real Neo Geo BIOS's own reset vector.
#[test]
fn reset_vector_is_fetched_through_bios_overlay_window() {
    let mut system_rom = vec![0u8; 0x20000];
    system_rom[0..4].copy_from_slice(&0x0010_F300u32.to_be_bytes());
    system_rom[4..8].copy_from_slice(&0x00C0_0100u32.to_be_bytes());

    let bios = BiosSet {
        system_rom,
        sfix_rom: vec![0u8; 16],
        y_zoom_rom: vec![0u8; Y_ZOOM_ROM_SIZE],
        board_type_byte: 0,
        nationality_byte: 0,
    };
    let mut bus = MainBus::new(blank_cart(), bios, BoardType::Mvs);

    assert_eq!(bus.read32(0), 0x0010_F300);
    let pc = bus.read32(4);
    assert_eq!(pc, 0x00C0_0100);
    assert!(pc > 0x00C0_0080);
}

#[derive(Default)]
struct IdleCpu68k;
impl Cpu68k for IdleCpu68k {
    fn execute(&mut self, _bus: &mut dyn Bus<Address = u32, Data = u8>, cycle_budget: u64) -> u64 {
        cycle_budget
    }
    fn reset(&mut self, _bus: &mut dyn Bus<Address = u32, Data = u8>) {}
    fn signal_interrupt(&mut self, _int: InterruptState) {}
    fn is_sleeping(&self) -> bool {
        false
    }
}

#[derive(Default)]
struct IdleCpuZ80;
impl CpuZ80 for IdleCpuZ80 {
    fn execute(&mut self, _bus: &mut dyn Bus<Address = u16, Data = u8>, cycle_budget: u64) -> u64 {
        cycle_budget
    }
    fn reset(&mut self, _bus: &mut dyn Bus<Address = u16, Data = u8>) {}
    fn signal_interrupt(&mut self, _int: InterruptState) {}
    fn is_sleeping(&self) -> bool {
        false
    }
}

/// Scenario: an empty cartless system boots and reports the system ROM's
/// identification bytes without needing anything beyond the Host ABI.
#[test]
fn system_boots_and_reports_bios_identification_bytes() {
    let mut system_rom = vec![0u8; 0x20000];
    system_rom[0x400] = 0x00;
    system_rom[0x401] = 0x01;

    let mut sys: NeoGeoSystem<IdleCpu68k, IdleCpuZ80> =
        NeoGeoSystem::new(bios_rom_set(system_rom), 44_100, BoardType::Mvs).expect("bios loads");
    assert_eq!(sys.bios_board_type_byte(), 0x00);
    assert_eq!(sys.bios_nationality_byte(), 0x01);

    sys.run_frame();
    let fb = sys.frame_buffer();
    assert_eq!(fb.len(), FRAME_WIDTH * FRAME_HEIGHT);
    assert!(fb.iter().all(|&p| p == 0)); // default black backdrop, no palette writes yet
}

fn write_video_word(bus: &mut dyn Bus<Address = u32, Data = u8>, addr: u32, value: u16) {
    Bus::write(bus, BusMaster::Cpu(0), addr, (value >> 8) as u8);
    Bus::write(bus, BusMaster::Cpu(0), addr + 1, value as u8);
}

fn write_palette_word(bus: &mut dyn Bus<Address = u32, Data = u8>, addr: u32, value: u16) {
    Bus::write(bus, BusMaster::Cpu(0), addr, value as u8);
    Bus::write(bus, BusMaster::Cpu(0), addr + 1, (value >> 8) as u8);
}

const BACKDROP_PALETTE_INDEX: u32 = 4095;

/// A CPU stand-in that pokes the backdrop palette color through the
/// memory-mapped bus once, on its very first timeslice, then idles —
/// standing in for a boot ROM's one-time palette init.
#[derive(Default)]
struct PaletteWritingCpu68k {
    done: bool,
}
impl Cpu68k for PaletteWritingCpu68k {
    fn execute(&mut self, bus: &mut dyn Bus<Address = u32, Data = u8>, cycle_budget: u64) -> u64 {
        if !self.done {
            self.done = true;
            write_palette_word(
                bus,
                system::PALETTE_START + BACKDROP_PALETTE_INDEX * 2,
                0x03E0, // full green, no dark bit
            );
        }
        cycle_budget
    }
    fn reset(&mut self, _bus: &mut dyn Bus<Address = u32, Data = u8>) {}
    fn signal_interrupt(&mut self, _int: InterruptState) {}
    fn is_sleeping(&self) -> bool {
        false
    }
}

/// Scenario: a palette color written through the memory-mapped bus (not
/// poked directly into `PaletteRam`) reaches the rendered frame buffer.
#[test]
fn palette_write_through_bus_reaches_rendered_frame() {
    let mut sys: NeoGeoSystem<PaletteWritingCpu68k, IdleCpuZ80> =
        NeoGeoSystem::new(bios_rom_set(vec![0u8; 0x20000]), 44_100, BoardType::Mvs)
            .expect("bios loads");
    sys.run_frame();

    let fb = sys.frame_buffer();
    assert!(
        fb.iter().all(|&p| p == 0x07E0),
        "whole screen should show the new backdrop color, no cart/sprites loaded"
    );
}

/// A CPU stand-in that, on its first timeslice, writes a single 16x16
/// sprite's control blocks (SCB2-4, sprite slot 0) and a palette color
/// through the memory-mapped bus — standing in for a boot ROM's one-time
/// sprite setup.
#[derive(Default)]
struct SpriteSetupCpu68k {
    done: bool,
}
impl Cpu68k for SpriteSetupCpu68k {
    fn execute(&mut self, bus: &mut dyn Bus<Address = u32, Data = u8>, cycle_budget: u64) -> u64 {
        if !self.done {
            self.done = true;
            let vram_write = |bus: &mut dyn Bus<Address = u32, Data = u8>, vram_addr: u16, value: u16| {
                write_video_word(
                    bus,
                    system::IO_WINDOW_START + io_offset::VRAMADDR,
                    vram_addr,
                );
                write_video_word(bus, system::IO_WINDOW_START + io_offset::VRAMRW, value);
            };

            // Sprite 0: y raw=446 -> screen y=66 (frame row 50), vertical_size=2
            // (two 16-line bands), not sticky (bit 6 clear).
            vram_write(bus, neogeo_core::video::SCB3_START, 0xDF02);
            // x = 100, via (scb4 >> 7) & 0x1FF.
            vram_write(bus, neogeo_core::video::SCB4_START, 0x3200);
            // zoom_x = 15 (no horizontal shrink), zoom_y = 0.
            vram_write(bus, neogeo_core::video::SCB2_START, 0x0F00);
            // Tile index 0, palette 0 (both already zero, written for clarity).
            vram_write(bus, neogeo_core::video::SCB1_START, 0x0000);
            vram_write(bus, neogeo_core::video::SCB1_START + 1, 0x0000);

            write_palette_word(
                bus,
                system::PALETTE_START + 15 * 2, // palette 0, color index 15
                0x03E0,                         // full green, no dark bit
            );
        }
        cycle_budget
    }
    fn reset(&mut self, _bus: &mut dyn Bus<Address = u32, Data = u8>) {}
    fn signal_interrupt(&mut self, _int: InterruptState) {}
    fn is_sleeping(&self) -> bool {
        false
    }
}

/// Scenario: a cartridge loaded through the real ZIP-convention loader, with
/// a sprite set up purely through memory-mapped bus writes, paints the
/// expected rectangle of the rendered frame.
#[test]
fn sprite_blit_end_to_end_from_cart_load_through_rendered_frame() {
    let mut p_rom = vec![0u8; 0x200];
    p_rom[0] = 0x00;
    p_rom[1] = 0x10;
    p_rom[0x100..0x107].copy_from_slice(b"NEO-GEO");

    // A uniform 0xFF C-ROM pair serializes to an all-color-15 tile
    // regardless of the odd/even plane interleave, sidestepping any
    // dependence on the exact byte layout `serialize_c_rom` chooses.
    let c1 = vec![0xFFu8; 128];
    let c2 = vec![0xFFu8; 128];
    let roms = RomSet::from_slices(&[
        ("p1.p1", &p_rom),
        ("s1.s1", &vec![0u8; 64]),
        ("c1.c1", &c1),
        ("c2.c2", &c2),
        ("m1.m1", &vec![0u8; 0x1000]),
    ]);

    let mut sys: NeoGeoSystem<SpriteSetupCpu68k, IdleCpuZ80> =
        NeoGeoSystem::new(bios_rom_set(vec![0u8; 0x20000]), 44_100, BoardType::Mvs)
            .expect("bios loads");
    sys.load_cart(roms).expect("cart loads");
    sys.run_frame();

    let fb = sys.frame_buffer();
    let row = 55usize; // within the sprite's [50, 66) band
    let row_start = row * FRAME_WIDTH;

    assert_eq!(fb[row_start + 99], 0, "just left of the sprite stays backdrop");
    assert_eq!(fb[row_start + 100], 0x07E0, "sprite's left edge column");
    assert_eq!(fb[row_start + 115], 0x07E0, "sprite's right edge column");
    assert_eq!(fb[row_start + 116], 0, "just right of the sprite stays backdrop");

    let outside_row = 10usize; // above the sprite's vertical band
    assert!(fb[outside_row * FRAME_WIDTH..outside_row * FRAME_WIDTH + FRAME_WIDTH]
        .iter()
        .all(|&p| p == 0));
}
