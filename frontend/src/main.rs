use phosphor_core::core::machine::Machine;
use neogeo_core::io::BoardType;
use neogeo_core::NeoGeoSystem;

mod audio;
mod emulator;
mod input;
mod overlay;
mod rom_path;
mod stub_cpu;
mod video;

use stub_cpu::{StubCpu68k, StubCpuZ80};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    // Usage: phosphor <bios-path> <cart-path> [--scale N] [--board aes|mvs]

    let bios_path = args
        .get(1)
        .expect("Usage: phosphor <bios-path> <cart-path> [--scale N] [--board aes|mvs]");
    let cart_path = args.get(2).expect("cartridge path required");
    let scale = parse_scale_arg(&args).unwrap_or(3);
    let board = parse_board_arg(&args).unwrap_or(BoardType::Mvs);

    let bios_roms = rom_path::load_rom_set("neogeo-bios", bios_path).expect("Failed to load BIOS");
    let mut system: NeoGeoSystem<StubCpu68k, StubCpuZ80> =
        NeoGeoSystem::new(bios_roms, 44_100, board).expect("Failed to assemble BIOS");

    let cart_roms = rom_path::load_rom_set("cart", cart_path).expect("Failed to load cartridge");
    system.load_cart(cart_roms).expect("Failed to load cartridge");

    // Load battery-backed NVRAM from disk (if available)
    let nvram_path = nvram_path_for(cart_path);
    if let Ok(data) = std::fs::read(&nvram_path) {
        system.load_nvram(&data);
    }

    let key_map = input::default_key_map(system.input_map());
    system.reset();
    emulator::run(&mut system, &key_map, scale);

    // Save battery-backed NVRAM to disk on exit
    if let Some(data) = system.save_nvram()
        && let Err(e) = std::fs::write(&nvram_path, data)
    {
        eprintln!("Warning: failed to save NVRAM: {e}");
    }
}

fn nvram_path_for(cart_path: &str) -> std::path::PathBuf {
    let path = std::path::Path::new(cart_path);
    if path.is_dir() {
        path.join("neogeo.nvram")
    } else {
        path.with_extension("nvram")
    }
}

fn parse_scale_arg(args: &[String]) -> Option<u32> {
    args.windows(2).find_map(|w| {
        if w[0] == "--scale" {
            w[1].parse().ok()
        } else {
            None
        }
    })
}

fn parse_board_arg(args: &[String]) -> Option<BoardType> {
    args.windows(2).find_map(|w| {
        if w[0] == "--board" {
            match w[1].as_str() {
                "aes" => Some(BoardType::Aes),
                "mvs" => Some(BoardType::Mvs),
                _ => None,
            }
        } else {
            None
        }
    })
}
