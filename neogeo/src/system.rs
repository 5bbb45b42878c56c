//! 68k memory map constants and the system-control/video-window address
//! decode that `bus.rs` dispatches against.
//!
//! Kept as a standalone module (rather than inlined into `bus.rs`) because
//! the address table is reference material worth reading on its own —
//! it mirrors the layout table in the design doc almost verbatim.

use crate::io::SystemControlBit;

pub const PROM_BANK1_START: u32 = 0x000000;
pub const PROM_BANK1_END: u32 = 0x0FFFFF;
pub const WORK_RAM_START: u32 = 0x100000;
pub const WORK_RAM_END: u32 = 0x10FFFF;
pub const WORK_RAM_MIRROR_START: u32 = 0x110000;
pub const WORK_RAM_MIRROR_END: u32 = 0x1FFFFF;
pub const PROM_BANK2_START: u32 = 0x200000;
pub const PROM_BANK2_END: u32 = 0x2FFFFF;
pub const IO_WINDOW_START: u32 = 0x300000;
pub const IO_WINDOW_END: u32 = 0x3FFFFF;
pub const PALETTE_START: u32 = 0x400000;
pub const PALETTE_END: u32 = 0x401FFF;
pub const PALETTE_MIRROR_START: u32 = 0x402000;
pub const PALETTE_MIRROR_END: u32 = 0x403FFF;
pub const MEMORY_CARD_START: u32 = 0x800000;
pub const MEMORY_CARD_END: u32 = 0xBFFFFF;
pub const SYSTEM_ROM_START: u32 = 0xC00000;
pub const SYSTEM_ROM_END: u32 = 0xC1FFFF;
pub const SYSTEM_ROM_MIRROR_START: u32 = 0xC20000;
pub const SYSTEM_ROM_MIRROR_END: u32 = 0xC3FFFF;
pub const BACKUP_RAM_START: u32 = 0xD00000;
pub const BACKUP_RAM_END: u32 = 0xD0FFFF;
pub const BACKUP_RAM_MIRROR_START: u32 = 0xD10000;
pub const BACKUP_RAM_MIRROR_END: u32 = 0xD3FFFF;

/// Within-window offsets for the key I/O addresses named in the design doc,
/// relative to `IO_WINDOW_START`.
pub mod io_offset {
    pub const P1CNT: u32 = 0x000000;
    pub const DIPSW: u32 = 0x000001;
    pub const SYSTYPE: u32 = 0x000081;
    pub const SOUND: u32 = 0x020000;
    pub const STATUS_A: u32 = 0x020001;
    pub const P2CNT: u32 = 0x040000;
    pub const STATUS_B: u32 = 0x080000;
    pub const RTCCTRL: u32 = 0x080051;

    pub const BRDFIX: u32 = 0x0A000B;
    pub const CRTFIX: u32 = 0x0A001B;
    pub const SWPBIOS: u32 = 0x0A0003;
    pub const SWPROM: u32 = 0x0A0013;
    pub const PALBANK1: u32 = 0x0A000F;
    pub const PALBANK0: u32 = 0x0A001F;
    pub const CARDLOCK: u32 = 0x0A0031;
    pub const LEDLATCHES: u32 = 0x0A0011;
    pub const LEDDATA: u32 = 0x0A0021;
    pub const COINCLEAR: u32 = 0x0A0041;

    pub const VRAMADDR: u32 = 0x0C0000;
    pub const VRAMRW: u32 = 0x0C0002;
    pub const VRAMMOD: u32 = 0x0C0004;
    pub const LSPCMODE: u32 = 0x0C0006;
    pub const TIMERHIGH: u32 = 0x0C0008;
    pub const TIMERLOW: u32 = 0x0C000A;
    pub const IRQACK: u32 = 0x0C000C;
    pub const TIMERSTOP: u32 = 0x0C000E;
}

/// Decode a write-only system-control offset (within the I/O window) into
/// the `SystemControlBit` it latches, if any. Offsets not named in the
/// design doc's table are not system-control registers (they may still be
/// other I/O, handled by the caller).
pub fn decode_system_control_write(offset: u32) -> Option<SystemControlBit> {
    use io_offset::*;
    Some(match offset {
        SWPBIOS => SystemControlBit::SwapBios,
        SWPROM => SystemControlBit::SwapRom,
        BRDFIX => SystemControlBit::BoardFix,
        CRTFIX => SystemControlBit::CartFix,
        PALBANK1 => SystemControlBit::PalBank1,
        PALBANK0 => SystemControlBit::PalBank0,
        CARDLOCK => SystemControlBit::CardLock,
        LEDLATCHES => SystemControlBit::Led1,
        LEDDATA => SystemControlBit::Led2,
        o if (COINCLEAR..COINCLEAR + 2).contains(&o) => {
            SystemControlBit::CoinCounter((o - COINCLEAR) as u8)
        }
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_system_control_offsets() {
        assert!(matches!(
            decode_system_control_write(io_offset::SWPBIOS),
            Some(SystemControlBit::SwapBios)
        ));
        assert!(matches!(
            decode_system_control_write(io_offset::PALBANK1),
            Some(SystemControlBit::PalBank1)
        ));
    }

    #[test]
    fn unknown_offset_decodes_to_none() {
        assert!(decode_system_control_write(0xFFFFFF).is_none());
    }

    #[test]
    fn coin_counter_offsets_decode_by_port() {
        assert!(matches!(
            decode_system_control_write(io_offset::COINCLEAR),
            Some(SystemControlBit::CoinCounter(0))
        ));
        assert!(matches!(
            decode_system_control_write(io_offset::COINCLEAR + 1),
            Some(SystemControlBit::CoinCounter(1))
        ));
    }
}
