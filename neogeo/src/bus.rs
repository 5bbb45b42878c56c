//! Main-CPU (68000) address space: the region table that ties cartridge,
//! BIOS, work/backup RAM, the memory card, and the I/O + video register
//! files into one flat 24-bit address map.
//!
//! The `Bus` trait this crate builds on is byte-wide (`Data = u8`) even
//! though the real hardware bus is 16 bits; a host-supplied 68000 decoder is
//! expected to compose its own word/long accesses out of byte calls (see
//! `cpu::Cpu68k`'s doc comment). Registers that are only meaningful as a
//! whole 16-bit unit (the video window) are reassembled here from the byte
//! pair a decoder would naturally issue for a word access, least-significant
//! byte last, which is the only access order that produces the documented
//! side effects (cursor advance, timer counter load) exactly once per word.

use phosphor_core::core::bus::InterruptState;
use phosphor_core::core::{Bus, BusMaster};

use crate::bios::BiosSet;
use crate::cart::Cartridge;
use crate::io::{BoardType, IoRegs, PaletteBank as IoPaletteBank, SystemControlBit};
use crate::ram::{BackupRam, MemoryCard, WorkRam};
use crate::system::{self, io_offset};
use crate::video::{PaletteBank as VideoPaletteBank, PaletteRam, VideoRegs};

fn io_to_video_bank(bank: IoPaletteBank) -> VideoPaletteBank {
    match bank {
        IoPaletteBank::A => VideoPaletteBank::A,
        IoPaletteBank::B => VideoPaletteBank::B,
    }
}

/// A main-CPU access that landed outside every mapped region. Recorded
/// rather than delivered synchronously, since the CPU decoder driving this
/// bus is a host collaborator this crate doesn't call into directly (see
/// `cpu::Cpu68k`) — the orchestrator polls [`MainBus::take_fault`] after each
/// timeslice and turns it into a bus-error exception at the next boundary.
#[derive(Debug, Clone, Copy)]
pub struct BusFault {
    pub address: u32,
    pub write: bool,
}

/// The complete 68000 address space.
pub struct MainBus {
    pub cart: Cartridge,
    pub bios: BiosSet,
    pub work_ram: WorkRam,
    pub backup_ram: BackupRam,
    pub memory_card: MemoryCard,
    pub io: IoRegs,
    pub video: VideoRegs,
    pub palette: PaletteRam,

    last_fault: Option<BusFault>,
    video_write_latch: Option<(u32, u8)>,
    video_read_cache: Option<(u32, u16)>,
}

impl MainBus {
    pub fn new(cart: Cartridge, bios: BiosSet, board: BoardType) -> Self {
        Self {
            cart,
            bios,
            work_ram: WorkRam::new(),
            backup_ram: BackupRam::new(),
            memory_card: MemoryCard::new(),
            io: IoRegs::new(board),
            video: VideoRegs::new(),
            palette: PaletteRam::new(),
            last_fault: None,
            video_write_latch: None,
            video_read_cache: None,
        }
    }

    pub fn reset(&mut self) {
        self.io.reset();
        self.video.reset();
        self.last_fault = None;
        self.video_write_latch = None;
        self.video_read_cache = None;
    }

    /// Take (clearing) the most recent out-of-range access, if any.
    pub fn take_fault(&mut self) -> Option<BusFault> {
        self.last_fault.take()
    }

    fn record_fault(&mut self, address: u32, write: bool) {
        self.last_fault = Some(BusFault { address, write });
    }

    /// Big-endian 16-bit read, composed from two `read8` calls — a
    /// convenience for callers that want word access without driving the
    /// video-window latch logic (vector-table fetches, save-state dumps).
    pub fn read16(&mut self, addr: u32) -> u16 {
        ((self.read8(addr) as u16) << 8) | self.read8(addr.wrapping_add(1)) as u16
    }

    pub fn write16(&mut self, addr: u32, value: u16) {
        self.write8(addr, (value >> 8) as u8);
        self.write8(addr.wrapping_add(1), value as u8);
    }

    pub fn read32(&mut self, addr: u32) -> u32 {
        ((self.read16(addr) as u32) << 16) | self.read16(addr.wrapping_add(2)) as u32
    }

    pub fn write32(&mut self, addr: u32, value: u32) {
        self.write16(addr, (value >> 16) as u16);
        self.write16(addr.wrapping_add(2), value as u16);
    }

    fn read8(&mut self, addr: u32) -> u8 {
        use system::*;
        let addr = addr & 0x00FF_FFFF;
        match addr {
            PROM_BANK1_START..=PROM_BANK1_END => {
                if addr < 0x80 && self.io.vector_source == crate::io::RomSource::Bios {
                    self.bios.system_rom.get(addr as usize).copied().unwrap_or(0)
                } else {
                    self.cart.p_rom_bank1.get(addr as usize).copied().unwrap_or(0)
                }
            }
            WORK_RAM_START..=WORK_RAM_MIRROR_END => {
                self.work_ram.0.read8((addr - WORK_RAM_START) & 0xFFFF)
            }
            PROM_BANK2_START..=PROM_BANK2_END => self
                .cart
                .p_rom_bank2()
                .get((addr - PROM_BANK2_START) as usize)
                .copied()
                .unwrap_or(0),
            IO_WINDOW_START..=IO_WINDOW_END => self.read_io(addr - IO_WINDOW_START),
            PALETTE_START..=PALETTE_MIRROR_END => {
                self.read_palette_byte((addr - PALETTE_START) % 0x2000)
            }
            MEMORY_CARD_START..=MEMORY_CARD_END => {
                self.memory_card.0.read8(addr - MEMORY_CARD_START)
            }
            SYSTEM_ROM_START..=SYSTEM_ROM_MIRROR_END => self
                .bios
                .system_rom
                .get(((addr - SYSTEM_ROM_START) & 0x1_FFFF) as usize)
                .copied()
                .unwrap_or(0),
            BACKUP_RAM_START..=BACKUP_RAM_MIRROR_END => {
                self.backup_ram.0.read8((addr - BACKUP_RAM_START) & 0xFFFF)
            }
            _ => {
                self.record_fault(addr, false);
                0
            }
        }
    }

    fn write8(&mut self, addr: u32, value: u8) {
        use system::*;
        let addr = addr & 0x00FF_FFFF;
        match addr {
            PROM_BANK1_START..=PROM_BANK1_END => {
                log::debug!("write to read-only P-ROM at {addr:#08x} <- {value:#04x}");
            }
            PROM_BANK2_START..=PROM_BANK2_END => {
                if value <= 3 {
                    self.cart.select_bank2(value);
                }
            }
            WORK_RAM_START..=WORK_RAM_MIRROR_END => {
                self.work_ram.0.write8((addr - WORK_RAM_START) & 0xFFFF, value)
            }
            IO_WINDOW_START..=IO_WINDOW_END => self.write_io(addr - IO_WINDOW_START, value),
            PALETTE_START..=PALETTE_MIRROR_END => {
                self.write_palette_byte((addr - PALETTE_START) % 0x2000, value)
            }
            MEMORY_CARD_START..=MEMORY_CARD_END => {
                if !self.io.memory_card_locked {
                    self.memory_card.0.write8(addr - MEMORY_CARD_START, value);
                }
            }
            SYSTEM_ROM_START..=SYSTEM_ROM_MIRROR_END => {
                log::debug!("write to read-only system ROM at {addr:#08x}");
            }
            BACKUP_RAM_START..=BACKUP_RAM_MIRROR_END => self
                .backup_ram
                .0
                .write8((addr - BACKUP_RAM_START) & 0xFFFF, value),
            _ => self.record_fault(addr, true),
        }
    }

    fn read_palette_byte(&self, rel: u32) -> u8 {
        let index = (rel / 2) as usize;
        let bank = io_to_video_bank(self.io.palette_bank);
        let word = self.palette.read_raw(bank, index);
        if rel % 2 == 0 {
            word as u8
        } else {
            (word >> 8) as u8
        }
    }

    fn write_palette_byte(&mut self, rel: u32, value: u8) {
        let index = (rel / 2) as usize;
        let bank = io_to_video_bank(self.io.palette_bank);
        let prev = self.palette.read_raw(bank, index);
        let word = if rel % 2 == 0 {
            (prev & 0xFF00) | value as u16
        } else {
            (prev & 0x00FF) | ((value as u16) << 8)
        };
        self.palette.write(bank, index, word);
    }

    fn read_io(&mut self, offset: u32) -> u8 {
        match offset {
            io_offset::P1CNT => self.io.read_joypad(0),
            io_offset::DIPSW => self.io.read_dip(),
            io_offset::SYSTYPE => self.io.read_systype(),
            io_offset::SOUND => self.io.read_sound_result(),
            io_offset::STATUS_A | io_offset::STATUS_B => self.io.read_status(),
            io_offset::P2CNT => self.io.read_joypad(1),
            o if (io_offset::VRAMADDR..=io_offset::TIMERSTOP + 1).contains(&o) => {
                self.read_video_byte(o)
            }
            _ => {
                log::debug!("io read: unmapped offset {offset:#06x}");
                0xFF
            }
        }
    }

    fn write_io(&mut self, offset: u32, value: u8) {
        match offset {
            io_offset::SOUND => self.io.write_sound_cmd(value),
            io_offset::RTCCTRL => self.io.write_rtc_ctrl(value),
            o if (io_offset::VRAMADDR..=io_offset::TIMERSTOP + 1).contains(&o) => {
                self.write_video_byte(o, value)
            }
            o => {
                if let Some(bit) = system::decode_system_control_write(o) {
                    self.io.write_system_control(bit, value);
                } else {
                    log::debug!("io write: unmapped offset {o:#06x} <- {value:#04x}");
                }
            }
        }
    }

    fn read_video_byte(&mut self, offset: u32) -> u8 {
        let base = offset & !1;
        if offset % 2 == 0 {
            let word = self.dispatch_video_word_read(base);
            self.video_read_cache = Some((base, word));
            (word >> 8) as u8
        } else {
            match self.video_read_cache.take() {
                Some((cached_base, word)) if cached_base == base => word as u8,
                _ => self.dispatch_video_word_read(base) as u8,
            }
        }
    }

    fn write_video_byte(&mut self, offset: u32, value: u8) {
        let base = offset & !1;
        if offset % 2 == 0 {
            self.video_write_latch = Some((base, value));
        } else {
            let hi = match self.video_write_latch.take() {
                Some((latched_base, hi)) if latched_base == base => hi,
                _ => 0,
            };
            let word = ((hi as u16) << 8) | value as u16;
            self.dispatch_video_word_write(base, word);
        }
    }

    fn dispatch_video_word_read(&mut self, base: u32) -> u16 {
        match base {
            io_offset::VRAMADDR => self.video.read_vramaddr(),
            io_offset::VRAMRW => self.video.read_vramrw(),
            io_offset::VRAMMOD => self.video.read_vrammod() as u16,
            io_offset::LSPCMODE => self.video.read_lspcmode(),
            _ => 0,
        }
    }

    fn dispatch_video_word_write(&mut self, base: u32, value: u16) {
        match base {
            io_offset::VRAMADDR => self.video.write_vramaddr(value),
            io_offset::VRAMRW => self.video.write_vramrw(value),
            io_offset::VRAMMOD => self.video.write_vrammod(value as i16),
            io_offset::LSPCMODE => {
                self.video
                    .write_auto_anim_control((value >> 8) as u8, value & 0x08 != 0)
            }
            io_offset::TIMERHIGH => self.video.write_timerhigh(value),
            io_offset::TIMERLOW => self.video.write_timerlow(value),
            io_offset::IRQACK => self.video.write_irqack(value as u8),
            io_offset::TIMERSTOP => self.video.write_timerstop(value),
            _ => {}
        }
    }
}

impl Bus for MainBus {
    type Address = u32;
    type Data = u8;

    fn read(&mut self, _master: BusMaster, addr: u32) -> u8 {
        self.read8(addr)
    }

    fn write(&mut self, _master: BusMaster, addr: u32, data: u8) {
        self.write8(addr, data)
    }

    fn is_halted_for(&self, _master: BusMaster) -> bool {
        false
    }

    fn check_interrupts(&self, _target: BusMaster) -> InterruptState {
        let irq = self.video.vblank_irq_pending() || self.video.timer_irq_pending();
        let irq_level = if self.video.vblank_irq_pending() {
            1
        } else if self.video.timer_irq_pending() {
            2
        } else {
            0
        };
        InterruptState {
            nmi: false,
            irq,
            irq_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bios::BiosSet;
    use crate::cart::Cartridge;

    fn test_bus() -> MainBus {
        let cart = Cartridge {
            p_rom_bank1: vec![0xAA; 0x1000],
            p_rom_bank2_candidates: vec![],
            p_rom_bank2_selected: 0,
            s_rom: vec![],
            c_rom: vec![],
            m1_rom: vec![],
            v1_rom: vec![],
            v2_rom: vec![],
            ngh: 0,
        };
        let bios = BiosSet {
            system_rom: vec![0xBB; 0x1000],
            sfix_rom: vec![],
            y_zoom_rom: vec![0; crate::bios::Y_ZOOM_ROM_SIZE],
            board_type_byte: 0,
            nationality_byte: 0,
        };
        MainBus::new(cart, bios, BoardType::Mvs)
    }

    #[test]
    fn vector_overlay_reads_bios_by_default() {
        let mut bus = test_bus();
        assert_eq!(bus.read8(0), 0xBB);
        assert_eq!(bus.read8(0x80), 0xAA);
    }

    #[test]
    fn swap_rom_switches_vector_overlay_to_cart() {
        let mut bus = test_bus();
        bus.write8(system::IO_WINDOW_START + io_offset::SWPROM, 0);
        assert_eq!(bus.read8(0), 0xAA);
    }

    #[test]
    fn out_of_range_read_records_fault() {
        let mut bus = test_bus();
        let _ = bus.read8(0x500000);
        let fault = bus.take_fault().expect("fault expected");
        assert_eq!(fault.address, 0x500000);
        assert!(!fault.write);
        assert!(bus.take_fault().is_none());
    }

    #[test]
    fn work_ram_roundtrips_and_mirrors() {
        let mut bus = test_bus();
        bus.write8(system::WORK_RAM_START, 0x42);
        assert_eq!(bus.read8(system::WORK_RAM_START), 0x42);
        assert_eq!(bus.read8(system::WORK_RAM_MIRROR_START), 0x42);
    }

    #[test]
    fn video_window_word_write_applies_on_low_byte() {
        let mut bus = test_bus();
        bus.write8(system::IO_WINDOW_START + io_offset::VRAMADDR, 0x12);
        bus.write8(system::IO_WINDOW_START + io_offset::VRAMADDR + 1, 0x34);
        assert_eq!(bus.video.read_vramaddr(), 0x1234);
    }

    #[test]
    fn palette_byte_access_is_little_endian() {
        let mut bus = test_bus();
        bus.write8(system::PALETTE_START, 0xCD);
        bus.write8(system::PALETTE_START + 1, 0xAB);
        assert_eq!(bus.palette.read_raw(VideoPaletteBank::A, 0), 0xABCD);
    }

    #[test]
    fn bank2_write_selects_candidate() {
        let mut bus = test_bus();
        bus.cart.p_rom_bank2_candidates = vec![vec![0xAA; 4], vec![0xBB; 4]];
        bus.write8(system::PROM_BANK2_START, 1);
        assert_eq!(bus.cart.p_rom_bank2()[0], 0xBB);
        // Out-of-range low byte is a no-op, per the bank-select contract.
        bus.write8(system::PROM_BANK2_START, 0xFF);
        assert_eq!(bus.cart.p_rom_bank2()[0], 0xBB);
    }

    #[test]
    fn memory_card_lock_blocks_writes() {
        let mut bus = test_bus();
        bus.io.set_memory_card(true, true);
        bus.write8(system::MEMORY_CARD_START, 0x99);
        assert_eq!(bus.read8(system::MEMORY_CARD_START), 0);
    }
}
