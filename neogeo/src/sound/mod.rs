//! Sound CPU (Z80) side of the system: its bank-switched memory map, the
//! mailbox I/O ports, and the YM2610 sound chip itself (in [`ym2610`]).

pub mod ym2610;

use phosphor_core::core::bus::InterruptState;
use phosphor_core::core::{Bus, BusMaster};

use crate::io::IoRegs;
use ym2610::Ym2610;

/// Byte size of the Z80's 2 KiB private work RAM window.
pub const Z80_RAM_SIZE: usize = 0x800;

const BANK3_WINDOW: usize = 0x4000;
const BANK2_WINDOW: usize = 0x2000;
const BANK1_WINDOW: usize = 0x1000;
const BANK0_WINDOW: usize = 0x800;

/// The Z80's bank-switched view of M1 ROM plus its own private RAM. Holds no
/// reference to the rest of the system — mailbox and chip I/O are wired in
/// through [`SoundCpuMap`], which borrows this alongside `IoRegs`/`Ym2610`
/// for the duration of one CPU slice.
pub struct SoundMemory {
    ram: [u8; Z80_RAM_SIZE],
    /// Byte offsets into M1 ROM for the four switchable windows, indexed
    /// 0..3 matching I/O ports 0x08..0x0B.
    bank_offsets: [u32; 4],
}

impl SoundMemory {
    pub fn new() -> Self {
        Self {
            ram: [0; Z80_RAM_SIZE],
            // Reset defaults per the design doc: {0xF000, 0xE000, 0xC000, 0x8000}.
            bank_offsets: [0xF000, 0xE000, 0xC000, 0x8000],
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn read(&self, m1_rom: &[u8], addr: u16) -> u8 {
        let rom_byte = |offset: u32| m1_rom.get(offset as usize).copied().unwrap_or(0);
        match addr {
            0x0000..=0x7FFF => rom_byte(addr as u32),
            0x8000..=0xBFFF => {
                rom_byte(self.bank_offsets[3] + (addr - 0x8000) as u32)
            }
            0xC000..=0xDFFF => rom_byte(self.bank_offsets[2] + (addr - 0xC000) as u32),
            0xE000..=0xEFFF => rom_byte(self.bank_offsets[1] + (addr - 0xE000) as u32),
            0xF000..=0xF7FF => rom_byte(self.bank_offsets[0] + (addr - 0xF000) as u32),
            0xF800..=0xFFFF => self.ram[(addr - 0xF800) as usize],
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        if let 0xF800..=0xFFFF = addr {
            self.ram[(addr - 0xF800) as usize] = value;
        }
        // ROM windows are read-only; writes elsewhere are no-ops.
    }

    /// A Z80 `IN`/`OUT` to ports 0x08..0x0B carries the desired bank offset
    /// in the high byte of the 16-bit I/O address (the accumulator value,
    /// per the Z80's `IN A,(n)` / `OUT (n),A` address-bus convention).
    fn set_bank_from_port(&mut self, port: u8, io_addr: u16) {
        let window = match port {
            0x08 => BANK0_WINDOW,
            0x09 => BANK1_WINDOW,
            0x0A => BANK2_WINDOW,
            0x0B => BANK3_WINDOW,
            _ => return,
        };
        let select = (io_addr >> 8) as u32;
        let idx = (port - 0x08) as usize;
        self.bank_offsets[idx] = select * window as u32;
    }
}

impl Default for SoundMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// Transient `Bus` view over the sound CPU's address space, assembled by the
/// orchestrator for the span of one Z80 timeslice. Borrowing the pieces this
/// way (rather than giving `SoundMemory` its own copies) keeps `IoRegs` and
/// `Ym2610` as the single source of truth the main-CPU side also reads.
pub struct Z80Bus<'a> {
    pub memory: &'a mut SoundMemory,
    pub m1_rom: &'a [u8],
    pub io: &'a mut IoRegs,
    pub chip: &'a mut Ym2610,
}

impl Bus for Z80Bus<'_> {
    type Address = u16;
    type Data = u8;

    fn read(&mut self, _master: BusMaster, addr: u16) -> u8 {
        self.memory.read(self.m1_rom, addr)
    }

    fn write(&mut self, _master: BusMaster, addr: u16, data: u8) {
        self.memory.write(addr, data);
    }

    fn io_read(&mut self, _master: BusMaster, addr: u16) -> u8 {
        let port = addr as u8;
        match port {
            0x00 => self.io.z80_read_mailbox_cmd(),
            0x04 | 0x06 => self.chip.read_status(),
            0x05 | 0x07 => self.chip.read_data(),
            0x08..=0x0B => {
                self.memory.set_bank_from_port(port, addr);
                (addr >> 8) as u8
            }
            _ => {
                log::warn!("z80 io_read: unmapped port {port:#04x}");
                0
            }
        }
    }

    fn io_write(&mut self, _master: BusMaster, addr: u16, data: u8) {
        let port = addr as u8;
        match port {
            0x04 => self.chip.write_address(0, data),
            0x05 => self.chip.write_data(0, data),
            0x06 => self.chip.write_address(1, data),
            0x07 => self.chip.write_data(1, data),
            0x08..=0x0B => self.io.z80_set_nmi_mask(false),
            0x0C => self.io.z80_write_sound_result(data),
            0x18 => self.io.z80_set_nmi_mask(true),
            _ => log::warn!("z80 io_write: unmapped port {port:#04x} <- {data:#04x}"),
        }
    }

    fn is_halted_for(&self, _master: BusMaster) -> bool {
        false
    }

    fn check_interrupts(&self, _target: BusMaster) -> InterruptState {
        InterruptState {
            nmi: self.io.sound_nmi_pending && !self.io.sound_nmi_masked,
            irq: self.chip.irq_pending(),
            irq_level: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_window_reads_m1_rom_directly() {
        let mem = SoundMemory::new();
        let rom = vec![0xAB; 0x8000];
        assert_eq!(mem.read(&rom, 0x1234), 0xAB);
    }

    #[test]
    fn bank0_window_uses_reset_default_offset() {
        let mem = SoundMemory::new();
        let mut rom = vec![0u8; 0x10000];
        rom[0xF000] = 0x42;
        assert_eq!(mem.read(&rom, 0xF000), 0x42);
    }

    #[test]
    fn port_write_sets_bank_from_high_byte() {
        let mut mem = SoundMemory::new();
        // IN A,(0x08) with A=0x03 puts 0x0003 on the address bus.
        mem.set_bank_from_port(0x08, 0x0308);
        assert_eq!(mem.bank_offsets[0], 3 * BANK0_WINDOW as u32);
    }

    #[test]
    fn work_ram_is_readwrite() {
        let mut mem = SoundMemory::new();
        mem.write(0xF900, 0x55);
        let rom = vec![0u8; 0x8000];
        assert_eq!(mem.read(&rom, 0xF900), 0x55);
    }
}
