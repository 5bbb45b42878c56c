//! I/O + system control register file: joypads, DIPs, coin/credit inputs,
//! aux (start/select/memory-card) latches, and the BIOS/ROM/palette-bank
//! control flags that the system-control write-only registers toggle.

use crate::rtc::Pd4990a;

/// AES vs MVS board identity, read back through `SYSTYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardType {
    Aes,
    Mvs,
}

/// Selects which ROM the vector-table / fix-tile reads dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomSource {
    /// Cartridge P-ROM bank 1 / cartridge S-ROM.
    Cartridge,
    /// System ROM vector table / SFIX ROM.
    Bios,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteBank {
    A,
    B,
}

/// The I/O and system-control register file.
pub struct IoRegs {
    /// Active-low joypad bits, ports 0/1: {up, down, left, right, A, B, C, D}.
    pub joypad: [u8; 2],
    /// Active-low aux byte: P1/P2 start+select, memory-card present/locked.
    pub aux: u8,
    /// MVS hardware DIP switches (settings-mode, coin chutes, ...).
    pub dip_switches: u8,
    /// Coin counters (strobe-only on hardware; counted here for completeness).
    pub coin_counters: [u32; 2],

    pub board: BoardType,
    pub vector_source: RomSource,
    pub fix_source: RomSource,
    pub palette_bank: PaletteBank,
    pub memory_card_locked: bool,

    /// Main -> sound mailbox byte and sound -> main result byte.
    pub sound_cmd: u8,
    pub sound_result: u8,
    /// True while the Z80 NMI line is asserted (cleared on Z80's port-0 read).
    pub sound_nmi_pending: bool,
    /// True when the Z80 side has masked its own NMI (ports 0x08..0x0B set
    /// it, 0x18 clears it).
    pub sound_nmi_masked: bool,

    pub rtc: Pd4990a,
    /// Latched RTC command bits (C2 C1 C0) written through `RTCCTRL`.
    rtc_command_bits: u8,

    led1: u8,
    led2: u8,
}

impl IoRegs {
    pub fn new(board: BoardType) -> Self {
        Self {
            joypad: [0xFF, 0xFF],
            aux: 0xFF,
            dip_switches: 0xFF,
            coin_counters: [0, 0],
            board,
            // Power-on state maps the system ROM's vector table and fix tiles,
            // matching the hardware's startup overlay; firmware swaps to the
            // cartridge's own copies once it has verified them.
            vector_source: RomSource::Bios,
            fix_source: RomSource::Bios,
            palette_bank: PaletteBank::A,
            memory_card_locked: false,
            sound_cmd: 0,
            sound_result: 0,
            sound_nmi_pending: false,
            sound_nmi_masked: false,
            rtc: Pd4990a::new(),
            rtc_command_bits: 0,
            led1: 0,
            led2: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.board);
    }

    pub fn set_joypad(&mut self, port: u8, bits: u8) {
        if let Some(slot) = self.joypad.get_mut(port as usize) {
            *slot = bits;
        }
    }

    pub fn set_start_select(&mut self, port: u8, start: bool, select: bool) {
        let (start_bit, select_bit) = match port {
            0 => (0, 2),
            _ => (1, 3),
        };
        set_active_low(&mut self.aux, start_bit, start);
        set_active_low(&mut self.aux, select_bit, select);
    }

    pub fn set_memory_card(&mut self, inserted: bool, locked: bool) {
        set_active_low(&mut self.aux, 6, inserted);
        self.memory_card_locked = locked;
    }

    pub fn set_dip_switches(&mut self, bits: u8) {
        self.dip_switches = bits;
    }

    /// Reads of `P1CNT`/`P2CNT`.
    pub fn read_joypad(&self, port: u8) -> u8 {
        self.joypad.get(port as usize).copied().unwrap_or(0xFF)
    }

    /// Reads of `DIPSW`.
    pub fn read_dip(&self) -> u8 {
        self.dip_switches
    }

    /// Reads of `SYSTYPE`: board-type bit plus aux latches.
    pub fn read_systype(&self) -> u8 {
        let board_bit = match self.board {
            BoardType::Aes => 0,
            BoardType::Mvs => 1,
        };
        (self.aux & 0x7F) | (board_bit << 7)
    }

    /// Reads of `STATUS_A`/`STATUS_B`: RTC test/data bits in the low bits
    /// alongside coin/service switch inputs (modeled as always-open here;
    /// hosts that want coin input would extend `joypad`/`aux`-style latches).
    pub fn read_status(&self) -> u8 {
        let mut v = 0xFCu8; // coin/service bits: inactive (active-low, idle high)
        if self.rtc.test_bit() {
            v |= 0x01;
        }
        if self.rtc.data_bit() {
            v |= 0x02;
        }
        v
    }

    /// Reads of `REG_SOUND` from the main side: the sound CPU's result byte.
    pub fn read_sound_result(&self) -> u8 {
        self.sound_result
    }

    /// Main-CPU write to `REG_SOUND`: stashes `cmd` and asserts the Z80 NMI
    /// line unless it is masked.
    pub fn write_sound_cmd(&mut self, value: u8) {
        self.sound_cmd = value;
        if !self.sound_nmi_masked {
            self.sound_nmi_pending = true;
        }
    }

    /// Z80 I/O port 0x00 read: returns the mailbox command and acknowledges
    /// (clears) the pending NMI.
    pub fn z80_read_mailbox_cmd(&mut self) -> u8 {
        self.sound_nmi_pending = false;
        self.sound_cmd
    }

    /// Z80 I/O port 0x0C write: stores the result byte the main CPU will
    /// observe through `REG_SOUND`.
    pub fn z80_write_sound_result(&mut self, value: u8) {
        self.sound_result = value;
    }

    /// Z80 I/O ports 0x08..0x0B (any write enables NMI) / 0x18 (disables).
    pub fn z80_set_nmi_mask(&mut self, masked: bool) {
        self.sound_nmi_masked = masked;
    }

    /// System-control write-only register decode, keyed by the low 24-bit
    /// address offset within the I/O window (see the memory map constants in
    /// `system.rs`).
    pub fn write_system_control(&mut self, which: SystemControlBit, value: u8) {
        match which {
            SystemControlBit::SwapBios => self.vector_source = RomSource::Bios,
            SystemControlBit::SwapRom => self.vector_source = RomSource::Cartridge,
            SystemControlBit::BoardFix => self.fix_source = RomSource::Bios,
            SystemControlBit::CartFix => self.fix_source = RomSource::Cartridge,
            // Naming is inverted: writing PALBANK1 selects bank B ("palette
            // bank 2"), writing PALBANK0 selects bank A ("palette bank 1").
            SystemControlBit::PalBank1 => self.palette_bank = PaletteBank::B,
            SystemControlBit::PalBank0 => self.palette_bank = PaletteBank::A,
            SystemControlBit::CardLock => self.memory_card_locked = value != 0,
            SystemControlBit::CoinCounter(n) => {
                if value != 0 {
                    if let Some(c) = self.coin_counters.get_mut(n as usize) {
                        *c += 1;
                    }
                }
            }
            SystemControlBit::Led1 => self.led1 = value,
            SystemControlBit::Led2 => self.led2 = value,
        }
    }

    /// `RTCCTRL` write: latches the 3-bit serial command word and forwards it
    /// to the RTC model, which updates its test/data outputs accordingly.
    pub fn write_rtc_ctrl(&mut self, value: u8) {
        self.rtc_command_bits = value & 0x07;
        self.rtc.write_command(self.rtc_command_bits, value);
    }
}

/// System-control register identities, decoded by `system.rs` from their
/// fixed addresses in the I/O window.
#[derive(Debug, Clone, Copy)]
pub enum SystemControlBit {
    SwapBios,
    SwapRom,
    BoardFix,
    CartFix,
    PalBank1,
    PalBank0,
    CardLock,
    CoinCounter(u8),
    Led1,
    Led2,
}

fn set_active_low(reg: &mut u8, bit: u8, active: bool) {
    if active {
        *reg &= !(1 << bit);
    } else {
        *reg |= 1 << bit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joypad_defaults_to_idle_high() {
        let io = IoRegs::new(BoardType::Mvs);
        assert_eq!(io.read_joypad(0), 0xFF);
    }

    #[test]
    fn set_joypad_roundtrips() {
        let mut io = IoRegs::new(BoardType::Mvs);
        io.set_joypad(0, 0b1110_0001);
        assert_eq!(io.read_joypad(0), 0b1110_0001);
    }

    #[test]
    fn start_select_are_active_low() {
        let mut io = IoRegs::new(BoardType::Mvs);
        io.set_start_select(0, true, false);
        assert_eq!(io.aux & 0x01, 0); // start bit pulled low
        assert_ne!(io.aux & 0x04, 0); // select bit stays high (not pressed)
    }

    #[test]
    fn systype_reflects_board() {
        let aes = IoRegs::new(BoardType::Aes);
        let mvs = IoRegs::new(BoardType::Mvs);
        assert_eq!(aes.read_systype() & 0x80, 0);
        assert_eq!(mvs.read_systype() & 0x80, 0x80);
    }

    #[test]
    fn palette_bank_toggle_is_idempotent() {
        let mut io = IoRegs::new(BoardType::Mvs);
        io.write_system_control(SystemControlBit::PalBank0, 0);
        io.write_system_control(SystemControlBit::PalBank0, 0);
        assert_eq!(io.palette_bank, PaletteBank::A);
        io.write_system_control(SystemControlBit::PalBank1, 0);
        assert_eq!(io.palette_bank, PaletteBank::B);
    }

    #[test]
    fn mailbox_write_asserts_nmi_unless_masked() {
        let mut io = IoRegs::new(BoardType::Mvs);
        io.write_sound_cmd(0xAB);
        assert!(io.sound_nmi_pending);
        assert_eq!(io.z80_read_mailbox_cmd(), 0xAB);
        assert!(!io.sound_nmi_pending);

        io.z80_set_nmi_mask(true);
        io.write_sound_cmd(0xCD);
        assert!(!io.sound_nmi_pending);
    }

    #[test]
    fn swap_bios_and_swap_rom_toggle_vector_source() {
        let mut io = IoRegs::new(BoardType::Mvs);
        io.write_system_control(SystemControlBit::SwapBios, 0);
        assert_eq!(io.vector_source, RomSource::Bios);
        io.write_system_control(SystemControlBit::SwapRom, 0);
        assert_eq!(io.vector_source, RomSource::Cartridge);
    }

    #[test]
    fn coin_counter_increments_on_nonzero_write() {
        let mut io = IoRegs::new(BoardType::Mvs);
        io.write_system_control(SystemControlBit::CoinCounter(0), 1);
        io.write_system_control(SystemControlBit::CoinCounter(0), 0);
        assert_eq!(io.coin_counters[0], 1);
    }
}
