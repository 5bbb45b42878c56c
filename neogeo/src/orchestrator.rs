//! Frame orchestrator: the per-frame loop tying the two CPUs, the sound
//! chip, the video raster, and the timer scheduler together, plus the
//! `NeoGeoSystem` Host ABI and its `Machine` adapter for frontend embedding.

use phosphor_core::core::bus::InterruptState;
use phosphor_core::core::machine::{InputButton, Machine};
use phosphor_core::core::BusMaster;
use phosphor_core::cpu::{Cpu68k, CpuZ80};

use crate::bios::{load_bios, BiosSet};
use crate::bus::MainBus;
use crate::cart::{load_cart, Cartridge};
use crate::clock;
use crate::error::CoreError;
use crate::io::BoardType;
use crate::rom_loader::RomSet;
use crate::sound::{SoundMemory, Z80Bus};
use crate::timer::{TimerKind, TimerScheduler};
use crate::video::{PaletteBank as VideoPaletteBank, RasterSources, FRAME_HEIGHT, FRAME_WIDTH};

const SAMPLES_PER_FRAME_HINT: usize = 735;

/// Watchdog period, in master cycles: a few frames' worth, matching
/// hardware firmware that services it well within that margin.
const WATCHDOG_PERIOD: i64 = clock::MASTER_CYCLES_PER_FRAME as i64 * 4;

const INPUT_BUTTONS: &[InputButton] = &[
    InputButton { id: 0, name: "P1 Up" },
    InputButton { id: 1, name: "P1 Down" },
    InputButton { id: 2, name: "P1 Left" },
    InputButton { id: 3, name: "P1 Right" },
    InputButton { id: 4, name: "P1 A" },
    InputButton { id: 5, name: "P1 B" },
    InputButton { id: 6, name: "P1 C" },
    InputButton { id: 7, name: "P1 D" },
    InputButton { id: 8, name: "P1 Start" },
    InputButton { id: 9, name: "P1 Select" },
    InputButton { id: 10, name: "P2 Up" },
    InputButton { id: 11, name: "P2 Down" },
    InputButton { id: 12, name: "P2 Left" },
    InputButton { id: 13, name: "P2 Right" },
    InputButton { id: 14, name: "P2 A" },
    InputButton { id: 15, name: "P2 B" },
    InputButton { id: 16, name: "P2 C" },
    InputButton { id: 17, name: "P2 D" },
    InputButton { id: 18, name: "P2 Start" },
    InputButton { id: 19, name: "P2 Select" },
];

/// The complete Neo Geo system: two CPUs, the sound chip, and every
/// subsystem `bus::MainBus`/`sound::SoundMemory` don't already own.
///
/// Generic over the concrete CPU decoders so dispatch is static (no `dyn`
/// overhead in the hot per-slice loop); a host picks `C1`/`C2` and the
/// resulting `NeoGeoSystem<C1, C2>` still satisfies `Machine` once
/// monomorphized, so a frontend can box *that* instead.
pub struct NeoGeoSystem<C1, C2> {
    bus: MainBus,
    sound_memory: SoundMemory,
    chip: crate::sound::ym2610::Ym2610,
    cpu1: C1,
    cpu2: C2,
    timers: TimerScheduler,
    sample_acc: clock::SampleAccumulator,
    audio_rate: u32,
    scanline: u16,
    joypad_state: [u8; 2],

    frame_buffer_rgb565: Vec<u16>,
    audio_buffer: Vec<i16>,
    chip_ticks_per_frame: u64,
}

impl<C1, C2> NeoGeoSystem<C1, C2>
where
    C1: Cpu68k + Default,
    C2: CpuZ80 + Default,
{
    /// Load the BIOS/SFIX/Y-zoom ROM set and bring up every subsystem in its
    /// power-on state. No cartridge is loaded yet; call [`load_cart`] before
    /// [`run_frame`](Self::run_frame) to get anything other than the BIOS's
    /// own (cartless) behavior.
    pub fn new(bios_roms: RomSet, audio_rate: u32, board: BoardType) -> Result<Self, CoreError> {
        let bios = load_bios(&bios_roms)?;
        let blank_cart = Cartridge {
            p_rom_bank1: vec![0; crate::cart::PROM_BANK_SIZE],
            p_rom_bank2_candidates: vec![],
            p_rom_bank2_selected: 0,
            s_rom: vec![],
            c_rom: vec![],
            m1_rom: vec![0u8; 0x8000],
            v1_rom: vec![],
            v2_rom: vec![],
            ngh: 0,
        };
        let bus = MainBus::new(blank_cart, bios, board);
        let chip_ticks_per_frame = clock::to_chip(clock::MASTER_CYCLES_PER_FRAME);

        let mut system = Self {
            bus,
            sound_memory: SoundMemory::new(),
            chip: crate::sound::ym2610::Ym2610::new(),
            cpu1: C1::default(),
            cpu2: C2::default(),
            timers: TimerScheduler::new(),
            sample_acc: clock::SampleAccumulator::new(audio_rate),
            audio_rate,
            scanline: 0,
            joypad_state: [0xFF, 0xFF],
            frame_buffer_rgb565: vec![0u16; FRAME_WIDTH * FRAME_HEIGHT],
            audio_buffer: Vec::with_capacity(SAMPLES_PER_FRAME_HINT * 2),
            chip_ticks_per_frame,
        };
        system.arm_power_on_timers();
        Ok(system)
    }

    /// Validate and install a cartridge, replacing whatever was previously
    /// loaded. Does not otherwise reset CPU/video/sound state; call
    /// [`reset`](Self::reset) afterward for a clean boot into the new game.
    pub fn load_cart(&mut self, roms: RomSet) -> Result<(), CoreError> {
        self.bus.cart = load_cart(&roms)?;
        Ok(())
    }

    fn arm_power_on_timers(&mut self) {
        self.timers.clear();
        self.timers.arm(
            TimerKind::VideoScanline,
            clock::MASTER_CYCLES_PER_SCANLINE as i64,
            true,
            clock::MASTER_CYCLES_PER_SCANLINE as i64,
        );
        self.timers.arm(TimerKind::Watchdog, WATCHDOG_PERIOD, true, WATCHDOG_PERIOD);
        // 60 Hz RTC retrace tick, expressed in master cycles.
        let rtc_period = (clock::MASTER_CYCLES_PER_FRAME as f64 * clock::NOMINAL_FRAME_RATE_HZ
            / 60.0) as i64;
        self.timers.arm(TimerKind::Rtc, rtc_period, true, rtc_period);
    }

    /// Re-initialize every subsystem, retaining the currently loaded
    /// cartridge and BIOS.
    pub fn reset(&mut self) {
        self.bus.reset();
        self.sound_memory.reset();
        self.chip.reset();
        self.cpu1 = C1::default();
        self.cpu2 = C2::default();
        self.scanline = 0;
        self.frame_buffer_rgb565.fill(0);
        self.audio_buffer.clear();
        self.arm_power_on_timers();
        self.cpu1.reset(&mut self.bus);
        let mut z80bus = self.z80_bus();
        self.cpu2.reset(&mut z80bus);
    }

    fn z80_bus(&mut self) -> Z80Bus<'_> {
        Z80Bus {
            memory: &mut self.sound_memory,
            m1_rom: &self.bus.cart.m1_rom,
            io: &mut self.bus.io,
            chip: &mut self.chip,
        }
    }

    pub fn set_joypad(&mut self, port: u8, bits: u8) {
        if let Some(slot) = self.joypad_state.get_mut(port as usize) {
            *slot = bits;
        }
        self.bus.io.set_joypad(port, bits);
    }

    pub fn set_start_select(&mut self, port: u8, start_pressed: bool, select_pressed: bool) {
        self.bus.io.set_start_select(port, start_pressed, select_pressed);
    }

    pub fn set_memory_card(&mut self, inserted: bool, locked: bool) {
        self.bus.io.set_memory_card(inserted, locked);
    }

    pub fn set_dip_switches(&mut self, bits: u8) {
        self.bus.io.set_dip_switches(bits);
    }

    pub fn frame_buffer(&self) -> &[u16] {
        &self.frame_buffer_rgb565
    }

    pub fn audio_buffer(&self) -> &[i16] {
        &self.audio_buffer
    }

    /// Board-type identification byte read from the system ROM at load
    /// time (`system_rom[0x400]`), surfaced read-only for hosts that want
    /// to display or log it. Does not affect AES/MVS behavior, which is
    /// governed by the `BoardType` passed to `new()`.
    pub fn bios_board_type_byte(&self) -> u8 {
        self.bus.bios.board_type_byte
    }

    /// Board-nationality identification byte read from the system ROM at
    /// load time (`system_rom[0x401]`).
    pub fn bios_nationality_byte(&self) -> u8 {
        self.bus.bios.nationality_byte
    }

    /// Execute exactly one frame's worth of master cycles.
    pub fn run_frame(&mut self) {
        self.audio_buffer.clear();
        let target_samples = self.sample_acc.next_frame_samples();
        let mut samples_emitted = 0usize;
        let mut chip_ticks_elapsed = 0u64;

        let mut remaining = clock::MASTER_CYCLES_PER_FRAME;
        while remaining > 0 {
            let mut slice = self.timers.next_event().unwrap_or(remaining).min(remaining);
            if slice == 0 {
                slice = 1;
            }

            let cpu1_budget = clock::to_cpu1(slice);
            let nmi_pending_before = self.bus.io.sound_nmi_pending;
            self.cpu1.execute(&mut self.bus, cpu1_budget);
            if let Some(fault) = self.bus.take_fault() {
                log::warn!("bus fault at {:#08x} (write={})", fault.address, fault.write);
            }
            // A mailbox write inside this slice asserted the Z80 NMI. The CPU
            // decoder is an opaque collaborator (see phosphor_core::cpu) so
            // this slice's already-elapsed cycles can't be clawed back, but
            // arming an immediate-fire MailboxSlice timer caps every
            // following slice to the next real timer boundary instead of
            // whatever large gap happened to be scheduled, so the sound CPU
            // is never more than a slice away from observing the command.
            if !nmi_pending_before && self.bus.io.sound_nmi_pending {
                self.timers.arm(TimerKind::MailboxSlice, 0, false, 0);
            }

            let cpu2_budget = clock::to_cpu2(slice);
            {
                let mut z80bus = self.z80_bus();
                self.cpu2.execute(&mut z80bus, cpu2_budget);
            }
            self.chip.sync_timers(&mut self.timers);

            let fired = self.timers.consume(slice);
            for kind in fired {
                self.handle_timer(kind);
            }

            self.cpu1.signal_interrupt(self.bus.check_interrupts(BusMaster::Cpu(0)));
            {
                let z80bus = self.z80_bus();
                let int = phosphor_core::core::Bus::check_interrupts(&z80bus, BusMaster::Cpu(1));
                self.cpu2.signal_interrupt(int);
            }

            if target_samples > 0 {
                let ticks_this_slice = clock::to_chip(slice).max(1);
                for _ in 0..ticks_this_slice {
                    chip_ticks_elapsed += 1;
                    let due = chip_ticks_elapsed * target_samples as u64
                        >= (samples_emitted as u64 + 1) * self.chip_ticks_per_frame.max(1);
                    if due && samples_emitted < target_samples {
                        let (l, r) = self.chip.render_sample(&self.bus.cart.v1_rom, &self.bus.cart.v2_rom);
                        self.audio_buffer.push(l);
                        self.audio_buffer.push(r);
                        samples_emitted += 1;
                    }
                }
            }

            remaining -= slice;
        }

        while samples_emitted < target_samples {
            let (l, r) = self.chip.render_sample(&self.bus.cart.v1_rom, &self.bus.cart.v2_rom);
            self.audio_buffer.push(l);
            self.audio_buffer.push(r);
            samples_emitted += 1;
        }
    }

    fn handle_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::Watchdog => self.reset(),
            TimerKind::VideoScanline => self.advance_scanline(),
            TimerKind::VideoIrq => {}
            TimerKind::SoundTimerA => self.chip.on_timer_a_underflow(),
            TimerKind::SoundTimerB => self.chip.on_timer_b_underflow(),
            TimerKind::MailboxSlice => {}
            TimerKind::Rtc => self.bus.io.rtc.tick_60hz(),
        }
    }

    fn advance_scanline(&mut self) {
        self.bus.video.tick_scanline_timer(clock::HPIXELS as i32);
        self.bus.video.set_scanline(self.scanline);

        let io_bank = self.bus.io.palette_bank;
        let palette_bank = match io_bank {
            crate::io::PaletteBank::A => VideoPaletteBank::A,
            crate::io::PaletteBank::B => VideoPaletteBank::B,
        };
        let fix_rom: &[u8] = match self.bus.io.fix_source {
            crate::io::RomSource::Bios => &self.bus.bios.sfix_rom,
            crate::io::RomSource::Cartridge => &self.bus.cart.s_rom,
        };
        let sources = RasterSources {
            y_zoom_rom: &self.bus.bios.y_zoom_rom,
            c_rom: &self.bus.cart.c_rom,
            s_rom: fix_rom,
            palette: &self.bus.palette,
            palette_bank,
            auto_anim_counter: self.bus.video.read_lspcmode() as u8 & 0x07,
        };
        crate::video::render_scanline(
            self.scanline,
            &self.bus.video.vram,
            &sources,
            &mut self.frame_buffer_rgb565,
        );

        if self.scanline as u64 == clock::VBLANK_LINE {
            self.bus.video.on_vblank();
        }
        self.scanline = (self.scanline + 1) % (clock::VPIXELS as u16);
    }
}

fn rgb565_to_rgb24(pixel: u16, out: &mut [u8]) {
    let r5 = (pixel >> 11) & 0x1F;
    let g6 = (pixel >> 5) & 0x3F;
    let b5 = pixel & 0x1F;
    out[0] = ((r5 << 3) | (r5 >> 2)) as u8;
    out[1] = ((g6 << 2) | (g6 >> 4)) as u8;
    out[2] = ((b5 << 3) | (b5 >> 2)) as u8;
}

impl<C1, C2> Machine for NeoGeoSystem<C1, C2>
where
    C1: Cpu68k + Default,
    C2: CpuZ80 + Default,
{
    fn display_size(&self) -> (u32, u32) {
        (FRAME_WIDTH as u32, FRAME_HEIGHT as u32)
    }

    fn run_frame(&mut self) {
        NeoGeoSystem::run_frame(self);
    }

    fn render_frame(&self, buffer: &mut [u8]) {
        for (pixel, out) in self
            .frame_buffer_rgb565
            .iter()
            .zip(buffer.chunks_exact_mut(3))
        {
            rgb565_to_rgb24(*pixel, out);
        }
    }

    fn set_input(&mut self, button: u8, pressed: bool) {
        let (port, bit) = match button {
            0..=7 => (0u8, button),
            8 => {
                let cur = self.joypad_state[0];
                let _ = cur;
                self.bus.io.set_start_select(0, pressed, false);
                return;
            }
            9 => {
                self.bus.io.set_start_select(0, false, pressed);
                return;
            }
            10..=17 => (1u8, button - 10),
            18 => {
                self.bus.io.set_start_select(1, pressed, false);
                return;
            }
            19 => {
                self.bus.io.set_start_select(1, false, pressed);
                return;
            }
            _ => return,
        };
        let mut bits = self.joypad_state[port as usize];
        if pressed {
            bits &= !(1 << bit);
        } else {
            bits |= 1 << bit;
        }
        self.set_joypad(port, bits);
    }

    fn input_map(&self) -> &[InputButton] {
        INPUT_BUTTONS
    }

    fn reset(&mut self) {
        NeoGeoSystem::reset(self);
    }

    fn fill_audio(&mut self, buffer: &mut [i16]) -> usize {
        let n = (self.audio_buffer.len() / 2).min(buffer.len() / 2);
        buffer[..n * 2].copy_from_slice(&self.audio_buffer[..n * 2]);
        n
    }

    fn audio_sample_rate(&self) -> u32 {
        self.audio_rate
    }

    fn frame_rate_hz(&self) -> f64 {
        clock::NOMINAL_FRAME_RATE_HZ
    }

    fn save_nvram(&self) -> Option<&[u8]> {
        Some(self.bus.backup_ram.0.as_slice())
    }

    fn load_nvram(&mut self, data: &[u8]) {
        self.bus.backup_ram.0.load_from_slice(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullCpu68k {
        pc: u32,
    }
    impl Default for NullCpu68k {
        fn default() -> Self {
            Self { pc: 0 }
        }
    }
    impl Cpu68k for NullCpu68k {
        fn execute(&mut self, _bus: &mut dyn phosphor_core::core::Bus<Address = u32, Data = u8>, cycle_budget: u64) -> u64 {
            cycle_budget
        }
        fn reset(&mut self, bus: &mut dyn phosphor_core::core::Bus<Address = u32, Data = u8>) {
            let hi = phosphor_core::core::Bus::read(bus, BusMaster::Cpu(0), 4) as u32;
            let lo = phosphor_core::core::Bus::read(bus, BusMaster::Cpu(0), 5) as u32;
            self.pc = (hi << 8) | lo;
        }
        fn signal_interrupt(&mut self, _int: InterruptState) {}
        fn is_sleeping(&self) -> bool {
            false
        }
    }

    #[derive(Default)]
    struct NullCpuZ80;
    impl CpuZ80 for NullCpuZ80 {
        fn execute(&mut self, _bus: &mut dyn phosphor_core::core::Bus<Address = u16, Data = u8>, cycle_budget: u64) -> u64 {
            cycle_budget
        }
        fn reset(&mut self, _bus: &mut dyn phosphor_core::core::Bus<Address = u16, Data = u8>) {}
        fn signal_interrupt(&mut self, _int: InterruptState) {}
        fn is_sleeping(&self) -> bool {
            false
        }
    }

    fn test_bios_roms() -> RomSet {
        let mut sp = vec![0u8; 0x20000];
        sp[4] = 0x00;
        sp[5] = 0x08;
        RomSet::from_slices(&[
            ("sp-s2.sp1", &sp),
            ("sfix.sfix", &[0u8; 0x10000]),
            ("000-lo.lo", &[0u8; 0x10000]),
        ])
    }

    #[test]
    fn empty_frame_produces_uniform_backdrop_and_expected_sample_count() {
        let mut sys: NeoGeoSystem<NullCpu68k, NullCpuZ80> =
            NeoGeoSystem::new(test_bios_roms(), 44_100, BoardType::Mvs).expect("bios loads");
        sys.run_frame();
        let fb = sys.frame_buffer();
        assert_eq!(fb.len(), FRAME_WIDTH * FRAME_HEIGHT);
        assert!(fb.iter().all(|&p| p == fb[0]));

        let expected = (44_100f64 / clock::NOMINAL_FRAME_RATE_HZ).round() as usize;
        assert!(sys.audio_buffer().len() / 2 == expected || (sys.audio_buffer().len() / 2).abs_diff(expected) <= 1);
    }

    #[test]
    fn reset_clears_scanline_and_frame_buffer() {
        let mut sys: NeoGeoSystem<NullCpu68k, NullCpuZ80> =
            NeoGeoSystem::new(test_bios_roms(), 44_100, BoardType::Mvs).expect("bios loads");
        sys.run_frame();
        sys.reset();
        assert_eq!(sys.scanline, 0);
        assert!(sys.frame_buffer().iter().all(|&p| p == 0));
    }

    #[test]
    fn joypad_roundtrips_through_io_regs() {
        let mut sys: NeoGeoSystem<NullCpu68k, NullCpuZ80> =
            NeoGeoSystem::new(test_bios_roms(), 44_100, BoardType::Mvs).expect("bios loads");
        sys.set_joypad(0, 0b1111_0000);
        assert_eq!(sys.bus.io.read_joypad(0), 0b1111_0000);
    }

    #[test]
    fn machine_set_input_clears_bit_for_press() {
        let mut sys: NeoGeoSystem<NullCpu68k, NullCpuZ80> =
            NeoGeoSystem::new(test_bios_roms(), 44_100, BoardType::Mvs).expect("bios loads");
        Machine::set_input(&mut sys, 0, true); // P1 Up pressed
        assert_eq!(sys.bus.io.read_joypad(0) & 0x01, 0);
        Machine::set_input(&mut sys, 0, false);
        assert_ne!(sys.bus.io.read_joypad(0) & 0x01, 0);
    }

    /// Writes the sound command mailbox once on its first call, otherwise
    /// behaves like `NullCpu68k`.
    #[derive(Default)]
    struct MailboxWritingCpu68k {
        written: bool,
    }
    impl Cpu68k for MailboxWritingCpu68k {
        fn execute(&mut self, bus: &mut dyn phosphor_core::core::Bus<Address = u32, Data = u8>, cycle_budget: u64) -> u64 {
            if !self.written {
                self.written = true;
                phosphor_core::core::Bus::write(
                    bus,
                    BusMaster::Cpu(0),
                    crate::system::IO_WINDOW_START + crate::system::io_offset::SOUND,
                    0x01,
                );
            }
            cycle_budget
        }
        fn reset(&mut self, _bus: &mut dyn phosphor_core::core::Bus<Address = u32, Data = u8>) {}
        fn signal_interrupt(&mut self, _int: InterruptState) {}
        fn is_sleeping(&self) -> bool {
            false
        }
    }

    #[test]
    fn mailbox_write_arms_slice_cap_timer() {
        let mut sys: NeoGeoSystem<MailboxWritingCpu68k, NullCpuZ80> =
            NeoGeoSystem::new(test_bios_roms(), 44_100, BoardType::Mvs).expect("bios loads");
        sys.run_frame();
        assert!(sys.bus.io.sound_nmi_pending);
    }
}
