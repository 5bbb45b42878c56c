//! Placeholder 68000/Z80 decoders.
//!
//! `neogeo_core` deliberately ships no instruction-level CPU decoder (see
//! `phosphor_core::cpu`'s doc comment) — that is a separate, much larger
//! undertaking the frontend would normally pull in as its own dependency.
//! These stand-ins only fetch the reset vector and otherwise burn their
//! cycle budget doing nothing, enough to exercise the bus/video/sound
//! wiring end to end without a real program counter driving it.

use phosphor_core::core::bus::InterruptState;
use phosphor_core::core::Bus;
use phosphor_core::cpu::{Cpu68k, CpuZ80};

#[derive(Default)]
pub struct StubCpu68k {
    pc: u32,
    sp: u32,
}

impl Cpu68k for StubCpu68k {
    fn execute(&mut self, _bus: &mut dyn Bus<Address = u32, Data = u8>, cycle_budget: u64) -> u64 {
        cycle_budget
    }

    fn reset(&mut self, bus: &mut dyn Bus<Address = u32, Data = u8>) {
        let sp_hi = bus.read(phosphor_core::core::BusMaster::Cpu(0), 0) as u32;
        let sp_lo = bus.read(phosphor_core::core::BusMaster::Cpu(0), 1) as u32;
        let pc_hi = bus.read(phosphor_core::core::BusMaster::Cpu(0), 4) as u32;
        let pc_lo = bus.read(phosphor_core::core::BusMaster::Cpu(0), 5) as u32;
        self.sp = (sp_hi << 8) | sp_lo;
        self.pc = (pc_hi << 8) | pc_lo;
    }

    fn signal_interrupt(&mut self, _int: InterruptState) {}

    fn is_sleeping(&self) -> bool {
        false
    }
}

#[derive(Default)]
pub struct StubCpuZ80;

impl CpuZ80 for StubCpuZ80 {
    fn execute(&mut self, _bus: &mut dyn Bus<Address = u16, Data = u8>, cycle_budget: u64) -> u64 {
        cycle_budget
    }

    fn reset(&mut self, _bus: &mut dyn Bus<Address = u16, Data = u8>) {}

    fn signal_interrupt(&mut self, _int: InterruptState) {}

    fn is_sleeping(&self) -> bool {
        false
    }
}
