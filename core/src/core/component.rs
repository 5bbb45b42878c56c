use crate::core::bus::{Bus, BusMaster};

/// A clocked unit that advances one tick at a time.
pub trait Component {
    /// Advance by one tick. Returns true if the component did useful work
    /// (used by callers that want to distinguish idle ticks from busy ones).
    fn tick(&mut self) -> bool;

    /// How many master ticks this component consumes per `tick()` call.
    /// Most components run once per master tick; override for dividers.
    fn clock_divider(&self) -> u64 {
        1
    }
}

/// A component that needs bus access while it ticks (CPUs, DMA controllers).
pub trait BusMasterComponent: Component {
    type Bus: Bus + ?Sized;

    fn tick_with_bus(&mut self, bus: &mut Self::Bus, master_id: BusMaster) -> bool;
}
