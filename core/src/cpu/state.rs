//! CPU state snapshot contract.
//!
//! A concrete CPU decoder (host-supplied) can implement this for debugging
//! or test-vector comparison; the engine itself never inspects a snapshot.

pub trait CpuStateTrait {
    type Snapshot;
    fn snapshot(&self) -> Self::Snapshot;
}
