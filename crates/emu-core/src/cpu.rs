//! CPU core trait.

use crate::Bus;

/// A CPU core driven by host cycle steps.
///
/// One call to [`Cpu::cycle_step`] performs exactly one discrete processing
/// step (a signal check, a prefix byte, or a complete operation) and
/// advances the core's tact counter by the real hardware's clock cost for
/// whatever was done. The host is free to interleave peripheral work
/// between steps; the core never runs ahead on its own.
pub trait Cpu {
    /// Snapshot type for register inspection.
    type Registers;

    /// Advance emulation by one cycle step.
    ///
    /// The bus is passed in, not owned, so the host can share it with
    /// other components between steps.
    fn cycle_step<B: Bus>(&mut self, bus: &mut B);

    /// Apply a hard reset through one cycle step.
    fn reset<B: Bus>(&mut self, bus: &mut B);

    /// Returns a snapshot of all registers.
    fn registers(&self) -> Self::Registers;

    /// Returns true if the CPU is halted.
    fn is_halted(&self) -> bool;
}
