//! Tact-accurate Z80 CPU core.
//!
//! One call to `cycle_step()` performs one discrete processing step (a
//! prefix byte, a complete operation, or a signal response) and charges
//! exactly the tact cost the hardware would. Decode state deliberately
//! spans successive steps: after a prefix byte the core returns to the
//! host with the interrupt-blocked window open, so peripheral work can be
//! interleaved at the same points real hardware exposes.

mod alu;
mod cpu;
mod flags;
mod registers;
mod signals;

pub use cpu::{CpuError, IndexMode, PrefixMode, Z80};
pub use flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
pub use registers::Registers;
pub use signals::SignalFlags;
