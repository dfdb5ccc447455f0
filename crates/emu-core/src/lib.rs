//! Core traits and types for tact-accurate emulation.
//!
//! A CPU core holds no memory of its own. The host supplies memory and I/O
//! port access through the [`Bus`] trait and drives the core one cycle step
//! at a time. Scheduling, pausing, and interleaving peripheral work between
//! steps all belong to the host; nothing here ever blocks.

mod bus;
mod cpu;
mod observable;
mod register_pair;

pub use bus::{Bus, SimpleBus};
pub use cpu::Cpu;
pub use observable::{Observable, Value};
pub use register_pair::RegisterPair;
