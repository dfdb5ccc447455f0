//! Peripheral signal lines.

use std::ops::{BitOr, BitOrAssign};

/// The signal lines peripherals can drive on a real Z80.
///
/// Each line is independently set and cleared by the host; the CPU samples
/// them in fixed priority order at the start of every cycle step. Servicing
/// a signal does not clear the line: signal lines are level-held by the
/// peripheral, so the host decides when they drop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalFlags(u8);

impl SignalFlags {
    /// No signal active.
    pub const NONE: Self = Self(0);

    /// Hard reset requested.
    pub const RESET: Self = Self(0b0000_0001);

    /// The CPU has executed HALT and is burning refresh cycles.
    pub const HALTED: Self = Self(0b0000_0010);

    /// Maskable interrupt requested.
    pub const INT: Self = Self(0b0000_0100);

    /// Non-maskable interrupt requested.
    pub const NMI: Self = Self(0b0000_1000);

    /// True if any of `other`'s bits are set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// True if no signal is active.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Raise the given signal bits.
    pub const fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Drop the given signal bits.
    pub const fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for SignalFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SignalFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove_are_independent() {
        let mut signals = SignalFlags::NONE;
        signals.insert(SignalFlags::INT);
        signals.insert(SignalFlags::NMI);
        assert!(signals.contains(SignalFlags::INT));
        assert!(signals.contains(SignalFlags::NMI));

        signals.remove(SignalFlags::INT);
        assert!(!signals.contains(SignalFlags::INT));
        assert!(signals.contains(SignalFlags::NMI));
    }

    #[test]
    fn default_is_empty() {
        assert!(SignalFlags::default().is_empty());
    }
}
