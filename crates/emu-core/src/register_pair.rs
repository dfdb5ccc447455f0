//! 16-bit register pair with 8-bit half access.

/// One 16-bit register addressable as a whole or as high/low bytes.
///
/// Real hardware aliases the same silicon for both views. Modelling that
/// with overlapping storage invites aliasing bugs, so this is a plain
/// `u16` behind explicit accessors with identical read/write semantics.
/// All arithmetic wraps: 16-bit values modulo 65536, 8-bit modulo 256.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterPair(u16);

impl RegisterPair {
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// The full 16-bit value.
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }

    pub const fn set_value(&mut self, value: u16) {
        self.0 = value;
    }

    /// The high byte.
    #[must_use]
    pub const fn high(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// The low byte.
    #[must_use]
    pub const fn low(self) -> u8 {
        self.0 as u8
    }

    pub const fn set_high(&mut self, value: u8) {
        self.0 = (self.0 & 0x00FF) | ((value as u16) << 8);
    }

    pub const fn set_low(&mut self, value: u8) {
        self.0 = (self.0 & 0xFF00) | value as u16;
    }

    /// Increment the pair, wrapping at 65536.
    pub const fn inc(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    /// Decrement the pair, wrapping at zero.
    pub const fn dec(&mut self) {
        self.0 = self.0.wrapping_sub(1);
    }

    /// Add `delta` to the pair, wrapping.
    pub const fn add(&mut self, delta: u16) {
        self.0 = self.0.wrapping_add(delta);
    }
}

impl From<u16> for RegisterPair {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_round_trip_for_all_values() {
        // Exhaustive: byte-accessor writes followed by 16-bit read must
        // reproduce every value, and the reverse split must match.
        for value in 0..=u16::MAX {
            let mut pair = RegisterPair::default();
            pair.set_high((value >> 8) as u8);
            pair.set_low(value as u8);
            assert_eq!(pair.value(), value);
            assert_eq!(pair.high(), (value >> 8) as u8);
            assert_eq!(pair.low(), value as u8);
        }
    }

    #[test]
    fn set_high_preserves_low() {
        let mut pair = RegisterPair::new(0x12AB);
        pair.set_high(0xFF);
        assert_eq!(pair.value(), 0xFFAB);
    }

    #[test]
    fn set_low_preserves_high() {
        let mut pair = RegisterPair::new(0x12AB);
        pair.set_low(0x00);
        assert_eq!(pair.value(), 0x1200);
    }

    #[test]
    fn inc_dec_wrap() {
        let mut pair = RegisterPair::new(0xFFFF);
        pair.inc();
        assert_eq!(pair.value(), 0x0000);
        pair.dec();
        assert_eq!(pair.value(), 0xFFFF);
    }
}
