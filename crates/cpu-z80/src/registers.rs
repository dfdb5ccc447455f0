//! The Z80 register file.

use emu_core::RegisterPair;

/// Full Z80 register set: primary pairs, shadow pairs, index registers,
/// the stack pointer and program counter, the interrupt/refresh pair and
/// the internal WZ scratch register.
///
/// WZ is the hidden 16-bit register real silicon uses while assembling
/// multi-byte addresses. It is observable through the undocumented flag
/// bits of a few operations, so it is modelled as a first-class pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    pub af: RegisterPair,
    pub bc: RegisterPair,
    pub de: RegisterPair,
    pub hl: RegisterPair,
    pub af_alt: RegisterPair,
    pub bc_alt: RegisterPair,
    pub de_alt: RegisterPair,
    pub hl_alt: RegisterPair,
    pub ix: RegisterPair,
    pub iy: RegisterPair,
    pub sp: u16,
    pub pc: u16,
    /// Interrupt vector base (high byte) and refresh counter (low byte).
    pub ir: RegisterPair,
    /// Internal address-formation scratch register.
    pub wz: RegisterPair,
}

impl Registers {
    #[must_use]
    pub const fn a(&self) -> u8 {
        self.af.high()
    }

    pub const fn set_a(&mut self, value: u8) {
        self.af.set_high(value);
    }

    #[must_use]
    pub const fn f(&self) -> u8 {
        self.af.low()
    }

    pub const fn set_f(&mut self, value: u8) {
        self.af.set_low(value);
    }

    #[must_use]
    pub const fn b(&self) -> u8 {
        self.bc.high()
    }

    pub const fn set_b(&mut self, value: u8) {
        self.bc.set_high(value);
    }

    #[must_use]
    pub const fn c(&self) -> u8 {
        self.bc.low()
    }

    pub const fn set_c(&mut self, value: u8) {
        self.bc.set_low(value);
    }

    #[must_use]
    pub const fn d(&self) -> u8 {
        self.de.high()
    }

    pub const fn set_d(&mut self, value: u8) {
        self.de.set_high(value);
    }

    #[must_use]
    pub const fn e(&self) -> u8 {
        self.de.low()
    }

    pub const fn set_e(&mut self, value: u8) {
        self.de.set_low(value);
    }

    #[must_use]
    pub const fn h(&self) -> u8 {
        self.hl.high()
    }

    pub const fn set_h(&mut self, value: u8) {
        self.hl.set_high(value);
    }

    #[must_use]
    pub const fn l(&self) -> u8 {
        self.hl.low()
    }

    pub const fn set_l(&mut self, value: u8) {
        self.hl.set_low(value);
    }

    /// Interrupt vector base register.
    #[must_use]
    pub const fn i(&self) -> u8 {
        self.ir.high()
    }

    pub const fn set_i(&mut self, value: u8) {
        self.ir.set_high(value);
    }

    /// Memory refresh register.
    #[must_use]
    pub const fn r(&self) -> u8 {
        self.ir.low()
    }

    pub const fn set_r(&mut self, value: u8) {
        self.ir.set_low(value);
    }

    /// Swap BC, DE and HL with their shadow pairs (EXX).
    pub const fn exx(&mut self) {
        core::mem::swap(&mut self.bc, &mut self.bc_alt);
        core::mem::swap(&mut self.de, &mut self.de_alt);
        core::mem::swap(&mut self.hl, &mut self.hl_alt);
    }

    /// Swap AF with its shadow pair (EX AF,AF').
    pub const fn ex_af(&mut self) {
        core::mem::swap(&mut self.af, &mut self.af_alt);
    }

    /// Swap DE and HL (EX DE,HL).
    pub const fn ex_de_hl(&mut self) {
        core::mem::swap(&mut self.de, &mut self.hl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_accessors_alias_the_pairs() {
        let mut regs = Registers::default();
        regs.set_a(0x12);
        regs.set_f(0x34);
        assert_eq!(regs.af.value(), 0x1234);

        regs.bc.set_value(0xABCD);
        assert_eq!(regs.b(), 0xAB);
        assert_eq!(regs.c(), 0xCD);
    }

    #[test]
    fn exx_swaps_three_pairs_and_leaves_af() {
        let mut regs = Registers::default();
        regs.af.set_value(0x1111);
        regs.bc.set_value(0x2222);
        regs.de.set_value(0x3333);
        regs.hl.set_value(0x4444);
        regs.bc_alt.set_value(0xAAAA);
        regs.de_alt.set_value(0xBBBB);
        regs.hl_alt.set_value(0xCCCC);

        regs.exx();

        assert_eq!(regs.af.value(), 0x1111);
        assert_eq!(regs.bc.value(), 0xAAAA);
        assert_eq!(regs.de.value(), 0xBBBB);
        assert_eq!(regs.hl.value(), 0xCCCC);
        assert_eq!(regs.bc_alt.value(), 0x2222);
    }

    #[test]
    fn ex_af_swaps_only_af() {
        let mut regs = Registers::default();
        regs.af.set_value(0x1234);
        regs.af_alt.set_value(0x5678);
        regs.bc.set_value(0x9ABC);

        regs.ex_af();

        assert_eq!(regs.af.value(), 0x5678);
        assert_eq!(regs.af_alt.value(), 0x1234);
        assert_eq!(regs.bc.value(), 0x9ABC);
    }

    #[test]
    fn i_and_r_share_the_ir_pair() {
        let mut regs = Registers::default();
        regs.set_i(0x3F);
        regs.set_r(0x7A);
        assert_eq!(regs.ir.value(), 0x3F7A);
    }
}
