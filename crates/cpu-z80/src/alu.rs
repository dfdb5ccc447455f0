//! Arithmetic and logic helpers.
//!
//! Every helper returns the result value together with the complete flags
//! byte so the dispatch code stays a straight table of calls.

use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, sz53, sz53p};

/// An 8-bit ALU result paired with its flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    pub value: u8,
    pub flags: u8,
}

/// 8-bit addition with optional carry-in.
#[must_use]
pub fn add8(a: u8, b: u8, carry: bool) -> AluResult {
    let c = u16::from(carry);
    let wide = u16::from(a) + u16::from(b) + c;
    let value = wide as u8;
    let mut flags = sz53(value);
    if wide > 0xFF {
        flags |= CF;
    }
    if (a & 0x0F) + (b & 0x0F) + c as u8 > 0x0F {
        flags |= HF;
    }
    // Overflow: operands agree in sign, result differs.
    if (a ^ b) & 0x80 == 0 && (a ^ value) & 0x80 != 0 {
        flags |= PF;
    }
    AluResult { value, flags }
}

/// 8-bit subtraction with optional borrow-in.
#[must_use]
pub fn sub8(a: u8, b: u8, carry: bool) -> AluResult {
    let c = u16::from(carry);
    let wide = u16::from(a).wrapping_sub(u16::from(b)).wrapping_sub(c);
    let value = wide as u8;
    let mut flags = sz53(value) | NF;
    if wide > 0xFF {
        flags |= CF;
    }
    if (a & 0x0F) < (b & 0x0F) + c as u8 {
        flags |= HF;
    }
    if (a ^ b) & 0x80 != 0 && (a ^ value) & 0x80 != 0 {
        flags |= PF;
    }
    AluResult { value, flags }
}

/// Logical AND. Sets the half-carry flag, as the hardware does.
#[must_use]
pub fn and8(a: u8, b: u8) -> AluResult {
    let value = a & b;
    AluResult {
        value,
        flags: sz53p(value) | HF,
    }
}

#[must_use]
pub fn or8(a: u8, b: u8) -> AluResult {
    let value = a | b;
    AluResult {
        value,
        flags: sz53p(value),
    }
}

#[must_use]
pub fn xor8(a: u8, b: u8) -> AluResult {
    let value = a ^ b;
    AluResult {
        value,
        flags: sz53p(value),
    }
}

/// Increment. Carry is unaffected by INC, so the caller merges it back.
#[must_use]
pub fn inc8(v: u8) -> AluResult {
    let value = v.wrapping_add(1);
    let mut flags = sz53(value);
    if v & 0x0F == 0x0F {
        flags |= HF;
    }
    if v == 0x7F {
        flags |= PF;
    }
    AluResult { value, flags }
}

/// Decrement. Carry is unaffected by DEC, so the caller merges it back.
#[must_use]
pub fn dec8(v: u8) -> AluResult {
    let value = v.wrapping_sub(1);
    let mut flags = sz53(value) | NF;
    if v & 0x0F == 0 {
        flags |= HF;
    }
    if v == 0x80 {
        flags |= PF;
    }
    AluResult { value, flags }
}

/// 16-bit ADD. Only H, N, C and the undocumented bits change; the caller
/// keeps S, Z and P/V from the previous flags.
#[must_use]
pub fn add16(a: u16, b: u16, old_flags: u8) -> (u16, u8) {
    let wide = u32::from(a) + u32::from(b);
    let value = wide as u16;
    let mut flags = old_flags & (SF | ZF | PF);
    flags |= ((value >> 8) as u8) & (YF | XF);
    if wide > 0xFFFF {
        flags |= CF;
    }
    if (a & 0x0FFF) + (b & 0x0FFF) > 0x0FFF {
        flags |= HF;
    }
    (value, flags)
}

/// 16-bit ADC. Full flag computation, Z from the 16-bit result.
#[must_use]
pub fn adc16(a: u16, b: u16, carry: bool) -> (u16, u8) {
    let c = u32::from(carry);
    let wide = u32::from(a) + u32::from(b) + c;
    let value = wide as u16;
    let mut flags = ((value >> 8) as u8) & (SF | YF | XF);
    if value == 0 {
        flags |= ZF;
    }
    if wide > 0xFFFF {
        flags |= CF;
    }
    if (a & 0x0FFF) + (b & 0x0FFF) + c as u16 > 0x0FFF {
        flags |= HF;
    }
    if (a ^ b) & 0x8000 == 0 && (a ^ value) & 0x8000 != 0 {
        flags |= PF;
    }
    (value, flags)
}

/// 16-bit SBC. Full flag computation, Z from the 16-bit result.
#[must_use]
pub fn sbc16(a: u16, b: u16, carry: bool) -> (u16, u8) {
    let c = u32::from(carry);
    let wide = u32::from(a).wrapping_sub(u32::from(b)).wrapping_sub(c);
    let value = wide as u16;
    let mut flags = NF | (((value >> 8) as u8) & (SF | YF | XF));
    if value == 0 {
        flags |= ZF;
    }
    if wide > 0xFFFF {
        flags |= CF;
    }
    if (a & 0x0FFF) < (b & 0x0FFF) + c as u16 {
        flags |= HF;
    }
    if (a ^ b) & 0x8000 != 0 && (a ^ value) & 0x8000 != 0 {
        flags |= PF;
    }
    (value, flags)
}

/// Rotate left circular.
#[must_use]
pub fn rlc8(v: u8) -> AluResult {
    let value = v.rotate_left(1);
    let mut flags = sz53p(value);
    if v & 0x80 != 0 {
        flags |= CF;
    }
    AluResult { value, flags }
}

/// Rotate right circular.
#[must_use]
pub fn rrc8(v: u8) -> AluResult {
    let value = v.rotate_right(1);
    let mut flags = sz53p(value);
    if v & 0x01 != 0 {
        flags |= CF;
    }
    AluResult { value, flags }
}

/// Rotate left through carry.
#[must_use]
pub fn rl8(v: u8, carry: bool) -> AluResult {
    let value = (v << 1) | u8::from(carry);
    let mut flags = sz53p(value);
    if v & 0x80 != 0 {
        flags |= CF;
    }
    AluResult { value, flags }
}

/// Rotate right through carry.
#[must_use]
pub fn rr8(v: u8, carry: bool) -> AluResult {
    let value = (v >> 1) | (u8::from(carry) << 7);
    let mut flags = sz53p(value);
    if v & 0x01 != 0 {
        flags |= CF;
    }
    AluResult { value, flags }
}

/// Shift left arithmetic.
#[must_use]
pub fn sla8(v: u8) -> AluResult {
    let value = v << 1;
    let mut flags = sz53p(value);
    if v & 0x80 != 0 {
        flags |= CF;
    }
    AluResult { value, flags }
}

/// Shift right arithmetic, sign bit preserved.
#[must_use]
pub fn sra8(v: u8) -> AluResult {
    let value = (v >> 1) | (v & 0x80);
    let mut flags = sz53p(value);
    if v & 0x01 != 0 {
        flags |= CF;
    }
    AluResult { value, flags }
}

/// Undocumented shift left that sets bit 0.
#[must_use]
pub fn sll8(v: u8) -> AluResult {
    let value = (v << 1) | 0x01;
    let mut flags = sz53p(value);
    if v & 0x80 != 0 {
        flags |= CF;
    }
    AluResult { value, flags }
}

/// Shift right logical.
#[must_use]
pub fn srl8(v: u8) -> AluResult {
    let value = v >> 1;
    let mut flags = sz53p(value);
    if v & 0x01 != 0 {
        flags |= CF;
    }
    AluResult { value, flags }
}

/// Decimal adjust after addition or subtraction.
#[must_use]
pub fn daa(a: u8, old_flags: u8) -> AluResult {
    let mut correction = 0u8;
    let mut carry = old_flags & CF;
    if old_flags & HF != 0 || a & 0x0F > 0x09 {
        correction |= 0x06;
    }
    if carry != 0 || a > 0x99 {
        correction |= 0x60;
        carry = CF;
    }
    let value = if old_flags & NF == 0 {
        a.wrapping_add(correction)
    } else {
        a.wrapping_sub(correction)
    };
    let mut flags = sz53p(value) | (old_flags & NF) | carry;
    if (a ^ value) & HF != 0 {
        flags |= HF;
    }
    AluResult { value, flags }
}
