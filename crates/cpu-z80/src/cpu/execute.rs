//! Operation dispatch for the standard, extended and bit pages.
//!
//! By the time any of these run, the operation byte has been fetched and
//! the four fetch tacts (three for the read, one for refresh) charged.
//! Each handler charges only the remaining cost of its operation.

use emu_core::Bus;

use super::{IndexMode, SignalFlags, Z80};
use crate::alu;
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, sz53, sz53p};

impl Z80 {
    /// Execute one operation from the standard page.
    pub(super) fn execute_standard_op<B: Bus>(&mut self, bus: &mut B) {
        let op = self.opcode;
        match op {
            // NOP
            0x00 => {}

            // LD dd,nn
            0x01 | 0x11 | 0x21 | 0x31 => {
                let value = self.imm16(bus);
                self.set_reg16_dd(op >> 4, value);
            }

            // LD (BC),A / LD (DE),A
            0x02 | 0x12 => {
                let addr = if op == 0x02 {
                    self.regs.bc.value()
                } else {
                    self.regs.de.value()
                };
                let a = self.regs.a();
                // WZ: low byte of addr+1, A in the high byte
                self.regs.wz.set_low(addr.wrapping_add(1) as u8);
                self.regs.wz.set_high(a);
                self.write_mem(bus, addr, a);
            }

            // LD A,(BC) / LD A,(DE)
            0x0A | 0x1A => {
                let addr = if op == 0x0A {
                    self.regs.bc.value()
                } else {
                    self.regs.de.value()
                };
                self.regs.wz.set_value(addr.wrapping_add(1));
                let value = self.read_mem(bus, addr);
                self.regs.set_a(value);
            }

            // INC ss
            0x03 | 0x13 | 0x23 | 0x33 => {
                self.clock(2);
                let code = op >> 4;
                self.set_reg16_dd(code, self.reg16_dd(code).wrapping_add(1));
            }

            // DEC ss
            0x0B | 0x1B | 0x2B | 0x3B => {
                self.clock(2);
                let code = op >> 4;
                self.set_reg16_dd(code, self.reg16_dd(code).wrapping_sub(1));
            }

            // INC r
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x3C => {
                let code = op >> 3;
                let r = alu::inc8(self.reg8(code));
                self.set_reg8(code, r.value);
                self.regs.set_f(r.flags | (self.regs.f() & CF));
            }

            // DEC r
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x3D => {
                let code = op >> 3;
                let r = alu::dec8(self.reg8(code));
                self.set_reg8(code, r.value);
                self.regs.set_f(r.flags | (self.regs.f() & CF));
            }

            // INC (HL) / INC (IX+d) / INC (IY+d)
            0x34 => {
                let addr = self.operand_addr(bus);
                let r = alu::inc8(self.read_mem(bus, addr));
                self.clock(1);
                self.write_mem(bus, addr, r.value);
                self.regs.set_f(r.flags | (self.regs.f() & CF));
            }

            // DEC (HL) / DEC (IX+d) / DEC (IY+d)
            0x35 => {
                let addr = self.operand_addr(bus);
                let r = alu::dec8(self.read_mem(bus, addr));
                self.clock(1);
                self.write_mem(bus, addr, r.value);
                self.regs.set_f(r.flags | (self.regs.f() & CF));
            }

            // LD r,n
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x3E => {
                let value = self.imm8(bus);
                self.set_reg8(op >> 3, value);
            }

            // LD (HL),n / LD (IX+d),n / LD (IY+d),n
            0x36 => {
                if self.index_mode == IndexMode::None {
                    let value = self.imm8(bus);
                    self.write_mem(bus, self.regs.hl.value(), value);
                } else {
                    // displacement and the value arrive before the
                    // address-formation tacts
                    let displacement = self.imm8(bus) as i8;
                    let value = self.imm8(bus);
                    self.clock(2);
                    let addr = self.hl_or_index().wrapping_add(displacement as u16);
                    self.regs.wz.set_value(addr);
                    self.write_mem(bus, addr, value);
                }
            }

            // RLCA
            0x07 => {
                let a = self.regs.a().rotate_left(1);
                self.regs.set_a(a);
                let f = (self.regs.f() & (SF | ZF | PF)) | (a & (YF | XF)) | (a & CF);
                self.regs.set_f(f);
            }

            // RRCA
            0x0F => {
                let old = self.regs.a();
                let a = old.rotate_right(1);
                self.regs.set_a(a);
                let mut f = (self.regs.f() & (SF | ZF | PF)) | (a & (YF | XF));
                if old & 0x01 != 0 {
                    f |= CF;
                }
                self.regs.set_f(f);
            }

            // RLA
            0x17 => {
                let old = self.regs.a();
                let a = (old << 1) | (self.regs.f() & CF);
                self.regs.set_a(a);
                let mut f = (self.regs.f() & (SF | ZF | PF)) | (a & (YF | XF));
                if old & 0x80 != 0 {
                    f |= CF;
                }
                self.regs.set_f(f);
            }

            // RRA
            0x1F => {
                let old = self.regs.a();
                let a = (old >> 1) | ((self.regs.f() & CF) << 7);
                self.regs.set_a(a);
                let mut f = (self.regs.f() & (SF | ZF | PF)) | (a & (YF | XF));
                if old & 0x01 != 0 {
                    f |= CF;
                }
                self.regs.set_f(f);
            }

            // EX AF,AF'
            0x08 => self.regs.ex_af(),

            // ADD HL,ss (or ADD IX/IY,ss under a prefix)
            0x09 | 0x19 | 0x29 | 0x39 => {
                self.clock(7);
                let lhs = self.hl_or_index();
                self.regs.wz.set_value(lhs.wrapping_add(1));
                let rhs = self.reg16_dd(op >> 4);
                let (value, flags) = alu::add16(lhs, rhs, self.regs.f());
                self.set_hl_or_index(value);
                self.regs.set_f(flags);
            }

            // DJNZ d
            0x10 => {
                self.clock(1);
                let displacement = self.imm8(bus) as i8;
                let b = self.regs.b().wrapping_sub(1);
                self.regs.set_b(b);
                if b != 0 {
                    self.clock(5);
                    self.regs.pc = self.regs.pc.wrapping_add(displacement as u16);
                    self.regs.wz.set_value(self.regs.pc);
                }
            }

            // JR d
            0x18 => {
                let displacement = self.imm8(bus) as i8;
                self.clock(5);
                self.regs.pc = self.regs.pc.wrapping_add(displacement as u16);
                self.regs.wz.set_value(self.regs.pc);
            }

            // JR cc,d (NZ, Z, NC, C only)
            0x20 | 0x28 | 0x30 | 0x38 => {
                let displacement = self.imm8(bus) as i8;
                if self.condition((op >> 3) & 0x03) {
                    self.clock(5);
                    self.regs.pc = self.regs.pc.wrapping_add(displacement as u16);
                    self.regs.wz.set_value(self.regs.pc);
                }
            }

            // LD (nn),HL
            0x22 => {
                let addr = self.imm16(bus);
                let pair = self.hl_or_index();
                self.write_mem(bus, addr, pair as u8);
                self.write_mem(bus, addr.wrapping_add(1), (pair >> 8) as u8);
                self.regs.wz.set_value(addr.wrapping_add(1));
            }

            // LD HL,(nn)
            0x2A => {
                let addr = self.imm16(bus);
                let low = self.read_mem(bus, addr);
                let high = self.read_mem(bus, addr.wrapping_add(1));
                self.set_hl_or_index(u16::from(high) << 8 | u16::from(low));
                self.regs.wz.set_value(addr.wrapping_add(1));
            }

            // DAA
            0x27 => {
                let r = alu::daa(self.regs.a(), self.regs.f());
                self.regs.set_a(r.value);
                self.regs.set_f(r.flags);
            }

            // CPL
            0x2F => {
                let a = !self.regs.a();
                self.regs.set_a(a);
                let f = (self.regs.f() & (SF | ZF | PF | CF)) | HF | NF | (a & (YF | XF));
                self.regs.set_f(f);
            }

            // LD (nn),A
            0x32 => {
                let addr = self.imm16(bus);
                let a = self.regs.a();
                self.regs.wz.set_low(addr.wrapping_add(1) as u8);
                self.regs.wz.set_high(a);
                self.write_mem(bus, addr, a);
            }

            // LD A,(nn)
            0x3A => {
                let addr = self.imm16(bus);
                self.regs.wz.set_value(addr.wrapping_add(1));
                let value = self.read_mem(bus, addr);
                self.regs.set_a(value);
            }

            // SCF
            0x37 => {
                let a = self.regs.a();
                let f = (self.regs.f() & (SF | ZF | PF)) | CF | (a & (YF | XF));
                self.regs.set_f(f);
            }

            // CCF
            0x3F => {
                let a = self.regs.a();
                let old = self.regs.f();
                let mut f = (old & (SF | ZF | PF)) | (a & (YF | XF));
                if old & CF != 0 {
                    f |= HF;
                } else {
                    f |= CF;
                }
                self.regs.set_f(f);
            }

            // HALT: park the PC back on the HALT so a wakeup steps over it
            0x76 => {
                self.signals.insert(SignalFlags::HALTED);
                self.regs.pc = self.regs.pc.wrapping_sub(1);
            }

            // LD r,r' grid
            0x40..=0x7F => {
                let dst = (op >> 3) & 0x07;
                let src = op & 0x07;
                if src == 6 {
                    let addr = self.operand_addr(bus);
                    let value = self.read_mem(bus, addr);
                    self.set_reg8_plain(dst, value);
                } else if dst == 6 {
                    let addr = self.operand_addr(bus);
                    let value = self.reg8_plain(src);
                    self.write_mem(bus, addr, value);
                } else {
                    let value = self.reg8(src);
                    self.set_reg8(dst, value);
                }
            }

            // ALU grid: ADD/ADC/SUB/SBC/AND/XOR/OR/CP
            0x80..=0xBF => {
                let operand = if op & 0x07 == 6 {
                    let addr = self.operand_addr(bus);
                    self.read_mem(bus, addr)
                } else {
                    self.reg8(op)
                };
                self.alu_op((op >> 3) & 0x07, operand);
            }

            // RET cc
            0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => {
                self.clock(1);
                if self.condition((op >> 3) & 0x07) {
                    self.regs.pc = self.pop16(bus);
                    self.regs.wz.set_value(self.regs.pc);
                }
            }

            // POP qq
            0xC1 | 0xD1 | 0xE1 | 0xF1 => {
                let value = self.pop16(bus);
                self.set_reg16_qq((op >> 4) & 0x03, value);
            }

            // PUSH qq
            0xC5 | 0xD5 | 0xE5 | 0xF5 => {
                self.clock(1);
                let value = self.reg16_qq((op >> 4) & 0x03);
                self.push16(bus, value);
            }

            // JP cc,nn
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => {
                let addr = self.imm16(bus);
                if self.condition((op >> 3) & 0x07) {
                    self.regs.pc = addr;
                }
            }

            // JP nn
            0xC3 => {
                self.regs.pc = self.imm16(bus);
            }

            // CALL cc,nn
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => {
                let addr = self.imm16(bus);
                if self.condition((op >> 3) & 0x07) {
                    self.clock(1);
                    self.push16(bus, self.regs.pc);
                    self.regs.pc = addr;
                }
            }

            // CALL nn
            0xCD => {
                let addr = self.imm16(bus);
                self.clock(1);
                self.push16(bus, self.regs.pc);
                self.regs.pc = addr;
            }

            // RET
            0xC9 => {
                self.regs.pc = self.pop16(bus);
                self.regs.wz.set_value(self.regs.pc);
            }

            // ALU A,n
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let operand = self.imm8(bus);
                self.alu_op((op >> 3) & 0x07, operand);
            }

            // RST p
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                self.clock(1);
                self.push16(bus, self.regs.pc);
                let target = u16::from(op & 0x38);
                self.regs.wz.set_value(target);
                self.regs.pc = target;
            }

            // OUT (n),A
            0xD3 => {
                let low = self.imm8(bus);
                let a = self.regs.a();
                let port = u16::from(a) << 8 | u16::from(low);
                self.regs.wz.set_low(low.wrapping_add(1));
                self.regs.wz.set_high(a);
                self.write_port(bus, port, a);
            }

            // IN A,(n)
            0xDB => {
                let low = self.imm8(bus);
                let port = u16::from(self.regs.a()) << 8 | u16::from(low);
                self.regs.wz.set_value(port.wrapping_add(1));
                let value = self.read_port(bus, port);
                self.regs.set_a(value);
            }

            // EXX
            0xD9 => self.regs.exx(),

            // EX (SP),HL (or IX/IY)
            0xE3 => {
                let sp = self.regs.sp;
                let low = self.read_mem(bus, sp);
                let high = self.read_mem(bus, sp.wrapping_add(1));
                self.clock(1);
                let pair = self.hl_or_index();
                self.write_mem(bus, sp.wrapping_add(1), (pair >> 8) as u8);
                self.write_mem(bus, sp, pair as u8);
                self.clock(2);
                let value = u16::from(high) << 8 | u16::from(low);
                self.set_hl_or_index(value);
                self.regs.wz.set_value(value);
            }

            // JP (HL) (or IX/IY): no address formation, no extra tacts
            0xE9 => {
                self.regs.pc = self.hl_or_index();
            }

            // EX DE,HL: never redirected by an index prefix
            0xEB => self.regs.ex_de_hl(),

            // DI
            0xF3 => {
                self.iff1 = false;
                self.iff2 = false;
            }

            // EI: interrupts stay blocked until the end of the next op
            0xFB => {
                self.iff1 = true;
                self.iff2 = true;
                self.interrupt_blocked = true;
            }

            // LD SP,HL (or IX/IY)
            0xF9 => {
                self.clock(2);
                self.regs.sp = self.hl_or_index();
            }

            _ => unreachable!("standard page covers all 256 opcodes"),
        }
    }

    /// Apply one 8-bit ALU operation to A by operation code.
    fn alu_op(&mut self, code: u8, operand: u8) {
        let a = self.regs.a();
        let carry = self.regs.f() & CF != 0;
        let r = match code {
            0 => alu::add8(a, operand, false),
            1 => alu::add8(a, operand, carry),
            2 => alu::sub8(a, operand, false),
            3 => alu::sub8(a, operand, carry),
            4 => alu::and8(a, operand),
            5 => alu::xor8(a, operand),
            6 => alu::or8(a, operand),
            // CP: flags from the subtraction, A unchanged, undocumented
            // bits from the operand
            _ => {
                let r = alu::sub8(a, operand, false);
                let flags = (r.flags & !(YF | XF)) | (operand & (YF | XF));
                self.regs.set_f(flags);
                return;
            }
        };
        self.regs.set_a(r.value);
        self.regs.set_f(r.flags);
    }

    /// 16-bit pair access for the qq field (PUSH/POP): AF instead of SP.
    fn reg16_qq(&self, code: u8) -> u16 {
        match code & 0x03 {
            0 => self.regs.bc.value(),
            1 => self.regs.de.value(),
            2 => self.hl_or_index(),
            _ => self.regs.af.value(),
        }
    }

    fn set_reg16_qq(&mut self, code: u8, value: u16) {
        match code & 0x03 {
            0 => self.regs.bc.set_value(value),
            1 => self.regs.de.set_value(value),
            2 => self.set_hl_or_index(value),
            _ => self.regs.af.set_value(value),
        }
    }

    /// Execute one operation from the extended (0xED) page.
    ///
    /// Undefined slots behave as two-fetch NOPs, as on real silicon.
    pub(super) fn execute_extended_op<B: Bus>(&mut self, bus: &mut B) {
        let op = self.opcode;
        match op {
            // IN r,(C); the r==6 slot only sets flags
            0x40 | 0x48 | 0x50 | 0x58 | 0x60 | 0x68 | 0x70 | 0x78 => {
                let port = self.regs.bc.value();
                self.regs.wz.set_value(port.wrapping_add(1));
                let value = self.read_port(bus, port);
                let code = (op >> 3) & 0x07;
                if code != 6 {
                    self.set_reg8_plain(code, value);
                }
                let f = (self.regs.f() & CF) | sz53p(value);
                self.regs.set_f(f);
            }

            // OUT (C),r; the r==6 slot writes zero
            0x41 | 0x49 | 0x51 | 0x59 | 0x61 | 0x69 | 0x71 | 0x79 => {
                let port = self.regs.bc.value();
                self.regs.wz.set_value(port.wrapping_add(1));
                let code = (op >> 3) & 0x07;
                let value = if code == 6 { 0 } else { self.reg8_plain(code) };
                self.write_port(bus, port, value);
            }

            // SBC HL,ss
            0x42 | 0x52 | 0x62 | 0x72 => {
                self.clock(7);
                let hl = self.regs.hl.value();
                self.regs.wz.set_value(hl.wrapping_add(1));
                let rhs = self.reg16_dd(op >> 4);
                let carry = self.regs.f() & CF != 0;
                let (value, flags) = alu::sbc16(hl, rhs, carry);
                self.regs.hl.set_value(value);
                self.regs.set_f(flags);
            }

            // ADC HL,ss
            0x4A | 0x5A | 0x6A | 0x7A => {
                self.clock(7);
                let hl = self.regs.hl.value();
                self.regs.wz.set_value(hl.wrapping_add(1));
                let rhs = self.reg16_dd(op >> 4);
                let carry = self.regs.f() & CF != 0;
                let (value, flags) = alu::adc16(hl, rhs, carry);
                self.regs.hl.set_value(value);
                self.regs.set_f(flags);
            }

            // LD (nn),dd
            0x43 | 0x53 | 0x63 | 0x73 => {
                let addr = self.imm16(bus);
                let pair = self.reg16_dd(op >> 4);
                self.write_mem(bus, addr, pair as u8);
                self.write_mem(bus, addr.wrapping_add(1), (pair >> 8) as u8);
                self.regs.wz.set_value(addr.wrapping_add(1));
            }

            // LD dd,(nn)
            0x4B | 0x5B | 0x6B | 0x7B => {
                let addr = self.imm16(bus);
                let low = self.read_mem(bus, addr);
                let high = self.read_mem(bus, addr.wrapping_add(1));
                self.set_reg16_dd(op >> 4, u16::from(high) << 8 | u16::from(low));
                self.regs.wz.set_value(addr.wrapping_add(1));
            }

            // NEG and its mirrors
            0x44 | 0x4C | 0x54 | 0x5C | 0x64 | 0x6C | 0x74 | 0x7C => {
                let r = alu::sub8(0, self.regs.a(), false);
                self.regs.set_a(r.value);
                self.regs.set_f(r.flags);
            }

            // RETN / RETI and their mirrors: both restore IFF1 from IFF2
            0x45 | 0x4D | 0x55 | 0x5D | 0x65 | 0x6D | 0x75 | 0x7D => {
                self.iff1 = self.iff2;
                self.regs.pc = self.pop16(bus);
                self.regs.wz.set_value(self.regs.pc);
            }

            // IM 0 / IM 1 / IM 2 and their mirrors
            0x46 | 0x4E | 0x66 | 0x6E => self.interrupt_mode = 0,
            0x56 | 0x76 => self.interrupt_mode = 1,
            0x5E | 0x7E => self.interrupt_mode = 2,

            // LD I,A
            0x47 => {
                self.clock(1);
                self.regs.set_i(self.regs.a());
            }

            // LD R,A
            0x4F => {
                self.clock(1);
                self.regs.set_r(self.regs.a());
            }

            // LD A,I: P/V reflects IFF2 so code can probe interrupt state
            0x57 => {
                self.clock(1);
                let value = self.regs.i();
                self.regs.set_a(value);
                let mut f = (self.regs.f() & CF) | sz53(value);
                if self.iff2 {
                    f |= PF;
                }
                self.regs.set_f(f);
            }

            // LD A,R
            0x5F => {
                self.clock(1);
                let value = self.regs.r();
                self.regs.set_a(value);
                let mut f = (self.regs.f() & CF) | sz53(value);
                if self.iff2 {
                    f |= PF;
                }
                self.regs.set_f(f);
            }

            _ => {}
        }
    }

    /// Execute one operation from the bit (0xCB) page.
    ///
    /// Under an index prefix the byte already fetched is the displacement
    /// and the real operation byte is read here; the memory operand is
    /// always used, and for non-(HL) slots the result is also copied to
    /// the named register.
    pub(super) fn execute_bit_op<B: Bus>(&mut self, bus: &mut B) {
        if self.index_mode == IndexMode::None {
            let op = self.opcode;
            let code = op & 0x07;
            if code == 6 {
                let addr = self.regs.hl.value();
                let value = self.read_mem(bus, addr);
                self.clock(1);
                if let Some(result) = self.bit_page_result(op, value) {
                    self.write_mem(bus, addr, result);
                }
            } else {
                let value = self.reg8_plain(code);
                if let Some(result) = self.bit_page_result(op, value) {
                    self.set_reg8_plain(code, result);
                }
            }
            return;
        }

        let displacement = self.opcode as i8;
        let op = self.imm8(bus);
        self.clock(1);
        self.opcode = op;
        let addr = self.hl_or_index().wrapping_add(displacement as u16);
        self.regs.wz.set_value(addr);

        let value = self.read_mem(bus, addr);
        self.clock(1);
        if let Some(result) = self.bit_page_result(op, value) {
            self.write_mem(bus, addr, result);
            let code = op & 0x07;
            if code != 6 {
                self.set_reg8_plain(code, result);
            }
        }
    }

    /// Apply a bit-page operation to `value`. Returns the byte to write
    /// back, or `None` for BIT, which only affects flags.
    fn bit_page_result(&mut self, op: u8, value: u8) -> Option<u8> {
        match op >> 6 {
            // rotate / shift group
            0 => {
                let carry = self.regs.f() & CF != 0;
                let r = match (op >> 3) & 0x07 {
                    0 => alu::rlc8(value),
                    1 => alu::rrc8(value),
                    2 => alu::rl8(value, carry),
                    3 => alu::rr8(value, carry),
                    4 => alu::sla8(value),
                    5 => alu::sra8(value),
                    6 => alu::sll8(value),
                    _ => alu::srl8(value),
                };
                self.regs.set_f(r.flags);
                Some(r.value)
            }

            // BIT b
            1 => {
                let bit = (op >> 3) & 0x07;
                let tested = value & (1 << bit);
                let mut f = (self.regs.f() & CF) | HF | (value & (YF | XF));
                if tested == 0 {
                    f |= ZF | PF;
                }
                if bit == 7 && tested != 0 {
                    f |= SF;
                }
                self.regs.set_f(f);
                None
            }

            // RES b
            2 => Some(value & !(1 << ((op >> 3) & 0x07))),

            // SET b
            _ => Some(value | 1 << ((op >> 3) & 0x07)),
        }
    }
}
