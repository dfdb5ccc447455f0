//! The Z80 CPU state machine.
//!
//! The core is driven one discrete step at a time through
//! [`Z80::cycle_step`]. A step is either a signal response (interrupt,
//! halt filler, reset, NMI), a prefix byte, or one complete operation.
//! Prefix decode state survives across steps, which is what makes the
//! interrupt-blocked window between a prefix and its operation visible
//! to the host.

mod execute;

use emu_core::{Bus, Cpu, Observable, Value};
use thiserror::Error;

use crate::flags::CF;
use crate::registers::Registers;
use crate::signals::SignalFlags;

/// Restart address for maskable interrupts in modes 0 and 1.
const INT_RESTART: u16 = 0x0038;

/// Fixed service address for non-maskable interrupts.
const NMI_VECTOR: u16 = 0x0066;

/// Errors from the administrative surface.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CpuError {
    #[error("tact counter cannot be set to a negative value: {0}")]
    NegativeTacts(i64),
    #[error("interrupt mode must be 0, 1 or 2, got {0}")]
    InvalidInterruptMode(u8),
}

/// Which operation page the next fetched byte belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrefixMode {
    /// Standard operation page.
    #[default]
    None,
    /// 0xCB seen: bit manipulation page.
    Bit,
    /// 0xED seen: extended page.
    Extended,
}

/// Which index register, if any, replaces HL for the pending operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexMode {
    #[default]
    None,
    /// 0xDD seen: HL-class references use IX.
    Ix,
    /// 0xFD seen: HL-class references use IY.
    Iy,
}

/// A Z80 CPU core.
///
/// The CPU owns no memory; every byte moves through the [`Bus`] handed to
/// each step. The tact counter only ever moves forward during execution
/// and is the sole clock peripherals such as the tape player observe.
#[derive(Debug, Clone)]
pub struct Z80 {
    regs: Registers,
    tacts: i64,
    signals: SignalFlags,
    iff1: bool,
    iff2: bool,
    interrupt_mode: u8,
    /// Last operation byte fetched; the displacement byte in indexed
    /// bit operations also lands here first.
    opcode: u8,
    prefix_mode: PrefixMode,
    index_mode: IndexMode,
    /// True between a prefix byte and the end of its operation, and for
    /// one operation after EI. Maskable interrupts are deferred while set.
    interrupt_blocked: bool,
    /// True while a multi-step operation is partially decoded.
    in_op_execution: bool,
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    /// A CPU in its hard-reset state with the tact counter at zero.
    #[must_use]
    pub fn new() -> Self {
        let mut cpu = Self {
            regs: Registers::default(),
            tacts: 0,
            signals: SignalFlags::NONE,
            iff1: false,
            iff2: false,
            interrupt_mode: 0,
            opcode: 0,
            prefix_mode: PrefixMode::None,
            index_mode: IndexMode::None,
            interrupt_blocked: false,
            in_op_execution: false,
        };
        cpu.execute_reset();
        cpu
    }

    /// The monotonically increasing tact counter.
    #[must_use]
    pub const fn tacts(&self) -> i64 {
        self.tacts
    }

    /// Overwrite the tact counter, e.g. when a host rebases its clock.
    ///
    /// # Errors
    ///
    /// Fails if `tacts` is negative; the counter never represents time
    /// before the epoch.
    pub const fn set_tacts(&mut self, tacts: i64) -> Result<(), CpuError> {
        if tacts < 0 {
            return Err(CpuError::NegativeTacts(tacts));
        }
        self.tacts = tacts;
        Ok(())
    }

    /// Advance the tact counter without executing, for peripheral time
    /// the host accounts on the CPU clock.
    pub const fn delay(&mut self, tacts: u32) {
        self.tacts += tacts as i64;
    }

    #[must_use]
    pub const fn signals(&self) -> SignalFlags {
        self.signals
    }

    /// Raise signal lines. Lines are level-held: they stay up until the
    /// host clears them, even across servicing.
    pub const fn set_signal(&mut self, signal: SignalFlags) {
        self.signals.insert(signal);
    }

    /// Drop signal lines.
    pub const fn clear_signal(&mut self, signal: SignalFlags) {
        self.signals.remove(signal);
    }

    #[must_use]
    pub const fn iff1(&self) -> bool {
        self.iff1
    }

    pub const fn set_iff1(&mut self, value: bool) {
        self.iff1 = value;
    }

    #[must_use]
    pub const fn iff2(&self) -> bool {
        self.iff2
    }

    pub const fn set_iff2(&mut self, value: bool) {
        self.iff2 = value;
    }

    #[must_use]
    pub const fn interrupt_mode(&self) -> u8 {
        self.interrupt_mode
    }

    /// Set the interrupt mode directly, bypassing the IM instruction.
    ///
    /// # Errors
    ///
    /// Fails if `mode` is not 0, 1 or 2.
    pub const fn set_interrupt_mode(&mut self, mode: u8) -> Result<(), CpuError> {
        if mode > 2 {
            return Err(CpuError::InvalidInterruptMode(mode));
        }
        self.interrupt_mode = mode;
        Ok(())
    }

    #[must_use]
    pub const fn prefix_mode(&self) -> PrefixMode {
        self.prefix_mode
    }

    #[must_use]
    pub const fn index_mode(&self) -> IndexMode {
        self.index_mode
    }

    #[must_use]
    pub const fn opcode(&self) -> u8 {
        self.opcode
    }

    #[must_use]
    pub const fn is_interrupt_blocked(&self) -> bool {
        self.interrupt_blocked
    }

    #[must_use]
    pub const fn is_in_op_execution(&self) -> bool {
        self.in_op_execution
    }

    /// Mutable access to the register file for hosts that preload state.
    pub const fn regs_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    #[must_use]
    pub const fn regs(&self) -> &Registers {
        &self.regs
    }

    pub(crate) const fn clock(&mut self, tacts: i64) {
        self.tacts += tacts;
    }

    /// Perform one discrete processing step.
    ///
    /// Order of business: active signals first (INT, halt filler, RESET,
    /// NMI, in that priority), then one byte is fetched and either noted
    /// as a prefix or executed as an operation.
    pub fn cycle_step<B: Bus>(&mut self, bus: &mut B) {
        if !self.signals.is_empty() && self.process_signals(bus) {
            return;
        }

        let opcode = bus.read(self.regs.pc);
        self.clock(3);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        self.refresh_memory();

        match self.prefix_mode {
            PrefixMode::None => match opcode {
                0xDD => {
                    self.index_mode = IndexMode::Ix;
                    self.in_op_execution = true;
                    self.interrupt_blocked = true;
                }
                0xFD => {
                    self.index_mode = IndexMode::Iy;
                    self.in_op_execution = true;
                    self.interrupt_blocked = true;
                }
                0xCB => {
                    self.prefix_mode = PrefixMode::Bit;
                    self.in_op_execution = true;
                    self.interrupt_blocked = true;
                }
                0xED => {
                    self.prefix_mode = PrefixMode::Extended;
                    self.in_op_execution = true;
                    self.interrupt_blocked = true;
                }
                _ => {
                    self.interrupt_blocked = false;
                    self.opcode = opcode;
                    self.execute_standard_op(bus);
                    self.finish_op();
                }
            },
            PrefixMode::Bit => {
                self.interrupt_blocked = false;
                self.opcode = opcode;
                self.execute_bit_op(bus);
                self.finish_op();
            }
            PrefixMode::Extended => {
                self.interrupt_blocked = false;
                self.opcode = opcode;
                self.execute_extended_op(bus);
                self.finish_op();
            }
        }
    }

    const fn finish_op(&mut self) {
        self.prefix_mode = PrefixMode::None;
        self.index_mode = IndexMode::None;
        self.in_op_execution = false;
    }

    /// Respond to active signal lines. Returns true when the step was
    /// consumed by a signal response.
    fn process_signals<B: Bus>(&mut self, bus: &mut B) -> bool {
        if self.signals.contains(SignalFlags::INT) && !self.interrupt_blocked && self.iff1 {
            self.execute_interrupt(bus);
            return true;
        }

        if self.signals.contains(SignalFlags::HALTED) {
            // Halted CPUs execute NOP-equivalents so refresh keeps running.
            self.clock(3);
            self.refresh_memory();
            return true;
        }

        if self.signals.contains(SignalFlags::RESET) {
            self.execute_reset();
            return true;
        }

        if self.signals.contains(SignalFlags::NMI) {
            self.execute_nmi(bus);
            return true;
        }

        false
    }

    /// Hard reset. Control state only; general registers and the tact
    /// counter keep their values, as on real silicon.
    fn execute_reset(&mut self) {
        self.iff1 = false;
        self.iff2 = false;
        self.interrupt_mode = 0;
        self.interrupt_blocked = false;
        self.signals = SignalFlags::NONE;
        self.prefix_mode = PrefixMode::None;
        self.index_mode = IndexMode::None;
        self.in_op_execution = false;
        self.regs.pc = 0;
        self.regs.ir.set_value(0);
    }

    fn execute_nmi<B: Bus>(&mut self, bus: &mut B) {
        if self.signals.contains(SignalFlags::HALTED) {
            // Step past the HALT the PC is parked on.
            self.regs.pc = self.regs.pc.wrapping_add(1);
            self.signals.remove(SignalFlags::HALTED);
        }
        self.iff1 = false;
        self.iff2 = false;
        self.push_pc(bus);
        self.regs.pc = NMI_VECTOR;
    }

    fn execute_interrupt<B: Bus>(&mut self, bus: &mut B) {
        if self.signals.contains(SignalFlags::HALTED) {
            self.regs.pc = self.regs.pc.wrapping_add(1);
            self.signals.remove(SignalFlags::HALTED);
        }
        // Only the first flip-flop drops; IFF2 keeps the pre-interrupt
        // state so handlers can recover it through RETN or LD A,I.
        self.iff1 = false;
        self.push_pc(bus);

        if self.interrupt_mode == 2 {
            self.clock(2);
            // The data bus byte from the device is taken as zero, so the
            // table entry sits at the start of the I-register page.
            let addr = self.regs.ir.value() & 0xFF00;
            self.clock(5);
            let low = bus.read(addr);
            self.clock(3);
            let high = bus.read(addr.wrapping_add(1));
            self.clock(3);
            self.regs.wz.add(u16::from(high) << 8 | u16::from(low));
            self.clock(6);
        } else {
            self.regs.wz.set_value(INT_RESTART);
            self.clock(5);
        }
        self.regs.pc = self.regs.wz.value();
    }

    /// Push PC for interrupt entry: one internal tact, then two writes.
    fn push_pc<B: Bus>(&mut self, bus: &mut B) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.clock(1);
        bus.write(self.regs.sp, (self.regs.pc >> 8) as u8);
        self.clock(3);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.write(self.regs.sp, self.regs.pc as u8);
        self.clock(3);
    }

    /// Bump the refresh counter in the low seven bits of R, keeping
    /// bit 7, and charge the refresh tact.
    fn refresh_memory(&mut self) {
        let r = self.regs.r();
        self.regs.set_r((r.wrapping_add(1) & 0x7F) | (r & 0x80));
        self.clock(1);
    }

    // --- memory and port access with clocking -------------------------

    fn read_mem<B: Bus>(&mut self, bus: &mut B, address: u16) -> u8 {
        let value = bus.read(address);
        self.clock(3);
        value
    }

    fn write_mem<B: Bus>(&mut self, bus: &mut B, address: u16, value: u8) {
        bus.write(address, value);
        self.clock(3);
    }

    fn read_port<B: Bus>(&mut self, bus: &mut B, port: u16) -> u8 {
        let value = bus.port_read(port);
        self.clock(4);
        value
    }

    fn write_port<B: Bus>(&mut self, bus: &mut B, port: u16, value: u8) {
        bus.port_write(port, value);
        self.clock(4);
    }

    /// Fetch one immediate byte at PC.
    fn imm8<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let value = self.read_mem(bus, self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    /// Fetch a little-endian immediate word at PC, assembling it in WZ.
    fn imm16<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let low = self.imm8(bus);
        self.regs.wz.set_low(low);
        let high = self.imm8(bus);
        self.regs.wz.set_high(high);
        self.regs.wz.value()
    }

    fn push16<B: Bus>(&mut self, bus: &mut B, value: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_mem(bus, self.regs.sp, (value >> 8) as u8);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_mem(bus, self.regs.sp, value as u8);
    }

    fn pop16<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let low = self.read_mem(bus, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let high = self.read_mem(bus, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        u16::from(high) << 8 | u16::from(low)
    }

    // --- index handling -----------------------------------------------

    /// HL, or the active index register when a DD/FD prefix is pending.
    fn hl_or_index(&self) -> u16 {
        match self.index_mode {
            IndexMode::None => self.regs.hl.value(),
            IndexMode::Ix => self.regs.ix.value(),
            IndexMode::Iy => self.regs.iy.value(),
        }
    }

    fn set_hl_or_index(&mut self, value: u16) {
        match self.index_mode {
            IndexMode::None => self.regs.hl.set_value(value),
            IndexMode::Ix => self.regs.ix.set_value(value),
            IndexMode::Iy => self.regs.iy.set_value(value),
        }
    }

    /// Effective address for an (HL)-class memory operand. With an index
    /// prefix this fetches the displacement and charges the five internal
    /// address-formation tacts.
    fn operand_addr<B: Bus>(&mut self, bus: &mut B) -> u16 {
        if self.index_mode == IndexMode::None {
            return self.regs.hl.value();
        }
        let displacement = self.imm8(bus) as i8;
        self.clock(5);
        let addr = self.hl_or_index().wrapping_add(displacement as u16);
        self.regs.wz.set_value(addr);
        addr
    }

    /// 8-bit register read by operand code, honouring the index prefix
    /// for H and L (the undocumented IXH/IXL/IYH/IYL registers).
    fn reg8(&self, code: u8) -> u8 {
        match code & 0x07 {
            0 => self.regs.b(),
            1 => self.regs.c(),
            2 => self.regs.d(),
            3 => self.regs.e(),
            4 => match self.index_mode {
                IndexMode::None => self.regs.h(),
                IndexMode::Ix => self.regs.ix.high(),
                IndexMode::Iy => self.regs.iy.high(),
            },
            5 => match self.index_mode {
                IndexMode::None => self.regs.l(),
                IndexMode::Ix => self.regs.ix.low(),
                IndexMode::Iy => self.regs.iy.low(),
            },
            _ => self.regs.a(),
        }
    }

    fn set_reg8(&mut self, code: u8, value: u8) {
        match code & 0x07 {
            0 => self.regs.set_b(value),
            1 => self.regs.set_c(value),
            2 => self.regs.set_d(value),
            3 => self.regs.set_e(value),
            4 => match self.index_mode {
                IndexMode::None => self.regs.set_h(value),
                IndexMode::Ix => self.regs.ix.set_high(value),
                IndexMode::Iy => self.regs.iy.set_high(value),
            },
            5 => match self.index_mode {
                IndexMode::None => self.regs.set_l(value),
                IndexMode::Ix => self.regs.ix.set_low(value),
                IndexMode::Iy => self.regs.iy.set_low(value),
            },
            _ => self.regs.set_a(value),
        }
    }

    /// 8-bit register read that always targets the real H and L, used
    /// when a memory operand is involved or on the bit page.
    fn reg8_plain(&self, code: u8) -> u8 {
        match code & 0x07 {
            0 => self.regs.b(),
            1 => self.regs.c(),
            2 => self.regs.d(),
            3 => self.regs.e(),
            4 => self.regs.h(),
            5 => self.regs.l(),
            _ => self.regs.a(),
        }
    }

    fn set_reg8_plain(&mut self, code: u8, value: u8) {
        match code & 0x07 {
            0 => self.regs.set_b(value),
            1 => self.regs.set_c(value),
            2 => self.regs.set_d(value),
            3 => self.regs.set_e(value),
            4 => self.regs.set_h(value),
            5 => self.regs.set_l(value),
            _ => self.regs.set_a(value),
        }
    }

    /// 16-bit register pair read for the dd field (BC, DE, HL/IX/IY, SP).
    fn reg16_dd(&self, code: u8) -> u16 {
        match code & 0x03 {
            0 => self.regs.bc.value(),
            1 => self.regs.de.value(),
            2 => self.hl_or_index(),
            _ => self.regs.sp,
        }
    }

    fn set_reg16_dd(&mut self, code: u8, value: u16) {
        match code & 0x03 {
            0 => self.regs.bc.set_value(value),
            1 => self.regs.de.set_value(value),
            2 => self.set_hl_or_index(value),
            _ => self.regs.sp = value,
        }
    }

    /// Evaluate a jump condition from the cc field.
    fn condition(&self, code: u8) -> bool {
        let f = self.regs.f();
        match code & 0x07 {
            0 => f & crate::flags::ZF == 0,
            1 => f & crate::flags::ZF != 0,
            2 => f & CF == 0,
            3 => f & CF != 0,
            4 => f & crate::flags::PF == 0,
            5 => f & crate::flags::PF != 0,
            6 => f & crate::flags::SF == 0,
            _ => f & crate::flags::SF != 0,
        }
    }
}

impl Cpu for Z80 {
    type Registers = Registers;

    fn cycle_step<B: Bus>(&mut self, bus: &mut B) {
        Z80::cycle_step(self, bus);
    }

    /// Hard reset through the signal path: raise RESET, run one step,
    /// drop the line.
    fn reset<B: Bus>(&mut self, bus: &mut B) {
        self.set_signal(SignalFlags::RESET);
        Z80::cycle_step(self, bus);
        self.clear_signal(SignalFlags::RESET);
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.signals.contains(SignalFlags::HALTED)
    }
}

impl Observable for Z80 {
    fn query(&self, path: &str) -> Option<Value> {
        let value = match path {
            "a" => Value::U8(self.regs.a()),
            "f" => Value::U8(self.regs.f()),
            "b" => Value::U8(self.regs.b()),
            "c" => Value::U8(self.regs.c()),
            "d" => Value::U8(self.regs.d()),
            "e" => Value::U8(self.regs.e()),
            "h" => Value::U8(self.regs.h()),
            "l" => Value::U8(self.regs.l()),
            "i" => Value::U8(self.regs.i()),
            "r" => Value::U8(self.regs.r()),
            "af" => Value::U16(self.regs.af.value()),
            "bc" => Value::U16(self.regs.bc.value()),
            "de" => Value::U16(self.regs.de.value()),
            "hl" => Value::U16(self.regs.hl.value()),
            "af'" => Value::U16(self.regs.af_alt.value()),
            "bc'" => Value::U16(self.regs.bc_alt.value()),
            "de'" => Value::U16(self.regs.de_alt.value()),
            "hl'" => Value::U16(self.regs.hl_alt.value()),
            "ix" => Value::U16(self.regs.ix.value()),
            "iy" => Value::U16(self.regs.iy.value()),
            "sp" => Value::U16(self.regs.sp),
            "pc" => Value::U16(self.regs.pc),
            "wz" => Value::U16(self.regs.wz.value()),
            "tacts" => Value::I64(self.tacts),
            "iff1" => Value::Bool(self.iff1),
            "iff2" => Value::Bool(self.iff2),
            "im" => Value::U8(self.interrupt_mode),
            "halted" => Value::Bool(self.signals.contains(SignalFlags::HALTED)),
            "blocked" => Value::Bool(self.interrupt_blocked),
            "signals.int" => Value::Bool(self.signals.contains(SignalFlags::INT)),
            "signals.nmi" => Value::Bool(self.signals.contains(SignalFlags::NMI)),
            "signals.reset" => Value::Bool(self.signals.contains(SignalFlags::RESET)),
            "opcode" => Value::U8(self.opcode),
            "prefix" => Value::Str(match self.prefix_mode {
                PrefixMode::None => "none",
                PrefixMode::Bit => "bit",
                PrefixMode::Extended => "extended",
            }),
            "index" => Value::Str(match self.index_mode {
                IndexMode::None => "none",
                IndexMode::Ix => "ix",
                IndexMode::Iy => "iy",
            }),
            "flags.s" => Value::Bool(self.regs.f() & crate::flags::SF != 0),
            "flags.z" => Value::Bool(self.regs.f() & crate::flags::ZF != 0),
            "flags.h" => Value::Bool(self.regs.f() & crate::flags::HF != 0),
            "flags.p" => Value::Bool(self.regs.f() & crate::flags::PF != 0),
            "flags.n" => Value::Bool(self.regs.f() & crate::flags::NF != 0),
            "flags.c" => Value::Bool(self.regs.f() & CF != 0),
            _ => return None,
        };
        Some(value)
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "a", "f", "b", "c", "d", "e", "h", "l", "i", "r", "af", "bc", "de", "hl", "af'",
            "bc'", "de'", "hl'", "ix", "iy", "sp", "pc", "wz", "tacts", "iff1", "iff2", "im",
            "halted", "blocked", "opcode", "prefix", "index", "signals.int", "signals.nmi",
            "signals.reset", "flags.s", "flags.z", "flags.h", "flags.p", "flags.n", "flags.c",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::SimpleBus;

    fn cpu_with(program: &[u8]) -> (Z80, SimpleBus) {
        let mut bus = SimpleBus::default();
        bus.load(0, program);
        (Z80::new(), bus)
    }

    #[test]
    fn new_cpu_starts_at_reset_state() {
        let cpu = Z80::new();
        assert_eq!(cpu.regs().pc, 0);
        assert_eq!(cpu.regs().ir.value(), 0);
        assert!(!cpu.iff1());
        assert!(!cpu.iff2());
        assert_eq!(cpu.interrupt_mode(), 0);
        assert_eq!(cpu.tacts(), 0);
        assert!(cpu.signals().is_empty());
    }

    #[test]
    fn set_tacts_rejects_negative() {
        let mut cpu = Z80::new();
        assert_eq!(cpu.set_tacts(-1), Err(CpuError::NegativeTacts(-1)));
        assert_eq!(cpu.set_tacts(42), Ok(()));
        assert_eq!(cpu.tacts(), 42);
    }

    #[test]
    fn set_interrupt_mode_rejects_out_of_range() {
        let mut cpu = Z80::new();
        assert_eq!(
            cpu.set_interrupt_mode(3),
            Err(CpuError::InvalidInterruptMode(3))
        );
        assert_eq!(cpu.set_interrupt_mode(2), Ok(()));
        assert_eq!(cpu.interrupt_mode(), 2);
    }

    #[test]
    fn delay_only_moves_the_clock() {
        let mut cpu = Z80::new();
        let before = cpu.regs;
        cpu.delay(17);
        assert_eq!(cpu.tacts(), 17);
        assert_eq!(cpu.regs, before);
    }

    #[test]
    fn nop_costs_four_tacts_and_bumps_refresh() {
        let (mut cpu, mut bus) = cpu_with(&[0x00]);
        cpu.cycle_step(&mut bus);
        assert_eq!(cpu.tacts(), 4);
        assert_eq!(cpu.regs().pc, 1);
        assert_eq!(cpu.regs().r(), 1);
    }

    #[test]
    fn refresh_preserves_bit_seven() {
        let (mut cpu, mut bus) = cpu_with(&[0x00; 0x100]);
        cpu.regs_mut().set_r(0xFF);
        cpu.cycle_step(&mut bus);
        // low 7 bits wrap to 0, bit 7 stays
        assert_eq!(cpu.regs().r(), 0x80);
    }

    #[test]
    fn prefix_byte_opens_the_blocked_window() {
        // ED 46 = IM 0; after the ED step the operation is half decoded
        let (mut cpu, mut bus) = cpu_with(&[0xED, 0x46]);
        cpu.cycle_step(&mut bus);
        assert!(cpu.is_interrupt_blocked());
        assert!(cpu.is_in_op_execution());
        assert_eq!(cpu.prefix_mode(), PrefixMode::Extended);
        assert_eq!(cpu.tacts(), 4);

        cpu.cycle_step(&mut bus);
        assert!(!cpu.is_interrupt_blocked());
        assert!(!cpu.is_in_op_execution());
        assert_eq!(cpu.prefix_mode(), PrefixMode::None);
        assert_eq!(cpu.tacts(), 8);
    }

    #[test]
    fn dd_then_fd_keeps_last_index() {
        let (mut cpu, mut bus) = cpu_with(&[0xDD, 0xFD, 0x00]);
        cpu.cycle_step(&mut bus);
        assert_eq!(cpu.index_mode(), IndexMode::Ix);
        cpu.cycle_step(&mut bus);
        assert_eq!(cpu.index_mode(), IndexMode::Iy);
        cpu.cycle_step(&mut bus);
        assert_eq!(cpu.index_mode(), IndexMode::None);
    }

    #[test]
    fn halt_parks_pc_and_burns_four_tact_steps() {
        let (mut cpu, mut bus) = cpu_with(&[0x76]);
        cpu.cycle_step(&mut bus);
        assert!(cpu.is_halted());
        assert_eq!(cpu.regs().pc, 0);
        assert_eq!(cpu.tacts(), 4);

        let r_before = cpu.regs().r();
        cpu.cycle_step(&mut bus);
        assert_eq!(cpu.tacts(), 8);
        assert_eq!(cpu.regs().pc, 0);
        assert_eq!(cpu.regs().r(), r_before.wrapping_add(1) & 0x7F);
    }

    #[test]
    fn reset_signal_clears_control_state_but_not_registers() {
        let (mut cpu, mut bus) = cpu_with(&[0x00]);
        cpu.regs_mut().af.set_value(0x1234);
        cpu.regs_mut().sp = 0x8000;
        cpu.regs_mut().pc = 0x4000;
        cpu.set_iff1(true);
        cpu.set_iff2(true);
        cpu.set_interrupt_mode(2).unwrap();
        cpu.delay(100);

        Cpu::reset(&mut cpu, &mut bus);

        assert_eq!(cpu.regs().pc, 0);
        assert_eq!(cpu.regs().ir.value(), 0);
        assert!(!cpu.iff1());
        assert!(!cpu.iff2());
        assert_eq!(cpu.interrupt_mode(), 0);
        assert!(cpu.signals().is_empty());
        // untouched by reset
        assert_eq!(cpu.regs().af.value(), 0x1234);
        assert_eq!(cpu.regs().sp, 0x8000);
        assert_eq!(cpu.tacts(), 100);
    }

    #[test]
    fn int_needs_iff1() {
        let (mut cpu, mut bus) = cpu_with(&[0x00, 0x00]);
        cpu.regs_mut().sp = 0x8000;
        cpu.set_signal(SignalFlags::INT);

        // iff1 clear: the signal is ignored and the NOP runs
        cpu.cycle_step(&mut bus);
        assert_eq!(cpu.regs().pc, 1);

        cpu.set_iff1(true);
        cpu.cycle_step(&mut bus);
        assert_eq!(cpu.regs().pc, INT_RESTART);
        assert!(!cpu.iff1());
        // INT line is level-held, acceptance does not clear it
        assert!(cpu.signals().contains(SignalFlags::INT));
    }

    #[test]
    fn int_acceptance_clears_iff1_but_keeps_iff2() {
        let (mut cpu, mut bus) = cpu_with(&[0x00]);
        cpu.regs_mut().sp = 0x8000;
        cpu.set_iff1(true);
        cpu.set_iff2(true);
        cpu.set_interrupt_mode(1).unwrap();
        cpu.set_signal(SignalFlags::INT);

        cpu.cycle_step(&mut bus);

        assert_eq!(cpu.regs().pc, INT_RESTART);
        assert!(!cpu.iff1());
        // the second flip-flop preserves the pre-interrupt enable state
        assert!(cpu.iff2());
    }

    #[test]
    fn im1_interrupt_pushes_pc_and_costs_twelve() {
        let (mut cpu, mut bus) = cpu_with(&[0x00]);
        cpu.regs_mut().pc = 0x4000;
        cpu.regs_mut().sp = 0x8000;
        cpu.set_iff1(true);
        cpu.set_interrupt_mode(1).unwrap();
        cpu.set_signal(SignalFlags::INT);

        cpu.cycle_step(&mut bus);

        assert_eq!(cpu.regs().pc, 0x0038);
        assert_eq!(cpu.regs().sp, 0x7FFE);
        assert_eq!(bus.peek(0x7FFF), 0x40);
        assert_eq!(bus.peek(0x7FFE), 0x00);
        assert_eq!(cpu.tacts(), 12);
    }

    #[test]
    fn im2_interrupt_reads_vector_from_i_page() {
        let (mut cpu, mut bus) = cpu_with(&[0x00]);
        cpu.regs_mut().pc = 0x4000;
        cpu.regs_mut().sp = 0x8000;
        cpu.regs_mut().set_i(0x3F);
        bus.load(0x3F00, &[0x22, 0x11]);
        cpu.set_iff1(true);
        cpu.set_interrupt_mode(2).unwrap();
        cpu.set_signal(SignalFlags::INT);

        cpu.cycle_step(&mut bus);

        // WZ was zero, so PC is exactly the table entry
        assert_eq!(cpu.regs().pc, 0x1122);
        assert_eq!(cpu.tacts(), 26);
    }

    #[test]
    fn nmi_vectors_to_0066_and_clears_both_flip_flops() {
        let (mut cpu, mut bus) = cpu_with(&[0x00]);
        cpu.regs_mut().pc = 0x4000;
        cpu.regs_mut().sp = 0x8000;
        cpu.set_iff1(true);
        cpu.set_iff2(true);
        cpu.set_signal(SignalFlags::NMI);

        cpu.cycle_step(&mut bus);

        assert_eq!(cpu.regs().pc, NMI_VECTOR);
        assert_eq!(bus.peek(0x7FFF), 0x40);
        assert_eq!(bus.peek(0x7FFE), 0x00);
        assert!(!cpu.iff1());
        assert!(!cpu.iff2());
        assert_eq!(cpu.tacts(), 7);
    }

    #[test]
    fn interrupt_wakes_halted_cpu_past_the_halt() {
        let (mut cpu, mut bus) = cpu_with(&[0x76, 0x00]);
        cpu.regs_mut().sp = 0x8000;
        cpu.set_interrupt_mode(1).unwrap();

        cpu.cycle_step(&mut bus);
        assert!(cpu.is_halted());
        assert_eq!(cpu.regs().pc, 0);

        cpu.set_iff1(true);
        cpu.set_signal(SignalFlags::INT);
        cpu.cycle_step(&mut bus);

        assert!(!cpu.is_halted());
        // the address past the HALT was pushed
        assert_eq!(bus.peek(0x7FFF), 0x00);
        assert_eq!(bus.peek(0x7FFE), 0x01);
        assert_eq!(cpu.regs().pc, 0x0038);
    }

    #[test]
    fn observable_paths_cover_the_register_file() {
        let mut cpu = Z80::new();
        cpu.regs_mut().af.set_value(0x12AB);
        assert_eq!(cpu.query("a"), Some(Value::U8(0x12)));
        assert_eq!(cpu.query("af"), Some(Value::U16(0x12AB)));
        assert_eq!(cpu.query("halted"), Some(Value::Bool(false)));
        assert_eq!(cpu.query("prefix"), Some(Value::Str("none")));
        assert_eq!(cpu.query("nonsense"), None);
        for path in cpu.query_paths() {
            assert!(cpu.query(path).is_some(), "missing path {path}");
        }
    }
}
