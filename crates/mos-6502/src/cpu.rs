//! 6502 CPU core.
//!
//! Cycle-stepped execution: the instruction register `IR` holds
//! `(opcode << 3) | cycle`, and every tick dispatches on the opcode to a
//! micro-sequencer that matches on the cycle index. A read issued in cycle
//! N is served by the host and arrives in `input.data` at cycle N+1, so
//! each arm works with the data requested by the previous one.

use std::fmt;

use crate::flags::{Status, B, C, D, I, N, U, V, Z};
use crate::{Cpu6502Input, Cpu6502Output};

/// IRQ was recognized for the interrupt-or-BRK sequence.
const BRK_IRQ: u8 = 1 << 0;
/// NMI was recognized for the interrupt-or-BRK sequence.
const BRK_NMI: u8 = 1 << 1;
/// RESET is being serviced by the interrupt-or-BRK sequence.
const BRK_RESET: u8 = 1 << 2;

/// The MOS 6502 CPU.
///
/// Each [`tick`](Mos6502::tick) advances exactly one clock cycle and drives
/// exactly one bus transaction on the output pins.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mos6502 {
    /// Accumulator.
    a: u8,
    /// X index register.
    x: u8,
    /// Y index register.
    y: u8,
    /// Stack pointer (low byte of $01xx).
    s: u8,
    /// Program counter.
    pc: u16,
    /// Status register.
    p: Status,

    /// Instruction register: `(opcode << 3) | cycle`.
    ir: u16,
    /// ADL/ADH scratch register staging effective addresses.
    ad: u16,

    /// Which interrupts the current BRK sequence services.
    brk_flags: u8,
    /// IRQ recognition delay pipeline, shifted left every tick.
    irq_pip: u16,
    /// NMI recognition delay pipeline, shifted left every tick. Bits are
    /// sticky between SYNC cycles so an edge is never lost.
    nmi_pip: u16,
    /// NMI pin level on the previous tick, for edge detection.
    last_nmi: bool,

    /// Data bus value sampled from the current tick's input.
    data_in: u8,
    /// Output pins, persisted between ticks.
    out: Cpu6502Output,
}

impl Default for Mos6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mos6502 {
    /// Create a CPU in the power-on state: P = Z, everything else zero,
    /// bus reading address 0 with SYNC raised.
    #[must_use]
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0,
            pc: 0,
            p: Status(Z),
            ir: 0,
            ad: 0,
            brk_flags: 0,
            irq_pip: 0,
            nmi_pip: 0,
            last_nmi: false,
            data_in: 0,
            out: Cpu6502Output {
                addr: 0x0000,
                data: 0x00,
                rw: true,
                sync: true,
            },
        }
    }

    /// Accumulator.
    #[must_use]
    pub fn a(&self) -> u8 {
        self.a
    }

    /// X index register.
    #[must_use]
    pub fn x(&self) -> u8 {
        self.x
    }

    /// Y index register.
    #[must_use]
    pub fn y(&self) -> u8 {
        self.y
    }

    /// Stack pointer (low byte of $01xx).
    #[must_use]
    pub fn s(&self) -> u8 {
        self.s
    }

    /// Program counter.
    #[must_use]
    pub fn pc(&self) -> u16 {
        self.pc
    }

    /// Status register.
    #[must_use]
    pub fn p(&self) -> Status {
        self.p
    }

    /// Opcode of the instruction currently executing.
    #[must_use]
    pub fn instruction(&self) -> u8 {
        (self.ir >> 3) as u8
    }

    /// Cycle index within the current instruction (0..=7).
    #[must_use]
    pub fn cycle(&self) -> u8 {
        (self.ir & 7) as u8
    }

    /// Output pins as driven by the last tick.
    #[must_use]
    pub fn output(&self) -> Cpu6502Output {
        self.out
    }

    /// Advance the CPU by one clock cycle.
    ///
    /// `input.data` must hold whatever the bus returned for the previous
    /// tick's address (read cycles), and the caller must serve the returned
    /// address/data/rw before the next tick.
    pub fn tick(&mut self, input: &Cpu6502Input) -> Cpu6502Output {
        self.data_in = input.data;

        // Interrupt detection runs every tick, including RDY stalls.
        // NMI is edge-triggered and sticky, IRQ is level-triggered and
        // gated by the I flag, RESET latches for the next SYNC.
        if self.last_nmi && !input.nmi {
            self.nmi_pip |= 0x100;
        }
        if !input.irq && !self.p.test(I) {
            self.irq_pip |= 0x100;
        }
        if !input.reset {
            self.brk_flags |= BRK_RESET;
        }

        // RDY stalls read cycles only; writes always complete. The NMI
        // pipeline is frozen during the stall so the edge stays pending.
        if self.out.rw && !input.ready {
            self.last_nmi = input.nmi;
            self.irq_pip <<= 1;
            return self.out;
        }

        if self.out.sync {
            // Latch the new opcode and restart the cycle counter.
            self.ir = u16::from(self.data_in) << 3;
            self.out.sync = false;

            // IRQ must have been active in the full cycle before SYNC;
            // an NMI edge from any earlier cycle is still honored.
            if self.irq_pip & 0x400 != 0 {
                self.brk_flags |= BRK_IRQ;
            }
            if self.nmi_pip >= 0x400 {
                self.brk_flags |= BRK_NMI;
            }
            self.irq_pip &= 0x3FF;
            self.nmi_pip &= 0x3FF;

            // An interrupt or reset replaces the fetched opcode with BRK
            // and leaves PC pointing at the interrupted instruction.
            if self.brk_flags != 0 {
                log::trace!(
                    "servicing interrupt (flags {:03b}) at pc={:04X}",
                    self.brk_flags,
                    self.pc
                );
                self.ir = 0;
                self.p.0 &= !B;
            } else {
                self.pc = self.pc.wrapping_add(1);
            }
        }

        self.out.rw = true;
        self.step();

        self.last_nmi = input.nmi;
        self.irq_pip <<= 1;
        self.nmi_pip <<= 1;
        self.out
    }

    /// Execute one micro-cycle of the current instruction.
    fn step(&mut self) {
        let opcode = (self.ir >> 3) as u8;
        let cycle = (self.ir & 7) as u8;
        self.ir += 1;

        match opcode {
            // BRK - 7 cycles, shared with IRQ/NMI/RESET entry
            0x00 => self.brk(cycle),
            // ORA (zp,X) - 6 cycles
            0x01 => self.izx_read(cycle, Self::do_ora),
            // JAM - terminal halt
            0x02 | 0x12 | 0x22 | 0x32 | 0x42 | 0x52 | 0x62 | 0x72 | 0x92 | 0xB2 | 0xD2 | 0xF2 => {
                self.jam(cycle);
            }
            // SLO (zp,X) - 8 cycles
            0x03 => self.izx_rmw(cycle, Self::do_slo),
            // NOP zp - 3 cycles
            0x04 | 0x44 | 0x64 => self.zp_read(cycle, Self::do_nop),
            // ORA zp - 3 cycles
            0x05 => self.zp_read(cycle, Self::do_ora),
            // ASL zp - 5 cycles
            0x06 => self.zp_rmw(cycle, Self::do_asl),
            // SLO zp - 5 cycles
            0x07 => self.zp_rmw(cycle, Self::do_slo),
            // PHP - 3 cycles
            0x08 => self.push(cycle, |c| c.p.0 | U),
            // ORA # - 2 cycles
            0x09 => self.imm_read(cycle, Self::do_ora),
            // ASL A - 2 cycles
            0x0A => self.implied(cycle, Self::asl_acc),
            // ANC # - 2 cycles
            0x0B | 0x2B => self.imm_read(cycle, Self::do_anc),
            // NOP abs - 4 cycles
            0x0C => self.abs_read(cycle, Self::do_nop),
            // ORA abs - 4 cycles
            0x0D => self.abs_read(cycle, Self::do_ora),
            // ASL abs - 6 cycles
            0x0E => self.abs_rmw(cycle, Self::do_asl),
            // SLO abs - 6 cycles
            0x0F => self.abs_rmw(cycle, Self::do_slo),

            // BPL rel
            0x10 => self.branch(cycle, !self.p.test(N)),
            // ORA (zp),Y - 5/6 cycles
            0x11 => self.izy_read(cycle, Self::do_ora),
            // SLO (zp),Y - 8 cycles
            0x13 => self.izy_rmw(cycle, Self::do_slo),
            // NOP zp,X - 4 cycles
            0x14 | 0x34 | 0x54 | 0x74 | 0xD4 | 0xF4 => {
                self.zp_idx_read(cycle, self.x, Self::do_nop);
            }
            // ORA zp,X - 4 cycles
            0x15 => self.zp_idx_read(cycle, self.x, Self::do_ora),
            // ASL zp,X - 6 cycles
            0x16 => self.zp_idx_rmw(cycle, Self::do_asl),
            // SLO zp,X - 6 cycles
            0x17 => self.zp_idx_rmw(cycle, Self::do_slo),
            // CLC
            0x18 => self.flag_op(cycle, C, false),
            // ORA abs,Y - 4/5 cycles
            0x19 => self.abs_idx_read(cycle, self.y, Self::do_ora),
            // NOP - 2 cycles
            0x1A | 0x3A | 0x5A | 0x7A | 0xDA | 0xEA | 0xFA => self.implied(cycle, Self::no_op),
            // SLO abs,Y - 7 cycles
            0x1B => self.abs_idx_rmw(cycle, self.y, Self::do_slo),
            // NOP abs,X - 4/5 cycles
            0x1C | 0x3C | 0x5C | 0x7C | 0xDC | 0xFC => {
                self.abs_idx_read(cycle, self.x, Self::do_nop);
            }
            // ORA abs,X - 4/5 cycles
            0x1D => self.abs_idx_read(cycle, self.x, Self::do_ora),
            // ASL abs,X - 7 cycles
            0x1E => self.abs_idx_rmw(cycle, self.x, Self::do_asl),
            // SLO abs,X - 7 cycles
            0x1F => self.abs_idx_rmw(cycle, self.x, Self::do_slo),

            // JSR abs - 6 cycles
            0x20 => self.jsr(cycle),
            // AND (zp,X)
            0x21 => self.izx_read(cycle, Self::do_and),
            // RLA (zp,X)
            0x23 => self.izx_rmw(cycle, Self::do_rla),
            // BIT zp
            0x24 => self.zp_read(cycle, Self::do_bit),
            // AND zp
            0x25 => self.zp_read(cycle, Self::do_and),
            // ROL zp
            0x26 => self.zp_rmw(cycle, Self::do_rol),
            // RLA zp
            0x27 => self.zp_rmw(cycle, Self::do_rla),
            // PLP - 4 cycles
            0x28 => self.pull(cycle, Self::plp_value),
            // AND #
            0x29 => self.imm_read(cycle, Self::do_and),
            // ROL A
            0x2A => self.implied(cycle, Self::rol_acc),
            // BIT abs
            0x2C => self.abs_read(cycle, Self::do_bit),
            // AND abs
            0x2D => self.abs_read(cycle, Self::do_and),
            // ROL abs
            0x2E => self.abs_rmw(cycle, Self::do_rol),
            // RLA abs
            0x2F => self.abs_rmw(cycle, Self::do_rla),

            // BMI rel
            0x30 => self.branch(cycle, self.p.test(N)),
            // AND (zp),Y
            0x31 => self.izy_read(cycle, Self::do_and),
            // RLA (zp),Y
            0x33 => self.izy_rmw(cycle, Self::do_rla),
            // AND zp,X
            0x35 => self.zp_idx_read(cycle, self.x, Self::do_and),
            // ROL zp,X
            0x36 => self.zp_idx_rmw(cycle, Self::do_rol),
            // RLA zp,X
            0x37 => self.zp_idx_rmw(cycle, Self::do_rla),
            // SEC
            0x38 => self.flag_op(cycle, C, true),
            // AND abs,Y
            0x39 => self.abs_idx_read(cycle, self.y, Self::do_and),
            // RLA abs,Y
            0x3B => self.abs_idx_rmw(cycle, self.y, Self::do_rla),
            // AND abs,X
            0x3D => self.abs_idx_read(cycle, self.x, Self::do_and),
            // ROL abs,X
            0x3E => self.abs_idx_rmw(cycle, self.x, Self::do_rol),
            // RLA abs,X
            0x3F => self.abs_idx_rmw(cycle, self.x, Self::do_rla),

            // RTI - 6 cycles
            0x40 => self.rti(cycle),
            // EOR (zp,X)
            0x41 => self.izx_read(cycle, Self::do_eor),
            // SRE (zp,X)
            0x43 => self.izx_rmw(cycle, Self::do_sre),
            // EOR zp
            0x45 => self.zp_read(cycle, Self::do_eor),
            // LSR zp
            0x46 => self.zp_rmw(cycle, Self::do_lsr),
            // SRE zp
            0x47 => self.zp_rmw(cycle, Self::do_sre),
            // PHA - 3 cycles
            0x48 => self.push(cycle, |c| c.a),
            // EOR #
            0x49 => self.imm_read(cycle, Self::do_eor),
            // LSR A
            0x4A => self.implied(cycle, Self::lsr_acc),
            // ASR # - 2 cycles
            0x4B => self.imm_read(cycle, Self::do_asr),
            // JMP abs - 3 cycles
            0x4C => self.jmp_abs(cycle),
            // EOR abs
            0x4D => self.abs_read(cycle, Self::do_eor),
            // LSR abs
            0x4E => self.abs_rmw(cycle, Self::do_lsr),
            // SRE abs
            0x4F => self.abs_rmw(cycle, Self::do_sre),

            // BVC rel
            0x50 => self.branch(cycle, !self.p.test(V)),
            // EOR (zp),Y
            0x51 => self.izy_read(cycle, Self::do_eor),
            // SRE (zp),Y
            0x53 => self.izy_rmw(cycle, Self::do_sre),
            // EOR zp,X
            0x55 => self.zp_idx_read(cycle, self.x, Self::do_eor),
            // LSR zp,X
            0x56 => self.zp_idx_rmw(cycle, Self::do_lsr),
            // SRE zp,X
            0x57 => self.zp_idx_rmw(cycle, Self::do_sre),
            // CLI
            0x58 => self.flag_op(cycle, I, false),
            // EOR abs,Y
            0x59 => self.abs_idx_read(cycle, self.y, Self::do_eor),
            // SRE abs,Y
            0x5B => self.abs_idx_rmw(cycle, self.y, Self::do_sre),
            // EOR abs,X
            0x5D => self.abs_idx_read(cycle, self.x, Self::do_eor),
            // LSR abs,X
            0x5E => self.abs_idx_rmw(cycle, self.x, Self::do_lsr),
            // SRE abs,X
            0x5F => self.abs_idx_rmw(cycle, self.x, Self::do_sre),

            // RTS - 6 cycles
            0x60 => self.rts(cycle),
            // ADC (zp,X)
            0x61 => self.izx_read(cycle, Self::do_adc),
            // RRA (zp,X)
            0x63 => self.izx_rmw(cycle, Self::do_rra),
            // ADC zp
            0x65 => self.zp_read(cycle, Self::do_adc),
            // ROR zp
            0x66 => self.zp_rmw(cycle, Self::do_ror),
            // RRA zp
            0x67 => self.zp_rmw(cycle, Self::do_rra),
            // PLA - 4 cycles
            0x68 => self.pull(cycle, Self::pla_value),
            // ADC #
            0x69 => self.imm_read(cycle, Self::do_adc),
            // ROR A
            0x6A => self.implied(cycle, Self::ror_acc),
            // ARR # - 2 cycles
            0x6B => self.imm_read(cycle, Self::do_arr),
            // JMP (ind) - 5 cycles, with the page-wrap quirk
            0x6C => self.jmp_ind(cycle),
            // ADC abs
            0x6D => self.abs_read(cycle, Self::do_adc),
            // ROR abs
            0x6E => self.abs_rmw(cycle, Self::do_ror),
            // RRA abs
            0x6F => self.abs_rmw(cycle, Self::do_rra),

            // BVS rel
            0x70 => self.branch(cycle, self.p.test(V)),
            // ADC (zp),Y
            0x71 => self.izy_read(cycle, Self::do_adc),
            // RRA (zp),Y
            0x73 => self.izy_rmw(cycle, Self::do_rra),
            // ADC zp,X
            0x75 => self.zp_idx_read(cycle, self.x, Self::do_adc),
            // ROR zp,X
            0x76 => self.zp_idx_rmw(cycle, Self::do_ror),
            // RRA zp,X
            0x77 => self.zp_idx_rmw(cycle, Self::do_rra),
            // SEI
            0x78 => self.flag_op(cycle, I, true),
            // ADC abs,Y
            0x79 => self.abs_idx_read(cycle, self.y, Self::do_adc),
            // RRA abs,Y
            0x7B => self.abs_idx_rmw(cycle, self.y, Self::do_rra),
            // ADC abs,X
            0x7D => self.abs_idx_read(cycle, self.x, Self::do_adc),
            // ROR abs,X
            0x7E => self.abs_idx_rmw(cycle, self.x, Self::do_ror),
            // RRA abs,X
            0x7F => self.abs_idx_rmw(cycle, self.x, Self::do_rra),

            // NOP # - 2 cycles
            0x80 | 0x82 | 0x89 | 0xC2 | 0xE2 => self.imm_read(cycle, Self::do_nop),
            // STA (zp,X) - 6 cycles
            0x81 => self.izx_write(cycle, |c| c.a),
            // SAX (zp,X) - 6 cycles
            0x83 => self.izx_write(cycle, |c| c.a & c.x),
            // STY zp
            0x84 => self.zp_write(cycle, |c| c.y),
            // STA zp
            0x85 => self.zp_write(cycle, |c| c.a),
            // STX zp
            0x86 => self.zp_write(cycle, |c| c.x),
            // SAX zp
            0x87 => self.zp_write(cycle, |c| c.a & c.x),
            // DEY
            0x88 => self.implied(cycle, Self::dey),
            // TXA
            0x8A => self.implied(cycle, Self::txa),
            // ANE # - 2 cycles, unstable (magic constant $EE)
            0x8B => self.imm_read(cycle, Self::do_ane),
            // STY abs
            0x8C => self.abs_write(cycle, |c| c.y),
            // STA abs
            0x8D => self.abs_write(cycle, |c| c.a),
            // STX abs
            0x8E => self.abs_write(cycle, |c| c.x),
            // SAX abs
            0x8F => self.abs_write(cycle, |c| c.a & c.x),

            // BCC rel
            0x90 => self.branch(cycle, !self.p.test(C)),
            // STA (zp),Y - 6 cycles
            0x91 => self.izy_write(cycle, |c| c.a),
            // SHA (zp),Y - 6 cycles
            0x93 => self.sha_izy(cycle),
            // STY zp,X
            0x94 => self.zp_idx_write(cycle, self.x, |c| c.y),
            // STA zp,X
            0x95 => self.zp_idx_write(cycle, self.x, |c| c.a),
            // STX zp,Y
            0x96 => self.zp_idx_write(cycle, self.y, |c| c.x),
            // SAX zp,Y
            0x97 => self.zp_idx_write(cycle, self.y, |c| c.a & c.x),
            // TYA
            0x98 => self.implied(cycle, Self::tya),
            // STA abs,Y - 5 cycles
            0x99 => self.abs_idx_write(cycle, self.y, |c| c.a),
            // TXS
            0x9A => self.implied(cycle, Self::txs),
            // SHS abs,Y - 5 cycles
            0x9B => self.shs_aby(cycle),
            // SHY abs,X - 5 cycles
            0x9C => self.shy_abx(cycle),
            // STA abs,X - 5 cycles
            0x9D => self.abs_idx_write(cycle, self.x, |c| c.a),
            // SHX abs,Y - 5 cycles
            0x9E => self.shx_aby(cycle),
            // SHA abs,Y - 5 cycles
            0x9F => self.sha_aby(cycle),

            // LDY #
            0xA0 => self.imm_read(cycle, Self::do_ldy),
            // LDA (zp,X)
            0xA1 => self.izx_read(cycle, Self::do_lda),
            // LDX #
            0xA2 => self.imm_read(cycle, Self::do_ldx),
            // LAX (zp,X)
            0xA3 => self.izx_read(cycle, Self::do_lax),
            // LDY zp
            0xA4 => self.zp_read(cycle, Self::do_ldy),
            // LDA zp
            0xA5 => self.zp_read(cycle, Self::do_lda),
            // LDX zp
            0xA6 => self.zp_read(cycle, Self::do_ldx),
            // LAX zp
            0xA7 => self.zp_read(cycle, Self::do_lax),
            // TAY
            0xA8 => self.implied(cycle, Self::tay),
            // LDA #
            0xA9 => self.imm_read(cycle, Self::do_lda),
            // TAX
            0xAA => self.implied(cycle, Self::tax),
            // LXA # - 2 cycles, unstable (magic constant $EE)
            0xAB => self.imm_read(cycle, Self::do_lxa),
            // LDY abs
            0xAC => self.abs_read(cycle, Self::do_ldy),
            // LDA abs
            0xAD => self.abs_read(cycle, Self::do_lda),
            // LDX abs
            0xAE => self.abs_read(cycle, Self::do_ldx),
            // LAX abs
            0xAF => self.abs_read(cycle, Self::do_lax),

            // BCS rel
            0xB0 => self.branch(cycle, self.p.test(C)),
            // LDA (zp),Y
            0xB1 => self.izy_read(cycle, Self::do_lda),
            // LAX (zp),Y
            0xB3 => self.izy_read(cycle, Self::do_lax),
            // LDY zp,X
            0xB4 => self.zp_idx_read(cycle, self.x, Self::do_ldy),
            // LDA zp,X
            0xB5 => self.zp_idx_read(cycle, self.x, Self::do_lda),
            // LDX zp,Y
            0xB6 => self.zp_idx_read(cycle, self.y, Self::do_ldx),
            // LAX zp,Y
            0xB7 => self.zp_idx_read(cycle, self.y, Self::do_lax),
            // CLV
            0xB8 => self.flag_op(cycle, V, false),
            // LDA abs,Y
            0xB9 => self.abs_idx_read(cycle, self.y, Self::do_lda),
            // TSX
            0xBA => self.implied(cycle, Self::tsx),
            // LAS abs,Y - 4/5 cycles
            0xBB => self.abs_idx_read(cycle, self.y, Self::do_las),
            // LDY abs,X
            0xBC => self.abs_idx_read(cycle, self.x, Self::do_ldy),
            // LDA abs,X
            0xBD => self.abs_idx_read(cycle, self.x, Self::do_lda),
            // LDX abs,Y
            0xBE => self.abs_idx_read(cycle, self.y, Self::do_ldx),
            // LAX abs,Y
            0xBF => self.abs_idx_read(cycle, self.y, Self::do_lax),

            // CPY #
            0xC0 => self.imm_read(cycle, Self::do_cpy),
            // CMP (zp,X)
            0xC1 => self.izx_read(cycle, Self::do_cmp),
            // DCP (zp,X)
            0xC3 => self.izx_rmw(cycle, Self::do_dcp),
            // CPY zp
            0xC4 => self.zp_read(cycle, Self::do_cpy),
            // CMP zp
            0xC5 => self.zp_read(cycle, Self::do_cmp),
            // DEC zp
            0xC6 => self.zp_rmw(cycle, Self::do_dec),
            // DCP zp
            0xC7 => self.zp_rmw(cycle, Self::do_dcp),
            // INY
            0xC8 => self.implied(cycle, Self::iny),
            // CMP #
            0xC9 => self.imm_read(cycle, Self::do_cmp),
            // DEX
            0xCA => self.implied(cycle, Self::dex),
            // SBX # - 2 cycles
            0xCB => self.imm_read(cycle, Self::do_sbx),
            // CPY abs
            0xCC => self.abs_read(cycle, Self::do_cpy),
            // CMP abs
            0xCD => self.abs_read(cycle, Self::do_cmp),
            // DEC abs
            0xCE => self.abs_rmw(cycle, Self::do_dec),
            // DCP abs
            0xCF => self.abs_rmw(cycle, Self::do_dcp),

            // BNE rel
            0xD0 => self.branch(cycle, !self.p.test(Z)),
            // CMP (zp),Y
            0xD1 => self.izy_read(cycle, Self::do_cmp),
            // DCP (zp),Y
            0xD3 => self.izy_rmw(cycle, Self::do_dcp),
            // CMP zp,X
            0xD5 => self.zp_idx_read(cycle, self.x, Self::do_cmp),
            // DEC zp,X
            0xD6 => self.zp_idx_rmw(cycle, Self::do_dec),
            // DCP zp,X
            0xD7 => self.zp_idx_rmw(cycle, Self::do_dcp),
            // CLD
            0xD8 => self.flag_op(cycle, D, false),
            // CMP abs,Y
            0xD9 => self.abs_idx_read(cycle, self.y, Self::do_cmp),
            // DCP abs,Y
            0xDB => self.abs_idx_rmw(cycle, self.y, Self::do_dcp),
            // CMP abs,X
            0xDD => self.abs_idx_read(cycle, self.x, Self::do_cmp),
            // DEC abs,X
            0xDE => self.abs_idx_rmw(cycle, self.x, Self::do_dec),
            // DCP abs,X
            0xDF => self.abs_idx_rmw(cycle, self.x, Self::do_dcp),

            // CPX #
            0xE0 => self.imm_read(cycle, Self::do_cpx),
            // SBC (zp,X)
            0xE1 => self.izx_read(cycle, Self::do_sbc),
            // ISB (zp,X)
            0xE3 => self.izx_rmw(cycle, Self::do_isb),
            // CPX zp
            0xE4 => self.zp_read(cycle, Self::do_cpx),
            // SBC zp
            0xE5 => self.zp_read(cycle, Self::do_sbc),
            // INC zp
            0xE6 => self.zp_rmw(cycle, Self::do_inc),
            // ISB zp
            0xE7 => self.zp_rmw(cycle, Self::do_isb),
            // INX
            0xE8 => self.implied(cycle, Self::inx),
            // SBC # (0xEB is the undocumented alias)
            0xE9 | 0xEB => self.imm_read(cycle, Self::do_sbc),
            // CPX abs
            0xEC => self.abs_read(cycle, Self::do_cpx),
            // SBC abs
            0xED => self.abs_read(cycle, Self::do_sbc),
            // INC abs
            0xEE => self.abs_rmw(cycle, Self::do_inc),
            // ISB abs
            0xEF => self.abs_rmw(cycle, Self::do_isb),

            // BEQ rel
            0xF0 => self.branch(cycle, self.p.test(Z)),
            // SBC (zp),Y
            0xF1 => self.izy_read(cycle, Self::do_sbc),
            // ISB (zp),Y
            0xF3 => self.izy_rmw(cycle, Self::do_isb),
            // SBC zp,X
            0xF5 => self.zp_idx_read(cycle, self.x, Self::do_sbc),
            // INC zp,X
            0xF6 => self.zp_idx_rmw(cycle, Self::do_inc),
            // ISB zp,X
            0xF7 => self.zp_idx_rmw(cycle, Self::do_isb),
            // SED
            0xF8 => self.flag_op(cycle, D, true),
            // SBC abs,Y
            0xF9 => self.abs_idx_read(cycle, self.y, Self::do_sbc),
            // ISB abs,Y
            0xFB => self.abs_idx_rmw(cycle, self.y, Self::do_isb),
            // SBC abs,X
            0xFD => self.abs_idx_read(cycle, self.x, Self::do_sbc),
            // INC abs,X
            0xFE => self.abs_idx_rmw(cycle, self.x, Self::do_inc),
            // ISB abs,X
            0xFF => self.abs_idx_rmw(cycle, self.x, Self::do_isb),
        }
    }

    // ========================================================================
    // Pin helpers
    // ========================================================================

    /// Drive the address bus.
    fn sa(&mut self, addr: u16) {
        self.out.addr = addr;
    }

    /// Drive address and data bus together.
    fn sad(&mut self, addr: u16, data: u8) {
        self.out.addr = addr;
        self.out.data = data;
    }

    /// Drive the data bus.
    fn sd(&mut self, data: u8) {
        self.out.data = data;
    }

    /// Data bus value read by the previous cycle.
    fn gd(&self) -> u8 {
        self.data_in
    }

    /// Make this a write cycle.
    fn wr(&mut self) {
        self.out.rw = false;
    }

    /// End the instruction: address the next opcode and raise SYNC.
    fn fetch(&mut self) {
        self.out.addr = self.pc;
        self.out.sync = true;
    }

    /// Stack push address; decrements S.
    fn push_addr(&mut self) -> u16 {
        let s = self.s;
        self.s = s.wrapping_sub(1);
        0x0100 | u16::from(s)
    }

    /// Stack pull address; increments S.
    fn pull_addr(&mut self) -> u16 {
        let s = self.s;
        self.s = s.wrapping_add(1);
        0x0100 | u16::from(s)
    }

    // ========================================================================
    // Micro-sequencers - read operations
    // ========================================================================

    /// Immediate: 2 cycles.
    fn imm_read(&mut self, cycle: u8, op: fn(&mut Self, u8)) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                let v = self.gd();
                op(self, v);
                self.fetch();
            }
            _ => unreachable!("immediate cycle {cycle}"),
        }
    }

    /// Zero page: 3 cycles.
    fn zp_read(&mut self, cycle: u8, op: fn(&mut Self, u8)) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => self.sa(u16::from(self.gd())),
            2 => {
                let v = self.gd();
                op(self, v);
                self.fetch();
            }
            _ => unreachable!("zero page cycle {cycle}"),
        }
    }

    /// Zero page indexed: 4 cycles, index wraps within the page.
    fn zp_idx_read(&mut self, cycle: u8, idx: u8, op: fn(&mut Self, u8)) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.ad = u16::from(self.gd());
                self.sa(self.ad);
            }
            2 => {
                self.ad = (self.ad + u16::from(idx)) & 0xFF;
                self.sa(self.ad);
            }
            3 => {
                let v = self.gd();
                op(self, v);
                self.fetch();
            }
            _ => unreachable!("zero page indexed cycle {cycle}"),
        }
    }

    /// Absolute: 4 cycles.
    fn abs_read(&mut self, cycle: u8, op: fn(&mut Self, u8)) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
                self.ad = u16::from(self.gd());
            }
            2 => self.sa((u16::from(self.gd()) << 8) | self.ad),
            3 => {
                let v = self.gd();
                op(self, v);
                self.fetch();
            }
            _ => unreachable!("absolute cycle {cycle}"),
        }
    }

    /// Absolute indexed: 4 cycles, or 5 when the index crosses a page.
    ///
    /// Cycle 2 issues a read at the address with the unfixed high byte; when
    /// no page is crossed that address is already correct and the fix-up
    /// cycle is skipped by bumping `IR`.
    fn abs_idx_read(&mut self, cycle: u8, idx: u8, op: fn(&mut Self, u8)) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
                self.ad = u16::from(self.gd());
            }
            2 => {
                self.ad |= u16::from(self.gd()) << 8;
                let sum = self.ad.wrapping_add(u16::from(idx));
                self.sa((self.ad & 0xFF00) | (sum & 0x00FF));
                if self.ad >> 8 == sum >> 8 {
                    self.ir += 1;
                }
            }
            3 => self.sa(self.ad.wrapping_add(u16::from(idx))),
            4 => {
                let v = self.gd();
                op(self, v);
                self.fetch();
            }
            _ => unreachable!("absolute indexed cycle {cycle}"),
        }
    }

    /// (zp,X): 6 cycles.
    fn izx_read(&mut self, cycle: u8, op: fn(&mut Self, u8)) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.ad = u16::from(self.gd());
                self.sa(self.ad);
            }
            2 => {
                self.ad = (self.ad + u16::from(self.x)) & 0xFF;
                self.sa(self.ad);
            }
            3 => {
                self.sa((self.ad + 1) & 0xFF);
                self.ad = u16::from(self.gd());
            }
            4 => self.sa((u16::from(self.gd()) << 8) | self.ad),
            5 => {
                let v = self.gd();
                op(self, v);
                self.fetch();
            }
            _ => unreachable!("(zp,X) cycle {cycle}"),
        }
    }

    /// (zp),Y: 5 cycles, or 6 when the index crosses a page.
    fn izy_read(&mut self, cycle: u8, op: fn(&mut Self, u8)) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.ad = u16::from(self.gd());
                self.sa(self.ad);
            }
            2 => {
                self.sa((self.ad + 1) & 0xFF);
                self.ad = u16::from(self.gd());
            }
            3 => {
                self.ad |= u16::from(self.gd()) << 8;
                let sum = self.ad.wrapping_add(u16::from(self.y));
                self.sa((self.ad & 0xFF00) | (sum & 0x00FF));
                if self.ad >> 8 == sum >> 8 {
                    self.ir += 1;
                }
            }
            4 => self.sa(self.ad.wrapping_add(u16::from(self.y))),
            5 => {
                let v = self.gd();
                op(self, v);
                self.fetch();
            }
            _ => unreachable!("(zp),Y cycle {cycle}"),
        }
    }

    // ========================================================================
    // Micro-sequencers - write operations
    // ========================================================================

    /// Zero page write: 3 cycles.
    fn zp_write(&mut self, cycle: u8, val: fn(&Self) -> u8) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                let v = val(self);
                self.sad(u16::from(self.gd()), v);
                self.wr();
            }
            2 => self.fetch(),
            _ => unreachable!("zero page write cycle {cycle}"),
        }
    }

    /// Zero page indexed write: 4 cycles.
    fn zp_idx_write(&mut self, cycle: u8, idx: u8, val: fn(&Self) -> u8) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.ad = u16::from(self.gd());
                self.sa(self.ad);
            }
            2 => {
                self.ad = (self.ad + u16::from(idx)) & 0xFF;
                let v = val(self);
                self.sad(self.ad, v);
                self.wr();
            }
            3 => self.fetch(),
            _ => unreachable!("zero page indexed write cycle {cycle}"),
        }
    }

    /// Absolute write: 4 cycles.
    fn abs_write(&mut self, cycle: u8, val: fn(&Self) -> u8) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
                self.ad = u16::from(self.gd());
            }
            2 => {
                let v = val(self);
                self.sad((u16::from(self.gd()) << 8) | self.ad, v);
                self.wr();
            }
            3 => self.fetch(),
            _ => unreachable!("absolute write cycle {cycle}"),
        }
    }

    /// Absolute indexed write: always 5 cycles; the unfixed-address read
    /// happens whether or not a page is crossed.
    fn abs_idx_write(&mut self, cycle: u8, idx: u8, val: fn(&Self) -> u8) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
                self.ad = u16::from(self.gd());
            }
            2 => {
                self.ad |= u16::from(self.gd()) << 8;
                let sum = self.ad.wrapping_add(u16::from(idx));
                self.sa((self.ad & 0xFF00) | (sum & 0x00FF));
            }
            3 => {
                let v = val(self);
                self.sad(self.ad.wrapping_add(u16::from(idx)), v);
                self.wr();
            }
            4 => self.fetch(),
            _ => unreachable!("absolute indexed write cycle {cycle}"),
        }
    }

    /// (zp,X) write: 6 cycles.
    fn izx_write(&mut self, cycle: u8, val: fn(&Self) -> u8) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.ad = u16::from(self.gd());
                self.sa(self.ad);
            }
            2 => {
                self.ad = (self.ad + u16::from(self.x)) & 0xFF;
                self.sa(self.ad);
            }
            3 => {
                self.sa((self.ad + 1) & 0xFF);
                self.ad = u16::from(self.gd());
            }
            4 => {
                let v = val(self);
                self.sad((u16::from(self.gd()) << 8) | self.ad, v);
                self.wr();
            }
            5 => self.fetch(),
            _ => unreachable!("(zp,X) write cycle {cycle}"),
        }
    }

    /// (zp),Y write: always 6 cycles.
    fn izy_write(&mut self, cycle: u8, val: fn(&Self) -> u8) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.ad = u16::from(self.gd());
                self.sa(self.ad);
            }
            2 => {
                self.sa((self.ad + 1) & 0xFF);
                self.ad = u16::from(self.gd());
            }
            3 => {
                self.ad |= u16::from(self.gd()) << 8;
                let sum = self.ad.wrapping_add(u16::from(self.y));
                self.sa((self.ad & 0xFF00) | (sum & 0x00FF));
            }
            4 => {
                let v = val(self);
                self.sad(self.ad.wrapping_add(u16::from(self.y)), v);
                self.wr();
            }
            5 => self.fetch(),
            _ => unreachable!("(zp),Y write cycle {cycle}"),
        }
    }

    // ========================================================================
    // Micro-sequencers - read-modify-write operations
    // ========================================================================
    //
    // The first write cycle drives the just-read value back to the same
    // address before the modified value lands on the next cycle.

    /// Zero page RMW: 5 cycles.
    fn zp_rmw(&mut self, cycle: u8, op: fn(&mut Self, u8) -> u8) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => self.sa(u16::from(self.gd())),
            2 => {
                self.ad = u16::from(self.gd());
                self.sd(self.ad as u8);
                self.wr();
            }
            3 => {
                let t = op(self, self.ad as u8);
                self.sd(t);
                self.wr();
            }
            4 => self.fetch(),
            _ => unreachable!("zero page RMW cycle {cycle}"),
        }
    }

    /// Zero page,X RMW: 6 cycles.
    fn zp_idx_rmw(&mut self, cycle: u8, op: fn(&mut Self, u8) -> u8) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.ad = u16::from(self.gd());
                self.sa(self.ad);
            }
            2 => {
                self.ad = (self.ad + u16::from(self.x)) & 0xFF;
                self.sa(self.ad);
            }
            3 => {
                self.ad = u16::from(self.gd());
                self.sd(self.ad as u8);
                self.wr();
            }
            4 => {
                let t = op(self, self.ad as u8);
                self.sd(t);
                self.wr();
            }
            5 => self.fetch(),
            _ => unreachable!("zero page indexed RMW cycle {cycle}"),
        }
    }

    /// Absolute RMW: 6 cycles.
    fn abs_rmw(&mut self, cycle: u8, op: fn(&mut Self, u8) -> u8) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
                self.ad = u16::from(self.gd());
            }
            2 => self.sa((u16::from(self.gd()) << 8) | self.ad),
            3 => {
                self.ad = u16::from(self.gd());
                self.sd(self.ad as u8);
                self.wr();
            }
            4 => {
                let t = op(self, self.ad as u8);
                self.sd(t);
                self.wr();
            }
            5 => self.fetch(),
            _ => unreachable!("absolute RMW cycle {cycle}"),
        }
    }

    /// Absolute indexed RMW: always 7 cycles.
    fn abs_idx_rmw(&mut self, cycle: u8, idx: u8, op: fn(&mut Self, u8) -> u8) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
                self.ad = u16::from(self.gd());
            }
            2 => {
                self.ad |= u16::from(self.gd()) << 8;
                let sum = self.ad.wrapping_add(u16::from(idx));
                self.sa((self.ad & 0xFF00) | (sum & 0x00FF));
            }
            3 => self.sa(self.ad.wrapping_add(u16::from(idx))),
            4 => {
                self.ad = u16::from(self.gd());
                self.sd(self.ad as u8);
                self.wr();
            }
            5 => {
                let t = op(self, self.ad as u8);
                self.sd(t);
                self.wr();
            }
            6 => self.fetch(),
            _ => unreachable!("absolute indexed RMW cycle {cycle}"),
        }
    }

    /// (zp,X) RMW: 8 cycles.
    fn izx_rmw(&mut self, cycle: u8, op: fn(&mut Self, u8) -> u8) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.ad = u16::from(self.gd());
                self.sa(self.ad);
            }
            2 => {
                self.ad = (self.ad + u16::from(self.x)) & 0xFF;
                self.sa(self.ad);
            }
            3 => {
                self.sa((self.ad + 1) & 0xFF);
                self.ad = u16::from(self.gd());
            }
            4 => self.sa((u16::from(self.gd()) << 8) | self.ad),
            5 => {
                self.ad = u16::from(self.gd());
                self.sd(self.ad as u8);
                self.wr();
            }
            6 => {
                let t = op(self, self.ad as u8);
                self.sd(t);
                self.wr();
            }
            7 => self.fetch(),
            _ => unreachable!("(zp,X) RMW cycle {cycle}"),
        }
    }

    /// (zp),Y RMW: 8 cycles, no page-cross shortcut.
    fn izy_rmw(&mut self, cycle: u8, op: fn(&mut Self, u8) -> u8) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.ad = u16::from(self.gd());
                self.sa(self.ad);
            }
            2 => {
                self.sa((self.ad + 1) & 0xFF);
                self.ad = u16::from(self.gd());
            }
            3 => {
                self.ad |= u16::from(self.gd()) << 8;
                let sum = self.ad.wrapping_add(u16::from(self.y));
                self.sa((self.ad & 0xFF00) | (sum & 0x00FF));
            }
            4 => self.sa(self.ad.wrapping_add(u16::from(self.y))),
            5 => {
                self.ad = u16::from(self.gd());
                self.sd(self.ad as u8);
                self.wr();
            }
            6 => {
                let t = op(self, self.ad as u8);
                self.sd(t);
                self.wr();
            }
            7 => self.fetch(),
            _ => unreachable!("(zp),Y RMW cycle {cycle}"),
        }
    }

    // ========================================================================
    // Control flow and stack instructions
    // ========================================================================

    /// Implied and accumulator instructions: 2 cycles.
    fn implied(&mut self, cycle: u8, action: fn(&mut Self)) {
        match cycle {
            0 => self.sa(self.pc),
            1 => {
                action(self);
                self.fetch();
            }
            _ => unreachable!("implied cycle {cycle}"),
        }
    }

    /// Flag set/clear instructions: 2 cycles.
    fn flag_op(&mut self, cycle: u8, flag: u8, set: bool) {
        match cycle {
            0 => self.sa(self.pc),
            1 => {
                self.p.apply(flag, set);
                self.fetch();
            }
            _ => unreachable!("flag cycle {cycle}"),
        }
    }

    /// Stack push (PHA/PHP): 3 cycles.
    fn push(&mut self, cycle: u8, val: fn(&Self) -> u8) {
        match cycle {
            0 => self.sa(self.pc),
            1 => {
                let v = val(self);
                let addr = self.push_addr();
                self.sad(addr, v);
                self.wr();
            }
            2 => self.fetch(),
            _ => unreachable!("push cycle {cycle}"),
        }
    }

    /// Stack pull (PLA/PLP): 4 cycles.
    fn pull(&mut self, cycle: u8, action: fn(&mut Self)) {
        match cycle {
            0 => self.sa(self.pc),
            1 => {
                let addr = self.pull_addr();
                self.sa(addr);
            }
            2 => self.sa(0x0100 | u16::from(self.s)),
            3 => {
                action(self);
                self.fetch();
            }
            _ => unreachable!("pull cycle {cycle}"),
        }
    }

    /// Relative branches: 2 cycles untaken, 3 taken, 4 across a page.
    ///
    /// A taken branch that stays on the same page shifts the interrupt
    /// pipelines right by one, delaying a pending IRQ/NMI by one
    /// instruction.
    fn branch(&mut self, cycle: u8, taken: bool) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.sa(self.pc);
                self.ad = self.pc.wrapping_add((self.gd() as i8) as u16);
                if !taken {
                    self.fetch();
                }
            }
            2 => {
                self.sa((self.pc & 0xFF00) | (self.ad & 0x00FF));
                if self.ad & 0xFF00 == self.pc & 0xFF00 {
                    self.pc = self.ad;
                    self.irq_pip >>= 1;
                    self.nmi_pip >>= 1;
                    self.fetch();
                }
            }
            3 => {
                self.pc = self.ad;
                self.fetch();
            }
            _ => unreachable!("branch cycle {cycle}"),
        }
    }

    /// BRK and the shared interrupt entry: 7 cycles.
    ///
    /// During RESET the stack pushes are turned into reads and the vector
    /// is $FFFC; NMI takes priority over IRQ/BRK for the vector selection.
    fn brk(&mut self, cycle: u8) {
        match cycle {
            0 => self.sa(self.pc),
            1 => {
                if self.brk_flags & (BRK_IRQ | BRK_NMI) == 0 {
                    self.pc = self.pc.wrapping_add(1);
                }
                let addr = self.push_addr();
                self.sad(addr, (self.pc >> 8) as u8);
                if self.brk_flags & BRK_RESET == 0 {
                    self.wr();
                }
            }
            2 => {
                let addr = self.push_addr();
                self.sad(addr, self.pc as u8);
                if self.brk_flags & BRK_RESET == 0 {
                    self.wr();
                }
            }
            3 => {
                let addr = self.push_addr();
                self.sad(addr, self.p.0 | U);
                if self.brk_flags & BRK_RESET != 0 {
                    self.ad = 0xFFFC;
                } else {
                    self.wr();
                    self.ad = if self.brk_flags & BRK_NMI != 0 {
                        0xFFFA
                    } else {
                        0xFFFE
                    };
                }
            }
            4 => {
                self.sa(self.ad);
                self.ad = self.ad.wrapping_add(1);
                self.p.0 |= I | B;
                // A higher-priority interrupt can no longer replace the
                // vector from here on.
                self.brk_flags = 0;
            }
            5 => {
                self.sa(self.ad);
                self.ad = u16::from(self.gd());
            }
            6 => {
                self.pc = (u16::from(self.gd()) << 8) | self.ad;
                self.fetch();
            }
            _ => unreachable!("brk cycle {cycle}"),
        }
    }

    /// JSR abs: 6 cycles.
    fn jsr(&mut self, cycle: u8) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.sa(0x0100 | u16::from(self.s));
                self.ad = u16::from(self.gd());
            }
            2 => {
                let addr = self.push_addr();
                self.sad(addr, (self.pc >> 8) as u8);
                self.wr();
            }
            3 => {
                let addr = self.push_addr();
                self.sad(addr, self.pc as u8);
                self.wr();
            }
            4 => self.sa(self.pc),
            5 => {
                self.pc = (u16::from(self.gd()) << 8) | self.ad;
                self.fetch();
            }
            _ => unreachable!("jsr cycle {cycle}"),
        }
    }

    /// RTS: 6 cycles.
    fn rts(&mut self, cycle: u8) {
        match cycle {
            0 => self.sa(self.pc),
            1 => {
                let addr = self.pull_addr();
                self.sa(addr);
            }
            2 => {
                let addr = self.pull_addr();
                self.sa(addr);
            }
            3 => {
                self.sa(0x0100 | u16::from(self.s));
                self.ad = u16::from(self.gd());
            }
            4 => {
                self.pc = (u16::from(self.gd()) << 8) | self.ad;
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            5 => self.fetch(),
            _ => unreachable!("rts cycle {cycle}"),
        }
    }

    /// RTI: 6 cycles.
    fn rti(&mut self, cycle: u8) {
        match cycle {
            0 => self.sa(self.pc),
            1 => {
                let addr = self.pull_addr();
                self.sa(addr);
            }
            2 => {
                let addr = self.pull_addr();
                self.sa(addr);
            }
            3 => {
                let addr = self.pull_addr();
                self.sa(addr);
                self.p = Status((self.gd() | B) & !U);
            }
            4 => {
                self.sa(0x0100 | u16::from(self.s));
                self.ad = u16::from(self.gd());
            }
            5 => {
                self.pc = (u16::from(self.gd()) << 8) | self.ad;
                self.fetch();
            }
            _ => unreachable!("rti cycle {cycle}"),
        }
    }

    /// JMP abs: 3 cycles.
    fn jmp_abs(&mut self, cycle: u8) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
                self.ad = u16::from(self.gd());
            }
            2 => {
                self.pc = (u16::from(self.gd()) << 8) | self.ad;
                self.fetch();
            }
            _ => unreachable!("jmp cycle {cycle}"),
        }
    }

    /// JMP (ind): 5 cycles, with the hardware bug that the pointer's high
    /// byte is fetched without carrying into the page.
    fn jmp_ind(&mut self, cycle: u8) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
                self.ad = u16::from(self.gd());
            }
            2 => {
                self.ad |= u16::from(self.gd()) << 8;
                self.sa(self.ad);
            }
            3 => {
                self.sa((self.ad & 0xFF00) | (self.ad.wrapping_add(1) & 0x00FF));
                self.ad = u16::from(self.gd());
            }
            4 => {
                self.pc = (u16::from(self.gd()) << 8) | self.ad;
                self.fetch();
            }
            _ => unreachable!("jmp indirect cycle {cycle}"),
        }
    }

    /// JAM: locks the bus on $FFFF/$FF until RESET is asserted.
    fn jam(&mut self, cycle: u8) {
        match cycle {
            0 => {
                log::warn!("jam opcode at pc={:04X}, cpu halted", self.pc);
                self.sa(self.pc);
            }
            1 => {
                if self.brk_flags & BRK_RESET != 0 {
                    self.fetch();
                } else {
                    self.sad(0xFFFF, 0xFF);
                    self.ir -= 1;
                }
            }
            _ => unreachable!("jam cycle {cycle}"),
        }
    }

    // ========================================================================
    // Unstable store instructions (SHA/SHX/SHY/SHS)
    // ========================================================================
    //
    // The stored value is ANDed with the high byte of the target address
    // plus one. Bus conflicts on real silicon are not modeled.

    /// SHA (zp),Y: 6 cycles.
    fn sha_izy(&mut self, cycle: u8) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.ad = u16::from(self.gd());
                self.sa(self.ad);
            }
            2 => {
                self.sa((self.ad + 1) & 0xFF);
                self.ad = u16::from(self.gd());
            }
            3 => {
                self.ad |= u16::from(self.gd()) << 8;
                let sum = self.ad.wrapping_add(u16::from(self.y));
                self.sa((self.ad & 0xFF00) | (sum & 0x00FF));
            }
            4 => {
                self.sa(self.ad.wrapping_add(u16::from(self.y)));
                let v = self.a & self.x & ((self.out.addr >> 8) as u8).wrapping_add(1);
                self.sd(v);
                self.wr();
            }
            5 => self.fetch(),
            _ => unreachable!("sha (zp),y cycle {cycle}"),
        }
    }

    /// SHA abs,Y: 5 cycles.
    fn sha_aby(&mut self, cycle: u8) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
                self.ad = u16::from(self.gd());
            }
            2 => {
                self.ad |= u16::from(self.gd()) << 8;
                let sum = self.ad.wrapping_add(u16::from(self.y));
                self.sa((self.ad & 0xFF00) | (sum & 0x00FF));
            }
            3 => {
                self.sa(self.ad.wrapping_add(u16::from(self.y)));
                let v = self.a & self.x & ((self.out.addr >> 8) as u8).wrapping_add(1);
                self.sd(v);
                self.wr();
            }
            4 => self.fetch(),
            _ => unreachable!("sha abs,y cycle {cycle}"),
        }
    }

    /// SHS abs,Y: 5 cycles. Also transfers A AND X into S.
    fn shs_aby(&mut self, cycle: u8) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
                self.ad = u16::from(self.gd());
            }
            2 => {
                self.ad |= u16::from(self.gd()) << 8;
                let sum = self.ad.wrapping_add(u16::from(self.y));
                self.sa((self.ad & 0xFF00) | (sum & 0x00FF));
            }
            3 => {
                self.sa(self.ad.wrapping_add(u16::from(self.y)));
                self.s = self.a & self.x;
                let v = self.s & ((self.out.addr >> 8) as u8).wrapping_add(1);
                self.sd(v);
                self.wr();
            }
            4 => self.fetch(),
            _ => unreachable!("shs abs,y cycle {cycle}"),
        }
    }

    /// SHY abs,X: 5 cycles.
    fn shy_abx(&mut self, cycle: u8) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
                self.ad = u16::from(self.gd());
            }
            2 => {
                self.ad |= u16::from(self.gd()) << 8;
                let sum = self.ad.wrapping_add(u16::from(self.x));
                self.sa((self.ad & 0xFF00) | (sum & 0x00FF));
            }
            3 => {
                self.sa(self.ad.wrapping_add(u16::from(self.x)));
                let v = self.y & ((self.out.addr >> 8) as u8).wrapping_add(1);
                self.sd(v);
                self.wr();
            }
            4 => self.fetch(),
            _ => unreachable!("shy abs,x cycle {cycle}"),
        }
    }

    /// SHX abs,Y: 5 cycles.
    fn shx_aby(&mut self, cycle: u8) {
        match cycle {
            0 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            1 => {
                self.sa(self.pc);
                self.pc = self.pc.wrapping_add(1);
                self.ad = u16::from(self.gd());
            }
            2 => {
                self.ad |= u16::from(self.gd()) << 8;
                let sum = self.ad.wrapping_add(u16::from(self.y));
                self.sa((self.ad & 0xFF00) | (sum & 0x00FF));
            }
            3 => {
                self.sa(self.ad.wrapping_add(u16::from(self.y)));
                let v = self.x & ((self.out.addr >> 8) as u8).wrapping_add(1);
                self.sd(v);
                self.wr();
            }
            4 => self.fetch(),
            _ => unreachable!("shx abs,y cycle {cycle}"),
        }
    }
}

// ============================================================================
// ALU and register operations
// ============================================================================

impl Mos6502 {
    fn do_ora(&mut self, v: u8) {
        self.a |= v;
        self.p.nz(self.a);
    }

    fn do_and(&mut self, v: u8) {
        self.a &= v;
        self.p.nz(self.a);
    }

    fn do_eor(&mut self, v: u8) {
        self.a ^= v;
        self.p.nz(self.a);
    }

    /// ADC, with the decimal path following the MAME BCD algorithm.
    fn do_adc(&mut self, v: u8) {
        if self.p.test(D) {
            let c = u16::from(self.p.test(C));
            self.p.0 &= !(N | V | Z | C);
            let a = u16::from(self.a);
            let val = u16::from(v);

            let mut al = (a & 0x0F) + (val & 0x0F) + c;
            if al > 9 {
                al += 6;
            }
            let mut ah = (a >> 4) + (val >> 4) + u16::from(al > 0x0F);

            // N, V and Z come from the intermediate binary result.
            if a + val + c == 0 {
                self.p.0 |= Z;
            } else if ah & 0x08 != 0 {
                self.p.0 |= N;
            }
            if !(a ^ val) & (a ^ (ah << 4)) & 0x80 != 0 {
                self.p.0 |= V;
            }
            if ah > 9 {
                ah += 6;
            }
            if ah > 15 {
                self.p.0 |= C;
            }
            self.a = ((ah << 4) | (al & 0x0F)) as u8;
        } else {
            let sum = u16::from(self.a) + u16::from(v) + u16::from(self.p.test(C));
            self.p.0 &= !(V | C);
            self.p.nz(sum as u8);
            if !(self.a ^ v) & (self.a ^ sum as u8) & 0x80 != 0 {
                self.p.0 |= V;
            }
            if sum & 0xFF00 != 0 {
                self.p.0 |= C;
            }
            self.a = sum as u8;
        }
    }

    /// SBC, with the decimal path following the MAME BCD algorithm.
    fn do_sbc(&mut self, v: u8) {
        if self.p.test(D) {
            let c = i16::from(!self.p.test(C));
            self.p.0 &= !(N | V | Z | C);
            let a = i16::from(self.a);
            let val = i16::from(v);

            let diff = a - val - c;
            let mut al = (a & 0x0F) - (val & 0x0F) - c;
            if al < 0 {
                al -= 6;
            }
            let mut ah = (a >> 4) - (val >> 4) - i16::from(al < 0);
            if diff == 0 {
                self.p.0 |= Z;
            } else if diff & 0x80 != 0 {
                self.p.0 |= N;
            }
            if (a ^ val) & (a ^ diff) & 0x80 != 0 {
                self.p.0 |= V;
            }
            if diff >= 0 {
                self.p.0 |= C;
            }
            if ah & 0x80 != 0 {
                ah -= 6;
            }
            self.a = (((ah << 4) | (al & 0x0F)) & 0xFF) as u8;
        } else {
            let diff = u16::from(self.a)
                .wrapping_sub(u16::from(v))
                .wrapping_sub(u16::from(!self.p.test(C)));
            self.p.0 &= !(V | C);
            self.p.nz(diff as u8);
            if (self.a ^ v) & (self.a ^ diff as u8) & 0x80 != 0 {
                self.p.0 |= V;
            }
            if diff & 0xFF00 == 0 {
                self.p.0 |= C;
            }
            self.a = diff as u8;
        }
    }

    /// Shared comparison: N and Z from the low byte, C = no borrow.
    fn compare(&mut self, r: u8, v: u8) {
        let t = u16::from(r).wrapping_sub(u16::from(v));
        self.p.nz(t as u8);
        self.p.apply(C, t & 0xFF00 == 0);
    }

    fn do_cmp(&mut self, v: u8) {
        let a = self.a;
        self.compare(a, v);
    }

    fn do_cpx(&mut self, v: u8) {
        let x = self.x;
        self.compare(x, v);
    }

    fn do_cpy(&mut self, v: u8) {
        let y = self.y;
        self.compare(y, v);
    }

    fn do_bit(&mut self, v: u8) {
        self.p.apply(Z, self.a & v == 0);
        self.p.apply(N, v & N != 0);
        self.p.apply(V, v & V != 0);
    }

    fn do_lda(&mut self, v: u8) {
        self.a = v;
        self.p.nz(v);
    }

    fn do_ldx(&mut self, v: u8) {
        self.x = v;
        self.p.nz(v);
    }

    fn do_ldy(&mut self, v: u8) {
        self.y = v;
        self.p.nz(v);
    }

    fn do_nop(&mut self, _v: u8) {}

    // --- shifts and rotates (shared by accumulator and RMW forms) ---

    fn do_asl(&mut self, v: u8) -> u8 {
        let r = v << 1;
        self.p.nz(r);
        self.p.apply(C, v & 0x80 != 0);
        r
    }

    fn do_lsr(&mut self, v: u8) -> u8 {
        let r = v >> 1;
        self.p.nz(r);
        self.p.apply(C, v & 0x01 != 0);
        r
    }

    fn do_rol(&mut self, v: u8) -> u8 {
        let carry_in = u8::from(self.p.test(C));
        let r = (v << 1) | carry_in;
        self.p.apply(C, v & 0x80 != 0);
        self.p.nz(r);
        r
    }

    fn do_ror(&mut self, v: u8) -> u8 {
        let carry_in = u8::from(self.p.test(C));
        let r = (v >> 1) | (carry_in << 7);
        self.p.apply(C, v & 0x01 != 0);
        self.p.nz(r);
        r
    }

    fn do_dec(&mut self, v: u8) -> u8 {
        let r = v.wrapping_sub(1);
        self.p.nz(r);
        r
    }

    fn do_inc(&mut self, v: u8) -> u8 {
        let r = v.wrapping_add(1);
        self.p.nz(r);
        r
    }

    // --- undocumented RMW combinations ---

    fn do_slo(&mut self, v: u8) -> u8 {
        let t = self.do_asl(v);
        self.a |= t;
        self.p.nz(self.a);
        t
    }

    fn do_rla(&mut self, v: u8) -> u8 {
        let t = self.do_rol(v);
        self.a &= t;
        self.p.nz(self.a);
        t
    }

    fn do_sre(&mut self, v: u8) -> u8 {
        let t = self.do_lsr(v);
        self.a ^= t;
        self.p.nz(self.a);
        t
    }

    fn do_rra(&mut self, v: u8) -> u8 {
        let t = self.do_ror(v);
        self.do_adc(t);
        t
    }

    fn do_dcp(&mut self, v: u8) -> u8 {
        let t = v.wrapping_sub(1);
        let a = self.a;
        self.compare(a, t);
        t
    }

    fn do_isb(&mut self, v: u8) -> u8 {
        let t = v.wrapping_add(1);
        self.do_sbc(t);
        t
    }

    // --- undocumented loads and immediates ---

    fn do_lax(&mut self, v: u8) {
        self.a = v;
        self.x = v;
        self.p.nz(v);
    }

    fn do_las(&mut self, v: u8) {
        let r = v & self.s;
        self.a = r;
        self.x = r;
        self.s = r;
        self.p.nz(r);
    }

    fn do_anc(&mut self, v: u8) {
        self.a &= v;
        self.p.nz(self.a);
        self.p.apply(C, self.a & 0x80 != 0);
    }

    fn do_asr(&mut self, v: u8) {
        let t = self.a & v;
        self.a = self.do_lsr(t);
    }

    /// ARR: AND then rotate right, with its own flag rules and a decimal
    /// fix-up path (MAME algorithm).
    fn do_arr(&mut self, v: u8) {
        self.a &= v;
        if self.p.test(D) {
            let carry_in = self.p.test(C);
            self.p.0 &= !(N | V | Z | C);
            let mut r = self.a >> 1;
            if carry_in {
                r |= 0x80;
            }
            self.p.nz(r);
            if (r ^ self.a) & 0x40 != 0 {
                self.p.0 |= V;
            }
            if self.a & 0x0F >= 0x05 {
                r = (r.wrapping_add(6) & 0x0F) | (r & 0xF0);
            }
            if self.a & 0xF0 >= 0x50 {
                r = r.wrapping_add(0x60);
                self.p.0 |= C;
            }
            self.a = r;
        } else {
            let carry_in = self.p.test(C);
            self.p.0 &= !(N | V | Z | C);
            self.a >>= 1;
            if carry_in {
                self.a |= 0x80;
            }
            self.p.nz(self.a);
            if self.a & 0x40 != 0 {
                self.p.0 |= V | C;
            }
            if self.a & 0x20 != 0 {
                self.p.0 ^= V;
            }
        }
    }

    /// ANE: unstable, modeled with the constant $EE.
    fn do_ane(&mut self, v: u8) {
        self.a = (self.a | 0xEE) & self.x & v;
        self.p.nz(self.a);
    }

    /// LXA: unstable, modeled with the constant $EE.
    fn do_lxa(&mut self, v: u8) {
        self.a = (self.a | 0xEE) & v;
        self.x = self.a;
        self.p.nz(self.a);
    }

    /// SBX: X = (A AND X) - operand, compare-style carry.
    fn do_sbx(&mut self, v: u8) {
        let t = u16::from(self.a & self.x).wrapping_sub(u16::from(v));
        self.p.nz(t as u8);
        self.p.apply(C, t & 0xFF00 == 0);
        self.x = t as u8;
    }

    // --- implied register operations ---

    fn tax(&mut self) {
        self.x = self.a;
        self.p.nz(self.x);
    }

    fn txa(&mut self) {
        self.a = self.x;
        self.p.nz(self.a);
    }

    fn tay(&mut self) {
        self.y = self.a;
        self.p.nz(self.y);
    }

    fn tya(&mut self) {
        self.a = self.y;
        self.p.nz(self.a);
    }

    fn tsx(&mut self) {
        self.x = self.s;
        self.p.nz(self.x);
    }

    fn txs(&mut self) {
        self.s = self.x;
    }

    fn inx(&mut self) {
        self.x = self.x.wrapping_add(1);
        self.p.nz(self.x);
    }

    fn iny(&mut self) {
        self.y = self.y.wrapping_add(1);
        self.p.nz(self.y);
    }

    fn dex(&mut self) {
        self.x = self.x.wrapping_sub(1);
        self.p.nz(self.x);
    }

    fn dey(&mut self) {
        self.y = self.y.wrapping_sub(1);
        self.p.nz(self.y);
    }

    fn asl_acc(&mut self) {
        self.a = self.do_asl(self.a);
    }

    fn rol_acc(&mut self) {
        self.a = self.do_rol(self.a);
    }

    fn lsr_acc(&mut self) {
        self.a = self.do_lsr(self.a);
    }

    fn ror_acc(&mut self) {
        self.a = self.do_ror(self.a);
    }

    fn no_op(&mut self) {}

    fn pla_value(&mut self) {
        self.a = self.gd();
        self.p.nz(self.a);
    }

    fn plp_value(&mut self) {
        self.p = Status((self.gd() | B) & !U);
    }
}

impl fmt::Display for Mos6502 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A:{:02X} X:{:02X} Y:{:02X} P:{} SP:01{:02X} PC:{:04X} IR:{:02X}/{}",
            self.a,
            self.x,
            self.y,
            self.p,
            self.s,
            self.pc,
            self.instruction(),
            self.cycle(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags;

    #[test]
    fn power_on_state() {
        let cpu = Mos6502::new();
        assert_eq!(cpu.a(), 0);
        assert_eq!(cpu.x(), 0);
        assert_eq!(cpu.y(), 0);
        assert_eq!(cpu.s(), 0);
        assert_eq!(cpu.pc(), 0);
        assert_eq!(cpu.p().0, flags::Z);
        let out = cpu.output();
        assert!(out.rw);
        assert!(out.sync);
        assert_eq!(out.addr, 0x0000);
        assert_eq!(out.data, 0x00);
    }

    #[test]
    fn status_display() {
        let cpu = Mos6502::new();
        assert_eq!(format!("{}", cpu.p()), "------Z-");
    }

    #[test]
    fn compare_sets_borrow_flags() {
        let mut cpu = Mos6502::new();
        cpu.compare(0x40, 0x41);
        assert!(cpu.p().test(flags::N));
        assert!(!cpu.p().test(flags::C));
        cpu.compare(0x41, 0x41);
        assert!(cpu.p().test(flags::Z));
        assert!(cpu.p().test(flags::C));
    }

    #[test]
    fn rotate_through_carry() {
        let mut cpu = Mos6502::new();
        cpu.p.0 |= flags::C;
        let r = cpu.do_rol(0x80);
        assert_eq!(r, 0x01);
        assert!(cpu.p().test(flags::C));
        let r = cpu.do_ror(0x01);
        assert_eq!(r, 0x80);
        assert!(cpu.p().test(flags::C));
    }
}
