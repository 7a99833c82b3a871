//! MOS 6522 Versatile Interface Adapter (VIA).
//!
//! The 6522 provides two 8-bit I/O ports with handshake lines, two 16-bit
//! timers and an interrupt controller. This model is cycle-stepped: one
//! [`Via6522::tick`] per clock with typed input and output pin bundles,
//! including the silicon's one-cycle delays on timer reload and on the IRQ
//! output, which are modeled as small shift-register pipelines.
//!
//! # Registers ($0-$F)
//!
//! | Reg | Name | Description                              |
//! |-----|------|------------------------------------------|
//! | $0  | ORB  | Port B data (handshake on access)        |
//! | $1  | ORA  | Port A data (handshake on access)        |
//! | $2  | DDRB | Port B data direction (1 = output)       |
//! | $3  | DDRA | Port A data direction (1 = output)       |
//! | $4  | T1CL | Timer 1 counter low (read clears T1 IRQ) |
//! | $5  | T1CH | Timer 1 counter high (write starts T1)   |
//! | $6  | T1LL | Timer 1 latch low                        |
//! | $7  | T1LH | Timer 1 latch high                       |
//! | $8  | T2CL | Timer 2 counter low (read clears T2 IRQ) |
//! | $9  | T2CH | Timer 2 counter high (write starts T2)   |
//! | $A  | SR   | Shift register (not implemented)         |
//! | $B  | ACR  | Auxiliary control register               |
//! | $C  | PCR  | Peripheral control register              |
//! | $D  | IFR  | Interrupt flag register                  |
//! | $E  | IER  | Interrupt enable register                |
//! | $F  | ORA  | Port A data (no handshake)               |

#![warn(missing_docs)]
#![allow(clippy::cast_possible_truncation)]

/// Input/output register B.
pub const REG_RB: u8 = 0;
/// Input/output register A.
pub const REG_RA: u8 = 1;
/// Data direction register B.
pub const REG_DDRB: u8 = 2;
/// Data direction register A.
pub const REG_DDRA: u8 = 3;
/// T1 low-order latch (write) / counter (read).
pub const REG_T1CL: u8 = 4;
/// T1 high-order counter.
pub const REG_T1CH: u8 = 5;
/// T1 low-order latch.
pub const REG_T1LL: u8 = 6;
/// T1 high-order latch.
pub const REG_T1LH: u8 = 7;
/// T2 low-order latch (write) / counter (read).
pub const REG_T2CL: u8 = 8;
/// T2 high-order counter.
pub const REG_T2CH: u8 = 9;
/// Shift register.
pub const REG_SR: u8 = 10;
/// Auxiliary control register.
pub const REG_ACR: u8 = 11;
/// Peripheral control register.
pub const REG_PCR: u8 = 12;
/// Interrupt flag register.
pub const REG_IFR: u8 = 13;
/// Interrupt enable register.
pub const REG_IER: u8 = 14;
/// Input/output register A, without handshake.
pub const REG_RA_NOHS: u8 = 15;

/// IFR/IER bit: CA2 active edge.
pub const IRQ_CA2: u8 = 1 << 0;
/// IFR/IER bit: CA1 active edge.
pub const IRQ_CA1: u8 = 1 << 1;
/// IFR/IER bit: shift register (never raised, see crate docs).
pub const IRQ_SR: u8 = 1 << 2;
/// IFR/IER bit: CB2 active edge.
pub const IRQ_CB2: u8 = 1 << 3;
/// IFR/IER bit: CB1 active edge.
pub const IRQ_CB1: u8 = 1 << 4;
/// IFR/IER bit: timer 2 underflow.
pub const IRQ_T2: u8 = 1 << 5;
/// IFR/IER bit: timer 1 underflow.
pub const IRQ_T1: u8 = 1 << 6;
/// IFR bit: any enabled interrupt active (read-only).
pub const IRQ_ANY: u8 = 1 << 7;

// Delay-pipeline bit offsets. The low byte of a timer pipeline carries the
// "counter active" delay, the high byte the "force load from latch" delay.
// Position 0 is the output bit; pipelines shift right once per tick.
const PIP_TIMER_COUNT: u16 = 0;
const PIP_TIMER_LOAD: u16 = 8;
const PIP_IRQ: u16 = 0;

fn pip_set(pip: &mut u16, offset: u16, pos: u16) {
    *pip |= 1 << (offset + pos);
}

fn pip_clr(pip: &mut u16, offset: u16, pos: u16) {
    *pip &= !(1 << (offset + pos));
}

fn pip_test(pip: u16, offset: u16, pos: u16) -> bool {
    pip & (1 << (offset + pos)) != 0
}

/// Input pins sampled at every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Via6522Input {
    /// RESET, active low.
    pub reset: bool,
    /// Chip select 1, active high.
    pub cs1: bool,
    /// Chip select 2, active low.
    pub cs2: bool,
    /// R/W line: `true` = read.
    pub rw: bool,
    /// Register select (4 bits, 0..=15).
    pub rs: u8,
    /// Data bus input (write cycles).
    pub data: u8,
    /// Control line CA1 (input only).
    pub ca1: bool,
    /// Control line CA2.
    pub ca2: bool,
    /// Control line CB1.
    pub cb1: bool,
    /// Control line CB2.
    pub cb2: bool,
    /// Port A pins.
    pub pa: u8,
    /// Port B pins.
    pub pb: u8,
}

impl Default for Via6522Input {
    /// Deselected chip with RESET asserted.
    fn default() -> Self {
        Self {
            reset: false,
            cs1: false,
            cs2: true,
            rw: true,
            rs: 0,
            data: 0,
            ca1: false,
            ca2: false,
            cb1: false,
            cb2: false,
            pa: 0,
            pb: 0,
        }
    }
}

/// Output pins valid after every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Via6522Output {
    /// IRQ output, active low.
    pub irq: bool,
    /// Data bus output (read cycles).
    pub data: u8,
    /// Port A driven pins (masked by the data direction register).
    pub pa: u8,
    /// Port A pin directions (1 = output).
    pub pa_dir: u8,
    /// Port B driven pins (masked by the data direction register).
    pub pb: u8,
    /// Port B pin directions (1 = output).
    pub pb_dir: u8,
    /// CA2 level when driven as an output.
    pub ca2: bool,
    /// CA2 direction (`true` = output).
    pub ca2_dir: bool,
    /// CB1 level when driven as an output (shift register only, unused).
    pub cb1: bool,
    /// CB1 direction (`true` = output).
    pub cb1_dir: bool,
    /// CB2 level when driven as an output.
    pub cb2: bool,
    /// CB2 direction (`true` = output).
    pub cb2_dir: bool,
}

impl Default for Via6522Output {
    fn default() -> Self {
        Self {
            irq: true,
            data: 0,
            pa: 0,
            pa_dir: 0,
            pb: 0,
            pb_dir: 0,
            ca2: false,
            ca2_dir: false,
            cb1: false,
            cb1_dir: false,
            cb2: false,
            cb2_dir: false,
        }
    }
}

/// Per-port state (A and B are identical records).
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct Port {
    /// Latched input register.
    inpr: u8,
    /// Current pin snapshot after DDR mixing.
    pins: u8,
    /// Output register.
    outr: u8,
    /// Data direction (1 = output).
    ddr: u8,
    /// Last sampled C1 level.
    c1_in: bool,
    /// C1 matched its programmed edge this tick.
    c1_triggered: bool,
    /// Last sampled C2 level.
    c2_in: bool,
    /// Driven C2 level when configured as output.
    c2_out: bool,
    /// C2 matched its programmed edge this tick.
    c2_triggered: bool,
}

impl Port {
    /// Port state after RESET: all lines inputs, C2 released high.
    fn reset_state() -> Self {
        Self {
            c2_out: true,
            ..Self::default()
        }
    }
}

/// Per-timer state (T1 and T2 share the record; T2's high latch half is
/// not a hardware latch but the field is kept for the counter load).
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct Timer {
    latch: u16,
    counter: u16,
    /// Toggles on underflow in continuous mode; one-shot fired guard
    /// otherwise.
    t_bit: bool,
    /// True for the single cycle of an underflow.
    t_out: bool,
    /// Merged delay pipelines, see `PIP_TIMER_*`.
    pip: u16,
}

#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct Interrupt {
    ier: u8,
    ifr: u8,
    /// One-cycle delay on the IRQ output.
    pip: u16,
}

/// MOS 6522 Versatile Interface Adapter.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Via6522 {
    pa: Port,
    pb: Port,
    t1: Timer,
    t2: Timer,
    intr: Interrupt,
    /// Auxiliary control register.
    acr: u8,
    /// Peripheral control register.
    pcr: u8,
    /// Previous tick's input, for PB6 edge detection.
    last_input: Via6522Input,
    output: Via6522Output,
}

impl Default for Via6522 {
    fn default() -> Self {
        Self::new()
    }
}

impl Via6522 {
    /// Create a VIA in its cold-boot state. Unlike RESET, cold boot also
    /// initializes the timer latches and counters.
    #[must_use]
    pub fn new() -> Self {
        let mut via = Self {
            pa: Port::reset_state(),
            pb: Port::reset_state(),
            t1: Timer::default(),
            t2: Timer::default(),
            intr: Interrupt::default(),
            acr: 0,
            pcr: 0,
            last_input: Via6522Input::default(),
            output: Via6522Output::default(),
        };
        via.t1.latch = 0xFFFF;
        via.t2.latch = 0xFFFF;
        via
    }

    /// Advance the VIA by one clock cycle.
    ///
    /// Call on the rising edge of ϕ2, when the CPU address, R/W and data
    /// lines are valid.
    pub fn tick(&mut self, input: &Via6522Input) -> Via6522Output {
        assert!(
            input.rs <= 0x0F,
            "register select out of range: rs={}",
            input.rs
        );

        if !input.reset {
            self.reset_registers();
            self.output.data = 0;
            self.output.irq = true;
            self.update_output();
            return self.output;
        }

        self.update_internal_state(input);

        if input.cs1 && !input.cs2 {
            if input.rw {
                self.output.data = self.read_register(input.rs);
            } else {
                self.write_register(input.rs, input.data);
            }
        }
        self.update_output();

        self.last_input = *input;
        self.output
    }

    /// Interrupt flag register (diagnostics).
    #[must_use]
    pub fn ifr(&self) -> u8 {
        self.intr.ifr
    }

    /// Interrupt enable register (diagnostics).
    #[must_use]
    pub fn ier(&self) -> u8 {
        self.intr.ier
    }

    /// Timer 1 counter (diagnostics).
    #[must_use]
    pub fn t1_counter(&self) -> u16 {
        self.t1.counter
    }

    /// Timer 2 counter (diagnostics).
    #[must_use]
    pub fn t2_counter(&self) -> u16 {
        self.t2.counter
    }

    /// RESET clears all registers except the timer counters, latches and
    /// underflow toggles, puts both ports in the input state and disables
    /// interrupt generation.
    fn reset_registers(&mut self) {
        log::debug!("via reset");
        self.pa = Port::reset_state();
        self.pb = Port::reset_state();
        self.t1.t_out = false;
        self.t1.pip = 0;
        self.t2.t_out = false;
        self.t2.pip = 0;
        self.intr = Interrupt::default();
        self.acr = 0;
        self.pcr = 0;
    }

    fn update_internal_state(&mut self, input: &Via6522Input) {
        self.read_port_pins(input);
        self.update_cab();
        self.tick_t1();
        self.tick_t2(input);
        self.update_irq();
        self.write_port_pins();
        self.tick_pipeline();
    }

    // --- PCR decoding ---

    fn pcr_ca1_low_to_high(&self) -> bool {
        self.pcr & 0x01 != 0
    }

    fn pcr_ca2_input(&self) -> bool {
        self.pcr & 0x08 == 0
    }

    fn pcr_ca2_low_to_high(&self) -> bool {
        self.pcr & 0x0C == 0x04
    }

    fn pcr_ca2_high_to_low(&self) -> bool {
        self.pcr & 0x0C == 0x00
    }

    fn pcr_ca2_ind_irq(&self) -> bool {
        self.pcr & 0x0A == 0x02
    }

    fn pcr_ca2_auto_hs(&self) -> bool {
        self.pcr & 0x0C == 0x08
    }

    fn pcr_ca2_pulse_output(&self) -> bool {
        self.pcr & 0x0E == 0x0A
    }

    fn pcr_ca2_fix_output(&self) -> bool {
        self.pcr & 0x0C == 0x0C
    }

    fn pcr_ca2_output_level(&self) -> bool {
        self.pcr & 0x02 != 0
    }

    fn pcr_ca2_output(&self) -> bool {
        self.pcr & 0x08 != 0
    }

    fn pcr_cb1_low_to_high(&self) -> bool {
        self.pcr & 0x10 != 0
    }

    fn pcr_cb2_input(&self) -> bool {
        self.pcr & 0x80 == 0
    }

    fn pcr_cb2_low_to_high(&self) -> bool {
        self.pcr & 0xC0 == 0x40
    }

    fn pcr_cb2_high_to_low(&self) -> bool {
        self.pcr & 0xC0 == 0x00
    }

    fn pcr_cb2_ind_irq(&self) -> bool {
        self.pcr & 0xA0 == 0x20
    }

    fn pcr_cb2_auto_hs(&self) -> bool {
        self.pcr & 0xC0 == 0x80
    }

    fn pcr_cb2_fix_output(&self) -> bool {
        self.pcr & 0xC0 == 0xC0
    }

    fn pcr_cb2_output_level(&self) -> bool {
        self.pcr & 0x20 != 0
    }

    fn pcr_cb2_output(&self) -> bool {
        self.pcr & 0x80 != 0
    }

    // --- ACR decoding ---

    fn acr_pa_latch_enable(&self) -> bool {
        self.acr & 0x01 != 0
    }

    fn acr_pb_latch_enable(&self) -> bool {
        self.acr & 0x02 != 0
    }

    fn acr_t1_set_pb7(&self) -> bool {
        self.acr & 0x80 != 0
    }

    fn acr_t1_continuous(&self) -> bool {
        self.acr & 0x40 != 0
    }

    fn acr_t2_count_pb6(&self) -> bool {
        self.acr & 0x20 != 0
    }

    // --- ports ---

    /// Sample the input pins and detect CA1/CA2/CB1/CB2 edges against the
    /// previous samples, each qualified by its PCR edge select.
    fn read_port_pins(&mut self, input: &Via6522Input) {
        let new_ca1 = input.ca1;
        let new_ca2 = input.ca2;
        let new_cb1 = input.cb1;
        let new_cb2 = input.cb2;

        self.pa.c1_triggered = self.pa.c1_in != new_ca1
            && ((new_ca1 && self.pcr_ca1_low_to_high())
                || (!new_ca1 && !self.pcr_ca1_low_to_high()));
        self.pa.c2_triggered = self.pa.c2_in != new_ca2
            && ((new_ca2 && self.pcr_ca2_low_to_high())
                || (!new_ca2 && self.pcr_ca2_high_to_low()));
        self.pb.c1_triggered = self.pb.c1_in != new_cb1
            && ((new_cb1 && self.pcr_cb1_low_to_high())
                || (!new_cb1 && !self.pcr_cb1_low_to_high()));
        self.pb.c2_triggered = self.pb.c2_in != new_cb2
            && ((new_cb2 && self.pcr_cb2_low_to_high())
                || (!new_cb2 && self.pcr_cb2_high_to_low()));

        self.pa.c1_in = new_ca1;
        self.pa.c2_in = new_ca2;
        self.pb.c1_in = new_cb1;
        self.pb.c2_in = new_cb2;

        // With latching enabled the input register only updates on an
        // active C1 edge.
        if self.acr_pa_latch_enable() {
            if self.pa.c1_triggered {
                self.pa.inpr = input.pa;
            }
        } else {
            self.pa.inpr = input.pa;
        }
        if self.acr_pb_latch_enable() {
            if self.pb.c1_triggered {
                self.pb.inpr = input.pb;
            }
        } else {
            self.pb.inpr = input.pb;
        }
    }

    /// Raise control-line interrupt flags and release auto-handshake.
    fn update_cab(&mut self) {
        if self.pa.c1_triggered {
            self.set_intr(IRQ_CA1);
            if self.pcr_ca2_auto_hs() {
                self.pa.c2_out = true;
            }
        }
        if self.pa.c2_triggered && self.pcr_ca2_input() {
            self.set_intr(IRQ_CA2);
        }
        if self.pb.c1_triggered {
            self.set_intr(IRQ_CB1);
            if self.pcr_cb2_auto_hs() {
                self.pb.c2_out = true;
            }
        }
        if self.pb.c2_triggered && self.pcr_cb2_input() {
            self.set_intr(IRQ_CB2);
        }
    }

    fn merge_pb7(&self, data: u8) -> u8 {
        if self.acr_t1_set_pb7() {
            (data & 0x7F) | if self.t1.t_bit { 0x80 } else { 0 }
        } else {
            data
        }
    }

    fn write_port_pins(&mut self) {
        self.pa.pins = (self.pa.inpr & !self.pa.ddr) | (self.pa.outr & self.pa.ddr);
        self.pb.pins =
            self.merge_pb7((self.pb.inpr & !self.pb.ddr) | (self.pb.outr & self.pb.ddr));
    }

    // --- interrupts ---

    fn set_intr(&mut self, bits: u8) {
        self.intr.ifr |= bits;
    }

    /// Clear interrupt flags; when the last enabled flag goes away the ANY
    /// bit is dropped and pending IRQs are drained from the delay pipeline.
    fn clear_intr(&mut self, bits: u8) {
        self.intr.ifr &= !bits;
        if self.intr.ifr & self.intr.ier & 0x7F == 0 {
            self.intr.ifr &= 0x7F;
            self.intr.pip &= !0xFF;
        }
    }

    fn clear_pa_intr(&mut self) {
        let bits = IRQ_CA1 | if self.pcr_ca2_ind_irq() { 0 } else { IRQ_CA2 };
        self.clear_intr(bits);
    }

    fn clear_pb_intr(&mut self) {
        let bits = IRQ_CB1 | if self.pcr_cb2_ind_irq() { 0 } else { IRQ_CB2 };
        self.clear_intr(bits);
    }

    fn write_ier(&mut self, data: u8) {
        if data & 0x80 != 0 {
            self.intr.ier |= data & 0x7F;
        } else {
            self.intr.ier &= !(data & 0x7F);
        }
    }

    fn write_ifr(&mut self, data: u8) {
        let bits = if data & IRQ_ANY != 0 { 0x7F } else { data };
        self.clear_intr(bits);
    }

    fn update_irq(&mut self) {
        // The ANY bit lags an enabled flag by one cycle.
        if pip_test(self.intr.pip, PIP_IRQ, 0) {
            self.intr.ifr |= IRQ_ANY;
        }
        self.output.irq = self.intr.ifr & IRQ_ANY == 0;
    }

    // --- timers ---
    //
    // T1 reloads from its latch on every underflow, one cycle later via
    // the load pipeline, in both one-shot and continuous mode. T2 never
    // reloads on underflow.

    fn tick_t1(&mut self) {
        if pip_test(self.t1.pip, PIP_TIMER_COUNT, 0) {
            self.t1.counter = self.t1.counter.wrapping_sub(1);
        }

        self.t1.t_out = self.t1.counter == 0xFFFF;
        if self.t1.t_out {
            if self.acr_t1_continuous() {
                self.t1.t_bit = !self.t1.t_bit;
                self.set_intr(IRQ_T1);
            } else if !self.t1.t_bit {
                self.set_intr(IRQ_T1);
                self.t1.t_bit = true;
            }
            log::trace!("t1 underflow");
            pip_set(&mut self.t1.pip, PIP_TIMER_LOAD, 1);
        }

        if pip_test(self.t1.pip, PIP_TIMER_LOAD, 0) {
            self.t1.counter = self.t1.latch;
        }
    }

    fn tick_t2(&mut self, input: &Via6522Input) {
        if self.acr_t2_count_pb6() {
            // Count high-to-low transitions of PB6.
            if input.pb & 0x40 == 0 && self.last_input.pb & 0x40 != 0 {
                self.t2.counter = self.t2.counter.wrapping_sub(1);
            }
        } else if pip_test(self.t2.pip, PIP_TIMER_COUNT, 0) {
            self.t2.counter = self.t2.counter.wrapping_sub(1);
        }

        self.t2.t_out = self.t2.counter == 0xFFFF;
        if self.t2.t_out && !self.t2.t_bit {
            log::trace!("t2 underflow");
            self.set_intr(IRQ_T2);
            self.t2.t_bit = true;
        }
    }

    fn tick_pipeline(&mut self) {
        // Both counters always feed the count pipeline.
        pip_set(&mut self.t1.pip, PIP_TIMER_COUNT, 2);
        pip_set(&mut self.t2.pip, PIP_TIMER_COUNT, 2);

        if self.intr.ifr & self.intr.ier & 0x7F != 0 {
            pip_set(&mut self.intr.pip, PIP_IRQ, 1);
        }

        self.t1.pip = (self.t1.pip >> 1) & 0x7F7F;
        self.t2.pip = (self.t2.pip >> 1) & 0x7F7F;
        self.intr.pip = (self.intr.pip >> 1) & 0x7F7F;
    }

    // --- register file ---

    fn read_register(&mut self, addr: u8) -> u8 {
        match addr {
            REG_RB => {
                let data = if self.acr_pb_latch_enable() {
                    self.pb.inpr
                } else {
                    self.pb.pins
                };
                self.clear_pb_intr();
                data
            }
            REG_RA => {
                let data = if self.acr_pa_latch_enable() {
                    self.pa.inpr
                } else {
                    self.pa.pins
                };
                self.clear_pa_intr();
                if self.pcr_ca2_pulse_output() || self.pcr_ca2_auto_hs() {
                    self.pa.c2_out = false;
                }
                data
            }
            REG_DDRB => self.pb.ddr,
            REG_DDRA => self.pa.ddr,
            REG_T1CL => {
                self.clear_intr(IRQ_T1);
                self.t1.counter as u8
            }
            REG_T1CH => (self.t1.counter >> 8) as u8,
            REG_T1LL => self.t1.latch as u8,
            REG_T1LH => (self.t1.latch >> 8) as u8,
            REG_T2CL => {
                self.clear_intr(IRQ_T2);
                self.t2.counter as u8
            }
            REG_T2CH => (self.t2.counter >> 8) as u8,
            // The shift register is not implemented.
            REG_SR => 0,
            REG_ACR => self.acr,
            REG_PCR => self.pcr,
            REG_IFR => self.intr.ifr,
            REG_IER => self.intr.ier | 0x80,
            REG_RA_NOHS => {
                if self.acr_pa_latch_enable() {
                    self.pa.inpr
                } else {
                    self.pa.pins
                }
            }
            _ => unreachable!("register select {addr} out of range"),
        }
    }

    fn write_register(&mut self, addr: u8, data: u8) {
        match addr {
            REG_RB => {
                self.pb.outr = data;
                self.clear_pb_intr();
                if self.pcr_cb2_auto_hs() {
                    self.pb.c2_out = false;
                }
            }
            REG_RA => {
                self.pa.outr = data;
                self.clear_pa_intr();
                if self.pcr_ca2_pulse_output() || self.pcr_ca2_auto_hs() {
                    self.pa.c2_out = false;
                }
            }
            REG_DDRB => self.pb.ddr = data,
            REG_DDRA => self.pa.ddr = data,
            REG_T1CL | REG_T1LL => {
                self.t1.latch = (self.t1.latch & 0xFF00) | u16::from(data);
            }
            REG_T1CH => {
                // Starting T1 loads the counter right away, clears the
                // underflow toggle and acknowledges a pending T1 IRQ.
                self.t1.latch = (u16::from(data) << 8) | (self.t1.latch & 0x00FF);
                self.clear_intr(IRQ_T1);
                self.t1.t_bit = false;
                self.t1.counter = self.t1.latch;
            }
            REG_T1LH => {
                self.t1.latch = (u16::from(data) << 8) | (self.t1.latch & 0x00FF);
                self.clear_intr(IRQ_T1);
            }
            REG_T2CL => {
                self.t2.latch = (self.t2.latch & 0xFF00) | u16::from(data);
            }
            REG_T2CH => {
                self.t2.latch = (u16::from(data) << 8) | (self.t2.latch & 0x00FF);
                self.clear_intr(IRQ_T2);
                self.t2.t_bit = false;
                self.t2.counter = self.t2.latch;
            }
            // The shift register is not implemented.
            REG_SR => {}
            REG_ACR => {
                self.acr = data;
                // Leaving PB6 counting mode must not leave a stale count
                // enable in the pipeline.
                if !self.acr_t2_count_pb6() {
                    pip_clr(&mut self.t2.pip, PIP_TIMER_COUNT, 0);
                }
            }
            REG_PCR => {
                self.pcr = data;
                if self.pcr_ca2_fix_output() {
                    self.pa.c2_out = self.pcr_ca2_output_level();
                }
                if self.pcr_cb2_fix_output() {
                    self.pb.c2_out = self.pcr_cb2_output_level();
                }
            }
            REG_IFR => self.write_ifr(data),
            REG_IER => self.write_ier(data),
            REG_RA_NOHS => self.pa.outr = data,
            _ => unreachable!("register select {addr} out of range"),
        }
    }

    fn update_output(&mut self) {
        // Refresh the pin mix so a register write in this tick is visible.
        self.write_port_pins();

        self.output.pa = self.pa.pins & self.pa.ddr;
        self.output.pa_dir = self.pa.ddr;
        self.output.pb = self.pb.pins & self.pb.ddr;
        self.output.pb_dir = self.pb.ddr;

        self.output.ca2 = self.pa.c2_out;
        self.output.ca2_dir = self.pcr_ca2_output();
        self.output.cb2 = self.pb.c2_out;
        self.output.cb2_dir = self.pcr_cb2_output();
    }
}
