//! MOS 6520 Peripheral Interface Adapter (PIA).
//!
//! Two 8-bit I/O ports, each with a pair of control lines (CA1/CA2,
//! CB1/CB2) for interrupt inputs and read/write strobes. The model is
//! cycle-stepped with typed pin bundles; register accesses happen while ϕ2
//! is high, strobe edges are evaluated on ϕ2-low ticks, so the host must
//! drive the `phi2` input alongside the bus.
//!
//! # Registers (RS1/RS0)
//!
//! | Reg | Name    | Description                                   |
//! |-----|---------|-----------------------------------------------|
//! | 0   | RA      | Port A data (ORA or DDRA via CRA bit 2)       |
//! | 1   | CRA     | Control register A                            |
//! | 2   | RB      | Port B data (ORB or DDRB via CRB bit 2)       |
//! | 3   | CRB     | Control register B                            |
//!
//! Control register layout (CRA and CRB are identical):
//!
//! | Bit | Function                                              |
//! |-----|-------------------------------------------------------|
//! | 0   | IRQ1 enable                                           |
//! | 1   | IRQ1 edge select (0 = falling, 1 = rising)            |
//! | 2   | OR/DDR select (0 = DDR, 1 = OR)                       |
//! | 3   | IRQ2 enable / C2 strobe restore / C2 manual level     |
//! | 4   | IRQ2 edge select / C2 output control                  |
//! | 5   | C2 direction (0 = input, 1 = output)                  |
//! | 6   | IRQ2 flag (read-only, cleared by OR access)           |
//! | 7   | IRQ1 flag (read-only, cleared by OR access)           |

#![warn(missing_docs)]

/// Port A data register (ORA or DDRA).
pub const REG_RA: u8 = 0;
/// Control register A.
pub const REG_CRA: u8 = 1;
/// Port B data register (ORB or DDRB).
pub const REG_RB: u8 = 2;
/// Control register B.
pub const REG_CRB: u8 = 3;

/// IRQ1 enable.
pub const CR_IRQ1_ENABLE: u8 = 1 << 0;
/// IRQ1 edge select: 0 = falling, 1 = rising.
pub const CR_IRQ1_TRANSITION: u8 = 1 << 1;
/// Data register select: 0 = DDR, 1 = OR.
pub const CR_OR_SELECT: u8 = 1 << 2;
/// IRQ2 enable (C2 as input only).
pub const CR_IRQ2_ENABLE: u8 = 1 << 3;
/// IRQ2 edge select: 0 = falling, 1 = rising (C2 as input only).
pub const CR_IRQ2_TRANSITION: u8 = 1 << 4;
/// C2 strobe restore select (C2 as automatic output): 0 = restore on the
/// next active C1 transition, 1 = restore on the next ϕ2 low.
pub const CR_C2_RESTORE: u8 = 1 << 3;
/// C2 output control: 0 = automatic strobe, 1 = manual level from bit 3.
pub const CR_C2_OUTPUT_CONTROL: u8 = 1 << 4;
/// C2 direction: 0 = input, 1 = output.
pub const CR_C2_MODE: u8 = 1 << 5;
/// IRQ2 flag (read-only).
pub const CR_IRQ2_FLAG: u8 = 1 << 6;
/// IRQ1 flag (read-only).
pub const CR_IRQ1_FLAG: u8 = 1 << 7;

/// Input pins sampled at every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pia6520Input {
    /// RESET, active low.
    pub reset: bool,
    /// Chip select 0, active high.
    pub cs0: bool,
    /// Chip select 1, active high.
    pub cs1: bool,
    /// Chip select 2, active low.
    pub cs2: bool,
    /// ϕ2 clock level. Register accesses happen while high.
    pub phi2: bool,
    /// R/W line: `true` = read.
    pub rw: bool,
    /// Register select (2 bits, 0..=3).
    pub rs: u8,
    /// Data bus input (write cycles).
    pub data: u8,
    /// Control line CA1 (input only).
    pub ca1: bool,
    /// Control line CA2.
    pub ca2: bool,
    /// Control line CB1 (input only).
    pub cb1: bool,
    /// Control line CB2.
    pub cb2: bool,
    /// Port A pins.
    pub pa: u8,
    /// Port B pins.
    pub pb: u8,
}

impl Default for Pia6520Input {
    /// Deselected chip with RESET asserted.
    fn default() -> Self {
        Self {
            reset: false,
            cs0: true,
            cs1: false,
            cs2: true,
            phi2: false,
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
pub struct Pia6520Output {
    /// Port A interrupt request, active low.
    pub irqa: bool,
    /// Port B interrupt request, active low.
    pub irqb: bool,
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
    /// CB2 level when driven as an output.
    pub cb2: bool,
    /// CB2 direction (`true` = output).
    pub cb2_dir: bool,
}

impl Default for Pia6520Output {
    fn default() -> Self {
        Self {
            irqa: true,
            irqb: true,
            data: 0,
            pa: 0,
            pa_dir: 0,
            pb: 0,
            pb_dir: 0,
            ca2: false,
            ca2_dir: false,
            cb2: false,
            cb2_dir: false,
        }
    }
}

/// Per-port state; A and B differ only in which register access fires the
/// C2 strobe (ORA read vs ORB write).
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct Port {
    /// Input register (pin sample).
    inpr: u8,
    /// Pin snapshot after DDR mixing.
    pins: u8,
    /// Output register.
    outr: u8,
    /// Data direction (1 = output).
    ddr: u8,
    /// Last sampled C1 level.
    c1_in: bool,
    /// Last sampled C2 level.
    c2_in: bool,
    /// Driven C2 level when configured as output.
    c2_out: bool,
    /// Strobe requested: C2 drops on the next ϕ2-low tick.
    c2_strobe_pending: bool,
    /// Strobe active: C2 is low awaiting its restore condition.
    c2_restore_pending: bool,
    /// Restore armed on the next active C1 transition (CR bit 3 = 0).
    c2_restore_on_c1: bool,
}

impl Port {
    fn reset_state() -> Self {
        Self {
            c2_out: true,
            ..Self::default()
        }
    }
}

/// MOS 6520 Peripheral Interface Adapter.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pia6520 {
    pa: Port,
    pb: Port,
    /// Control register A.
    cra: u8,
    /// Control register B.
    crb: u8,
    output: Pia6520Output,
}

impl Default for Pia6520 {
    fn default() -> Self {
        Self::new()
    }
}

fn irq1_rising(cr: u8) -> bool {
    cr & CR_IRQ1_TRANSITION != 0
}

fn irq2_rising(cr: u8) -> bool {
    cr & CR_IRQ2_TRANSITION != 0
}

fn c2_is_output(cr: u8) -> bool {
    cr & CR_C2_MODE != 0
}

fn c2_manual(cr: u8) -> bool {
    cr & CR_C2_OUTPUT_CONTROL != 0
}

impl Pia6520 {
    /// Create a PIA in its reset state: ports as inputs, control registers
    /// clear, interrupt outputs released.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pa: Port::reset_state(),
            pb: Port::reset_state(),
            cra: 0,
            crb: 0,
            output: Pia6520Output::default(),
        }
    }

    /// Advance the PIA by one clock edge.
    ///
    /// Call on both edges of ϕ2 with the `phi2` input reflecting the new
    /// clock level: register accesses are honored on ϕ2-high ticks, strobe
    /// transitions on ϕ2-low ticks.
    pub fn tick(&mut self, input: &Pia6520Input) -> Pia6520Output {
        assert!(
            input.rs <= 0x03,
            "register select out of range: rs={}",
            input.rs
        );

        if !input.reset {
            self.reset_registers();
            self.output.data = 0;
            self.update_output();
            return self.output;
        }

        self.read_port_pins(input);
        self.detect_control_transitions(input);

        if input.phi2 && input.cs0 && input.cs1 && !input.cs2 {
            if input.rw {
                self.output.data = self.read_register(input.rs);
            } else {
                self.write_register(input.rs, input.data);
            }
        }

        self.handle_strobes(input);
        self.update_output();
        self.output
    }

    /// Control register A (diagnostics).
    #[must_use]
    pub fn cra(&self) -> u8 {
        self.cra
    }

    /// Control register B (diagnostics).
    #[must_use]
    pub fn crb(&self) -> u8 {
        self.crb
    }

    fn reset_registers(&mut self) {
        log::debug!("pia reset");
        self.pa = Port::reset_state();
        self.pb = Port::reset_state();
        self.cra = 0;
        self.crb = 0;
    }

    fn read_port_pins(&mut self, input: &Pia6520Input) {
        self.pa.inpr = input.pa;
        self.pb.inpr = input.pb;
        self.pa.pins = (self.pa.inpr & !self.pa.ddr) | (self.pa.outr & self.pa.ddr);
        self.pb.pins = (self.pb.inpr & !self.pb.ddr) | (self.pb.outr & self.pb.ddr);
    }

    /// Detect CA1/CA2/CB1/CB2 transitions, raise the IRQ flags selected by
    /// the control registers and release C1-armed strobes.
    fn detect_control_transitions(&mut self, input: &Pia6520Input) {
        let ca1_active = Self::c1_transition(&mut self.pa, input.ca1, self.cra);
        if ca1_active {
            self.cra |= CR_IRQ1_FLAG;
        }
        Self::c2_transition(&mut self.pa, input.ca2, &mut self.cra);

        let cb1_active = Self::c1_transition(&mut self.pb, input.cb1, self.crb);
        if cb1_active {
            self.crb |= CR_IRQ1_FLAG;
        }
        Self::c2_transition(&mut self.pb, input.cb2, &mut self.crb);

        // An active C1 transition restores a strobe armed on it.
        if ca1_active && self.pa.c2_restore_on_c1 {
            self.pa.c2_out = true;
            self.pa.c2_restore_on_c1 = false;
        }
        if cb1_active && self.pb.c2_restore_on_c1 {
            self.pb.c2_out = true;
            self.pb.c2_restore_on_c1 = false;
        }
    }

    /// Sample C1 and report whether it made the transition selected by the
    /// control register's IRQ1 edge bit.
    fn c1_transition(port: &mut Port, new_level: bool, cr: u8) -> bool {
        let changed = port.c1_in != new_level;
        port.c1_in = new_level;
        changed && new_level == irq1_rising(cr)
    }

    /// Sample C2 and raise the IRQ2 flag on its selected transition. C2
    /// configured as an output never drives IRQ2.
    fn c2_transition(port: &mut Port, new_level: bool, cr: &mut u8) {
        let changed = port.c2_in != new_level;
        port.c2_in = new_level;
        if changed && !c2_is_output(*cr) && new_level == irq2_rising(*cr) {
            *cr |= CR_IRQ2_FLAG;
        }
    }

    /// Drive the automatic C2 strobes. Runs after the register access of
    /// the tick so a read/write in this cycle arms the strobe for the next
    /// ϕ2-low tick.
    fn handle_strobes(&mut self, input: &Pia6520Input) {
        Self::port_strobe(&mut self.pa, self.cra, input.phi2);
        Self::port_strobe(&mut self.pb, self.crb, input.phi2);
    }

    fn port_strobe(port: &mut Port, cr: u8, phi2: bool) {
        if !c2_is_output(cr) || c2_manual(cr) {
            return;
        }
        if !phi2 && port.c2_strobe_pending {
            // C2 drops on the first ϕ2-low tick after the register access.
            port.c2_out = false;
            port.c2_strobe_pending = false;
            port.c2_restore_pending = true;
        } else if cr & CR_C2_RESTORE != 0 {
            // Restore on the next ϕ2-low tick.
            if !phi2 && port.c2_restore_pending {
                port.c2_out = true;
                port.c2_restore_pending = false;
            }
        } else if port.c2_restore_pending {
            // Restore on the next active C1 transition.
            port.c2_restore_on_c1 = true;
            port.c2_restore_pending = false;
        }
    }

    fn read_register(&mut self, addr: u8) -> u8 {
        match addr {
            REG_RA => {
                if self.cra & CR_OR_SELECT == 0 {
                    self.pa.ddr
                } else {
                    self.cra &= !(CR_IRQ1_FLAG | CR_IRQ2_FLAG);
                    self.pa.c2_strobe_pending = true;
                    self.pa.pins
                }
            }
            REG_RB => {
                if self.crb & CR_OR_SELECT == 0 {
                    self.pb.ddr
                } else {
                    self.crb &= !(CR_IRQ1_FLAG | CR_IRQ2_FLAG);
                    self.pb.pins
                }
            }
            REG_CRA => self.cra,
            REG_CRB => self.crb,
            _ => unreachable!("register select {addr} out of range"),
        }
    }

    fn write_register(&mut self, addr: u8, data: u8) {
        match addr {
            REG_RA => {
                if self.cra & CR_OR_SELECT == 0 {
                    self.pa.ddr = data;
                } else {
                    self.pa.outr = data;
                }
            }
            REG_RB => {
                if self.crb & CR_OR_SELECT == 0 {
                    self.pb.ddr = data;
                } else {
                    self.pb.outr = data;
                    self.pb.c2_strobe_pending = true;
                }
            }
            REG_CRA => {
                // The flag bits are read-only.
                self.cra = (self.cra & (CR_IRQ1_FLAG | CR_IRQ2_FLAG)) | (data & 0x3F);
                if c2_is_output(data) && c2_manual(data) {
                    self.pa.c2_out = data & CR_C2_RESTORE != 0;
                }
            }
            REG_CRB => {
                self.crb = (self.crb & (CR_IRQ1_FLAG | CR_IRQ2_FLAG)) | (data & 0x3F);
                if c2_is_output(data) && c2_manual(data) {
                    self.pb.c2_out = data & CR_C2_RESTORE != 0;
                }
            }
            _ => unreachable!("register select {addr} out of range"),
        }
    }

    fn update_output(&mut self) {
        self.output.pa = self.pa.pins & self.pa.ddr;
        self.output.pa_dir = self.pa.ddr;
        self.output.pb = self.pb.pins & self.pb.ddr;
        self.output.pb_dir = self.pb.ddr;

        self.output.ca2 = self.pa.c2_out;
        self.output.ca2_dir = c2_is_output(self.cra);
        self.output.cb2 = self.pb.c2_out;
        self.output.cb2_dir = c2_is_output(self.crb);

        self.output.irqa = !Self::irq_asserted(self.cra);
        self.output.irqb = !Self::irq_asserted(self.crb);
    }

    /// The interrupt output is asserted while an enabled flag is set.
    fn irq_asserted(cr: u8) -> bool {
        (cr & CR_IRQ1_ENABLE != 0 && cr & CR_IRQ1_FLAG != 0)
            || (cr & CR_IRQ2_ENABLE != 0 && !c2_is_output(cr) && cr & CR_IRQ2_FLAG != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Harness {
        pia: Pia6520,
        input: Pia6520Input,
        output: Pia6520Output,
    }

    impl Harness {
        fn new() -> Self {
            let mut h = Self {
                pia: Pia6520::new(),
                input: Pia6520Input::default(),
                output: Pia6520Output::default(),
            };
            h.output = h.pia.tick(&h.input); // one reset edge
            h.input.reset = true;
            h
        }

        /// One tick with the given ϕ2 level.
        fn tick_phi(&mut self, phi2: bool) -> Pia6520Output {
            self.input.phi2 = phi2;
            self.output = self.pia.tick(&self.input);
            self.output
        }

        /// A full clock: ϕ2 high then low.
        fn cycle(&mut self) {
            self.tick_phi(true);
            self.tick_phi(false);
        }

        fn write(&mut self, reg: u8, value: u8) {
            self.input.cs1 = true;
            self.input.cs2 = false;
            self.input.rw = false;
            self.input.rs = reg;
            self.input.data = value;
            self.tick_phi(true);
            self.deselect();
        }

        fn read(&mut self, reg: u8) -> u8 {
            self.input.cs1 = true;
            self.input.cs2 = false;
            self.input.rw = true;
            self.input.rs = reg;
            self.tick_phi(true);
            self.deselect();
            self.output.data
        }

        fn deselect(&mut self) {
            self.input.cs1 = false;
            self.input.cs2 = true;
            self.input.rw = true;
        }
    }

    #[test]
    fn cr_bit2_selects_ddr_or_port() {
        let mut h = Harness::new();

        // CRA bit 2 clear: RA addresses the DDR.
        h.write(REG_RA, 0x0F);
        assert_eq!(h.output.pa_dir, 0x0F);
        assert_eq!(h.read(REG_RA), 0x0F);

        // Select the output register and write the port.
        h.write(REG_CRA, CR_OR_SELECT);
        h.write(REG_RA, 0xA5);
        assert_eq!(h.output.pa, 0x05);
        assert_eq!(h.output.pa_dir, 0x0F);
    }

    #[test]
    fn port_read_mixes_inputs_and_outputs() {
        let mut h = Harness::new();
        h.write(REG_RB, 0x0F); // DDRB
        h.write(REG_CRB, CR_OR_SELECT);
        h.write(REG_RB, 0xAB); // ORB
        h.input.pb = 0xC5;
        assert_eq!(h.read(REG_RB), 0xCB);
    }

    #[test]
    fn ca1_falling_edge_asserts_irqa() {
        let mut h = Harness::new();
        // OR select, IRQ1 enabled, falling edge.
        h.write(REG_CRA, CR_OR_SELECT | CR_IRQ1_ENABLE);

        h.input.ca1 = true;
        h.cycle();
        assert!(h.output.irqa, "rising edge must not trigger");

        h.input.ca1 = false;
        h.tick_phi(true);
        assert!(!h.output.irqa, "falling edge must assert IRQA");
        assert_ne!(h.pia.cra() & CR_IRQ1_FLAG, 0);

        // Reading the port clears the flags and releases the line.
        h.read(REG_RA);
        assert!(h.output.irqa);
        assert_eq!(h.pia.cra() & CR_IRQ1_FLAG, 0);
    }

    #[test]
    fn ca1_rising_edge_select() {
        let mut h = Harness::new();
        h.write(REG_CRA, CR_OR_SELECT | CR_IRQ1_ENABLE | CR_IRQ1_TRANSITION);

        h.input.ca1 = true;
        h.tick_phi(true);
        assert!(!h.output.irqa);

        // The stale flag survives further inactive edges.
        h.read(REG_RA);
        h.input.ca1 = false;
        h.cycle();
        assert!(h.output.irqa);
    }

    #[test]
    fn irq_flag_without_enable_stays_masked() {
        let mut h = Harness::new();
        h.write(REG_CRA, CR_OR_SELECT); // IRQ1 disabled
        h.input.ca1 = true;
        h.cycle();
        h.input.ca1 = false;
        h.cycle();
        assert_ne!(h.pia.cra() & CR_IRQ1_FLAG, 0, "flag is set regardless");
        assert!(h.output.irqa, "but the line stays released");

        // Enabling afterwards asserts the line immediately.
        h.write(REG_CRA, CR_OR_SELECT | CR_IRQ1_ENABLE);
        h.tick_phi(false);
        assert!(!h.output.irqa);
    }

    #[test]
    fn cr_write_does_not_clear_flags() {
        let mut h = Harness::new();
        h.write(REG_CRA, CR_OR_SELECT | CR_IRQ1_ENABLE);
        h.input.ca1 = true;
        h.cycle();
        h.input.ca1 = false;
        h.cycle();
        assert!(!h.output.irqa);

        // Writing CRA (even all-ones) must leave the flag bits alone.
        h.write(REG_CRA, 0xFF & !CR_C2_MODE);
        assert_ne!(h.pia.cra() & CR_IRQ1_FLAG, 0);
        assert!(!h.output.irqa);

        // Only an OR read clears.
        h.read(REG_RA);
        assert!(h.output.irqa);
    }

    #[test]
    fn ca2_input_edge_sets_irq2() {
        let mut h = Harness::new();
        // C2 input, falling edge, IRQ2 enabled.
        h.write(REG_CRA, CR_OR_SELECT | CR_IRQ2_ENABLE);

        h.input.ca2 = true;
        h.cycle();
        assert!(h.output.irqa);
        h.input.ca2 = false;
        h.tick_phi(true);
        assert!(!h.output.irqa);
        assert_ne!(h.pia.cra() & CR_IRQ2_FLAG, 0);

        h.read(REG_RA);
        assert!(h.output.irqa);
    }

    #[test]
    fn ca2_as_output_does_not_interrupt() {
        let mut h = Harness::new();
        h.write(
            REG_CRA,
            CR_OR_SELECT | CR_IRQ2_ENABLE | CR_C2_MODE | CR_C2_OUTPUT_CONTROL,
        );
        h.input.ca2 = true;
        h.cycle();
        h.input.ca2 = false;
        h.cycle();
        assert_eq!(h.pia.cra() & CR_IRQ2_FLAG, 0);
        assert!(h.output.irqa);
    }

    #[test]
    fn manual_c2_output_follows_bit3() {
        let mut h = Harness::new();
        h.write(REG_CRB, CR_C2_MODE | CR_C2_OUTPUT_CONTROL);
        assert!(h.output.cb2_dir);
        assert!(!h.output.cb2, "bit 3 clear drives CB2 low");

        h.write(REG_CRB, CR_C2_MODE | CR_C2_OUTPUT_CONTROL | CR_C2_RESTORE);
        assert!(h.output.cb2, "bit 3 set drives CB2 high");
    }

    #[test]
    fn read_strobe_with_phi2_restore() {
        let mut h = Harness::new();
        // CA2 automatic output, restore on ϕ2.
        h.write(REG_CRA, CR_OR_SELECT | CR_C2_MODE | CR_C2_RESTORE);
        h.tick_phi(false);
        assert!(h.output.ca2);

        h.read(REG_RA);
        assert!(h.output.ca2, "strobe waits for the ϕ2-low tick");
        h.tick_phi(false);
        assert!(!h.output.ca2, "CA2 drops after the read");
        h.tick_phi(true);
        assert!(!h.output.ca2);
        h.tick_phi(false);
        assert!(h.output.ca2, "CA2 restores on the next ϕ2 low");
    }

    #[test]
    fn read_strobe_with_ca1_restore() {
        let mut h = Harness::new();
        // CA2 automatic output, restore on the active CA1 transition
        // (falling, per CR bit 1 = 0).
        h.write(REG_CRA, CR_OR_SELECT | CR_C2_MODE);
        h.read(REG_RA);
        h.tick_phi(false);
        assert!(!h.output.ca2);

        // ϕ2 alone does not restore in this mode.
        h.cycle();
        h.cycle();
        assert!(!h.output.ca2);

        h.input.ca1 = true;
        h.cycle();
        assert!(!h.output.ca2, "inactive CA1 edge must not restore");
        h.input.ca1 = false;
        h.tick_phi(true);
        assert!(h.output.ca2, "active CA1 edge restores the strobe");
    }

    #[test]
    fn write_strobe_on_orb() {
        let mut h = Harness::new();
        h.write(REG_CRB, CR_OR_SELECT | CR_C2_MODE | CR_C2_RESTORE);
        h.tick_phi(false);
        assert!(h.output.cb2);

        // A read of ORB does not strobe CB2; only a write does.
        h.read(REG_RB);
        h.tick_phi(false);
        assert!(h.output.cb2);

        h.write(REG_RB, 0x42);
        h.tick_phi(false);
        assert!(!h.output.cb2);
        h.tick_phi(true);
        h.tick_phi(false);
        assert!(h.output.cb2);
    }

    #[test]
    fn access_requires_phi2_high_and_selects() {
        let mut h = Harness::new();
        // ϕ2 low: the write must be ignored.
        h.input.cs1 = true;
        h.input.cs2 = false;
        h.input.rw = false;
        h.input.rs = REG_RA;
        h.input.data = 0xFF;
        h.tick_phi(false);
        h.deselect();
        assert_eq!(h.output.pa_dir, 0x00);

        // Deselected chip: also ignored.
        h.input.rw = false;
        h.input.rs = REG_RA;
        h.input.data = 0xFF;
        h.tick_phi(true);
        h.input.rw = true;
        assert_eq!(h.output.pa_dir, 0x00);
    }

    #[test]
    fn reset_clears_everything() {
        let mut h = Harness::new();
        h.write(REG_RA, 0xFF); // DDRA
        h.write(REG_CRA, CR_OR_SELECT | CR_IRQ1_ENABLE);
        h.input.ca1 = true;
        h.cycle();
        h.input.ca1 = false;
        h.cycle();
        assert!(!h.output.irqa);

        h.input.reset = false;
        let out = h.tick_phi(false);
        h.input.reset = true;

        assert_eq!(out.pa_dir, 0x00);
        assert!(out.irqa);
        assert_eq!(h.pia.cra(), 0);
    }
}
