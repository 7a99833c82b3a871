//! Shared test harness: a CPU wired to 64K of RAM.

#![allow(dead_code)]

use mos_6502::{Cpu6502Input, Cpu6502Output, Mos6502};

/// A 6502 with a flat 64K RAM serving every bus cycle.
pub struct System {
    pub cpu: Mos6502,
    pub ram: Vec<u8>,
    pub input: Cpu6502Input,
    pub out: Cpu6502Output,
}

impl System {
    /// Build a system with the given program loaded and the reset vector
    /// pointing at it, then run the reset sequence up to the first opcode
    /// fetch.
    pub fn power_on_at(start: u16, program: &[u8]) -> Self {
        let mut sys = Self {
            cpu: Mos6502::new(),
            ram: vec![0; 0x10000],
            input: Cpu6502Input::default(),
            out: Cpu6502Output::default(),
        };
        sys.ram[0xFFFC] = start as u8;
        sys.ram[0xFFFD] = (start >> 8) as u8;
        sys.ram[start as usize..start as usize + program.len()].copy_from_slice(program);
        sys.run_reset();
        sys
    }

    /// Advance one clock cycle and serve the resulting bus transaction.
    pub fn tick(&mut self) -> Cpu6502Output {
        self.out = self.cpu.tick(&self.input);
        if self.out.rw {
            self.input.data = self.ram[self.out.addr as usize];
        } else {
            self.ram[self.out.addr as usize] = self.out.data;
        }
        self.out
    }

    /// Hold RESET low for a couple of cycles, release it and run until the
    /// first opcode fetch of the reset target.
    pub fn run_reset(&mut self) {
        self.input.reset = false;
        self.tick();
        self.input.reset = true;
        for _ in 0..16 {
            if self.tick().sync {
                return;
            }
        }
        panic!("reset sequence did not reach an opcode fetch");
    }

    /// Execute one full instruction; returns its cycle count.
    ///
    /// Must be called on an instruction boundary (SYNC asserted).
    pub fn step_instruction(&mut self) -> u32 {
        assert!(self.out.sync, "not at an instruction boundary");
        let mut cycles = 0;
        loop {
            self.tick();
            cycles += 1;
            if self.out.sync {
                return cycles;
            }
        }
    }

    /// Tick until the given address appears on the bus; returns the number
    /// of ticks taken. Panics after `limit` ticks.
    pub fn run_until_addr(&mut self, addr: u16, limit: u32) -> u32 {
        for n in 1..=limit {
            self.tick();
            if self.out.addr == addr {
                return n;
            }
        }
        panic!("address {addr:04X} not seen within {limit} ticks");
    }
}
