//! RESET/NMI/IRQ arbitration, the RDY line and the JAM halt state.

mod common;

use common::System;

/// Count reads of the given vector byte over `ticks` cycles.
fn count_vector_reads(sys: &mut System, vector: u16, ticks: u32) -> u32 {
    let mut n = 0;
    for _ in 0..ticks {
        sys.tick();
        if sys.out.rw && sys.out.addr == vector {
            n += 1;
        }
    }
    n
}

#[test]
fn reset_fetches_from_reset_vector() {
    let mut sys = System::power_on_at(0x0400, &[0xEA, 0xEA, 0xEA, 0xEA]);
    sys.step_instruction();

    // Pull RESET low mid-program for a while, then release it.
    sys.input.reset = false;
    for _ in 0..8 {
        sys.tick();
    }
    sys.input.reset = true;
    for _ in 0..16 {
        if sys.tick().sync {
            break;
        }
    }
    assert!(sys.out.sync);
    assert_eq!(sys.out.addr, 0x0400, "SYNC address must come from $FFFC/D");
}

#[test]
fn reset_never_writes() {
    let mut sys = System::power_on_at(0x0400, &[0xEA]);
    sys.input.reset = false;
    for _ in 0..20 {
        assert!(sys.tick().rw, "write cycle during reset");
    }
}

#[test]
fn irq_is_masked_by_i_flag() {
    // I is set by the reset sequence and the program never clears it.
    let mut sys = System::power_on_at(0x0400, &[0xEA, 0x4C, 0x01, 0x04]); // NOP; JMP loop
    sys.input.irq = false;
    assert_eq!(count_vector_reads(&mut sys, 0xFFFE, 200), 0);
}

#[test]
fn irq_serviced_after_cli() {
    // CLI; NOP; JMP loop. Handler: RTI.
    let mut sys = System::power_on_at(0x0400, &[0x58, 0xEA, 0x4C, 0x01, 0x04]);
    sys.ram[0xFFFE] = 0x00;
    sys.ram[0xFFFF] = 0x05;
    sys.ram[0x0500] = 0x40; // RTI
    sys.input.irq = false;
    sys.run_until_addr(0xFFFE, 100);

    // The pushed status byte has B clear for a hardware interrupt.
    let pushed_p = sys.ram[0x01FB];
    assert_eq!(pushed_p & 0x10, 0, "B must be clear in the pushed status");
    assert_ne!(pushed_p & 0x20, 0, "bit 5 must be set in the pushed status");
}

#[test]
fn brk_pushes_status_with_b_set() {
    let mut sys = System::power_on_at(0x0400, &[0x00, 0x00]);
    sys.ram[0xFFFE] = 0x00;
    sys.ram[0xFFFF] = 0x05;
    sys.ram[0x0500] = 0x4C; // JMP $0500
    sys.ram[0x0501] = 0x00;
    sys.ram[0x0502] = 0x05;
    sys.step_instruction(); // BRK, 7 cycles

    // Return address is BRK + 2.
    assert_eq!(sys.ram[0x01FD], 0x04);
    assert_eq!(sys.ram[0x01FC], 0x02);
    assert_ne!(sys.ram[0x01FB] & 0x10, 0, "B must be set for software BRK");
}

#[test]
fn nmi_edge_triggers_exactly_once() {
    let mut sys = System::power_on_at(0x0400, &[0xEA, 0x4C, 0x01, 0x04]);
    sys.ram[0xFFFA] = 0x00;
    sys.ram[0xFFFB] = 0x05;
    sys.ram[0x0500] = 0x4C; // JMP $0500 (park the handler)
    sys.ram[0x0501] = 0x00;
    sys.ram[0x0502] = 0x05;

    // Hold the line low: one service, no retrigger while it stays low.
    sys.input.nmi = false;
    assert_eq!(count_vector_reads(&mut sys, 0xFFFA, 300), 1);

    // A new falling edge after the line went high triggers again.
    sys.input.nmi = true;
    sys.tick();
    sys.tick();
    sys.input.nmi = false;
    assert_eq!(count_vector_reads(&mut sys, 0xFFFA, 300), 1);
}

#[test]
fn taken_branch_delays_nmi_by_one_instruction() {
    // LDA #1 / BNE +0 / INX / NOPs. The NMI edge lands in the branch's
    // second cycle; the taken same-page branch delays recognition so INX
    // still runs before the handler is entered.
    let mut sys = System::power_on_at(0x0400, &[0xA9, 0x01, 0xD0, 0x00, 0xE8, 0xEA, 0xEA]);
    sys.ram[0xFFFA] = 0x00;
    sys.ram[0xFFFB] = 0x05;
    sys.ram[0x0500] = 0x4C; // JMP $0500
    sys.ram[0x0501] = 0x00;
    sys.ram[0x0502] = 0x05;

    sys.step_instruction(); // LDA #1
    sys.tick(); // branch opcode latched, cycle 0
    sys.input.nmi = false; // edge seen at the start of cycle 1
    sys.run_until_addr(0xFFFA, 50);

    assert_eq!(sys.cpu.x(), 1, "INX must execute before the NMI service");
    // Return address points past INX.
    assert_eq!(sys.ram[0x01FD], 0x04);
    assert_eq!(sys.ram[0x01FC], 0x05);
}

#[test]
fn nmi_during_rti_services_after_return() {
    // BRK enters the IRQ handler, which is a bare RTI. An NMI edge in the
    // middle of RTI must let RTI finish, then hijack the next fetch.
    let mut sys = System::power_on_at(0x0400, &[0x00, 0x00, 0xE8, 0x4C, 0x03, 0x04]);
    sys.ram[0xFFFE] = 0x00;
    sys.ram[0xFFFF] = 0x05;
    sys.ram[0x0500] = 0x40; // RTI
    sys.ram[0xFFFA] = 0x00;
    sys.ram[0xFFFB] = 0x06;
    sys.ram[0x0600] = 0x4C; // JMP $0600
    sys.ram[0x0601] = 0x00;
    sys.ram[0x0602] = 0x06;

    sys.step_instruction(); // BRK -> handler fetch
    assert_eq!(sys.out.addr, 0x0500);
    sys.tick(); // RTI latched, cycle 0
    sys.tick(); // cycle 1
    sys.input.nmi = false; // edge mid-RTI
    sys.run_until_addr(0xFFFA, 50);

    // RTI completed (stack unwound), but the INX at $0402 never ran.
    assert_eq!(sys.cpu.x(), 0);
    assert_eq!(sys.ram[0x01FD], 0x04, "NMI must push the post-RTI PC");
    assert_eq!(sys.ram[0x01FC], 0x02);
}

#[test]
fn nmi_beats_irq_for_the_vector() {
    // Both lines active when the next instruction is fetched: the shared
    // entry sequence must read $FFFA, not $FFFE.
    let mut sys = System::power_on_at(0x0400, &[0x58, 0xEA, 0x4C, 0x01, 0x04]);
    sys.ram[0xFFFA] = 0x00;
    sys.ram[0xFFFB] = 0x06;
    sys.ram[0x0600] = 0x4C; // JMP $0600
    sys.ram[0x0601] = 0x00;
    sys.ram[0x0602] = 0x06;
    sys.step_instruction(); // CLI
    sys.input.irq = false;
    sys.input.nmi = false;
    for _ in 0..100 {
        sys.tick();
        assert_ne!(sys.out.addr, 0xFFFE, "IRQ vector read despite pending NMI");
        if sys.out.addr == 0xFFFA {
            return;
        }
    }
    panic!("NMI vector never fetched");
}

#[test]
fn jam_locks_bus_until_reset() {
    let mut sys = System::power_on_at(0x0400, &[0x02]);
    sys.tick(); // latch JAM
    sys.tick();
    for _ in 0..10 {
        let out = sys.tick();
        assert_eq!(out.addr, 0xFFFF);
        assert_eq!(out.data, 0xFF);
        assert!(out.rw);
        assert!(!out.sync);
    }

    // RESET is the only way out.
    sys.run_reset();
    assert!(sys.out.sync);
    assert_eq!(sys.out.addr, 0x0400);
}

#[test]
fn rdy_low_pauses_read_cycles() {
    let mut sys = System::power_on_at(0x0400, &[0xAD, 0x00, 0x02]); // LDA $0200
    sys.ram[0x0200] = 0x55;
    sys.tick(); // opcode latched, operand address on the bus
    let held = sys.out.addr;

    sys.input.ready = false;
    for _ in 0..5 {
        let out = sys.tick();
        assert_eq!(out.addr, held, "bus must hold during an RDY stall");
        assert!(!out.sync);
    }
    assert_eq!(sys.cpu.a(), 0x00);

    sys.input.ready = true;
    for _ in 0..3 {
        sys.tick();
    }
    assert_eq!(sys.cpu.a(), 0x55);
}

#[test]
fn rdy_low_does_not_stall_write_cycles() {
    // LDA #$77 / STA $0200. Pull RDY low while the write is on the bus:
    // the following cycle still executes; the stall resumes on the next
    // read cycle.
    let mut sys = System::power_on_at(0x0400, &[0xA9, 0x77, 0x8D, 0x00, 0x02, 0xEA]);
    sys.step_instruction();
    while sys.tick().rw {}
    assert_eq!(sys.ram[0x0200], 0x77);

    sys.input.ready = false;
    let out = sys.tick(); // completes despite RDY: previous cycle was a write
    assert!(out.sync, "cycle after a write must not stall");
    let held = sys.out.addr;
    let out = sys.tick(); // opcode fetch is a read: stalls now
    assert_eq!(out.addr, held);
    assert!(out.sync, "output pins freeze during the stall");
}
