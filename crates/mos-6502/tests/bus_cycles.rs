//! Per-cycle bus sequencing tests: instruction timing, page-cross
//! penalties, dummy accesses and addressing-mode wrap quirks.

mod common;

use common::System;

#[test]
fn lda_imm_sta_abs() {
    // $0400: LDA #$42 / STA $0200 / BRK
    let mut sys = System::power_on_at(0x0400, &[0xA9, 0x42, 0x8D, 0x00, 0x02, 0x00]);

    assert_eq!(sys.step_instruction(), 2); // LDA #
    assert_eq!(sys.cpu.a(), 0x42);
    assert_eq!(sys.step_instruction(), 4); // STA abs
    assert_eq!(sys.ram[0x0200], 0x42);

    let p = sys.cpu.p();
    assert!(!p.test(mos_6502::flags::N));
    assert!(!p.test(mos_6502::flags::Z));
}

#[test]
fn abs_indexed_page_cross_costs_one_cycle() {
    // LDX #$20 / LDA $02F0,X -> $0310 crosses into the next page
    let mut sys = System::power_on_at(0x0400, &[0xA2, 0x20, 0xBD, 0xF0, 0x02]);
    sys.ram[0x0310] = 0x11;
    sys.step_instruction();
    assert_eq!(sys.step_instruction(), 5);
    assert_eq!(sys.cpu.a(), 0x11);

    // LDX #$01 / LDA $02F0,X -> $02F1 stays on the page
    let mut sys = System::power_on_at(0x0400, &[0xA2, 0x01, 0xBD, 0xF0, 0x02]);
    sys.ram[0x02F1] = 0x22;
    sys.step_instruction();
    assert_eq!(sys.step_instruction(), 4);
    assert_eq!(sys.cpu.a(), 0x22);
}

#[test]
fn page_cross_issues_unfixed_read_first() {
    // LDY #$20 / LDA $02F0,Y. The cross first reads $0210 (wrong page),
    // then the fixed $0310.
    let mut sys = System::power_on_at(0x0400, &[0xA0, 0x20, 0xB9, 0xF0, 0x02]);
    sys.ram[0x0210] = 0xEE;
    sys.ram[0x0310] = 0x33;
    sys.step_instruction();

    let mut reads = Vec::new();
    loop {
        sys.tick();
        if sys.out.rw {
            reads.push(sys.out.addr);
        }
        if sys.out.sync {
            break;
        }
    }
    assert!(reads.contains(&0x0210), "unfixed address was not read");
    assert!(reads.contains(&0x0310), "fixed address was not read");
    assert_eq!(sys.cpu.a(), 0x33);
}

#[test]
fn jmp_indirect_wraps_within_page() {
    // JMP ($10FF): low byte from $10FF, high byte from $1000 (not $1100).
    let mut sys = System::power_on_at(0x0400, &[0x6C, 0xFF, 0x10]);
    sys.ram[0x10FF] = 0x34;
    sys.ram[0x1000] = 0x12;
    sys.ram[0x1100] = 0x99; // would be used if the carry were propagated
    assert_eq!(sys.step_instruction(), 5);
    assert_eq!(sys.cpu.pc(), 0x1234);
    assert_eq!(sys.out.addr, 0x1234);
}

#[test]
fn rmw_writes_original_value_then_result() {
    // ASL $10: read, write back the original, write the shifted value.
    let mut sys = System::power_on_at(0x0400, &[0x06, 0x10]);
    sys.ram[0x0010] = 0x41;
    let mut writes = Vec::new();
    loop {
        sys.tick();
        if !sys.out.rw {
            writes.push((sys.out.addr, sys.out.data));
        }
        if sys.out.sync {
            break;
        }
    }
    assert_eq!(writes, vec![(0x0010, 0x41), (0x0010, 0x82)]);
    assert_eq!(sys.ram[0x0010], 0x82);
}

#[test]
fn indexed_store_always_takes_fixup_cycle() {
    // LDA #$5A / LDY #$01 / STA $0200,Y: no page cross, still 5 cycles,
    // with a dummy read of the target before the write.
    let mut sys = System::power_on_at(0x0400, &[0xA9, 0x5A, 0xA0, 0x01, 0x99, 0x00, 0x02]);
    sys.step_instruction();
    sys.step_instruction();
    assert_eq!(sys.step_instruction(), 5);
    assert_eq!(sys.ram[0x0201], 0x5A);
}

#[test]
fn zero_page_indexed_wraps_in_page() {
    // LDX #$20 / LDA $F0,X reads $10, not $110.
    let mut sys = System::power_on_at(0x0400, &[0xA2, 0x20, 0xB5, 0xF0]);
    sys.ram[0x0010] = 0x77;
    sys.ram[0x0110] = 0x88;
    sys.step_instruction();
    assert_eq!(sys.step_instruction(), 4);
    assert_eq!(sys.cpu.a(), 0x77);
}

#[test]
fn indirect_x_pointer_wraps_in_zero_page() {
    // LDA ($FF,X) with X=0: pointer bytes come from $FF and $00.
    let mut sys = System::power_on_at(0x0400, &[0xA1, 0xFF]);
    sys.ram[0x00FF] = 0x00;
    sys.ram[0x0000] = 0x03; // -> $0300
    sys.ram[0x0300] = 0x99;
    assert_eq!(sys.step_instruction(), 6);
    assert_eq!(sys.cpu.a(), 0x99);
}

#[test]
fn branch_timing() {
    // BNE not taken: 2 cycles. Taken, same page: 3. Taken across a page: 4.
    let mut sys = System::power_on_at(0x0400, &[0xA9, 0x00, 0xD0, 0x10]);
    sys.step_instruction(); // LDA #0 -> Z set
    assert_eq!(sys.step_instruction(), 2);

    let mut sys = System::power_on_at(0x0400, &[0xA9, 0x01, 0xD0, 0x10]);
    sys.step_instruction();
    assert_eq!(sys.step_instruction(), 3);
    assert_eq!(sys.out.addr, 0x0414);

    // Branch target on the next page: place the branch near the page end.
    let mut sys = System::power_on_at(0x04F0, &[0xA9, 0x01, 0xD0, 0x20]);
    sys.step_instruction();
    assert_eq!(sys.step_instruction(), 4);
    assert_eq!(sys.out.addr, 0x0514);
}

#[test]
fn undocumented_lax_loads_both_registers() {
    let mut sys = System::power_on_at(0x0400, &[0xA7, 0x10]); // LAX $10
    sys.ram[0x0010] = 0xC3;
    assert_eq!(sys.step_instruction(), 3);
    assert_eq!(sys.cpu.a(), 0xC3);
    assert_eq!(sys.cpu.x(), 0xC3);
    assert!(sys.cpu.p().test(mos_6502::flags::N));
}

#[test]
fn undocumented_sax_stores_a_and_x() {
    // LDA #$F0 / LDX #$3C / SAX $10
    let mut sys = System::power_on_at(0x0400, &[0xA9, 0xF0, 0xA2, 0x3C, 0x87, 0x10]);
    sys.step_instruction();
    sys.step_instruction();
    assert_eq!(sys.step_instruction(), 3);
    assert_eq!(sys.ram[0x0010], 0x30);
}

#[test]
fn undocumented_dcp_decrements_and_compares() {
    // LDA #$40 / DCP $10 with $10 = $41: memory becomes $40, compare sets Z.
    let mut sys = System::power_on_at(0x0400, &[0xA9, 0x40, 0xC7, 0x10]);
    sys.ram[0x0010] = 0x41;
    sys.step_instruction();
    assert_eq!(sys.step_instruction(), 5);
    assert_eq!(sys.ram[0x0010], 0x40);
    assert!(sys.cpu.p().test(mos_6502::flags::Z));
    assert!(sys.cpu.p().test(mos_6502::flags::C));
}

#[test]
fn undocumented_sha_masks_with_address_high() {
    // LDA #$FF / LDX #$FF / LDY #$01 / SHA $10FE,Y
    // Stored value = A & X & (high byte of target + 1) = $FF & $FF & $11.
    let mut sys = System::power_on_at(
        0x0400,
        &[0xA9, 0xFF, 0xA2, 0xFF, 0xA0, 0x01, 0x9F, 0xFE, 0x10],
    );
    sys.step_instruction();
    sys.step_instruction();
    sys.step_instruction();
    assert_eq!(sys.step_instruction(), 5);
    assert_eq!(sys.ram[0x10FF], 0x11);
}

#[test]
fn unstable_ane_uses_magic_constant() {
    // LDA #$00 / LDX #$FF / ANE #$CD -> A = ($00 | $EE) & $FF & $CD
    let mut sys = System::power_on_at(0x0400, &[0xA9, 0x00, 0xA2, 0xFF, 0x8B, 0xCD]);
    sys.step_instruction();
    sys.step_instruction();
    assert_eq!(sys.step_instruction(), 2);
    assert_eq!(sys.cpu.a(), 0xEE & 0xCD);
}
