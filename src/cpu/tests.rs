use super::*;
use crate::bus::BasicBus;
use crate::cpu::{alu, operands};

fn flags(r: &Registers) -> (bool, bool, bool, bool) {
    (r.flag_z(), r.flag_n(), r.flag_h(), r.flag_c())
}

// ===== Register file =====

#[test]
fn test_f_low_nibble_never_sticks() {
    let mut r = Registers::new();
    r.set_f(0xFF);
    assert_eq!(r.f(), 0xF0);
    r.set_af(0x12FF);
    assert_eq!(r.af(), 0x12F0);
    r.set8(R8::F, 0x3C);
    assert_eq!(r.f(), 0x30);
}

#[test]
fn test_pairs_compose_high_low() {
    let mut r = Registers::new();
    r.set_bc(0x1234);
    assert_eq!(r.b, 0x12);
    assert_eq!(r.c, 0x34);
    assert_eq!(r.get16(R16::BC), 0x1234);
    r.set16(R16::HL, 0xBEEF);
    assert_eq!(r.h, 0xBE);
    assert_eq!(r.l, 0xEF);
}

// ===== 8-bit arithmetic =====

#[test]
fn test_add8_half_carry() {
    let mut r = Registers::new();
    r.a = 0x0F;
    let r = alu::add8(r, 0x01, false);
    assert_eq!(r.a, 0x10);
    assert_eq!(flags(&r), (false, false, true, false));
}

#[test]
fn test_add8_wraps_to_zero() {
    let mut r = Registers::new();
    r.a = 0xFF;
    let r = alu::add8(r, 0x01, false);
    assert_eq!(r.a, 0x00);
    assert_eq!(flags(&r), (true, false, true, true));
}

#[test]
fn test_adc_consumes_stored_carry() {
    let mut r = Registers::new();
    r.a = 0xFF;
    r.set_flag_c(true);
    let r = alu::add8(r, 0x00, true);
    assert_eq!(r.a, 0x00);
    assert_eq!(flags(&r), (true, false, true, true));
}

#[test]
fn test_sub8_borrow() {
    let mut r = Registers::new();
    r.a = 0x00;
    let r = alu::sub8(r, 0x01, false);
    assert_eq!(r.a, 0xFF);
    assert_eq!(flags(&r), (false, true, true, true));
}

#[test]
fn test_sbc_reaches_zero_through_carry() {
    let mut r = Registers::new();
    r.a = 0x10;
    r.set_flag_c(true);
    let r = alu::sub8(r, 0x0F, true);
    assert_eq!(r.a, 0x00);
    assert_eq!(flags(&r), (true, true, true, false));
}

#[test]
fn test_compare_leaves_a_alone() {
    let mut r = Registers::new();
    r.a = 0x42;
    let r = alu::compare(r, 0x42);
    assert_eq!(r.a, 0x42);
    assert_eq!(flags(&r), (true, true, false, false));
}

#[test]
fn test_inc_preserves_carry() {
    let mut r = Registers::new();
    r.b = 0xFF;
    r.set_flag_c(true);
    let r = alu::inc(r, R8::B);
    assert_eq!(r.b, 0x00);
    assert_eq!(flags(&r), (true, false, true, true));
}

#[test]
fn test_dec_preserves_carry() {
    let mut r = Registers::new();
    r.d = 0x00;
    let r = alu::dec(r, R8::D);
    assert_eq!(r.d, 0xFF);
    assert_eq!(flags(&r), (false, true, true, false));

    let mut r = Registers::new();
    r.d = 0x01;
    r.set_flag_c(true);
    let r = alu::dec(r, R8::D);
    assert_eq!(r.d, 0x00);
    assert_eq!(flags(&r), (true, true, false, true));
}

#[test]
fn test_logic_ops_write_whole_f() {
    let mut r = Registers::new();
    r.a = 0xF0;
    r.set_flag_c(true);
    let r = alu::and(r, 0x0F);
    assert_eq!(r.a, 0x00);
    assert_eq!(r.f(), 0b1010_0000);

    let mut r = Registers::new();
    r.a = 0x55;
    let r = alu::or(r, 0xAA);
    assert_eq!(r.a, 0xFF);
    assert_eq!(r.f(), 0);

    let mut r = Registers::new();
    r.a = 0x5A;
    let r = alu::xor(r, 0x5A);
    assert_eq!(r.a, 0x00);
    assert_eq!(r.f(), 0b1000_0000);
}

#[test]
fn test_cpl_touches_only_n_and_h() {
    let mut r = Registers::new();
    r.a = 0x55;
    r.set_flag_z(true);
    r.set_flag_c(true);
    let r = alu::cpl(r);
    assert_eq!(r.a, 0xAA);
    assert_eq!(flags(&r), (true, true, true, true));
}

// ===== Rotates, shifts, bit ops =====

#[test]
fn test_rl_shifts_carry_in_and_out() {
    let mut r = Registers::new();
    r.set_flag_c(true);
    let (r, out) = alu::rl_value(r, 0x80, true);
    assert_eq!(out, 0x01);
    assert_eq!(flags(&r), (false, false, false, true));
}

#[test]
fn test_accumulator_rotate_forces_z_clear() {
    let r = Registers::new();
    let (r, out) = alu::rl_value(r, 0x00, false);
    assert_eq!(out, 0x00);
    assert!(!r.flag_z());
}

#[test]
fn test_rlc_wraps_bit7() {
    let r = Registers::new();
    let (r, out) = alu::rlc_value(r, 0x85, true);
    assert_eq!(out, 0x0B);
    assert_eq!(flags(&r), (false, false, false, true));
}

#[test]
fn test_rr_shifts_carry_in_and_out() {
    let mut r = Registers::new();
    r.set_flag_c(true);
    let (r, out) = alu::rr_value(r, 0x01, true);
    assert_eq!(out, 0x80);
    assert_eq!(flags(&r), (false, false, false, true));
}

#[test]
fn test_rrc_wraps_bit0() {
    let r = Registers::new();
    let (r, out) = alu::rrc_value(r, 0x01, true);
    assert_eq!(out, 0x80);
    assert_eq!(flags(&r), (false, false, false, true));
}

#[test]
fn test_shifts() {
    let r = Registers::new();
    let (r, out) = alu::sla_value(r, 0x80);
    assert_eq!(out, 0x00);
    assert_eq!(flags(&r), (true, false, false, true));

    let r = Registers::new();
    let (r, out) = alu::sra_value(r, 0x81);
    assert_eq!(out, 0xC1);
    assert_eq!(flags(&r), (false, false, false, true));

    let r = Registers::new();
    let (r, out) = alu::srl_value(r, 0x81);
    assert_eq!(out, 0x40);
    assert_eq!(flags(&r), (false, false, false, true));
}

#[test]
fn test_swap_nibbles() {
    let r = Registers::new();
    let (r, out) = alu::swap_value(r, 0xAB);
    assert_eq!(out, 0xBA);
    assert_eq!(r.f(), 0);

    let (r, out) = alu::swap_value(r, 0x00);
    assert_eq!(out, 0x00);
    assert_eq!(r.f(), 0b1000_0000);
}

#[test]
fn test_bit_test_reads_without_writing() {
    let r = Registers::new();
    let r = alu::bit_test(r, 0b0100_0000, 6);
    assert_eq!(flags(&r), (false, false, true, false));
    let r = alu::bit_test(r, 0b0100_0000, 0);
    assert_eq!(flags(&r), (true, false, true, false));
}

// ===== BCD and 16-bit arithmetic =====

#[test]
fn test_daa_after_addition() {
    let mut r = Registers::new();
    r.a = 0x45;
    let r = alu::daa(alu::add8(r, 0x38, false));
    assert_eq!(r.a, 0x83);
    assert_eq!(flags(&r), (false, false, false, false));
}

#[test]
fn test_daa_after_subtraction() {
    let mut r = Registers::new();
    r.a = 0x47;
    let r = alu::daa(alu::sub8(r, 0x28, false));
    assert_eq!(r.a, 0x19);
    assert_eq!(flags(&r), (false, true, false, false));
}

#[test]
fn test_add16_leaves_z_alone() {
    let mut r = Registers::new();
    r.set_hl(0x0FFF);
    r.set_bc(0x0001);
    r.set_flag_z(true);
    let r = alu::add16(r, R16::BC);
    assert_eq!(r.hl(), 0x1000);
    assert_eq!(flags(&r), (true, false, true, false));

    let mut r = Registers::new();
    r.set_hl(0x8000);
    let r = alu::add16(r, R16::HL);
    assert_eq!(r.hl(), 0x0000);
    assert!(r.flag_c());
    assert!(!r.flag_h());
}

// ===== Operand banks =====

#[test]
fn test_stack_bank_swaps_sp_for_af() {
    assert_eq!(operands::r16(3), R16::Sp);
    assert_eq!(operands::r16_stack(3), R16::AF);
}

// ===== Instruction tables =====

#[test]
fn test_every_opcode_decodes_in_both_tables() {
    let it = Interpreter::dmg().unwrap();
    for table in 0..2 {
        for b in 0..=255u8 {
            assert!(
                it.decode(b, table).is_some(),
                "table {} byte {:#04x} has no template",
                table,
                b
            );
        }
    }
}

#[test]
fn test_table_construction_is_order_independent_per_byte() {
    // Two independent builds must route every byte through the same template.
    let a = Interpreter::dmg().unwrap();
    let b = Interpreter::dmg().unwrap();
    for table in 0..2 {
        for byte in 0..=255u8 {
            let ta = a.decode(byte, table).map(|p| p.text().to_string());
            let tb = b.decode(byte, table).map(|p| p.text().to_string());
            assert_eq!(ta, tb, "table {} byte {:#04x}", table, byte);
        }
    }
}

#[test]
fn test_every_opcode_executes_or_reports_unimplemented() {
    let it = Interpreter::dmg().unwrap();
    for table in 0..2 {
        for b in 0..=255u8 {
            let mut regs = Registers::new();
            let mut bus = BasicBus::new();
            match it.execute(&mut regs, &mut bus, b, table) {
                Ok(_) => {}
                Err(ExecError::Unimplemented { .. }) => {}
                // Executing the escape byte as an instruction is a scheduler
                // bug, and the table says so.
                Err(ExecError::UnreachableGroup { .. }) if table == 0 && b == CB_PREFIX => {}
                Err(e) => panic!("table {} byte {:#04x}: {}", table, b, e),
            }
        }
    }
}

#[test]
fn test_illegal_opcodes_are_surfaced() {
    let it = Interpreter::dmg().unwrap();
    for b in [0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD] {
        let mut regs = Registers::new();
        let mut bus = BasicBus::new();
        assert!(matches!(
            it.execute(&mut regs, &mut bus, b, 0),
            Err(ExecError::Unimplemented { opcode, .. }) if opcode == b
        ));
    }
}

#[test]
fn test_ld_r8_r8_moves_every_combination() {
    let it = Interpreter::dmg().unwrap();
    let mut bus = BasicBus::new();
    // ld d,e is 01_010_011 = 0x53
    let mut regs = Registers::new();
    regs.e = 0x77;
    it.execute(&mut regs, &mut bus, 0x53, 0).unwrap();
    assert_eq!(regs.d, 0x77);
    // ld (hl),b then ld c,(hl)
    let mut regs = Registers::new();
    regs.set_hl(0xC000);
    regs.b = 0x5A;
    it.execute(&mut regs, &mut bus, 0x70, 0).unwrap();
    it.execute(&mut regs, &mut bus, 0x4E, 0).unwrap();
    assert_eq!(regs.c, 0x5A);
}

#[test]
fn test_hl_postincrement_and_postdecrement_loads() {
    let it = Interpreter::dmg().unwrap();
    let mut bus = BasicBus::new();
    let mut regs = Registers::new();
    regs.a = 0x9C;
    regs.set_hl(0xC123);
    it.execute(&mut regs, &mut bus, 0x22, 0).unwrap(); // ld (hl+),a
    assert_eq!(bus.read_byte(0xC123), 0x9C);
    assert_eq!(regs.hl(), 0xC124);

    it.execute(&mut regs, &mut bus, 0x32, 0).unwrap(); // ld (hl-),a
    assert_eq!(bus.read_byte(0xC124), 0x9C);
    assert_eq!(regs.hl(), 0xC123);
}

#[test]
fn test_push_pop_roundtrip() {
    let it = Interpreter::dmg().unwrap();
    let mut bus = BasicBus::new();
    let mut regs = Registers::new();
    regs.sp = 0xFFFE;
    regs.set_bc(0x1234);
    it.execute(&mut regs, &mut bus, 0xC5, 0).unwrap(); // push bc
    assert_eq!(regs.sp, 0xFFFC);
    it.execute(&mut regs, &mut bus, 0xD1, 0).unwrap(); // pop de
    assert_eq!(regs.de(), 0x1234);
    assert_eq!(regs.sp, 0xFFFE);
}

#[test]
fn test_pop_af_cannot_set_ghost_flag_bits() {
    let it = Interpreter::dmg().unwrap();
    let mut bus = BasicBus::new();
    bus.write_byte(0xFFFC, 0xFF); // would-be F
    bus.write_byte(0xFFFD, 0x12);
    let mut regs = Registers::new();
    regs.sp = 0xFFFC;
    it.execute(&mut regs, &mut bus, 0xF1, 0).unwrap(); // pop af
    assert_eq!(regs.af(), 0x12F0);
}

#[test]
fn test_taken_branches_report_extra_cycles() {
    let it = Interpreter::dmg().unwrap();
    let mut bus = BasicBus::new();
    bus.load(0x0000, &[0xFE]); // jr nz,-2

    let mut regs = Registers::new(); // Z clear: taken
    let extra = it.execute(&mut regs, &mut bus, 0x20, 0).unwrap();
    assert_eq!(extra, 4);
    assert_eq!(regs.pc, 0xFFFF);

    let mut regs = Registers::new();
    regs.set_flag_z(true); // not taken
    regs.pc = 0;
    let extra = it.execute(&mut regs, &mut bus, 0x20, 0).unwrap();
    assert_eq!(extra, 0);
    assert_eq!(regs.pc, 0x0001);
}

#[test]
fn test_call_and_conditional_ret() {
    let it = Interpreter::dmg().unwrap();
    let mut bus = BasicBus::new();
    bus.load(0x0100, &[0x00, 0x80]); // call target 0x8000
    let mut regs = Registers::new();
    regs.pc = 0x0100;
    regs.sp = 0xFFFE;

    let extra = it.execute(&mut regs, &mut bus, 0xCD, 0).unwrap(); // call u16
    assert_eq!(extra, 0);
    assert_eq!(regs.pc, 0x8000);
    assert_eq!(regs.sp, 0xFFFC);

    regs.set_flag_c(true);
    let extra = it.execute(&mut regs, &mut bus, 0xD8, 0).unwrap(); // ret c, taken
    assert_eq!(extra, 12);
    assert_eq!(regs.pc, 0x0102);
    assert_eq!(regs.sp, 0xFFFE);
}

#[test]
fn test_rst_vectors() {
    let it = Interpreter::dmg().unwrap();
    let mut bus = BasicBus::new();
    let mut regs = Registers::new();
    regs.pc = 0x1234;
    regs.sp = 0xFFFE;
    it.execute(&mut regs, &mut bus, 0xEF, 0).unwrap(); // rst 28h
    assert_eq!(regs.pc, 0x0028);
    assert_eq!(bus.read_byte(0xFFFD), 0x12);
    assert_eq!(bus.read_byte(0xFFFC), 0x34);
}

#[test]
fn test_scf_ccf() {
    let it = Interpreter::dmg().unwrap();
    let mut bus = BasicBus::new();
    let mut regs = Registers::new();
    regs.set_flag_z(true);
    regs.set_flag_n(true);
    regs.set_flag_h(true);
    it.execute(&mut regs, &mut bus, 0x37, 0).unwrap(); // scf
    assert_eq!(flags(&regs), (true, false, false, true));
    it.execute(&mut regs, &mut bus, 0x3F, 0).unwrap(); // ccf
    assert_eq!(flags(&regs), (true, false, false, false));
}

#[test]
fn test_ld_hl_sp_offset_flags() {
    let it = Interpreter::dmg().unwrap();
    let mut bus = BasicBus::new();
    bus.load(0x0000, &[0x01]);
    let mut regs = Registers::new();
    regs.sp = 0x000F;
    regs.set_flag_z(true);
    it.execute(&mut regs, &mut bus, 0xF8, 0).unwrap(); // ld hl,sp+1
    assert_eq!(regs.hl(), 0x0010);
    assert_eq!(regs.sp, 0x000F);
    assert_eq!(flags(&regs), (false, false, true, false));
}

#[test]
fn test_add_sp_negative_offset() {
    let it = Interpreter::dmg().unwrap();
    let mut bus = BasicBus::new();
    bus.load(0x0000, &[0xFF]); // -1
    let mut regs = Registers::new();
    regs.sp = 0xD000;
    it.execute(&mut regs, &mut bus, 0xE8, 0).unwrap(); // add sp,-1
    assert_eq!(regs.sp, 0xCFFF);
    // Low-byte unsigned flags: 0x00 + 0xFF carries out of neither nibble.
    assert_eq!(flags(&regs), (false, false, false, false));
}

#[test]
fn test_cb_bit_and_set_on_memory() {
    let it = Interpreter::dmg().unwrap();
    let mut bus = BasicBus::new();
    let mut regs = Registers::new();
    regs.set_hl(0xC000);

    it.execute(&mut regs, &mut bus, 0x46, 1).unwrap(); // bit 0,(hl)
    assert!(regs.flag_z());

    it.execute(&mut regs, &mut bus, 0xFE, 1).unwrap(); // set 7,(hl)
    assert_eq!(bus.read_byte(0xC000), 0x80);

    it.execute(&mut regs, &mut bus, 0x7E, 1).unwrap(); // bit 7,(hl)
    assert!(!regs.flag_z());

    it.execute(&mut regs, &mut bus, 0xBE, 1).unwrap(); // res 7,(hl)
    assert_eq!(bus.read_byte(0xC000), 0x00);
}

// ===== Processor scheduling =====

#[test]
fn test_instruction_spans_exactly_its_cost() {
    let mut bus = BasicBus::new();
    bus.load(0x0100, &[0x3E, 0x05, 0xC6, 0x03]); // ld a,5 ; add a,3
    let it = Arc::new(Interpreter::dmg().unwrap());
    let mut proc = Processor::post_boot(bus, it, TimingTable::dmg());

    // Both instructions are 8 T-cycles.
    for _ in 0..16 {
        proc.tick().unwrap();
    }
    assert!(!proc.mid_instruction());
    assert_eq!(proc.registers.a, 0x08);
    assert_eq!(flags(&proc.registers), (false, false, false, false));
    assert_eq!(proc.registers.pc, 0x0104);
    assert_eq!(proc.cycles(), 16);
}

#[test]
fn test_effects_land_on_the_fetch_tick() {
    let mut bus = BasicBus::new();
    bus.load(0x0000, &[0x3E, 0x42]); // ld a,u8: 8 cycles
    let it = Arc::new(Interpreter::dmg().unwrap());
    let mut proc = Processor::new(bus, it, TimingTable::dmg());

    proc.tick().unwrap();
    assert_eq!(proc.registers.a, 0x42);
    assert!(proc.mid_instruction());
    proc.tick().unwrap();
    assert!(!proc.mid_instruction());
}

#[test]
fn test_step_returns_total_cost() {
    let mut bus = BasicBus::new();
    bus.load(0x0000, &[0x00, 0xCD, 0x00, 0x80]); // nop ; call 0x8000
    let it = Arc::new(Interpreter::dmg().unwrap());
    let mut proc = Processor::new(bus, it, TimingTable::dmg());
    proc.registers.sp = 0xFFFE;

    assert_eq!(proc.step().unwrap(), 4);
    assert_eq!(proc.step().unwrap(), 24);
    assert_eq!(proc.registers.pc, 0x8000);
}

#[test]
fn test_conditional_jump_costs_depend_on_the_branch() {
    let it = Arc::new(Interpreter::dmg().unwrap());

    let mut bus = BasicBus::new();
    bus.load(0x0000, &[0x20, 0x10]); // jr nz,+0x10
    let mut proc = Processor::new(bus, it.clone(), TimingTable::dmg());
    assert_eq!(proc.step().unwrap(), 12); // taken
    assert_eq!(proc.registers.pc, 0x0012);

    let mut bus = BasicBus::new();
    bus.load(0x0000, &[0x20, 0x10]);
    let mut proc = Processor::new(bus, it, TimingTable::dmg());
    proc.registers.set_flag_z(true);
    assert_eq!(proc.step().unwrap(), 8); // not taken
    assert_eq!(proc.registers.pc, 0x0002);
}

#[test]
fn test_cb_escape_uses_the_second_table() {
    let mut bus = BasicBus::new();
    bus.load(0x0000, &[0xCB, 0x37]); // swap a
    let it = Arc::new(Interpreter::dmg().unwrap());
    let mut proc = Processor::new(bus, it, TimingTable::dmg());
    proc.registers.a = 0xF1;

    assert_eq!(proc.step().unwrap(), 8);
    assert_eq!(proc.registers.a, 0x1F);
    assert_eq!(proc.registers.pc, 0x0002);
}

#[test]
fn test_halt_surfaces_as_unimplemented() {
    let mut bus = BasicBus::new();
    bus.load(0x0000, &[0x76]);
    let it = Arc::new(Interpreter::dmg().unwrap());
    let mut proc = Processor::new(bus, it, TimingTable::dmg());
    assert!(matches!(
        proc.tick(),
        Err(ExecError::Unimplemented { opcode: 0x76, .. })
    ));
}

#[test]
fn test_post_boot_register_state() {
    let it = Arc::new(Interpreter::dmg().unwrap());
    let proc = Processor::post_boot(BasicBus::new(), it, TimingTable::dmg());
    assert_eq!(proc.registers.af(), 0x01B0);
    assert_eq!(proc.registers.bc(), 0x0013);
    assert_eq!(proc.registers.de(), 0x00D8);
    assert_eq!(proc.registers.hl(), 0x014D);
    assert_eq!(proc.registers.sp, 0xFFFE);
    assert_eq!(proc.registers.pc, 0x0100);
}
