//! The two-table instruction interpreter.
//!
//! Each instruction is a template plus a handler closure; the handler gets the
//! register file, the bus, the matched template and the concrete opcode, and
//! reports any extra cycles (taken-branch penalties). Handlers are the only
//! place bus traffic and PC/SP movement happen, and they fetch all operand
//! bytes before any branching logic consults the flags.

use tracing::debug;

use crate::bus::Bus;
use crate::decoder::{BytePattern, DecodeError, DispatchTable, Lookup};

use super::alu;
use super::operands;
use super::registers::{Registers, R8};
use super::ExecError;

pub type Handler =
    Box<dyn Fn(&mut Registers, &mut dyn Bus, &BytePattern, u8) -> Result<u32, ExecError> + Send + Sync>;

/// Opcodes in the 0xC0..=0xFF block with no instruction behind them. On
/// hardware they lock the CPU; here they surface as explicit errors.
const BLOCK3_HOLES: [u8; 11] = [
    0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD,
];

/// Immutable dispatch tables: index 0 for unprefixed opcodes, index 1 for the
/// 0xCB-prefixed namespace. Built once; safe to share read-only between any
/// number of processors.
pub struct Interpreter {
    tables: [DispatchTable<Handler>; 2],
}

impl Interpreter {
    fn new() -> Interpreter {
        Interpreter {
            tables: [DispatchTable::new(), DispatchTable::new()],
        }
    }

    fn add<F>(&mut self, table: usize, text: &str, handler: F) -> Result<(), DecodeError>
    where
        F: Fn(&mut Registers, &mut dyn Bus, &BytePattern, u8) -> Result<u32, ExecError>
            + Send
            + Sync
            + 'static,
    {
        self.tables[table].add(text, Box::new(handler))
    }

    fn add_group(&mut self, table: usize, text: &str) -> Result<(), DecodeError> {
        self.tables[table].add_group(text)
    }

    /// Decodes and runs one opcode. Extra cycles from the handler come back on
    /// success; a miss or an umbrella match is a table-construction bug
    /// surfaced as an error, never executed.
    pub fn execute(
        &self,
        regs: &mut Registers,
        bus: &mut dyn Bus,
        opcode: u8,
        table: usize,
    ) -> Result<u32, ExecError> {
        match self.tables[table].find(opcode) {
            Lookup::Miss => Err(ExecError::Coverage { opcode, table }),
            Lookup::Group(pattern) => Err(ExecError::UnreachableGroup {
                pattern: pattern.text().to_string(),
                opcode,
            }),
            Lookup::Hit(pattern, handler) => handler(regs, bus, pattern, opcode),
        }
    }

    /// The template a byte decodes to, without executing anything.
    pub fn decode(&self, opcode: u8, table: usize) -> Option<&BytePattern> {
        self.tables[table].pattern_for(opcode)
    }

    /// Builds the full DMG instruction set.
    pub fn dmg() -> Result<Interpreter, DecodeError> {
        let mut it = Interpreter::new();

        // ===== Primary table, block 0 =====
        it.add_group(0, "00xxxxxx")?;

        // nop
        it.add(0, "00000000", |_, _, _, _| Ok(0))?;

        // ld r16,u16
        it.add(0, "00dd0001", |regs, bus, pattern, opcode| {
            let dst = operands::r16(pattern.extract('d', opcode));
            let value = fetch_word(regs, bus);
            regs.set16(dst, value);
            Ok(0)
        })?;

        // ld [r16],a
        it.add(0, "000d0010", |regs, bus, pattern, opcode| {
            let dst = operands::r16_mem(pattern.extract('d', opcode));
            bus.write_byte(regs.get16(dst), regs.a);
            Ok(0)
        })?;
        // ld [hl+],a / ld [hl-],a
        it.add(0, "00100010", |regs, bus, _, _| {
            bus.write_byte(regs.hl(), regs.a);
            regs.set_hl(regs.hl().wrapping_add(1));
            Ok(0)
        })?;
        it.add(0, "00110010", |regs, bus, _, _| {
            bus.write_byte(regs.hl(), regs.a);
            regs.set_hl(regs.hl().wrapping_sub(1));
            Ok(0)
        })?;

        // ld a,[r16]
        it.add(0, "000s1010", |regs, bus, pattern, opcode| {
            let src = operands::r16_mem(pattern.extract('s', opcode));
            regs.a = bus.read_byte(regs.get16(src));
            Ok(0)
        })?;
        it.add(0, "00101010", |regs, bus, _, _| {
            regs.a = bus.read_byte(regs.hl());
            regs.set_hl(regs.hl().wrapping_add(1));
            Ok(0)
        })?;
        it.add(0, "00111010", |regs, bus, _, _| {
            regs.a = bus.read_byte(regs.hl());
            regs.set_hl(regs.hl().wrapping_sub(1));
            Ok(0)
        })?;

        // ld [u16],sp
        it.add(0, "00001000", |regs, bus, _, _| {
            let dst = fetch_word(regs, bus);
            bus.write_byte(dst, regs.sp as u8);
            bus.write_byte(dst.wrapping_add(1), (regs.sp >> 8) as u8);
            Ok(0)
        })?;

        // inc r16 / dec r16 (no flags)
        it.add(0, "00oo0011", |regs, _, pattern, opcode| {
            let reg = operands::r16(pattern.extract('o', opcode));
            regs.set16(reg, regs.get16(reg).wrapping_add(1));
            Ok(0)
        })?;
        it.add(0, "00oo1011", |regs, _, pattern, opcode| {
            let reg = operands::r16(pattern.extract('o', opcode));
            regs.set16(reg, regs.get16(reg).wrapping_sub(1));
            Ok(0)
        })?;

        // add hl,r16
        it.add(0, "00oo1001", |regs, _, pattern, opcode| {
            let reg = operands::r16(pattern.extract('o', opcode));
            *regs = alu::add16(*regs, reg);
            Ok(0)
        })?;

        // inc r8 / inc [hl]
        it.add(0, "00ooo100", |regs, _, pattern, opcode| {
            let reg = operands::r8(pattern.extract('o', opcode));
            *regs = alu::inc(*regs, reg);
            Ok(0)
        })?;
        it.add(0, "00110100", |regs, bus, _, _| {
            let value = bus.read_byte(regs.hl());
            let (updated, value) = alu::inc_value(*regs, value);
            *regs = updated;
            bus.write_byte(regs.hl(), value);
            Ok(0)
        })?;

        // dec r8 / dec [hl]
        it.add(0, "00ooo101", |regs, _, pattern, opcode| {
            let reg = operands::r8(pattern.extract('o', opcode));
            *regs = alu::dec(*regs, reg);
            Ok(0)
        })?;
        it.add(0, "00110101", |regs, bus, _, _| {
            let value = bus.read_byte(regs.hl());
            let (updated, value) = alu::dec_value(*regs, value);
            *regs = updated;
            bus.write_byte(regs.hl(), value);
            Ok(0)
        })?;

        // ld r8,u8 / ld [hl],u8
        it.add(0, "00ddd110", |regs, bus, pattern, opcode| {
            let dst = operands::r8(pattern.extract('d', opcode));
            let value = fetch(regs, bus);
            regs.set8(dst, value);
            Ok(0)
        })?;
        it.add(0, "00110110", |regs, bus, _, _| {
            let value = fetch(regs, bus);
            bus.write_byte(regs.hl(), value);
            Ok(0)
        })?;

        // Accumulator rotates force Z clear.
        it.add(0, "00000111", |regs, _, _, _| {
            *regs = alu::rlc(*regs, R8::A, false);
            Ok(0)
        })?;
        it.add(0, "00001111", |regs, _, _, _| {
            *regs = alu::rrc(*regs, R8::A, false);
            Ok(0)
        })?;
        it.add(0, "00010111", |regs, _, _, _| {
            *regs = alu::rl(*regs, R8::A, false);
            Ok(0)
        })?;
        it.add(0, "00011111", |regs, _, _, _| {
            *regs = alu::rr(*regs, R8::A, false);
            Ok(0)
        })?;

        // daa / cpl
        it.add(0, "00100111", |regs, _, _, _| {
            *regs = alu::daa(*regs);
            Ok(0)
        })?;
        it.add(0, "00101111", |regs, _, _, _| {
            *regs = alu::cpl(*regs);
            Ok(0)
        })?;

        // scf / ccf
        it.add(0, "00110111", |regs, _, _, _| {
            regs.set_flag_n(false);
            regs.set_flag_h(false);
            regs.set_flag_c(true);
            Ok(0)
        })?;
        it.add(0, "00111111", |regs, _, _, _| {
            regs.set_flag_n(false);
            regs.set_flag_h(false);
            regs.set_flag_c(!regs.flag_c());
            Ok(0)
        })?;

        // jr i8
        it.add(0, "00011000", |regs, bus, _, _| {
            let offset = fetch(regs, bus) as i8;
            regs.pc = regs.pc.wrapping_add_signed(offset as i16);
            Ok(0)
        })?;
        // jr cc,i8
        it.add(0, "001cc000", |regs, bus, pattern, opcode| {
            let cc = pattern.extract('c', opcode);
            let offset = fetch(regs, bus) as i8;
            if !operands::condition(regs, cc) {
                return Ok(0);
            }
            regs.pc = regs.pc.wrapping_add_signed(offset as i16);
            Ok(4)
        })?;

        // stop: low-power states are not part of this core.
        it.add(0, "00010000", |_, _, _, opcode| {
            Err(ExecError::Unimplemented { opcode, name: "stop" })
        })?;

        // ===== Block 1: ld r8,r8 =====
        it.add(0, "01dddsss", |regs, _, pattern, opcode| {
            let dst = operands::r8(pattern.extract('d', opcode));
            let src = operands::r8(pattern.extract('s', opcode));
            regs.set8(dst, regs.get8(src));
            Ok(0)
        })?;
        it.add(0, "01110sss", |regs, bus, pattern, opcode| {
            let src = operands::r8(pattern.extract('s', opcode));
            bus.write_byte(regs.hl(), regs.get8(src));
            Ok(0)
        })?;
        it.add(0, "01ddd110", |regs, bus, pattern, opcode| {
            let dst = operands::r8(pattern.extract('d', opcode));
            let value = bus.read_byte(regs.hl());
            regs.set8(dst, value);
            Ok(0)
        })?;
        // halt: would take the 01110sss slot; stubbed like stop.
        it.add(0, "01110110", |_, _, _, opcode| {
            Err(ExecError::Unimplemented { opcode, name: "halt" })
        })?;

        // ===== Block 2: alu a,r8 =====
        it.add(0, "10oooxxx", |regs, bus, pattern, opcode| {
            let operand = match pattern.extract('x', opcode) {
                6 => bus.read_byte(regs.hl()),
                x => regs.get8(operands::r8(x)),
            };
            *regs = alu_op(*regs, pattern.extract('o', opcode), operand);
            Ok(0)
        })?;

        // ===== Block 3 =====
        // The catch-all is a real handler rather than a group: the eleven
        // holes in this block have no more specific template, and they report
        // as unimplemented instead of silently executing.
        it.add(0, "11xxxxxx", |_, _, _, opcode| {
            debug_assert!(BLOCK3_HOLES.contains(&opcode));
            Err(ExecError::Unimplemented { opcode, name: "illegal opcode" })
        })?;

        // alu a,u8
        it.add(0, "11ooo110", |regs, bus, pattern, opcode| {
            let operand = fetch(regs, bus);
            *regs = alu_op(*regs, pattern.extract('o', opcode), operand);
            Ok(0)
        })?;

        // ret cc / ret / reti
        it.add(0, "110cc000", |regs, bus, pattern, opcode| {
            let cc = pattern.extract('c', opcode);
            if !operands::condition(regs, cc) {
                return Ok(0);
            }
            regs.pc = pop(regs, bus);
            Ok(12)
        })?;
        it.add(0, "11001001", |regs, bus, _, _| {
            regs.pc = pop(regs, bus);
            Ok(0)
        })?;
        // reti returns like ret; the interrupt master enable lives outside
        // this core.
        it.add(0, "11011001", |regs, bus, _, _| {
            regs.pc = pop(regs, bus);
            Ok(0)
        })?;

        // jp cc,u16 / jp u16 / jp hl
        it.add(0, "110cc010", |regs, bus, pattern, opcode| {
            let cc = pattern.extract('c', opcode);
            let target = fetch_word(regs, bus);
            if !operands::condition(regs, cc) {
                return Ok(0);
            }
            regs.pc = target;
            Ok(4)
        })?;
        it.add(0, "11000011", |regs, bus, _, _| {
            regs.pc = fetch_word(regs, bus);
            Ok(0)
        })?;
        it.add(0, "11101001", |regs, _, _, _| {
            regs.pc = regs.hl();
            Ok(0)
        })?;

        // call cc,u16 / call u16
        it.add(0, "110cc100", |regs, bus, pattern, opcode| {
            let cc = pattern.extract('c', opcode);
            let target = fetch_word(regs, bus);
            if !operands::condition(regs, cc) {
                return Ok(0);
            }
            let ret = regs.pc;
            push(regs, bus, ret);
            regs.pc = target;
            Ok(12)
        })?;
        it.add(0, "11001101", |regs, bus, _, _| {
            let target = fetch_word(regs, bus);
            let ret = regs.pc;
            push(regs, bus, ret);
            regs.pc = target;
            Ok(0)
        })?;

        // rst vec
        it.add(0, "11vvv111", |regs, bus, pattern, opcode| {
            let vec = pattern.extract('v', opcode) as u16 * 8;
            let ret = regs.pc;
            push(regs, bus, ret);
            regs.pc = vec;
            Ok(0)
        })?;

        // pop r16 / push r16
        it.add(0, "11rr0001", |regs, bus, pattern, opcode| {
            let reg = operands::r16_stack(pattern.extract('r', opcode));
            let value = pop(regs, bus);
            regs.set16(reg, value);
            Ok(0)
        })?;
        it.add(0, "11rr0101", |regs, bus, pattern, opcode| {
            let reg = operands::r16_stack(pattern.extract('r', opcode));
            let value = regs.get16(reg);
            push(regs, bus, value);
            Ok(0)
        })?;

        // The processor consumes the 0xCB escape itself; decoding it here
        // means the fetch loop is broken.
        it.add(0, "11001011", |_, _, pattern, opcode| {
            Err(ExecError::UnreachableGroup {
                pattern: pattern.text().to_string(),
                opcode,
            })
        })?;

        // ldh [c],a / ldh [u8],a / ld [u16],a
        it.add(0, "11100010", |regs, bus, _, _| {
            bus.write_byte(0xFF00 + regs.c as u16, regs.a);
            Ok(0)
        })?;
        it.add(0, "11100000", |regs, bus, _, _| {
            let offset = fetch(regs, bus);
            bus.write_byte(0xFF00 + offset as u16, regs.a);
            Ok(0)
        })?;
        it.add(0, "11101010", |regs, bus, _, _| {
            let dst = fetch_word(regs, bus);
            bus.write_byte(dst, regs.a);
            Ok(0)
        })?;

        // ldh a,[c] / ldh a,[u8] / ld a,[u16]
        it.add(0, "11110010", |regs, bus, _, _| {
            regs.a = bus.read_byte(0xFF00 + regs.c as u16);
            Ok(0)
        })?;
        it.add(0, "11110000", |regs, bus, _, _| {
            let offset = fetch(regs, bus);
            regs.a = bus.read_byte(0xFF00 + offset as u16);
            Ok(0)
        })?;
        it.add(0, "11111010", |regs, bus, _, _| {
            let src = fetch_word(regs, bus);
            regs.a = bus.read_byte(src);
            Ok(0)
        })?;

        // add sp,i8 — flags come from the unsigned low byte, Z always clear.
        it.add(0, "11101000", |regs, bus, _, _| {
            let operand = fetch(regs, bus) as i8;
            let adjusted = sp_offset_flags(regs, operand);
            regs.sp = adjusted;
            Ok(0)
        })?;
        // ld hl,sp+i8 — same flags, result lands in HL.
        it.add(0, "11111000", |regs, bus, _, _| {
            let operand = fetch(regs, bus) as i8;
            let adjusted = sp_offset_flags(regs, operand);
            regs.set_hl(adjusted);
            Ok(0)
        })?;
        // ld sp,hl
        it.add(0, "11111001", |regs, _, _, _| {
            regs.sp = regs.hl();
            Ok(0)
        })?;

        // di / ei: interrupt servicing is outside this core, so both are
        // deliberate no-ops.
        it.add(0, "11110011", |_, _, _, _| Ok(0))?;
        it.add(0, "11111011", |_, _, _, _| Ok(0))?;

        // ===== CB-prefixed table =====
        // Rotates, shifts and swap on r8 / [hl].
        it.add(1, "00ooorrr", |regs, _, pattern, opcode| {
            let reg = operands::r8(pattern.extract('r', opcode));
            *regs = match pattern.extract('o', opcode) {
                0 => alu::rlc(*regs, reg, true),
                1 => alu::rrc(*regs, reg, true),
                2 => alu::rl(*regs, reg, true),
                3 => alu::rr(*regs, reg, true),
                4 => alu::sla(*regs, reg),
                5 => alu::sra(*regs, reg),
                6 => alu::swap(*regs, reg),
                _ => alu::srl(*regs, reg),
            };
            Ok(0)
        })?;
        it.add(1, "00ooo110", |regs, bus, pattern, opcode| {
            let operand = bus.read_byte(regs.hl());
            let (updated, operand) = match pattern.extract('o', opcode) {
                0 => alu::rlc_value(*regs, operand, true),
                1 => alu::rrc_value(*regs, operand, true),
                2 => alu::rl_value(*regs, operand, true),
                3 => alu::rr_value(*regs, operand, true),
                4 => alu::sla_value(*regs, operand),
                5 => alu::sra_value(*regs, operand),
                6 => alu::swap_value(*regs, operand),
                _ => alu::srl_value(*regs, operand),
            };
            *regs = updated;
            bus.write_byte(regs.hl(), operand);
            Ok(0)
        })?;

        // bit b,r8 / bit b,[hl] — test only, no writeback.
        it.add(1, "01bbbooo", |regs, bus, pattern, opcode| {
            let operand = match pattern.extract('o', opcode) {
                6 => bus.read_byte(regs.hl()),
                x => regs.get8(operands::r8(x)),
            };
            *regs = alu::bit_test(*regs, operand, pattern.extract('b', opcode));
            Ok(0)
        })?;

        // res/set b,r8 — 'v' picks clear or set.
        it.add(1, "1vbbbooo", |regs, _, pattern, opcode| {
            let reg = operands::r8(pattern.extract('o', opcode));
            let bit = pattern.extract('b', opcode);
            let on = pattern.extract('v', opcode) == 1;
            regs.set8(reg, alu::set_bit(regs.get8(reg), bit, on));
            Ok(0)
        })?;
        // res/set b,[hl]
        it.add(1, "1vbbb110", |regs, bus, pattern, opcode| {
            let operand = bus.read_byte(regs.hl());
            let bit = pattern.extract('b', opcode);
            let on = pattern.extract('v', opcode) == 1;
            bus.write_byte(regs.hl(), alu::set_bit(operand, bit, on));
            Ok(0)
        })?;

        debug!(target: "dmg_core::cpu", "built DMG interpreter tables");
        Ok(it)
    }
}

fn fetch(regs: &mut Registers, bus: &mut dyn Bus) -> u8 {
    let byte = bus.read_byte(regs.pc);
    regs.pc = regs.pc.wrapping_add(1);
    byte
}

fn fetch_word(regs: &mut Registers, bus: &mut dyn Bus) -> u16 {
    let low = fetch(regs, bus);
    let high = fetch(regs, bus);
    ((high as u16) << 8) | low as u16
}

fn push(regs: &mut Registers, bus: &mut dyn Bus, value: u16) {
    regs.sp = regs.sp.wrapping_sub(1);
    bus.write_byte(regs.sp, (value >> 8) as u8);
    regs.sp = regs.sp.wrapping_sub(1);
    bus.write_byte(regs.sp, value as u8);
}

fn pop(regs: &mut Registers, bus: &mut dyn Bus) -> u16 {
    let low = bus.read_byte(regs.sp);
    regs.sp = regs.sp.wrapping_add(1);
    let high = bus.read_byte(regs.sp);
    regs.sp = regs.sp.wrapping_add(1);
    ((high as u16) << 8) | low as u16
}

/// The shared 3-bit ALU selector: add/adc/sub/sbc/and/xor/or/cp.
fn alu_op(r: Registers, op: u8, operand: u8) -> Registers {
    match op {
        0 => alu::add8(r, operand, false),
        1 => alu::add8(r, operand, true),
        2 => alu::sub8(r, operand, false),
        3 => alu::sub8(r, operand, true),
        4 => alu::and(r, operand),
        5 => alu::xor(r, operand),
        6 => alu::or(r, operand),
        _ => alu::compare(r, operand),
    }
}

/// Flag rule shared by `add sp,i8` and `ld hl,sp+i8`: H and C come from the
/// unsigned byte add on the low byte; Z and N are always clear.
fn sp_offset_flags(regs: &mut Registers, operand: i8) -> u16 {
    let unsigned = operand as u8;
    regs.set_flag_z(false);
    regs.set_flag_n(false);
    regs.set_flag_h(((regs.sp & 0x0F) + (unsigned & 0x0F) as u16) & 0x10 != 0);
    regs.set_flag_c(((regs.sp & 0xFF) + unsigned as u16) & 0x100 != 0);
    regs.sp.wrapping_add_signed(operand as i16)
}
