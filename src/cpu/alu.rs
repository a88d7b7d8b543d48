//! Arithmetic, logic, rotate/shift and BCD primitives.
//!
//! Every function is a pure state transition: registers in by value, updated
//! registers out. Operations with a memory operand take the raw byte and hand
//! the transformed byte back; none of them touch the bus.

use super::registers::{Registers, R8, R16};

pub(crate) fn get_bit(value: u8, bit: u8) -> bool {
    value & (1 << bit) != 0
}

pub(crate) fn set_bit(value: u8, bit: u8, on: bool) -> u8 {
    if on {
        value | (1 << bit)
    } else {
        value & !(1 << bit)
    }
}

/// A += value (+ stored carry when `with_carry`). Z 0 H C.
pub fn add8(mut r: Registers, value: u8, with_carry: bool) -> Registers {
    let carry_in = (with_carry && r.flag_c()) as u8;
    let total = r.a as u16 + carry_in as u16 + value as u16;

    r.set_flag_z(total & 0xFF == 0);
    r.set_flag_n(false);
    r.set_flag_h(((r.a & 0x0F) + carry_in + (value & 0x0F)) & 0x10 != 0);
    r.set_flag_c(total & 0x100 != 0);

    r.a = total as u8;
    r
}

/// A -= value (+ stored carry as borrow when `with_carry`). Z 1 H C.
pub fn sub8(mut r: Registers, value: u8, with_carry: bool) -> Registers {
    let carry_in = (with_carry && r.flag_c()) as u8;
    let total = (r.a as i16) - (value as i16) - (carry_in as i16);

    r.set_flag_z(total & 0xFF == 0);
    r.set_flag_n(true);
    r.set_flag_h(((r.a & 0x0F) as i16 - ((value & 0x0F) as i16 + carry_in as i16)) & 0x10 != 0);
    r.set_flag_c(total < 0);

    r.a = total as u8;
    r
}

/// CP: subtraction flags without the A update.
pub fn compare(mut r: Registers, value: u8) -> Registers {
    let sub = sub8(r, value, false);
    r.set_f(sub.f());
    r
}

/// INC on a raw byte. Add-style flags on a synthetic +1, C untouched.
pub fn inc_value(r: Registers, value: u8) -> (Registers, u8) {
    let mut scratch = r;
    scratch.a = value;
    scratch = add8(scratch, 1, false);
    scratch.set_flag_c(r.flag_c());

    let mut out = r;
    out.set_f(scratch.f());
    (out, scratch.a)
}

pub fn inc(r: Registers, target: R8) -> Registers {
    let (mut r, result) = inc_value(r, r.get8(target));
    r.set8(target, result);
    r
}

/// DEC on a raw byte. Sub-style flags on a synthetic -1, C untouched.
pub fn dec_value(r: Registers, value: u8) -> (Registers, u8) {
    let mut scratch = r;
    scratch.a = value;
    scratch = sub8(scratch, 1, false);
    scratch.set_flag_c(r.flag_c());

    let mut out = r;
    out.set_f(scratch.f());
    (out, scratch.a)
}

pub fn dec(r: Registers, target: R8) -> Registers {
    let (mut r, result) = dec_value(r, r.get8(target));
    r.set8(target, result);
    r
}

/// AND always sets H. Z 0 1 0.
pub fn and(mut r: Registers, value: u8) -> Registers {
    r.a &= value;
    r.set_f(if r.a == 0 { 0b1010_0000 } else { 0b0010_0000 });
    r
}

pub fn or(mut r: Registers, value: u8) -> Registers {
    r.a |= value;
    r.set_f(if r.a == 0 { 0b1000_0000 } else { 0 });
    r
}

pub fn xor(mut r: Registers, value: u8) -> Registers {
    r.a ^= value;
    r.set_f(if r.a == 0 { 0b1000_0000 } else { 0 });
    r
}

/// Bitwise complement of A. - 1 1 -.
pub fn cpl(mut r: Registers) -> Registers {
    r.a = !r.a;
    r.set_flag_n(true);
    r.set_flag_h(true);
    r
}

/// BIT: tests one bit without mutating the operand. !bit 0 1 -.
pub fn bit_test(mut r: Registers, value: u8, bit: u8) -> Registers {
    r.set_flag_z(!get_bit(value, bit));
    r.set_flag_n(false);
    r.set_flag_h(true);
    r
}

/// Rotate left through carry. The accumulator form (RLA) passes
/// `set_z = false`: hardware forces Z clear there.
pub fn rl_value(mut r: Registers, value: u8, set_z: bool) -> (Registers, u8) {
    let wide = ((value as u16) << 1) | r.flag_c() as u16;
    let value = wide as u8;

    r.set_flag_z(value == 0 && set_z);
    r.set_flag_n(false);
    r.set_flag_h(false);
    r.set_flag_c(wide & 0x100 != 0);

    (r, value)
}

pub fn rl(r: Registers, target: R8, set_z: bool) -> Registers {
    let (mut r, result) = rl_value(r, r.get8(target), set_z);
    r.set8(target, result);
    r
}

/// Rotate left circular.
pub fn rlc_value(mut r: Registers, value: u8, set_z: bool) -> (Registers, u8) {
    r.set_flag_c(value >= 0x80);

    let value = (value >> 7) | (value << 1);

    r.set_flag_z(value == 0 && set_z);
    r.set_flag_n(false);
    r.set_flag_h(false);

    (r, value)
}

pub fn rlc(r: Registers, target: R8, set_z: bool) -> Registers {
    let (mut r, result) = rlc_value(r, r.get8(target), set_z);
    r.set8(target, result);
    r
}

/// Rotate right through carry.
pub fn rr_value(mut r: Registers, value: u8, set_z: bool) -> (Registers, u8) {
    let carry_out = value & 1 != 0;

    let value = (value >> 1) | if r.flag_c() { 0x80 } else { 0 };

    r.set_flag_z(value == 0 && set_z);
    r.set_flag_n(false);
    r.set_flag_h(false);
    r.set_flag_c(carry_out);

    (r, value)
}

pub fn rr(r: Registers, target: R8, set_z: bool) -> Registers {
    let (mut r, result) = rr_value(r, r.get8(target), set_z);
    r.set8(target, result);
    r
}

/// Rotate right circular.
pub fn rrc_value(mut r: Registers, value: u8, set_z: bool) -> (Registers, u8) {
    r.set_flag_c(value & 1 != 0);

    let value = (value >> 1) | (value << 7);

    r.set_flag_z(value == 0 && set_z);
    r.set_flag_n(false);
    r.set_flag_h(false);

    (r, value)
}

pub fn rrc(r: Registers, target: R8, set_z: bool) -> Registers {
    let (mut r, result) = rrc_value(r, r.get8(target), set_z);
    r.set8(target, result);
    r
}

/// Shift left arithmetic: bit 0 becomes zero.
pub fn sla_value(mut r: Registers, value: u8) -> (Registers, u8) {
    r.set_flag_c(get_bit(value, 7));

    let value = value << 1;

    r.set_flag_z(value == 0);
    r.set_flag_n(false);
    r.set_flag_h(false);

    (r, value)
}

pub fn sla(r: Registers, target: R8) -> Registers {
    let (mut r, result) = sla_value(r, r.get8(target));
    r.set8(target, result);
    r
}

/// Shift right arithmetic: the sign bit is preserved.
pub fn sra_value(mut r: Registers, value: u8) -> (Registers, u8) {
    r.set_flag_c(get_bit(value, 0));

    let value = (value & 0x80) | (value >> 1);

    r.set_flag_z(value == 0);
    r.set_flag_n(false);
    r.set_flag_h(false);

    (r, value)
}

pub fn sra(r: Registers, target: R8) -> Registers {
    let (mut r, result) = sra_value(r, r.get8(target));
    r.set8(target, result);
    r
}

/// Shift right logical: bit 7 becomes zero.
pub fn srl_value(mut r: Registers, value: u8) -> (Registers, u8) {
    r.set_flag_c(get_bit(value, 0));

    let value = value >> 1;

    r.set_flag_z(value == 0);
    r.set_flag_n(false);
    r.set_flag_h(false);

    (r, value)
}

pub fn srl(r: Registers, target: R8) -> Registers {
    let (mut r, result) = srl_value(r, r.get8(target));
    r.set8(target, result);
    r
}

/// Nibble swap. Z 0 0 0.
pub fn swap_value(mut r: Registers, value: u8) -> (Registers, u8) {
    let value = (value << 4) | (value >> 4);
    r.set_f(if value == 0 { 0b1000_0000 } else { 0 });
    (r, value)
}

pub fn swap(r: Registers, target: R8) -> Registers {
    let (mut r, result) = swap_value(r, r.get8(target));
    r.set8(target, result);
    r
}

/// Decimal-adjust A after a BCD add or subtract. The correction direction
/// depends on the N flag left by the previous operation. Z - 0 C.
pub fn daa(mut r: Registers) -> Registers {
    let mut correction = 0u8;
    let mut carry_out = false;

    if r.flag_h() || (!r.flag_n() && (r.a & 0x0F) > 9) {
        correction |= 0x06;
    }
    if r.flag_c() || (!r.flag_n() && r.a > 0x99) {
        correction |= 0x60;
        carry_out = true;
    }

    r.a = if r.flag_n() {
        r.a.wrapping_sub(correction)
    } else {
        r.a.wrapping_add(correction)
    };

    r.set_flag_z(r.a == 0);
    r.set_flag_h(false);
    r.set_flag_c(carry_out);

    r
}

/// HL += r16. Z untouched; H is carry out of bit 11, C out of bit 15.
pub fn add16(mut r: Registers, source: R16) -> Registers {
    let operand = r.get16(source);
    let total = r.hl() as u32 + operand as u32;

    r.set_flag_n(false);
    r.set_flag_h(((r.hl() & 0x0FFF) + (operand & 0x0FFF)) & 0x1000 != 0);
    r.set_flag_c(total & 0x1_0000 != 0);

    r.set_hl(total as u16);
    r
}
