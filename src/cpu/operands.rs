//! Decoded-field to operand lookups shared by the instruction handlers.

use super::registers::{Registers, R8, R16};

/// 3-bit register field. Index 6 is the `(hl)` slot; handlers route it to the
/// bus before ever calling this.
pub fn r8(index: u8) -> R8 {
    match index {
        0 => R8::B,
        1 => R8::C,
        2 => R8::D,
        3 => R8::E,
        4 => R8::H,
        5 => R8::L,
        7 => R8::A,
        _ => unreachable!("r8 index {} has no register", index),
    }
}

pub fn r16(index: u8) -> R16 {
    match index {
        0 => R16::BC,
        1 => R16::DE,
        2 => R16::HL,
        3 => R16::Sp,
        _ => unreachable!("r16 index {} out of range", index),
    }
}

/// The push/pop bank replaces SP with AF.
pub fn r16_stack(index: u8) -> R16 {
    match index {
        0 => R16::BC,
        1 => R16::DE,
        2 => R16::HL,
        3 => R16::AF,
        _ => unreachable!("r16 stack index {} out of range", index),
    }
}

/// The indirect-load bank; `hl+`/`hl-` have their own fully-constant opcodes.
pub fn r16_mem(index: u8) -> R16 {
    match index {
        0 => R16::BC,
        1 => R16::DE,
        _ => unreachable!("r16 mem index {} out of range", index),
    }
}

/// Condition codes: 0 = nz, 1 = z, 2 = nc, 3 = c.
pub fn condition(r: &Registers, cc: u8) -> bool {
    match cc {
        0 => !r.flag_z(),
        1 => r.flag_z(),
        2 => !r.flag_c(),
        3 => r.flag_c(),
        _ => unreachable!("condition code {} out of range", cc),
    }
}
