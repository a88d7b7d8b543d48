/// 8-bit register identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum R8 {
    A,
    B,
    C,
    D,
    E,
    F,
    H,
    L,
}

/// 16-bit register identifiers, including the composed pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum R16 {
    AF,
    BC,
    DE,
    HL,
    Sp,
    Pc,
}

pub const BIT_Z: u8 = 7;
pub const BIT_N: u8 = 6;
pub const BIT_H: u8 = 5;
pub const BIT_C: u8 = 4;

/// The CPU register file. A plain value type: primitives take it by value and
/// hand back the updated copy, so no two operations ever alias it.
///
/// The low nibble of F does not exist in hardware; every path that writes F
/// masks it away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    f: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
}

impl Registers {
    pub fn new() -> Registers {
        Registers::default()
    }

    pub fn f(&self) -> u8 {
        self.f
    }

    pub fn set_f(&mut self, value: u8) {
        self.f = value & 0xF0;
    }

    // Composed 16-bit pairs, high:low.
    pub fn af(&self) -> u16 {
        ((self.a as u16) << 8) | (self.f as u16)
    }

    pub fn set_af(&mut self, value: u16) {
        self.a = (value >> 8) as u8;
        self.set_f(value as u8);
    }

    pub fn bc(&self) -> u16 {
        ((self.b as u16) << 8) | (self.c as u16)
    }

    pub fn set_bc(&mut self, value: u16) {
        self.b = (value >> 8) as u8;
        self.c = value as u8;
    }

    pub fn de(&self) -> u16 {
        ((self.d as u16) << 8) | (self.e as u16)
    }

    pub fn set_de(&mut self, value: u16) {
        self.d = (value >> 8) as u8;
        self.e = value as u8;
    }

    pub fn hl(&self) -> u16 {
        ((self.h as u16) << 8) | (self.l as u16)
    }

    pub fn set_hl(&mut self, value: u16) {
        self.h = (value >> 8) as u8;
        self.l = value as u8;
    }

    // Flags live in the high nibble of F: Z N H C.
    pub fn flag_z(&self) -> bool {
        self.f & (1 << BIT_Z) != 0
    }

    pub fn set_flag_z(&mut self, value: bool) {
        self.set_flag(BIT_Z, value);
    }

    pub fn flag_n(&self) -> bool {
        self.f & (1 << BIT_N) != 0
    }

    pub fn set_flag_n(&mut self, value: bool) {
        self.set_flag(BIT_N, value);
    }

    pub fn flag_h(&self) -> bool {
        self.f & (1 << BIT_H) != 0
    }

    pub fn set_flag_h(&mut self, value: bool) {
        self.set_flag(BIT_H, value);
    }

    pub fn flag_c(&self) -> bool {
        self.f & (1 << BIT_C) != 0
    }

    pub fn set_flag_c(&mut self, value: bool) {
        self.set_flag(BIT_C, value);
    }

    fn set_flag(&mut self, bit: u8, value: bool) {
        if value {
            self.f |= 1 << bit;
        } else {
            self.f &= !(1 << bit);
        }
    }

    pub fn get8(&self, reg: R8) -> u8 {
        match reg {
            R8::A => self.a,
            R8::B => self.b,
            R8::C => self.c,
            R8::D => self.d,
            R8::E => self.e,
            R8::F => self.f,
            R8::H => self.h,
            R8::L => self.l,
        }
    }

    pub fn set8(&mut self, reg: R8, value: u8) {
        match reg {
            R8::A => self.a = value,
            R8::B => self.b = value,
            R8::C => self.c = value,
            R8::D => self.d = value,
            R8::E => self.e = value,
            R8::F => self.set_f(value),
            R8::H => self.h = value,
            R8::L => self.l = value,
        }
    }

    pub fn get16(&self, reg: R16) -> u16 {
        match reg {
            R16::AF => self.af(),
            R16::BC => self.bc(),
            R16::DE => self.de(),
            R16::HL => self.hl(),
            R16::Sp => self.sp,
            R16::Pc => self.pc,
        }
    }

    pub fn set16(&mut self, reg: R16, value: u16) {
        match reg {
            R16::AF => self.set_af(value),
            R16::BC => self.set_bc(value),
            R16::DE => self.set_de(value),
            R16::HL => self.set_hl(value),
            R16::Sp => self.sp = value,
            R16::Pc => self.pc = value,
        }
    }
}
