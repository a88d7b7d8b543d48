//! Pattern-driven mnemonic generation.
//!
//! The disassembler is the second consumer of the dispatch tables: the same
//! templates as the interpreter, with a name generator per template instead of
//! a handler. Spellings follow the common dmgops naming (`ld (hl+),a`,
//! `jr nz,i8`, ...), lowercase.

use crate::cpu::ExecError;
use crate::decoder::{BytePattern, DecodeError, DispatchTable, Lookup};

pub type NameFn = Box<dyn Fn(&BytePattern, u8) -> String + Send + Sync>;

pub struct Disassembler {
    tables: [DispatchTable<NameFn>; 2],
}

fn r16a(index: u8) -> &'static str {
    ["bc", "de", "hl", "sp"][index as usize]
}

/// Indirect-load bank: slots 2 and 3 are the post-increment/-decrement forms.
fn r16b(index: u8) -> &'static str {
    ["bc", "de", "hl+", "hl-"][index as usize]
}

fn r16c(index: u8) -> &'static str {
    ["bc", "de", "hl", "af"][index as usize]
}

fn r8(index: u8) -> &'static str {
    ["b", "c", "d", "e", "h", "l", "(hl)", "a"][index as usize]
}

fn cc(index: u8) -> &'static str {
    ["nz", "z", "nc", "c"][index as usize]
}

impl Disassembler {
    fn add<F>(&mut self, table: usize, text: &str, name: F) -> Result<(), DecodeError>
    where
        F: Fn(&BytePattern, u8) -> String + Send + Sync + 'static,
    {
        self.tables[table].add(text, Box::new(name))
    }

    fn add_fixed(&mut self, table: usize, text: &str, name: &'static str) -> Result<(), DecodeError> {
        self.add(table, text, move |_, _| name.to_string())
    }

    /// The mnemonic a byte decodes to. An umbrella match or a miss is the
    /// same table-construction failure the interpreter would report.
    pub fn name(&self, opcode: u8, table: usize) -> Result<String, ExecError> {
        match self.tables[table].find(opcode) {
            Lookup::Miss => Err(ExecError::Coverage { opcode, table }),
            Lookup::Group(pattern) => Err(ExecError::UnreachableGroup {
                pattern: pattern.text().to_string(),
                opcode,
            }),
            Lookup::Hit(pattern, generate) => Ok(generate(pattern, opcode)),
        }
    }

    pub fn dmg() -> Result<Disassembler, DecodeError> {
        let mut d = Disassembler {
            tables: [DispatchTable::new(), DispatchTable::new()],
        };

        // ===== Primary table =====
        d.tables[0].add_group("00xxxxxx")?;
        d.add_fixed(0, "00000000", "nop")?;
        d.add(0, "00dd0001", |p, o| format!("ld {},u16", r16a(p.extract('d', o))))?;
        d.add(0, "00dd0010", |p, o| format!("ld ({}),a", r16b(p.extract('d', o))))?;
        d.add(0, "00ss1010", |p, o| format!("ld a,({})", r16b(p.extract('s', o))))?;
        d.add_fixed(0, "00001000", "ld (u16),sp")?;
        d.add(0, "00oo0011", |p, o| format!("inc {}", r16a(p.extract('o', o))))?;
        d.add(0, "00oo1011", |p, o| format!("dec {}", r16a(p.extract('o', o))))?;
        d.add(0, "00oo1001", |p, o| format!("add hl,{}", r16a(p.extract('o', o))))?;
        d.add(0, "00ooo100", |p, o| format!("inc {}", r8(p.extract('o', o))))?;
        d.add(0, "00ooo101", |p, o| format!("dec {}", r8(p.extract('o', o))))?;
        d.add(0, "00ddd110", |p, o| format!("ld {},u8", r8(p.extract('d', o))))?;
        d.add_fixed(0, "00000111", "rlca")?;
        d.add_fixed(0, "00001111", "rrca")?;
        d.add_fixed(0, "00010111", "rla")?;
        d.add_fixed(0, "00011111", "rra")?;
        d.add_fixed(0, "00100111", "daa")?;
        d.add_fixed(0, "00101111", "cpl")?;
        d.add_fixed(0, "00110111", "scf")?;
        d.add_fixed(0, "00111111", "ccf")?;
        d.add_fixed(0, "00011000", "jr i8")?;
        d.add(0, "001cc000", |p, o| format!("jr {},i8", cc(p.extract('c', o))))?;
        d.add_fixed(0, "00010000", "stop")?;

        d.add(0, "01dddsss", |p, o| {
            format!("ld {},{}", r8(p.extract('d', o)), r8(p.extract('s', o)))
        })?;
        d.add_fixed(0, "01110110", "halt")?;

        d.tables[0].add_group("10xxxxxx")?;
        d.add(0, "10000xxx", |p, o| format!("add a,{}", r8(p.extract('x', o))))?;
        d.add(0, "10001xxx", |p, o| format!("adc a,{}", r8(p.extract('x', o))))?;
        d.add(0, "10010xxx", |p, o| format!("sub a,{}", r8(p.extract('x', o))))?;
        d.add(0, "10011xxx", |p, o| format!("sbc a,{}", r8(p.extract('x', o))))?;
        d.add(0, "10100xxx", |p, o| format!("and a,{}", r8(p.extract('x', o))))?;
        d.add(0, "10101xxx", |p, o| format!("xor a,{}", r8(p.extract('x', o))))?;
        d.add(0, "10110xxx", |p, o| format!("or a,{}", r8(p.extract('x', o))))?;
        d.add(0, "10111xxx", |p, o| format!("cp a,{}", r8(p.extract('x', o))))?;

        // The block-3 holes have no instruction behind them; the catch-all
        // spells them the way the reference opcode list does.
        d.add_fixed(0, "11xxxxxx", "unused")?;
        d.add_fixed(0, "11000110", "add a,u8")?;
        d.add_fixed(0, "11001110", "adc a,u8")?;
        d.add_fixed(0, "11010110", "sub a,u8")?;
        d.add_fixed(0, "11011110", "sbc a,u8")?;
        d.add_fixed(0, "11100110", "and a,u8")?;
        d.add_fixed(0, "11101110", "xor a,u8")?;
        d.add_fixed(0, "11110110", "or a,u8")?;
        d.add_fixed(0, "11111110", "cp a,u8")?;
        d.add(0, "110cc000", |p, o| format!("ret {}", cc(p.extract('c', o))))?;
        d.add_fixed(0, "11001001", "ret")?;
        d.add_fixed(0, "11011001", "reti")?;
        d.add(0, "110cc010", |p, o| format!("jp {},u16", cc(p.extract('c', o))))?;
        d.add_fixed(0, "11000011", "jp u16")?;
        d.add_fixed(0, "11101001", "jp hl")?;
        d.add(0, "110cc100", |p, o| format!("call {},u16", cc(p.extract('c', o))))?;
        d.add_fixed(0, "11001101", "call u16")?;
        d.add(0, "11vvv111", |p, o| {
            format!("rst {:02x}h", p.extract('v', o) as u16 * 8)
        })?;
        d.add(0, "11rr0001", |p, o| format!("pop {}", r16c(p.extract('r', o))))?;
        d.add(0, "11rr0101", |p, o| format!("push {}", r16c(p.extract('r', o))))?;
        d.add_fixed(0, "11001011", "prefix cb")?;
        d.add_fixed(0, "11100010", "ld (ff00+c),a")?;
        d.add_fixed(0, "11100000", "ld (ff00+u8),a")?;
        d.add_fixed(0, "11101010", "ld (u16),a")?;
        d.add_fixed(0, "11110010", "ld a,(ff00+c)")?;
        d.add_fixed(0, "11110000", "ld a,(ff00+u8)")?;
        d.add_fixed(0, "11111010", "ld a,(u16)")?;
        d.add_fixed(0, "11101000", "add sp,i8")?;
        d.add_fixed(0, "11111000", "ld hl,sp+i8")?;
        d.add_fixed(0, "11111001", "ld sp,hl")?;
        d.add_fixed(0, "11110011", "di")?;
        d.add_fixed(0, "11111011", "ei")?;

        // ===== CB-prefixed table =====
        d.tables[1].add_group("00xxxxxx")?;
        d.add(1, "00000rrr", |p, o| format!("rlc {}", r8(p.extract('r', o))))?;
        d.add(1, "00001rrr", |p, o| format!("rrc {}", r8(p.extract('r', o))))?;
        d.add(1, "00010rrr", |p, o| format!("rl {}", r8(p.extract('r', o))))?;
        d.add(1, "00011rrr", |p, o| format!("rr {}", r8(p.extract('r', o))))?;
        d.add(1, "00100rrr", |p, o| format!("sla {}", r8(p.extract('r', o))))?;
        d.add(1, "00101rrr", |p, o| format!("sra {}", r8(p.extract('r', o))))?;
        d.add(1, "00110rrr", |p, o| format!("swap {}", r8(p.extract('r', o))))?;
        d.add(1, "00111rrr", |p, o| format!("srl {}", r8(p.extract('r', o))))?;
        d.add(1, "01bbbrrr", |p, o| {
            format!("bit {},{}", p.extract('b', o), r8(p.extract('r', o)))
        })?;
        d.add(1, "10bbbrrr", |p, o| {
            format!("res {},{}", p.extract('b', o), r8(p.extract('r', o)))
        })?;
        d.add(1, "11bbbrrr", |p, o| {
            format!("set {},{}", p.extract('b', o), r8(p.extract('r', o)))
        })?;

        Ok(d)
    }
}
