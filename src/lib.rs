//! A Game Boy (DMG) CPU core built around bit-pattern opcode templates.
//!
//! Instructions are registered against 8-character templates describing the
//! opcode byte MSB-first. `0` and `1` are fixed bits; any lowercase letter
//! opens a named variable field covering a contiguous run of that letter:
//!
//! ```text
//! "01dddsss"   ld r8,r8   d = destination field, s = source field
//! "00100010"   ld (hl+),a fully constant
//! ```
//!
//! A byte matches a template when its fixed bits agree, and a field's value is
//! the byte masked to the field and shifted right-justified. Templates are
//! kept in a specificity forest, so a fully-constant template always beats an
//! overlapping wildcard one and registration order never matters. The same
//! tables drive both execution ([`cpu::Interpreter`]) and mnemonic generation
//! ([`debug::Disassembler`]).
//!
//! ```no_run
//! use std::sync::Arc;
//! use dmg_core::bus::BasicBus;
//! use dmg_core::cpu::{Interpreter, Processor, TimingTable};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut bus = BasicBus::new();
//! bus.load(0x0100, &[0x3E, 0x05, 0xC6, 0x03]); // ld a,5 ; add a,3
//! let interpreter = Arc::new(Interpreter::dmg()?);
//! let mut proc = Processor::post_boot(bus, interpreter, TimingTable::dmg());
//! proc.step()?;
//! proc.step()?;
//! assert_eq!(proc.registers.a, 0x08);
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod config;
pub mod cpu;
pub mod debug;
pub mod decoder;

pub use bus::{BasicBus, Bus};
pub use cpu::{ExecError, Interpreter, Processor, Registers, TimingTable};
pub use decoder::{BytePattern, DecodeError, DispatchTable, Lookup, PatternError};
