pub mod alu;
pub mod interpreter;
pub mod operands;
pub mod registers;
pub mod timing;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use thiserror::Error;
use tracing::trace;

use crate::bus::Bus;

pub use interpreter::{Handler, Interpreter};
pub use registers::{Registers, R8, R16};
pub use timing::{TimingError, TimingTable};

/// The escape byte that selects the second instruction table.
pub const CB_PREFIX: u8 = 0xCB;

#[derive(Debug, Error)]
pub enum ExecError {
    /// No registered template matches the opcode: the table is incomplete.
    #[error("no template matches opcode {opcode:#04x} in table {table}")]
    Coverage { opcode: u8, table: usize },
    /// A deliberately stubbed instruction was reached.
    #[error("opcode {opcode:#04x} ({name}) is not implemented")]
    Unimplemented { opcode: u8, name: &'static str },
    /// An umbrella template was the final decode result: its range is not
    /// fully covered by more specific templates.
    #[error("umbrella template \"{pattern}\" reached dispatch for opcode {opcode:#04x}")]
    UnreachableGroup { pattern: String, opcode: u8 },
}

/// Fetch/decode/execute scheduler. An instruction's side effects land
/// atomically on the tick that fetches it; the remaining cycles of its cost
/// are burned as an idle countdown before the next fetch, so an observer
/// polling mid-countdown already sees the post-instruction state.
pub struct Processor<B: Bus> {
    pub registers: Registers,
    bus: B,
    interpreter: Arc<Interpreter>,
    timing: TimingTable,
    countdown: u32,
    cycles: u64,
}

impl<B: Bus> Processor<B> {
    pub fn new(bus: B, interpreter: Arc<Interpreter>, timing: TimingTable) -> Processor<B> {
        Processor {
            registers: Registers::new(),
            bus,
            interpreter,
            timing,
            countdown: 0,
            cycles: 0,
        }
    }

    /// A processor preset to the DMG post-boot register state, entry at
    /// 0x0100.
    pub fn post_boot(bus: B, interpreter: Arc<Interpreter>, timing: TimingTable) -> Processor<B> {
        let mut proc = Processor::new(bus, interpreter, timing);
        proc.registers.set_af(0x01B0);
        proc.registers.set_bc(0x0013);
        proc.registers.set_de(0x00D8);
        proc.registers.set_hl(0x014D);
        proc.registers.sp = 0xFFFE;
        proc.registers.pc = 0x0100;
        proc
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Elapsed T-cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn mid_instruction(&self) -> bool {
        self.countdown > 0
    }

    /// Advances one T-cycle: burns a countdown cycle, or fetches and executes
    /// the next instruction. 0xCB escapes into table 1.
    pub fn tick(&mut self) -> Result<(), ExecError> {
        self.cycles += 1;
        if self.countdown > 0 {
            self.countdown -= 1;
            return Ok(());
        }

        let pc = self.registers.pc;
        let mut opcode = self.fetch();
        let table = if opcode == CB_PREFIX {
            opcode = self.fetch();
            1
        } else {
            0
        };
        trace!(target: "dmg_core::cpu", pc, opcode, table, "execute");

        let extra = self
            .interpreter
            .execute(&mut self.registers, &mut self.bus, opcode, table)?;
        let cost = self.timing.base(table, opcode) + extra;
        // The fetch tick is the first cycle of the instruction.
        self.countdown = cost.saturating_sub(1);
        Ok(())
    }

    /// Runs exactly one instruction (draining any pending countdown first)
    /// and returns its total cycle cost.
    pub fn step(&mut self) -> Result<u32, ExecError> {
        while self.countdown > 0 {
            self.tick()?;
        }
        let before = self.cycles;
        self.tick()?;
        while self.countdown > 0 {
            self.tick()?;
        }
        Ok((self.cycles - before) as u32)
    }

    fn fetch(&mut self) -> u8 {
        let byte = self.bus.read_byte(self.registers.pc);
        self.registers.pc = self.registers.pc.wrapping_add(1);
        byte
    }
}
