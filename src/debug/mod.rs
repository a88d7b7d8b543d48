pub mod disasm;

pub use disasm::Disassembler;
