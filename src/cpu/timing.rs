//! Base cycle costs, indexed by opcode and table.
//!
//! The tables come from an external JSON document with one 256-entry array
//! per instruction namespace. A copy of the DMG tables ships with the crate.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

const DMG_CYCLES: &str = include_str!("../../data/cycles.json");

#[derive(Debug, Error)]
pub enum TimingError {
    #[error("failed to read timing table: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse timing table: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{name} must have 256 entries, got {len}")]
    BadLength { name: &'static str, len: usize },
}

#[derive(Deserialize)]
struct RawTables {
    #[serde(rename = "UnprefixedTCycles")]
    unprefixed: Vec<u32>,
    #[serde(rename = "CBPrefixedTCycles")]
    prefixed: Vec<u32>,
}

/// Base T-cycle cost per opcode; taken-branch penalties come from the
/// handlers, not from here.
#[derive(Debug, Clone)]
pub struct TimingTable {
    unprefixed: Box<[u32; 256]>,
    prefixed: Box<[u32; 256]>,
}

impl TimingTable {
    pub fn from_json(text: &str) -> Result<TimingTable, TimingError> {
        let raw: RawTables = serde_json::from_str(text)?;
        Ok(TimingTable {
            unprefixed: fixed_len("UnprefixedTCycles", raw.unprefixed)?,
            prefixed: fixed_len("CBPrefixedTCycles", raw.prefixed)?,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<TimingTable, TimingError> {
        TimingTable::from_json(&fs::read_to_string(path)?)
    }

    /// The stock DMG tables bundled with the crate.
    pub fn dmg() -> TimingTable {
        TimingTable::from_json(DMG_CYCLES).expect("bundled cycles.json is valid")
    }

    pub fn base(&self, table: usize, opcode: u8) -> u32 {
        match table {
            0 => self.unprefixed[opcode as usize],
            _ => self.prefixed[opcode as usize],
        }
    }
}

fn fixed_len(name: &'static str, values: Vec<u32>) -> Result<Box<[u32; 256]>, TimingError> {
    let len = values.len();
    values
        .into_boxed_slice()
        .try_into()
        .map_err(|_| TimingError::BadLength { name, len })
}
