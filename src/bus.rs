/// The memory capability the CPU core consumes. Address decoding, I/O
/// registers and banking are entirely the implementor's business.
pub trait Bus {
    fn read_byte(&self, address: u16) -> u8;
    fn write_byte(&mut self, address: u16, value: u8);
}

/// A flat 64 KiB address space with no mapping at all. Enough to run raw
/// instruction streams in tests and the headless runner.
pub struct BasicBus {
    pub data: Box<[u8; 0x1_0000]>,
}

impl BasicBus {
    pub fn new() -> BasicBus {
        BasicBus {
            data: Box::new([0; 0x1_0000]),
        }
    }

    /// Copies `bytes` into memory starting at `origin`, wrapping at the top.
    pub fn load(&mut self, origin: u16, bytes: &[u8]) {
        let mut address = origin;
        for &byte in bytes {
            self.data[address as usize] = byte;
            address = address.wrapping_add(1);
        }
    }
}

impl Bus for BasicBus {
    fn read_byte(&self, address: u16) -> u8 {
        self.data[address as usize]
    }

    fn write_byte(&mut self, address: u16, value: u8) {
        self.data[address as usize] = value;
    }
}

impl Default for BasicBus {
    fn default() -> Self {
        BasicBus::new()
    }
}
