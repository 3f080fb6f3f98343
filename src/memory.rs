//! Simulated address space and memory map

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::WORD_SIZE;

/// Size of the addressable memory in bytes
pub const MEM_SIZE: u32 = 0x0100_0000;

/// Load address of program text
pub const TEXT_START: u32 = 0x0000_1000;

/// First word of the input window
pub const INPUT_START: u32 = 0x0008_0000;

/// Last word of the input window (inclusive)
pub const INPUT_END: u32 = 0x000B_FFFC;

/// Word-granular memory as seen by the sandbox hooks
pub trait AddressSpace {
    fn load(&self, addr: u32) -> Result<u32>;

    fn store(&mut self, addr: u32, word: u32) -> Result<()>;
}

/// Placement of the input window
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryLayout {
    pub input_start: u32,
    /// Address of the last input word, inclusive
    pub input_end: u32,
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self {
            input_start: INPUT_START,
            input_end: INPUT_END,
        }
    }
}

impl MemoryLayout {
    pub fn validate(&self) -> Result<()> {
        if self.input_start % WORD_SIZE as u32 != 0 || self.input_end % WORD_SIZE as u32 != 0 {
            return Err(Error::Config(format!(
                "input window [{:#010x}, {:#010x}] is not word aligned",
                self.input_start, self.input_end
            )));
        }
        if self.input_start > self.input_end {
            return Err(Error::Config(format!(
                "input window start {:#010x} is past its end {:#010x}",
                self.input_start, self.input_end
            )));
        }
        if self.input_end >= MEM_SIZE {
            return Err(Error::Config(format!(
                "input window end {:#010x} is outside memory ({MEM_SIZE:#010x} bytes)",
                self.input_end
            )));
        }
        Ok(())
    }

    /// Number of words the input window holds
    pub fn input_capacity(&self) -> usize {
        ((self.input_end - self.input_start) / WORD_SIZE as u32) as usize + 1
    }
}

/// Sparse memory image, zero where never written
#[derive(Clone, Debug, Default)]
pub struct Memory {
    words: HashMap<u32, u32>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(addr: u32) -> Result<()> {
        if addr >= MEM_SIZE {
            return Err(Error::circuit(format!("memory fault at {addr:#010x}")));
        }
        if addr % WORD_SIZE as u32 != 0 {
            return Err(Error::circuit(format!("misaligned word access at {addr:#010x}")));
        }
        Ok(())
    }

    pub fn load_u8(&self, addr: u32) -> Result<u8> {
        let word = self.load(addr & !3)?;
        Ok((word >> (8 * (addr & 3))) as u8)
    }

    pub fn store_u8(&mut self, addr: u32, value: u8) -> Result<()> {
        let base = addr & !3;
        let shift = 8 * (addr & 3);
        let word = self.load(base)?;
        let word = (word & !(0xff << shift)) | (value as u32) << shift;
        self.store(base, word)
    }

    pub fn load_region(&self, addr: u32, len: u32) -> Result<Vec<u8>> {
        let end = addr
            .checked_add(len)
            .filter(|end| *end <= MEM_SIZE)
            .ok_or_else(|| Error::circuit(format!("region {addr:#010x}+{len} is outside memory")))?;
        (addr..end).map(|a| self.load_u8(a)).collect()
    }

    pub fn store_region(&mut self, addr: u32, bytes: &[u8]) -> Result<()> {
        for (a, byte) in (addr..).zip(bytes) {
            self.store_u8(a, *byte)?;
        }
        Ok(())
    }

    /// Number of words ever written
    pub fn touched(&self) -> usize {
        self.words.len()
    }
}

impl AddressSpace for Memory {
    fn load(&self, addr: u32) -> Result<u32> {
        Self::check(addr)?;
        Ok(self.words.get(&addr).copied().unwrap_or(0))
    }

    fn store(&mut self, addr: u32, word: u32) -> Result<()> {
        Self::check(addr)?;
        self.words.insert(addr, word);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn default_layout_is_valid() {
        let layout = MemoryLayout::default();
        layout.validate().unwrap();
        assert_eq!(layout.input_capacity(), 0x10000);
    }

    #[test]
    fn layout_rejects_bad_windows() {
        let unaligned = MemoryLayout { input_start: 0x1002, input_end: 0x2000 };
        assert_eq!(unaligned.validate().unwrap_err().kind(), ErrorKind::Config);
        let inverted = MemoryLayout { input_start: 0x2000, input_end: 0x1000 };
        assert_eq!(inverted.validate().unwrap_err().kind(), ErrorKind::Config);
        let outside = MemoryLayout { input_start: 0x1000, input_end: MEM_SIZE };
        assert_eq!(outside.validate().unwrap_err().kind(), ErrorKind::Config);
    }

    #[test]
    fn byte_access_is_little_endian() {
        let mut mem = Memory::new();
        mem.store(0x100, 0x0403_0201).unwrap();
        assert_eq!(mem.load_u8(0x102).unwrap(), 3);
        mem.store_u8(0x103, 0xaa).unwrap();
        assert_eq!(mem.load(0x100).unwrap(), 0xaa03_0201);
        mem.store_region(0x105, b"xyz").unwrap();
        assert_eq!(mem.load_region(0x105, 3).unwrap(), b"xyz");
    }

    #[test]
    fn faults_are_reported() {
        let mut mem = Memory::new();
        assert!(mem.store(MEM_SIZE, 1).is_err());
        assert!(mem.load(0x101).is_err());
        assert!(mem.load_region(MEM_SIZE - 2, 4).is_err());
        assert_eq!(mem.load(0x200).unwrap(), 0);
    }
}
