//! Program images and instruction decoding

use std::ops::Range;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};

use crate::code_id::CodeId;
use crate::error::{Error, Result};
use crate::memory::{MEM_SIZE, TEXT_START};
use crate::{sha256, WORD_SIZE};

/// Opcode constants (RV32I base plus ZK extensions)
pub mod opcodes {
    // R-type (register-register)
    pub const OP_ALU: u8 = 0b0110011;
    // I-type (immediate)
    pub const OP_ALU_IMM: u8 = 0b0010011;
    pub const OP_LOAD: u8 = 0b0000011;
    pub const OP_JALR: u8 = 0b1100111;
    // S-type (store)
    pub const OP_STORE: u8 = 0b0100011;
    // B-type (branch)
    pub const OP_BRANCH: u8 = 0b1100011;
    // U-type (upper immediate)
    pub const OP_LUI: u8 = 0b0110111;
    pub const OP_AUIPC: u8 = 0b0010111;
    // J-type (jump)
    pub const OP_JAL: u8 = 0b1101111;
    // ZK custom
    pub const OP_ZK_CUSTOM: u8 = 0b0001011;
    pub const OP_ZK_IO: u8 = 0b0101011;
    pub const OP_HALT: u8 = 0b1111111;
}

/// `funct3` selectors under `OP_ZK_IO`
pub mod io_funct {
    pub const WRITE: u8 = 0;
    pub const COMMIT: u8 = 1;
    pub const KEY: u8 = 2;
}

/// `funct3` selectors under `OP_ZK_CUSTOM`
pub mod custom_funct {
    pub const ASSERT_EQ: u8 = 0;
}

/// Flat program image, loaded at [`TEXT_START`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    image: Vec<u32>,
}

impl Program {
    pub fn new(image: Vec<u32>) -> Result<Self> {
        if image.is_empty() {
            return Err(Error::circuit("program image is empty"));
        }
        let size = image.len() as u64 * WORD_SIZE as u64;
        if TEXT_START as u64 + size > MEM_SIZE as u64 {
            return Err(Error::circuit(format!("program image of {size} bytes does not fit in memory")));
        }
        Ok(Self { image })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % WORD_SIZE != 0 {
            return Err(Error::circuit(format!(
                "program image length {} is not a multiple of {WORD_SIZE}",
                bytes.len()
            )));
        }
        let mut image = vec![0u32; bytes.len() / WORD_SIZE];
        LittleEndian::read_u32_into(bytes, &mut image);
        Self::new(image)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|err| Error::io(path, err))?;
        Self::from_bytes(&bytes)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes()).map_err(|err| Error::io(path, err))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.image.len() * WORD_SIZE];
        LittleEndian::write_u32_into(&self.image, &mut bytes);
        bytes
    }

    /// SHA-256 of the image bytes
    pub fn code_id(&self) -> CodeId {
        CodeId::new(sha256(&self.to_bytes()).to_vec())
    }

    pub fn entry(&self) -> u32 {
        TEXT_START
    }

    pub fn image(&self) -> &[u32] {
        &self.image
    }

    /// Addresses occupied by the image once loaded
    pub fn text_range(&self) -> Range<u32> {
        let start = self.entry();
        start..start + (self.image.len() * WORD_SIZE) as u32
    }
}

/// Decoded instruction fields. Fields a format does not use are zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub rd: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub funct3: u8,
    pub funct7: u8,
    pub imm: i32,
}

impl Instruction {
    pub fn decode(word: u32) -> Self {
        use opcodes::*;

        let opcode = (word & 0x7f) as u8;
        let rd = ((word >> 7) & 0x1f) as u8;
        let funct3 = ((word >> 12) & 0x7) as u8;
        let rs1 = ((word >> 15) & 0x1f) as u8;
        let rs2 = ((word >> 20) & 0x1f) as u8;
        let funct7 = (word >> 25) as u8;
        let signed = word as i32;

        match opcode {
            OP_ALU | OP_ZK_IO | OP_ZK_CUSTOM => Self {
                opcode,
                rd,
                rs1,
                rs2,
                funct3,
                funct7,
                imm: 0,
            },
            OP_ALU_IMM | OP_LOAD | OP_JALR => Self {
                opcode,
                rd,
                rs1,
                funct3,
                funct7,
                imm: signed >> 20,
                ..Self::default()
            },
            OP_STORE => Self {
                opcode,
                rs1,
                rs2,
                funct3,
                imm: (signed >> 25) << 5 | ((word >> 7) & 0x1f) as i32,
                ..Self::default()
            },
            OP_BRANCH => Self {
                opcode,
                rs1,
                rs2,
                funct3,
                imm: (signed >> 31) << 12
                    | (((word >> 7) & 0x1) << 11) as i32
                    | (((word >> 25) & 0x3f) << 5) as i32
                    | (((word >> 8) & 0xf) << 1) as i32,
                ..Self::default()
            },
            OP_LUI | OP_AUIPC => Self {
                opcode,
                rd,
                imm: (word & 0xffff_f000) as i32,
                ..Self::default()
            },
            OP_JAL => Self {
                opcode,
                rd,
                imm: (signed >> 31) << 20
                    | (word & 0x000f_f000) as i32
                    | (((word >> 20) & 0x1) << 11) as i32
                    | (((word >> 21) & 0x3ff) << 1) as i32,
                ..Self::default()
            },
            _ => Self {
                opcode,
                ..Self::default()
            },
        }
    }

    /// `funct3` and `funct7` packed into one value
    pub fn funct(&self) -> u16 {
        self.funct3 as u16 | (self.funct7 as u16) << 3
    }
}
