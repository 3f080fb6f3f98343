//! Instruction encoders for building programs by hand

use super::program::opcodes::*;
use super::program::{custom_funct, io_funct};

/// ABI register numbers
pub mod reg {
    pub const ZERO: u8 = 0;
    pub const RA: u8 = 1;
    pub const SP: u8 = 2;
    pub const T0: u8 = 5;
    pub const T1: u8 = 6;
    pub const T2: u8 = 7;
    pub const S0: u8 = 8;
    pub const S1: u8 = 9;
    pub const A0: u8 = 10;
    pub const A1: u8 = 11;
    pub const A2: u8 = 12;
    pub const A3: u8 = 13;
    pub const A4: u8 = 14;
    pub const A5: u8 = 15;
}

pub fn r_type(opcode: u8, rd: u8, funct3: u8, rs1: u8, rs2: u8, funct7: u8) -> u32 {
    (funct7 as u32) << 25
        | (rs2 as u32 & 0x1f) << 20
        | (rs1 as u32 & 0x1f) << 15
        | (funct3 as u32 & 0x7) << 12
        | (rd as u32 & 0x1f) << 7
        | opcode as u32
}

pub fn i_type(opcode: u8, rd: u8, funct3: u8, rs1: u8, imm: i32) -> u32 {
    (imm as u32 & 0xfff) << 20
        | (rs1 as u32 & 0x1f) << 15
        | (funct3 as u32 & 0x7) << 12
        | (rd as u32 & 0x1f) << 7
        | opcode as u32
}

pub fn s_type(opcode: u8, funct3: u8, rs1: u8, rs2: u8, imm: i32) -> u32 {
    let imm = imm as u32;
    ((imm >> 5) & 0x7f) << 25
        | (rs2 as u32 & 0x1f) << 20
        | (rs1 as u32 & 0x1f) << 15
        | (funct3 as u32 & 0x7) << 12
        | (imm & 0x1f) << 7
        | opcode as u32
}

pub fn b_type(funct3: u8, rs1: u8, rs2: u8, offset: i32) -> u32 {
    let imm = offset as u32;
    ((imm >> 12) & 0x1) << 31
        | ((imm >> 5) & 0x3f) << 25
        | (rs2 as u32 & 0x1f) << 20
        | (rs1 as u32 & 0x1f) << 15
        | (funct3 as u32 & 0x7) << 12
        | ((imm >> 1) & 0xf) << 8
        | ((imm >> 11) & 0x1) << 7
        | OP_BRANCH as u32
}

pub fn u_type(opcode: u8, rd: u8, imm20: u32) -> u32 {
    (imm20 & 0xfffff) << 12 | (rd as u32 & 0x1f) << 7 | opcode as u32
}

pub fn j_type(rd: u8, offset: i32) -> u32 {
    let imm = offset as u32;
    ((imm >> 20) & 0x1) << 31
        | ((imm >> 1) & 0x3ff) << 21
        | ((imm >> 11) & 0x1) << 20
        | ((imm >> 12) & 0xff) << 12
        | (rd as u32 & 0x1f) << 7
        | OP_JAL as u32
}

pub fn add(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(OP_ALU, rd, 0, rs1, rs2, 0)
}

pub fn sub(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(OP_ALU, rd, 0, rs1, rs2, 0x20)
}

pub fn mul(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(OP_ALU, rd, 0, rs1, rs2, 0x01)
}

pub fn sll(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(OP_ALU, rd, 1, rs1, rs2, 0)
}

pub fn slt(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(OP_ALU, rd, 2, rs1, rs2, 0)
}

pub fn sltu(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(OP_ALU, rd, 3, rs1, rs2, 0)
}

pub fn xor(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(OP_ALU, rd, 4, rs1, rs2, 0)
}

pub fn srl(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(OP_ALU, rd, 5, rs1, rs2, 0)
}

pub fn sra(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(OP_ALU, rd, 5, rs1, rs2, 0x20)
}

pub fn or(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(OP_ALU, rd, 6, rs1, rs2, 0)
}

pub fn and(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(OP_ALU, rd, 7, rs1, rs2, 0)
}

pub fn addi(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(OP_ALU_IMM, rd, 0, rs1, imm)
}

pub fn slti(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(OP_ALU_IMM, rd, 2, rs1, imm)
}

pub fn sltiu(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(OP_ALU_IMM, rd, 3, rs1, imm)
}

pub fn xori(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(OP_ALU_IMM, rd, 4, rs1, imm)
}

pub fn ori(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(OP_ALU_IMM, rd, 6, rs1, imm)
}

pub fn andi(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(OP_ALU_IMM, rd, 7, rs1, imm)
}

pub fn slli(rd: u8, rs1: u8, shamt: u8) -> u32 {
    i_type(OP_ALU_IMM, rd, 1, rs1, (shamt & 0x1f) as i32)
}

pub fn srli(rd: u8, rs1: u8, shamt: u8) -> u32 {
    i_type(OP_ALU_IMM, rd, 5, rs1, (shamt & 0x1f) as i32)
}

pub fn srai(rd: u8, rs1: u8, shamt: u8) -> u32 {
    i_type(OP_ALU_IMM, rd, 5, rs1, 0x400 | (shamt & 0x1f) as i32)
}

pub fn lb(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(OP_LOAD, rd, 0, rs1, imm)
}

pub fn lh(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(OP_LOAD, rd, 1, rs1, imm)
}

pub fn lw(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(OP_LOAD, rd, 2, rs1, imm)
}

pub fn lbu(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(OP_LOAD, rd, 4, rs1, imm)
}

pub fn lhu(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(OP_LOAD, rd, 5, rs1, imm)
}

pub fn sb(rs2: u8, rs1: u8, imm: i32) -> u32 {
    s_type(OP_STORE, 0, rs1, rs2, imm)
}

pub fn sh(rs2: u8, rs1: u8, imm: i32) -> u32 {
    s_type(OP_STORE, 1, rs1, rs2, imm)
}

pub fn sw(rs2: u8, rs1: u8, imm: i32) -> u32 {
    s_type(OP_STORE, 2, rs1, rs2, imm)
}

pub fn beq(rs1: u8, rs2: u8, offset: i32) -> u32 {
    b_type(0, rs1, rs2, offset)
}

pub fn bne(rs1: u8, rs2: u8, offset: i32) -> u32 {
    b_type(1, rs1, rs2, offset)
}

pub fn blt(rs1: u8, rs2: u8, offset: i32) -> u32 {
    b_type(4, rs1, rs2, offset)
}

pub fn bge(rs1: u8, rs2: u8, offset: i32) -> u32 {
    b_type(5, rs1, rs2, offset)
}

pub fn bltu(rs1: u8, rs2: u8, offset: i32) -> u32 {
    b_type(6, rs1, rs2, offset)
}

pub fn bgeu(rs1: u8, rs2: u8, offset: i32) -> u32 {
    b_type(7, rs1, rs2, offset)
}

pub fn jal(rd: u8, offset: i32) -> u32 {
    j_type(rd, offset)
}

pub fn jalr(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(OP_JALR, rd, 0, rs1, imm)
}

pub fn lui(rd: u8, imm20: u32) -> u32 {
    u_type(OP_LUI, rd, imm20)
}

pub fn auipc(rd: u8, imm20: u32) -> u32 {
    u_type(OP_AUIPC, rd, imm20)
}

/// Load a 32-bit constant
pub fn li(rd: u8, value: u32) -> [u32; 2] {
    let hi = value.wrapping_add(0x800) >> 12;
    let lo = value.wrapping_sub(hi << 12) as i32;
    [lui(rd, hi), addi(rd, rd, lo)]
}

/// Send `len` bytes at `ptr` to the output channel
pub fn write(ptr: u8, len: u8) -> u32 {
    r_type(OP_ZK_IO, 0, io_funct::WRITE, ptr, len, 0)
}

/// Send `len` bytes at `ptr` to the commit channel
pub fn commit(ptr: u8, len: u8) -> u32 {
    r_type(OP_ZK_IO, 0, io_funct::COMMIT, ptr, len, 0)
}

/// Look up a key through the descriptor `{id_ptr, id_len, dst_ptr, dst_cap}`
/// at the address in `desc`; `rd` receives the key length or `u32::MAX`
pub fn key(rd: u8, desc: u8) -> u32 {
    r_type(OP_ZK_IO, rd, io_funct::KEY, desc, 0, 0)
}

pub fn assert_eq(rs1: u8, rs2: u8) -> u32 {
    r_type(OP_ZK_CUSTOM, 0, custom_funct::ASSERT_EQ, rs1, rs2, 0)
}

pub fn halt() -> u32 {
    OP_HALT as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_reference_encodings() {
        // addi x1, x0, 1
        assert_eq!(addi(reg::RA, reg::ZERO, 1), 0x0010_0093);
        // add x3, x1, x2
        assert_eq!(add(3, 1, 2), 0x0020_81b3);
        // sw x2, 8(x1)
        assert_eq!(sw(2, 1, 8), 0x0020_a423);
        // lui x5, 0x80
        assert_eq!(lui(reg::T0, 0x80), 0x0008_02b7);
    }

    #[test]
    fn li_splits_with_sign_correction() {
        use crate::engine::program::Instruction;

        for value in [0u32, 1, 0x7ff, 0x800, 0xfff, 0x1234_5678, 0xffff_ffff, 0x8000_0000] {
            let [hi, lo] = li(reg::A0, value);
            let upper = Instruction::decode(hi).imm as u32;
            let lower = Instruction::decode(lo).imm;
            assert_eq!(upper.wrapping_add(lower as u32), value, "value {value:#x}");
        }
    }
}
