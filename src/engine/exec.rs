//! Interpreter for the development engine

use std::ops::Range;

use tracing::debug;

use super::program::{custom_funct, io_funct, opcodes::*, Instruction, Program};
use super::trace::{ExecutionTrace, MemoryAccess, Step, SyscallCode, SyscallRecord};
use crate::error::{Error, Result};
use crate::memory::{AddressSpace, Memory};
use crate::sandbox::IoHandler;
use crate::NUM_REGISTERS;

/// Returned in `rd` by a key lookup that found nothing
pub const KEY_NOT_FOUND: u32 = u32::MAX;

/// Runs a [`Program`] against an IO delegate, recording every step
pub struct Executor<'a> {
    program: &'a Program,
    memory: Memory,
    regs: [u32; NUM_REGISTERS],
    pc: u32,
    cycle: u64,
    max_cycles: u64,
    trace: ExecutionTrace,
}

/// Effects of one instruction, gathered before they are committed
#[derive(Default)]
struct Effects {
    next_pc: u32,
    rd_val: Option<u32>,
    access: Option<MemoryAccess>,
    halted: bool,
}

impl<'a> Executor<'a> {
    pub fn new(program: &'a Program, max_cycles: u64) -> Self {
        let mut program_hash = [0u8; 32];
        let code = program.code_id();
        program_hash.copy_from_slice(code.as_bytes());
        Self {
            program,
            memory: Memory::new(),
            regs: [0; NUM_REGISTERS],
            pc: program.entry(),
            cycle: 0,
            max_cycles,
            trace: ExecutionTrace::new(program_hash),
        }
    }

    /// Stage input, then execute until HALT
    pub fn run(mut self, io: &mut dyn IoHandler) -> Result<ExecutionTrace> {
        for (addr, &word) in (self.program.entry()..).step_by(4).zip(self.program.image()) {
            self.memory.store(addr, word)?;
        }
        io.on_init(&mut InitView {
            memory: &mut self.memory,
            text: self.program.text_range(),
        })?;

        loop {
            if self.cycle >= self.max_cycles {
                return Err(Error::circuit(format!(
                    "cycle limit of {} exceeded",
                    self.max_cycles
                )));
            }
            if self.step(io)? {
                break;
            }
        }
        debug!("Executor::run> halted after {} cycles", self.cycle);
        Ok(self.trace)
    }

    fn reg(&self, index: u8) -> u32 {
        self.regs[index as usize]
    }

    fn illegal(&self, word: u32) -> Error {
        Error::circuit(format!(
            "illegal instruction {word:#010x} at pc {:#010x}",
            self.pc
        ))
    }

    fn step(&mut self, io: &mut dyn IoHandler) -> Result<bool> {
        let pc = self.pc;
        let word = self.memory.load(pc)?;
        let inst = Instruction::decode(word);
        let rs1_val = self.reg(inst.rs1);
        let rs2_val = self.reg(inst.rs2);
        let imm = inst.imm as u32;

        let mut fx = Effects {
            next_pc: pc.wrapping_add(4),
            ..Effects::default()
        };

        match inst.opcode {
            OP_LUI => fx.rd_val = Some(imm),
            OP_AUIPC => fx.rd_val = Some(pc.wrapping_add(imm)),
            OP_JAL => {
                fx.rd_val = Some(fx.next_pc);
                fx.next_pc = pc.wrapping_add(imm);
            }
            OP_JALR => {
                fx.rd_val = Some(fx.next_pc);
                fx.next_pc = rs1_val.wrapping_add(imm) & !1;
            }
            OP_BRANCH => {
                let taken = match inst.funct3 {
                    0 => rs1_val == rs2_val,
                    1 => rs1_val != rs2_val,
                    4 => (rs1_val as i32) < (rs2_val as i32),
                    5 => (rs1_val as i32) >= (rs2_val as i32),
                    6 => rs1_val < rs2_val,
                    7 => rs1_val >= rs2_val,
                    _ => return Err(self.illegal(word)),
                };
                if taken {
                    fx.next_pc = pc.wrapping_add(imm);
                }
            }
            OP_LOAD => {
                let addr = rs1_val.wrapping_add(imm);
                let value = self.load(inst.funct3, addr).ok_or_else(|| self.illegal(word))??;
                fx.rd_val = Some(value);
                fx.access = Some(MemoryAccess {
                    address: addr & !3,
                    cycle: self.cycle,
                    value: self.memory.load(addr & !3)?,
                    is_write: false,
                });
            }
            OP_STORE => {
                let addr = rs1_val.wrapping_add(imm);
                self.store(inst.funct3, addr, rs2_val)
                    .ok_or_else(|| self.illegal(word))??;
                fx.access = Some(MemoryAccess {
                    address: addr & !3,
                    cycle: self.cycle,
                    value: self.memory.load(addr & !3)?,
                    is_write: true,
                });
            }
            OP_ALU_IMM => {
                let value = alu(inst.funct3, inst.funct7, rs1_val, imm, true)
                    .ok_or_else(|| self.illegal(word))?;
                fx.rd_val = Some(value);
            }
            OP_ALU => {
                let value = alu(inst.funct3, inst.funct7, rs1_val, rs2_val, false)
                    .ok_or_else(|| self.illegal(word))?;
                fx.rd_val = Some(value);
            }
            OP_ZK_IO => match inst.funct3 {
                io_funct::WRITE => {
                    let bytes = self.memory.load_region(rs1_val, rs2_val)?;
                    io.on_write(&bytes);
                    self.record_syscall(SyscallCode::Write, vec![rs1_val, rs2_val], Vec::new());
                }
                io_funct::COMMIT => {
                    let bytes = self.memory.load_region(rs1_val, rs2_val)?;
                    io.on_commit(&bytes);
                    self.trace.journal.extend_from_slice(&bytes);
                    self.record_syscall(SyscallCode::Commit, vec![rs1_val, rs2_val], Vec::new());
                }
                io_funct::KEY => {
                    let len = self.key_lookup(io, rs1_val)?;
                    fx.rd_val = Some(len);
                    self.record_syscall(SyscallCode::KeyLookup, vec![rs1_val], vec![len]);
                }
                _ => return Err(self.illegal(word)),
            },
            OP_ZK_CUSTOM => match inst.funct3 {
                custom_funct::ASSERT_EQ => {
                    if rs1_val != rs2_val {
                        return Err(Error::circuit(format!(
                            "assertion failed at pc {pc:#010x}: {rs1_val:#x} != {rs2_val:#x}"
                        )));
                    }
                }
                _ => return Err(self.illegal(word)),
            },
            OP_HALT => {
                fx.next_pc = pc;
                fx.halted = true;
            }
            _ => return Err(self.illegal(word)),
        }

        let mut rd_val = 0;
        if let Some(value) = fx.rd_val {
            if inst.rd != 0 {
                self.regs[inst.rd as usize] = value;
                rd_val = value;
            }
        }

        self.trace.steps.push(Step {
            pc,
            cycle: self.cycle,
            opcode: inst.opcode,
            rd: inst.rd,
            rs1: inst.rs1,
            rs2: inst.rs2,
            imm: inst.imm,
            funct: inst.funct(),
            rs1_val,
            rs2_val,
            rd_val,
        });
        if let Some(access) = fx.access {
            self.trace.memory_log.push(access);
        }

        self.pc = fx.next_pc;
        self.cycle += 1;
        Ok(fx.halted)
    }

    /// `None` if `funct3` is not a load
    fn load(&self, funct3: u8, addr: u32) -> Option<Result<u32>> {
        let value = match funct3 {
            0 => self.memory.load_u8(addr).map(|b| b as i8 as i32 as u32),
            1 => self.load_half(addr).map(|h| h as i16 as i32 as u32),
            2 => self.memory.load(addr),
            4 => self.memory.load_u8(addr).map(u32::from),
            5 => self.load_half(addr).map(u32::from),
            _ => return None,
        };
        Some(value)
    }

    /// `None` if `funct3` is not a store
    fn store(&mut self, funct3: u8, addr: u32, value: u32) -> Option<Result<()>> {
        let result = match funct3 {
            0 => self.memory.store_u8(addr, value as u8),
            1 => self.store_half(addr, value as u16),
            2 => self.memory.store(addr, value),
            _ => return None,
        };
        Some(result)
    }

    fn load_half(&self, addr: u32) -> Result<u16> {
        if addr % 2 != 0 {
            return Err(Error::circuit(format!("misaligned halfword access at {addr:#010x}")));
        }
        let lo = self.memory.load_u8(addr)? as u16;
        let hi = self.memory.load_u8(addr + 1)? as u16;
        Ok(lo | hi << 8)
    }

    fn store_half(&mut self, addr: u32, value: u16) -> Result<()> {
        if addr % 2 != 0 {
            return Err(Error::circuit(format!("misaligned halfword access at {addr:#010x}")));
        }
        self.memory.store_region(addr, &value.to_le_bytes())
    }

    /// Resolve the descriptor `{id_ptr, id_len, dst_ptr, dst_cap}` at `desc`
    fn key_lookup(&mut self, io: &dyn IoHandler, desc: u32) -> Result<u32> {
        let id_ptr = self.memory.load(desc)?;
        let id_len = self.memory.load(desc.wrapping_add(4))?;
        let dst_ptr = self.memory.load(desc.wrapping_add(8))?;
        let dst_cap = self.memory.load(desc.wrapping_add(12))?;

        let id = self.memory.load_region(id_ptr, id_len)?;
        let id = String::from_utf8(id)
            .map_err(|_| Error::circuit(format!("key id at {id_ptr:#010x} is not utf-8")))?;

        match io.key_store().get(&id) {
            Some(key) => {
                let bytes = key.as_bytes();
                let n = bytes.len().min(dst_cap as usize);
                self.memory.store_region(dst_ptr, &bytes[..n])?;
                debug!("Executor::key_lookup> {id}: {} bytes", bytes.len());
                Ok(bytes.len() as u32)
            }
            None => {
                debug!("Executor::key_lookup> {id}: not found");
                Ok(KEY_NOT_FOUND)
            }
        }
    }

    fn record_syscall(&mut self, code: SyscallCode, inputs: Vec<u32>, outputs: Vec<u32>) {
        self.trace.syscalls.push(SyscallRecord {
            code: code as u32,
            cycle: self.cycle,
            inputs,
            outputs,
        });
    }
}

/// Address space handed to `on_init`; program text is read-only
struct InitView<'m> {
    memory: &'m mut Memory,
    text: Range<u32>,
}

impl AddressSpace for InitView<'_> {
    fn load(&self, addr: u32) -> Result<u32> {
        self.memory.load(addr)
    }

    fn store(&mut self, addr: u32, word: u32) -> Result<()> {
        if self.text.contains(&addr) {
            return Err(Error::circuit(format!(
                "input word at {addr:#010x} overlaps program text [{:#010x}, {:#010x})",
                self.text.start, self.text.end
            )));
        }
        self.memory.store(addr, word)
    }
}

/// ALU result, `None` for an unsupported encoding
fn alu(funct3: u8, funct7: u8, a: u32, b: u32, immediate: bool) -> Option<u32> {
    let shamt = b & 0x1f;
    let value = match (funct3, funct7, immediate) {
        (0, _, true) | (0, 0x00, false) => a.wrapping_add(b),
        (0, 0x20, false) => a.wrapping_sub(b),
        (0, 0x01, false) => a.wrapping_mul(b),
        (1, 0x00, _) => a << shamt,
        (2, _, true) | (2, 0x00, false) => ((a as i32) < (b as i32)) as u32,
        (3, _, true) | (3, 0x00, false) => (a < b) as u32,
        (4, _, true) | (4, 0x00, false) => a ^ b,
        (5, 0x00, _) => a >> shamt,
        (5, 0x20, _) => ((a as i32) >> shamt) as u32,
        (6, _, true) | (6, 0x00, false) => a | b,
        (7, _, true) | (7, 0x00, false) => a & b,
        _ => return None,
    };
    Some(value)
}
