//! Execution trace types for the development engine

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A single step of execution
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Program counter
    pub pc: u32,
    /// Cycle number
    pub cycle: u64,
    /// Opcode
    pub opcode: u8,
    /// Destination register
    pub rd: u8,
    /// Source register 1
    pub rs1: u8,
    /// Source register 2
    pub rs2: u8,
    /// Immediate value
    pub imm: i32,
    /// Function code (funct3 + funct7)
    pub funct: u16,
    /// Value of rs1 before the step
    pub rs1_val: u32,
    /// Value of rs2 before the step
    pub rs2_val: u32,
    /// Value written to rd, zero if nothing was written
    pub rd_val: u32,
}

/// A memory access record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryAccess {
    /// Memory address
    pub address: u32,
    /// Cycle when access occurred
    pub cycle: u64,
    /// Value read or written (full word after the access)
    pub value: u32,
    /// True if write, false if read
    pub is_write: bool,
}

/// A syscall record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyscallRecord {
    /// Syscall code
    pub code: u32,
    /// Cycle when syscall was invoked
    pub cycle: u64,
    /// Input data (depends on syscall type)
    pub inputs: Vec<u32>,
    /// Output data (depends on syscall type)
    pub outputs: Vec<u32>,
}

/// Syscall codes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum SyscallCode {
    Write = 0x01,
    Commit = 0x02,
    KeyLookup = 0x03,
}

/// Complete execution trace
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    /// Identity of the executed program
    pub program_hash: [u8; 32],
    /// Execution steps
    pub steps: Vec<Step>,
    /// Memory accesses (in execution order)
    pub memory_log: Vec<MemoryAccess>,
    /// Syscall records
    pub syscalls: Vec<SyscallRecord>,
    /// Bytes sent to the commit channel, in order
    pub journal: Vec<u8>,
}

impl ExecutionTrace {
    /// Create a new empty execution trace
    pub fn new(program_hash: [u8; 32]) -> Self {
        Self {
            program_hash,
            steps: Vec::new(),
            memory_log: Vec::new(),
            syscalls: Vec::new(),
            journal: Vec::new(),
        }
    }

    /// Load an execution trace from a file
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let trace: Self = bincode::deserialize(&data)?;
        Ok(trace)
    }

    /// Save the execution trace to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = bincode::serialize(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Number of executed steps
    pub fn num_cycles(&self) -> u64 {
        self.steps.len() as u64
    }

    /// Get syscalls by type
    pub fn syscalls_by_code(&self, code: SyscallCode) -> Vec<&SyscallRecord> {
        self.syscalls
            .iter()
            .filter(|s| s.code == code as u32)
            .collect()
    }
}
