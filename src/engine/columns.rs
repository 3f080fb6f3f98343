//! Trace matrix layout and generation
//!
//! Every 32-bit quantity is split into 16-bit limbs so each cell is a
//! canonical BabyBear element.

use std::borrow::{Borrow, BorrowMut};

use p3_field::{Field, FieldAlgebra};
use p3_matrix::dense::RowMajorMatrix;

use super::program::opcodes;
use super::trace::{ExecutionTrace, MemoryAccess, Step};

/// Trace columns, one row per step
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct TraceColumns<T> {
    // === State ===
    pub pc_lo: T,
    pub pc_hi: T,
    pub cycle_lo: T,
    pub cycle_hi: T,

    // === Instruction decode ===
    pub opcode: T,
    /// funct3 + funct7 combined
    pub funct: T,
    pub rd: T,
    pub rs1: T,
    pub rs2: T,
    pub imm_lo: T,
    pub imm_hi: T,

    // === Operand values ===
    pub rs1_lo: T,
    pub rs1_hi: T,
    pub rs2_lo: T,
    pub rs2_hi: T,
    pub rd_lo: T,
    pub rd_hi: T,

    // === Memory ===
    pub mem_addr_lo: T,
    pub mem_addr_hi: T,
    pub mem_val_lo: T,
    pub mem_val_hi: T,
    /// 1 = write, 0 = read
    pub mem_is_write: T,

    // === Flags ===
    pub is_mem: T,
    pub is_syscall: T,
    pub is_halt: T,
    /// Padding row
    pub is_nop: T,
}

/// Number of columns in the trace
pub const TRACE_NUM_COLUMNS: usize = 26;

impl<T> TraceColumns<T> {
    pub const NUM_COLUMNS: usize = TRACE_NUM_COLUMNS;
}

// Allow converting between TraceColumns<T> and [T; 26]
impl<T> Borrow<TraceColumns<T>> for [T; TRACE_NUM_COLUMNS] {
    fn borrow(&self) -> &TraceColumns<T> {
        // Safety: TraceColumns is repr(C) and has exactly NUM_COLUMNS fields of type T
        unsafe { &*(self.as_ptr() as *const TraceColumns<T>) }
    }
}

impl<T> BorrowMut<TraceColumns<T>> for [T; TRACE_NUM_COLUMNS] {
    fn borrow_mut(&mut self) -> &mut TraceColumns<T> {
        unsafe { &mut *(self.as_mut_ptr() as *mut TraceColumns<T>) }
    }
}

fn limbs<F: Field>(value: u32) -> (F, F) {
    (
        F::from_canonical_u32(value & 0xffff),
        F::from_canonical_u32(value >> 16),
    )
}

fn flag<F: Field>(set: bool) -> F {
    if set {
        F::ONE
    } else {
        F::ZERO
    }
}

/// Generate the trace matrix, padded to a power of two with NOP rows
pub fn generate_trace<F: Field>(trace: &ExecutionTrace) -> RowMajorMatrix<F> {
    let num_steps = trace.steps.len();
    let trace_len = num_steps.next_power_of_two().max(2);

    let mut values = vec![F::ZERO; trace_len * TRACE_NUM_COLUMNS];
    let mut accesses = trace.memory_log.iter().peekable();

    for (row, step) in values.chunks_exact_mut(TRACE_NUM_COLUMNS).zip(&trace.steps) {
        // At most one access per step, logged in cycle order.
        let access = accesses.next_if(|a| a.cycle == step.cycle);
        populate_row(row, step, access);
    }

    for (i, row) in values
        .chunks_exact_mut(TRACE_NUM_COLUMNS)
        .enumerate()
        .skip(num_steps)
    {
        populate_nop_row(row, i as u32);
    }

    RowMajorMatrix::new(values, TRACE_NUM_COLUMNS)
}

fn row_columns<F>(row: &mut [F]) -> &mut TraceColumns<F> {
    let row_arr: &mut [F; TRACE_NUM_COLUMNS] = match row.try_into() {
        Ok(arr) => arr,
        Err(_) => unreachable!("rows are chunked at TRACE_NUM_COLUMNS"),
    };
    row_arr.borrow_mut()
}

fn populate_row<F: Field>(row: &mut [F], step: &Step, access: Option<&MemoryAccess>) {
    let cols = row_columns(row);

    (cols.pc_lo, cols.pc_hi) = limbs(step.pc);
    (cols.cycle_lo, cols.cycle_hi) = limbs(step.cycle as u32);

    cols.opcode = F::from_canonical_u32(step.opcode as u32);
    cols.funct = F::from_canonical_u32(step.funct as u32);
    cols.rd = F::from_canonical_u32(step.rd as u32);
    cols.rs1 = F::from_canonical_u32(step.rs1 as u32);
    cols.rs2 = F::from_canonical_u32(step.rs2 as u32);
    (cols.imm_lo, cols.imm_hi) = limbs(step.imm as u32);

    (cols.rs1_lo, cols.rs1_hi) = limbs(step.rs1_val);
    (cols.rs2_lo, cols.rs2_hi) = limbs(step.rs2_val);
    (cols.rd_lo, cols.rd_hi) = limbs(step.rd_val);

    if let Some(access) = access {
        (cols.mem_addr_lo, cols.mem_addr_hi) = limbs(access.address);
        (cols.mem_val_lo, cols.mem_val_hi) = limbs(access.value);
        cols.mem_is_write = flag(access.is_write);
        cols.is_mem = F::ONE;
    }

    cols.is_syscall = flag(step.opcode == opcodes::OP_ZK_IO);
    cols.is_halt = flag(step.opcode == opcodes::OP_HALT);
}

fn populate_nop_row<F: Field>(row: &mut [F], index: u32) {
    let cols = row_columns(row);
    (cols.cycle_lo, cols.cycle_hi) = limbs(index);
    cols.is_nop = F::ONE;
}
