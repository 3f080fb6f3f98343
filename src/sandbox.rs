//! Execution sandbox: the IO delegate handed to a circuit
//!
//! A circuit only sees [`IoHandler`]. It calls `on_init` once before the
//! program starts, then `on_write`/`on_commit` as the program emits data.

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::key_store::KeyStore;
use crate::memory::{AddressSpace, MemoryLayout};
use crate::WORD_SIZE;

/// Host capabilities available to an executing program
pub trait IoHandler {
    /// Stage input into the address space before execution
    fn on_init(&mut self, mem: &mut dyn AddressSpace) -> Result<()>;

    /// Program wrote to its output channel
    fn on_write(&mut self, buf: &[u8]);

    /// Program wrote to its commit channel
    fn on_commit(&mut self, buf: &[u8]);

    fn key_store(&self) -> &KeyStore;
}

/// Sandbox over buffers owned by a [`crate::Prover`] for one run
#[derive(Debug)]
pub struct Sandbox<'a> {
    layout: MemoryLayout,
    input: &'a [u32],
    output: &'a mut Vec<u8>,
    commit: &'a mut Vec<u8>,
    key_store: &'a KeyStore,
}

impl<'a> Sandbox<'a> {
    pub fn new(
        layout: MemoryLayout,
        input: &'a [u32],
        output: &'a mut Vec<u8>,
        commit: &'a mut Vec<u8>,
        key_store: &'a KeyStore,
    ) -> Result<Self> {
        layout.validate()?;
        Ok(Self {
            layout,
            input,
            output,
            commit,
            key_store,
        })
    }

    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }
}

impl IoHandler for Sandbox<'_> {
    fn on_init(&mut self, mem: &mut dyn AddressSpace) -> Result<()> {
        debug!("Sandbox::on_init> {} input words", self.input.len());
        let end = self.layout.input_end;
        let mut addr = self.layout.input_start as u64;
        for &word in self.input {
            if addr > end as u64 {
                return Err(Error::SandboxOverflow { addr, end });
            }
            trace!("  {addr:#010x}: {word:#010x}");
            mem.store(addr as u32, word)?;
            addr += WORD_SIZE as u64;
        }
        Ok(())
    }

    fn on_write(&mut self, buf: &[u8]) {
        debug!("Sandbox::on_write> {}", buf.len());
        self.output.extend_from_slice(buf);
    }

    fn on_commit(&mut self, buf: &[u8]) {
        debug!("Sandbox::on_commit> {}", buf.len());
        self.commit.extend_from_slice(buf);
    }

    fn key_store(&self) -> &KeyStore {
        self.key_store
    }
}
