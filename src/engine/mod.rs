//! Development engine
//!
//! Interprets flat RV32I images with the ZK IO extensions and emits a
//! sealed core. The core is bound to the code id by a hash seal only; it
//! carries no soundness and exists so the host layer can be exercised end
//! to end without an external proving system.

pub mod asm;
pub mod columns;
pub mod exec;
pub mod program;
pub mod seal;
pub mod trace;

use std::path::Path;

use tracing::{debug, info};

use crate::circuit::{Engine, ProveCircuit, VerifyCircuit};
use crate::code_id::CodeId;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::sandbox::IoHandler;

pub use exec::Executor;
pub use program::Program;
pub use trace::ExecutionTrace;

#[derive(Clone, Debug, Default)]
pub struct DevEngine {
    config: EngineConfig,
}

impl DevEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Identity of the program image at `program`
    pub fn code_id(&self, program: &Path) -> Result<CodeId> {
        Ok(Program::load(program)?.code_id())
    }

    /// Compute the identity of `program` and store it beside the image
    pub fn write_code_id(&self, program: &Path) -> Result<CodeId> {
        let code = self.code_id(program)?;
        let path = CodeId::path_for(program);
        code.save(&path)?;
        info!("wrote code id {code} to {}", path.display());
        Ok(code)
    }

    /// Run `program` to completion without producing a core
    pub fn execute(&self, program: &Program, io: &mut dyn IoHandler) -> Result<ExecutionTrace> {
        self.config.validate()?;
        Executor::new(program, self.config.max_cycles).run(io)
    }
}

struct DevProveCircuit<'a> {
    program: Program,
    code: CodeId,
    io: &'a mut (dyn IoHandler + 'a),
    max_cycles: u64,
}

impl ProveCircuit for DevProveCircuit<'_> {
    fn prove(&mut self) -> Result<Vec<u32>> {
        let trace = Executor::new(&self.program, self.max_cycles).run(&mut *self.io)?;
        debug!(
            "DevProveCircuit::prove> cycles: {}, journal: {} bytes",
            trace.num_cycles(),
            trace.journal.len()
        );
        Ok(seal::build_core(&self.code, &trace))
    }
}

struct DevVerifyCircuit {
    code: CodeId,
}

impl VerifyCircuit for DevVerifyCircuit {
    fn verify(&self, core: &[u32]) -> Result<()> {
        seal::check_core(&self.code, core)
    }
}

impl Engine for DevEngine {
    fn prove_circuit<'a>(
        &self,
        program: &Path,
        io: &'a mut (dyn IoHandler + 'a),
    ) -> Result<Box<dyn ProveCircuit + 'a>> {
        self.config.validate()?;
        let program = Program::load(program)?;
        let code = program.code_id();
        Ok(Box::new(DevProveCircuit {
            program,
            code,
            io,
            max_cycles: self.config.max_cycles,
        }))
    }

    fn verify_circuit(&self, code: &CodeId) -> Result<Box<dyn VerifyCircuit>> {
        Ok(Box::new(DevVerifyCircuit { code: code.clone() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::asm::{self, reg};
    use crate::error::ErrorKind;
    use crate::key_store::KeyStore;
    use crate::memory::MemoryLayout;
    use crate::sandbox::Sandbox;

    #[test]
    fn code_id_file_sits_beside_the_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("halt.bin");
        let program = Program::new(vec![asm::halt()]).unwrap();
        program.save(&path).unwrap();

        let engine = DevEngine::default();
        let code = engine.write_code_id(&path).unwrap();
        assert_eq!(code, program.code_id());
        let id_path = dir.path().join("halt.bin.id");
        assert_eq!(CodeId::load(&id_path).unwrap(), code);
    }

    #[test]
    fn verify_circuit_is_bound_to_code() {
        let engine = DevEngine::default();
        let program = Program::new(vec![asm::addi(reg::A0, reg::ZERO, 1), asm::halt()]).unwrap();
        let code = program.code_id();
        let trace = ExecutionTrace::new([0; 32]);
        let core = seal::build_core(&code, &trace);

        engine.verify_circuit(&code).unwrap().verify(&core).unwrap();
        let other = Program::new(vec![asm::halt()]).unwrap().code_id();
        let err = engine.verify_circuit(&other).unwrap().verify(&core).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Circuit);
    }

    #[test]
    fn oversized_cycle_limit_is_rejected_before_running() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("halt.bin");
        Program::new(vec![asm::halt()]).unwrap().save(&path).unwrap();

        let engine = DevEngine::new(EngineConfig {
            max_cycles: u32::MAX as u64 + 1,
        });
        let keys = KeyStore::new();
        let (mut output, mut commit) = (Vec::new(), Vec::new());
        let mut sandbox =
            Sandbox::new(MemoryLayout::default(), &[], &mut output, &mut commit, &keys).unwrap();
        let err = engine.prove_circuit(&path, &mut sandbox).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn missing_image_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DevEngine::default().code_id(&dir.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
