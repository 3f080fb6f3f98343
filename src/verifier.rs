//! Proof verification against a program identity

use std::path::Path;

use tracing::info;

use crate::circuit::Engine;
use crate::code_id::CodeId;
use crate::error::Result;
use crate::proof::Proof;

/// Verifies proofs produced by one program
///
/// Checks run in order and stop at the first failure: the engine verifies
/// the core under the program identity, then the message length, then the
/// message digest (or literal bytes).
pub struct Verifier<E> {
    engine: E,
    code: CodeId,
}

impl<E: Engine> Verifier<E> {
    pub fn new(engine: E, code: CodeId) -> Self {
        Self { engine, code }
    }

    /// Load the identity stored beside `program`
    pub fn load(engine: E, program: &Path) -> Result<Self> {
        let code = CodeId::load_for(program)?;
        Ok(Self::new(engine, code))
    }

    pub fn code_id(&self) -> &CodeId {
        &self.code
    }

    #[tracing::instrument(skip_all, fields(code = %self.code))]
    pub fn verify(&self, proof: &Proof) -> Result<()> {
        let circuit = self.engine.verify_circuit(&self.code)?;
        circuit.verify(proof.core())?;
        proof.check_message()?;
        info!("proof verified ({} message bytes)", proof.message().len());
        Ok(())
    }
}
