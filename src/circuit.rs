//! Seams to the external proving engine
//!
//! The constraint system lives outside this crate. An [`Engine`] turns a
//! program plus an IO delegate into a [`ProveCircuit`], and a program
//! identity into a [`VerifyCircuit`]. Both calls are blocking and either
//! complete or fail as a whole.

use std::path::Path;

use crate::code_id::CodeId;
use crate::error::Result;
use crate::sandbox::IoHandler;

/// A program bound to its IO delegate, ready to be proven
pub trait ProveCircuit {
    /// Execute the program and return the core commitment
    fn prove(&mut self) -> Result<Vec<u32>>;
}

/// Verifier for cores produced by one program
pub trait VerifyCircuit {
    fn verify(&self, core: &[u32]) -> Result<()>;
}

pub trait Engine {
    /// Resolve the program at `program` together with `io` into a circuit
    fn prove_circuit<'a>(
        &self,
        program: &Path,
        io: &'a mut (dyn IoHandler + 'a),
    ) -> Result<Box<dyn ProveCircuit + 'a>>;

    /// Select the verification circuit for a program identity
    fn verify_circuit(&self, code: &CodeId) -> Result<Box<dyn VerifyCircuit>>;
}

impl<E: Engine + ?Sized> Engine for &E {
    fn prove_circuit<'a>(
        &self,
        program: &Path,
        io: &'a mut (dyn IoHandler + 'a),
    ) -> Result<Box<dyn ProveCircuit + 'a>> {
        (**self).prove_circuit(program, io)
    }

    fn verify_circuit(&self, code: &CodeId) -> Result<Box<dyn VerifyCircuit>> {
        (**self).verify_circuit(code)
    }
}
