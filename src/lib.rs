//! zkVM prover host
//!
//! Host side of a zero-knowledge virtual machine: stages input for a guest
//! program, runs it under a proving engine inside a memory sandbox, and
//! assembles a proof that any holder of the program identity can check.
//!
//! # Architecture
//!
//! - Streams and archives: bounded word streams and the structured codec
//!   layered on them
//! - Sandbox: input staging plus the output, commit and key hooks the
//!   guest calls during execution
//! - Prover / Proof / Verifier: one proving run, the proof it yields, and
//!   the ordered checks that accept or reject it
//! - Engine: seam to the proving system. [`DevEngine`] is a reference
//!   interpreter with a hash seal in place of a real argument.

pub mod archive;
pub mod circuit;
pub mod code_id;
pub mod config;
pub mod engine;
pub mod error;
pub mod key_store;
pub mod memory;
pub mod proof;
pub mod prover;
pub mod sandbox;
pub mod stream;
pub mod verifier;

pub use archive::{Archive, ArchiveReader, ArchiveWriter};
pub use circuit::{Engine, ProveCircuit, VerifyCircuit};
pub use code_id::CodeId;
pub use config::{Config, EngineConfig, ProverConfig};
pub use engine::DevEngine;
pub use error::{Error, ErrorKind, Result, RunPhase};
pub use key_store::{Key, KeyStore};
pub use proof::Proof;
pub use prover::Prover;
pub use sandbox::{IoHandler, Sandbox};
pub use stream::{CheckedStreamReader, StreamReader, StreamWriter, VectorStreamWriter};
pub use verifier::Verifier;

use sha2::{Digest, Sha256};

/// Baby Bear prime: 2^31 - 2^27 + 1 = 2013265921
pub const BABY_BEAR_PRIME: u32 = 2013265921;

/// Number of registers in the guest VM
pub const NUM_REGISTERS: usize = 32;

/// Word size in bytes
pub const WORD_SIZE: usize = 4;

/// Size of a SHA-256 digest in bytes
pub const DIGEST_BYTES: usize = 32;

pub fn sha256(data: &[u8]) -> [u8; DIGEST_BYTES] {
    Sha256::digest(data).into()
}
