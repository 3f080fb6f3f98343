//! Prover: stages input, drives one proving run, returns a verified proof

use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};

use crate::archive::{pack_words, ArchiveReader, ArchiveWriter};
use crate::circuit::Engine;
use crate::config::ProverConfig;
use crate::error::{Result, RunPhase};
use crate::key_store::KeyStore;
use crate::proof::Proof;
use crate::sandbox::Sandbox;
use crate::stream::{CheckedStreamReader, StreamWriter, VectorStreamWriter};

/// Runs one program under an [`Engine`] and proves the result
pub struct Prover<E> {
    engine: E,
    program: PathBuf,
    config: ProverConfig,
    key_store: KeyStore,
    input: VectorStreamWriter,
    output: Vec<u8>,
    commit: Vec<u8>,
}

impl<E: Engine> Prover<E> {
    pub fn new(engine: E, program: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            program: program.into(),
            config: ProverConfig::default(),
            key_store: KeyStore::new(),
            input: VectorStreamWriter::new(),
            output: Vec::new(),
            commit: Vec::new(),
        }
    }

    /// Build a prover with a memory layout and keys from `config`
    pub fn with_config(engine: E, program: impl Into<PathBuf>, config: ProverConfig) -> Result<Self> {
        config.memory.validate()?;
        let key_store = config.key_store()?;
        let mut prover = Self::new(engine, program);
        prover.config = config;
        prover.key_store = key_store;
        Ok(prover)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn key_store(&self) -> &KeyStore {
        &self.key_store
    }

    pub fn key_store_mut(&mut self) -> &mut KeyStore {
        &mut self.key_store
    }

    /// Append bytes to the pending input as little-endian words. Bounds are
    /// checked once the input is staged, not here.
    pub fn write_input(&mut self, data: &[u8]) {
        debug!("Prover::write_input> size: {}", data.len());
        for word in pack_words(data) {
            trace!("  write_word: {word:#010x}");
            self.input.write_word(word);
        }
    }

    /// Structured writer over the pending input
    pub fn input_writer(&mut self) -> ArchiveWriter<&mut VectorStreamWriter> {
        ArchiveWriter::new(&mut self.input)
    }

    /// Words staged so far
    pub fn input(&self) -> &[u32] {
        self.input.words()
    }

    /// Everything the program wrote to its output channel in the last run
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Everything the program committed in the last run
    pub fn commit(&self) -> &[u8] {
        &self.commit
    }

    pub fn output_reader(&self) -> ArchiveReader<CheckedStreamReader<&[u8]>> {
        ArchiveReader::new(CheckedStreamReader::new(self.output.as_slice()))
    }

    pub fn commit_reader(&self) -> ArchiveReader<CheckedStreamReader<&[u8]>> {
        ArchiveReader::new(CheckedStreamReader::new(self.commit.as_slice()))
    }

    /// Execute the program, prove it, and verify the proof before returning it.
    ///
    /// Output and commit buffers are reset at the start of each run; staged
    /// input is kept.
    #[tracing::instrument(skip_all, fields(program = %self.program.display()))]
    pub fn run(&mut self) -> Result<Proof> {
        self.output.clear();
        self.commit.clear();

        let core = {
            let mut sandbox = Sandbox::new(
                self.config.memory,
                self.input.words(),
                &mut self.output,
                &mut self.commit,
                &self.key_store,
            )
            .map_err(|err| err.in_phase(RunPhase::Sandbox))?;

            let mut circuit = self
                .engine
                .prove_circuit(&self.program, &mut sandbox)
                .map_err(|err| err.in_phase(RunPhase::Load))?;
            circuit.prove().map_err(|err| err.in_phase(RunPhase::Prove))?
        };
        info!(
            "proved: {} core words, {} output bytes, {} committed bytes",
            core.len(),
            self.output.len(),
            self.commit.len()
        );

        let proof = Proof::new(core, self.commit.clone());
        proof
            .verify(&self.engine, &self.program)
            .map_err(|err| err.in_phase(RunPhase::Verify))?;
        Ok(proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::Archive;
    use crate::circuit::{ProveCircuit, VerifyCircuit};
    use crate::code_id::CodeId;
    use crate::error::{Error, ErrorKind};
    use crate::memory::{AddressSpace, Memory, MemoryLayout, INPUT_START};
    use crate::proof::message_commitment;
    use crate::sandbox::IoHandler;
    use crate::WORD_SIZE;

    /// Engine whose "program" echoes the first `echo_words` input words to
    /// both channels. Its core is the message commitment alone.
    struct EchoEngine {
        echo_words: usize,
        corrupt_core: bool,
    }

    struct EchoCircuit<'a> {
        io: &'a mut (dyn IoHandler + 'a),
        echo_words: usize,
        corrupt_core: bool,
    }

    impl ProveCircuit for EchoCircuit<'_> {
        fn prove(&mut self) -> Result<Vec<u32>> {
            let mut mem = Memory::new();
            self.io.on_init(&mut mem)?;
            let mut bytes = Vec::new();
            for i in 0..self.echo_words {
                let word = mem.load(INPUT_START + (i * WORD_SIZE) as u32)?;
                bytes.extend_from_slice(&word.to_le_bytes());
            }
            self.io.on_write(&bytes);
            self.io.on_commit(&bytes);
            let mut core = message_commitment(&bytes).to_vec();
            if self.corrupt_core {
                core[0] ^= 1;
            }
            Ok(core)
        }
    }

    struct AcceptAll;

    impl VerifyCircuit for AcceptAll {
        fn verify(&self, _core: &[u32]) -> Result<()> {
            Ok(())
        }
    }

    impl Engine for EchoEngine {
        fn prove_circuit<'a>(
            &self,
            _program: &Path,
            io: &'a mut (dyn IoHandler + 'a),
        ) -> Result<Box<dyn ProveCircuit + 'a>> {
            Ok(Box::new(EchoCircuit {
                io,
                echo_words: self.echo_words,
                corrupt_core: self.corrupt_core,
            }))
        }

        fn verify_circuit(&self, _code: &CodeId) -> Result<Box<dyn VerifyCircuit>> {
            Ok(Box::new(AcceptAll))
        }
    }

    fn program_with_id(dir: &tempfile::TempDir) -> PathBuf {
        let program = dir.path().join("echo");
        CodeId::new(vec![1, 2, 3]).save(&CodeId::path_for(&program)).unwrap();
        program
    }

    #[test]
    fn write_input_packs_little_endian_words() {
        let mut prover = Prover::new(EchoEngine { echo_words: 0, corrupt_core: false }, "unused");
        prover.write_input(&[0x20, 0x00, 0x00, 0x00]);
        prover.write_input(&[1, 2, 3]);
        assert_eq!(prover.input(), &[32, 0x0003_0201]);
    }

    #[test]
    fn input_writer_shares_the_pending_stream() {
        let mut prover = Prover::new(EchoEngine { echo_words: 0, corrupt_core: false }, "unused");
        prover.write_input(&[5, 0, 0, 0]);
        prover.input_writer().write(&vec![1u32, 2]);
        assert_eq!(prover.input(), &[5, 2, 1, 2]);
    }

    #[test]
    fn run_returns_self_verified_proof() {
        let dir = tempfile::tempdir().unwrap();
        let program = program_with_id(&dir);
        let mut prover = Prover::new(EchoEngine { echo_words: 2, corrupt_core: false }, &program);
        prover.write_input(&[0x20, 0, 0, 0, 1, 2, 3]);

        let proof = prover.run().unwrap();
        assert_eq!(proof.message(), &[0x20, 0, 0, 0, 1, 2, 3, 0]);
        assert_eq!(prover.output(), proof.message());
        assert_eq!(prover.commit_reader().read_word().unwrap(), 32);
        assert_eq!(u32::unarchive(&mut prover.output_reader()).unwrap(), 32);
        proof.verify(&EchoEngine { echo_words: 0, corrupt_core: false }, &program).unwrap();
    }

    #[test]
    fn run_never_returns_an_invalid_proof() {
        let dir = tempfile::tempdir().unwrap();
        let program = program_with_id(&dir);
        let mut prover = Prover::new(EchoEngine { echo_words: 1, corrupt_core: true }, &program);
        prover.write_input(&[9, 9, 9, 9]);
        let err = prover.run().unwrap_err();
        assert_eq!(err.phase(), Some(RunPhase::Verify));
        assert_eq!(err.kind(), ErrorKind::DigestMismatch);
    }

    #[test]
    fn run_reports_input_overflow_in_prove_phase() {
        let dir = tempfile::tempdir().unwrap();
        let program = program_with_id(&dir);
        let config = ProverConfig {
            memory: MemoryLayout {
                input_start: INPUT_START,
                input_end: INPUT_START + 4,
            },
            ..ProverConfig::default()
        };
        let engine = EchoEngine { echo_words: 0, corrupt_core: false };
        let mut prover = Prover::with_config(engine, &program, config).unwrap();
        prover.write_input(&[0u8; 12]);
        let err = prover.run().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SandboxOverflow);
        assert_eq!(err.phase(), Some(RunPhase::Prove));
        assert!(matches!(
            err,
            Error::Run { ref source, .. } if matches!(**source, Error::SandboxOverflow { addr, .. } if addr == INPUT_START as u64 + 8)
        ));
    }

    #[test]
    fn missing_code_id_fails_verification_phase() {
        let dir = tempfile::tempdir().unwrap();
        let mut prover =
            Prover::new(EchoEngine { echo_words: 0, corrupt_core: false }, dir.path().join("none"));
        let err = prover.run().unwrap_err();
        assert_eq!(err.phase(), Some(RunPhase::Verify));
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
