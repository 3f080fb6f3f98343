//! Proof artifact and its message/core consistency rules

use std::path::Path;

use anyhow::Result as AnyResult;
use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::archive::ArchiveReader;
use crate::circuit::Engine;
use crate::error::{Error, Result};
use crate::stream::CheckedStreamReader;
use crate::verifier::Verifier;
use crate::{sha256, DIGEST_BYTES};

/// Core words holding the message digest, or the literal short message
pub const DIGEST_WORDS: usize = 8;

/// Core word holding the message length in bytes
pub const MESSAGE_LEN_SLOT: usize = 8;

/// Messages up to this many bytes are stored literally in the core.
/// Matches the digest width; existing verifiers depend on it.
pub const INLINE_MESSAGE_LIMIT: usize = 32;

/// Core commitment paired with the committed message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    core: Vec<u32>,
    message: Vec<u8>,
}

impl Proof {
    pub fn new(core: Vec<u32>, message: Vec<u8>) -> Self {
        Self { core, message }
    }

    pub fn core(&self) -> &[u32] {
        &self.core
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }

    /// Archive reader positioned at the start of the message
    pub fn reader(&self) -> ArchiveReader<CheckedStreamReader<&[u8]>> {
        ArchiveReader::new(CheckedStreamReader::new(self.message.as_slice()))
    }

    /// Check this proof against the identity stored beside `program`
    pub fn verify<E: Engine + ?Sized>(&self, engine: &E, program: &Path) -> Result<()> {
        Verifier::load(engine, program)?.verify(self)
    }

    /// Check that the message matches the length and digest recorded in the
    /// core. Does not involve the circuit.
    pub fn check_message(&self) -> Result<()> {
        let Some(&recorded) = self.core.get(MESSAGE_LEN_SLOT) else {
            return Err(Error::circuit(format!(
                "core has {} words, no message length slot",
                self.core.len()
            )));
        };
        if self.message.len() != recorded as usize {
            return Err(Error::SizeMismatch {
                expected: recorded,
                actual: self.message.len(),
            });
        }

        let mut committed = [0u8; DIGEST_BYTES];
        LittleEndian::write_u32_into(&self.core[..DIGEST_WORDS], &mut committed);

        if self.message.len() > INLINE_MESSAGE_LIMIT {
            let digest = sha256(&self.message);
            if digest != committed {
                return Err(Error::DigestMismatch {
                    expected: hex::encode(committed),
                    actual: hex::encode(digest),
                });
            }
        } else {
            let literal = &committed[..self.message.len()];
            if literal != self.message.as_slice() {
                return Err(Error::DigestMismatch {
                    expected: hex::encode(literal),
                    actual: hex::encode(&self.message),
                });
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> AnyResult<()> {
        let data = bincode::serialize(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn load(path: &Path) -> AnyResult<Self> {
        let data = std::fs::read(path)?;
        let proof: Self = bincode::deserialize(&data)?;
        Ok(proof)
    }
}

/// Digest-or-literal words and length slot for `message`, as an engine
/// lays them out at the front of its core
pub fn message_commitment(message: &[u8]) -> [u32; DIGEST_WORDS + 1] {
    let mut words = [0u32; DIGEST_WORDS + 1];
    let mut bytes = [0u8; DIGEST_BYTES];
    if message.len() > INLINE_MESSAGE_LIMIT {
        bytes = sha256(message);
    } else {
        bytes[..message.len()].copy_from_slice(message);
    }
    LittleEndian::read_u32_into(&bytes, &mut words[..DIGEST_WORDS]);
    words[MESSAGE_LEN_SLOT] = message.len() as u32;
    words
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::error::ErrorKind;

    fn proof_for(message: &[u8]) -> Proof {
        Proof::new(message_commitment(message).to_vec(), message.to_vec())
    }

    #[test]
    fn short_message_is_compared_literally() {
        let proof = proof_for(&[0x2a]);
        assert_eq!(proof.core()[0], 0x2a);
        proof.check_message().unwrap();

        let tampered = Proof::new(proof.core().to_vec(), vec![0x2b]);
        assert_eq!(tampered.check_message().unwrap_err().kind(), ErrorKind::DigestMismatch);
    }

    #[test]
    fn thirty_two_bytes_stay_literal() {
        let message: Vec<u8> = (0..32).collect();
        let proof = proof_for(&message);
        assert_eq!(proof.core()[0], 0x0302_0100);
        proof.check_message().unwrap();
    }

    #[test]
    fn long_message_is_compared_by_digest() {
        let message: Vec<u8> = (0..33).collect();
        let proof = proof_for(&message);
        let mut digest_words = [0u32; DIGEST_WORDS];
        LittleEndian::read_u32_into(&sha256(&message), &mut digest_words);
        assert_eq!(&proof.core()[..DIGEST_WORDS], &digest_words);
        proof.check_message().unwrap();
    }

    #[test]
    fn any_single_bit_flip_is_detected() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let len = rng.gen_range(1..=96usize);
            let message: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            let proof = proof_for(&message);
            proof.check_message().unwrap();

            let bit = rng.gen_range(0..len * 8);
            let mut flipped = message;
            flipped[bit / 8] ^= 1 << (bit % 8);
            let err = Proof::new(proof.core().to_vec(), flipped).check_message().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::DigestMismatch, "len {len}, bit {bit}");
        }
    }

    #[test]
    fn length_change_is_a_size_mismatch() {
        let proof = proof_for(b"hello");
        let err = Proof::new(proof.core().to_vec(), b"hello!".to_vec())
            .check_message()
            .unwrap_err();
        match err {
            Error::SizeMismatch { expected, actual } => {
                assert_eq!(expected, 5);
                assert_eq!(actual, 6);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_message_verifies() {
        proof_for(&[]).check_message().unwrap();
    }

    #[test]
    fn truncated_core_is_rejected() {
        let proof = Proof::new(vec![0; 4], Vec::new());
        assert_eq!(proof.check_message().unwrap_err().kind(), ErrorKind::Circuit);
    }

    #[test]
    fn reader_decodes_message() {
        let mut message = Vec::new();
        message.extend_from_slice(&7u32.to_le_bytes());
        message.extend_from_slice(&9u32.to_le_bytes());
        let proof = proof_for(&message);
        let mut reader = proof.reader();
        assert_eq!(reader.read_word().unwrap(), 7);
        assert_eq!(reader.read_word().unwrap(), 9);
        assert!(reader.read_word().is_err());
    }

    #[test]
    fn save_and_load_preserve_both_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proof.bin");
        let proof = proof_for(b"a message longer than thirty-two bytes");
        proof.save(&path).unwrap();
        assert_eq!(Proof::load(&path).unwrap(), proof);
    }
}
