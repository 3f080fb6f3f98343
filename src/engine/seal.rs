//! Core layout of the development engine
//!
//! ```text
//! words  0..8   message digest, or the literal message if <= 32 bytes
//! word   8      message length in bytes
//! word   9      cycle count
//! words 10..14  trace fingerprint (BabyBear)
//! words 14..22  seal over the code id and words 0..14
//! ```

use byteorder::{ByteOrder, LittleEndian};
use p3_baby_bear::BabyBear;
use p3_field::{FieldAlgebra, PrimeField32};
use p3_matrix::dense::RowMajorMatrix;
use p3_matrix::Matrix;
use sha2::{Digest, Sha256};

use super::columns::generate_trace;
use super::trace::ExecutionTrace;
use crate::code_id::CodeId;
use crate::error::{Error, Result};
use crate::proof::{message_commitment, MESSAGE_LEN_SLOT};
use crate::{BABY_BEAR_PRIME, DIGEST_BYTES};

pub const CYCLE_SLOT: usize = MESSAGE_LEN_SLOT + 1;
pub const FINGERPRINT_OFFSET: usize = CYCLE_SLOT + 1;
pub const FINGERPRINT_WORDS: usize = 4;
pub const SEAL_OFFSET: usize = FINGERPRINT_OFFSET + FINGERPRINT_WORDS;
pub const SEAL_WORDS: usize = DIGEST_BYTES / 4;
pub const CORE_WORDS: usize = SEAL_OFFSET + SEAL_WORDS;

const FINGERPRINT_DOMAIN: &[u8] = b"zkvm-prover/dev/fingerprint";
const SEAL_DOMAIN: &[u8] = b"zkvm-prover/dev/seal";

fn digest_words(parts: &[&[u8]]) -> [u32; SEAL_WORDS] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let digest: [u8; DIGEST_BYTES] = hasher.finalize().into();
    let mut words = [0u32; SEAL_WORDS];
    LittleEndian::read_u32_into(&digest, &mut words);
    words
}

fn challenges(code: &CodeId) -> [BabyBear; FINGERPRINT_WORDS] {
    let words = digest_words(&[FINGERPRINT_DOMAIN, code.as_bytes()]);
    let mut out = [BabyBear::ZERO; FINGERPRINT_WORDS];
    for (slot, word) in out.iter_mut().zip(words) {
        *slot = BabyBear::from_canonical_u32(word % BABY_BEAR_PRIME);
    }
    out
}

/// Fold every row of the trace matrix into one accumulator per challenge
pub fn fingerprint(matrix: &RowMajorMatrix<BabyBear>, code: &CodeId) -> [u32; FINGERPRINT_WORDS] {
    let alphas = challenges(code);
    let mut acc = [BabyBear::ZERO; FINGERPRINT_WORDS];
    for row in matrix.values.chunks_exact(matrix.width()) {
        for (acc, &alpha) in acc.iter_mut().zip(&alphas) {
            let compressed = row
                .iter()
                .fold(BabyBear::ZERO, |sum, &value| sum * alpha + value);
            *acc = *acc * alpha + compressed;
        }
    }
    acc.map(|x| x.as_canonical_u32())
}

/// Seal binding `body` (core words before the seal) to `code`
pub fn seal(code: &CodeId, body: &[u32]) -> [u32; SEAL_WORDS] {
    let mut bytes = vec![0u8; body.len() * 4];
    LittleEndian::write_u32_into(body, &mut bytes);
    digest_words(&[SEAL_DOMAIN, code.as_bytes(), &bytes])
}

pub fn build_core(code: &CodeId, trace: &ExecutionTrace) -> Vec<u32> {
    let mut core = vec![0u32; CORE_WORDS];
    core[..CYCLE_SLOT].copy_from_slice(&message_commitment(&trace.journal));
    core[CYCLE_SLOT] = trace.num_cycles() as u32;

    let matrix = generate_trace::<BabyBear>(trace);
    core[FINGERPRINT_OFFSET..SEAL_OFFSET].copy_from_slice(&fingerprint(&matrix, code));

    let sealed = seal(code, &core[..SEAL_OFFSET]);
    core[SEAL_OFFSET..].copy_from_slice(&sealed);
    core
}

pub fn check_core(code: &CodeId, core: &[u32]) -> Result<()> {
    if core.len() != CORE_WORDS {
        return Err(Error::circuit(format!(
            "core has {} words, expected {CORE_WORDS}",
            core.len()
        )));
    }
    if seal(code, &core[..SEAL_OFFSET]) != core[SEAL_OFFSET..] {
        return Err(Error::circuit(format!("core is not sealed for code id {code}")));
    }
    Ok(())
}
