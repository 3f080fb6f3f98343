//! Error types for the prover host

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Phase of [`crate::Prover::run`] in which a failure occurred
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    /// Building the sandbox around the prover's buffers
    Sandbox,
    /// Resolving the program into a circuit
    Load,
    /// Executing and proving
    Prove,
    /// Self-verification of the fresh proof
    Verify,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Sandbox => "sandbox",
            RunPhase::Load => "load",
            RunPhase::Prove => "prove",
            RunPhase::Verify => "verify",
        };
        f.write_str(name)
    }
}

/// Coarse classification of an [`Error`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    StreamBounds,
    SandboxOverflow,
    Circuit,
    SizeMismatch,
    DigestMismatch,
    Io,
    Config,
}

#[derive(Debug, Error)]
pub enum Error {
    /// A read crossed the end of the buffer
    #[error("read out of bounds: cursor {cursor}, buffer length {len}")]
    StreamBounds { cursor: usize, len: usize },

    /// Staged input did not fit the input window
    #[error("out of memory: inputs (address {addr:#010x} is past input window end {end:#010x})")]
    SandboxOverflow { addr: u64, end: u32 },

    /// The proving or verification engine reported a failure
    #[error("circuit error: {0}")]
    Circuit(String),

    /// Message length differs from the length recorded in the core
    #[error("message size ({actual}) does not match proof core ({expected})")]
    SizeMismatch { expected: u32, actual: usize },

    /// Message content differs from the digest or literal bytes in the core
    #[error("proof message/core mismatch: core has {expected}, message gives {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{phase} phase failed: {source}")]
    Run {
        phase: RunPhase,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn circuit(msg: impl Into<String>) -> Self {
        Error::Circuit(msg.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Tag this error with the run phase it occurred in
    pub fn in_phase(self, phase: RunPhase) -> Self {
        Error::Run {
            phase,
            source: Box::new(self),
        }
    }

    /// Kind of the underlying failure, looking through phase tags
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::StreamBounds { .. } => ErrorKind::StreamBounds,
            Error::SandboxOverflow { .. } => ErrorKind::SandboxOverflow,
            Error::Circuit(_) => ErrorKind::Circuit,
            Error::SizeMismatch { .. } => ErrorKind::SizeMismatch,
            Error::DigestMismatch { .. } => ErrorKind::DigestMismatch,
            Error::Io { .. } => ErrorKind::Io,
            Error::Config(_) => ErrorKind::Config,
            Error::Run { source, .. } => source.kind(),
        }
    }

    /// Phase tag, if the error came out of [`crate::Prover::run`]
    pub fn phase(&self) -> Option<RunPhase> {
        match self {
            Error::Run { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}
