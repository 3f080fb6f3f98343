//! Program identity artifacts

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Extension appended to a program path to locate its identity
pub const CODE_ID_EXTENSION: &str = "id";

/// Opaque fingerprint of a compiled program
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeId(Vec<u8>);

impl CodeId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// `<program>.id`
    pub fn path_for(program: &Path) -> PathBuf {
        let mut path = OsString::from(program.as_os_str());
        path.push(".");
        path.push(CODE_ID_EXTENSION);
        PathBuf::from(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!("Reading code id from {}", path.display());
        std::fs::read(path)
            .map(Self)
            .map_err(|err| Error::io(path, err))
    }

    /// Identity of `program`, read from its companion file
    pub fn load_for(program: &Path) -> Result<Self> {
        Self::load(&Self::path_for(program))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.0).map_err(|err| Error::io(path, err))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for CodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Debug for CodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CodeId({self})")
    }
}
