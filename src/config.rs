//! Prover and engine configuration

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result as AnyResult};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::key_store::{Key, KeyStore};
use crate::memory::MemoryLayout;

/// Default execution limit for the development engine
pub const DEFAULT_MAX_CYCLES: u64 = 1 << 24;

/// Largest accepted `max_cycles`; cycle counts are committed as 32-bit words
pub const MAX_CYCLE_LIMIT: u64 = u32::MAX as u64;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProverConfig {
    pub memory: MemoryLayout,
    /// Key material by id, hex encoded
    pub keys: BTreeMap<String, String>,
}

impl ProverConfig {
    /// Decode the configured keys into a key store
    pub fn key_store(&self) -> Result<KeyStore> {
        let mut store = KeyStore::new();
        for (id, material) in &self.keys {
            store.insert(id.clone(), Key::from_hex(material)?);
        }
        Ok(store)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_cycles: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cycles: DEFAULT_MAX_CYCLES,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_cycles > MAX_CYCLE_LIMIT {
            return Err(Error::Config(format!(
                "max_cycles {} exceeds the limit of {MAX_CYCLE_LIMIT}",
                self.max_cycles
            )));
        }
        Ok(())
    }
}

/// Complete configuration file
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub prover: ProverConfig,
    pub engine: EngineConfig,
}

impl Config {
    /// Load a JSON configuration file
    pub fn load(path: &Path) -> AnyResult<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.prover.memory.validate()?;
        config.engine.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::memory::INPUT_START;

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = serde_json::from_str(r#"{"engine": {"max_cycles": 100}}"#).unwrap();
        assert_eq!(config.engine.max_cycles, 100);
        assert_eq!(config.prover.memory, MemoryLayout::default());
        assert!(config.prover.keys.is_empty());
    }

    #[test]
    fn load_reads_keys_and_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            format!(
                r#"{{"prover": {{"memory": {{"input_end": {}}}, "keys": {{"mac": "0102"}}}}}}"#,
                INPUT_START + 60
            ),
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.prover.memory.input_capacity(), 16);
        let keys = config.prover.key_store().unwrap();
        assert_eq!(keys.get("mac").unwrap().as_bytes(), &[1, 2]);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn cycle_limit_must_fit_a_word() {
        let config = EngineConfig { max_cycles: MAX_CYCLE_LIMIT };
        config.validate().unwrap();
        let config = EngineConfig { max_cycles: MAX_CYCLE_LIMIT + 1 };
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::Config);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"engine": {"max_cycles": 4294967296}}"#).unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn load_rejects_invalid_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"prover": {"memory": {"input_start": 3}}}"#).unwrap();
        assert!(Config::load(&path).is_err());
    }
}
