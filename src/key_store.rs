//! Key material available to a program while it runs

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// Opaque key bytes. `Debug` does not print the material.
#[derive(Clone, PartialEq, Eq)]
pub struct Key(Vec<u8>);

impl Key {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        hex::decode(text)
            .map(Self)
            .map_err(|err| Error::Config(format!("key material is not valid hex: {err}")))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key(<{} bytes>)", self.0.len())
    }
}

/// Keys by identifier, owned by a single prover
#[derive(Clone, Debug, Default)]
pub struct KeyStore {
    keys: BTreeMap<String, Key>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key, returning the one it replaced
    pub fn insert(&mut self, id: impl Into<String>, key: Key) -> Option<Key> {
        self.keys.insert(id.into(), key)
    }

    pub fn get(&self, id: &str) -> Option<&Key> {
        self.keys.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.keys.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Key> {
        self.keys.remove(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_id() {
        let mut store = KeyStore::new();
        assert!(store.insert("signing", Key::new(vec![1, 2, 3])).is_none());
        assert!(store.contains("signing"));
        assert_eq!(store.get("signing").unwrap().as_bytes(), &[1, 2, 3]);
        assert!(store.get("missing").is_none());

        let old = store.insert("signing", Key::from_hex("ff00").unwrap()).unwrap();
        assert_eq!(old.len(), 3);
        assert_eq!(store.ids().collect::<Vec<_>>(), vec!["signing"]);
    }

    #[test]
    fn debug_hides_material() {
        let key = Key::new(b"secret".to_vec());
        assert_eq!(format!("{key:?}"), "Key(<6 bytes>)");
    }

    #[test]
    fn bad_hex_is_a_config_error() {
        assert!(Key::from_hex("zz").is_err());
    }
}
