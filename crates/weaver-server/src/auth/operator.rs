//! Static operator keyring.
//!
//! Operator endpoints authenticate with a bearer key from the configured
//! `name:key` list. An empty keyring rejects every operator request.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct OperatorKeyring {
    // key -> operator name
    keys: HashMap<String, String>,
}

impl OperatorKeyring {
    /// Build a keyring from `(name, key)` pairs.
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            keys: pairs.into_iter().map(|(name, key)| (key, name)).collect(),
        }
    }

    /// Look up the operator name for a presented key.
    pub fn authenticate(&self, presented: &str) -> Option<&str> {
        self.keys.get(presented).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn authenticate_known_key() {
        let ring = OperatorKeyring::new([("alice".to_string(), "k-1".to_string())]);
        assert_eq!(ring.authenticate("k-1"), Some("alice"));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let ring = OperatorKeyring::new([("alice".to_string(), "k-1".to_string())]);
        assert_eq!(ring.authenticate("k-2"), None);
    }

    #[test]
    fn empty_keyring_rejects_everything() {
        let ring = OperatorKeyring::default();
        assert!(ring.is_empty());
        assert_eq!(ring.authenticate(""), None);
    }
}
