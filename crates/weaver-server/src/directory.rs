//! Known owner accounts.
//!
//! The control plane does not manage interactive users; it only needs to
//! resolve the `owner_id` attached to a registration against a configured
//! set of accounts.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct AccountDirectory {
    // owner id -> display name
    owners: HashMap<String, String>,
}

impl AccountDirectory {
    pub fn new(owners: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            owners: owners.into_iter().collect(),
        }
    }

    /// Resolve an owner id to its display name.
    pub fn resolve(&self, owner_id: &str) -> Option<&str> {
        self.owners.get(owner_id).map(String::as_str)
    }

    pub fn contains(&self, owner_id: &str) -> bool {
        self.owners.contains_key(owner_id)
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn resolve_known_owner() {
        let dir = AccountDirectory::new([("u1".to_string(), "Alice".to_string())]);
        assert_eq!(dir.resolve("u1"), Some("Alice"));
        assert!(dir.contains("u1"));
    }

    #[test]
    fn unknown_owner_does_not_resolve() {
        let dir = AccountDirectory::new([("u1".to_string(), "Alice".to_string())]);
        assert_eq!(dir.resolve("u2"), None);
        assert!(!dir.contains("u2"));
    }

    #[test]
    fn empty_directory() {
        let dir = AccountDirectory::default();
        assert!(dir.is_empty());
        assert_eq!(dir.len(), 0);
    }
}
