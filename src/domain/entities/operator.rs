use std::collections::HashSet;

use crate::application::errors::ConfigError;

/// Immutable set of operator identities, built once from config at startup.
///
/// Operators are the only users allowed to run privileged commands, and
/// the recipients of diagnostic broadcasts. The set is never mutated after
/// construction, so it can be shared freely behind an `Arc` without locking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorSet {
    ids: HashSet<String>,
}

impl OperatorSet {
    /// Build the set from configured ids. An empty list is a configuration
    /// error: a bot nobody can command and nobody gets reports from is
    /// misconfigured, not minimal.
    pub fn new(ids: impl IntoIterator<Item = String>) -> Result<Self, ConfigError> {
        let ids: HashSet<String> = ids.into_iter().collect();
        if ids.is_empty() {
            return Err(ConfigError::MissingField("operators".to_string()));
        }
        Ok(Self { ids })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
