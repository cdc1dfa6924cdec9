pub mod lfu;
pub mod lru;

use thiserror::Error as ThisError;

use lfu::Lfu;
use lru::Lru;

#[derive(Debug, ThisError, PartialEq)]
pub enum Error {
    #[error("the given eviction policy name was not found: {0}")]
    PolicyNotFound(String),
}

/// The closed set of eviction strategies the cache can run with.
///
/// A key enters the policy metadata on first `add`, has its rank updated by
/// `refresh`, and leaves it through `delete` or by being chosen as the
/// eviction victim. The store keeps the metadata key set equal to its own
/// key set at every quiescent point.
#[derive(Debug)]
pub enum Eviction {
    Lru(Lru),
    Lfu(Lfu),
}

impl Eviction {
    /// Instantiates a policy from its case-insensitive name.
    pub fn new(name: &str) -> Result<Eviction, Error> {
        match name.to_lowercase().as_str() {
            "lru" => Ok(Eviction::Lru(Lru::new())),
            "lfu" => Ok(Eviction::Lfu(Lfu::new())),
            _ => Err(Error::PolicyNotFound(name.to_string())),
        }
    }

    /// Registers a key as newly present. Behaves as `refresh` for a key the
    /// policy already knows.
    pub fn add(&mut self, key: &str) {
        match self {
            Eviction::Lru(policy) => policy.add(key),
            Eviction::Lfu(policy) => policy.add(key),
        }
    }

    /// Records an access to a known key.
    pub fn refresh(&mut self, key: &str) {
        match self {
            Eviction::Lru(policy) => policy.refresh(key),
            Eviction::Lfu(policy) => policy.refresh(key),
        }
    }

    /// Selects a victim, removes its metadata and returns its key. `None`
    /// when the policy tracks nothing.
    pub fn evict(&mut self) -> Option<String> {
        match self {
            Eviction::Lru(policy) => policy.evict(),
            Eviction::Lfu(policy) => policy.evict(),
        }
    }

    /// Removes a known key's metadata. Unknown keys are ignored.
    pub fn delete(&mut self, key: &str) {
        match self {
            Eviction::Lru(policy) => policy.delete(key),
            Eviction::Lfu(policy) => policy.delete(key),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Eviction::Lru(policy) => policy.len(),
            Eviction::Lfu(policy) => policy.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
