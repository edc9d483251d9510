//! State fingerprinting using Blake3

use crate::error::StateError;
use crate::types::StateHash;
use blake3::Hasher as Blake3Hasher;
use serde::Serialize;

/// Computes stable fingerprints of serializable values.
///
/// Values are encoded with bincode before hashing. Maps must be ordered
/// (the ledger is a `BTreeMap`) for the fingerprint to be stable.
#[derive(Debug, Clone, Default)]
pub struct StateHasher;

impl StateHasher {
    pub fn new() -> Self {
        Self
    }

    /// Fingerprint a value with Blake3
    ///
    /// # Arguments
    /// * `value` - Anything serializable; session states and ledgers in practice
    ///
    /// # Returns
    /// The 32-byte hash, or `StateError::FingerprintFailed` if bincode rejects the value
    pub fn hash<T: Serialize>(&self, value: &T) -> Result<StateHash, StateError> {
        let encoded = bincode::serialize(value).map_err(|e| StateError::FingerprintFailed {
            reason: e.to_string(),
        })?;

        let mut hasher = Blake3Hasher::new();
        hasher.update(&encoded);
        Ok(StateHash(*hasher.finalize().as_bytes()))
    }
}
