//! Name-keyed storage of opaque configuration blobs.
//!
//! The render backend never depends on this; hosts use it to persist their
//! own settings next to the UI.

mod dir;

pub use dir::DirBlobStore;

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid blob name {0:?}")]
    InvalidName(String),

    #[error("no blob named {0:?}")]
    NotFound(String),

    #[error("blob store i/o failed for {name:?}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Opaque byte blobs addressed by name.
pub trait BlobStore {
    /// Writes `bytes` under `name`, replacing any previous blob.
    fn save(&mut self, name: &str, bytes: &[u8]) -> Result<(), StoreError>;

    fn load(&self, name: &str) -> Result<Vec<u8>, StoreError>;

    /// Removes `name`. Removing a missing blob succeeds.
    fn remove(&mut self, name: &str) -> Result<(), StoreError>;

    /// Creates an empty blob, truncating an existing one.
    fn create(&mut self, name: &str) -> Result<(), StoreError>;

    /// Names of all stored blobs, sorted.
    fn list(&self) -> Result<Vec<String>, StoreError>;
}

/// Accepts non-empty names without path separators or parent references.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.chars().any(|c| matches!(c, '/' | '\\' | ':' | '\0'));
    if bad {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_with_separators_are_rejected() {
        for name in ["", "..", "a/b", "a\\b", "c:x"] {
            assert!(matches!(validate_name(name), Err(StoreError::InvalidName(_))), "{name}");
        }
        assert!(validate_name("default").is_ok());
        assert!(validate_name("legit.v2").is_ok());
    }
}
