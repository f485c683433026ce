//! Durable key-value persistence for session data.
//!
//! Three backends implement `KeyValueStore`:
//! - `MemoryStore`: process-local, for tests and throwaway sessions
//! - `FileStore`: a JSON object on disk in the platform data directory
//! - `KeychainStore`: one OS keychain entry per key

pub mod file;
pub mod keychain;
pub mod memory;

use anyhow::Result;

pub use file::FileStore;
pub use keychain::KeychainStore;
pub use memory::MemoryStore;

/// String entries under fixed keys. Removing an absent key is not an error.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;

    /// Whether entries survive a process restart.
    fn is_persistent(&self) -> bool;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn is_persistent(&self) -> bool {
        (**self).is_persistent()
    }
}
