//! Session store port - per-client key/value context

use crate::domain::result::Result;

/// Opaque key/value context for one client's session
///
/// One instance corresponds to one client (a cookie, a CLI profile, ...).
/// The backend is up to the adapter: memory, a file, a shared cache.
pub trait SessionStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove every key. Must succeed when the store is already empty.
    fn clear(&self) -> Result<()>;
}
