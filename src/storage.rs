// Thin re-export module: storage is split into key construction, the
// transaction overlay and the persistent backends.

pub mod keys;
pub mod overlay;
pub mod persistence;

pub use overlay::*;
pub use persistence::*;

use crate::error::Result;

/// Byte-keyed state store consumed by the native contracts.
pub trait Store {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;
    fn delete(&mut self, key: &[u8]) -> Result<()>;

    /// Applies a batch of writes (`None` deletes) atomically.
    fn write_batch(&mut self, batch: &[(Vec<u8>, Option<Vec<u8>>)]) -> Result<()> {
        for (key, value) in batch {
            match value {
                Some(v) => self.put(key, v)?,
                None => self.delete(key)?,
            }
        }
        Ok(())
    }
}
