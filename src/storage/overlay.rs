//! Transaction-scoped write overlay over a persistent [`Store`].

use super::Store;
use crate::error::Result;
use std::collections::BTreeMap;
use tracing::debug;

/// Buffers writes made during one transaction. Reads see buffered writes
/// first. `commit` flushes them to the backend in one batch, `discard` drops
/// them.
pub struct OverlayDb<S: Store> {
    backend: S,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<S: Store> OverlayDb<S> {
    pub fn new(backend: S) -> Self {
        OverlayDb {
            backend,
            writes: BTreeMap::new(),
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.backend
    }

    pub fn pending(&self) -> usize {
        self.writes.len()
    }

    pub fn commit(&mut self) -> Result<()> {
        let batch: Vec<(Vec<u8>, Option<Vec<u8>>)> = std::mem::take(&mut self.writes).into_iter().collect();
        debug!("committing {} overlay writes", batch.len());
        self.backend.write_batch(&batch)
    }

    pub fn discard(&mut self) {
        debug!("discarding {} overlay writes", self.writes.len());
        self.writes.clear();
    }
}

impl<S: Store> Store for OverlayDb<S> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.writes.get(key) {
            Some(value) => Ok(value.clone()),
            None => self.backend.get(key),
        }
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_reads_see_pending_writes() {
        let mut backend = MemoryStore::new();
        backend.put(b"k", b"old").unwrap();

        let mut db = OverlayDb::new(backend);
        db.put(b"k", b"new").unwrap();
        assert_eq!(db.get(b"k").unwrap(), Some(b"new".to_vec()));
        assert_eq!(db.backend().get(b"k").unwrap(), Some(b"old".to_vec()));

        db.delete(b"k").unwrap();
        assert_eq!(db.get(b"k").unwrap(), None);
    }

    #[test]
    fn test_commit_and_discard() {
        let mut db = OverlayDb::new(MemoryStore::new());
        db.put(b"a", b"1").unwrap();
        db.commit().unwrap();
        assert_eq!(db.pending(), 0);
        assert_eq!(db.backend().get(b"a").unwrap(), Some(b"1".to_vec()));

        db.put(b"b", b"2").unwrap();
        db.delete(b"a").unwrap();
        db.discard();
        assert_eq!(db.get(b"b").unwrap(), None);
        assert_eq!(db.get(b"a").unwrap(), Some(b"1".to_vec()));
    }
}
