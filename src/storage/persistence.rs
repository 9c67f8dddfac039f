//! Persistent backends for ledger state and the genesis block.

use super::Store;
use crate::block::Block;
use crate::error::{ChainError, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Storage of recorded blocks, keyed by height.
pub trait BlockStore {
    fn save_block(&mut self, block: &Block) -> Result<()>;
    fn load_block(&self, height: u32) -> Result<Option<Block>>;
    fn remove_block(&mut self, height: u32) -> Result<()>;
}

/// SQLite-backed store. Ledger state lives in a `kv` table, blocks in a
/// `blocks` table as bincode blobs.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    ChainError::DatabaseError(format!("Failed to create data dir {:?}: {}", parent, e))
                })?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| ChainError::DatabaseError(format!("Failed to open database: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key BLOB PRIMARY KEY,
                value BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to create kv table: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS blocks (
                height INTEGER PRIMARY KEY,
                hash BLOB NOT NULL,
                data BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to create blocks table: {}", e)))?;

        Ok(SqliteStore { conn: Mutex::new(conn) })
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }
}

impl Store for SqliteStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let conn = self.conn.lock();
        conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
            .map_err(|e| ChainError::DatabaseError(format!("Failed to read key: {}", e)))
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to write key: {}", e)))?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(|e| ChainError::DatabaseError(format!("Failed to delete key: {}", e)))?;
        Ok(())
    }

    fn write_batch(&mut self, batch: &[(Vec<u8>, Option<Vec<u8>>)]) -> Result<()> {
        let conn = self.conn.get_mut();
        let tx = conn.transaction().map_err(|e| {
            ChainError::DatabaseError(format!("Failed to start transaction: {}", e))
        })?;

        for (key, value) in batch {
            let applied = match value {
                Some(v) => tx.execute(
                    "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                    params![key, v],
                ),
                None => tx.execute("DELETE FROM kv WHERE key = ?1", params![key]),
            };
            applied.map_err(|e| ChainError::DatabaseError(format!("Failed to apply batch: {}", e)))?;
        }

        tx.commit().map_err(|e| {
            ChainError::DatabaseError(format!("Failed to commit transaction: {}", e))
        })
    }
}

impl BlockStore for SqliteStore {
    fn save_block(&mut self, block: &Block) -> Result<()> {
        let data = bincode::serialize(block)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO blocks (height, hash, data) VALUES (?1, ?2, ?3)",
            params![block.header.height, block.hash().to_vec(), data],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to save block: {}", e)))?;
        Ok(())
    }

    fn load_block(&self, height: u32) -> Result<Option<Block>> {
        let conn = self.conn.lock();
        let data: Option<Vec<u8>> = conn
            .query_row("SELECT data FROM blocks WHERE height = ?1", params![height], |row| row.get(0))
            .optional()
            .map_err(|e| ChainError::DatabaseError(format!("Failed to load block: {}", e)))?;
        match data {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn remove_block(&mut self, height: u32) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM blocks WHERE height = ?1", params![height])
            .map_err(|e| ChainError::DatabaseError(format!("Failed to remove block: {}", e)))?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    blocks: BTreeMap<u32, Block>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

impl BlockStore for MemoryStore {
    fn save_block(&mut self, block: &Block) -> Result<()> {
        self.blocks.insert(block.header.height, block.clone());
        Ok(())
    }

    fn load_block(&self, height: u32) -> Result<Option<Block>> {
        Ok(self.blocks.get(&height).cloned())
    }

    fn remove_block(&mut self, height: u32) -> Result<()> {
        self.blocks.remove(&height);
        Ok(())
    }
}
