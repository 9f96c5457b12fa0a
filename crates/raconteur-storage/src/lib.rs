//! Raconteur Storage - low-level persistence layer backing the reasoning
//! runtime's side-channel managers.
//!
//! This crate provides a `redb`-embedded key-value table plus a
//! `RemoteCachePort` implementation over it, used as the durable tier behind
//! [`raconteur_ai::agent::reasoning::session_continuity::SessionContinuityCache`]
//! and as a persistence option for self-improvement execution records. The
//! reasoning runtime itself never depends on this crate directly — only the
//! composition root (`raconteur-core`) wires a concrete store into it through
//! the `raconteur_traits::ports` traits.

pub mod kv_store;
mod paths;
pub mod range_utils;
pub mod remote_cache;
mod simple_storage;
pub mod time_utils;

use anyhow::Result;
use redb::Database;
use std::sync::Arc;

pub use kv_store::KvStoreStorage;
pub use paths::{ensure_raconteur_dir, master_key_path, resolve_raconteur_dir};
pub use remote_cache::RedbRemoteCache;
pub use simple_storage::SimpleStorage;

/// Central storage handle. Presently wraps only the KV table the remote
/// cache port is backed by; the teacher's much larger multi-table `Storage`
/// (agents, skills, triggers, chat sessions, background jobs, ...) belonged
/// to the surrounding product surface this workspace no longer carries —
/// see DESIGN.md.
pub struct Storage {
    db: Arc<Database>,
    pub kv: KvStoreStorage,
}

impl Storage {
    /// Create a new storage instance at the given path, creating the
    /// database file and its tables if they don't exist.
    pub fn new(path: &str) -> Result<Self> {
        let db = Arc::new(Database::create(path)?);
        let kv = KvStoreStorage::new(db.clone())?;
        Ok(Self { db, kv })
    }

    /// Get a reference to the underlying database.
    pub fn get_db(&self) -> Arc<Database> {
        self.db.clone()
    }
}
