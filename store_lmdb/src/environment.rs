//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::{LmdbBalanceStore, LmdbError, LmdbShipmentStore};

/// Named databases, in the order they are created.
pub(crate) const DATABASES: &[&str] = &["shipments", "sender_index", "meta", "balances", "payouts"];

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    /// `id(be u64)` → bincode `Shipment`.
    pub(crate) shipments_db: Database<Bytes, Bytes>,
    /// `sender(20) ++ local_index(be u64)` → `id(be u64)`.
    pub(crate) sender_index_db: Database<Bytes, Bytes>,
    /// Counters, e.g. `next_id`.
    pub(crate) meta_db: Database<Bytes, Bytes>,
    /// `account(20)` → balance `(be u128)`.
    pub(crate) balances_db: Database<Bytes, Bytes>,
    /// `shipment id(be u64)` → bincode `Payout`.
    pub(crate) payouts_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    ///
    /// `map_size` is the maximum size of the memory map in bytes.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per path in this process and
        // the map is never truncated by another writer while open.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(DATABASES.len() as u32)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let shipments_db = env.create_database(&mut wtxn, Some("shipments"))?;
        let sender_index_db = env.create_database(&mut wtxn, Some("sender_index"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        let balances_db = env.create_database(&mut wtxn, Some("balances"))?;
        let payouts_db = env.create_database(&mut wtxn, Some("payouts"))?;
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env: Arc::new(env),
            shipments_db,
            sender_index_db,
            meta_db,
            balances_db,
            payouts_db,
        })
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    pub fn shipment_store(&self) -> LmdbShipmentStore {
        LmdbShipmentStore {
            env: Arc::clone(&self.env),
            shipments_db: self.shipments_db,
            sender_index_db: self.sender_index_db,
            meta_db: self.meta_db,
        }
    }

    pub fn balance_store(&self) -> LmdbBalanceStore {
        LmdbBalanceStore {
            env: Arc::clone(&self.env),
            balances_db: self.balances_db,
            payouts_db: self.payouts_db,
        }
    }
}
