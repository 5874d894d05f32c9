//! LMDB-backed overlay store with tenant isolation.
//!
//! Uses the heed crate (Rust bindings for LMDB) to keep the overlay in a
//! memory-mapped key-value store that survives process restarts.
//!
//! # Tenant Isolation
//!
//! All operations go through [`OverlayKey`], so entries of different tenants
//! live under different key prefixes.
//!
//! # Atomicity
//!
//! Each `set`, `add` and `delete` runs its read-check-write inside a single
//! LMDB write transaction, which gives the per-(tenant, key) atomicity the
//! sync engine relies on.

use std::path::Path;
use std::sync::RwLock;

use blogmeta_core::{
    ConfigError, LmdbConfig, ManagedKey, MetaError, MetaResult, StorageError, TenantId,
};
use chrono::{DateTime, Utc};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use super::tenant_key::OverlayKey;
use super::traits::{OverlayEntry, OverlayStats, OverlayStore, WriteOutcome};

/// Error type for LMDB overlay operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbOverlayError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Stored value is not in the expected layout.
    #[error("Corrupt entry: {0}")]
    Corrupt(String),

    /// The requested map size does not fit in memory addresses.
    #[error("Map size of {0} MB is too large")]
    MapSize(usize),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbOverlayError> for MetaError {
    fn from(e: LmdbOverlayError) -> Self {
        match e {
            LmdbOverlayError::MapSize(mb) => MetaError::Config(ConfigError::InvalidValue {
                field: "max_size_mb".to_string(),
                value: mb.to_string(),
                reason: e.to_string(),
            }),
            _ => MetaError::Storage(StorageError::TransactionFailed {
                reason: e.to_string(),
            }),
        }
    }
}

fn read_failed(tenant: TenantId, key: &str, reason: impl ToString) -> MetaError {
    MetaError::Storage(StorageError::ReadFailed {
        tenant,
        key: key.to_string(),
        reason: reason.to_string(),
    })
}

fn write_failed(tenant: TenantId, key: &str, reason: impl ToString) -> MetaError {
    MetaError::Storage(StorageError::WriteFailed {
        tenant,
        key: key.to_string(),
        reason: reason.to_string(),
    })
}

/// LMDB-backed overlay store.
///
/// Values are stored as `[stored_at millis: 8 bytes LE][payload UTF-8]`.
pub struct LmdbOverlayStore {
    env: Env,
    db: Database<Bytes, Bytes>,
    stats: RwLock<OverlayStats>,
}

impl LmdbOverlayStore {
    /// Open (or create) an overlay store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_size_mb` overflows a byte count, the directory
    /// cannot be created, or the LMDB environment or database cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbOverlayError> {
        let map_size = max_size_mb
            .checked_mul(1024 * 1024)
            .ok_or(LmdbOverlayError::MapSize(max_size_mb))?;
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbOverlayError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbOverlayError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbOverlayError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbOverlayError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
            stats: RwLock::new(OverlayStats::default()),
        })
    }

    /// Open using an [`LmdbConfig`].
    pub fn from_config(config: &LmdbConfig) -> MetaResult<Self> {
        config.validate()?;
        Ok(Self::open(&config.path, config.max_size_mb)?)
    }

    /// Entry with its write timestamp.
    pub fn entry(&self, tenant: TenantId, key: &str) -> MetaResult<Option<OverlayEntry>> {
        let encoded = OverlayKey::new(tenant, key).encode();
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbOverlayError::Transaction(e.to_string()))?;
        let entry = self
            .db
            .get(&rtxn, encoded.as_slice())
            .map_err(|e| read_failed(tenant, key, e))?
            .map(decode_value)
            .transpose()
            .map_err(|e| read_failed(tenant, key, e))?;
        Ok(entry)
    }

    fn bump(&self, update: impl FnOnce(&mut OverlayStats)) {
        let mut stats = self.stats.write().unwrap_or_else(|e| e.into_inner());
        update(&mut stats);
    }
}

fn encode_value(payload: &str, stored_at: DateTime<Utc>) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + payload.len());
    bytes.extend_from_slice(&stored_at.timestamp_millis().to_le_bytes());
    bytes.extend_from_slice(payload.as_bytes());
    bytes
}

fn decode_value(bytes: &[u8]) -> Result<OverlayEntry, LmdbOverlayError> {
    if bytes.len() < 8 {
        return Err(LmdbOverlayError::Corrupt("value shorter than timestamp".into()));
    }
    let timestamp_bytes: [u8; 8] = bytes[0..8]
        .try_into()
        .map_err(|_| LmdbOverlayError::Corrupt("invalid timestamp".into()))?;
    let stored_at = DateTime::from_timestamp_millis(i64::from_le_bytes(timestamp_bytes))
        .unwrap_or_else(Utc::now);
    let payload = std::str::from_utf8(&bytes[8..])
        .map_err(|e| LmdbOverlayError::Corrupt(e.to_string()))?
        .to_string();
    Ok(OverlayEntry { payload, stored_at })
}

impl OverlayStore for LmdbOverlayStore {
    fn get(&self, tenant: TenantId, key: &str) -> MetaResult<Option<String>> {
        let found = self.entry(tenant, key)?.map(|entry| entry.payload);
        if found.is_some() {
            self.bump(|s| s.hits += 1);
        } else {
            self.bump(|s| s.misses += 1);
        }
        Ok(found)
    }

    fn set(
        &self,
        tenant: TenantId,
        key: &str,
        payload: &str,
        previous: Option<&str>,
    ) -> MetaResult<WriteOutcome> {
        let encoded = OverlayKey::new(tenant, key).encode();

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbOverlayError::Transaction(e.to_string()))?;

        let current = self
            .db
            .get(&wtxn, encoded.as_slice())
            .map_err(|e| read_failed(tenant, key, e))?
            .map(decode_value)
            .transpose()
            .map_err(|e| read_failed(tenant, key, e))?;

        if let (Some(current), Some(prev)) = (&current, previous) {
            if current.payload != prev {
                wtxn.abort();
                self.bump(|s| s.conflicts += 1);
                return Ok(WriteOutcome::Conflict);
            }
        }

        self.db
            .put(&mut wtxn, encoded.as_slice(), encode_value(payload, Utc::now()).as_slice())
            .map_err(|e| write_failed(tenant, key, e))?;

        wtxn.commit()
            .map_err(|e| LmdbOverlayError::Transaction(e.to_string()))?;

        Ok(WriteOutcome::Written)
    }

    fn add(&self, tenant: TenantId, key: &str, payload: &str) -> MetaResult<bool> {
        let encoded = OverlayKey::new(tenant, key).encode();

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbOverlayError::Transaction(e.to_string()))?;

        let exists = self
            .db
            .get(&wtxn, encoded.as_slice())
            .map_err(|e| read_failed(tenant, key, e))?
            .is_some();
        if exists {
            wtxn.abort();
            return Ok(false);
        }

        self.db
            .put(&mut wtxn, encoded.as_slice(), encode_value(payload, Utc::now()).as_slice())
            .map_err(|e| write_failed(tenant, key, e))?;

        wtxn.commit()
            .map_err(|e| LmdbOverlayError::Transaction(e.to_string()))?;

        Ok(true)
    }

    fn delete(&self, tenant: TenantId, key: &str) -> MetaResult<bool> {
        let encoded = OverlayKey::new(tenant, key).encode();

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbOverlayError::Transaction(e.to_string()))?;

        let deleted = self
            .db
            .delete(&mut wtxn, encoded.as_slice())
            .map_err(|e| write_failed(tenant, key, e))?;

        wtxn.commit()
            .map_err(|e| LmdbOverlayError::Transaction(e.to_string()))?;

        Ok(deleted)
    }

    fn tenant_keys(&self, tenant: TenantId) -> MetaResult<Vec<ManagedKey>> {
        let prefix = OverlayKey::tenant_prefix(tenant);
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbOverlayError::Transaction(e.to_string()))?;

        let iter = self
            .db
            .iter(&rtxn)
            .map_err(|e| LmdbOverlayError::Transaction(e.to_string()))?;

        let mut keys = Vec::new();
        for result in iter {
            let (raw, _) = result.map_err(|e| LmdbOverlayError::Transaction(e.to_string()))?;
            if !raw.starts_with(&prefix) {
                continue;
            }
            if let Some(key) = OverlayKey::decode(raw) {
                keys.push(key.key().clone());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn stats(&self) -> MetaResult<OverlayStats> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbOverlayError::Transaction(e.to_string()))?;
        let entry_count = self
            .db
            .len(&rtxn)
            .map_err(|e| LmdbOverlayError::Transaction(e.to_string()))?;

        let mut stats = self
            .stats
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        stats.entry_count = entry_count;
        Ok(stats)
    }
}
