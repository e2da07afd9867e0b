// Copyright (c) 2025 - Cowboy AI, Inc.
//! Asset Record Storage
//!
//! Every tracked asset owns exactly one persisted JSON document keyed by a
//! stable string id. Handlers borrow a record for the duration of one merge
//! and never cache it between events.
//!
//! # Contract
//!
//! - `exists(id)` reports whether a record is stored under `id`
//! - `create(id, value)` fails with [`StorageError::AlreadyExists`] if it is
//! - `update(id, value)` replaces an existing record
//! - `select(id)` returns the stored document
//!
//! No locking is provided by callers. Two concurrent merges for the same id
//! are only safe if the backend offers conditional writes.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;

pub mod nats_kv;

pub use nats_kv::NatsKvStorage;

/// Storage collaborator errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Stored record could not be decoded: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Key/value storage for asset records
#[async_trait]
pub trait Storage: Send + Sync {
    /// Check whether a record exists
    async fn exists(&self, id: &str) -> StorageResult<bool>;

    /// Store a new record
    async fn create(&self, id: &str, value: Value) -> StorageResult<()>;

    /// Replace an existing record
    async fn update(&self, id: &str, value: Value) -> StorageResult<()>;

    /// Read a record as raw JSON
    async fn select(&self, id: &str) -> StorageResult<Value>;
}

/// Read a record and decode it into `T`
pub async fn get<T>(storage: &dyn Storage, id: &str) -> StorageResult<T>
where
    T: DeserializeOwned,
{
    let value = storage.select(id).await?;
    Ok(serde_json::from_value(value)?)
}

/// In-process storage backed by a map
///
/// Counts `create` and `update` calls so tests can assert how many writes a
/// merge produced.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    records: Mutex<HashMap<String, Value>>,
    creates: AtomicUsize,
    updates: AtomicUsize,
}

impl InMemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `create` calls
    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Number of successful `update` calls
    pub fn update_calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        // A panic while holding the lock cannot leave a half-written record,
        // so a poisoned map is still consistent.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn exists(&self, id: &str) -> StorageResult<bool> {
        Ok(self.lock().contains_key(id))
    }

    async fn create(&self, id: &str, value: Value) -> StorageResult<()> {
        let mut records = self.lock();
        if records.contains_key(id) {
            return Err(StorageError::AlreadyExists(id.to_string()));
        }
        records.insert(id.to_string(), value);
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update(&self, id: &str, value: Value) -> StorageResult<()> {
        let mut records = self.lock();
        match records.get_mut(id) {
            Some(existing) => {
                *existing = value;
                self.updates.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(StorageError::NotFound(id.to_string())),
        }
    }

    async fn select(&self, id: &str) -> StorageResult<Value> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }
}
