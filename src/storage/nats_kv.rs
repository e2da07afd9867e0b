// Copyright (c) 2025 - Cowboy AI, Inc.
//! NATS JetStream Key/Value Storage
//!
//! Persists asset records as JSON values in a JetStream KV bucket. The bucket
//! is created on first use.

use async_nats::jetstream::{self, kv};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::Value;
use tracing::{debug, info};

use crate::storage::{Storage, StorageError, StorageResult};

/// JetStream KV-backed record storage
///
/// # Example
///
/// ```rust,no_run
/// use cip_functions::storage::NatsKvStorage;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = async_nats::connect("nats://localhost:4222").await?;
///     let storage = NatsKvStorage::open(client, "cip-functions").await?;
///     Ok(())
/// }
/// ```
pub struct NatsKvStorage {
    store: kv::Store,
    bucket: String,
}

impl NatsKvStorage {
    /// Open (or create) the bucket holding asset records
    pub async fn open(client: async_nats::Client, bucket: &str) -> StorageResult<Self> {
        let jetstream = jetstream::new(client);

        let store = match jetstream.get_key_value(bucket).await {
            Ok(store) => store,
            Err(_) => {
                info!(bucket = %bucket, "Key/value bucket not found, creating");
                jetstream
                    .create_key_value(kv::Config {
                        bucket: bucket.to_string(),
                        history: 1,
                        ..Default::default()
                    })
                    .await
                    .map_err(|e| StorageError::Backend(e.to_string()))?
            }
        };

        Ok(Self {
            store,
            bucket: bucket.to_string(),
        })
    }

    /// Name of the backing bucket
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Asset ids may hold any character; KV keys allow only `[-/_=.a-zA-Z0-9]`.
    /// Base64url keeps the mapping reversible, so distinct ids never share a key.
    fn key(id: &str) -> String {
        URL_SAFE_NO_PAD.encode(id)
    }
}

#[async_trait]
impl Storage for NatsKvStorage {
    async fn exists(&self, id: &str) -> StorageResult<bool> {
        let entry = self
            .store
            .get(Self::key(id))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(entry.is_some())
    }

    async fn create(&self, id: &str, value: Value) -> StorageResult<()> {
        let payload = serde_json::to_vec(&value)?;

        // Expected revision 0: the write only lands if the key has no entry yet.
        let error = match self.store.update(Self::key(id), payload.into(), 0).await {
            Ok(revision) => {
                debug!(id = %id, revision = revision, "Created record");
                return Ok(());
            }
            Err(e) => e,
        };

        // The server reports a revision mismatch as a generic publish error.
        if self.exists(id).await? {
            debug!(id = %id, error = %error, "Record already exists");
            return Err(StorageError::AlreadyExists(id.to_string()));
        }

        Err(StorageError::Backend(error.to_string()))
    }

    async fn update(&self, id: &str, value: Value) -> StorageResult<()> {
        let payload = serde_json::to_vec(&value)?;
        let revision = self
            .store
            .put(Self::key(id), payload.into())
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        debug!(id = %id, revision = revision, "Updated record");
        Ok(())
    }

    async fn select(&self, id: &str) -> StorageResult<Value> {
        let bytes = self
            .store
            .get(Self::key(id))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_valid_kv_key() {
        let key = NatsKvStorage::key("sewer:urn:dev:1 @+");
        assert!(key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_')));
    }

    #[test]
    fn test_distinct_ids_get_distinct_keys() {
        let ids = ["sewer:urn:dev:1", "sewer:urn.dev.1", "sewer.urn.dev.1", "sewer:urn:dev:1 "];
        let keys: std::collections::HashSet<_> = ids.iter().map(|id| NatsKvStorage::key(id)).collect();
        assert_eq!(keys.len(), ids.len());
    }

    #[test]
    fn test_key_round_trips() {
        let id = "sewagepumpingstation:fn-003";
        let decoded = URL_SAFE_NO_PAD.decode(NatsKvStorage::key(id)).unwrap();
        assert_eq!(decoded, id.as_bytes());
    }
}
