//! In-memory pinning backend for testing and embedding

use crate::error::{Result, StoreError};
use crate::query::PinQuery;
use crate::types::{Keyvalues, PinnedRecord};
use crate::PinningBackend;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;

#[derive(Clone, Debug)]
struct StoredPin {
    record: PinnedRecord,
    body: Value,
    seq: u64,
}

/// An in-memory pinning backend
///
/// Content hashes are derived from the body bytes, so pinning identical
/// content twice yields the same hash, as a real content-addressed store
/// would. Evaluates the full predicate model in process.
#[derive(Clone, Default)]
pub struct MemoryPinningBackend {
    pins: Arc<DashMap<String, StoredPin>>,
    counter: Arc<std::sync::atomic::AtomicU64>,
}

impl MemoryPinningBackend {
    /// Create a new empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live pins
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    /// Whether the backend holds no pins
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Drop all pins
    pub fn clear(&self) {
        self.pins.clear();
    }

    fn content_hash(body: &Value) -> Result<String> {
        let bytes = serde_json::to_vec(body)?;
        let digest = Sha256::digest(&bytes);
        Ok(format!("Qm{}", hex::encode(&digest[..22])))
    }
}

#[async_trait]
impl PinningBackend for MemoryPinningBackend {
    async fn pin_json(
        &self,
        body: &Value,
        name: Option<&str>,
        keyvalues: &Keyvalues,
    ) -> Result<String> {
        let hash = Self::content_hash(body)?;
        let seq = self
            .counter
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        self.pins.insert(
            hash.clone(),
            StoredPin {
                record: PinnedRecord {
                    content_hash: hash.clone(),
                    created_at: Utc::now(),
                    name: name.map(String::from),
                    keyvalues: keyvalues.clone(),
                },
                body: body.clone(),
                seq,
            },
        );

        Ok(hash)
    }

    async fn unpin(&self, content_hash: &str) -> Result<()> {
        self.pins.remove(content_hash);
        Ok(())
    }

    async fn list_pins(&self, query: &PinQuery) -> Result<Vec<PinnedRecord>> {
        let mut matches = Vec::new();

        for entry in self.pins.iter() {
            let pin = entry.value();

            if let Some(hash) = &query.content_hash {
                if !pin.record.content_hash.contains(hash.as_str()) {
                    continue;
                }
            }

            let mut matched = true;
            for (key, predicate) in &query.keyvalues {
                if !predicate.matches(pin.record.keyvalues.get(key))? {
                    matched = false;
                    break;
                }
            }
            if matched {
                matches.push((pin.seq, pin.record.clone()));
            }
        }

        // newest first, stable across calls
        matches.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(matches
            .into_iter()
            .map(|(_, record)| record)
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect())
    }

    async fn update_metadata(&self, content_hash: &str, keyvalues: &Keyvalues) -> Result<()> {
        match self.pins.get_mut(content_hash) {
            Some(mut entry) => {
                entry.record.keyvalues = keyvalues.clone();
                Ok(())
            }
            None => Err(StoreError::PinFailed(format!(
                "failed to update metadata: {} is not pinned",
                content_hash
            ))),
        }
    }

    async fn fetch_content(&self, content_hash: &str) -> Result<Value> {
        self.pins
            .get(content_hash)
            .map(|entry| entry.body.clone())
            .ok_or_else(|| StoreError::Gateway(format!("content not found: {}", content_hash)))
    }
}
