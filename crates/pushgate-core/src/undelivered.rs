//! Count-indexed persistence of messages no in-app listener handled
//!
//! Layout inside the key/value store:
//!
//! - `<count_key>` holds the current record count N as decimal text.
//! - `<message_key_prefix><i>` holds the JSON form of record i, 1 <= i <= N.
//!
//! An append writes the message record first and the count second. A crash
//! between the two leaves an orphan at N+1 that the next append overwrites;
//! readers therefore tolerate gaps instead of assuming 1..=N is dense.
//!
//! Numbering is monotonic between replays only: [`UndeliveredStore::take_all`]
//! consumes every record and resets the count, so the next append is #1 again.

use std::sync::{Arc, Mutex};

use crate::config::StoreConfig;
use crate::message::InternalPushMessage;
use crate::storage::KeyValueStore;
use crate::types::SequenceNumber;
use crate::{PushError, Result};

/// One stored record, decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndeliveredRecord {
    pub sequence: SequenceNumber,
    pub message: InternalPushMessage,
}

/// Append-only store of undelivered messages
pub struct UndeliveredStore {
    storage: Arc<dyn KeyValueStore>,
    config: StoreConfig,
    /// Serializes read-increment-write so no two appends share a number
    write_lock: Mutex<()>,
}

impl UndeliveredStore {
    /// Create a store over the given key/value storage
    pub fn new(storage: Arc<dyn KeyValueStore>, config: StoreConfig) -> Self {
        Self {
            storage,
            config,
            write_lock: Mutex::new(()),
        }
    }

    fn message_key(&self, sequence: SequenceNumber) -> String {
        format!("{}{}", self.config.message_key_prefix, sequence.value())
    }

    /// Append a serialized message, returning its sequence number
    pub fn append(&self, serialized: String) -> Result<SequenceNumber> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let sequence = SequenceNumber::new(self.count()?)
            .next()
            .ok_or_else(|| {
                PushError::corrupt_record(self.config.count_key.clone(), "count overflow")
            })?;
        self.storage.put(&self.message_key(sequence), serialized)?;
        self.storage
            .put(&self.config.count_key, sequence.value().to_string())?;

        tracing::debug!(%sequence, "Stored undelivered message");
        Ok(sequence)
    }

    /// Serialize and append a message
    pub fn append_message(&self, message: &InternalPushMessage) -> Result<SequenceNumber> {
        self.append(message.to_json()?)
    }

    /// Current record count; zero when nothing was ever stored
    pub fn count(&self) -> Result<u64> {
        match self.storage.get(&self.config.count_key)? {
            None => Ok(0),
            Some(text) => text.trim().parse::<u64>().map_err(|e| {
                PushError::corrupt_record(self.config.count_key.clone(), e.to_string())
            }),
        }
    }

    /// Serialized message stored under a sequence number
    pub fn get(&self, sequence: SequenceNumber) -> Result<Option<String>> {
        self.storage.get(&self.message_key(sequence))
    }

    /// Decoded message stored under a sequence number
    pub fn get_message(&self, sequence: SequenceNumber) -> Result<Option<InternalPushMessage>> {
        self.get(sequence)?
            .map(|json| InternalPushMessage::from_json(&json))
            .transpose()
    }

    /// Every readable record in 1..=count, skipping gaps and undecodable entries
    pub fn entries(&self) -> Result<Vec<UndeliveredRecord>> {
        let count = self.count()?;
        let mut records = Vec::new();

        for index in 1..=count {
            let sequence = SequenceNumber::new(index);
            match self.get(sequence)? {
                None => {
                    tracing::warn!(%sequence, "Undelivered record missing, skipping");
                }
                Some(json) => match InternalPushMessage::from_json(&json) {
                    Ok(message) => records.push(UndeliveredRecord { sequence, message }),
                    Err(e) => {
                        tracing::warn!(%sequence, error = %e, "Undelivered record unreadable, skipping");
                    }
                },
            }
        }

        Ok(records)
    }

    /// Return every record, then delete them and reset the count
    pub fn take_all(&self) -> Result<Vec<UndeliveredRecord>> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let records = self.entries()?;
        let count = self.count()?;
        // One past the count may hold an orphan from an interrupted append
        for index in 1..=count.saturating_add(1) {
            self.storage.remove(&self.message_key(SequenceNumber::new(index)))?;
        }
        self.storage.put(&self.config.count_key, "0".to_string())?;

        tracing::debug!(taken = records.len(), "Cleared undelivered store");
        Ok(records)
    }
}
