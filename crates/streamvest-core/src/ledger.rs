use crate::error::StreamError;
use crate::types::{StreamEvent, StreamId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Hash-chained audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entry_id: String,
    pub index: u64,
    pub stream_id: Option<StreamId>,
    pub recorded_at: DateTime<Utc>,
    pub event: Value,
    pub previous_hash: Option<String>,
    pub entry_hash: String,
}

/// Append-only audit log replacing chain-native event emission.
///
/// Design choice: no in-place mutation APIs are exposed. Every successful
/// mutator appends one entry, and the blake3 hash chain makes after-the-fact
/// tampering detectable. The log is part of the engine's committed state, so
/// entries from rolled-back operations are never visible.
#[derive(Debug, Default, Clone)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends one event, chaining it to the previous entry.
    pub fn append(&mut self, event: &StreamEvent) -> Result<(), StreamError> {
        let payload =
            serde_json::to_value(event).map_err(|e| StreamError::Ledger(e.to_string()))?;
        let index = self.entries.len() as u64;
        let recorded_at = Utc::now();
        let previous_hash = self.entries.last().map(|entry| entry.entry_hash.clone());
        let entry_hash = compute_entry_hash(
            index,
            event.stream_id(),
            recorded_at,
            &payload,
            previous_hash.as_deref(),
        );

        self.entries.push(AuditEntry {
            entry_id: Uuid::new_v4().to_string(),
            index,
            stream_id: event.stream_id(),
            recorded_at,
            event: payload,
            previous_hash,
            entry_hash,
        });
        Ok(())
    }

    /// All entries recorded for one stream, in append order.
    pub fn for_stream(&self, id: StreamId) -> Vec<&AuditEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.stream_id == Some(id))
            .collect()
    }

    /// All entries recorded inside the inclusive `[from, to]` window.
    pub fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<&AuditEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.recorded_at >= from && entry.recorded_at <= to)
            .collect()
    }

    pub fn verify_chain(&self) -> bool {
        let mut previous_hash: Option<String> = None;
        for entry in &self.entries {
            let expected = compute_entry_hash(
                entry.index,
                entry.stream_id,
                entry.recorded_at,
                &entry.event,
                previous_hash.as_deref(),
            );
            if entry.entry_hash != expected || entry.previous_hash != previous_hash {
                return false;
            }
            previous_hash = Some(entry.entry_hash.clone());
        }
        true
    }
}

fn compute_entry_hash(
    index: u64,
    stream_id: Option<StreamId>,
    recorded_at: DateTime<Utc>,
    event: &Value,
    previous_hash: Option<&str>,
) -> String {
    let material = serde_json::json!({
        "index": index,
        "stream_id": stream_id,
        "recorded_at": recorded_at,
        "event": event,
        "previous_hash": previous_hash,
    });

    let bytes = serde_json::to_vec(&material).unwrap_or_default();
    blake3::hash(&bytes).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Principal;

    fn whitelist_event(approved: bool) -> StreamEvent {
        StreamEvent::WhitelistChanged {
            agent: Principal::new("swapper"),
            approved,
        }
    }

    fn sender_event(id: StreamId) -> StreamEvent {
        StreamEvent::SenderUpdated {
            id,
            previous: Principal::new("alice"),
            current: Principal::new("carol"),
        }
    }

    #[test]
    fn verifies_hash_chain() {
        let mut log = AuditLog::new();
        log.append(&whitelist_event(true)).unwrap();
        log.append(&sender_event(1)).unwrap();
        log.append(&sender_event(2)).unwrap();
        assert!(log.verify_chain());
    }

    #[test]
    fn detects_tampered_entries() {
        let mut log = AuditLog::new();
        log.append(&whitelist_event(true)).unwrap();
        log.append(&whitelist_event(false)).unwrap();

        // Clone and tamper outside of append APIs to validate proof behavior.
        let mut tampered = log.clone();
        tampered.entries[0].event = serde_json::json!({"tampered": true});
        assert!(!tampered.verify_chain());
    }

    #[test]
    fn queries_by_stream_id() {
        let mut log = AuditLog::new();
        log.append(&sender_event(1)).unwrap();
        log.append(&sender_event(2)).unwrap();
        log.append(&sender_event(1)).unwrap();
        log.append(&whitelist_event(true)).unwrap();

        let entries = log.for_stream(1);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|entry| entry.stream_id == Some(1)));
    }

    #[test]
    fn queries_by_time_range() {
        let mut log = AuditLog::new();
        log.append(&sender_event(1)).unwrap();
        log.append(&sender_event(2)).unwrap();

        let all = log.between(DateTime::<Utc>::MIN_UTC, Utc::now());
        assert_eq!(all.len(), 2);
        let none = log.between(DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MIN_UTC);
        assert!(none.is_empty());
    }
}
