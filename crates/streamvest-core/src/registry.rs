use crate::types::{Principal, Shares, Stream, StreamId, Timestamp, TokenId};
use std::collections::BTreeMap;

/// Exclusive owner of all stream records.
///
/// Ids are assigned monotonically starting at 1 and are never reused:
/// cancellation erases the record entirely, after which lookups fall back to
/// the default (null-sender) record.
#[derive(Debug, Clone, Default)]
pub struct StreamRegistry {
    streams: BTreeMap<StreamId, Stream>,
    last_id: StreamId,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new record and returns its id.
    pub fn create(
        &mut self,
        sender: Principal,
        recipient: Principal,
        token: TokenId,
        deposited_shares: Shares,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> StreamId {
        self.last_id += 1;
        let id = self.last_id;
        self.streams.insert(
            id,
            Stream {
                id,
                sender,
                recipient,
                token,
                deposited_shares,
                withdrawn_shares: 0,
                start_time,
                end_time,
            },
        );
        id
    }

    pub fn get(&self, id: StreamId) -> Option<&Stream> {
        self.streams.get(&id)
    }

    pub fn get_mut(&mut self, id: StreamId) -> Option<&mut Stream> {
        self.streams.get_mut(&id)
    }

    /// Lookup that mirrors the public query surface: absent ids yield the
    /// default record instead of an error.
    pub fn get_or_default(&self, id: StreamId) -> Stream {
        self.streams.get(&id).cloned().unwrap_or_default()
    }

    /// Erases a record. The id is retired permanently.
    pub fn remove(&mut self, id: StreamId) -> Option<Stream> {
        self.streams.remove(&id)
    }
}
