use std::collections::BTreeMap;

use crate::{
    ledger::types::{PendingSendEntry, PendingSendKey},
    types::Sequence,
};

/// Sends that changed the flow ledger and are waiting for their
/// acknowledgement or timeout. An entry is removed exactly once; later lookups
/// for the same key observe `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSendRegistry {
    entries: BTreeMap<PendingSendKey, PendingSendEntry>,
}

impl PendingSendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry previously stored under the same key, if any.
    pub fn register(&mut self, entry: PendingSendEntry) -> Option<PendingSendEntry> {
        self.entries.insert(entry.key(), entry)
    }

    pub fn resolve(&self, channel_id: &str, sequence: Sequence) -> Option<&PendingSendEntry> {
        self.entries.get(&PendingSendKey::new(channel_id, sequence))
    }

    pub fn remove(&mut self, channel_id: &str, sequence: Sequence) -> Option<PendingSendEntry> {
        self.entries.remove(&PendingSendKey::new(channel_id, sequence))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingSendEntry> {
        self.entries.values()
    }
}

impl FromIterator<PendingSendEntry> for PendingSendRegistry {
    fn from_iter<I: IntoIterator<Item = PendingSendEntry>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|entry| (entry.key(), entry))
                .collect(),
        }
    }
}
