use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use rand::seq::IteratorRandom;
use warden_types::records::GiveawayRecord;

use crate::snapshot::PersistedKeyedStore;

/// Persisted giveaways keyed by `{channel_id}-{start_millis}`.
///
/// Reaction events arrive keyed by message ref, so lookups go both ways.
/// A record whose `ends_at` is already past is transient: its conclusion
/// timer has not fired yet (or is being re-armed after a restart).
pub struct GiveawayStore {
    store: PersistedKeyedStore<GiveawayRecord>,
}

impl GiveawayStore {
    pub fn load(path: impl AsRef<Path>) -> Self {
        Self {
            store: PersistedKeyedStore::load(path),
        }
    }

    /// Persist a new giveaway. Returns its id; the caller arms the
    /// conclusion timer.
    pub fn create(
        &self,
        channel_id: &str,
        creator_id: &str,
        prize: &str,
        winner_count: u32,
        ends_at: DateTime<Utc>,
    ) -> (String, GiveawayRecord) {
        let id = format!("{}-{}", channel_id, Utc::now().timestamp_millis());
        let record = GiveawayRecord {
            message_ref: format!("gw-{id}"),
            channel_id: channel_id.to_string(),
            ends_at,
            winner_count,
            prize: prize.to_string(),
            participants: BTreeSet::new(),
            creator_id: creator_id.to_string(),
        };
        self.store.set(&id, record.clone());
        (id, record)
    }

    pub fn get(&self, id: &str) -> Option<GiveawayRecord> {
        self.store.get(id)
    }

    /// All giveaways, for re-arming conclusion timers at startup.
    pub fn all(&self) -> Vec<(String, GiveawayRecord)> {
        self.store.entries()
    }

    pub fn find_by_message(&self, message_ref: &str) -> Option<(String, GiveawayRecord)> {
        self.store
            .entries()
            .into_iter()
            .find(|(_, record)| record.message_ref == message_ref)
    }

    /// Add a participant to the giveaway behind `message_ref`. Returns
    /// false if the message tracks no giveaway.
    pub fn add_participant(&self, message_ref: &str, subject_id: &str) -> bool {
        let Some((id, _)) = self.find_by_message(message_ref) else {
            return false;
        };
        self.store.update(&id, |slot| {
            if let Some(record) = slot {
                record.participants.insert(subject_id.to_string());
                true
            } else {
                false
            }
        })
    }

    pub fn remove_participant(&self, message_ref: &str, subject_id: &str) -> bool {
        let Some((id, _)) = self.find_by_message(message_ref) else {
            return false;
        };
        self.store.update(&id, |slot| {
            if let Some(record) = slot {
                record.participants.remove(subject_id)
            } else {
                false
            }
        })
    }

    /// Draw up to `count` distinct winners uniformly without replacement.
    /// Non-destructive: the participant set is untouched, so a reroll
    /// draws from the same pool.
    pub fn draw_winners(&self, id: &str, count: usize) -> Vec<String> {
        match self.store.get(id) {
            Some(record) => record
                .participants
                .iter()
                .cloned()
                .choose_multiple(&mut rand::rng(), count),
            None => Vec::new(),
        }
    }

    /// Terminal: the conclusion announced its winners, drop the record.
    pub fn conclude(&self, id: &str) -> Option<GiveawayRecord> {
        self.store.remove(id)
    }
}
