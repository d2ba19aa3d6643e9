use std::path::Path;

use warden_types::records::{LevelRecord, required_xp};

use crate::snapshot::PersistedKeyedStore;

/// Outcome of one XP grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpGrant {
    pub xp: u64,
    pub level: u32,
    /// Set when this grant crossed the threshold.
    pub leveled_up: bool,
}

/// Per-subject, per-scope leveling over the generic snapshot store.
///
/// The whole grant — read, compare against `required_xp`, maybe level up,
/// persist — happens inside one `update` step, so two subjects chatting at
/// the same instant can never interleave a partial grant.
pub struct LevelStore {
    store: PersistedKeyedStore<LevelRecord>,
}

impl LevelStore {
    pub fn load(path: impl AsRef<Path>) -> Self {
        Self {
            store: PersistedKeyedStore::load(path),
        }
    }

    fn key(subject_id: &str, scope_id: &str) -> String {
        format!("{subject_id}-{scope_id}")
    }

    /// Grant `amount` XP. Crossing `required_xp(level)` bumps the level
    /// and resets xp to zero — leftover xp never carries over.
    pub fn grant_xp(&self, subject_id: &str, scope_id: &str, amount: u64) -> XpGrant {
        self.store.update(&Self::key(subject_id, scope_id), |slot| {
            let record = slot.get_or_insert_with(LevelRecord::default);
            record.xp += amount;
            if record.xp >= required_xp(record.level) {
                record.level += 1;
                record.xp = 0;
                XpGrant {
                    xp: record.xp,
                    level: record.level,
                    leveled_up: true,
                }
            } else {
                XpGrant {
                    xp: record.xp,
                    level: record.level,
                    leveled_up: false,
                }
            }
        })
    }

    pub fn get(&self, subject_id: &str, scope_id: &str) -> LevelRecord {
        self.store
            .get(&Self::key(subject_id, scope_id))
            .unwrap_or_default()
    }
}
