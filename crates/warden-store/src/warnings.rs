use std::path::Path;

use chrono::Utc;
use warden_types::records::{WarningEntry, WarningRecord};

use crate::snapshot::PersistedKeyedStore;

/// How many warnings trigger the ban side effect.
pub const BAN_THRESHOLD: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarningOutcome {
    pub total: usize,
    /// True exactly once per threshold crossing. Guarded by
    /// `threshold_crossed` on the record so a fourth or fifth warning
    /// never repeats the irreversible action.
    pub ban_triggered: bool,
}

/// Append-only warning records keyed by subject.
pub struct WarningStore {
    store: PersistedKeyedStore<WarningRecord>,
}

impl WarningStore {
    pub fn load(path: impl AsRef<Path>) -> Self {
        Self {
            store: PersistedKeyedStore::load(path),
        }
    }

    pub fn add(&self, subject_id: &str, reason: &str) -> WarningOutcome {
        self.store.update(subject_id, |slot| {
            let record = slot.get_or_insert_with(WarningRecord::default);
            record.entries.push(WarningEntry {
                reason: reason.to_string(),
                warned_at: Utc::now(),
            });

            let ban_triggered =
                record.entries.len() >= BAN_THRESHOLD && !record.threshold_crossed;
            if ban_triggered {
                record.threshold_crossed = true;
            }

            WarningOutcome {
                total: record.entries.len(),
                ban_triggered,
            }
        })
    }

    pub fn list(&self, subject_id: &str) -> Vec<WarningEntry> {
        self.store
            .get(subject_id)
            .map(|record| record.entries)
            .unwrap_or_default()
    }

    /// Drop the record entirely, re-arming the threshold guard.
    pub fn clear(&self, subject_id: &str) -> usize {
        self.store
            .remove(subject_id)
            .map(|record| record.entries.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_store(name: &str) -> (WarningStore, PathBuf) {
        let mut path = std::env::temp_dir();
        path.push(format!("warden-warnings-{}-{}.json", name, std::process::id()));
        std::fs::remove_file(&path).ok();
        (WarningStore::load(&path), path)
    }

    #[test]
    fn ban_fires_exactly_once_at_the_third_warning() {
        let (store, path) = scratch_store("threshold");

        assert!(!store.add("u1", "spam").ban_triggered);
        assert!(!store.add("u1", "spam again").ban_triggered);

        let third = store.add("u1", "still spamming");
        assert!(third.ban_triggered);
        assert_eq!(third.total, 3);

        // Past the threshold: never again.
        assert!(!store.add("u1", "fourth").ban_triggered);
        assert!(!store.add("u1", "fifth").ban_triggered);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn clear_re_arms_the_guard() {
        let (store, path) = scratch_store("rearm");

        for _ in 0..3 {
            store.add("u1", "x");
        }
        assert_eq!(store.clear("u1"), 3);
        assert!(store.list("u1").is_empty());

        for _ in 0..2 {
            assert!(!store.add("u1", "y").ban_triggered);
        }
        assert!(store.add("u1", "y").ban_triggered);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn the_guard_survives_a_reload() {
        let mut path = std::env::temp_dir();
        path.push(format!("warden-warnings-reload-{}.json", std::process::id()));
        std::fs::remove_file(&path).ok();

        {
            let store = WarningStore::load(&path);
            for _ in 0..3 {
                store.add("u1", "x");
            }
        }

        let store = WarningStore::load(&path);
        assert!(
            !store.add("u1", "post-restart").ban_triggered,
            "a restart must not re-trigger the ban"
        );

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn warnings_are_ordered_append_only() {
        let (store, path) = scratch_store("order");

        store.add("u1", "first");
        store.add("u1", "second");
        let listed = store.list("u1");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].reason, "first");
        assert_eq!(listed[1].reason, "second");

        std::fs::remove_file(&path).ok();
    }
}
