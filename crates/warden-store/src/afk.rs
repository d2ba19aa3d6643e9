use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use warden_types::records::AfkRecord;

/// Who is currently away, and why. In-memory only — an AFK marker not
/// surviving a restart is fine.
#[derive(Clone, Default)]
pub struct AfkStore {
    away: Arc<Mutex<HashMap<String, AfkRecord>>>,
}

impl AfkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, subject_id: &str, note: Option<String>) {
        self.away.lock().unwrap().insert(
            subject_id.to_string(),
            AfkRecord {
                note: note.unwrap_or_else(|| "AFK".to_string()),
                since: Utc::now(),
            },
        );
    }

    /// Clear the marker, returning it so the caller can say how long the
    /// subject was away.
    pub fn clear(&self, subject_id: &str) -> Option<AfkRecord> {
        self.away.lock().unwrap().remove(subject_id)
    }

    pub fn get(&self, subject_id: &str) -> Option<AfkRecord> {
        self.away.lock().unwrap().get(subject_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_clear_round_trip() {
        let store = AfkStore::new();
        store.set("u1", Some("lunch".into()));

        assert_eq!(store.get("u1").unwrap().note, "lunch");
        assert_eq!(store.clear("u1").unwrap().note, "lunch");
        assert!(store.get("u1").is_none());
        assert!(store.clear("u1").is_none());
    }

    #[test]
    fn missing_note_defaults() {
        let store = AfkStore::new();
        store.set("u1", None);
        assert_eq!(store.get("u1").unwrap().note, "AFK");
    }
}
